//! Module for reaching the native reference counting entry points
use objref_sys as ffi;
use std::{
    ffi::c_void,
    fmt,
    ptr::{self, NonNull},
    sync::atomic::{AtomicPtr, Ordering},
};

/// The pair of native functions that manage an object's reference count.
///
/// `ref_object` adds one reference and returns the address the new reference lives at (for
/// GObject this is the same address, other libraries may hand back a distinct proxy).
/// `unref_object` drops one reference and frees the object once the count reaches zero.
#[repr(C)]
pub struct RefCountFns {
    pub ref_object: ffi::RefFunc,
    pub unref_object: ffi::UnrefFunc,
}

impl fmt::Debug for RefCountFns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefCountFns")
            .field("ref_object", &(self.ref_object as *const c_void))
            .field("unref_object", &(self.unref_object as *const c_void))
            .finish()
    }
}

#[cfg(feature = "gobject-functions")]
static GOBJECT_FNS: RefCountFns = RefCountFns {
    ref_object: ffi::g_object_ref,
    unref_object: ffi::g_object_unref,
};

/// A handle to an installed reference counting table.
#[derive(Debug, Clone, Copy)]
pub struct API {
    // Only ever points at a `&'static RefCountFns`.
    handle: NonNull<RefCountFns>,
}

unsafe impl Send for API {}
unsafe impl Sync for API {}

/// The cached table. Note that this is `*const RefCountFns` in spirit, never written through.
static RAW_API: AtomicPtr<RefCountFns> = AtomicPtr::new(ptr::null_mut());

impl API {
    /// Retrieves the installed reference counting table.
    ///
    /// Returns `None` if nothing was installed and no native library was linked in.
    #[inline]
    pub fn get() -> Option<Self> {
        let handle = RAW_API.load(Ordering::Acquire);

        #[cfg(feature = "gobject-functions")]
        let handle = if handle.is_null() {
            // Fall back to GObject, but don't clobber a table installed concurrently.
            let fallback = &GOBJECT_FNS as *const RefCountFns as *mut RefCountFns;
            match RAW_API.compare_exchange(
                ptr::null_mut(),
                fallback,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => fallback,
                Err(current) => current,
            }
        } else {
            handle
        };

        NonNull::new(handle).map(|handle| Self { handle })
    }

    /// Installs `fns` as the table used by [`API::get()`] from now on.
    ///
    /// Handles that were acquired earlier keep using the table they were acquired with.
    pub fn install(fns: &'static RefCountFns) -> Self {
        let api = Self::from_fns(fns);
        RAW_API.store(api.handle.as_ptr(), Ordering::Release);
        log::debug!("installed reference counting table {:?}", fns);
        api
    }

    /// Wraps `fns` without installing it.
    #[inline]
    pub fn from_fns(fns: &'static RefCountFns) -> Self {
        Self {
            handle: NonNull::from(fns),
        }
    }

    #[inline]
    fn fns(&self) -> &'static RefCountFns {
        // SAFETY: `handle` always comes from a `&'static RefCountFns`.
        unsafe { &*self.handle.as_ptr() }
    }

    /// Returns whether both handles refer to the same table.
    #[inline]
    pub fn same_table(&self, other: &API) -> bool {
        self.handle == other.handle
    }

    /// Adds a reference to `object`, returning the address of the new reference.
    ///
    /// # Safety
    /// `object` must point to a live object this table knows how to count.
    #[inline]
    pub(crate) unsafe fn ref_object(self, object: NonNull<c_void>) -> *mut c_void {
        (self.fns().ref_object)(object.as_ptr())
    }

    /// Drops one reference to `object`.
    ///
    /// # Safety
    /// The caller must own the reference being given up, and must not use it afterwards.
    #[inline]
    pub(crate) unsafe fn unref_object(self, object: NonNull<c_void>) {
        (self.fns().unref_object)(object.as_ptr())
    }
}

/// Installs `fns` as the process-wide reference counting table.
///
/// Shorthand for [`API::install()`].
pub fn init_api(fns: &'static RefCountFns) -> API {
    API::install(fns)
}
