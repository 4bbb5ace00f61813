//! Wrappers owning a native object on behalf of a managed caller.

use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU8, Ordering};

use bitflags::bitflags;
use log::trace;

use crate::api::API;
use crate::handle::{HandleError, HandleResult, NativeHandle};


bitflags! {
    /// What has happened to an [`ObjectRef`] so far.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Lifecycle: u8 {
        /// `dispose()` was called at least once.
        const DISPOSED = 1;
        /// The drop-time finalizer will be skipped.
        const FINALIZE_SUPPRESSED = 1 << 1;
        /// The finalizer ran, either explicitly or from `Drop`.
        const FINALIZED = 1 << 2;
        /// The native reference has been given back.
        const RELEASED = 1 << 3;
    }
}

/// An owned reference to a native object.
///
/// The wrapper is either live (holding one reference) or released, and never goes back.
/// [`dispose()`](ObjectRef::dispose) and [`finalize()`](ObjectRef::finalize) may race from
/// different threads; the native reference is given back exactly once. Dropping a wrapper
/// that was never disposed runs the finalizer.
///
/// `ObjectRef` is not `Clone`: a second owner needs its own reference, see
/// [`try_clone()`](ObjectRef::try_clone).
pub struct ObjectRef {
    handle: NativeHandle,
    state: AtomicU8,
}

impl ObjectRef {
    /// Wraps an owned reference, counted with the installed table.
    ///
    /// # Safety
    /// `address` must carry one reference unit which the caller transfers to the wrapper.
    pub unsafe fn from_raw(address: *mut c_void) -> HandleResult<Self> {
        let address = NonNull::new(address).ok_or(HandleError::NullAddress)?;
        let api = API::get().ok_or(HandleError::NoApi)?;
        Ok(Self::from_handle(NativeHandle::acquire(api, address)))
    }

    /// Wraps an owned reference, counted with `api`.
    ///
    /// # Safety
    /// See [`from_raw()`](ObjectRef::from_raw).
    pub unsafe fn from_raw_in(api: API, address: *mut c_void) -> HandleResult<Self> {
        Ok(Self::from_handle(NativeHandle::from_raw(api, address)?))
    }

    /// Adds a reference to a borrowed object and wraps the new reference.
    ///
    /// This is how getters returning a borrowed pointer are wrapped: the caller's reference
    /// (if any) is left untouched.
    ///
    /// # Safety
    /// `address` must point to a live object countable by `api`.
    pub unsafe fn from_raw_ref(api: API, address: *mut c_void) -> HandleResult<Self> {
        let borrowed = NonNull::new(address).ok_or(HandleError::NullAddress)?;
        let owned = NonNull::new(api.ref_object(borrowed)).ok_or(HandleError::RefFailed)?;
        Ok(Self::from_handle(NativeHandle::acquire(api, owned)))
    }

    #[inline]
    fn from_handle(handle: NativeHandle) -> Self {
        Self {
            handle,
            state: AtomicU8::new(Lifecycle::empty().bits()),
        }
    }

    #[inline]
    fn mark(&self, flags: Lifecycle) {
        self.state.fetch_or(flags.bits(), Ordering::AcqRel);
    }

    /// What has happened to this wrapper so far.
    #[inline]
    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_bits_truncate(self.state.load(Ordering::Acquire))
    }

    /// Whether the native reference is still held.
    #[inline]
    pub fn is_live(&self) -> bool {
        self.handle.is_valid()
    }

    /// Whether the native reference has been given back.
    #[inline]
    pub fn is_released(&self) -> bool {
        !self.is_live()
    }

    /// Returns the address of the native object, for issuing native calls.
    ///
    /// Fails with [`HandleError::InvalidHandle`] once the wrapper has been released.
    #[inline]
    pub fn handle(&self) -> HandleResult<NonNull<c_void>> {
        self.handle.get()
    }

    /// The table the reference is counted with.
    #[inline]
    pub fn api(&self) -> API {
        self.handle.api()
    }

    /// Releases the native reference now.
    ///
    /// Always succeeds and may be called any number of times. Also suppresses the drop-time
    /// finalizer for this wrapper.
    pub fn dispose(&self) {
        self.mark(Lifecycle::DISPOSED | Lifecycle::FINALIZE_SUPPRESSED);
        if self.handle.release() {
            self.mark(Lifecycle::RELEASED);
            trace!("dispose gave the reference back");
        }
    }

    /// The finalizer: releases the native reference if nothing else did.
    ///
    /// Meant for collector-driven cleanup. It only touches this wrapper's own handle and
    /// never panics, so it's safe to call from a finalizer thread while the owner disposes.
    pub fn finalize(&self) {
        self.mark(Lifecycle::FINALIZED);
        if self.handle.release() {
            self.mark(Lifecycle::RELEASED);
            trace!("finalizer gave the reference back");
        }
    }

    /// Adds a reference to the same object and wraps it in an independent wrapper.
    ///
    /// Disposing either wrapper leaves the other one live.
    pub fn try_clone(&self) -> HandleResult<ObjectRef> {
        Ok(Self::from_handle(self.handle.retain()?))
    }

    /// Hands the reference back to the caller without decrementing it.
    ///
    /// The caller becomes responsible for the reference unit, typically by passing it on to
    /// native code which takes ownership.
    pub fn into_raw(self) -> HandleResult<NonNull<c_void>> {
        let address = self.handle.detach().ok_or(HandleError::InvalidHandle)?;
        // Nothing left to release.
        self.mark(Lifecycle::FINALIZE_SUPPRESSED);
        Ok(address)
    }
}

impl Drop for ObjectRef {
    fn drop(&mut self) {
        if !self.lifecycle().contains(Lifecycle::FINALIZE_SUPPRESSED) {
            self.finalize();
        }
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("handle", &self.handle)
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}

/// Implemented by types built around an [`ObjectRef`], such as images or operations.
///
/// The wrapping type only supplies the embedded reference and inherits handle access and
/// disposal. Types that hold further native resources override
/// [`dispose()`](NativeObject::dispose), free those resources and then call
/// `self.object_ref().dispose()` to give the reference back.
pub trait NativeObject {
    fn object_ref(&self) -> &ObjectRef;

    #[inline]
    fn handle(&self) -> HandleResult<NonNull<c_void>> {
        self.object_ref().handle()
    }

    #[inline]
    fn dispose(&self) {
        self.object_ref().dispose()
    }

    #[inline]
    fn is_released(&self) -> bool {
        self.object_ref().is_released()
    }
}

impl NativeObject for ObjectRef {
    #[inline]
    fn object_ref(&self) -> &ObjectRef {
        self
    }
}
