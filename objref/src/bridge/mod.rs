//! C ABI for managed runtimes.
//!
//! A managed caller (a .NET `SafeHandle`, a JVM cleaner, ...) holds an opaque pointer to a
//! heap allocated [`ObjectRef`]. The pointer comes from [`objref_wrap`] or [`objref_clone`].
//!
//! [`objref_dispose`] is the managed `Dispose()`. It only borrows the wrapper, so it may be
//! called any number of times, and anything but the final release may follow it.
//!
//! The allocation itself is given back exactly once, through [`objref_finalize`] from the
//! collector's finalizer or through [`objref_free`] from the managed handle's release hook.
//! Either one still releases the native reference if nobody disposed it. Suppressing the
//! managed finalizer after `Dispose()` is optional: a finalizer that runs anyway finds the
//! wrapper already released and only frees the allocation.
//!
//! Borrowing calls ([`objref_handle`], [`objref_clone`], [`objref_is_live`],
//! [`objref_dispose`]) may run on any thread, but never concurrently with or after the call
//! that frees the pointer. The managed side enforces this the usual way: the finalizer only
//! runs on unreachable objects, and the release hook only runs once in-flight native calls
//! are done.

use std::ffi::c_void;
use std::sync::Arc;

use crate::handle::HandleError;
use crate::object::ObjectRef;


/// Outcome of a bridge call.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeStatus {
    Ok = 0,
    NullPointer = 1,
    InvalidHandle = 2,
    NoApi = 3,
    RefFailed = 4,
}

impl From<HandleError> for BridgeStatus {
    fn from(error: HandleError) -> Self {
        match error {
            HandleError::InvalidHandle => BridgeStatus::InvalidHandle,
            HandleError::NullAddress => BridgeStatus::NullPointer,
            HandleError::NoApi => BridgeStatus::NoApi,
            HandleError::RefFailed => BridgeStatus::RefFailed,
        }
    }
}

/// Moves a wrapper to the heap and returns the owning pointer.
fn into_ptr(object: ObjectRef) -> *const ObjectRef {
    Arc::into_raw(Arc::new(object))
}

/// Borrows the wrapper behind `ptr`.
///
/// # Safety
/// `ptr` must be null or come from [`into_ptr`] and not have been freed yet.
unsafe fn as_ref<'a>(ptr: *const ObjectRef) -> Option<&'a ObjectRef> {
    ptr.as_ref()
}

/// Takes back the owning pointer.
///
/// # Safety
/// See [`as_ref`]. The pointer must not be used afterwards.
unsafe fn from_ptr(ptr: *const ObjectRef) -> Option<Arc<ObjectRef>> {
    if ptr.is_null() {
        None
    } else {
        Some(Arc::from_raw(ptr))
    }
}

/// Takes ownership of the reference carried by `address` and stores the wrapper in `out`.
///
/// On failure `out` is set to null and, for a non-null `address`, the reference is still
/// the caller's.
///
/// # Safety
/// `address` must be null or carry one reference unit countable by the installed table.
/// `out` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn objref_wrap(
    address: *mut c_void,
    out: *mut *const ObjectRef,
) -> BridgeStatus {
    if out.is_null() {
        return BridgeStatus::NullPointer;
    }
    match ObjectRef::from_raw(address) {
        Ok(object) => {
            out.write(into_ptr(object));
            BridgeStatus::Ok
        }
        Err(error) => {
            out.write(std::ptr::null());
            error.into()
        }
    }
}

/// Writes the native address to `out`, or fails with `InvalidHandle` once disposed.
///
/// # Safety
/// `wrapper` must be null or a live pointer from this module; `out` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn objref_handle(
    wrapper: *const ObjectRef,
    out: *mut *mut c_void,
) -> BridgeStatus {
    let Some(object) = as_ref(wrapper) else {
        return BridgeStatus::NullPointer;
    };
    if out.is_null() {
        return BridgeStatus::NullPointer;
    }
    match object.handle() {
        Ok(address) => {
            out.write(address.as_ptr());
            BridgeStatus::Ok
        }
        Err(error) => {
            out.write(std::ptr::null_mut());
            error.into()
        }
    }
}

/// Acquires a second reference to the same object, wrapped independently.
///
/// # Safety
/// See [`objref_handle`].
#[no_mangle]
pub unsafe extern "C" fn objref_clone(
    wrapper: *const ObjectRef,
    out: *mut *const ObjectRef,
) -> BridgeStatus {
    let Some(object) = as_ref(wrapper) else {
        return BridgeStatus::NullPointer;
    };
    if out.is_null() {
        return BridgeStatus::NullPointer;
    }
    match object.try_clone() {
        Ok(clone) => {
            out.write(into_ptr(clone));
            BridgeStatus::Ok
        }
        Err(error) => {
            out.write(std::ptr::null());
            error.into()
        }
    }
}

/// Whether the wrapper still holds its reference. False for null.
///
/// # Safety
/// `wrapper` must be null or a live pointer from this module.
#[no_mangle]
pub unsafe extern "C" fn objref_is_live(wrapper: *const ObjectRef) -> bool {
    as_ref(wrapper).is_some_and(ObjectRef::is_live)
}

/// The managed `Dispose()`: releases the native reference now.
///
/// Idempotent. The wrapper stays allocated, so later borrowing calls report a released
/// object, and it still has to be freed by [`objref_finalize`] or [`objref_free`].
///
/// # Safety
/// `wrapper` must be null or a live pointer from this module.
#[no_mangle]
pub unsafe extern "C" fn objref_dispose(wrapper: *const ObjectRef) {
    if let Some(object) = as_ref(wrapper) {
        object.dispose();
    }
}

/// The managed finalizer: releases the reference unless already disposed, and frees the
/// wrapper.
///
/// # Safety
/// `wrapper` must be null or a pointer from this module that hasn't been freed yet. The
/// pointer must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn objref_finalize(wrapper: *const ObjectRef) {
    if let Some(object) = from_ptr(wrapper) {
        object.finalize();
    }
}

/// Frees the wrapper, releasing the reference if it's still held.
///
/// For managed handles whose release hook runs instead of a finalizer.
///
/// # Safety
/// See [`objref_finalize`].
#[no_mangle]
pub unsafe extern "C" fn objref_free(wrapper: *const ObjectRef) {
    drop(from_ptr(wrapper));
}
