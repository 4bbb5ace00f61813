//! Ownership of a single native reference.

use std::ffi::c_void;
use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering};

use log::{debug, trace, warn};

use crate::api::API;

mod errors;
pub use self::errors::{HandleError, HandleResult};

#[cfg(test)]
mod tests;

/// One reference unit on a native object.
///
/// A non-null address means this handle owns exactly one reference which it must give back.
/// The address is cleared with a single atomic swap, so of any number of racing
/// [`release()`](NativeHandle::release) calls exactly one sees the old address and performs
/// the native decrement.
pub struct NativeHandle {
    address: AtomicPtr<c_void>,
    api: API,
}

impl NativeHandle {
    /// Takes ownership of the reference carried by `address`.
    ///
    /// # Safety
    /// `address` must carry one reference unit transferred to the caller, countable by `api`.
    #[inline]
    pub unsafe fn acquire(api: API, address: NonNull<c_void>) -> Self {
        debug!("acquired reference {:p}", address);
        Self {
            address: AtomicPtr::new(address.as_ptr()),
            api,
        }
    }

    /// Like [`acquire()`](NativeHandle::acquire), but reports a null `address`.
    ///
    /// # Safety
    /// See [`acquire()`](NativeHandle::acquire).
    pub unsafe fn from_raw(api: API, address: *mut c_void) -> HandleResult<Self> {
        let address = NonNull::new(address).ok_or(HandleError::NullAddress)?;
        Ok(Self::acquire(api, address))
    }

    /// Whether the reference is still held.
    #[inline]
    pub fn is_valid(&self) -> bool {
        !self.address.load(Ordering::Acquire).is_null()
    }

    /// Returns the address while the reference is still held.
    ///
    /// The address stays valid only until this handle is released; callers that race a
    /// release must keep their own reference (see [`retain()`](NativeHandle::retain)).
    #[inline]
    pub fn get(&self) -> HandleResult<NonNull<c_void>> {
        NonNull::new(self.address.load(Ordering::Acquire)).ok_or(HandleError::InvalidHandle)
    }

    /// The table this handle was acquired with.
    #[inline]
    pub fn api(&self) -> API {
        self.api
    }

    /// Gives up ownership without touching the native reference count.
    ///
    /// Returns the address if this call was the one to clear it.
    #[inline]
    pub fn detach(&self) -> Option<NonNull<c_void>> {
        NonNull::new(self.address.swap(ptr::null_mut(), Ordering::AcqRel))
    }

    /// Gives the reference back to the native library.
    ///
    /// Idempotent: only the first call on a valid handle decrements, later (or losing
    /// concurrent) calls do nothing. Returns whether this call performed the decrement.
    pub fn release(&self) -> bool {
        match self.detach() {
            Some(address) => {
                // SAFETY: the swap handed us the one reference unit this handle owned.
                unsafe { self.api.unref_object(address) };
                debug!("released reference {:p}", address);
                true
            }
            None => {
                trace!("release of an already released handle");
                false
            }
        }
    }

    /// Adds a reference to the same object and wraps it in an independent handle.
    pub fn retain(&self) -> HandleResult<NativeHandle> {
        let address = self.get()?;
        // SAFETY: `address` is backed by the reference this handle still owns.
        let new = unsafe { self.api.ref_object(address) };
        match NonNull::new(new) {
            Some(new) => Ok(unsafe { NativeHandle::acquire(self.api, new) }),
            None => {
                warn!("adding a reference to {:p} failed", address);
                Err(HandleError::RefFailed)
            }
        }
    }
}

impl Drop for NativeHandle {
    #[inline]
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("address", &self.address.load(Ordering::Relaxed))
            .finish()
    }
}
