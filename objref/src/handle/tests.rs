use std::ffi::c_void;
use std::ptr;
use std::sync::Barrier;
use std::thread;

use ntest::timeout;

use crate::handle::{HandleError, NativeHandle};
use crate::mock;

#[test]
fn acquired_handle_is_valid() {
    let object = mock::object();
    let handle = unsafe { NativeHandle::acquire(mock::api(), object) };

    assert!(handle.is_valid());
    assert_eq!(handle.get(), Ok(object));
    assert_eq!(mock::unref_calls(object), 0);
}

#[test]
fn from_raw_rejects_null() {
    let result = unsafe { NativeHandle::from_raw(mock::api(), ptr::null_mut::<c_void>()) };
    assert_eq!(result.unwrap_err(), HandleError::NullAddress);
}

#[test]
fn release_decrements_once() {
    let object = mock::object();
    let handle = unsafe { NativeHandle::acquire(mock::api(), object) };

    assert!(handle.release());
    assert!(!handle.release());
    assert!(!handle.release());

    assert_eq!(mock::unref_calls(object), 1);
    assert!(mock::is_freed(object));
    assert!(!handle.is_valid());
    assert_eq!(handle.get(), Err(HandleError::InvalidHandle));
}

#[test]
fn drop_releases() {
    let object = mock::object();
    {
        let _handle = unsafe { NativeHandle::acquire(mock::api(), object) };
    }
    assert_eq!(mock::unref_calls(object), 1);
}

#[test]
fn drop_after_release_is_a_no_op() {
    let object = mock::object();
    let handle = unsafe { NativeHandle::acquire(mock::api(), object) };
    handle.release();
    drop(handle);

    let state = mock::state(object);
    assert_eq!(state.unref_calls, 1);
    assert_eq!(state.over_released, 0);
}

#[test]
fn detach_hands_the_reference_back() {
    let object = mock::object();
    let handle = unsafe { NativeHandle::acquire(mock::api(), object) };

    assert_eq!(handle.detach(), Some(object));
    assert_eq!(handle.detach(), None);
    assert!(!handle.release());
    drop(handle);

    // Still ours to give back.
    assert_eq!(mock::unref_calls(object), 0);
    assert_eq!(mock::refcount(object), 1);
}

#[test]
fn retain_yields_an_independent_reference() {
    let object = mock::object();
    let first = unsafe { NativeHandle::acquire(mock::api(), object) };
    let second = first.retain().expect("object is live");

    assert_eq!(mock::refcount(object), 2);

    first.release();
    assert!(second.is_valid());
    assert!(!mock::is_freed(object));

    second.release();
    assert_eq!(mock::unref_calls(object), 2);
    assert!(mock::is_freed(object));
}

#[test]
fn retain_after_release_fails() {
    let object = mock::object();
    let handle = unsafe { NativeHandle::acquire(mock::api(), object) };
    handle.release();

    assert_eq!(handle.retain().unwrap_err(), HandleError::InvalidHandle);
    assert_eq!(mock::state(object).ref_calls, 0);
}

#[test]
fn retain_reports_native_failure() {
    // Unknown to the mock, so adding a reference fails.
    let bogus = ptr::NonNull::new(0x10 as *mut c_void).unwrap();
    let handle = unsafe { NativeHandle::acquire(mock::api(), bogus) };

    assert_eq!(handle.retain().unwrap_err(), HandleError::RefFailed);
    assert!(handle.detach().is_some());
}

#[test]
#[timeout(20000)]
fn racing_releases_decrement_once() {
    const THREADS: usize = 8;

    for _ in 0..200 {
        let object = mock::object();
        let handle = unsafe { NativeHandle::acquire(mock::api(), object) };
        let barrier = Barrier::new(THREADS);

        let winners: usize = thread::scope(|s| {
            let workers: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        handle.release() as usize
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).sum()
        });

        assert_eq!(winners, 1);
        assert_eq!(mock::unref_calls(object), 1);
        assert_eq!(mock::state(object).over_released, 0);
    }
}

#[test]
fn error_converts_to_message() {
    let message: String = HandleError::InvalidHandle.into();
    assert_eq!(message, "The handle was already released");
}
