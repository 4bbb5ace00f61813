//! An in-process stand-in for a native reference counted object system.
//!
//! Objects are bookkeeping records keyed by address, so tests can use made up addresses
//! (`0xAAAA`) and inspect every call the wrapper makes. Each test allocates its own
//! addresses, which keeps parallel tests from observing each other.

use std::collections::HashMap;
use std::ffi::c_void;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{LazyLock, Mutex, MutexGuard};

use crate::api::{RefCountFns, API};

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct MockObject {
    pub refcount: usize,
    pub ref_calls: usize,
    pub unref_calls: usize,
    /// Unrefs that arrived after the count already hit zero.
    pub over_released: usize,
    pub freed: bool,
}

static OBJECTS: LazyLock<Mutex<HashMap<usize, MockObject>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

// Well away from anything a test spells out by hand.
static NEXT_ADDRESS: AtomicUsize = AtomicUsize::new(0x1000_0000);

pub(crate) static MOCK_FNS: RefCountFns = RefCountFns {
    ref_object: mock_ref,
    unref_object: mock_unref,
};

fn objects() -> MutexGuard<'static, HashMap<usize, MockObject>> {
    // A failed assertion elsewhere must not hide the bookkeeping from other tests.
    OBJECTS.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

unsafe extern "C" fn mock_ref(object: *mut c_void) -> *mut c_void {
    let mut objects = objects();
    match objects.get_mut(&(object as usize)) {
        Some(entry) if !entry.freed => {
            entry.refcount += 1;
            entry.ref_calls += 1;
            object
        }
        _ => ptr::null_mut(),
    }
}

unsafe extern "C" fn mock_unref(object: *mut c_void) {
    let mut objects = objects();
    let entry = objects.entry(object as usize).or_default();
    entry.unref_calls += 1;
    if entry.refcount == 0 {
        entry.over_released += 1;
        return;
    }
    entry.refcount -= 1;
    if entry.refcount == 0 {
        entry.freed = true;
    }
}

/// The mock table, not installed globally.
pub(crate) fn api() -> API {
    API::from_fns(&MOCK_FNS)
}

/// Installs the mock table globally. Every test installs the same table, so this is idempotent.
pub(crate) fn install() -> API {
    API::install(&MOCK_FNS)
}

/// Creates a fresh object holding one reference, which the caller owns.
pub(crate) fn object() -> NonNull<c_void> {
    let address = NEXT_ADDRESS.fetch_add(0x10, Ordering::Relaxed);
    object_at(address)
}

/// Creates an object holding one reference at a fixed address.
pub(crate) fn object_at(address: usize) -> NonNull<c_void> {
    objects().insert(
        address,
        MockObject {
            refcount: 1,
            ..MockObject::default()
        },
    );
    NonNull::new(address as *mut c_void).expect("mock addresses are non-zero")
}

pub(crate) fn state(object: NonNull<c_void>) -> MockObject {
    objects()
        .get(&(object.as_ptr() as usize))
        .copied()
        .unwrap_or_default()
}

pub(crate) fn refcount(object: NonNull<c_void>) -> usize {
    state(object).refcount
}

pub(crate) fn unref_calls(object: NonNull<c_void>) -> usize {
    state(object).unref_calls
}

pub(crate) fn is_freed(object: NonNull<c_void>) -> bool {
    state(object).freed
}
