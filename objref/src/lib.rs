//! Safe ownership of reference counted native objects handed to managed runtimes
//!
//! A native object system such as [GObject] keeps its own reference count. This crate owns one
//! unit of that count per wrapper and gives it back exactly once, whether the owner disposes
//! explicitly, a garbage collector runs a finalizer, or the wrapper is simply dropped.
//!
//! [GObject]: https://docs.gtk.org/gobject/
pub extern crate objref_sys;
pub use objref_sys as ffi;

mod api;
pub mod bridge;
pub mod handle;
#[cfg(test)]
mod mock;
pub mod object;
pub use api::{init_api, RefCountFns, API};

pub mod prelude {
    //! The objref prelude.
    //!
    //! Contains the types you most likely want to import anyway.
    pub use super::{
        api::API,
        handle::{HandleError, HandleResult},
        object::{NativeObject, ObjectRef},
    };
}
