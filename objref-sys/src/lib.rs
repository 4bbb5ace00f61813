//! Low level GObject reference counting declarations
//!
//! This crate declares the raw, unsafe entry points of the GObject type system that
//! manage an object's reference count. For a safe owner of such references, see
//! [objref](https://crates.io/crates/objref).
//!
//! ## Feature Flags
//!
//! - **`gobject-functions`** - Links to `libgobject-2.0` and declares `g_object_ref` and
//!   `g_object_unref`. Set `GOBJECT_LIB_DIR` (or `VIPSHOME` for a libvips distribution)
//!   when the library isn't on the default search path.
//!
//! Without the feature only the types are available, which is enough to describe a
//! reference counting table backed by some other library.

#![allow(non_camel_case_types)]
#![allow(clippy::missing_safety_doc)]

use std::ffi::c_void;

/// An untyped pointer, as GLib spells it.
pub type gpointer = *mut c_void;

/// Signature of a function adding one reference and returning the object.
pub type RefFunc = unsafe extern "C" fn(object: gpointer) -> gpointer;

/// Signature of a function dropping one reference, freeing the object at zero.
pub type UnrefFunc = unsafe extern "C" fn(object: gpointer);

#[cfg(feature = "gobject-functions")]
extern "C" {
    /// Increases the reference count of `object` and returns it.
    pub fn g_object_ref(object: gpointer) -> gpointer;

    /// Decreases the reference count of `object`. When it drops to 0 the object is finalized.
    pub fn g_object_unref(object: gpointer);
}
