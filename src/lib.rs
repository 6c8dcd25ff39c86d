//! # Refcode
//!
//! A compact binary serialization format for arbitrary object graphs, including
//! graphs with shared and cyclic references.
//!
//! ## Overview
//!
//! Most serializers walk a tree. Refcode walks a graph: every shared object is
//! written once, every repeated string is written once, and a reference back to
//! an object that is still being written (a cycle) becomes a numbered
//! back-reference instead of infinite recursion. Reading reverses the process,
//! so two fields that pointed at the same `Rc` before serialization point at
//! the same `Rc` afterwards.
//!
//! ### Key Features
//!
//! *   **Self-describing primitives:** integers, floats, booleans, nil, strings,
//!     byte blobs, arrays, maps and type-identified values, each introduced by a
//!     single format byte.
//! *   **Minimal encodings:** integers pick the narrowest width, small integers,
//!     short strings, blobs and arrays and near references fit in the format
//!     byte itself.
//! *   **Deduplication:** strings by content and `Rc<RefCell<T>>` objects by
//!     address.
//! *   **Cycles:** reference-like objects are reconstructed shell-first, so a
//!     back-reference reached while the object is being filled resolves to it.
//! *   **Polymorphism:** values behind [`Poly<dyn Trait>`](Poly) are written with
//!     a type identifier and rebuilt through a [`TypeRegistry`].
//!
//! ## Architecture
//!
//! ### The Slot Table
//!
//! Serialization runs in two phases:
//!
//! 1. The [`graph::Indexer`] walks the graph depth-first from the root and
//!    assigns each distinct value a slot. Nested values inside a slot appear as
//!    promises of other slots.
//! 2. The [`graph::resolver`] replaces each promise by a reference number and
//!    writes the slots in reverse allocation order:
//!
//! ```text
//! [Slot n-1] [Slot n-2] ... [Slot 1] [Root]
//! ```
//!
//! A reference `r` denotes the primitive at position `r` of the stream; the
//! root is the last primitive.
//!
//! ### Reader
//!
//! The [`reader::Deserializer`] decodes the whole stream into a primitive table
//! and resolves the root, following references on demand and memoizing each
//! slot it has rebuilt.
//!
//! ## Usage Patterns
//!
//! ```rust
//! use std::{cell::RefCell, rc::Rc};
//! use refcode::{Refcode, RefcodeObject};
//!
//! #[derive(Default, RefcodeObject)]
//! struct Node {
//!     label: String,
//!     next: Option<Rc<RefCell<Node>>>,
//! }
//!
//! // A two-node cycle.
//! let a = Rc::new(RefCell::new(Node { label: "a".into(), next: None }));
//! let b = Rc::new(RefCell::new(Node { label: "b".into(), next: Some(a.clone()) }));
//! a.borrow_mut().next = Some(b.clone());
//!
//! let bytes = Refcode::to_vec(&a)?;
//! let back: Rc<RefCell<Node>> = Refcode::from_slice(&bytes)?;
//!
//! let next = back.borrow().next.clone().ok_or(refcode::RefcodeError::EmptyInput)?;
//! assert_eq!(next.borrow().label, "b");
//! let again = next.borrow().next.clone().ok_or(refcode::RefcodeError::EmptyInput)?;
//! assert!(Rc::ptr_eq(&again, &back));
//! # a.borrow_mut().next = None;
//! # back.borrow_mut().next = None;
//! # Ok::<(), refcode::RefcodeError>(())
//! ```
//!
//! ## Safety and Error Handling
//!
//! * **Encapsulated Unsafe:** `unsafe` is used once, to memory-map input files
//!   in [`reader::MappedInput`].
//! * **No Panics on Bad Data:** malformed input always yields a [`RefcodeError`].
//!   Panics are reserved for caller misuse of the API (see [`error`]).
//! * **Bounded Recursion:** indexing, decoding and reconstruction stop at a
//!   configurable depth instead of overflowing the stack.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

// Lets the derive macro's `refcode::` paths resolve inside this crate's own tests.
extern crate self as refcode;

// --- PUBLIC API MODULES ---
pub mod api;
pub mod archive;
pub mod codec;
pub mod error;
pub mod format;
pub mod inspector;
pub mod numeric;
pub mod primitive;
pub mod reader;
pub mod registry;

// --- INTERNAL IMPLEMENTATION MODULES (Hidden from Docs) ---
#[doc(hidden)]
pub mod graph;
#[doc(hidden)]
pub mod io;

// Private modules
mod archive_impls;
mod reader_impls;

// --- RE-EXPORTS ---

pub use api::{Refcode, RefcodeOptions};
pub use archive::{Archive, Bytes, Identity};
pub use error::{FormatError, RefcodeError, Result};
pub use inspector::InspectionReport;
pub use numeric::{AnyFloat, AnyInteger};
pub use primitive::Primitive;
pub use reader::{Populate, Unarchive};
pub use registry::{Identified, Poly, TypeRegistry};

// Re-export the derive macro so it is accessible as `refcode::RefcodeObject`
pub use refcode_derive::RefcodeObject;

/// Constants used throughout the library.
pub mod constants {
    /// The default buffer size for I/O operations.
    pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

    /// The default nesting limit for indexing, decoding and reconstruction.
    pub const DEFAULT_MAX_DEPTH: usize = 1024;
}
