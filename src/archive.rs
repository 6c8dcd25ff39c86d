//! Defines the `Archive` trait for graph indexing.
//!
//! A type that can be serialized describes itself to an [`Archiver`], either as
//! one whole value or as a set of keyed fields. The [`Indexer`] decides which
//! values get their own slot and which ones are shared.

use std::ops::{Deref, DerefMut};

use crate::graph::{Archiver, Indexer, SlotId};

/// How the indexer recognizes a value it has already seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity<'a> {
    /// Every occurrence is indexed separately.
    None,
    /// Reference-like values are shared by allocation address.
    Address(usize),
    /// Strings are shared by content.
    Text(&'a str),
}

/// A type that can be written into a Refcode graph.
///
/// `#[derive(RefcodeObject)]` implements this for structs with named fields.
/// The std impls cover numbers, booleans, strings, sequences, maps, `Option`,
/// `Box` and the shared handle `Rc<RefCell<T>>`.
pub trait Archive {
    /// Emits this value's content.
    fn archive(&self, out: &mut Archiver<'_>);

    /// Deduplication identity. Defaults to none.
    fn identity(&self) -> Identity<'_> {
        Identity::None
    }

    /// The type identifier written when this value is stored polymorphically.
    fn type_identifier(&self) -> Option<&'static str> {
        None
    }

    /// Indexes this value when it is nested inside another one.
    ///
    /// Handles that must be written type-identified override this to go
    /// through [`Indexer::index_identified`].
    fn index(&self, indexer: &mut Indexer) -> SlotId {
        indexer.index(self)
    }
}

/// An owned byte blob, written as a data primitive rather than an array of
/// integers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    /// Unwraps the byte vector.
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

impl From<&[u8]> for Bytes {
    fn from(v: &[u8]) -> Self {
        Self(v.to_vec())
    }
}

impl Deref for Bytes {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Bytes {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
