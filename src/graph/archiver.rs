use super::indexer::Indexer;
use crate::archive::Archive;
use crate::error::{contract_violation, RefcodeError};
use crate::numeric::{AnyFloat, AnyInteger};
use crate::primitive::Primitive;

/// What a value has emitted so far.
#[derive(Debug)]
enum Shape {
    Empty,
    Sole(Primitive),
    Keyed(Vec<Primitive>),
}

/// The output channel handed to [`Archive::archive`].
///
/// A value either emits exactly one whole value (`integer`, `string`, `array`,
/// `value`, ...) or any number of keyed fields. Emitting a second whole value,
/// or mixing the two shapes, is a contract violation and panics. A value that
/// emits nothing is written as nil.
#[derive(Debug)]
pub struct Archiver<'i> {
    indexer: &'i mut Indexer,
    shape: Shape,
}

impl<'i> Archiver<'i> {
    pub(crate) fn new(indexer: &'i mut Indexer) -> Self {
        Self {
            indexer,
            shape: Shape::Empty,
        }
    }

    /// Emits an integer of any width.
    pub fn integer(&mut self, v: impl Into<AnyInteger>) {
        self.sole(Primitive::Integer(v.into()));
    }

    /// Emits a float, preserving its width.
    pub fn float(&mut self, v: impl Into<AnyFloat>) {
        self.sole(Primitive::Float(v.into()));
    }

    /// Emits a boolean.
    pub fn boolean(&mut self, v: bool) {
        self.sole(Primitive::Boolean(v));
    }

    /// Emits nil.
    pub fn nil(&mut self) {
        self.sole(Primitive::Nil);
    }

    /// Emits a string inline.
    ///
    /// Strings reached through [`Archiver::value`] or as keys are stored once
    /// per distinct content instead.
    pub fn string(&mut self, v: &str) {
        self.sole(Primitive::String(v.to_owned()));
    }

    /// Emits a byte blob.
    pub fn data(&mut self, v: &[u8]) {
        self.sole(Primitive::Data(v.to_vec()));
    }

    /// Emits a raw primitive.
    pub fn primitive(&mut self, p: Primitive) {
        self.sole(p);
    }

    /// Emits a reference to another value, which is indexed in its own slot.
    pub fn value<T: Archive + ?Sized>(&mut self, v: &T) {
        let p = self.indexer.promise(v);
        self.sole(p);
    }

    /// Emits a reference to the type-identified wrapper of `v`.
    pub fn identified<T: Archive + ?Sized>(&mut self, v: &T) {
        let id = self.indexer.index_identified(v);
        self.sole(Primitive::Promised(id));
    }

    /// Emits an array whose elements are indexed in their own slots.
    pub fn array<'a, T, I>(&mut self, items: I)
    where
        T: Archive + ?Sized + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let mut out = Vec::new();
        for item in items {
            out.push(self.indexer.promise(item));
        }
        self.sole(Primitive::Array(out));
    }

    /// Emits a map whose keys and values are indexed in their own slots.
    pub fn map<'a, K, V, I>(&mut self, entries: I)
    where
        K: Archive + ?Sized + 'a,
        V: Archive + ?Sized + 'a,
        I: IntoIterator<Item = (&'a K, &'a V)>,
    {
        let mut out = Vec::new();
        for (k, v) in entries {
            out.push(self.indexer.promise(k));
            out.push(self.indexer.promise(v));
        }
        self.sole(Primitive::Map(out));
    }

    /// Switches to keyed output. A value with no fields is written as an
    /// empty map rather than nil.
    pub fn keyed(&mut self) {
        match self.shape {
            Shape::Empty => self.shape = Shape::Keyed(Vec::new()),
            Shape::Keyed(_) => {}
            Shape::Sole(_) => contract_violation("keyed field emitted after a whole value"),
        }
    }

    /// Emits one keyed field.
    pub fn field<T: Archive + ?Sized>(&mut self, key: &str, v: &T) {
        self.keyed();
        let k = self.indexer.promise(key);
        let v = self.indexer.promise(v);
        if let Shape::Keyed(entries) = &mut self.shape {
            entries.push(k);
            entries.push(v);
        }
    }

    /// Records a failure of this value; serialization fails once indexing ends.
    pub fn fail(&mut self, err: RefcodeError) {
        self.indexer.signal_error(err);
    }

    pub(crate) fn finish(self) -> Primitive {
        match self.shape {
            Shape::Empty => Primitive::Nil,
            Shape::Sole(p) => p,
            Shape::Keyed(entries) => Primitive::Map(entries),
        }
    }

    fn sole(&mut self, p: Primitive) {
        match self.shape {
            Shape::Empty => self.shape = Shape::Sole(p),
            Shape::Sole(_) => contract_violation("a value emitted more than one whole value"),
            Shape::Keyed(_) => contract_violation("whole value emitted after keyed fields"),
        }
    }
}
