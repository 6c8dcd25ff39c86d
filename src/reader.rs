//! The Read-Side Engine.
//!
//! Rebuilds an object graph from a decoded primitive table. Resolution starts
//! at the root (the last primitive) and follows references lazily. Every slot
//! that has been reconstructed is memoized, so shared objects come back as one
//! shared `Rc` and a cycle finds the partially built object instead of
//! recursing forever.
//!
//! Two kinds of types can be read back:
//!
//! - **Value-like** types implement [`Unarchive`] and are built in one step from
//!   a [`Value`]. They cannot take part in cycles.
//! - **Reference-like** types implement [`Populate`] and are read as
//!   `Rc<RefCell<T>>`: an empty shell is created and memoized first, then its
//!   fields are filled from [`Fields`]. A back-reference reached while the
//!   fields are being filled resolves to that shell.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::ops::Deref;
use std::path::Path;

use memmap2::Mmap;
use tracing::{debug, trace};

use crate::error::{contract_violation, RefcodeError, Result};
use crate::numeric::{AnyFloat, AnyInteger};
use crate::primitive::{pairs, Primitive};
use crate::registry::TypeRegistry;

/// A type that can be rebuilt from a single primitive.
///
/// `Clone` is required because a memoized slot hands out copies of the value
/// it holds; for `Rc` handles that copy is the shared handle itself.
pub trait Unarchive: Sized + Clone + 'static {
    /// Reads the value from `value`.
    fn unarchive(value: &mut Value<'_, '_>) -> Result<Self>;
}

/// A reference-like type whose fields are filled after its shell exists.
///
/// Implemented by `#[derive(RefcodeObject)]`; read as `Rc<RefCell<Self>>`.
pub trait Populate: Default + 'static {
    /// Fills `self` from keyed fields. Failures are recorded in `fields`.
    fn populate(&mut self, fields: &mut Fields<'_, '_, '_>);
}

/// Reconstructs values from a primitive table in stream order.
pub struct Deserializer<'p> {
    table: &'p [Primitive],
    memo: Vec<Option<Box<dyn Any>>>,
    registry: &'p TypeRegistry,
    depth: usize,
    max_depth: usize,
}

impl<'p> Deserializer<'p> {
    /// Creates a deserializer; fails on an empty table since there is no root.
    pub fn new(table: &'p [Primitive], registry: &'p TypeRegistry, max_depth: usize) -> Result<Self> {
        if table.is_empty() {
            return Err(RefcodeError::EmptyInput);
        }
        Ok(Self {
            table,
            memo: std::iter::repeat_with(|| None).take(table.len()).collect(),
            registry,
            depth: 0,
            max_depth,
        })
    }

    /// Reads the root object, the last primitive of the table.
    pub fn root<T: Unarchive>(&mut self) -> Result<T> {
        let root = self.table.len() - 1;
        let value = self.resolve_index(root)?;
        debug!(slots = self.table.len(), root_type = type_name::<T>(), "root resolved");
        Ok(value)
    }

    /// Reads the primitive at stream position `index` as `T`.
    pub fn resolve_index<T: Unarchive>(&mut self, index: usize) -> Result<T> {
        let table = self.table;
        let primitive = table.get(index).ok_or(RefcodeError::DanglingReference {
            reference: u32::try_from(index).unwrap_or(u32::MAX),
            len: table.len(),
        })?;
        self.resolve(Some(index), primitive)
    }

    /// Reads `primitive` as `T`. `index` is its table position when it is a
    /// whole slot, or `None` for values nested inline in another primitive.
    pub(crate) fn resolve<T: Unarchive>(&mut self, index: Option<usize>, primitive: &'p Primitive) -> Result<T> {
        if self.depth >= self.max_depth {
            return Err(RefcodeError::DepthLimitExceeded(self.max_depth));
        }
        self.depth += 1;
        let result = self.resolve_inner(index, primitive);
        self.depth -= 1;
        result
    }

    fn resolve_inner<T: Unarchive>(&mut self, index: Option<usize>, primitive: &'p Primitive) -> Result<T> {
        if let Some(i) = index {
            if let Some(hit) = self.recall::<T>(i) {
                trace!(slot = i, "memo hit");
                return Ok(hit);
            }
        }

        let value = match primitive {
            Primitive::Reference(r) => return self.resolve_index(*r as usize),
            Primitive::TypeIdentified(name, inner) => {
                let name: String = self.resolve(None, &**name)?;
                let registry = self.registry;
                match registry.decoder::<T>(&name) {
                    Some(decode) => {
                        trace!(type_id = %name, "type-identified value");
                        decode(self, &**inner)?
                    }
                    // Wrappers such as `Option<Poly<_>>` decode this same slot
                    // as their inner handle, which may be registered.
                    None => {
                        let mut value = Value::new(self, index, primitive, type_name::<T>());
                        value.type_id = Some(name);
                        T::unarchive(&mut value)?
                    }
                }
            }
            _ => {
                let mut value = Value::new(self, index, primitive, type_name::<T>());
                T::unarchive(&mut value)?
            }
        };

        if let Some(i) = index {
            self.memoize(i, value.clone());
        }
        Ok(value)
    }

    fn recall<T: Clone + 'static>(&self, index: usize) -> Option<T> {
        self.memo
            .get(index)?
            .as_deref()?
            .downcast_ref::<T>()
            .cloned()
    }

    // A slot keeps the first value stored for it. Later values of other types
    // decoded from the same slot (an `Option<T>` around a `T`) are not stored.
    fn memoize<T: 'static>(&mut self, index: usize, value: T) {
        if let Some(slot) = self.memo.get_mut(index) {
            if slot.is_none() {
                *slot = Some(Box::new(value));
            }
        }
    }
}

impl fmt::Debug for Deserializer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deserializer")
            .field("slots", &self.table.len())
            .field("memoized", &self.memo.iter().filter(|m| m.is_some()).count())
            .field("depth", &self.depth)
            .finish()
    }
}

enum State<'p> {
    Unknown,
    Completed,
    Mapping(HashMap<String, &'p Primitive>),
}

/// One primitive being read as a particular type.
///
/// A value is consumed either whole (the scalar and collection accessors) or
/// by key. Keyed access after the whole value was consumed, or the reverse,
/// is a contract violation and panics.
pub struct Value<'d, 'p> {
    de: &'d mut Deserializer<'p>,
    index: Option<usize>,
    primitive: &'p Primitive,
    expected: &'static str,
    type_id: Option<String>,
    state: State<'p>,
}

impl<'d, 'p> Value<'d, 'p> {
    fn new(
        de: &'d mut Deserializer<'p>,
        index: Option<usize>,
        primitive: &'p Primitive,
        expected: &'static str,
    ) -> Self {
        Self {
            de,
            index,
            primitive,
            expected,
            type_id: None,
            state: State::Unknown,
        }
    }

    /// Peeks at the underlying primitive without consuming it.
    pub fn primitive(&self) -> &'p Primitive {
        self.primitive
    }

    /// Whether the underlying primitive is nil.
    pub fn is_nil(&self) -> bool {
        matches!(self.primitive, Primitive::Nil)
    }

    /// Name of the type being read.
    pub fn expected_type(&self) -> &'static str {
        self.expected
    }

    /// The identifier of a type-identified value that has no registry entry
    /// for the type being read.
    pub fn unregistered_type_id(&self) -> Option<&str> {
        self.type_id.as_deref()
    }

    /// Consumes the whole primitive.
    pub fn raw(&mut self) -> &'p Primitive {
        if let State::Mapping(_) = self.state {
            contract_violation("whole value read after keyed access");
        }
        self.state = State::Completed;
        self.primitive
    }

    /// Reads an integer, converting to `T` with a range check.
    pub fn integer<T: TryFrom<AnyInteger, Error = RefcodeError>>(&mut self) -> Result<T> {
        match self.raw() {
            Primitive::Integer(v) => T::try_from(*v),
            _ => Err(self.mismatch("integer")),
        }
    }

    /// Reads a float, converting to `T` when exact.
    pub fn float<T: TryFrom<AnyFloat, Error = RefcodeError>>(&mut self) -> Result<T> {
        match self.raw() {
            Primitive::Float(v) => T::try_from(*v),
            _ => Err(self.mismatch("float")),
        }
    }

    /// Reads a boolean.
    pub fn boolean(&mut self) -> Result<bool> {
        match self.raw() {
            Primitive::Boolean(v) => Ok(*v),
            _ => Err(self.mismatch("boolean")),
        }
    }

    /// Reads nil.
    pub fn nil(&mut self) -> Result<()> {
        match self.raw() {
            Primitive::Nil => Ok(()),
            _ => Err(self.mismatch("nil")),
        }
    }

    /// Borrows a string from the table.
    pub fn str(&mut self) -> Result<&'p str> {
        match self.raw() {
            Primitive::String(s) => Ok(s),
            _ => Err(self.mismatch("string")),
        }
    }

    /// Reads a string.
    pub fn string(&mut self) -> Result<String> {
        self.str().map(str::to_owned)
    }

    /// Borrows a data blob from the table.
    pub fn data(&mut self) -> Result<&'p [u8]> {
        match self.raw() {
            Primitive::Data(d) => Ok(d),
            _ => Err(self.mismatch("data")),
        }
    }

    /// Reads every element of an array as `T`.
    pub fn array<T: Unarchive>(&mut self) -> Result<Vec<T>> {
        match self.raw() {
            Primitive::Array(items) => items.iter().map(|p| self.de.resolve(None, p)).collect(),
            _ => Err(self.mismatch("array")),
        }
    }

    /// Reads every entry of a map as key/value pairs, in stream order.
    pub fn entries<K: Unarchive, V: Unarchive>(&mut self) -> Result<Vec<(K, V)>> {
        match self.raw() {
            Primitive::Map(entries) => pairs(entries)
                .map(|(k, v)| Ok((self.de.resolve(None, k)?, self.de.resolve(None, v)?)))
                .collect(),
            _ => Err(self.mismatch("map")),
        }
    }

    /// Reads this same primitive as another type.
    ///
    /// Used by wrappers such as `Option<T>` that decode the slot they stand on
    /// as their inner type.
    pub fn decode<T: Unarchive>(&mut self) -> Result<T> {
        self.de.resolve(self.index, self.primitive)
    }

    /// Memoizes `shell` as the object for this slot before its contents are
    /// read, so back-references reached meanwhile resolve to it.
    pub fn register<T: 'static>(&mut self, shell: T) {
        if let Some(i) = self.index {
            trace!(slot = i, shell = type_name::<T>(), "shell registered");
            self.de.memoize(i, shell);
        }
    }

    /// Reads the value under `key`; a missing key is an error.
    pub fn field<T: Unarchive>(&mut self, key: &str) -> Result<T> {
        self.optional_field(key)?.ok_or_else(|| RefcodeError::MapFailed {
            type_name: self.expected,
            key: key.to_owned(),
        })
    }

    /// Reads the value under `key`, or `None` when the key is absent.
    pub fn optional_field<T: Unarchive>(&mut self, key: &str) -> Result<Option<T>> {
        match self.lookup(key)? {
            Some(p) => self.de.resolve(None, p).map(Some),
            None => Ok(None),
        }
    }

    /// Whether the keyed value has `key`.
    pub fn contains_key(&mut self, key: &str) -> Result<bool> {
        Ok(self.lookup(key)?.is_some())
    }

    fn lookup(&mut self, key: &str) -> Result<Option<&'p Primitive>> {
        if let State::Unknown = self.state {
            let mapping = self.build_mapping()?;
            self.state = State::Mapping(mapping);
        }
        match &self.state {
            State::Mapping(mapping) => Ok(mapping.get(key).copied()),
            _ => contract_violation("keyed access after the whole value was read"),
        }
    }

    fn build_mapping(&mut self) -> Result<HashMap<String, &'p Primitive>> {
        let Primitive::Map(entries) = self.primitive else {
            return Err(self.mismatch("map"));
        };
        let mut mapping = HashMap::with_capacity(entries.len() / 2);
        for (k, v) in pairs(entries) {
            let key: String = self.de.resolve(None, k)?;
            mapping.insert(key, v);
        }
        Ok(mapping)
    }

    fn mismatch(&self, expected: &str) -> RefcodeError {
        if let Some(name) = &self.type_id {
            return RefcodeError::UnknownTypeId(name.clone());
        }
        RefcodeError::IncorrectType {
            expected: format!("{expected} (reading {})", self.expected),
            found: self.primitive.kind(),
        }
    }
}

impl fmt::Debug for Value<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("index", &self.index)
            .field("kind", &self.primitive.kind())
            .field("expected", &self.expected)
            .finish()
    }
}

/// Keyed access used while populating a reference-like object.
///
/// Lookups never fail directly. The first failure (missing key, type mismatch)
/// is recorded, later lookups are skipped, and the failure is raised once
/// `populate` returns.
pub struct Fields<'v, 'd, 'p> {
    value: &'v mut Value<'d, 'p>,
    owner: &'static str,
    error: Option<RefcodeError>,
}

impl<'v, 'd, 'p> Fields<'v, 'd, 'p> {
    pub(crate) fn new(value: &'v mut Value<'d, 'p>, owner: &'static str) -> Self {
        Self {
            value,
            owner,
            error: None,
        }
    }

    /// Stores the value under `key` into `slot`; a missing key is recorded as
    /// a failure and leaves `slot` untouched.
    pub fn map<T: Unarchive>(&mut self, key: &str, slot: &mut T) {
        if let Some(v) = self.get(key) {
            *slot = v;
        }
    }

    /// Like [`Fields::map`], but an absent key is not a failure.
    pub fn map_optional<T: Unarchive>(&mut self, key: &str, slot: &mut T) {
        if let Some(v) = self.get_optional(key) {
            *slot = v;
        }
    }

    /// Reads the value under `key`; a missing key is recorded as a failure.
    pub fn get<T: Unarchive>(&mut self, key: &str) -> Option<T> {
        match self.get_optional(key) {
            Some(v) => Some(v),
            None if self.error.is_none() => {
                self.signal_error(RefcodeError::MapFailed {
                    type_name: self.owner,
                    key: key.to_owned(),
                });
                None
            }
            None => None,
        }
    }

    /// Reads the value under `key`, `None` when absent.
    pub fn get_optional<T: Unarchive>(&mut self, key: &str) -> Option<T> {
        if self.error.is_some() {
            return None;
        }
        match self.value.optional_field(key) {
            Ok(v) => v,
            Err(e) => {
                self.signal_error(e);
                None
            }
        }
    }

    /// Records a failure; only the first one is kept.
    pub fn signal_error(&mut self, err: RefcodeError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Whether a failure has been recorded.
    pub fn has_failed(&self) -> bool {
        self.error.is_some()
    }

    pub(crate) fn finish(self) -> Result<()> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Fields<'_, '_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fields")
            .field("owner", &self.owner)
            .field("error", &self.error)
            .finish()
    }
}

/// A read-only memory map of an encoded file.
#[derive(Debug)]
pub struct MappedInput {
    mmap: Option<Mmap>,
}

impl MappedInput {
    /// Maps the file at `path`. Empty files are not mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(Self { mmap: None });
        }

        // Safety: the mapping is only valid while no other process truncates or
        // rewrites the file; callers own the files they load.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { mmap: Some(mmap) })
    }
}

impl Deref for MappedInput {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }
}
