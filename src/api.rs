//! Public entry points.
//!
//! [`Refcode`] offers one-call serialization with default options.
//! [`RefcodeOptions`], obtained from [`Refcode::builder`], carries the depth
//! limit, the I/O buffer size and the [`TypeRegistry`] used for polymorphic
//! values.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::archive::Archive;
use crate::codec::PrimitiveReader;
use crate::constants::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_DEPTH};
use crate::error::Result;
use crate::graph::{Indexer, ResolvedGraph, SlotId};
use crate::inspector::{self, InspectionReport};
use crate::io::{ByteSink, ByteSource};
use crate::primitive::Primitive;
use crate::reader::{Deserializer, MappedInput, Unarchive};
use crate::registry::TypeRegistry;

/// The main entry point, using default options.
#[derive(Debug)]
pub struct Refcode;

impl Refcode {
    /// Starts configuring a serializer/deserializer.
    pub fn builder() -> RefcodeOptions {
        RefcodeOptions::default()
    }

    /// Writes the graph reachable from `root` to `writer`.
    pub fn serialize<T, W>(writer: W, root: &T) -> Result<()>
    where
        T: Archive + ?Sized,
        W: Write,
    {
        RefcodeOptions::default().serialize(writer, root)
    }

    /// Serializes `root` into a byte vector.
    pub fn to_vec<T: Archive + ?Sized>(root: &T) -> Result<Vec<u8>> {
        RefcodeOptions::default().to_vec(root)
    }

    /// Serializes `root` into the file at `path`, replacing it.
    pub fn save<T, P>(path: P, root: &T) -> Result<()>
    where
        T: Archive + ?Sized,
        P: AsRef<Path>,
    {
        RefcodeOptions::default().save(path, root)
    }

    /// Reads a graph from `reader` and returns its root.
    pub fn deserialize<T: Unarchive, R: Read>(reader: R) -> Result<T> {
        RefcodeOptions::default().deserialize(reader)
    }

    /// Reads a graph from `bytes` and returns its root.
    pub fn from_slice<T: Unarchive>(bytes: &[u8]) -> Result<T> {
        RefcodeOptions::default().from_slice(bytes)
    }

    /// Memory-maps the file at `path` and returns its root.
    pub fn load<T: Unarchive, P: AsRef<Path>>(path: P) -> Result<T> {
        RefcodeOptions::default().load(path)
    }

    /// Decodes `bytes` into a structural report without reconstructing objects.
    pub fn inspect(bytes: &[u8]) -> Result<InspectionReport> {
        RefcodeOptions::default().inspect(bytes)
    }
}

/// Configuration for serialization and deserialization.
///
/// The scalar options can be loaded from any serde format; the registry is
/// code and is always supplied programmatically.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RefcodeOptions {
    /// Maximum nesting depth while indexing, decoding and reconstructing.
    pub max_depth: usize,
    /// Capacity of the I/O buffers in bytes.
    pub buffer_size: usize,
    #[serde(skip)]
    registry: TypeRegistry,
}

impl Default for RefcodeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            buffer_size: DEFAULT_BUFFER_SIZE,
            registry: TypeRegistry::default(),
        }
    }
}

impl RefcodeOptions {
    /// Sets the nesting limit.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the I/O buffer capacity.
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Sets the registry used for type-identified values.
    pub fn registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// The registry used for type-identified values.
    pub fn type_registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Mutable access to the registry, for registering in place.
    pub fn type_registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    /// Indexes and resolves the graph reachable from `root`.
    pub fn build_graph<T: Archive + ?Sized>(&self, root: &T) -> Result<ResolvedGraph> {
        let mut indexer = Indexer::new(self.max_depth);
        let root_slot = indexer.index(root);
        debug_assert_eq!(root_slot, SlotId::ROOT);
        debug!(slots = indexer.len(), "graph indexed");
        indexer.finish()
    }

    /// Writes the graph reachable from `root` to `writer`.
    pub fn serialize<T, W>(&self, writer: W, root: &T) -> Result<()>
    where
        T: Archive + ?Sized,
        W: Write,
    {
        let graph = self.build_graph(root)?;
        let mut sink = ByteSink::new(writer, self.buffer_size);
        graph.write_to(&mut sink)?;
        sink.flush()?;
        debug!(bytes = sink.current_offset(), slots = graph.len(), "graph written");
        Ok(())
    }

    /// Serializes `root` into a byte vector.
    pub fn to_vec<T: Archive + ?Sized>(&self, root: &T) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.serialize(&mut out, root)?;
        Ok(out)
    }

    /// Serializes `root` into the file at `path`, replacing it.
    pub fn save<T, P>(&self, path: P, root: &T) -> Result<()>
    where
        T: Archive + ?Sized,
        P: AsRef<Path>,
    {
        let file = File::create(path)?;
        self.serialize(file, root)
    }

    /// Decodes every primitive of the stream, in stream order.
    pub fn decode_table<R: Read>(&self, reader: R) -> Result<Vec<Primitive>> {
        let source = ByteSource::new(reader, self.buffer_size);
        let table = PrimitiveReader::new(source, self.max_depth).read_all()?;
        debug!(primitives = table.len(), "stream decoded");
        Ok(table)
    }

    /// Reads a graph from `reader` and returns its root.
    pub fn deserialize<T: Unarchive, R: Read>(&self, reader: R) -> Result<T> {
        let table = self.decode_table(reader)?;
        self.reconstruct(&table)
    }

    /// Reads a graph from `bytes` and returns its root.
    pub fn from_slice<T: Unarchive>(&self, bytes: &[u8]) -> Result<T> {
        self.deserialize(bytes)
    }

    /// Memory-maps the file at `path` and returns its root.
    pub fn load<T: Unarchive, P: AsRef<Path>>(&self, path: P) -> Result<T> {
        let input = MappedInput::open(path)?;
        self.from_slice(&input)
    }

    /// Rebuilds the root from an already decoded table.
    pub fn reconstruct<T: Unarchive>(&self, table: &[Primitive]) -> Result<T> {
        Deserializer::new(table, &self.registry, self.max_depth)?.root()
    }

    /// Decodes `bytes` into a structural report without reconstructing objects.
    pub fn inspect(&self, bytes: &[u8]) -> Result<InspectionReport> {
        let table = self.decode_table(bytes)?;
        Ok(inspector::report(bytes.len() as u64, &table))
    }
}
