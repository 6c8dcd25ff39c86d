use std::collections::HashMap;

use tracing::trace;

use super::archiver::Archiver;
use super::id::SlotId;
use super::resolver::ResolvedGraph;
use crate::archive::{Archive, Identity};
use crate::error::{FormatError, RefcodeError, Result};
use crate::primitive::Primitive;

/// Walks an object graph and assigns each distinct value a slot.
///
/// Reference-like values are deduplicated by address and strings by content,
/// so every shared object is written once and cycles terminate: a slot is
/// registered before its contents are archived, and a revisit finds it.
///
/// Per-value failures do not abort the walk. The first one is kept and
/// returned by [`Indexer::finish`].
#[derive(Debug)]
pub struct Indexer {
    slots: Vec<Option<Primitive>>,
    objects: HashMap<usize, SlotId>,
    strings: HashMap<String, SlotId>,
    identified: HashMap<(SlotId, &'static str), SlotId>,
    depth: usize,
    max_depth: usize,
    error: Option<RefcodeError>,
}

impl Indexer {
    /// Creates an empty indexer.
    pub fn new(max_depth: usize) -> Self {
        Self {
            slots: Vec::new(),
            objects: HashMap::new(),
            strings: HashMap::new(),
            identified: HashMap::new(),
            depth: 0,
            max_depth,
            error: None,
        }
    }

    /// Number of slots allocated so far.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether nothing has been indexed yet.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Indexes `value`, returning the slot that holds it.
    ///
    /// A value whose identity was seen before returns the existing slot without
    /// being archived again.
    pub fn index<T: Archive + ?Sized>(&mut self, value: &T) -> SlotId {
        let identity = value.identity();
        match identity {
            Identity::Address(addr) => {
                if let Some(&id) = self.objects.get(&addr) {
                    trace!(slot = %id, "object already indexed");
                    return id;
                }
            }
            Identity::Text(text) => {
                if let Some(&id) = self.strings.get(text) {
                    trace!(slot = %id, "string already indexed");
                    return id;
                }
            }
            Identity::None => {}
        }

        let id = self.allocate();
        match identity {
            Identity::Address(addr) => {
                self.objects.insert(addr, id);
            }
            Identity::Text(text) => {
                self.strings.insert(text.to_owned(), id);
            }
            Identity::None => {}
        }

        if self.depth >= self.max_depth {
            self.signal_error(RefcodeError::DepthLimitExceeded(self.max_depth));
            self.fill(id, Primitive::Nil);
            return id;
        }

        self.depth += 1;
        let mut out = Archiver::new(self);
        value.archive(&mut out);
        let primitive = out.finish();
        self.depth -= 1;

        self.fill(id, primitive);
        id
    }

    /// Indexes `value` wrapped with its type identifier.
    ///
    /// The value itself lands in its usual slot; the wrapper gets its own slot,
    /// shared by every identified use of the same value.
    pub fn index_identified<T: Archive + ?Sized>(&mut self, value: &T) -> SlotId {
        let target = self.index(value);
        let Some(name) = value.type_identifier() else {
            self.signal_error(RefcodeError::UnidentifiableType(std::any::type_name::<T>()));
            return target;
        };
        if let Some(&id) = self.identified.get(&(target, name)) {
            return id;
        }

        let name_slot = self.index(name);
        let id = self.allocate();
        self.identified.insert((target, name), id);
        trace!(slot = %id, type_id = name, "type-identified wrapper");
        self.fill(
            id,
            Primitive::identified(Primitive::Promised(name_slot), Primitive::Promised(target)),
        );
        id
    }

    /// Indexes `value` through its own indexing hook and returns the promise
    /// that stands for it inside an enclosing primitive.
    pub fn promise<T: Archive + ?Sized>(&mut self, value: &T) -> Primitive {
        Primitive::Promised(value.index(self))
    }

    /// Records a failure; only the first one is kept.
    pub fn signal_error(&mut self, err: RefcodeError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Ends indexing and resolves every promise.
    pub fn finish(self) -> Result<ResolvedGraph> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let slots = self
            .slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.ok_or_else(|| RefcodeError::Internal(format!("slot {i} was never filled")))
            })
            .collect::<Result<Vec<_>>>()?;
        ResolvedGraph::resolve(slots)
    }

    fn allocate(&mut self) -> SlotId {
        let next = self.slots.len();
        let id = match u32::try_from(next) {
            Ok(n) if n < u32::MAX => SlotId::new(n),
            _ => {
                self.signal_error(FormatError::ReferenceOverflow(next).into());
                SlotId::new(u32::MAX)
            }
        };
        if id.index() == next {
            self.slots.push(None);
        }
        id
    }

    fn fill(&mut self, id: SlotId, primitive: Primitive) {
        if let Some(slot) = self.slots.get_mut(id.index()) {
            *slot = Some(primitive);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_are_deduplicated_by_content() {
        let mut indexer = Indexer::new(16);
        let a = indexer.index("shared");
        let b = indexer.index(&String::from("shared"));
        let c = indexer.index("other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(indexer.len(), 2);
    }

    #[test]
    fn plain_values_are_not_deduplicated() {
        let mut indexer = Indexer::new(16);
        let a = indexer.index(&7i32);
        let b = indexer.index(&7i32);
        assert_ne!(a, b);
    }

    #[test]
    fn first_error_wins() {
        let mut indexer = Indexer::new(16);
        indexer.index(&1u8);
        indexer.signal_error(RefcodeError::Internal("first".into()));
        indexer.signal_error(RefcodeError::Internal("second".into()));
        assert!(matches!(indexer.finish(), Err(RefcodeError::Internal(m)) if m == "first"));
    }
}
