use std::io::Write;

use tracing::debug;

use super::id::SlotId;
use crate::codec;
use crate::error::{FormatError, Result};
use crate::io::ByteSink;
use crate::primitive::Primitive;

/// A fully indexed graph in which every promise has become a reference.
///
/// Slot `i` is written at stream position `n - 1 - i`, so the root (slot 0)
/// is the last primitive and a promise of slot `i` becomes `Reference(n - 1 - i)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGraph {
    slots: Vec<Primitive>,
}

impl ResolvedGraph {
    /// Replaces every promise in `slots` by its reference number.
    pub fn resolve(slots: Vec<Primitive>) -> Result<Self> {
        let n = slots.len();
        if u32::try_from(n).is_err() {
            return Err(FormatError::ReferenceOverflow(n).into());
        }
        let slots = slots
            .into_iter()
            .map(|p| resolve_primitive(p, n))
            .collect::<Result<Vec<_>>>()?;
        debug!(slots = n, "promises resolved");
        Ok(Self { slots })
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the graph has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The slots in logical order, root first.
    pub fn slots(&self) -> &[Primitive] {
        &self.slots
    }

    /// The slots in stream order, root last.
    pub fn into_stream_order(mut self) -> Vec<Primitive> {
        self.slots.reverse();
        self.slots
    }

    /// Encodes every slot in stream order.
    pub fn write_to<W: Write>(&self, sink: &mut ByteSink<W>) -> Result<()> {
        self.slots
            .iter()
            .rev()
            .try_for_each(|p| codec::encode(p, sink))
    }
}

/// The stream position of slot `id` in a table of `len` slots.
pub fn reference_for(id: SlotId, len: usize) -> Result<u32> {
    len.checked_sub(id.index() + 1)
        .and_then(|r| u32::try_from(r).ok())
        .ok_or_else(|| FormatError::ReferenceOverflow(id.index()).into())
}

fn resolve_primitive(p: Primitive, len: usize) -> Result<Primitive> {
    Ok(match p {
        Primitive::Promised(id) => Primitive::Reference(reference_for(id, len)?),
        Primitive::Array(items) => Primitive::Array(resolve_all(items, len)?),
        Primitive::Map(entries) => Primitive::Map(resolve_all(entries, len)?),
        Primitive::TypeIdentified(name, value) => Primitive::identified(
            resolve_primitive(*name, len)?,
            resolve_primitive(*value, len)?,
        ),
        other => other,
    })
}

fn resolve_all(items: Vec<Primitive>, len: usize) -> Result<Vec<Primitive>> {
    items.into_iter().map(|p| resolve_primitive(p, len)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promises_count_back_from_the_end() -> Result<()> {
        let graph = ResolvedGraph::resolve(vec![
            Primitive::Array(vec![
                Primitive::Promised(SlotId::new(1)),
                Primitive::Promised(SlotId::new(2)),
            ]),
            Primitive::from("a"),
            Primitive::identified(
                Primitive::Promised(SlotId::new(1)),
                Primitive::Promised(SlotId::new(0)),
            ),
        ])?;
        assert_eq!(
            graph.slots()[0],
            Primitive::Array(vec![Primitive::Reference(1), Primitive::Reference(0)])
        );
        assert_eq!(
            graph.slots()[2],
            Primitive::identified(Primitive::Reference(1), Primitive::Reference(2))
        );
        let stream = graph.into_stream_order();
        assert_eq!(stream[1], Primitive::from("a"));
        assert!(matches!(stream[2], Primitive::Array(_)));
        Ok(())
    }

    #[test]
    fn out_of_range_slot_is_rejected() {
        assert!(reference_for(SlotId::new(3), 3).is_err());
    }
}
