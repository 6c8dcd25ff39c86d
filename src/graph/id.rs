use std::fmt;

/// Identifier of a slot in the logical table built while indexing a graph.
///
/// Slots are numbered in allocation order; the root always receives slot 0.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u32); // u32 matches the widest reference the format can express.

impl SlotId {
    /// The slot the root value is indexed into.
    pub const ROOT: Self = Self(0);

    /// Restrict visibility to the graph module to prevent arbitrary creation.
    pub(crate) fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw numeric value.
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Returns the value as a table index.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotId({})", self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
