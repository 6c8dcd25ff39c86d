//! Tools for inspecting the physical structure of encoded streams.
//! Useful for debugging deduplication and verifying reference layouts.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::primitive::Primitive;

/// A structural report of an encoded stream.
#[derive(Debug, Clone, Serialize)]
pub struct InspectionReport {
    /// Total size of the stream in bytes.
    pub byte_length: u64,
    /// Number of top-level primitives (slots).
    pub slot_count: usize,
    /// Kind of the root primitive.
    pub root_kind: String,
    /// How many slots hold each primitive kind.
    pub kinds: BTreeMap<String, usize>,
    /// Every slot, in stream order.
    pub slots: Vec<SlotInfo>,
}

/// One top-level primitive.
#[derive(Debug, Clone, Serialize)]
pub struct SlotInfo {
    /// Position in the stream; what references to this slot carry.
    pub position: usize,
    /// Allocation order while indexing; 0 is the root.
    pub logical_id: usize,
    /// Primitive kind.
    pub kind: String,
    /// Rendered content, references shown as `@n`.
    pub summary: String,
}

impl InspectionReport {
    /// The root slot, which is always last.
    pub fn root(&self) -> Option<&SlotInfo> {
        self.slots.last()
    }

    /// Number of slots holding `kind`.
    pub fn count(&self, kind: &str) -> usize {
        self.kinds.get(kind).copied().unwrap_or(0)
    }
}

/// Summaries longer than this are cut.
const SUMMARY_LIMIT: usize = 120;

pub(crate) fn report(byte_length: u64, table: &[Primitive]) -> InspectionReport {
    let n = table.len();
    let mut kinds = BTreeMap::new();
    let slots = table
        .iter()
        .enumerate()
        .map(|(position, p)| {
            *kinds.entry(p.kind().to_owned()).or_insert(0) += 1;
            SlotInfo {
                position,
                logical_id: n - 1 - position,
                kind: p.kind().to_owned(),
                summary: summarize(p),
            }
        })
        .collect();

    InspectionReport {
        byte_length,
        slot_count: n,
        root_kind: table.last().map_or("none", Primitive::kind).to_owned(),
        kinds,
        slots,
    }
}

fn summarize(p: &Primitive) -> String {
    let mut text = p.to_string();
    if text.len() > SUMMARY_LIMIT {
        let mut cut = SUMMARY_LIMIT;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("...");
    }
    text
}
