//! Write-side graph machinery.
//!
//! Serialization happens in two phases. The [`Indexer`] walks the object graph
//! depth-first, assigns every distinct object and string a slot, and stores one
//! primitive per slot in which nested values appear as promises. The resolver
//! then turns each promise into a numbered back-reference and fixes the
//! physical order in which slots are written.

/// Defines the `Archiver` handed to `Archive::archive`.
pub mod archiver;
/// Defines the `SlotId` type.
pub mod id;
/// Defines the `Indexer`.
pub mod indexer;
/// Turns promises into references.
pub mod resolver;

pub use archiver::Archiver;
pub use id::SlotId;
pub use indexer::Indexer;
pub use resolver::ResolvedGraph;
