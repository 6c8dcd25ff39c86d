//! Centralized error handling for Refcode.
//!
//! Every recoverable failure, whether it comes from the byte stream, from the
//! reconstruction of the object graph, or from the underlying I/O, is
//! represented by [`RefcodeError`] and propagated through [`Result`].
//!
//! ## Error Categories
//!
//! - **I/O Errors** ([`RefcodeError::Io`]): Low-level reader/writer failures.
//! - **Format Errors** ([`RefcodeError::Format`]): The byte stream does not follow
//!   the wire format (reserved codes, truncated payloads, stray sentinels).
//! - **Graph Errors**: The stream is well formed but cannot be reconstructed into
//!   the requested types ([`RefcodeError::IncorrectType`], [`RefcodeError::MapFailed`],
//!   [`RefcodeError::UnknownTypeId`], ...).
//!
//! ## Contract Violations
//!
//! Misuse of the API by the caller (emitting two whole values for one object,
//! mixing keyed and whole-value output, encoding an unresolved placeholder,
//! registering a type identifier twice) is not an error condition of the data.
//! Those abort through [`contract_violation`], the only place the library panics.
//!
//! ## Example
//!
//! ```rust
//! use refcode::{Refcode, RefcodeError};
//!
//! match Refcode::from_slice::<i64>(&[]) {
//!     Err(RefcodeError::EmptyInput) => {}
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use std::io;
use std::sync::Arc;

/// A specialized `Result` type for Refcode operations.
pub type Result<T> = std::result::Result<T, RefcodeError>;

/// The master error enum covering all failure domains in Refcode.
///
/// This type is `Clone` so that the first failure observed during a graph walk
/// can be stored and re-raised later. I/O errors are wrapped in `Arc` for that.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RefcodeError {
    /// Low-level I/O failure of the underlying reader or writer.
    #[error("I/O error: {0}")]
    Io(#[source] Arc<io::Error>),

    /// The byte stream violates the wire format.
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    /// The input contains no primitives at all, so there is no root.
    #[error("empty input: the stream contains no primitives")]
    EmptyInput,

    /// A primitive of one kind was found where another was required.
    #[error("incorrect type: expected {expected}, found {found}")]
    IncorrectType {
        /// What the reading type asked for.
        expected: String,
        /// The kind of primitive actually present.
        found: &'static str,
    },

    /// A numeric value does not fit the requested Rust type.
    #[error("conversion failed: {value} does not fit in {target}")]
    ConversionFailed {
        /// Rendered source value.
        value: String,
        /// Name of the requested type.
        target: &'static str,
    },

    /// A `TypeIdentified` value names a type that is not registered for the
    /// requested handle type.
    #[error("unknown type identifier '{0}'")]
    UnknownTypeId(String),

    /// A value requires a type identifier but its type does not provide one.
    #[error("type {0} has no type identifier")]
    UnidentifiableType(&'static str),

    /// A keyed object lacks a required key.
    #[error("{type_name} is missing required key '{key}'")]
    MapFailed {
        /// The type being populated.
        type_name: &'static str,
        /// The missing key.
        key: String,
    },

    /// A reference points past the end of the decoded primitive table.
    #[error("reference {reference} points outside a table of {len} primitives")]
    DanglingReference {
        /// The reference number found in the stream.
        reference: u32,
        /// Number of primitives in the table.
        len: usize,
    },

    /// The object graph nests deeper than the configured limit.
    #[error("nesting depth exceeded the configured limit of {0}")]
    DepthLimitExceeded(usize),

    /// Logic error inside the library; should not occur in production.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Failures of the wire format itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// The sentinel byte appeared outside a variable-length array.
    #[error("sentinel byte outside of a variable-length array")]
    SentinelReached,

    /// A byte from the reserved range was read as a format code.
    #[error("reserved format code 0x{0:02x}")]
    ReservedCode(u8),

    /// A string payload is not valid UTF-8.
    #[error("string payload of {} bytes is not valid UTF-8", .0.len())]
    InvalidString(Vec<u8>),

    /// The primitive following a map code is not an array.
    #[error("map payload must be an array, found {0}")]
    InvalidMapArray(&'static str),

    /// The input ended in the middle of a primitive.
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof {
        /// Byte offset at which more input was expected.
        offset: u64,
    },

    /// A string too long for the length-prefixed form contains a NUL byte and
    /// cannot be written NUL-terminated.
    #[error("string of {0} bytes contains an interior NUL")]
    InteriorNul(usize),

    /// A reference number or slot count does not fit in 32 bits.
    #[error("{0} exceeds the 32-bit reference range")]
    ReferenceOverflow(usize),

    /// A 64-bit data length cannot be addressed on this platform.
    #[error("data length {0} cannot be addressed on this platform")]
    LengthOverflow(u64),
}

impl From<io::Error> for RefcodeError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

/// Aborts on caller misuse of the API.
#[cold]
#[track_caller]
#[allow(clippy::panic)]
pub(crate) fn contract_violation(message: &str) -> ! {
    panic!("refcode contract violation: {message}")
}
