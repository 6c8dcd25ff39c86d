//! Defines the physical binary layout of a Refcode stream.
//!
//! # Stream Layout
//! A stream is a plain concatenation of primitives with no header:
//!
//! `[Slot n-1] [Slot n-2] ... [Slot 1] [Root]`
//!
//! The root is always the last primitive. A reference `r` inside any primitive
//! denotes the primitive at zero-based position `r` of the stream.
//!
//! ## Primitive Anatomy
//! Every primitive starts with a single format byte. The 256 byte values are
//! partitioned exactly once between the codes below; some codes carry a small
//! payload in their low bits (inline integers, short lengths, small references).
//! All multi-byte payload fields are little-endian.

/// Reference to slot 0..=63, carried in the low six bits.
pub const REF6_MAX: u8 = 0x3f;
/// Reference with a one-byte index.
pub const REF8: u8 = 0x40;
/// Base of fixed-length arrays of 1..=31 elements.
pub const FARRAY: u8 = 0x40;
/// Reference with a two-byte index.
pub const REF16: u8 = 0x60;
/// Base of fixed-length data of 1..=15 bytes.
pub const FDATA: u8 = 0x60;
/// Reference with a four-byte index.
pub const REF32: u8 = 0x70;
/// Base of fixed-length strings of 1..=15 bytes.
pub const FSTRING: u8 = 0x70;
/// Base of inline non-negative integers 0..=63.
pub const POS_INT6: u8 = 0x80;
/// Boolean false.
pub const FALSE: u8 = 0xc0;
/// Boolean true.
pub const TRUE: u8 = 0xc1;
/// The nil value.
pub const NIL: u8 = 0xc2;
/// Signed 8-bit integer.
pub const INT8: u8 = 0xc3;
/// Signed 16-bit integer.
pub const INT16: u8 = 0xc4;
/// Signed 32-bit integer.
pub const INT32: u8 = 0xc5;
/// Signed 64-bit integer.
pub const INT64: u8 = 0xc6;
/// Unsigned 8-bit integer.
pub const UINT8: u8 = 0xc7;
/// Unsigned 16-bit integer.
pub const UINT16: u8 = 0xc8;
/// Unsigned 32-bit integer.
pub const UINT32: u8 = 0xc9;
/// Unsigned 64-bit integer.
pub const UINT64: u8 = 0xca;
/// IEEE 754 binary32.
pub const FLOAT32: u8 = 0xcb;
/// IEEE 754 binary64.
pub const FLOAT64: u8 = 0xcc;
/// NUL-terminated string.
pub const VSTRING: u8 = 0xcd;
/// The empty string.
pub const ESTRING: u8 = 0xce;
/// Terminator of a variable-length array.
pub const SENTINEL: u8 = 0xcf;
/// Data with a one-byte length.
pub const VDATA8: u8 = 0xd0;
/// Data with a two-byte length.
pub const VDATA16: u8 = 0xd1;
/// Data with a four-byte length.
pub const VDATA32: u8 = 0xd2;
/// Empty data.
pub const EDATA: u8 = 0xd3;
/// Sentinel-terminated array.
pub const VARRAY: u8 = 0xd4;
/// The empty array.
pub const EARRAY: u8 = 0xd5;
/// A map, followed by one array primitive holding alternating keys and values.
pub const MAP: u8 = 0xd6;
/// The empty map.
pub const EMAP: u8 = 0xd7;
/// A type-identified value, followed by the name primitive and the value primitive.
pub const TYPE_ID: u8 = 0xd8;
/// Data with an eight-byte length.
pub const VDATA64: u8 = 0xd9;
/// First byte of the inline negative integers -32..=-1 (two's complement).
pub const NEG_INT5_MIN: u8 = 0xe0;

/// Longest array encoded with a fixed length code.
pub const FARRAY_MAX_LEN: usize = 0x1f;
/// Longest blob encoded with a fixed length code.
pub const FDATA_MAX_LEN: usize = 0x0f;
/// Longest string encoded with a fixed length code.
pub const FSTRING_MAX_LEN: usize = 0x0f;

/// Classification of a single format byte.
///
/// [`Tag::classify`] is total: every byte maps to exactly one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Reference 0..=63 carried inline.
    Ref6(u8),
    /// Reference with a one-byte index.
    Ref8,
    /// Reference with a two-byte index.
    Ref16,
    /// Reference with a four-byte index.
    Ref32,
    /// Inline integer 0..=63.
    PosInt6(u8),
    /// Inline integer -32..=-1.
    NegInt5(i8),
    /// Boolean false.
    False,
    /// Boolean true.
    True,
    /// Nil.
    Nil,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 8-bit integer.
    UInt8,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Unsigned 64-bit integer.
    UInt64,
    /// Single-precision float.
    Float32,
    /// Double-precision float.
    Float64,
    /// String of 1..=15 bytes.
    FString(u8),
    /// NUL-terminated string.
    VString,
    /// Empty string.
    EString,
    /// Data of 1..=15 bytes.
    FData(u8),
    /// Data with a one-byte length.
    VData8,
    /// Data with a two-byte length.
    VData16,
    /// Data with a four-byte length.
    VData32,
    /// Data with an eight-byte length.
    VData64,
    /// Empty data.
    EData,
    /// Array of 1..=31 elements.
    FArray(u8),
    /// Sentinel-terminated array.
    VArray,
    /// Empty array.
    EArray,
    /// Map wrapping an array.
    Map,
    /// Empty map.
    EMap,
    /// Type-identified value.
    TypeId,
    /// Variable-length array terminator.
    Sentinel,
    /// Unassigned code.
    Reserved(u8),
}

impl Tag {
    /// Classifies a format byte.
    pub fn classify(byte: u8) -> Self {
        match byte {
            0x00..=REF6_MAX => Self::Ref6(byte),
            REF8 => Self::Ref8,
            0x41..=0x5f => Self::FArray(byte & 0x1f),
            REF16 => Self::Ref16,
            0x61..=0x6f => Self::FData(byte & 0x0f),
            REF32 => Self::Ref32,
            0x71..=0x7f => Self::FString(byte & 0x0f),
            0x80..=0xbf => Self::PosInt6(byte & 0x3f),
            FALSE => Self::False,
            TRUE => Self::True,
            NIL => Self::Nil,
            INT8 => Self::Int8,
            INT16 => Self::Int16,
            INT32 => Self::Int32,
            INT64 => Self::Int64,
            UINT8 => Self::UInt8,
            UINT16 => Self::UInt16,
            UINT32 => Self::UInt32,
            UINT64 => Self::UInt64,
            FLOAT32 => Self::Float32,
            FLOAT64 => Self::Float64,
            VSTRING => Self::VString,
            ESTRING => Self::EString,
            SENTINEL => Self::Sentinel,
            VDATA8 => Self::VData8,
            VDATA16 => Self::VData16,
            VDATA32 => Self::VData32,
            EDATA => Self::EData,
            VARRAY => Self::VArray,
            EARRAY => Self::EArray,
            MAP => Self::Map,
            EMAP => Self::EMap,
            TYPE_ID => Self::TypeId,
            VDATA64 => Self::VData64,
            0xda..=0xdf => Self::Reserved(byte),
            NEG_INT5_MIN..=0xff => Self::NegInt5(byte as i8),
        }
    }

    /// Whether the byte is unassigned.
    pub fn is_reserved(&self) -> bool {
        matches!(self, Self::Reserved(_))
    }
}
