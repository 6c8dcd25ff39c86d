//! Encoding and decoding of single primitives.
//!
//! The encoder always picks the shortest representation for a value; the
//! decoder accepts every representation. Integers prefer the signed width at
//! each size, falling back to the unsigned one only when the value needs it.

use std::io::{Read, Write};

use crate::error::{contract_violation, FormatError, RefcodeError, Result};
use crate::format::{self, Tag};
use crate::io::{ByteSink, ByteSource};
use crate::numeric::{AnyFloat, AnyInteger};
use crate::primitive::Primitive;

/// Appends the encoding of `primitive` to `sink`.
///
/// # Panics
///
/// Panics if the primitive contains an unresolved [`Primitive::Promised`]
/// placeholder; only resolved tables can be encoded.
pub fn encode<W: Write>(primitive: &Primitive, sink: &mut ByteSink<W>) -> Result<()> {
    match primitive {
        Primitive::Reference(r) => encode_reference(*r, sink),
        Primitive::Integer(v) => encode_integer(*v, sink),
        Primitive::Float(AnyFloat::Single(v)) => {
            sink.put(format::FLOAT32)?;
            sink.write_all(&v.to_le_bytes())
        }
        Primitive::Float(AnyFloat::Double(v)) => {
            sink.put(format::FLOAT64)?;
            sink.write_all(&v.to_le_bytes())
        }
        Primitive::Boolean(true) => sink.put(format::TRUE),
        Primitive::Boolean(false) => sink.put(format::FALSE),
        Primitive::Nil => sink.put(format::NIL),
        Primitive::String(s) => encode_string(s, sink),
        Primitive::Data(d) => encode_data(d, sink),
        Primitive::Array(items) => encode_array(items, sink),
        Primitive::Map(entries) if entries.is_empty() => sink.put(format::EMAP),
        Primitive::Map(entries) => {
            sink.put(format::MAP)?;
            encode_array(entries, sink)
        }
        Primitive::TypeIdentified(name, value) => {
            sink.put(format::TYPE_ID)?;
            encode(name, sink)?;
            encode(value, sink)
        }
        Primitive::Promised(id) => {
            contract_violation(&format!("cannot encode unresolved promise {id}"))
        }
    }
}

/// Encodes a single primitive into a fresh byte vector.
pub fn to_bytes(primitive: &Primitive) -> Result<Vec<u8>> {
    let mut sink = ByteSink::new(Vec::new(), crate::constants::DEFAULT_BUFFER_SIZE);
    encode(primitive, &mut sink)?;
    sink.into_inner()
}

fn encode_reference<W: Write>(r: u32, sink: &mut ByteSink<W>) -> Result<()> {
    if let Ok(small) = u8::try_from(r) {
        if small <= format::REF6_MAX {
            return sink.put(small);
        }
        sink.put(format::REF8)?;
        return sink.put(small);
    }
    if let Ok(medium) = u16::try_from(r) {
        sink.put(format::REF16)?;
        return sink.write_all(&medium.to_le_bytes());
    }
    sink.put(format::REF32)?;
    sink.write_all(&r.to_le_bytes())
}

fn encode_integer<W: Write>(v: AnyInteger, sink: &mut ByteSink<W>) -> Result<()> {
    if let Some(n) = v.convert::<i8>() {
        match n {
            0..=63 => sink.put(format::POS_INT6 | n as u8),
            -32..=-1 => sink.put(n as u8),
            _ => {
                sink.put(format::INT8)?;
                sink.write_all(&n.to_le_bytes())
            }
        }
    } else if let Some(n) = v.convert::<u8>() {
        sink.put(format::UINT8)?;
        sink.put(n)
    } else if let Some(n) = v.convert::<i16>() {
        sink.put(format::INT16)?;
        sink.write_all(&n.to_le_bytes())
    } else if let Some(n) = v.convert::<u16>() {
        sink.put(format::UINT16)?;
        sink.write_all(&n.to_le_bytes())
    } else if let Some(n) = v.convert::<i32>() {
        sink.put(format::INT32)?;
        sink.write_all(&n.to_le_bytes())
    } else if let Some(n) = v.convert::<u32>() {
        sink.put(format::UINT32)?;
        sink.write_all(&n.to_le_bytes())
    } else if let Some(n) = v.convert::<i64>() {
        sink.put(format::INT64)?;
        sink.write_all(&n.to_le_bytes())
    } else {
        // Only non-negative magnitudes above i64::MAX remain.
        sink.put(format::UINT64)?;
        sink.write_all(&v.magnitude().to_le_bytes())
    }
}

fn encode_string<W: Write>(s: &str, sink: &mut ByteSink<W>) -> Result<()> {
    let bytes = s.as_bytes();
    match bytes.len() {
        0 => sink.put(format::ESTRING),
        len @ 1..=format::FSTRING_MAX_LEN => {
            sink.put(format::FSTRING | len as u8)?;
            sink.write_all(bytes)
        }
        len => {
            if bytes.contains(&0) {
                return Err(FormatError::InteriorNul(len).into());
            }
            sink.put(format::VSTRING)?;
            sink.write_all(bytes)?;
            sink.put(0)
        }
    }
}

fn encode_data<W: Write>(d: &[u8], sink: &mut ByteSink<W>) -> Result<()> {
    let len = d.len();
    if len == 0 {
        return sink.put(format::EDATA);
    }
    if len <= format::FDATA_MAX_LEN {
        sink.put(format::FDATA | len as u8)?;
    } else if let Ok(n) = u8::try_from(len) {
        sink.put(format::VDATA8)?;
        sink.put(n)?;
    } else if let Ok(n) = u16::try_from(len) {
        sink.put(format::VDATA16)?;
        sink.write_all(&n.to_le_bytes())?;
    } else if let Ok(n) = u32::try_from(len) {
        sink.put(format::VDATA32)?;
        sink.write_all(&n.to_le_bytes())?;
    } else {
        sink.put(format::VDATA64)?;
        sink.write_all(&(len as u64).to_le_bytes())?;
    }
    sink.write_all(d)
}

fn encode_array<W: Write>(items: &[Primitive], sink: &mut ByteSink<W>) -> Result<()> {
    match items.len() {
        0 => sink.put(format::EARRAY),
        len @ 1..=format::FARRAY_MAX_LEN => {
            sink.put(format::FARRAY | len as u8)?;
            items.iter().try_for_each(|item| encode(item, sink))
        }
        _ => {
            sink.put(format::VARRAY)?;
            items.iter().try_for_each(|item| encode(item, sink))?;
            sink.put(format::SENTINEL)
        }
    }
}

/// Reads primitives from a byte source.
///
/// Nesting of inline arrays is bounded by `max_depth` so that hostile input
/// cannot exhaust the stack.
#[derive(Debug)]
pub struct PrimitiveReader<R: Read> {
    source: ByteSource<R>,
    depth: usize,
    max_depth: usize,
}

impl<R: Read> PrimitiveReader<R> {
    /// Creates a reader over `source`.
    pub fn new(source: ByteSource<R>, max_depth: usize) -> Self {
        Self {
            source,
            depth: 0,
            max_depth,
        }
    }

    /// Decodes every primitive until the input is exhausted.
    pub fn read_all(&mut self) -> Result<Vec<Primitive>> {
        let mut table = Vec::new();
        while !self.source.at_end()? {
            table.push(self.read()?);
        }
        Ok(table)
    }

    /// Decodes exactly one primitive.
    ///
    /// A sentinel byte at this position yields [`FormatError::SentinelReached`].
    pub fn read(&mut self) -> Result<Primitive> {
        let code = self.source.byte()?;
        Ok(match Tag::classify(code) {
            Tag::Ref6(r) => Primitive::Reference(u32::from(r)),
            Tag::Ref8 => Primitive::Reference(u32::from(self.source.byte()?)),
            Tag::Ref16 => Primitive::Reference(u32::from(u16::from_le_bytes(self.source.array()?))),
            Tag::Ref32 => Primitive::Reference(u32::from_le_bytes(self.source.array()?)),
            Tag::PosInt6(n) => Primitive::from(n),
            Tag::NegInt5(n) => Primitive::from(n),
            Tag::False => Primitive::Boolean(false),
            Tag::True => Primitive::Boolean(true),
            Tag::Nil => Primitive::Nil,
            Tag::Int8 => Primitive::from(i8::from_le_bytes(self.source.array()?)),
            Tag::Int16 => Primitive::from(i16::from_le_bytes(self.source.array()?)),
            Tag::Int32 => Primitive::from(i32::from_le_bytes(self.source.array()?)),
            Tag::Int64 => Primitive::from(i64::from_le_bytes(self.source.array()?)),
            Tag::UInt8 => Primitive::from(self.source.byte()?),
            Tag::UInt16 => Primitive::from(u16::from_le_bytes(self.source.array()?)),
            Tag::UInt32 => Primitive::from(u32::from_le_bytes(self.source.array()?)),
            Tag::UInt64 => Primitive::from(u64::from_le_bytes(self.source.array()?)),
            Tag::Float32 => Primitive::from(f32::from_le_bytes(self.source.array()?)),
            Tag::Float64 => Primitive::from(f64::from_le_bytes(self.source.array()?)),
            Tag::FString(len) => {
                let bytes = self.source.bytes(u64::from(len))?;
                Primitive::String(utf8(bytes)?)
            }
            Tag::VString => {
                let bytes = self.source.until_nul()?;
                Primitive::String(utf8(bytes)?)
            }
            Tag::EString => Primitive::String(String::new()),
            Tag::FData(len) => Primitive::Data(self.source.bytes(u64::from(len))?),
            Tag::VData8 => {
                let len = self.source.byte()?;
                Primitive::Data(self.source.bytes(u64::from(len))?)
            }
            Tag::VData16 => {
                let len = u16::from_le_bytes(self.source.array()?);
                Primitive::Data(self.source.bytes(u64::from(len))?)
            }
            Tag::VData32 => {
                let len = u32::from_le_bytes(self.source.array()?);
                Primitive::Data(self.source.bytes(u64::from(len))?)
            }
            Tag::VData64 => {
                let len = u64::from_le_bytes(self.source.array()?);
                if usize::try_from(len).is_err() {
                    return Err(FormatError::LengthOverflow(len).into());
                }
                Primitive::Data(self.source.bytes(len)?)
            }
            Tag::EData => Primitive::Data(Vec::new()),
            Tag::FArray(len) => Primitive::Array(self.nested(|r| {
                (0..len).map(|_| r.read()).collect::<Result<Vec<_>>>()
            })?),
            Tag::VArray => Primitive::Array(self.nested(Self::read_until_sentinel)?),
            Tag::EArray => Primitive::Array(Vec::new()),
            Tag::Map => match self.nested(Self::read)? {
                Primitive::Array(entries) if entries.len() % 2 == 0 => Primitive::Map(entries),
                Primitive::Array(_) => return Err(FormatError::InvalidMapArray("odd-length array").into()),
                other => return Err(FormatError::InvalidMapArray(other.kind()).into()),
            },
            Tag::EMap => Primitive::Map(Vec::new()),
            Tag::TypeId => {
                let (name, value) = self.nested(|r| Ok((r.read()?, r.read()?)))?;
                Primitive::identified(name, value)
            }
            Tag::Sentinel => return Err(FormatError::SentinelReached.into()),
            Tag::Reserved(code) => return Err(FormatError::ReservedCode(code).into()),
        })
    }

    // The sentinel only ends the array at one of its own element boundaries;
    // one met deeper inside an element is an error from `read`.
    fn read_until_sentinel(&mut self) -> Result<Vec<Primitive>> {
        let mut items = Vec::new();
        loop {
            match self.source.peek()? {
                Some(format::SENTINEL) => {
                    self.source.byte()?;
                    return Ok(items);
                }
                Some(_) => items.push(self.read()?),
                None => {
                    return Err(FormatError::UnexpectedEof {
                        offset: self.source.current_offset(),
                    }
                    .into())
                }
            }
        }
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= self.max_depth {
            return Err(RefcodeError::DepthLimitExceeded(self.max_depth));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

fn utf8(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| FormatError::InvalidString(e.into_bytes()).into())
}

/// Decodes a single primitive from the start of `bytes`.
pub fn from_bytes(bytes: &[u8]) -> Result<Primitive> {
    let source = ByteSource::new(bytes, crate::constants::DEFAULT_BUFFER_SIZE);
    PrimitiveReader::new(source, crate::constants::DEFAULT_MAX_DEPTH).read()
}
