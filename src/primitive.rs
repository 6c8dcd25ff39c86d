//! The format-independent value model.
//!
//! A serialized graph is a flat table of [`Primitive`]s. Composite primitives
//! (arrays, maps, type-identified values) usually hold [`Primitive::Reference`]s
//! to other table slots rather than nested values, which is what allows shared
//! and cyclic object graphs to be written as a finite sequence.

use std::fmt;

use crate::graph::SlotId;
use crate::numeric::{AnyFloat, AnyInteger};

/// One self-describing value of the wire format.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Index of another primitive in the enclosing table.
    Reference(u32),
    /// An integer of any width.
    Integer(AnyInteger),
    /// A float of either width.
    Float(AnyFloat),
    /// A boolean.
    Boolean(bool),
    /// The absent value.
    Nil,
    /// UTF-8 text.
    String(String),
    /// An opaque byte blob.
    Data(Vec<u8>),
    /// An ordered sequence.
    Array(Vec<Primitive>),
    /// Alternating keys and values; always an even number of entries.
    Map(Vec<Primitive>),
    /// A value tagged with the name of its type. The first primitive resolves to
    /// the name string, the second to the value.
    TypeIdentified(Box<Primitive>, Box<Primitive>),
    /// Write-side placeholder for a slot that the resolver turns into a
    /// [`Primitive::Reference`]. Never appears in an encoded stream.
    Promised(SlotId),
}

impl Primitive {
    /// Short name of the primitive kind, used in error messages and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Reference(_) => "reference",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Boolean(_) => "boolean",
            Self::Nil => "nil",
            Self::String(_) => "string",
            Self::Data(_) => "data",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::TypeIdentified(..) => "type-identified",
            Self::Promised(_) => "promised",
        }
    }

    /// Builds a map primitive from key/value pairs.
    pub fn map_of(pairs: impl IntoIterator<Item = (Primitive, Primitive)>) -> Self {
        Self::Map(pairs.into_iter().flat_map(|(k, v)| [k, v]).collect())
    }

    /// Builds a type-identified primitive.
    pub fn identified(name: Primitive, value: Primitive) -> Self {
        Self::TypeIdentified(Box::new(name), Box::new(value))
    }
}

/// Iterates the key/value pairs of a map's entry list.
pub fn pairs(entries: &[Primitive]) -> impl Iterator<Item = (&Primitive, &Primitive)> {
    entries.chunks_exact(2).map(|pair| (&pair[0], &pair[1]))
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Primitive {
                fn from(v: $t) -> Self {
                    Self::Integer(AnyInteger::from(v))
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<AnyInteger> for Primitive {
    fn from(v: AnyInteger) -> Self {
        Self::Integer(v)
    }
}

impl From<f32> for Primitive {
    fn from(v: f32) -> Self {
        Self::Float(AnyFloat::Single(v))
    }
}

impl From<f64> for Primitive {
    fn from(v: f64) -> Self {
        Self::Float(AnyFloat::Double(v))
    }
}

impl From<bool> for Primitive {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for Primitive {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Primitive {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<Primitive>> for Primitive {
    fn from(v: Vec<Primitive>) -> Self {
        Self::Array(v)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference(r) => write!(f, "@{r}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Nil => f.write_str("nil"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Data(d) => write!(f, "<{} bytes>", d.len()),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in pairs(entries).enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Self::TypeIdentified(name, value) => write!(f, "<{name}> {value}"),
            Self::Promised(id) => write!(f, "promise({id})"),
        }
    }
}
