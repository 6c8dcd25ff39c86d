//! Width-agnostic numeric boxes.
//!
//! The wire format stores every integer in the narrowest encoding that holds it,
//! so a value written as `u64` may come back as a one-byte inline integer. The
//! boxes below carry a number independently of the width it was read or written
//! with, compare by mathematical value, and perform checked conversion into any
//! concrete Rust numeric type.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{RefcodeError, Result};

/// An integer of any width and signedness, stored as sign plus magnitude.
///
/// Zero is never negative, so equality and hashing are by value: an
/// `AnyInteger` built from `5u8` equals one built from `5i64`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnyInteger {
    negative: bool,
    magnitude: u64,
}

impl AnyInteger {
    /// The value zero.
    pub const ZERO: Self = Self {
        negative: false,
        magnitude: 0,
    };

    /// Builds a box from an explicit sign and magnitude.
    pub fn from_parts(negative: bool, magnitude: u64) -> Self {
        Self {
            negative: negative && magnitude != 0,
            magnitude,
        }
    }

    /// Whether the value is strictly below zero.
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// The absolute value.
    pub fn magnitude(&self) -> u64 {
        self.magnitude
    }

    /// The exact value as an `i128`, which holds every representable integer.
    pub fn to_i128(&self) -> i128 {
        let magnitude = i128::from(self.magnitude);
        if self.negative {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Converts into `T` when the value fits, `None` otherwise.
    pub fn convert<T: TryFrom<i128>>(&self) -> Option<T> {
        T::try_from(self.to_i128()).ok()
    }
}

macro_rules! impl_any_integer {
    (signed: $($s:ty),*; unsigned: $($u:ty),*) => {
        $(
            impl From<$s> for AnyInteger {
                fn from(v: $s) -> Self {
                    Self::from_parts(v < 0, v.unsigned_abs() as u64)
                }
            }
        )*
        $(
            impl From<$u> for AnyInteger {
                fn from(v: $u) -> Self {
                    Self::from_parts(false, v as u64)
                }
            }
        )*
        $(
            impl TryFrom<AnyInteger> for $s {
                type Error = RefcodeError;

                fn try_from(v: AnyInteger) -> Result<Self> {
                    v.convert().ok_or_else(|| conversion_failed(v, stringify!($s)))
                }
            }
        )*
        $(
            impl TryFrom<AnyInteger> for $u {
                type Error = RefcodeError;

                fn try_from(v: AnyInteger) -> Result<Self> {
                    v.convert().ok_or_else(|| conversion_failed(v, stringify!($u)))
                }
            }
        )*
    };
}

impl_any_integer!(signed: i8, i16, i32, i64, isize; unsigned: u8, u16, u32, u64, usize);

fn conversion_failed(value: impl fmt::Display, target: &'static str) -> RefcodeError {
    RefcodeError::ConversionFailed {
        value: value.to_string(),
        target,
    }
}

impl PartialOrd for AnyInteger {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AnyInteger {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.negative, other.negative) {
            (false, false) => self.magnitude.cmp(&other.magnitude),
            (true, true) => other.magnitude.cmp(&self.magnitude),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
        }
    }
}

impl fmt::Debug for AnyInteger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnyInteger({self})")
    }
}

impl fmt::Display for AnyInteger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-{}", self.magnitude)
        } else {
            write!(f, "{}", self.magnitude)
        }
    }
}

/// Storage width of a floating-point value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatWidth {
    /// IEEE 754 binary32.
    Single,
    /// IEEE 754 binary64.
    Double,
}

/// A floating-point value that remembers the width it was stored with.
///
/// Equality and ordering are by numeric value, so `AnyFloat::from(0.5f32)`
/// equals `AnyFloat::from(0.5f64)`.
#[derive(Debug, Clone, Copy)]
pub enum AnyFloat {
    /// A single-precision value.
    Single(f32),
    /// A double-precision value.
    Double(f64),
}

impl AnyFloat {
    /// The width this value is stored with.
    pub fn width(&self) -> FloatWidth {
        match self {
            Self::Single(_) => FloatWidth::Single,
            Self::Double(_) => FloatWidth::Double,
        }
    }

    /// The value widened to `f64`; always exact.
    pub fn to_f64(&self) -> f64 {
        match *self {
            Self::Single(v) => f64::from(v),
            Self::Double(v) => v,
        }
    }

    /// The value narrowed to `f32` when that loses nothing.
    ///
    /// NaN converts to NaN; any other double converts only if it survives the
    /// round trip through `f32` unchanged.
    pub fn to_f32(&self) -> Option<f32> {
        match *self {
            Self::Single(v) => Some(v),
            Self::Double(v) => {
                #[allow(clippy::cast_possible_truncation)]
                let narrow = v as f32;
                (v.is_nan() || f64::from(narrow) == v).then_some(narrow)
            }
        }
    }
}

impl From<f32> for AnyFloat {
    fn from(v: f32) -> Self {
        Self::Single(v)
    }
}

impl From<f64> for AnyFloat {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl TryFrom<AnyFloat> for f32 {
    type Error = RefcodeError;

    fn try_from(v: AnyFloat) -> Result<Self> {
        v.to_f32().ok_or_else(|| conversion_failed(v, "f32"))
    }
}

impl TryFrom<AnyFloat> for f64 {
    type Error = RefcodeError;

    fn try_from(v: AnyFloat) -> Result<Self> {
        Ok(v.to_f64())
    }
}

impl PartialEq for AnyFloat {
    fn eq(&self, other: &Self) -> bool {
        self.to_f64() == other.to_f64()
    }
}

impl PartialOrd for AnyFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.to_f64().partial_cmp(&other.to_f64())
    }
}

impl fmt::Display for AnyFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(v) => write!(f, "{v}f32"),
            Self::Double(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_has_one_representation() {
        assert_eq!(AnyInteger::from_parts(true, 0), AnyInteger::ZERO);
        assert_eq!(AnyInteger::from(0i8), AnyInteger::from(0u64));
        assert!(!AnyInteger::from(-0i32).is_negative());
    }

    #[test]
    fn equality_ignores_source_width() {
        assert_eq!(AnyInteger::from(200u8), AnyInteger::from(200i64));
        assert_eq!(AnyInteger::from(-7i8), AnyInteger::from(-7isize));
        assert_ne!(AnyInteger::from(7u8), AnyInteger::from(-7i8));
    }

    #[test]
    fn ordering_is_mathematical() {
        let mut values: Vec<AnyInteger> = vec![
            AnyInteger::from(u64::MAX),
            AnyInteger::from(-1i8),
            AnyInteger::from(i64::MIN),
            AnyInteger::from(0u8),
            AnyInteger::from(300i16),
        ];
        values.sort();
        let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "-9223372036854775808",
                "-1",
                "0",
                "300",
                "18446744073709551615"
            ]
        );
    }

    #[test]
    fn conversion_is_checked() {
        let big = AnyInteger::from(300u16);
        assert_eq!(u16::try_from(big).ok(), Some(300));
        assert!(matches!(
            u8::try_from(big),
            Err(RefcodeError::ConversionFailed { target: "u8", .. })
        ));
        assert!(u32::try_from(AnyInteger::from(-1i8)).is_err());
        assert_eq!(i64::try_from(AnyInteger::from(i64::MIN)).ok(), Some(i64::MIN));
        assert!(i64::try_from(AnyInteger::from(u64::MAX)).is_err());
        assert_eq!(i8::try_from(AnyInteger::from(-128i64)).ok(), Some(-128));
    }

    #[test]
    fn float_narrowing_requires_exactness() {
        assert_eq!(AnyFloat::from(0.5f64).to_f32(), Some(0.5));
        assert_eq!(AnyFloat::from(0.1f64).to_f32(), None);
        assert!(f32::try_from(AnyFloat::from(f64::NAN)).is_ok_and(f32::is_nan));
        assert_eq!(f64::try_from(AnyFloat::from(0.1f32)).ok(), Some(f64::from(0.1f32)));
    }

    #[test]
    fn float_equality_is_by_value() {
        assert_eq!(AnyFloat::from(1.5f32), AnyFloat::from(1.5f64));
        assert_eq!(AnyFloat::from(1.5f32).width(), FloatWidth::Single);
        assert!(AnyFloat::from(-2.0f64) < AnyFloat::from(1.0f32));
    }
}
