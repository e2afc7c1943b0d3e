//! Numeric widths understood by the comparison rules.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_derive::{Deserialize, Serialize};

/// The closed set of numeric field types a numeric rule can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericWidth {
    Short,
    Int,
    Long,
    Float,
    Double,
    Decimal,
}

impl NumericWidth {
    pub fn as_str(self) -> &'static str {
        match self {
            NumericWidth::Short => "short",
            NumericWidth::Int => "int",
            NumericWidth::Long => "long",
            NumericWidth::Float => "float",
            NumericWidth::Double => "double",
            NumericWidth::Decimal => "decimal",
        }
    }

    /// Parses `raw` into a number of this width. Surrounding whitespace is ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use validatable::validation::numeric::{Number, NumericWidth};
    ///
    /// assert_eq!(NumericWidth::Int.parse(" 18 "), Some(Number::Int(18)));
    /// assert_eq!(NumericWidth::Short.parse("70000"), None);
    /// ```
    pub fn parse(self, raw: &str) -> Option<Number> {
        let raw = raw.trim();
        match self {
            NumericWidth::Short => raw.parse().ok().map(Number::Short),
            NumericWidth::Int => raw.parse().ok().map(Number::Int),
            NumericWidth::Long => raw.parse().ok().map(Number::Long),
            NumericWidth::Float => raw.parse().ok().map(Number::Float),
            NumericWidth::Double => raw.parse().ok().map(Number::Double),
            NumericWidth::Decimal => Decimal::from_str(raw).ok().map(Number::Decimal),
        }
    }
}

impl fmt::Display for NumericWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field value of one of the supported widths.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
}

impl Number {
    pub fn width(&self) -> NumericWidth {
        match self {
            Number::Short(_) => NumericWidth::Short,
            Number::Int(_) => NumericWidth::Int,
            Number::Long(_) => NumericWidth::Long,
            Number::Float(_) => NumericWidth::Float,
            Number::Double(_) => NumericWidth::Double,
            Number::Decimal(_) => NumericWidth::Decimal,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Short(v) => *v == 0,
            Number::Int(v) => *v == 0,
            Number::Long(v) => *v == 0,
            Number::Float(v) => *v == 0.0,
            Number::Double(v) => *v == 0.0,
            Number::Decimal(v) => v.is_zero(),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

/// Numbers only order against numbers of the same width.
impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Number::Short(a), Number::Short(b)) => a.partial_cmp(b),
            (Number::Int(a), Number::Int(b)) => a.partial_cmp(b),
            (Number::Long(a), Number::Long(b)) => a.partial_cmp(b),
            (Number::Float(a), Number::Float(b)) => a.partial_cmp(b),
            (Number::Double(a), Number::Double(b)) => a.partial_cmp(b),
            (Number::Decimal(a), Number::Decimal(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Short(v) => write!(f, "{}", v),
            Number::Int(v) => write!(f, "{}", v),
            Number::Long(v) => write!(f, "{}", v),
            Number::Float(v) => write!(f, "{}", v),
            Number::Double(v) => write!(f, "{}", v),
            Number::Decimal(v) => write!(f, "{}", v),
        }
    }
}

macro_rules! number_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Number {
                fn from(value: $ty) -> Self {
                    Number::$variant(value)
                }
            }
        )*
    };
}

number_from! {
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    Decimal => Decimal,
}
