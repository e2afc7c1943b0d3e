//! Field values and dotted-path resolution
//!
//! Rules never see concrete field types. A type exposes its fields through
//! [`FieldSource`], which hands out borrowed [`Value`]s; nested objects are exposed as
//! [`Value::Object`] so a path such as `"Address.Street"` can be walked one segment at a
//! time, re-resolving each segment on the runtime type of the intermediate object.

use std::any::type_name;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use itertools::Itertools;
use rust_decimal::Decimal;

use crate::error::PathError;
use crate::validation::numeric::Number;

/// Borrowed view of a single field value.
#[derive(Clone)]
pub enum Value<'a> {
    Null,
    Bool(bool),
    Number(Number),
    Text(Cow<'a, str>),
    /// A collection, reduced to its length.
    List(usize),
    Object(&'a dyn FieldSource),
}

impl<'a> Value<'a> {
    /// Wraps a nested object so paths can walk into it.
    pub fn object(source: &'a dyn FieldSource) -> Self {
        Value::Object(source)
    }

    /// Wraps an optional nested object, mapping `None` to [`Value::Null`].
    pub fn optional_object<S: FieldSource>(source: &'a Option<S>) -> Self {
        match source {
            Some(source) => Value::Object(source),
            None => Value::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Number(number) => number.width().to_string(),
            Value::Text(_) => "string".to_string(),
            Value::List(_) => "list".to_string(),
            Value::Object(source) => source.type_name().to_string(),
        }
    }

    /// Text form of a scalar, used when a resolved value stands in for a
    /// configured bound. Objects, lists and null have none.
    pub fn to_literal(&self) -> Option<String> {
        match self {
            Value::Bool(flag) => Some(flag.to_string()),
            Value::Number(number) => Some(number.to_string()),
            Value::Text(text) => Some(text.to_string()),
            Value::Null | Value::List(_) | Value::Object(_) => None,
        }
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(flag) => f.debug_tuple("Bool").field(flag).finish(),
            Value::Number(number) => f.debug_tuple("Number").field(number).finish(),
            Value::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Value::List(len) => f.debug_tuple("List").field(len).finish(),
            Value::Object(source) => f.debug_tuple("Object").field(&source.type_name()).finish(),
        }
    }
}

macro_rules! value_from_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value<'_> {
                fn from(value: $ty) -> Self {
                    Value::Number(Number::from(value))
                }
            }

            impl From<&$ty> for Value<'_> {
                fn from(value: &$ty) -> Self {
                    Value::Number(Number::from(*value))
                }
            }

            impl From<&Option<$ty>> for Value<'_> {
                fn from(value: &Option<$ty>) -> Self {
                    value.map_or(Value::Null, |value| Value::Number(Number::from(value)))
                }
            }
        )*
    };
}

value_from_number!(i16, i32, i64, f32, f64, Decimal);

impl From<bool> for Value<'_> {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&bool> for Value<'_> {
    fn from(value: &bool) -> Self {
        Value::Bool(*value)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(value: &'a str) -> Self {
        Value::Text(Cow::Borrowed(value))
    }
}

impl<'a> From<&'a String> for Value<'a> {
    fn from(value: &'a String) -> Self {
        Value::Text(Cow::Borrowed(value.as_str()))
    }
}

impl From<String> for Value<'_> {
    fn from(value: String) -> Self {
        Value::Text(Cow::Owned(value))
    }
}

impl<T> From<&Vec<T>> for Value<'_> {
    fn from(value: &Vec<T>) -> Self {
        Value::List(value.len())
    }
}

impl<T> From<&[T]> for Value<'_> {
    fn from(value: &[T]) -> Self {
        Value::List(value.len())
    }
}

impl<'a> From<&'a Option<String>> for Value<'a> {
    fn from(value: &'a Option<String>) -> Self {
        value
            .as_deref()
            .map_or(Value::Null, |text| Value::Text(Cow::Borrowed(text)))
    }
}

impl From<&Option<bool>> for Value<'_> {
    fn from(value: &Option<bool>) -> Self {
        value.map_or(Value::Null, Value::Bool)
    }
}

/// Something whose fields can be looked up by name.
///
/// Implementations return `None` for names they do not know; path resolution turns
/// that into [`PathError::MissingSegment`].
pub trait FieldSource {
    fn field(&self, name: &str) -> Option<Value<'_>>;

    fn type_name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// A parsed, dotted field path, optionally negated with a leading `!`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<String>,
    negated: bool,
}

impl FieldPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let trimmed = raw.trim();
        let (negated, body) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };
        if body.is_empty() {
            return Err(PathError::EmptyPath);
        }

        let segments: Vec<String> = body.split('.').map(|s| s.trim().to_string()).collect();
        if segments.iter().any(String::is_empty) {
            return Err(PathError::EmptySegment {
                path: raw.to_string(),
            });
        }

        Ok(Self { segments, negated })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn terminal(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// The path without its negation marker.
    pub fn dotted(&self) -> String {
        self.segments.iter().join(".")
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_str("!")?;
        }
        f.write_str(&self.dotted())
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldPath::parse(s)
    }
}

/// The terminal field of a resolved path: the object that owns it plus its name.
#[derive(Clone)]
pub struct FieldRef<'a> {
    owner: &'a dyn FieldSource,
    name: String,
}

impl<'a> FieldRef<'a> {
    pub fn owner(&self) -> &'a dyn FieldSource {
        self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Value<'a> {
        self.owner.field(&self.name).unwrap_or(Value::Null)
    }
}

impl fmt::Debug for FieldRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRef")
            .field("owner", &self.owner.type_name())
            .field("name", &self.name)
            .finish()
    }
}

/// Walks every segment but the last and returns the terminal field.
///
/// Each intermediate segment must hold an object; null or scalar intermediates and
/// names the object does not know all fail.
pub fn resolve_descriptor<'a>(
    root: &'a dyn FieldSource,
    path: &FieldPath,
) -> Result<FieldRef<'a>, PathError> {
    let (terminal, parents) = path
        .segments()
        .split_last()
        .ok_or(PathError::EmptyPath)?;

    let mut current = root;
    for segment in parents {
        current = match current.field(segment) {
            Some(Value::Object(next)) => next,
            Some(Value::Null) => {
                return Err(PathError::NullIntermediate {
                    path: path.dotted(),
                    segment: segment.clone(),
                })
            }
            Some(_) => {
                return Err(PathError::NotAnObject {
                    path: path.dotted(),
                    segment: segment.clone(),
                })
            }
            None => return Err(missing(path, segment, current)),
        };
    }

    if current.field(terminal).is_none() {
        return Err(missing(path, terminal, current));
    }

    Ok(FieldRef {
        owner: current,
        name: terminal.clone(),
    })
}

/// Resolves `path` against `root` and returns the terminal value.
pub fn resolve<'a>(root: &'a dyn FieldSource, path: &FieldPath) -> Result<Value<'a>, PathError> {
    resolve_descriptor(root, path).map(|field| field.value())
}

fn missing(path: &FieldPath, segment: &str, owner: &dyn FieldSource) -> PathError {
    PathError::MissingSegment {
        path: path.dotted(),
        segment: segment.to_string(),
        type_name: owner.type_name().to_string(),
    }
}

pub type Getter<T> = Arc<dyn for<'a> Fn(&'a T) -> Value<'a> + Send + Sync>;

/// A named field of `T` with its bound getter.
pub struct FieldDescriptor<T> {
    name: String,
    getter: Getter<T>,
}

impl<T> FieldDescriptor<T> {
    pub fn new<F>(name: impl Into<String>, getter: F) -> Self
    where
        F: for<'a> Fn(&'a T) -> Value<'a> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            getter: Arc::new(getter),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value<'a>(&self, owner: &'a T) -> Value<'a> {
        (self.getter)(owner)
    }
}

impl<T> Clone for FieldDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            getter: Arc::clone(&self.getter),
        }
    }
}

impl<T> fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
