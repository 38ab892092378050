//! Sort declarations and typed sort-key values
//!
//! A request ranks hits either by relevance score alone (no [`SortField`]s)
//! or by a list of sort fields compared in declared order. Each hit then
//! carries one [`SortValue`] per declared field.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The value type of a sort field, which selects its comparison policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortFieldType {
    /// Relevance score; higher ranks first.
    Score,
    /// Index order of the document; lower ranks first.
    Doc,
    /// Keyword compared by term ordinal.
    String,
    /// Keyword compared by raw value.
    StringVal,
    /// 32-bit integer.
    Int,
    /// 32-bit float.
    Float,
    /// 64-bit integer.
    Long,
    /// 64-bit float.
    Double,
    /// Caller-defined comparison; cannot be merged here.
    Custom,
    /// Placeholder rewritten before execution; cannot be merged here.
    Rewriteable,
}

impl SortFieldType {
    /// All field types, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Score,
        Self::Doc,
        Self::String,
        Self::StringVal,
        Self::Int,
        Self::Float,
        Self::Long,
        Self::Double,
        Self::Custom,
        Self::Rewriteable,
    ];

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Score => "score",
            Self::Doc => "doc",
            Self::String => "string",
            Self::StringVal => "string_val",
            Self::Int => "int",
            Self::Float => "float",
            Self::Long => "long",
            Self::Double => "double",
            Self::Custom => "custom",
            Self::Rewriteable => "rewriteable",
        }
    }

    /// Whether values of this type have a built-in comparison policy.
    #[must_use]
    pub const fn is_mergeable(self) -> bool {
        !matches!(self, Self::Custom | Self::Rewriteable)
    }
}

impl fmt::Display for SortFieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a sort declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortField {
    /// Field name (informational; values are matched by position)
    pub field: String,
    /// Value type of the field
    #[serde(rename = "type")]
    pub field_type: SortFieldType,
    /// Invert the natural order of this field
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reverse: bool,
}

impl SortField {
    #[must_use]
    pub fn new(field: impl Into<String>, field_type: SortFieldType) -> Self {
        Self {
            field: field.into(),
            field_type,
            reverse: false,
        }
    }

    /// Same field with its natural order inverted.
    #[must_use]
    pub fn reversed(mut self) -> Self {
        self.reverse = !self.reverse;
        self
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.field_type)?;
        if self.reverse {
            f.write_str(":reverse")?;
        }
        Ok(())
    }
}

/// Render a sort declaration for diagnostics (`_score` when empty).
#[must_use]
pub fn describe_sort(sort: &[SortField]) -> String {
    if sort.is_empty() {
        return "_score".to_string();
    }
    sort.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// A typed sort-key value carried by a hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SortValue {
    Double(f64),
    Float(f32),
    Int(i32),
    Long(i64),
    Str(String),
    /// Document index order
    Doc(i32),
    /// The document has no value for a keyword field
    Missing,
}

impl SortValue {
    /// Stable lowercase name of the variant.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Double(_) => "double",
            Self::Float(_) => "float",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Str(_) => "str",
            Self::Doc(_) => "doc",
            Self::Missing => "missing",
        }
    }
}

impl From<f64> for SortValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<f32> for SortValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<i32> for SortValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for SortValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<&str> for SortValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for SortValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for SortValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Missing, Into::into)
    }
}
