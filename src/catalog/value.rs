//! Loosely-typed catalog inputs
//!
//! Everything a caller can hand to the catalog constructor is a
//! [`CatalogValue`]: scalars, numeric columns, tables, raw record arrays,
//! and opaque objects that know how to render themselves as strings.

use crate::error::{HalocatError, HalocatResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A fixed-length numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dtype", content = "data", rename_all = "lowercase")]
pub enum Column {
    /// 64-bit signed integers
    Int(Vec<i64>),
    /// 64-bit floats (NaN and infinities survive serialization)
    Float(#[serde(with = "float_data")] Vec<f64>),
}

impl Column {
    /// Number of rows
    pub fn len(&self) -> usize {
        match self {
            Self::Int(v) => v.len(),
            Self::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type name, as written to catalog files
    pub fn dtype(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
        }
    }

    /// Value at `index` widened to f64
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        match self {
            Self::Int(v) => v.get(index).map(|&x| x as f64),
            Self::Float(v) => v.get(index).copied(),
        }
    }

    /// Iterate all values widened to f64
    pub fn iter_f64(&self) -> Box<dyn Iterator<Item = f64> + '_> {
        match self {
            Self::Int(v) => Box::new(v.iter().map(|&x| x as f64)),
            Self::Float(v) => Box::new(v.iter().copied()),
        }
    }

    /// Integer view, if this is an integer column
    pub fn as_int(&self) -> Option<&[i64]> {
        match self {
            Self::Int(v) => Some(v),
            Self::Float(_) => None,
        }
    }
}

impl From<Vec<f64>> for Column {
    fn from(v: Vec<f64>) -> Self {
        Self::Float(v)
    }
}

impl From<Vec<i64>> for Column {
    fn from(v: Vec<i64>) -> Self {
        Self::Int(v)
    }
}

/// Serde helper writing non-finite floats as strings, since JSON has no NaN
mod float_data {
    use super::*;

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum StoredFloat {
        Finite(f64),
        Special(String),
    }

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let stored: Vec<StoredFloat> = values
            .iter()
            .map(|&v| {
                if v.is_finite() {
                    StoredFloat::Finite(v)
                } else if v.is_nan() {
                    StoredFloat::Special("nan".to_string())
                } else if v > 0.0 {
                    StoredFloat::Special("inf".to_string())
                } else {
                    StoredFloat::Special("-inf".to_string())
                }
            })
            .collect();
        stored.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let stored = Vec::<StoredFloat>::deserialize(deserializer)?;
        stored
            .into_iter()
            .map(|s| match s {
                StoredFloat::Finite(v) => Ok(v),
                StoredFloat::Special(s) => match s.as_str() {
                    "nan" => Ok(f64::NAN),
                    "inf" => Ok(f64::INFINITY),
                    "-inf" => Ok(f64::NEG_INFINITY),
                    other => Err(serde::de::Error::custom(format!(
                        "invalid float value: {other}"
                    ))),
                },
            })
            .collect()
    }
}

/// Named columns of identical length
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, Column>", into = "BTreeMap<String, Column>")]
pub struct Table {
    columns: BTreeMap<String, Column>,
}

impl Table {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from named columns, rejecting ragged input
    pub fn from_columns<I, K, C>(columns: I) -> HalocatResult<Self>
    where
        I: IntoIterator<Item = (K, C)>,
        K: Into<String>,
        C: Into<Column>,
    {
        let mut table = Self::new();
        for (name, column) in columns {
            table.insert(name, column)?;
        }
        Ok(table)
    }

    /// Add or replace a column
    pub fn insert(&mut self, name: impl Into<String>, column: impl Into<Column>) -> HalocatResult<()> {
        let name = name.into();
        let column = column.into();
        let others = self.columns.iter().find(|(n, _)| **n != name);
        if let Some((_, existing)) = others {
            if existing.len() != column.len() {
                return Err(HalocatError::InconsistentColumnLength {
                    column: name,
                    expected: existing.len(),
                    actual: column.len(),
                });
            }
        }
        self.columns.insert(name, column);
        Ok(())
    }

    /// Number of rows (0 for a table without columns)
    pub fn num_rows(&self) -> usize {
        self.columns.values().next().map_or(0, Column::len)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names in sorted order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Flatten into a raw row-major record array
    pub fn as_records(&self) -> RecordArray {
        let fields: Vec<String> = self.columns.keys().cloned().collect();
        let rows = (0..self.num_rows())
            .map(|i| {
                self.columns
                    .values()
                    .map(|c| c.get_f64(i).unwrap_or(f64::NAN))
                    .collect()
            })
            .collect();
        RecordArray { fields, rows }
    }
}

impl TryFrom<BTreeMap<String, Column>> for Table {
    type Error = HalocatError;

    fn try_from(columns: BTreeMap<String, Column>) -> Result<Self, Self::Error> {
        Self::from_columns(columns)
    }
}

impl From<Table> for BTreeMap<String, Column> {
    fn from(table: Table) -> Self {
        table.columns
    }
}

/// Raw row-major structured array, without column semantics
#[derive(Debug, Clone, PartialEq)]
pub struct RecordArray {
    pub fields: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl RecordArray {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// An opaque value that may or may not be renderable as a string
pub trait DisplayValue: fmt::Debug + Send + Sync {
    /// Render the value, or explain why it cannot be rendered
    fn to_display_string(&self) -> Result<String, String>;
}

/// Any value accepted by the catalog constructor or as cache metadata
#[derive(Debug, Clone)]
pub enum CatalogValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Column),
    Table(Table),
    Records(RecordArray),
    Object(Arc<dyn DisplayValue>),
}

impl CatalogValue {
    /// Short type name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::Array(_) => "array",
            Self::Table(_) => "table",
            Self::Records(_) => "record array",
            Self::Object(_) => "object",
        }
    }

    /// Numeric scalar value, if this is an integer or float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Column> {
        match self {
            Self::Array(c) => Some(c),
            _ => None,
        }
    }

    /// Render as a string for file attributes
    pub fn to_display_string(&self) -> Result<String, String> {
        match self {
            Self::Str(s) => Ok(s.clone()),
            Self::Int(v) => Ok(v.to_string()),
            Self::Float(v) => Ok(format!("{v:?}")),
            Self::Bool(v) => Ok(v.to_string()),
            Self::Array(Column::Int(v)) => Ok(format!("{v:?}")),
            Self::Array(Column::Float(v)) => Ok(format!("{v:?}")),
            Self::Table(t) => Ok(format!(
                "Table(rows={}, columns=[{}])",
                t.num_rows(),
                t.column_names().collect::<Vec<_>>().join(", ")
            )),
            Self::Records(r) => Ok(format!(
                "RecordArray(rows={}, fields=[{}])",
                r.len(),
                r.fields.join(", ")
            )),
            Self::Object(o) => o.to_display_string(),
        }
    }
}

impl PartialEq for CatalogValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Table(a), Self::Table(b)) => a == b,
            (Self::Records(a), Self::Records(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for CatalogValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for CatalogValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for CatalogValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for CatalogValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for CatalogValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for CatalogValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Column> for CatalogValue {
    fn from(c: Column) -> Self {
        Self::Array(c)
    }
}

impl From<Vec<f64>> for CatalogValue {
    fn from(v: Vec<f64>) -> Self {
        Self::Array(Column::Float(v))
    }
}

impl From<Vec<i64>> for CatalogValue {
    fn from(v: Vec<i64>) -> Self {
        Self::Array(Column::Int(v))
    }
}

impl From<Table> for CatalogValue {
    fn from(t: Table) -> Self {
        Self::Table(t)
    }
}

impl From<RecordArray> for CatalogValue {
    fn from(r: RecordArray) -> Self {
        Self::Records(r)
    }
}

impl From<Arc<dyn DisplayValue>> for CatalogValue {
    fn from(o: Arc<dyn DisplayValue>) -> Self {
        Self::Object(o)
    }
}

/// Name to value mapping handed to the catalog constructor
#[derive(Debug, Clone, Default)]
pub struct CatalogArgs {
    values: BTreeMap<String, CatalogValue>,
}

impl CatalogArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<CatalogValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<CatalogValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<CatalogValue> {
        self.values.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&CatalogValue> {
        self.values.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut CatalogValue> {
        self.values.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn into_inner(self) -> BTreeMap<String, CatalogValue> {
        self.values
    }
}

impl<K: Into<String>> FromIterator<(K, CatalogValue)> for CatalogArgs {
    fn from_iter<I: IntoIterator<Item = (K, CatalogValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
