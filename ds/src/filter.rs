//! Predicates over documents
//!
//! A predicate is a slice of filters that must all match. An empty slice
//! matches every document.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Document;

/// Value a filter compares a document field against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexValue {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<IndexValue>),
}

impl IndexValue {
    /// Whether a JSON value holds this value; differing types never match
    fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::String(a), Value::String(b)) => a == b,
            (Self::Int(a), Value::Number(b)) => b.as_i64() == Some(*a),
            (Self::Bool(a), Value::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for IndexValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for IndexValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for IndexValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    Eq,
    Ne,
    /// Field equals any element of an `IndexValue::List`
    In,
}

/// A single field comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: IndexValue,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<IndexValue>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<IndexValue>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<IndexValue>) -> Self {
        Self::new(field, FilterOp::Ne, value)
    }

    pub fn is_in<V: Into<IndexValue>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::In,
            value: IndexValue::List(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Check this filter against a document
    ///
    /// A missing field only satisfies `Ne`.
    pub fn matches(&self, doc: &Document) -> bool {
        let Some(field) = doc.get(&self.field) else {
            return self.op == FilterOp::Ne;
        };

        match self.op {
            FilterOp::Eq => self.value.equals(field),
            FilterOp::Ne => !self.value.equals(field),
            FilterOp::In => match &self.value {
                IndexValue::List(values) => values.iter().any(|v| v.equals(field)),
                other => other.equals(field),
            },
        }
    }
}

/// True when every filter matches
pub fn matches_all(filters: &[Filter], doc: &Document) -> bool {
    filters.iter().all(|f| f.matches(doc))
}
