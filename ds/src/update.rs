//! Field assignments applied by `update_one` and `find_one_and_update`

use serde_json::Value;

use crate::document::Document;

/// An ordered list of `$set` assignments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    sets: Vec<(String, Value)>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a JSON value to a field
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.sets.push((field.into(), value.into()));
        self
    }

    /// Apply the assignments in order, leaving other fields untouched
    pub fn apply(&self, doc: &mut Document) {
        for (field, value) in &self.sets {
            doc.insert(field.clone(), value.clone());
        }
    }
}
