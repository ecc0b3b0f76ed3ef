//! Categorical label encoding
//!
//! Maps location keys to dense integer ids for the embedding table. The
//! class list is sorted at fit time so the mapping is deterministic and
//! survives serialization byte for byte.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Sorted vocabulary of categorical labels with dense integer ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit on observed labels; duplicates collapse, order is sorted
    pub fn fit<S: AsRef<str>>(values: &[S]) -> Self {
        let mut classes: Vec<String> = values.iter().map(|v| v.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Number of distinct classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether the vocabulary is empty
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// The sorted class list
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Whether the label was seen at fit time
    pub fn contains(&self, value: &str) -> bool {
        self.classes.binary_search_by(|c| c.as_str().cmp(value)).is_ok()
    }

    /// Dense id of a label seen at fit time
    pub fn encode(&self, value: &str) -> Result<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .map_err(|_| Error::UnknownCategory(value.to_string()))
    }

    /// Label for a dense id
    pub fn decode(&self, id: usize) -> Result<&str> {
        self.classes
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| Error::UnknownCategory(format!("id {id} out of range")))
    }
}
