//! Immutable column table
//!
//! Every pipeline stage is a pure `Frame -> Result<Frame>` function: a
//! stage never mutates its input in place, it builds and returns a new
//! frame value. This keeps each stage independently testable and the
//! pipeline composable.
//!
//! A frame holds named columns of equal length. Numeric data is `f64`
//! (`f64::NAN` marks a missing value); text columns are nullable.

use crate::{Error, Result};

/// A single named column of data
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Numeric column; `NAN` marks missing values
    Float(Vec<f64>),
    /// Text column with explicit nulls
    Str(Vec<Option<String>>),
}

impl Column {
    /// Number of rows in the column
    pub fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Str(v) => v.len(),
        }
    }

    /// Whether the column has no rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An ordered collection of equal-length named columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<(String, Column)>,
}

impl Frame {
    /// Create an empty frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows
    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, |(_, c)| c.len())
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Column names in insertion order
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Whether a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    /// Get a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    /// Get a numeric column, failing if missing or non-numeric
    pub fn floats(&self, name: &str) -> Result<&[f64]> {
        match self.column(name) {
            Some(Column::Float(v)) => Ok(v),
            Some(Column::Str(_)) => Err(Error::ColumnType(name.to_string(), "float")),
            None => Err(Error::MissingColumn(name.to_string())),
        }
    }

    /// Get a text column, failing if missing or non-text
    pub fn strs(&self, name: &str) -> Result<&[Option<String>]> {
        match self.column(name) {
            Some(Column::Str(v)) => Ok(v),
            Some(Column::Float(_)) => Err(Error::ColumnType(name.to_string(), "str")),
            None => Err(Error::MissingColumn(name.to_string())),
        }
    }

    /// Append or replace a column, returning the new frame
    ///
    /// Fails if the column length disagrees with the frame height.
    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> Result<Self> {
        let name = name.into();
        if !self.columns.is_empty() && column.len() != self.height() {
            return Err(Error::ColumnType(name, "length matching frame height"));
        }
        if let Some(slot) = self.columns.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = column;
        } else {
            self.columns.push((name, column));
        }
        Ok(self)
    }

    /// Drop the named columns, returning the new frame
    ///
    /// Columns absent from the frame are ignored, matching the tolerant
    /// drop the cleaning stages need when optional fields never arrived.
    pub fn drop_columns(mut self, names: &[&str]) -> Self {
        self.columns.retain(|(n, _)| !names.contains(&n.as_str()));
        self
    }

    /// Keep only rows where the mask is true, returning the new frame
    ///
    /// The mask must be exactly one entry per row.
    pub fn filter(&self, mask: &[bool]) -> Result<Self> {
        if mask.len() != self.height() {
            return Err(Error::EmptyInput(format!(
                "filter mask has {} entries for {} rows",
                mask.len(),
                self.height()
            )));
        }
        let columns = self
            .columns
            .iter()
            .map(|(name, col)| {
                let filtered = match col {
                    Column::Float(v) => Column::Float(
                        v.iter().zip(mask).filter(|(_, &m)| m).map(|(x, _)| *x).collect(),
                    ),
                    Column::Str(v) => Column::Str(
                        v.iter().zip(mask).filter(|(_, &m)| m).map(|(x, _)| x.clone()).collect(),
                    ),
                };
                (name.clone(), filtered)
            })
            .collect();
        Ok(Self { columns })
    }

    /// Names of all numeric columns, in insertion order
    pub fn float_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|(_, c)| matches!(c, Column::Float(_)))
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// Require the named columns to exist, failing fast otherwise
    pub fn require(&self, names: &[&str]) -> Result<()> {
        for &name in names {
            if !self.has_column(name) {
                return Err(Error::MissingColumn(name.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        Frame::new()
            .with_column("price", Column::Float(vec![100.0, 200.0, 300.0]))
            .unwrap()
            .with_column(
                "type",
                Column::Str(vec![Some("Casa".into()), Some("Flat".into()), None]),
            )
            .unwrap()
    }

    #[test]
    fn test_frame_shape() {
        let f = sample();
        assert_eq!(f.height(), 3);
        assert_eq!(f.width(), 2);
        assert_eq!(f.names(), vec!["price", "type"]);
    }

    #[test]
    fn test_floats_access() {
        let f = sample();
        assert_eq!(f.floats("price").unwrap(), &[100.0, 200.0, 300.0]);
        assert!(matches!(f.floats("type"), Err(Error::ColumnType(_, _))));
        assert!(matches!(f.floats("absent"), Err(Error::MissingColumn(_))));
    }

    #[test]
    fn test_with_column_replaces() {
        let f = sample()
            .with_column("price", Column::Float(vec![1.0, 2.0, 3.0]))
            .unwrap();
        assert_eq!(f.width(), 2);
        assert_eq!(f.floats("price").unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_with_column_length_mismatch() {
        let result = sample().with_column("extra", Column::Float(vec![1.0]));
        assert!(result.is_err());
    }

    #[test]
    fn test_filter_keeps_masked_rows() {
        let f = sample().filter(&[true, false, true]).unwrap();
        assert_eq!(f.height(), 2);
        assert_eq!(f.floats("price").unwrap(), &[100.0, 300.0]);
        assert_eq!(f.strs("type").unwrap()[1], None);
    }

    #[test]
    fn test_filter_mask_length_mismatch() {
        assert!(sample().filter(&[true]).is_err());
    }

    #[test]
    fn test_drop_columns_tolerates_absent_names() {
        let f = sample().drop_columns(&["type", "never_there"]);
        assert_eq!(f.names(), vec!["price"]);
    }

    #[test]
    fn test_float_names_skips_text() {
        let f = sample();
        assert_eq!(f.float_names(), vec!["price"]);
    }

    #[test]
    fn test_require() {
        let f = sample();
        assert!(f.require(&["price", "type"]).is_ok());
        assert!(f.require(&["price", "size"]).is_err());
    }

    #[test]
    fn test_filter_does_not_mutate_source() {
        let f = sample();
        let _ = f.filter(&[false, false, false]).unwrap();
        assert_eq!(f.height(), 3);
    }
}
