//! Tabular training data and dataset providers
//!
//! A dataset is a rectangular table of `f64` cells. By convention the last
//! column is the training target; [`TabularData::split_target`] separates it
//! from the feature columns.
//!
//! Datasets are resolved by name through a [`DatasetProvider`]:
//!
//! - [`InMemoryDatasetProvider`]: named tables registered in-process
//! - [`FileDatasetProvider`]: Parquet / CSV / JSON files under a directory
//!
//! ## Usage
//!
//! ```rust
//! use trueno_mlops::dataset::{DatasetProvider, InMemoryDatasetProvider, TabularData};
//!
//! let provider = InMemoryDatasetProvider::new();
//! let table = TabularData::from_rows(vec![vec![1.0, 2.0, 0.0], vec![3.0, 4.0, 1.0]])?;
//! provider.insert("toy", table);
//!
//! let resolved = provider.resolve("toy")?;
//! let (features, target) = resolved.split_target()?;
//! assert_eq!(features, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
//! assert_eq!(target, vec![0.0, 1.0]);
//! # Ok::<(), trueno_mlops::Error>(())
//! ```

mod file;
mod memory;

pub use file::{DatasetInfo, FileDatasetProvider};
pub use memory::InMemoryDatasetProvider;

use crate::{Error, Result};
use arrow::array::{Array, Float64Array};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// Resolves a dataset name to tabular data.
pub trait DatasetProvider: Send + Sync {
    /// Resolve a dataset by name.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no dataset has this name, or a
    /// validation/IO error if the dataset cannot be decoded.
    fn resolve(&self, name: &str) -> Result<Arc<TabularData>>;
}

/// Rectangular table of numeric cells.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularData {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl TabularData {
    /// Create a table from column names and rows.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if any row width differs from the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(Error::validation(format!(
                "row {idx} has {} cells, expected {}",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Create a table from rows, naming columns `col_0`, `col_1`, ...
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the rows are ragged.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let width = rows.first().map_or(0, Vec::len);
        let columns = (0..width).map(|i| format!("col_{i}")).collect();
        Self::new(columns, rows)
    }

    /// Convert Arrow record batches into a table.
    ///
    /// Every column is cast to `Float64`; nulls and uncastable cells are rejected.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` on nulls, non-numeric cells or schema mismatch
    /// between batches.
    pub fn from_record_batches(batches: &[RecordBatch]) -> Result<Self> {
        let Some(first) = batches.first() else {
            return Ok(Self { columns: Vec::new(), rows: Vec::new() });
        };
        let schema = first.schema();
        let columns: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();
        let mut rows = Vec::new();

        for batch in batches {
            if batch.schema() != schema {
                return Err(Error::validation(format!(
                    "Schema mismatch: expected {:?}, got {:?}",
                    schema,
                    batch.schema()
                )));
            }
            let mut cast_columns = Vec::with_capacity(batch.num_columns());
            for (idx, column) in batch.columns().iter().enumerate() {
                let cast = arrow::compute::cast(column, &DataType::Float64)?;
                if cast.null_count() > 0 {
                    return Err(Error::validation(format!(
                        "column '{}' contains null or non-numeric cells",
                        columns[idx]
                    )));
                }
                cast_columns.push(cast);
            }
            let typed: Vec<&Float64Array> = cast_columns
                .iter()
                .filter_map(|c| c.as_any().downcast_ref::<Float64Array>())
                .collect();
            for row in 0..batch.num_rows() {
                rows.push(typed.iter().map(|c| c.value(row)).collect());
            }
        }

        Ok(Self { columns, rows })
    }

    /// Column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Row-major cells.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Split the last column off as the target.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the table is empty or has fewer than two columns.
    pub fn split_target(&self) -> Result<(Vec<Vec<f64>>, Vec<f64>)> {
        if self.rows.is_empty() {
            return Err(Error::validation("dataset has no rows"));
        }
        if self.columns.len() < 2 {
            return Err(Error::validation(format!(
                "dataset needs at least one feature column and a target column, got {} column(s)",
                self.columns.len()
            )));
        }
        let target_idx = self.columns.len() - 1;
        let features = self.rows.iter().map(|r| r[..target_idx].to_vec()).collect();
        let target = self.rows.iter().map(|r| r[target_idx]).collect();
        Ok((features, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int32Array, StringArray};
    use arrow::datatypes::{Field, Schema};

    fn create_test_batch(num_rows: i32) -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("x", DataType::Int32, false),
            Field::new("y", DataType::Float64, false),
            Field::new("label", DataType::Int32, false),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int32Array::from_iter_values(0..num_rows)),
                Arc::new(Float64Array::from_iter_values((0..num_rows).map(|i| f64::from(i) * 0.5))),
                Arc::new(Int32Array::from_iter_values((0..num_rows).map(|i| i % 2))),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = TabularData::from_rows(vec![vec![1.0, 2.0], vec![1.0]]);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_split_target_last_column() {
        let table = TabularData::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        let (features, target) = table.split_target().unwrap();
        assert_eq!(features, vec![vec![1.0, 2.0], vec![4.0, 5.0]]);
        assert_eq!(target, vec![3.0, 6.0]);
    }

    #[test]
    fn test_split_target_needs_two_columns() {
        let table = TabularData::from_rows(vec![vec![1.0], vec![2.0]]).unwrap();
        assert!(matches!(table.split_target(), Err(Error::Validation(_))));

        let empty = TabularData::from_rows(vec![]).unwrap();
        assert!(matches!(empty.split_target(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_from_record_batches_casts_to_f64() {
        let batches = vec![create_test_batch(4), create_test_batch(2)];
        let table = TabularData::from_record_batches(&batches).unwrap();

        assert_eq!(table.columns(), &["x", "y", "label"]);
        assert_eq!(table.num_rows(), 6);
        assert_eq!(table.rows()[3], vec![3.0, 1.5, 1.0]);
        assert_eq!(table.rows()[5], vec![1.0, 0.5, 1.0]);
    }

    #[test]
    fn test_from_record_batches_rejects_text() {
        let schema = Schema::new(vec![Field::new("name", DataType::Utf8, false)]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(StringArray::from(vec!["a", "b"]))],
        )
        .unwrap();

        let result = TabularData::from_record_batches(&[batch]);
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
