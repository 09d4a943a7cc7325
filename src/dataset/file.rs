//! File-backed dataset provider (Parquet / CSV / JSON)
//!
//! Datasets are plain files directly under a root directory and are addressed
//! by file name. Parquet and CSV files are read into Arrow record batches; a
//! CSV file starts with a header row and its column types are inferred. JSON
//! files hold either an array of row arrays or an array of objects (column
//! order is taken from the first object).

use super::{DatasetProvider, TabularData};
use crate::{Error, Result};
use arrow::record_batch::RecordBatch;
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Listing entry for a dataset file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetInfo {
    /// File name, used as the dataset name
    pub name: String,
    /// Full path on disk
    pub path: PathBuf,
    /// File size in bytes
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Parquet,
    Csv,
    Json,
}

impl Format {
    fn of(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("parquet") => Some(Self::Parquet),
            Some("csv") => Some(Self::Csv),
            Some("json") => Some(Self::Json),
            _ => None,
        }
    }
}

/// Dataset provider rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileDatasetProvider {
    root: PathBuf,
}

impl FileDatasetProvider {
    /// Create a provider over `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory cannot be created.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        tracing::debug!(root = %root.display(), "dataset provider opened");
        Ok(Self { root })
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List supported dataset files, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory cannot be read.
    pub fn list(&self) -> Result<Vec<DatasetInfo>> {
        let mut datasets = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if Format::of(&path).is_none() || !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            datasets.push(DatasetInfo {
                name,
                size_bytes: entry.metadata()?.len(),
                path,
            });
        }
        datasets.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::info!(count = datasets.len(), "listed datasets");
        Ok(datasets)
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        let candidate = Path::new(name);
        let is_plain_name = candidate.components().count() == 1
            && candidate.file_name().is_some_and(|n| n == candidate.as_os_str());
        if name.is_empty() || !is_plain_name {
            return Err(Error::validation(format!(
                "dataset name must be a plain file name, got '{name}'"
            )));
        }
        Ok(self.root.join(candidate))
    }
}

impl DatasetProvider for FileDatasetProvider {
    fn resolve(&self, name: &str) -> Result<Arc<TabularData>> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(Error::NotFound(format!("dataset {name}")));
        }
        tracing::info!(dataset = name, path = %path.display(), "loading dataset");
        let table = match Format::of(&path) {
            Some(Format::Parquet) => TabularData::from_record_batches(&load_parquet(&path)?)?,
            Some(Format::Csv) => TabularData::from_record_batches(&load_csv(&path)?)?,
            Some(Format::Json) => load_json(&path)?,
            None => {
                return Err(Error::validation(
                    "Unsupported file format. Only Parquet, CSV and JSON are supported.",
                ))
            }
        };
        Ok(Arc::new(table))
    }
}

/// Read every record batch of a Parquet file into memory.
fn load_parquet(path: &Path) -> Result<Vec<RecordBatch>> {
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    let file = File::open(path)?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| Error::validation(format!("Failed to parse Parquet file: {e}")))?;

    let reader = builder
        .build()
        .map_err(|e| Error::validation(format!("Failed to create Parquet reader: {e}")))?;

    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch?);
    }
    Ok(batches)
}

/// Read a CSV file with a header row, inferring column types from the data.
fn load_csv(path: &Path) -> Result<Vec<RecordBatch>> {
    use arrow::csv::reader::Format as CsvFormat;
    use arrow::csv::ReaderBuilder;
    use std::io::{Seek, SeekFrom};

    let mut file = File::open(path)?;
    let (schema, _) = CsvFormat::default()
        .with_header(true)
        .infer_schema(&mut file, None)
        .map_err(|e| Error::validation(format!("Failed to infer CSV schema: {e}")))?;
    file.seek(SeekFrom::Start(0))?;

    let reader = ReaderBuilder::new(Arc::new(schema))
        .with_header(true)
        .build(file)
        .map_err(|e| Error::validation(format!("Failed to create CSV reader: {e}")))?;

    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch.map_err(|e| Error::validation(format!("Failed to read CSV file: {e}")))?);
    }
    Ok(batches)
}

fn load_json(path: &Path) -> Result<TabularData> {
    let value: Value = serde_json::from_reader(std::io::BufReader::new(File::open(path)?))?;
    let Value::Array(records) = value else {
        return Err(Error::validation("JSON dataset must be an array of rows"));
    };

    match records.first() {
        None => TabularData::from_rows(Vec::new()),
        Some(Value::Object(first)) => {
            let columns: Vec<String> = first.keys().cloned().collect();
            let mut rows = Vec::with_capacity(records.len());
            for (idx, record) in records.iter().enumerate() {
                let Value::Object(map) = record else {
                    return Err(Error::validation(format!("row {idx} is not an object")));
                };
                let row = columns
                    .iter()
                    .map(|c| cell(map.get(c).unwrap_or(&Value::Null), idx, c))
                    .collect::<Result<Vec<f64>>>()?;
                rows.push(row);
            }
            TabularData::new(columns, rows)
        }
        Some(_) => {
            let mut rows = Vec::with_capacity(records.len());
            for (idx, record) in records.iter().enumerate() {
                let Value::Array(cells) = record else {
                    return Err(Error::validation(format!("row {idx} is not an array")));
                };
                let row = cells
                    .iter()
                    .enumerate()
                    .map(|(col, v)| cell(v, idx, &format!("col_{col}")))
                    .collect::<Result<Vec<f64>>>()?;
                rows.push(row);
            }
            TabularData::from_rows(rows)
        }
    }
}

fn cell(value: &Value, row: usize, column: &str) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        Error::validation(format!("row {row}, column '{column}': non-numeric cell {value}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int64Array};
    use arrow::datatypes::{DataType, Field, Schema};
    use parquet::arrow::ArrowWriter;

    fn write_parquet(path: &Path) {
        let schema = Arc::new(Schema::new(vec![
            Field::new("f0", DataType::Float64, false),
            Field::new("target", DataType::Int64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Float64Array::from(vec![0.5, 1.5, 2.5])),
                Arc::new(Int64Array::from(vec![0, 1, 1])),
            ],
        )
        .unwrap();
        let mut writer = ArrowWriter::try_new(File::create(path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn test_resolve_parquet() {
        let dir = tempfile::tempdir().unwrap();
        write_parquet(&dir.path().join("train.parquet"));
        let provider = FileDatasetProvider::open(dir.path()).unwrap();

        let table = provider.resolve("train.parquet").unwrap();
        assert_eq!(table.columns(), &["f0", "target"]);
        assert_eq!(table.rows()[1], vec![1.5, 1.0]);
    }

    #[test]
    fn test_resolve_json_objects_keeps_column_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("d.json"),
            r#"[{"z": 1, "a": 2, "label": true}, {"z": 3, "a": "4.5", "label": false}]"#,
        )
        .unwrap();
        let provider = FileDatasetProvider::open(dir.path()).unwrap();

        let table = provider.resolve("d.json").unwrap();
        assert_eq!(table.columns(), &["z", "a", "label"]);
        assert_eq!(table.rows(), &[vec![1.0, 2.0, 1.0], vec![3.0, 4.5, 0.0]]);
    }

    #[test]
    fn test_resolve_json_arrays() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("d.json"), "[[1, 2, 0], [3, 4, 1]]").unwrap();
        let provider = FileDatasetProvider::open(dir.path()).unwrap();

        let (features, target) = provider.resolve("d.json").unwrap().split_target().unwrap();
        assert_eq!(features, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(target, vec![0.0, 1.0]);
    }

    #[test]
    fn test_resolve_csv_with_header() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("iris.csv"), "a,b,label\n1,2,0\n3,4,1\n").unwrap();
        let provider = FileDatasetProvider::open(dir.path()).unwrap();

        let table = provider.resolve("iris.csv").unwrap();
        assert_eq!(table.columns(), &["a", "b", "label"]);
        assert_eq!(table.num_rows(), 2);
        let (features, target) = table.split_target().unwrap();
        assert_eq!(features, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(target, vec![0.0, 1.0]);
    }

    #[test]
    fn test_resolve_csv_mixed_numeric_types() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("m.csv"), "x,y\n0.5,1\n1.5,0\n").unwrap();
        let provider = FileDatasetProvider::open(dir.path()).unwrap();

        let table = provider.resolve("m.csv").unwrap();
        assert_eq!(table.rows(), &[vec![0.5, 1.0], vec![1.5, 0.0]]);
    }

    #[test]
    fn test_resolve_csv_with_text_column_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("s.csv"), "x,species\n1,setosa\n2,virginica\n").unwrap();
        let provider = FileDatasetProvider::open(dir.path()).unwrap();

        assert!(matches!(provider.resolve("s.csv"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_resolve_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        std::fs::write(dir.path().join("bad.json"), r#"[[1, null]]"#).unwrap();
        let provider = FileDatasetProvider::open(dir.path()).unwrap();

        assert!(matches!(provider.resolve("missing.json"), Err(Error::NotFound(_))));
        assert!(matches!(provider.resolve("notes.txt"), Err(Error::Validation(_))));
        assert!(matches!(provider.resolve("bad.json"), Err(Error::Validation(_))));
        assert!(matches!(provider.resolve("../etc/passwd"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_list_only_supported_files() {
        let dir = tempfile::tempdir().unwrap();
        write_parquet(&dir.path().join("b.parquet"));
        std::fs::write(dir.path().join("a.json"), "[]").unwrap();
        std::fs::write(dir.path().join("c.csv"), "x,y").unwrap();
        std::fs::write(dir.path().join("d.txt"), "x,y").unwrap();
        std::fs::create_dir(dir.path().join("e.csv")).unwrap();
        let provider = FileDatasetProvider::open(dir.path()).unwrap();

        let listed = provider.list().unwrap();
        let names: Vec<&str> = listed.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.json", "b.parquet", "c.csv"]);
        assert_eq!(listed[0].size_bytes, 2);
    }
}
