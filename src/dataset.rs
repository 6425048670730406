//! Dataset - immutable in-memory table of flower measurements
//!
//! Loaded once at startup, either from the bundled iris CSV or from a
//! user-supplied CSV with the same header names. Never mutated afterwards.

use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Bundled sample data (Fisher's iris, 150 rows)
const IRIS_CSV: &str = include_str!("../data/iris.csv");

const COLUMNS: [&str; 5] = [
    "sepal_length",
    "sepal_width",
    "petal_length",
    "petal_width",
    "species",
];

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to read dataset {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Dataset is empty")]
    Empty,
    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing column '{0}' in header")]
    MissingColumn(&'static str),
    #[error("Row {row}: expected {expected} fields, found {found}")]
    ShortRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Row {row}: invalid number '{value}' in column '{column}'")]
    BadNumber {
        row: usize,
        column: &'static str,
        value: String,
    },
}

/// One dataset row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub sepal_length: f64,
    pub sepal_width: f64,
    pub petal_length: f64,
    pub petal_width: f64,
    pub species: String,
}

/// Shared, read-only sequence of records
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Arc<[Record]>,
}

impl Deref for Dataset {
    type Target = [Record];

    fn deref(&self) -> &[Record] {
        &self.records
    }
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: records.into(),
        }
    }

    /// The bundled iris table
    pub fn iris() -> Result<Self, DatasetError> {
        Self::from_csv(IRIS_CSV)
    }

    /// Load from a CSV file on disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        tracing::info!("Loading dataset from {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_csv(&content)
    }

    /// Parse CSV text with a header row naming the columns.
    /// Extra columns are ignored; column order is free. Quoted fields and a
    /// leading UTF-8 BOM are handled by the reader.
    pub fn from_csv(text: &str) -> Result<Self, DatasetError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        if headers.iter().all(str::is_empty) {
            return Err(DatasetError::Empty);
        }

        let mut index = [0usize; COLUMNS.len()];
        for (slot, name) in index.iter_mut().zip(COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h == name)
                .ok_or(DatasetError::MissingColumn(name))?;
        }
        let width = index.iter().copied().max().unwrap_or(0) + 1;

        let mut records = Vec::new();
        for result in reader.records() {
            let fields = result?;
            let row = fields.position().map(|p| p.line() as usize).unwrap_or(0);
            if fields.len() < width {
                return Err(DatasetError::ShortRow {
                    row,
                    expected: width,
                    found: fields.len(),
                });
            }

            let number = |col: usize| -> Result<f64, DatasetError> {
                let raw = &fields[index[col]];
                raw.parse().map_err(|_| DatasetError::BadNumber {
                    row,
                    column: COLUMNS[col],
                    value: raw.to_string(),
                })
            };

            records.push(Record {
                sepal_length: number(0)?,
                sepal_width: number(1)?,
                petal_length: number(2)?,
                petal_width: number(3)?,
                species: fields[index[4]].to_string(),
            });
        }

        if records.is_empty() {
            return Err(DatasetError::Empty);
        }

        tracing::debug!("Parsed {} records", records.len());
        Ok(Self::new(records))
    }

    /// Distinct species, sorted
    pub fn species(&self) -> Vec<String> {
        self.species_counts().into_keys().collect()
    }

    /// Row count per species, sorted by species
    pub fn species_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in self.iter() {
            *counts.entry(record.species.clone()).or_insert(0) += 1;
        }
        counts
    }
}
