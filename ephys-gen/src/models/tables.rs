//! Columnar tables stored as Parquet
//!
//! - `cluster_pixels.pqt`: `cluster_id` (INT32), `x`, `y` (DOUBLE), one row per
//!   good cluster, sorted by descending depth
//! - `trial_intervals.pqt`: `t0`, `t1` (DOUBLE), one row per trial

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use parquet::data_type::{DoubleType, Int32Type};
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::writer::SerializedFileWriter;
use parquet::record::{Row, RowAccessor};
use parquet::schema::parser::parse_message_type;
use thiserror::Error;

const CLUSTER_PIXELS_SCHEMA: &str = "
    message cluster_pixels {
        REQUIRED INT32 cluster_id;
        REQUIRED DOUBLE x;
        REQUIRED DOUBLE y;
    }
";

const TRIAL_INTERVALS_SCHEMA: &str = "
    message trial_intervals {
        REQUIRED DOUBLE t0;
        REQUIRED DOUBLE t1;
    }
";

/// Table encoding/decoding errors
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored columns do not match the expected layout
    #[error("Unexpected table schema: expected {expected:?}, found {found:?}")]
    Schema {
        expected: Vec<&'static str>,
        found: Vec<String>,
    },

    #[error("Column length mismatch: {0}")]
    Length(String),
}

/// Where one cluster was drawn, normalized to the canvas size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterPixel {
    pub cluster_id: i32,
    pub x: f64,
    pub y: f64,
}

/// Cluster pixel positions for one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterPixelTable {
    pub rows: Vec<ClusterPixel>,
}

impl ClusterPixelTable {
    pub fn new(rows: Vec<ClusterPixel>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_parquet(&self) -> Result<Vec<u8>, TableError> {
        let ids: Vec<i32> = self.rows.iter().map(|r| r.cluster_id).collect();
        let xs: Vec<f64> = self.rows.iter().map(|r| r.x).collect();
        let ys: Vec<f64> = self.rows.iter().map(|r| r.y).collect();
        encode(
            CLUSTER_PIXELS_SCHEMA,
            &[Column::Int32(&ids), Column::Double(&xs), Column::Double(&ys)],
        )
    }

    pub fn read(path: &Path) -> Result<Self, TableError> {
        let rows = decode(path, &["cluster_id", "x", "y"], |row| {
            Ok(ClusterPixel {
                cluster_id: row.get_int(0)?,
                x: row.get_double(1)?,
                y: row.get_double(2)?,
            })
        })?;
        Ok(Self { rows })
    }
}

/// Start/end of one trial in session time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialInterval {
    pub t0: f64,
    pub t1: f64,
}

/// Trial intervals for one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrialIntervalTable {
    pub rows: Vec<TrialInterval>,
}

impl TrialIntervalTable {
    pub fn new(rows: Vec<TrialInterval>) -> Self {
        Self { rows }
    }

    pub fn to_parquet(&self) -> Result<Vec<u8>, TableError> {
        let t0: Vec<f64> = self.rows.iter().map(|r| r.t0).collect();
        let t1: Vec<f64> = self.rows.iter().map(|r| r.t1).collect();
        encode(
            TRIAL_INTERVALS_SCHEMA,
            &[Column::Double(&t0), Column::Double(&t1)],
        )
    }

    pub fn read(path: &Path) -> Result<Self, TableError> {
        let rows = decode(path, &["t0", "t1"], |row| {
            Ok(TrialInterval {
                t0: row.get_double(0)?,
                t1: row.get_double(1)?,
            })
        })?;
        Ok(Self { rows })
    }
}

enum Column<'a> {
    Int32(&'a [i32]),
    Double(&'a [f64]),
}

impl Column<'_> {
    fn len(&self) -> usize {
        match self {
            Column::Int32(v) => v.len(),
            Column::Double(v) => v.len(),
        }
    }
}

/// Encode equally long columns as a single row group
fn encode(schema: &str, columns: &[Column<'_>]) -> Result<Vec<u8>, TableError> {
    if let Some(first) = columns.first() {
        if columns.iter().any(|c| c.len() != first.len()) {
            return Err(TableError::Length(format!(
                "{:?}",
                columns.iter().map(Column::len).collect::<Vec<_>>()
            )));
        }
    }

    let schema = Arc::new(parse_message_type(schema)?);
    let props = Arc::new(WriterProperties::builder().build());
    let mut buf = Vec::new();
    {
        let mut writer = SerializedFileWriter::new(&mut buf, schema, props)?;
        let mut row_group = writer.next_row_group()?;
        for column in columns {
            let mut col = row_group.next_column()?.ok_or_else(|| {
                TableError::Length("more columns than schema fields".to_string())
            })?;
            match column {
                Column::Int32(values) => {
                    col.typed::<Int32Type>().write_batch(values, None, None)?;
                }
                Column::Double(values) => {
                    col.typed::<DoubleType>().write_batch(values, None, None)?;
                }
            }
            col.close()?;
        }
        row_group.close()?;
        writer.close()?;
    }
    Ok(buf)
}

fn decode<T>(
    path: &Path,
    expected: &[&'static str],
    map_row: impl Fn(&Row) -> Result<T, ParquetError>,
) -> Result<Vec<T>, TableError> {
    let reader = SerializedFileReader::new(File::open(path)?)?;

    let found: Vec<String> = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    if found.iter().map(String::as_str).ne(expected.iter().copied()) {
        return Err(TableError::Schema {
            expected: expected.to_vec(),
            found,
        });
    }

    let mut out = Vec::new();
    for row in reader.get_row_iter(None)? {
        out.push(map_row(&row?)?);
    }
    Ok(out)
}
