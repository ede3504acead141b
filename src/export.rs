//! ## Table Export
//!
//! Writes materialized result tables to disk for the reporting collaborator.
//! CSV is written with Arrow's CSV writer (header row included); Parquet with Parquet's
//! `ArrowWriter`. Writers are closed before the functions return.

use crate::exceptions::{TaxiEdaError, TaxiEdaResult};
use arrow::csv::Writer as CsvWriter;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use datafusion::prelude::DataFrame;
use parquet::arrow::ArrowWriter;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Output file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Parquet,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Parquet => "parquet",
        }
    }
}

/// Writes `batches` as one CSV file with a header row.
/// With no batches the file still gets the header taken from `schema`.
pub fn write_csv(batches: &[RecordBatch], schema: SchemaRef, path: &Path) -> TaxiEdaResult<()> {
    let file = File::create(path)?;
    let mut writer = CsvWriter::new(file);
    if batches.is_empty() {
        writer.write(&RecordBatch::new_empty(schema))?;
    }
    for batch in batches {
        writer.write(batch)?;
    }
    Ok(())
}

/// Writes `batches` as one Parquet file with the given schema.
pub fn write_parquet(batches: &[RecordBatch], schema: SchemaRef, path: &Path) -> TaxiEdaResult<()> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.close()?;
    Ok(())
}

/// Executes `df` and writes the result to `<dir>/<name>.<ext>`, creating `dir` if needed.
/// Returns the written path.
pub async fn export_frame(
    df: DataFrame,
    dir: &Path,
    name: &str,
    format: ExportFormat,
) -> TaxiEdaResult<PathBuf> {
    if name.trim().is_empty() {
        return Err(TaxiEdaError::InvalidParameter(
            "export name cannot be empty".to_string(),
        ));
    }
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.{}", name, format.extension()));
    let plan_schema: SchemaRef = Arc::new(df.schema().as_arrow().clone());
    let batches = df.collect().await?;
    // Executed batches may carry different field metadata than the logical plan.
    let schema = batches
        .first()
        .map(|batch| batch.schema())
        .unwrap_or(plan_schema);

    match format {
        ExportFormat::Csv => write_csv(&batches, schema, &path)?,
        ExportFormat::Parquet => write_parquet(&batches, schema, &path)?,
    }
    debug!(path = %path.display(), batches = batches.len(), "Exported table");
    Ok(path)
}
