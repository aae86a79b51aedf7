//! Output formatting and persistence for grading results.
//!
//! Supports pretty-printing, JSON logging and gradebook CSV export
//! (optionally gzip-compressed).

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use tracing::{debug, info};

use crate::grading::types::GradeRow;

/// Logs any value using Rust's debug pretty-print format.
pub fn print_pretty(value: &impl std::fmt::Debug) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes gradebook rows as CSV with a header line to any writer.
pub fn write_gradebook<W: Write>(writer: W, rows: &[GradeRow]) -> Result<W> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(writer);

    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;

    csv_writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to finish CSV output: {}", e.error()))
}

/// Exports gradebook rows to `path`, replacing any existing file.
///
/// With `gzip` set the CSV is compressed and `.gz` is appended to the path
/// unless already present. Returns the path actually written.
pub fn export_gradebook(path: &str, rows: &[GradeRow], gzip: bool) -> Result<String> {
    let target = if gzip && !path.ends_with(".gz") {
        format!("{path}.gz")
    } else {
        path.to_string()
    };
    debug!(path = %target, rows = rows.len(), gzip, "Exporting gradebook");

    let file = File::create(&target).with_context(|| format!("failed to create {target}"))?;

    if gzip {
        let encoder = write_gradebook(GzEncoder::new(file, Compression::default()), rows)?;
        encoder.finish()?;
    } else {
        write_gradebook(file, rows)?;
    }

    Ok(target)
}
