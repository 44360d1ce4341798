use crate::domain::listing::{ListingRecord, LISTING_CSV_HEADER};
use crate::error::{Error, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// `dir/filtered_houses_YYYY-MM-DD.csv`. One file per calendar date.
pub fn output_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("filtered_houses_{}.csv", date.format("%Y-%m-%d")))
}

/// Writes `records` with a header row, replacing any existing file.
///
/// Not atomic: a crash mid-write can leave a partial file behind.
pub fn write_csv(records: &[ListingRecord], path: &Path) -> Result<()> {
    let output_err = |detail: String| Error::Output {
        path: path.to_path_buf(),
        detail,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| output_err(e.to_string()))?;
    }

    // Header is written by hand so that an empty set still gets one.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| output_err(e.to_string()))?;

    writer
        .write_record(LISTING_CSV_HEADER)
        .map_err(|e| output_err(e.to_string()))?;
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| output_err(e.to_string()))?;
    }
    writer.flush().map_err(|e| output_err(e.to_string()))?;

    tracing::info!(path = %path.display(), rows = records.len(), "wrote listings csv");
    Ok(())
}
