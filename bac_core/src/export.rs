//! CSV export of a simulated BAC series.

use crate::{Result, SimulationPoint};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    time: String,
    time_ms: i64,
    bac_percent: f64,
}

impl From<&SimulationPoint> for CsvRow {
    fn from(point: &SimulationPoint) -> Self {
        CsvRow {
            time: point.time().to_rfc3339(),
            time_ms: point.time_ms,
            bac_percent: point.bac_percent,
        }
    }
}

/// Write the series as CSV (with header) to any writer
pub fn write_series_csv<W: Write>(points: &[SimulationPoint], writer: W) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(writer);

    for point in points {
        writer.serialize(CsvRow::from(point))?;
    }

    writer.flush()?;
    Ok(())
}

/// Export the series to a CSV file, replacing any existing file
///
/// Returns the number of rows written.
pub fn export_series_csv(points: &[SimulationPoint], path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    write_series_csv(points, &file)?;
    file.sync_all()?;

    tracing::info!("Exported {} samples to {:?}", points.len(), path);
    Ok(points.len())
}
