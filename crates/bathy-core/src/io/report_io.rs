use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::div::DivCoefficient;
use crate::error::Result;
use crate::regress::AccuracyMetrics;
use crate::report::ComparisonReport;

/// Machine-readable summary of one pipeline run.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub scene: SceneSummary,
    pub div: Vec<DivCoefficient>,
    pub samples: SampleCounts,
    pub metrics: AccuracyMetrics,
    pub comparison: ComparisonReport,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneSummary {
    pub id: String,
    pub date: NaiveDate,
    pub cloud_cover: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleCounts {
    pub reference_points: usize,
    pub training_points: usize,
    pub validation_points: usize,
    /// Training points that landed on valid pixels.
    pub training_samples: usize,
}

pub fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}
