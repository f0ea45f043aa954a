use std::path::PathBuf;

use chrono::Utc;
use tracing::info;

use crate::error::Result;
use crate::io::report_io::{write_report, RunReport};
use crate::io::tiff_io::write_band;
use crate::render::save_layers;

use super::config::OutputConfig;
use super::types::PipelineOutput;

pub const REPORT_FILE: &str = "report.json";
pub const PREDICTED_FILE: &str = "predicted_depth.tif";
pub const DIFFERENCE_FILE: &str = "difference.tif";

/// Report body for `report.json`.
pub fn run_report(output: &PipelineOutput) -> RunReport {
    RunReport {
        generated_at: Utc::now(),
        scene: output.scene.clone(),
        div: output.coefficients.clone(),
        samples: output.samples,
        metrics: output.metrics,
        comparison: output.comparison.clone(),
    }
}

/// Write the enabled outputs into `config.directory`. Returns every path written.
pub fn write_outputs(output: &PipelineOutput, config: &OutputConfig) -> Result<Vec<PathBuf>> {
    let dir = &config.directory;
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    if config.write_rasters {
        let predicted = dir.join(PREDICTED_FILE);
        write_band(&output.predicted.first_band().data, &predicted)?;
        written.push(predicted);

        let difference = dir.join(DIFFERENCE_FILE);
        write_band(&output.difference.first_band().data, &difference)?;
        written.push(difference);
    }

    if config.render_layers {
        written.extend(save_layers(output.artifacts.layers(), dir)?);
    }

    if config.write_report {
        let path = dir.join(REPORT_FILE);
        write_report(&run_report(output), &path)?;
        written.push(path);
    }

    info!(files = written.len(), directory = %dir.display(), "Wrote outputs");
    Ok(written)
}
