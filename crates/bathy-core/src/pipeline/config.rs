use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cloud::CloudParams;
use crate::div::DivParams;
use crate::error::{BathyError, Result};
use crate::reference::ReferenceParams;
use crate::region::Region;
use crate::regress::RegressionParams;
use crate::report::ReportParams;
use crate::water::WaterParams;

/// Golovin Bay, Alaska (lon/lat).
const GOLOVIN_BAY: [[f64; 2]; 4] = [
    [-163.46897712147512, 64.71290872669046],
    [-163.46897712147512, 64.43223975287069],
    [-162.79469123280327, 64.43223975287069],
    [-162.79469123280327, 64.71290872669046],
];

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub region: RegionConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub cloud: CloudParams,
    #[serde(default)]
    pub water: WaterParams,
    #[serde(default)]
    pub div: DivParams,
    #[serde(default)]
    pub reference: ReferenceParams,
    #[serde(default)]
    pub regression: RegressionParams,
    #[serde(default)]
    pub report: ReportParams,
    #[serde(default)]
    pub output: OutputConfig,
}

impl PipelineConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that do not need any raster data.
    pub fn validate(&self) -> Result<()> {
        self.region.to_region()?;
        if self.sources.start_date >= self.sources.end_date {
            return Err(BathyError::InvalidConfig(format!(
                "start date {} is not before end date {}",
                self.sources.start_date, self.sources.end_date
            )));
        }
        let fraction = self.reference.train_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(BathyError::InvalidConfig(format!(
                "train fraction {fraction} outside (0, 1)"
            )));
        }
        if self.reference.num_points == 0 {
            return Err(BathyError::InvalidConfig("num_points must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Exterior ring, in the coordinate system of the rasters.
    pub coordinates: Vec<[f64; 2]>,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            coordinates: GOLOVIN_BAY.to_vec(),
        }
    }
}

impl RegionConfig {
    pub fn to_region(&self) -> Result<Region> {
        Region::from_coords(&self.coordinates)
    }
}

/// How one scene is picked from the filtered optical collection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneSelection {
    /// First scene in catalog order.
    #[default]
    First,
    LeastCloudy,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Catalog directory for the CLI's `CatalogSource`.
    pub catalog: PathBuf,
    pub optical: String,
    pub reference: String,
    /// Inclusive.
    pub start_date: NaiveDate,
    /// Exclusive.
    pub end_date: NaiveDate,
    /// Scenes must have strictly less cloud cover than this (percent).
    pub max_cloud_cover: f64,
    pub scene_selection: SceneSelection,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from("catalog"),
            optical: "HLSL30".into(),
            reference: "USACE_AK_DEM_Mosaic".into(),
            start_date: NaiveDate::from_ymd_opt(2019, 6, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2019, 9, 30).unwrap_or_default(),
            max_cloud_cover: 30.0,
            scene_selection: SceneSelection::First,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    /// Write PNG renderings of the shown layers.
    pub render_layers: bool,
    /// Write predicted and difference rasters as TIFF.
    pub write_rasters: bool,
    /// Write `report.json`.
    pub write_report: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("bathy-output"),
            render_layers: true,
            write_rasters: true,
            write_report: true,
        }
    }
}
