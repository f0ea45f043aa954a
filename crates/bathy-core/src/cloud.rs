use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::consts::{DEFAULT_QA_BAND, QA_CLOUD_BITS};
use crate::error::{BathyError, Result};
use crate::raster::Image;

/// Fmask quality flags, by bit position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QaFlag {
    Fill = 0,
    DilatedCloud = 1,
    Cirrus = 2,
    Cloud = 3,
    CloudShadow = 4,
}

impl QaFlag {
    pub const ALL: [QaFlag; 5] = [
        QaFlag::Fill,
        QaFlag::DilatedCloud,
        QaFlag::Cirrus,
        QaFlag::Cloud,
        QaFlag::CloudShadow,
    ];

    pub fn bit(self) -> u32 {
        1 << self as u32
    }

    pub fn is_set(self, qa: u32) -> bool {
        qa & self.bit() != 0
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudParams {
    /// Name of the bitmask quality band.
    pub qa_band: String,
}

impl Default for CloudParams {
    fn default() -> Self {
        Self {
            qa_band: DEFAULT_QA_BAND.to_string(),
        }
    }
}

/// True iff none of the fill/cloud/shadow bits (0-4) are set.
pub fn qa_is_clear(qa: u32) -> bool {
    qa & QA_CLOUD_BITS == 0
}

/// Per-pixel clear-sky mask. Masked or negative QA samples are not clear.
pub fn cloud_mask(qa: &Array2<f64>) -> Array2<bool> {
    qa.mapv(|v| v.is_finite() && v >= 0.0 && qa_is_clear(v as u32))
}

/// Mask every band of `image` where the quality band flags fill, cloud,
/// cirrus or shadow.
pub fn mask_clouds(image: &Image, params: &CloudParams) -> Result<Image> {
    let mask = cloud_mask(image.band(&params.qa_band)?);
    let clear = mask.iter().filter(|&&m| m).count();
    info!(
        clear,
        total = mask.len(),
        qa_band = %params.qa_band,
        "Applied cloud mask"
    );
    if clear == 0 {
        return Err(BathyError::NoValidPixels("cloud mask removed every pixel".into()));
    }
    image.update_mask(&mask)
}
