use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{BathyError, Result};
use crate::raster::Image;
use crate::region::Region;

/// Controls how a region reduction walks the grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReduceParams {
    /// Sampling scale in metres. Coarser than the cell size means every
    /// `round(scale / cell)`-th pixel is visited.
    pub scale: f64,
    /// Maximum number of pixels the reduction may visit.
    pub max_pixels: u64,
    /// Coarsen the stride instead of failing when `max_pixels` is exceeded.
    pub best_effort: bool,
}

impl ReduceParams {
    pub fn new(scale: f64, max_pixels: u64, best_effort: bool) -> Self {
        Self {
            scale,
            max_pixels,
            best_effort,
        }
    }
}

/// 2x2 sample covariance of two bands.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CovarianceMatrix {
    pub var1: f64,
    pub var2: f64,
    pub covar: f64,
    /// Number of pixel pairs the statistics were computed from.
    pub count: usize,
}

impl CovarianceMatrix {
    /// Sample covariance (n - 1 denominator) of paired values.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Option<Self> {
        let n = pairs.len();
        if n < 2 {
            return None;
        }
        let nf = n as f64;
        let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / nf;
        let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / nf;

        let (mut saa, mut sbb, mut sab) = (0.0, 0.0, 0.0);
        for &(a, b) in pairs {
            let da = a - mean_a;
            let db = b - mean_b;
            saa += da * da;
            sbb += db * db;
            sab += da * db;
        }
        let denom = nf - 1.0;
        Some(Self {
            var1: saa / denom,
            var2: sbb / denom,
            covar: sab / denom,
            count: n,
        })
    }

    /// Element access in matrix order: (0,0) = var1, (1,1) = var2, else covar.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        match (row, col) {
            (0, 0) => self.var1,
            (1, 1) => self.var2,
            _ => self.covar,
        }
    }
}

/// Pixel stride honoring `scale`, coarsened to fit `max_pixels` when allowed.
///
/// `cell_size` is the ground size of one cell in metres. A scale whose stride
/// would step over the whole grid is an error.
pub fn resolve_stride(cell_size: f64, dim: (usize, usize), params: &ReduceParams) -> Result<usize> {
    if params.max_pixels == 0 {
        return Err(BathyError::InvalidConfig("max_pixels must be positive".into()));
    }
    let positive = |v: f64| v.is_finite() && v > 0.0;
    if !positive(params.scale) || !positive(cell_size) {
        return Err(BathyError::InvalidConfig(format!(
            "reduction scale {} and cell size {} must be positive",
            params.scale, cell_size
        )));
    }

    let base = (params.scale / cell_size).round().max(1.0) as usize;
    if base > dim.0 && base > dim.1 {
        return Err(BathyError::ScaleExceedsGrid {
            scale: params.scale,
            stride: base,
            rows: dim.0,
            cols: dim.1,
        });
    }
    let mut stride = base;
    loop {
        let needed = (dim.0.div_ceil(stride) * dim.1.div_ceil(stride)) as u64;
        if needed <= params.max_pixels {
            if stride != base {
                warn!(base, stride, needed, "Best-effort reduction coarsened the stride");
            }
            return Ok(stride);
        }
        if !params.best_effort {
            return Err(BathyError::TooManyPixels {
                needed,
                max_pixels: params.max_pixels,
            });
        }
        stride *= 2;
    }
}

/// Values of `bands` at every visited pixel inside `region` where all of
/// them are valid. One inner vec per pixel, in band order.
pub fn sample_values(
    image: &Image,
    bands: &[&str],
    region: Option<&Region>,
    params: &ReduceParams,
) -> Result<Vec<Vec<f64>>> {
    let arrays = bands
        .iter()
        .map(|b| image.band(b))
        .collect::<Result<Vec<_>>>()?;
    let dim = image.dim();
    let transform = image.transform();
    let stride = resolve_stride(transform.cell_size_m(dim), dim, params)?;
    let offset = stride / 2;

    let mut out = Vec::new();
    for r in (offset.min(dim.0 - 1)..dim.0).step_by(stride) {
        for c in (offset.min(dim.1 - 1)..dim.1).step_by(stride) {
            if let Some(region) = region {
                let (x, y) = transform.pixel_to_geo(r, c);
                if !region.contains(x, y) {
                    continue;
                }
            }
            let values: Vec<f64> = arrays.iter().map(|a| a[[r, c]]).collect();
            if values.iter().all(|v| v.is_finite()) {
                out.push(values);
            }
        }
    }
    Ok(out)
}

/// Mean of one band over the region.
pub fn reduce_mean(
    image: &Image,
    band: &str,
    region: Option<&Region>,
    params: &ReduceParams,
) -> Result<f64> {
    let values = sample_values(image, &[band], region, params)?;
    if values.is_empty() {
        return Err(BathyError::EmptyReduction(format!("mean of {band}")));
    }
    Ok(values.iter().map(|v| v[0]).sum::<f64>() / values.len() as f64)
}

/// Covariance matrix of two bands over the region.
pub fn reduce_covariance(
    image: &Image,
    first: &str,
    second: &str,
    region: Option<&Region>,
    params: &ReduceParams,
) -> Result<CovarianceMatrix> {
    let values = sample_values(image, &[first, second], region, params)?;
    let pairs: Vec<(f64, f64)> = values.iter().map(|v| (v[0], v[1])).collect();
    CovarianceMatrix::from_pairs(&pairs)
        .ok_or_else(|| BathyError::EmptyReduction(format!("covariance of {first}/{second}")))
}

/// (min, max) of one band over the region.
pub fn reduce_min_max(
    image: &Image,
    band: &str,
    region: Option<&Region>,
    params: &ReduceParams,
) -> Result<(f64, f64)> {
    let values = sample_values(image, &[band], region, params)?;
    values
        .iter()
        .map(|v| v[0])
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .ok_or_else(|| BathyError::EmptyReduction(format!("min/max of {band}")))
}
