use ndarray::{Array2, Zip};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::consts::{
    BOX_KERNEL_RADIUS, DIV_MAX_PIXELS, DIV_REDUCE_SCALE, PARALLEL_PIXEL_THRESHOLD, POSITIVE_EPSILON,
};
use crate::error::{BathyError, Result};
use crate::raster::{Band, Image};
use crate::reduce::{reduce_covariance, CovarianceMatrix, ReduceParams};
use crate::region::Region;

/// Two bands combined into one depth-invariant index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandPair {
    pub first: String,
    pub second: String,
}

impl BandPair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    /// Output band name: the two identifiers concatenated.
    pub fn name(&self) -> String {
        format!("{}{}", self.first, self.second)
    }
}

/// Default blue/green/red pairs.
pub const DEFAULT_BAND_PAIRS: [(&str, &str); 5] = [
    ("B2", "B4"),
    ("B3", "B4"),
    ("B4", "B3"),
    ("B2", "B3"),
    ("B3", "B2"),
];

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DivParams {
    pub pairs: Vec<BandPair>,
    /// Box kernel radius in pixels (2 = 5x5).
    pub kernel_radius: usize,
    pub reduce: ReduceParams,
}

impl Default for DivParams {
    fn default() -> Self {
        Self {
            pairs: DEFAULT_BAND_PAIRS
                .iter()
                .map(|(a, b)| BandPair::new(*a, *b))
                .collect(),
            kernel_radius: BOX_KERNEL_RADIUS,
            reduce: ReduceParams::new(DIV_REDUCE_SCALE, DIV_MAX_PIXELS, true),
        }
    }
}

/// Attenuation coefficient ratio fitted for one band pair.
#[derive(Clone, Debug, Serialize)]
pub struct DivCoefficient {
    pub band: String,
    pub covariance: CovarianceMatrix,
    pub ratio: f64,
}

#[derive(Clone, Debug)]
pub struct DivOutput {
    /// Input image with one extra band per pair.
    pub image: Image,
    pub coefficients: Vec<DivCoefficient>,
}

/// `v` if strictly positive, otherwise [`POSITIVE_EPSILON`].
pub fn make_positive(v: f64) -> f64 {
    if v > 0.0 {
        v
    } else {
        POSITIVE_EPSILON
    }
}

/// Apply [`make_positive`] to every unmasked sample.
pub fn make_positive_image(image: &Image) -> Image {
    image.map_values(make_positive)
}

/// Normalized square box filter of the given radius.
///
/// Masked centres stay masked; masked neighbours are left out and the
/// kernel renormalised over the remaining ones. Edges are treated the same
/// way (out-of-grid neighbours do not count).
pub fn box_smooth_array(data: &Array2<f64>, radius: usize) -> Array2<f64> {
    let (h, w) = data.dim();
    let r = radius as isize;

    let smooth_row = |row: usize| -> Vec<f64> {
        (0..w)
            .map(|col| {
                if !data[[row, col]].is_finite() {
                    return f64::NAN;
                }
                let mut sum = 0.0;
                let mut n = 0usize;
                for dr in -r..=r {
                    let rr = row as isize + dr;
                    if rr < 0 || rr >= h as isize {
                        continue;
                    }
                    for dc in -r..=r {
                        let cc = col as isize + dc;
                        if cc < 0 || cc >= w as isize {
                            continue;
                        }
                        let v = data[[rr as usize, cc as usize]];
                        if v.is_finite() {
                            sum += v;
                            n += 1;
                        }
                    }
                }
                sum / n as f64
            })
            .collect()
    };

    let rows: Vec<Vec<f64>> = if h * w >= PARALLEL_PIXEL_THRESHOLD {
        (0..h).into_par_iter().map(smooth_row).collect()
    } else {
        (0..h).map(smooth_row).collect()
    };

    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((h, w), flat).unwrap_or_else(|_| data.clone())
}

/// Box-smooth every band.
pub fn box_smooth(image: &Image, radius: usize) -> Result<Image> {
    let bands = image
        .bands()
        .iter()
        .map(|b| Band::new(b.name.clone(), box_smooth_array(&b.data, radius)))
        .collect();
    Image::new(*image.transform(), bands)
}

/// Coefficient ratio `k = a + sqrt(a^2 + 1)` with `a = (var1 - var2) / (2 covar)`.
///
/// Fails on zero or non-finite covariance instead of producing NaN.
pub fn attenuation_ratio(cov: &CovarianceMatrix) -> Result<f64> {
    let degenerate = |detail: String| BathyError::DegenerateCovariance {
        context: "depth-invariant index".into(),
        detail,
    };
    if ![cov.var1, cov.var2, cov.covar].iter().all(|v| v.is_finite()) {
        return Err(degenerate(format!("non-finite statistics {cov:?}")));
    }
    if cov.covar == 0.0 {
        return Err(degenerate("band covariance is zero".into()));
    }
    let a = (cov.var1 - cov.var2) / (2.0 * cov.covar);
    let k = a + (a * a + 1.0).sqrt();
    if !k.is_finite() || k <= 0.0 {
        return Err(degenerate(format!("coefficient ratio {k} for a = {a}")));
    }
    Ok(k)
}

/// `ln(b1) - k ln(b2)` on already log-transformed inputs.
pub fn depth_invariant_index(log_b1: f64, log_b2: f64, k: f64) -> f64 {
    log_b1 - k * log_b2
}

/// Smooth, log-transform and append one depth-invariant band per pair.
///
/// `image` is returned unchanged apart from the new bands; the positivity
/// fix and smoothing only feed the index computation.
pub fn div_transform(image: &Image, region: Option<&Region>, params: &DivParams) -> Result<DivOutput> {
    if params.pairs.is_empty() {
        return Err(BathyError::InvalidConfig("no DIV band pairs configured".into()));
    }

    let mut needed: Vec<&str> = Vec::new();
    for p in &params.pairs {
        for b in [p.first.as_str(), p.second.as_str()] {
            if !needed.contains(&b) {
                needed.push(b);
            }
        }
    }
    let prepared = box_smooth(&make_positive_image(&image.select(&needed)?), params.kernel_radius)?;
    let logged = prepared.map_values(f64::ln);

    let mut out = image.clone();
    let mut coefficients = Vec::with_capacity(params.pairs.len());
    for pair in &params.pairs {
        let cov = reduce_covariance(&logged, &pair.first, &pair.second, region, &params.reduce)?;
        let k = attenuation_ratio(&cov)?;

        let l1 = logged.band(&pair.first)?;
        let l2 = logged.band(&pair.second)?;
        let mut index = Array2::from_elem(image.dim(), f64::NAN);
        Zip::from(&mut index).and(l1).and(l2).for_each(|o, &a, &b| {
            *o = depth_invariant_index(a, b, k);
        });

        let name = pair.name();
        debug!(band = %name, ratio = k, var1 = cov.var1, var2 = cov.var2, covar = cov.covar, "DIV pair");
        out = out.add_band(Band::new(name.clone(), index))?;
        coefficients.push(DivCoefficient {
            band: name,
            covariance: cov,
            ratio: k,
        });
    }

    info!(pairs = coefficients.len(), "Computed depth-invariant indices");
    Ok(DivOutput {
        image: out,
        coefficients,
    })
}
