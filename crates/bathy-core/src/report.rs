//! Read-only comparison of predicted and reference depth.
//!
//! Nothing here feeds back into training; every function only samples the
//! rasters it is given.

use ndarray::Zip;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::consts::{
    DEFAULT_HISTOGRAM_BINS, DEFAULT_REPORT_SCALE, DEFAULT_SCATTER_POINTS, DEFAULT_SCATTER_SEED,
    EPSILON, R2_MAX_PIXELS,
};
use crate::error::{BathyError, Result};
use crate::raster::{Band, Image};
use crate::reduce::{sample_values, ReduceParams};
use crate::region::Region;

/// Band name of the reference-minus-predicted raster.
pub const DIFFERENCE_BAND: &str = "difference";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportParams {
    /// Sampling scale for histograms and scatter, in metres.
    pub scale: f64,
    pub bins: usize,
    pub scatter_points: usize,
    pub seed: u64,
    pub max_pixels: u64,
}

impl Default for ReportParams {
    fn default() -> Self {
        Self {
            scale: DEFAULT_REPORT_SCALE,
            bins: DEFAULT_HISTOGRAM_BINS,
            scatter_points: DEFAULT_SCATTER_POINTS,
            seed: DEFAULT_SCATTER_SEED,
            max_pixels: R2_MAX_PIXELS,
        }
    }
}

impl ReportParams {
    fn reduce(&self) -> ReduceParams {
        ReduceParams::new(self.scale, self.max_pixels, true)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub label: String,
    pub min: f64,
    pub max: f64,
    pub bin_width: f64,
    pub counts: Vec<u64>,
}

impl Histogram {
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Lower edge of every bin.
    pub fn edges(&self) -> Vec<f64> {
        (0..self.counts.len())
            .map(|i| self.min + i as f64 * self.bin_width)
            .collect()
    }
}

/// Least-squares line `y = slope * x + intercept`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trendline {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScatterReport {
    /// (reference, predicted) pairs.
    pub points: Vec<(f64, f64)>,
    pub trendline: Trendline,
}

/// Comparison charts. A chart that could not be computed is `None`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub reference: Option<Histogram>,
    pub predicted: Option<Histogram>,
    pub difference: Option<Histogram>,
    pub scatter: Option<ScatterReport>,
}

/// `reference - predicted` on a shared grid, band `difference`.
pub fn difference(reference: &Image, predicted: &Image) -> Result<Image> {
    reference.ensure_same_grid(predicted)?;
    let r = &reference.first_band().data;
    let p = &predicted.first_band().data;
    let mut out = r.clone();
    Zip::from(&mut out).and(p).for_each(|o, &p| *o -= p);
    Image::new(*reference.transform(), vec![Band::new(DIFFERENCE_BAND, out)])
}

/// Equal-width histogram of `band` spanning its sampled min..max, with
/// `params.bins` bins.
pub fn histogram(
    image: &Image,
    band: &str,
    region: Option<&Region>,
    params: &ReportParams,
) -> Result<Histogram> {
    let bins = params.bins;
    if bins == 0 {
        return Err(BathyError::InvalidConfig("histogram needs at least one bin".into()));
    }
    let values: Vec<f64> = sample_values(image, &[band], region, &params.reduce())?
        .into_iter()
        .map(|v| v[0])
        .collect();
    if values.is_empty() {
        return Err(BathyError::EmptyReduction(format!("histogram of {band}")));
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    let bin_width = if span > EPSILON { span / bins as f64 } else { 1.0 };

    let mut counts = vec![0u64; bins];
    for v in values {
        let idx = (((v - min) / bin_width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    Ok(Histogram {
        label: band.to_string(),
        min,
        max,
        bin_width,
        counts,
    })
}

/// Ordinary least squares fit of `y` on `x`.
pub fn fit_trendline(points: &[(f64, f64)]) -> Result<Trendline> {
    let n = points.len() as f64;
    if points.len() < 2 {
        return Err(BathyError::EmptyReduction("trendline needs two points".into()));
    }
    let mx = points.iter().map(|p| p.0).sum::<f64>() / n;
    let my = points.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for &(x, y) in points {
        sxx += (x - mx) * (x - mx);
        syy += (y - my) * (y - my);
        sxy += (x - mx) * (y - my);
    }
    if sxx < EPSILON {
        return Err(BathyError::DegenerateCovariance {
            context: "trendline".into(),
            detail: "reference values have no spread".into(),
        });
    }
    let slope = sxy / sxx;
    let r_squared = if syy < EPSILON {
        1.0
    } else {
        sxy * sxy / (sxx * syy)
    };
    Ok(Trendline {
        slope,
        intercept: my - slope * mx,
        r_squared,
    })
}

/// Up to `n` (reference, predicted) pairs on pixels valid in both, with a
/// fitted trendline.
pub fn scatter(
    reference: &Image,
    predicted: &Image,
    region: Option<&Region>,
    params: &ReportParams,
) -> Result<ScatterReport> {
    reference.ensure_same_grid(predicted)?;
    let pair = Image::new(
        *reference.transform(),
        vec![
            Band::new("reference", reference.first_band().data.clone()),
            Band::new("predicted", predicted.first_band().data.clone()),
        ],
    )?;
    let all = sample_values(&pair, &["reference", "predicted"], region, &params.reduce())?;
    let take = params.scatter_points.min(all.len());
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let mut picked = rand::seq::index::sample(&mut rng, all.len(), take).into_vec();
    picked.sort_unstable();

    let points: Vec<(f64, f64)> = picked.into_iter().map(|i| (all[i][0], all[i][1])).collect();
    let trendline = fit_trendline(&points)?;
    Ok(ScatterReport { points, trendline })
}

/// Histograms of both rasters and their difference, plus the scatter.
pub fn compare(
    reference: &Image,
    predicted: &Image,
    region: Option<&Region>,
    params: &ReportParams,
) -> Result<(ComparisonReport, Image)> {
    let diff = difference(reference, predicted)?;
    let reference_name = reference.first_band().name.clone();
    let predicted_name = predicted.first_band().name.clone();

    let report = ComparisonReport {
        reference: chart("reference histogram", || {
            histogram(reference, &reference_name, region, params)
        }),
        predicted: chart("predicted histogram", || {
            histogram(predicted, &predicted_name, region, params)
        }),
        difference: chart("difference histogram", || {
            histogram(&diff, DIFFERENCE_BAND, region, params)
        }),
        scatter: chart("scatter", || scatter(reference, predicted, region, params)),
    };
    if let Some(s) = &report.scatter {
        info!(
            scatter_points = s.points.len(),
            slope = s.trendline.slope,
            intercept = s.trendline.intercept,
            "Built comparison report"
        );
    }
    Ok((report, diff))
}

fn chart<T>(name: &str, build: impl FnOnce() -> Result<T>) -> Option<T> {
    match build() {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(chart = name, error = %e, "Comparison chart left undefined");
            None
        }
    }
}
