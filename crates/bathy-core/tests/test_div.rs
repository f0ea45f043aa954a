#[allow(dead_code)]
mod common;

use approx::assert_relative_eq;
use bathy_core::consts::POSITIVE_EPSILON;
use bathy_core::div::{
    attenuation_ratio, box_smooth_array, depth_invariant_index, div_transform, make_positive,
    make_positive_image, BandPair, DivParams,
};
use bathy_core::error::BathyError;
use bathy_core::pipeline::PipelineConfig;
use bathy_core::raster::{Band, Image};
use bathy_core::reduce::CovarianceMatrix;
use ndarray::{array, Array2};

#[test]
fn test_make_positive() {
    assert_eq!(make_positive(0.5), 0.5);
    assert_eq!(make_positive(1e-9), 1e-9);
    assert_eq!(make_positive(0.0), POSITIVE_EPSILON);
    assert_eq!(make_positive(-0.3), POSITIVE_EPSILON);
}

#[test]
fn test_make_positive_image_keeps_mask() {
    let img = Image::single(common::grid(), "B2", array![[-1.0, f64::NAN], [0.2, 0.0]]);
    let out = make_positive_image(&img);
    let d = &out.first_band().data;
    assert_eq!(d[[0, 0]], POSITIVE_EPSILON);
    assert!(d[[0, 1]].is_nan());
    assert_eq!(d[[1, 0]], 0.2);
    assert_eq!(d[[1, 1]], POSITIVE_EPSILON);
}

#[test]
fn test_box_smooth_constant_field() {
    let data = Array2::from_elem((7, 7), 3.0);
    let out = box_smooth_array(&data, 2);
    for v in out.iter() {
        assert_relative_eq!(*v, 3.0, epsilon = 1e-12);
    }
}

#[test]
fn test_box_smooth_interior_mean() {
    let data = Array2::from_shape_fn((5, 5), |(r, c)| (r * 5 + c) as f64);
    let out = box_smooth_array(&data, 2);
    // Centre pixel sees the whole 5x5 window.
    assert_relative_eq!(out[[2, 2]], 12.0, epsilon = 1e-12);
    // Corner sees a 3x3 window: rows 0-2, cols 0-2.
    assert_relative_eq!(out[[0, 0]], 6.0, epsilon = 1e-12);
}

#[test]
fn test_box_smooth_excludes_masked_neighbours() {
    let data = array![[1.0, f64::NAN, 1.0], [1.0, 1.0, 100.0], [f64::NAN, 1.0, 1.0]];
    let out = box_smooth_array(&data, 1);
    assert!(out[[0, 1]].is_nan());
    assert!(out[[2, 0]].is_nan());
    // (0, 0) neighbours: (0,0)=1, (1,0)=1, (1,1)=1; (0,1) is masked.
    assert_relative_eq!(out[[0, 0]], 1.0, epsilon = 1e-12);
    assert_relative_eq!(out[[1, 1]], (6.0 + 100.0) / 7.0, epsilon = 1e-12);
}

#[test]
fn test_attenuation_ratio_formula() {
    let cov = CovarianceMatrix {
        var1: 0.5,
        var2: 0.2,
        covar: 0.25,
        count: 10,
    };
    let a: f64 = (0.5 - 0.2) / (2.0 * 0.25);
    let k = attenuation_ratio(&cov).unwrap();
    assert_relative_eq!(k, a + (a * a + 1.0).sqrt(), epsilon = 1e-12);
    assert!(k > 0.0);
}

#[test]
fn test_attenuation_ratio_positive_for_negative_covariance() {
    let cov = CovarianceMatrix {
        var1: 0.1,
        var2: 0.4,
        covar: -0.3,
        count: 10,
    };
    assert!(attenuation_ratio(&cov).unwrap() > 0.0);
}

#[test]
fn test_attenuation_ratio_zero_covariance() {
    let cov = CovarianceMatrix {
        var1: 0.1,
        var2: 0.4,
        covar: 0.0,
        count: 10,
    };
    assert!(matches!(
        attenuation_ratio(&cov),
        Err(BathyError::DegenerateCovariance { .. })
    ));
}

#[test]
fn test_depth_invariant_index() {
    let (b1, b2, k): (f64, f64, f64) = (0.05, 0.03, 1.7);
    assert_relative_eq!(
        depth_invariant_index(b1.ln(), b2.ln(), k),
        b1.ln() - k * b2.ln(),
        epsilon = 1e-12
    );
}

#[test]
fn test_band_pair_name() {
    assert_eq!(BandPair::new("B2", "B3").name(), "B2B3");
    let names: Vec<String> = DivParams::default().pairs.iter().map(BandPair::name).collect();
    assert_eq!(names, vec!["B2B4", "B3B4", "B4B3", "B2B3", "B3B2"]);
}

#[test]
fn test_div_transform_appends_pairs() {
    let image = common::optical_image();
    let region = common::region();
    let out = div_transform(&image, Some(&region), &DivParams::default()).unwrap();

    assert_eq!(
        out.image.band_names(),
        vec!["B2", "B3", "B4", "B6", "Fmask", "B2B4", "B3B4", "B4B3", "B2B3", "B3B2"]
    );
    assert_eq!(out.coefficients.len(), 5);
    for c in &out.coefficients {
        assert!(c.ratio > 0.0 && c.ratio.is_finite(), "{}: {}", c.band, c.ratio);
        assert_eq!(c.covariance.count, common::ROWS * common::COLS);
    }
    // Source bands pass through unchanged.
    assert_eq!(out.image.band("B2").unwrap(), image.band("B2").unwrap());
}

#[test]
fn test_div_transform_on_smoothed_log_bands() {
    let image = common::optical_image();
    let params = DivParams {
        pairs: vec![BandPair::new("B2", "B3")],
        ..Default::default()
    };
    let out = div_transform(&image, None, &params).unwrap();
    let k = out.coefficients[0].ratio;

    let s2 = box_smooth_array(image.band("B2").unwrap(), 2);
    let s3 = box_smooth_array(image.band("B3").unwrap(), 2);
    let div = out.image.band("B2B3").unwrap();
    for (r, c) in [(0, 0), (4, 5), (9, 9)] {
        let expected = s2[[r, c]].ln() - k * s3[[r, c]].ln();
        assert_relative_eq!(div[[r, c]], expected, epsilon = 1e-10);
    }
}

#[test]
fn test_div_transform_constant_band_is_degenerate() {
    let flat = Array2::from_elem((4, 4), 0.05);
    let image = Image::new(
        common::grid(),
        vec![Band::new("B2", flat.clone()), Band::new("B3", flat)],
    )
    .unwrap();
    let params = DivParams {
        pairs: vec![BandPair::new("B2", "B3")],
        ..Default::default()
    };
    assert!(matches!(
        div_transform(&image, None, &params),
        Err(BathyError::DegenerateCovariance { .. })
    ));
}

#[test]
fn test_div_transform_missing_band() {
    let image = common::dem_image();
    assert!(matches!(
        div_transform(&image, None, &DivParams::default()),
        Err(BathyError::BandNotFound(_))
    ));
}

#[test]
fn test_div_transform_on_lonlat_grid() {
    // 0.0003 degree cells at 64.6N are about 22 m, so the 30 m scale visits
    // every pixel.
    let image = common::lonlat_optical_image();
    let region = PipelineConfig::default().region.to_region().unwrap();
    let out = div_transform(&image, Some(&region), &DivParams::default()).unwrap();

    assert_eq!(out.coefficients.len(), 5);
    for c in &out.coefficients {
        assert!(c.ratio > 0.0 && c.ratio.is_finite(), "{}: {}", c.band, c.ratio);
        assert_eq!(c.covariance.count, common::LONLAT_SIZE * common::LONLAT_SIZE);
    }
}
