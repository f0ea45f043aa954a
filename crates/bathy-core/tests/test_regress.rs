#[allow(dead_code)]
mod common;

use approx::assert_relative_eq;
use bathy_core::error::BathyError;
use bathy_core::feature::{Feature, FeatureCollection};
use bathy_core::raster::Image;
use bathy_core::reduce::ReduceParams;
use bathy_core::regress::{
    clip_to_points, feature_bands, r_squared, rmse, run_bathymetry, train_regressor,
    RegressionParams, DEPTH_BAND,
};
use ndarray::Array2;

fn full() -> ReduceParams {
    ReduceParams::new(30.0, 1_000_000, false)
}

fn depth_image() -> Image {
    Image::single(
        common::grid(),
        "d",
        Array2::from_shape_fn((common::ROWS, common::COLS), |(r, c)| common::depth_at(r, c)),
    )
}

#[test]
fn test_r_squared_identical_is_one() {
    let img = depth_image();
    let r2 = r_squared(&img, &img, None, &full()).unwrap();
    assert_relative_eq!(r2, 1.0, epsilon = 1e-12);
}

#[test]
fn test_r_squared_linear_transform_is_one() {
    let img = depth_image();
    let scaled = img.map_values(|v| 3.0 - 0.5 * v);
    let r2 = r_squared(&img, &scaled, Some(&common::region()), &full()).unwrap();
    assert_relative_eq!(r2, 1.0, epsilon = 1e-12);
}

#[test]
fn test_r_squared_uncorrelated_is_zero() {
    // Row index against column index: zero covariance, non-zero variances.
    let rows = Image::single(common::grid(), "p", Array2::from_shape_fn((5, 5), |(r, _)| r as f64));
    let cols = Image::single(common::grid(), "r", Array2::from_shape_fn((5, 5), |(_, c)| c as f64));
    let r2 = r_squared(&rows, &cols, None, &full()).unwrap();
    assert_relative_eq!(r2, 0.0, epsilon = 1e-12);
}

#[test]
fn test_r_squared_constant_prediction_is_degenerate() {
    let flat = Image::single(common::grid(), "d", Array2::from_elem((common::ROWS, common::COLS), -2.0));
    assert!(matches!(
        r_squared(&flat, &depth_image(), None, &full()),
        Err(BathyError::DegenerateCovariance { .. })
    ));
}

#[test]
fn test_r_squared_needs_overlap() {
    let mut a = Array2::from_elem((4, 4), f64::NAN);
    a[[0, 0]] = 1.0;
    let a = Image::single(common::grid(), "d", a);
    let b = Image::single(common::grid(), "d", Array2::from_elem((4, 4), 2.0));
    assert!(matches!(
        r_squared(&a, &b, None, &full()),
        Err(BathyError::EmptyReduction(_))
    ));
}

#[test]
fn test_rmse_values() {
    let img = depth_image();
    let (zero, n) = rmse(&img, &img, None, &full()).unwrap();
    assert_eq!(zero, 0.0);
    assert_eq!(n, common::ROWS * common::COLS);

    let shifted = img.map_values(|v| v - 1.5);
    let (e, _) = rmse(&shifted, &img, None, &full()).unwrap();
    assert_relative_eq!(e, 1.5, epsilon = 1e-12);
}

#[test]
fn test_rmse_only_counts_shared_pixels() {
    let mut a = Array2::from_elem((3, 3), 0.0);
    a[[1, 1]] = f64::NAN;
    let mut b = Array2::from_elem((3, 3), 2.0);
    b[[0, 0]] = f64::NAN;
    let (e, n) = rmse(
        &Image::single(common::grid(), "p", a),
        &Image::single(common::grid(), "r", b),
        None,
        &full(),
    )
    .unwrap();
    assert_eq!(n, 7);
    assert_relative_eq!(e, 2.0, epsilon = 1e-12);
}

#[test]
fn test_rmse_grid_mismatch() {
    let small = Image::single(common::grid(), "d", Array2::zeros((2, 2)));
    assert!(rmse(&small, &depth_image(), None, &full()).is_err());
}

#[test]
fn test_clip_to_points() {
    let img = depth_image();
    let t = common::grid();
    let (x1, y1) = t.pixel_to_geo(2, 4);
    let (x2, y2) = t.pixel_to_geo(7, 7);
    let points = FeatureCollection::new(vec![
        Feature::new(x1, y1),
        Feature::new(x2 + 3.0, y2 - 3.0),
        Feature::new(1e6, 1e6),
    ]);
    let clipped = clip_to_points(&img, &points).unwrap();
    let d = clipped.band("d").unwrap();
    assert_eq!(common::count_valid(d), 2);
    assert_eq!(d[[2, 4]], common::depth_at(2, 4));
    assert_eq!(d[[7, 7]], common::depth_at(7, 7));
}

#[test]
fn test_feature_bands_default_excludes_qa() {
    let bands = feature_bands(&common::optical_image(), &RegressionParams::default());
    assert_eq!(bands, vec!["B2", "B3", "B4", "B6"]);

    let explicit = RegressionParams {
        feature_bands: Some(vec!["B3".into()]),
        ..Default::default()
    };
    assert_eq!(feature_bands(&common::optical_image(), &explicit), vec!["B3"]);
}

#[test]
fn test_train_regressor_no_overlap() {
    let points = FeatureCollection::new(vec![Feature::new(-100.0, -100.0).with_property("depth", -1.0)]);
    assert!(matches!(
        train_regressor(&common::optical_image(), &points, "depth", &RegressionParams::default()),
        Err(BathyError::NoValidPixels(_))
    ));
}

#[test]
fn test_run_bathymetry_on_synthetic_scene() {
    let image = common::optical_image();
    let water: Vec<Feature> = common::grid_points(common::depth_at)
        .into_iter()
        .filter(|f| f.x > common::CELL * common::LAND_COLS as f64)
        .collect();
    let (training, validation): (Vec<_>, Vec<_>) =
        water.into_iter().enumerate().partition(|(i, _)| i % 3 != 0);
    let training: FeatureCollection = training.into_iter().map(|(_, f)| f).collect();
    let validation: FeatureCollection = validation.into_iter().map(|(_, f)| f).collect();

    let params = RegressionParams {
        r2_reduce: full(),
        rmse_reduce: full(),
        ..Default::default()
    };
    let result = run_bathymetry(
        &image,
        &training,
        &validation,
        "depth",
        Some(&common::region()),
        &params,
    )
    .unwrap();

    assert_eq!(result.training_samples, training.len());
    assert_eq!(result.model.num_trees(), 15);
    assert!(result.predicted.has_band(DEPTH_BAND));
    assert_eq!(common::count_valid(result.predicted.band(DEPTH_BAND).unwrap()), 100);
    assert_eq!(
        common::count_valid(result.clipped.band(DEPTH_BAND).unwrap()),
        validation.len()
    );
    assert_eq!(result.metrics.validation_pixels, validation.len());
    assert!(result.metrics.r_squared > 0.5, "r² = {}", result.metrics.r_squared);
    assert!(result.metrics.rmse < 1.0, "rmse = {}", result.metrics.rmse);
}
