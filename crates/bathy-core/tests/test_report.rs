#[allow(dead_code)]
mod common;

use approx::assert_relative_eq;
use bathy_core::error::BathyError;
use bathy_core::raster::Image;
use bathy_core::report::{
    compare, difference, fit_trendline, histogram, scatter, ReportParams, DIFFERENCE_BAND,
};
use ndarray::{array, Array2};

fn bins(bins: usize) -> ReportParams {
    ReportParams {
        bins,
        ..ReportParams::default()
    }
}

fn depth_image() -> Image {
    Image::single(
        common::grid(),
        "b1",
        Array2::from_shape_fn((common::ROWS, common::COLS), |(r, c)| common::depth_at(r, c)),
    )
}

#[test]
fn test_difference_masks_either_side() {
    let reference = Image::single(common::grid(), "b1", array![[1.0, 2.0], [f64::NAN, 4.0]]);
    let predicted = Image::single(common::grid(), "depth", array![[0.5, f64::NAN], [1.0, 5.0]]);
    let diff = difference(&reference, &predicted).unwrap();
    let d = diff.band(DIFFERENCE_BAND).unwrap();
    assert_eq!(d[[0, 0]], 0.5);
    assert!(d[[0, 1]].is_nan());
    assert!(d[[1, 0]].is_nan());
    assert_eq!(d[[1, 1]], -1.0);
}

#[test]
fn test_histogram_counts() {
    let img = Image::single(common::grid(), "v", array![[0.0, 1.0, 2.0], [3.0, 4.0, f64::NAN]]);
    let h = histogram(&img, "v", None, &bins(4)).unwrap();
    assert_eq!(h.label, "v");
    assert_eq!(h.min, 0.0);
    assert_eq!(h.max, 4.0);
    assert_relative_eq!(h.bin_width, 1.0);
    // The maximum lands in the last bin.
    assert_eq!(h.counts, vec![1, 1, 1, 2]);
    assert_eq!(h.total(), 5);
    assert_eq!(h.edges(), vec![0.0, 1.0, 2.0, 3.0]);
}

#[test]
fn test_histogram_constant_values() {
    let img = Image::single(common::grid(), "v", Array2::from_elem((3, 3), -2.0));
    let h = histogram(&img, "v", None, &bins(10)).unwrap();
    assert_eq!(h.counts[0], 9);
    assert_eq!(h.total(), 9);
}

#[test]
fn test_histogram_errors() {
    let img = Image::single(common::grid(), "v", Array2::from_elem((3, 3), f64::NAN));
    assert!(matches!(
        histogram(&img, "v", None, &bins(10)),
        Err(BathyError::EmptyReduction(_))
    ));
    assert!(matches!(
        histogram(&depth_image(), "b1", None, &bins(0)),
        Err(BathyError::InvalidConfig(_))
    ));
}

#[test]
fn test_histogram_honours_pixel_cap() {
    // 10x10 capped at 25 pixels coarsens to stride 2, visiting 5x5.
    let params = ReportParams {
        max_pixels: 25,
        ..bins(4)
    };
    let h = histogram(&depth_image(), "b1", None, &params).unwrap();
    assert_eq!(h.total(), 25);
}

#[test]
fn test_fit_trendline_exact_line() {
    let points: Vec<(f64, f64)> = (0..10).map(|i| (i as f64, 2.0 * i as f64 - 1.0)).collect();
    let t = fit_trendline(&points).unwrap();
    assert_relative_eq!(t.slope, 2.0, epsilon = 1e-12);
    assert_relative_eq!(t.intercept, -1.0, epsilon = 1e-12);
    assert_relative_eq!(t.r_squared, 1.0, epsilon = 1e-12);
}

#[test]
fn test_fit_trendline_degenerate() {
    assert!(fit_trendline(&[(1.0, 1.0)]).is_err());
    assert!(matches!(
        fit_trendline(&[(1.0, 1.0), (1.0, 3.0)]),
        Err(BathyError::DegenerateCovariance { .. })
    ));
}

#[test]
fn test_scatter_samples_shared_pixels() {
    let reference = depth_image();
    let predicted = reference.map_values(|v| 0.8 * v + 0.2);
    let params = ReportParams {
        scatter_points: 25,
        ..Default::default()
    };
    let s = scatter(&reference, &predicted, None, &params).unwrap();
    assert_eq!(s.points.len(), 25);
    for &(r, p) in &s.points {
        assert_relative_eq!(p, 0.8 * r + 0.2, epsilon = 1e-12);
    }
    assert_relative_eq!(s.trendline.slope, 0.8, epsilon = 1e-9);
    assert_relative_eq!(s.trendline.intercept, 0.2, epsilon = 1e-9);

    let again = scatter(&reference, &predicted, None, &params).unwrap();
    assert_eq!(s.points, again.points);
}

#[test]
fn test_compare_builds_all_histograms() {
    let reference = depth_image();
    let predicted = Image::single(
        common::grid(),
        "depth",
        reference.band("b1").unwrap().mapv(|v| v + 0.25),
    );
    let (report, diff) = compare(&reference, &predicted, Some(&common::region()), &ReportParams::default()).unwrap();

    let reference_hist = report.reference.unwrap();
    let difference_hist = report.difference.unwrap();
    assert_eq!(reference_hist.label, "b1");
    assert_eq!(report.predicted.unwrap().label, "depth");
    assert_eq!(difference_hist.label, DIFFERENCE_BAND);
    assert_eq!(reference_hist.total(), 100);
    assert_relative_eq!(difference_hist.min, -0.25, epsilon = 1e-12);
    assert_relative_eq!(difference_hist.max, -0.25, epsilon = 1e-12);
    assert_eq!(report.scatter.unwrap().points.len(), 100);
    assert_eq!(common::count_valid(diff.band(DIFFERENCE_BAND).unwrap()), 100);
}

#[test]
fn test_compare_grid_mismatch() {
    let small = Image::single(common::grid(), "depth", Array2::zeros((2, 2)));
    assert!(compare(&depth_image(), &small, None, &ReportParams::default()).is_err());
}

#[test]
fn test_compare_flat_reference_leaves_scatter_undefined() {
    let reference = Image::single(common::grid(), "b1", Array2::from_elem((common::ROWS, common::COLS), -3.0));
    let predicted = depth_image();
    let (report, diff) = compare(&reference, &predicted, None, &ReportParams::default()).unwrap();

    assert!(report.scatter.is_none());
    assert_eq!(report.reference.unwrap().counts[0], 100);
    assert_eq!(report.predicted.unwrap().total(), 100);
    assert_eq!(report.difference.unwrap().total(), 100);
    assert_eq!(common::count_valid(diff.band(DIFFERENCE_BAND).unwrap()), 100);
}

#[test]
fn test_compare_all_masked_leaves_every_chart_undefined() {
    let empty = Image::single(common::grid(), "b1", Array2::from_elem((common::ROWS, common::COLS), f64::NAN));
    let (report, _) = compare(&empty, &depth_image(), None, &ReportParams::default()).unwrap();

    assert!(report.reference.is_none());
    assert!(report.difference.is_none());
    assert!(report.scatter.is_none());
    assert!(report.predicted.is_some());
}
