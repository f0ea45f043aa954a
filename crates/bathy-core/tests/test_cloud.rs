#[allow(dead_code)]
mod common;

use bathy_core::cloud::{cloud_mask, mask_clouds, qa_is_clear, CloudParams, QaFlag};
use bathy_core::error::BathyError;
use bathy_core::raster::{Band, Image};
use ndarray::{array, Array2};

#[test]
fn test_qa_is_clear_exhaustive_low_bits() {
    for qa in 0u32..32 {
        assert_eq!(qa_is_clear(qa), qa == 0, "qa = {qa:#07b}");
    }
}

#[test]
fn test_qa_high_bits_ignored() {
    // Bits 5+ (water, aerosol) do not affect clear-sky status.
    assert!(qa_is_clear(0b100000));
    assert!(qa_is_clear(0b11100000));
    assert!(!qa_is_clear(0b100001));
}

#[test]
fn test_qa_flag_bits() {
    let bits: Vec<u32> = QaFlag::ALL.iter().map(|f| f.bit()).collect();
    assert_eq!(bits, vec![1, 2, 4, 8, 16]);
    assert!(QaFlag::Cloud.is_set(8));
    assert!(!QaFlag::Cloud.is_set(16));
    assert!(QaFlag::CloudShadow.is_set(16));
}

#[test]
fn test_cloud_mask_treats_masked_qa_as_cloudy() {
    let qa = array![[0.0, 8.0], [f64::NAN, 32.0]];
    let mask = cloud_mask(&qa);
    assert_eq!(mask, array![[true, false], [false, true]]);
}

#[test]
fn test_mask_clouds_masks_every_band() {
    let image = common::optical_image();
    let masked = mask_clouds(&image, &CloudParams::default()).unwrap();
    let (r, c) = common::CLOUD_PIXEL;
    for band in masked.bands() {
        assert!(band.data[[r, c]].is_nan(), "{} not masked", band.name);
        assert!(band.data[[0, 0]].is_finite());
    }
    assert_eq!(masked.valid_count(), common::ROWS * common::COLS - 1);
}

#[test]
fn test_mask_clouds_does_not_touch_input() {
    let image = common::optical_image();
    let _ = mask_clouds(&image, &CloudParams::default()).unwrap();
    assert_eq!(image.valid_count(), common::ROWS * common::COLS);
}

#[test]
fn test_mask_clouds_all_cloudy_is_error() {
    let qa = Array2::from_elem((3, 3), 8.0);
    let image = Image::new(
        common::grid(),
        vec![
            Band::new("B2", Array2::from_elem((3, 3), 0.1)),
            Band::new("Fmask", qa),
        ],
    )
    .unwrap();
    let err = mask_clouds(&image, &CloudParams::default()).unwrap_err();
    assert!(matches!(err, BathyError::NoValidPixels(_)));
}

#[test]
fn test_mask_clouds_missing_qa_band() {
    let image = common::dem_image();
    let err = mask_clouds(&image, &CloudParams::default()).unwrap_err();
    assert!(matches!(err, BathyError::BandNotFound(ref b) if b == "Fmask"));
}
