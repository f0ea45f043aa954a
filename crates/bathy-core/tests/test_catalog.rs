#[allow(dead_code)]
mod common;

use std::fs;
use std::path::Path;

use approx::assert_relative_eq;
use bathy_core::error::BathyError;
use bathy_core::io::tiff_io::{read_band, write_band};
use bathy_core::pipeline::run_pipeline;
use bathy_core::source::catalog::{CatalogIndex, CATALOG_FILE};
use bathy_core::source::{CatalogSource, RasterSource};
use ndarray::array;
use tempfile::TempDir;

const TRANSFORM: &str =
    "transform = { origin_x = 0.0, origin_y = 300.0, pixel_width = 30.0, pixel_height = -30.0 }";

/// Write the synthetic optical scene and DEM as TIFFs plus a catalog.
fn write_catalog(dir: &Path) {
    let optical = common::optical_image();
    let mut toml = String::from("[[collection]]\nid = \"hls\"\ndescription = \"synthetic\"\n\n");
    toml.push_str(&format!(
        "[[collection.scene]]\nid = \"hls-1\"\ndate = \"2019-07-01\"\ncloud_cover = 10.0\n{TRANSFORM}\n\n"
    ));
    for name in optical.band_names() {
        let file = format!("hls_{name}.tif");
        // Reflectance is stored as integers scaled by 1e4.
        let stored = if name == "Fmask" {
            optical.band(name).unwrap().clone()
        } else {
            optical.band(name).unwrap().mapv(|v| (v * 10_000.0).round())
        };
        write_band(&stored, &dir.join(&file)).unwrap();
        let scale = if name == "Fmask" { 1.0 } else { 1e-4 };
        toml.push_str(&format!(
            "[[collection.scene.band]]\nname = \"{name}\"\npath = \"{file}\"\nscale = {scale:?}\n\n"
        ));
    }

    let mut dem = common::dem_image().band("b1").unwrap().clone();
    dem[[0, 0]] = -9999.0;
    write_band(&dem, &dir.join("dem.tif")).unwrap();
    toml.push_str(&format!(
        "[[collection]]\nid = \"dem\"\n\n[[collection.scene]]\nid = \"dem-tile\"\ndate = \"2018-01-01\"\n{TRANSFORM}\n\n\
         [[collection.scene.band]]\nname = \"b1\"\npath = \"dem.tif\"\nnodata = -9999.0\n"
    ));
    fs::write(dir.join(CATALOG_FILE), toml).unwrap();
}

#[test]
fn test_tiff_band_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("band.tif");
    let data = array![[0.5, -1.25, f64::NAN], [3.0, 1e-3, 7.0]];
    write_band(&data, &path).unwrap();

    let back = read_band(&path).unwrap();
    assert_eq!(back.dim(), (2, 3));
    assert!(back[[0, 2]].is_nan());
    assert_eq!(back[[0, 1]], -1.25);
    assert_relative_eq!(back[[1, 1]], 1e-3, epsilon = 1e-7);
}

#[test]
fn test_read_band_missing_file() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        read_band(&dir.path().join("nope.tif")),
        Err(BathyError::Io(_))
    ));
}

#[test]
fn test_catalog_index_parse() {
    let text = format!(
        "[[collection]]\nid = \"a\"\n\n[[collection.scene]]\nid = \"s\"\ndate = \"2020-02-29\"\n{TRANSFORM}\n\n\
         [[collection.scene.band]]\nname = \"b1\"\npath = \"x.tif\"\n"
    );
    let index = CatalogIndex::parse(&text).unwrap();
    let c = index.collection("a").unwrap();
    assert_eq!(c.scenes.len(), 1);
    assert_eq!(c.scenes[0].date, common::date(2020, 2, 29));
    assert_eq!(c.scenes[0].cloud_cover, 0.0);
    assert_eq!(c.scenes[0].bands[0].scale, 1.0);
    assert_eq!(c.scenes[0].bands[0].nodata, None);
    assert!(index.collection("b").is_none());
}

#[test]
fn test_catalog_index_rejects_duplicates() {
    let text = "[[collection]]\nid = \"a\"\n\n[[collection]]\nid = \"a\"\n";
    assert!(matches!(CatalogIndex::parse(text), Err(BathyError::Catalog(_))));
}

#[test]
fn test_catalog_index_rejects_bad_date() {
    let text = format!(
        "[[collection]]\nid = \"a\"\n\n[[collection.scene]]\nid = \"s\"\ndate = \"2019-13-01\"\n{TRANSFORM}\n\n\
         [[collection.scene.band]]\nname = \"b1\"\npath = \"x.tif\"\n"
    );
    assert!(matches!(CatalogIndex::parse(&text), Err(BathyError::Toml(_))));
}

#[test]
fn test_catalog_source_loads_scaled_bands() {
    let dir = TempDir::new().unwrap();
    write_catalog(dir.path());

    let source = CatalogSource::open(dir.path()).unwrap();
    assert_eq!(source.collection_ids(), vec!["hls", "dem"]);

    let hls = source.load_collection("hls").unwrap();
    let scene = hls.first().unwrap();
    assert_eq!(scene.id, "hls-1");
    assert_eq!(scene.date, common::date(2019, 7, 1));
    assert_eq!(scene.image.band_names(), vec!["B2", "B3", "B4", "B6", "Fmask"]);
    let expected = common::optical_image();
    assert_relative_eq!(
        scene.image.band("B2").unwrap()[[3, 4]],
        expected.band("B2").unwrap()[[3, 4]],
        epsilon = 1e-4
    );
    assert_eq!(scene.image.band("Fmask").unwrap()[common::CLOUD_PIXEL], 8.0);
}

#[test]
fn test_catalog_source_applies_nodata() {
    let dir = TempDir::new().unwrap();
    write_catalog(dir.path());

    // Opening through the index file path works too.
    let source = CatalogSource::open(&dir.path().join(CATALOG_FILE)).unwrap();
    let dem = source.load_collection("dem").unwrap().mosaic().unwrap();
    let b1 = dem.band("b1").unwrap();
    assert!(b1[[0, 0]].is_nan());
    assert_eq!(b1[[5, 5]], common::depth_at(5, 5) as f32 as f64);
}

#[test]
fn test_catalog_source_unknown_collection() {
    let dir = TempDir::new().unwrap();
    write_catalog(dir.path());
    let source = CatalogSource::open(dir.path()).unwrap();
    assert!(matches!(
        source.load_collection("landsat"),
        Err(BathyError::Catalog(_))
    ));
}

#[test]
fn test_catalog_missing_band_file() {
    let dir = TempDir::new().unwrap();
    write_catalog(dir.path());
    fs::remove_file(dir.path().join("dem.tif")).unwrap();
    let source = CatalogSource::open(dir.path()).unwrap();
    assert!(source.load_collection("dem").is_err());
    assert!(source.load_collection("hls").is_ok());
}

#[test]
fn test_pipeline_from_catalog() {
    let dir = TempDir::new().unwrap();
    write_catalog(dir.path());
    let source = CatalogSource::open(dir.path()).unwrap();

    let output = run_pipeline(&common::test_config(), &source).unwrap();
    assert_eq!(output.scene.id, "hls-1");
    assert!(output.metrics.rmse.is_finite());
}
