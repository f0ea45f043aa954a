use bathy_core::feature::{Feature, FeatureCollection};
use bathy_core::pipeline::PipelineConfig;
use bathy_core::raster::{Band, GeoTransform, Image, ImageCollection, Scene};
use bathy_core::region::Region;
use bathy_core::source::MemorySource;
use chrono::NaiveDate;
use ndarray::Array2;

pub const ROWS: usize = 10;
pub const COLS: usize = 10;
pub const CELL: f64 = 30.0;

/// Columns 0 and 1 are land; the rest is water.
pub const LAND_COLS: usize = 2;

/// Pixel flagged as cloud (Fmask bit 3).
pub const CLOUD_PIXEL: (usize, usize) = (9, 9);

pub const OPTICAL_ID: &str = "hls";
pub const DEM_ID: &str = "dem";

/// Land and water training points (pixel centres of (5, 0) and (5, 6)).
pub const LAND_POINT: [f64; 2] = [15.0, 150.0];
pub const WATER_POINT: [f64; 2] = [200.0, 150.0];

/// 10x10 grid of 30-unit cells with its upper-left corner at (0, 300).
pub fn grid() -> GeoTransform {
    GeoTransform::north_up(0.0, 300.0, CELL)
}

/// Cell size (degrees) of the lon/lat fixture grid.
pub const LONLAT_CELL: f64 = 0.0003;
pub const LONLAT_SIZE: usize = 200;

/// 200x200 lon/lat grid inside the default Golovin Bay region.
pub fn lonlat_grid() -> GeoTransform {
    GeoTransform::north_up(-163.3, 64.6, LONLAT_CELL)
}

/// Optical bands on [`lonlat_grid`], water everywhere, depth growing to the
/// south-east.
pub fn lonlat_optical_image() -> Image {
    let shape = (LONLAT_SIZE, LONLAT_SIZE);
    let depth = |r: usize, c: usize| 0.5 + (r + c) as f64 * 0.05;
    let band = |k: f64, floor: f64| {
        Array2::from_shape_fn(shape, |(r, c)| floor + 0.06 * (-k * depth(r, c)).exp())
    };
    Image::new(
        lonlat_grid(),
        vec![
            Band::new("B2", band(0.15, 0.02)),
            Band::new("B3", band(0.25, 0.01)),
            Band::new("B4", band(0.6, 0.005)),
            Band::new("B6", Array2::from_elem(shape, 0.005)),
            Band::new("Fmask", Array2::zeros(shape)),
        ],
    )
    .expect("lon/lat optical image")
}

/// Square region slightly larger than the grid.
pub fn region() -> Region {
    Region::from_coords(&[[-1.0, -1.0], [301.0, -1.0], [301.0, 301.0], [-1.0, 301.0]])
        .expect("valid region")
}

pub fn is_land(col: usize) -> bool {
    col < LAND_COLS
}

/// Synthetic depth: deeper to the east and the south. Land is +5.
pub fn depth_at(row: usize, col: usize) -> f64 {
    if is_land(col) {
        5.0
    } else {
        -((col as f64 - 1.0) * 0.5) - row as f64 * 0.1
    }
}

/// Reflectance bands decaying exponentially with depth, plus a Fmask band.
pub fn optical_image() -> Image {
    let band = |f: &dyn Fn(usize, usize) -> f64| Array2::from_shape_fn((ROWS, COLS), |(r, c)| f(r, c));

    let b2 = band(&|r, c| {
        if is_land(c) {
            0.08
        } else {
            0.02 + 0.06 * (-0.15 * depth_at(r, c).abs()).exp()
        }
    });
    let b3 = band(&|r, c| {
        if is_land(c) {
            0.05
        } else {
            0.01 + 0.07 * (-0.25 * depth_at(r, c).abs()).exp()
        }
    });
    let b4 = band(&|r, c| {
        if is_land(c) {
            0.09
        } else {
            0.005 + 0.05 * (-0.6 * depth_at(r, c).abs()).exp()
        }
    });
    let b6 = band(&|_, c| if is_land(c) { 0.2 } else { 0.005 });
    let fmask = band(&|r, c| if (r, c) == CLOUD_PIXEL { 8.0 } else { 0.0 });

    Image::new(
        grid(),
        vec![
            Band::new("B2", b2),
            Band::new("B3", b3),
            Band::new("B4", b4),
            Band::new("B6", b6),
            Band::new("Fmask", fmask),
        ],
    )
    .expect("optical image")
}

pub fn dem_image() -> Image {
    Image::single(
        grid(),
        "b1",
        Array2::from_shape_fn((ROWS, COLS), |(r, c)| depth_at(r, c)),
    )
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn scene(id: &str, date: NaiveDate, cloud_cover: f64, image: Image) -> Scene {
    Scene {
        id: id.to_string(),
        date,
        cloud_cover,
        image,
    }
}

pub fn memory_source() -> MemorySource {
    MemorySource::new()
        .with(ImageCollection::new(
            OPTICAL_ID,
            vec![scene("hls-2019-07-01", date(2019, 7, 1), 10.0, optical_image())],
        ))
        .with(ImageCollection::new(
            DEM_ID,
            vec![scene("dem-tile", date(2018, 1, 1), 0.0, dem_image())],
        ))
}

/// Config wired to [`memory_source`].
pub fn test_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.region.coordinates = vec![[-1.0, -1.0], [301.0, -1.0], [301.0, 301.0], [-1.0, 301.0]];
    config.sources.optical = OPTICAL_ID.into();
    config.sources.reference = DEM_ID.into();
    config.water.land_points = vec![LAND_POINT];
    config.water.water_points = vec![WATER_POINT];
    config.reference.num_points = 100;
    config.reference.seed = 1;
    config
}

/// Points at every pixel centre, carrying `depth` from `f`.
pub fn grid_points<F: Fn(usize, usize) -> f64>(f: F) -> FeatureCollection {
    let t = grid();
    let mut points = Vec::new();
    for r in 0..ROWS {
        for c in 0..COLS {
            let (x, y) = t.pixel_to_geo(r, c);
            points.push(Feature::new(x, y).with_property("depth", f(r, c)));
        }
    }
    FeatureCollection::new(points)
}

pub fn count_valid(data: &Array2<f64>) -> usize {
    data.iter().filter(|v| v.is_finite()).count()
}
