use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BathyError, Result};
use crate::raster::Image;

const DIV_PALETTE: [&str; 5] = ["ffffd4", "a1dab4", "41b6c4", "2c7fb8", "253494"];
const BATHY_PALETTE: [&str; 8] = [
    "084594", "2171b5", "4292c6", "6baed6", "9ecae1", "c6dbef", "deebf7", "f7fbff",
];
const DIFFERENCE_PALETTE: [&str; 3] = ["red", "white", "blue"];

/// Display stretch for one layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisParams {
    /// One band (palette ramp) or three bands (RGB). Empty = first band.
    #[serde(default)]
    pub bands: Vec<String>,
    pub min: f64,
    pub max: f64,
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    /// Hex (`"2c7fb8"`, `"#2c7fb8"`) or named colours. Empty = grey ramp.
    #[serde(default)]
    pub palette: Vec<String>,
}

fn default_gamma() -> f64 {
    1.0
}

impl VisParams {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            bands: Vec::new(),
            min,
            max,
            gamma: 1.0,
            palette: Vec::new(),
        }
    }

    pub fn with_bands(mut self, bands: &[&str]) -> Self {
        self.bands = bands.iter().map(|b| b.to_string()).collect();
        self
    }

    pub fn with_palette(mut self, palette: &[&str]) -> Self {
        self.palette = palette.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Topobathy DEM.
    pub fn dem() -> Self {
        Self::new(-3.5, 0.0).with_bands(&["b1"]).with_gamma(0.8)
    }

    /// True colour.
    pub fn rgb() -> Self {
        Self::new(0.01, 0.1).with_bands(&["B4", "B3", "B2"])
    }

    /// Blue/green depth-invariant index, light yellow (shallow) to dark blue.
    pub fn div() -> Self {
        Self::new(-0.81, -0.04)
            .with_bands(&["B2B3"])
            .with_palette(&DIV_PALETTE)
    }

    /// Depth, darker blue is deeper.
    pub fn bathymetry() -> Self {
        Self::new(-9.0, 1.0).with_palette(&BATHY_PALETTE)
    }

    pub fn difference() -> Self {
        Self::new(-5.0, 5.0).with_palette(&DIFFERENCE_PALETTE)
    }
}

/// A rendered-or-not output of one pipeline stage.
#[derive(Clone, Debug)]
pub struct Layer {
    pub name: String,
    pub image: Image,
    pub vis: VisParams,
    /// Layers not shown are kept in the artifact list but not written.
    pub shown: bool,
}

impl Layer {
    pub fn new(name: impl Into<String>, image: Image, vis: VisParams, shown: bool) -> Self {
        Self {
            name: name.into(),
            image,
            vis,
            shown,
        }
    }
}

/// Parse `rrggbb`, `#rrggbb` or a basic colour name.
pub fn parse_color(value: &str) -> Result<[u8; 3]> {
    let named = match value.to_ascii_lowercase().as_str() {
        "black" => Some([0, 0, 0]),
        "white" => Some([255, 255, 255]),
        "red" => Some([255, 0, 0]),
        "green" => Some([0, 128, 0]),
        "blue" => Some([0, 0, 255]),
        "yellow" => Some([255, 255, 0]),
        "cyan" => Some([0, 255, 255]),
        "magenta" => Some([255, 0, 255]),
        "gray" | "grey" => Some([128, 128, 128]),
        _ => None,
    };
    if let Some(rgb) = named {
        return Ok(rgb);
    }

    let hex = value.trim_start_matches('#');
    let channel = |i: usize| {
        hex.get(i..i + 2)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
    };
    match (hex.len(), channel(0), channel(2), channel(4)) {
        (6, Some(r), Some(g), Some(b)) => Ok([r, g, b]),
        _ => Err(BathyError::InvalidConfig(format!("unknown colour '{value}'"))),
    }
}

/// Stretch `v` into [0, 1] with gamma applied.
fn stretch(v: f64, vis: &VisParams) -> f64 {
    let span = vis.max - vis.min;
    let t = if span.abs() > 0.0 { (v - vis.min) / span } else { 0.0 };
    t.clamp(0.0, 1.0).powf(1.0 / vis.gamma)
}

/// Linear interpolation through the palette stops.
fn ramp(t: f64, stops: &[[u8; 3]]) -> [u8; 3] {
    match stops.len() {
        0 => {
            let g = (t * 255.0).round() as u8;
            [g, g, g]
        }
        1 => stops[0],
        n => {
            let pos = t * (n - 1) as f64;
            let i = (pos.floor() as usize).min(n - 2);
            let f = pos - i as f64;
            let mut out = [0u8; 3];
            for (k, o) in out.iter_mut().enumerate() {
                let a = stops[i][k] as f64;
                let b = stops[i + 1][k] as f64;
                *o = (a + (b - a) * f).round() as u8;
            }
            out
        }
    }
}

/// Render a layer to RGBA. Masked pixels are fully transparent black.
pub fn render(image: &Image, vis: &VisParams) -> Result<RgbaImage> {
    if vis.gamma.is_nan() || vis.gamma <= 0.0 {
        return Err(BathyError::InvalidConfig(format!("gamma {} must be positive", vis.gamma)));
    }
    let names: Vec<&str> = if vis.bands.is_empty() {
        vec![image.first_band().name.as_str()]
    } else {
        vis.bands.iter().map(String::as_str).collect()
    };
    let bands = names
        .iter()
        .map(|n| image.band(n))
        .collect::<Result<Vec<_>>>()?;
    let stops = vis
        .palette
        .iter()
        .map(|c| parse_color(c))
        .collect::<Result<Vec<_>>>()?;

    let (h, w) = image.dim();
    let mut out = RgbaImage::new(w as u32, h as u32);
    for row in 0..h {
        for col in 0..w {
            let values: Vec<f64> = bands.iter().map(|b| b[[row, col]]).collect();
            if values.iter().any(|v| !v.is_finite()) {
                continue;
            }
            let rgb = match values.as_slice() {
                [v] => ramp(stretch(*v, vis), &stops),
                [r, g, b] => [r, g, b].map(|v| (stretch(*v, vis) * 255.0).round() as u8),
                _ => {
                    return Err(BathyError::InvalidConfig(format!(
                        "layers render 1 or 3 bands, got {}",
                        values.len()
                    )))
                }
            };
            out.put_pixel(col as u32, row as u32, Rgba([rgb[0], rgb[1], rgb[2], 255]));
        }
    }
    Ok(out)
}

/// Render and save as PNG.
pub fn save_png(image: &Image, vis: &VisParams, path: &Path) -> Result<()> {
    render(image, vis)?.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// File-system friendly version of a layer name.
pub fn layer_file_name(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("{}.png", slug.trim_matches('_'))
}

/// Write every shown layer to `dir` as PNG. Returns the written paths.
pub fn save_layers(layers: &[Layer], dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for layer in layers.iter().filter(|l| l.shown) {
        let path = dir.join(layer_file_name(&layer.name));
        save_png(&layer.image, &layer.vis, &path)?;
        debug!(layer = %layer.name, path = %path.display(), "Saved layer");
        written.push(path);
    }
    Ok(written)
}
