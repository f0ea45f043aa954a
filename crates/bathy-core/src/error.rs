use thiserror::Error;

#[derive(Error, Debug)]
pub enum BathyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Unsupported TIFF sample format: {0}")]
    UnsupportedSample(String),

    #[error("Invalid catalog: {0}")]
    Catalog(String),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No image in collection '{collection}' matches the filter criteria")]
    EmptyCollection { collection: String },

    #[error("Band not found: {0}")]
    BandNotFound(String),

    #[error("Duplicate band name: {0}")]
    DuplicateBand(String),

    #[error("Grid mismatch: expected {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    GridMismatch {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Degenerate covariance in {context}: {detail}")]
    DegenerateCovariance { context: String, detail: String },

    #[error("Region reduction '{0}' returned no statistics")]
    EmptyReduction(String),

    #[error("Mask left no valid pixels: {0}")]
    NoValidPixels(String),

    #[error("Reduction needs {needed} pixels, above the cap of {max_pixels}")]
    TooManyPixels { needed: u64, max_pixels: u64 },

    #[error("Reduction scale {scale} m gives a stride of {stride} pixels, coarser than the {rows}x{cols} grid")]
    ScaleExceedsGrid {
        scale: f64,
        stride: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Model error: {0}")]
    Model(String),
}

pub type Result<T> = std::result::Result<T, BathyError>;
