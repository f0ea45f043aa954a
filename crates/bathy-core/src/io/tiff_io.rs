use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ndarray::Array2;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::ColorType;

use crate::error::{BathyError, Result};

fn to_f64<T: Copy + Into<f64>>(buf: Vec<T>) -> Vec<f64> {
    buf.into_iter().map(Into::into).collect()
}

/// Read a single-band TIFF as `f64` samples (rows x cols).
///
/// Integer and float sample types are widened as-is; nodata handling and
/// scaling are left to the caller.
pub fn read_band(path: &Path) -> Result<Array2<f64>> {
    let mut decoder = Decoder::new(BufReader::new(File::open(path)?))?;
    let (width, height) = decoder.dimensions()?;
    match decoder.colortype()? {
        ColorType::Gray(_) => {}
        other => {
            return Err(BathyError::UnsupportedSample(format!(
                "{}: expected one gray channel, found {other:?}",
                path.display()
            )))
        }
    }

    let data = match decoder.read_image()? {
        DecodingResult::U8(buf) => to_f64(buf),
        DecodingResult::U16(buf) => to_f64(buf),
        DecodingResult::U32(buf) => to_f64(buf),
        DecodingResult::I8(buf) => to_f64(buf),
        DecodingResult::I16(buf) => to_f64(buf),
        DecodingResult::I32(buf) => to_f64(buf),
        DecodingResult::F32(buf) => to_f64(buf),
        DecodingResult::F64(buf) => buf,
        DecodingResult::U64(buf) => buf.into_iter().map(|v| v as f64).collect(),
        DecodingResult::I64(buf) => buf.into_iter().map(|v| v as f64).collect(),
    };
    Ok(Array2::from_shape_vec((height as usize, width as usize), data)?)
}

/// Write a band as a 32-bit float gray TIFF. Masked pixels stay NaN.
pub fn write_band(data: &Array2<f64>, path: &Path) -> Result<()> {
    let (h, w) = data.dim();
    let pixels: Vec<f32> = data.iter().map(|&v| v as f32).collect();
    let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path)?))?;
    encoder.write_image::<colortype::Gray32Float>(w as u32, h as u32, &pixels)?;
    Ok(())
}
