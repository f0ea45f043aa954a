pub mod report_io;
pub mod tiff_io;
