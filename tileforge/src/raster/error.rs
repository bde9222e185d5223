//! Error types for raster operations.

use std::fmt;

/// Errors that can occur while decoding, resampling or encoding rasters.
#[derive(Debug)]
pub enum RasterError {
    /// TIFF decoding or encoding failed.
    Tiff(tiff::TiffError),
    /// A required georeferencing tag is missing.
    MissingGeoreference(&'static str),
    /// The raster's CRS is not one the pipelines can reproject from.
    UnsupportedCrs(u32),
    /// Projection setup or transformation failed.
    Projection(String),
    /// Band count the codec cannot represent.
    UnsupportedBandCount(usize),
    /// Sample type the codec cannot represent.
    UnsupportedSampleFormat(String),
    /// Pixel buffer does not match the declared dimensions.
    Shape(ndarray::ShapeError),
    /// The source dataset was already closed.
    Closed(String),
    /// Output grid parameters are unusable.
    InvalidGrid(String),
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterError::Tiff(e) => write!(f, "TIFF error: {}", e),
            RasterError::MissingGeoreference(tag) => {
                write!(f, "Raster is not georeferenced: missing {}", tag)
            }
            RasterError::UnsupportedCrs(code) => write!(
                f,
                "Unsupported CRS EPSG:{} (expected EPSG:3857, EPSG:4326 or WGS84 / UTM)",
                code
            ),
            RasterError::Projection(msg) => write!(f, "Projection error: {}", msg),
            RasterError::UnsupportedBandCount(n) => {
                write!(f, "Unsupported band count {} (expected 1, 3 or 4)", n)
            }
            RasterError::UnsupportedSampleFormat(msg) => {
                write!(f, "Unsupported sample format: {}", msg)
            }
            RasterError::Shape(e) => write!(f, "Pixel buffer shape mismatch: {}", e),
            RasterError::Closed(name) => write!(f, "Dataset {} is closed", name),
            RasterError::InvalidGrid(msg) => write!(f, "Invalid grid: {}", msg),
        }
    }
}

impl std::error::Error for RasterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RasterError::Tiff(e) => Some(e),
            RasterError::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<tiff::TiffError> for RasterError {
    fn from(e: tiff::TiffError) -> Self {
        RasterError::Tiff(e)
    }
}

impl From<ndarray::ShapeError> for RasterError {
    fn from(e: ndarray::ShapeError) -> Self {
        RasterError::Shape(e)
    }
}
