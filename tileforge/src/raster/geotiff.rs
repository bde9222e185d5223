//! GeoTIFF decoding and encoding.
//!
//! Only the subset the pipelines exchange is supported: north-up rasters
//! georeferenced with `ModelPixelScaleTag` + `ModelTiepointTag`, chunky
//! pixel layout, 8/16-bit unsigned or 32-bit float samples. The CRS comes
//! from the GeoKey directory and must be one [`Crs`] knows; rasters
//! without a directory are taken as Web Mercator. A `GDAL_NODATA` tag is
//! read and written when present.

use std::io::Cursor;

use ndarray::Array3;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

use super::{Crs, GeoTransform, PixelType, Raster, RasterError, EPSG_WGS84};

const KEY_MODEL_TYPE: u32 = 1024;
const KEY_RASTER_TYPE: u32 = 1025;
const KEY_GEOGRAPHIC_TYPE: u32 = 2048;
const KEY_PROJECTED_CS_TYPE: u32 = 3072;

const MODEL_TYPE_PROJECTED: u32 = 1;
const MODEL_TYPE_GEOGRAPHIC: u32 = 2;
const RASTER_PIXEL_IS_AREA: u32 = 1;

/// Reads `(key, value)` pairs stored inline in a GeoKey directory.
fn geo_keys(directory: &[u32]) -> Vec<(u32, u32)> {
    // Header: version, revision, minor, key count; then 4 shorts per key
    let count = directory.get(3).copied().unwrap_or(0) as usize;
    directory
        .get(4..)
        .unwrap_or(&[])
        .chunks_exact(4)
        .take(count)
        .filter(|entry| entry[1] == 0 && entry[2] == 1)
        .map(|entry| (entry[0], entry[3]))
        .collect()
}

fn crs_from_keys(directory: &[u32]) -> Result<Crs, RasterError> {
    let keys = geo_keys(directory);
    let lookup = |key: u32| keys.iter().find(|(k, _)| *k == key).map(|(_, v)| *v);

    if let Some(code) = lookup(KEY_PROJECTED_CS_TYPE) {
        return Crs::from_epsg(code);
    }
    if lookup(KEY_MODEL_TYPE) == Some(MODEL_TYPE_GEOGRAPHIC) {
        return Crs::from_epsg(lookup(KEY_GEOGRAPHIC_TYPE).unwrap_or(EPSG_WGS84));
    }
    Ok(Crs::WebMercator)
}

fn key_directory(crs: Crs) -> [u16; 16] {
    let (model, key, code) = if crs.is_geographic() {
        (MODEL_TYPE_GEOGRAPHIC, KEY_GEOGRAPHIC_TYPE, crs.epsg())
    } else {
        (MODEL_TYPE_PROJECTED, KEY_PROJECTED_CS_TYPE, crs.epsg())
    };
    [
        1,
        1,
        0,
        3,
        KEY_MODEL_TYPE as u16,
        0,
        1,
        model as u16,
        KEY_RASTER_TYPE as u16,
        0,
        1,
        RASTER_PIXEL_IS_AREA as u16,
        key as u16,
        0,
        1,
        code as u16,
    ]
}

/// Decodes a GeoTIFF byte buffer into a [`Raster`].
pub fn decode(bytes: &[u8]) -> Result<Raster, RasterError> {
    let mut decoder = Decoder::new(Cursor::new(bytes))?;
    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);

    let scale = decoder
        .find_tag(Tag::ModelPixelScaleTag)?
        .ok_or(RasterError::MissingGeoreference("ModelPixelScaleTag"))?
        .into_f64_vec()?;
    let tiepoint = decoder
        .find_tag(Tag::ModelTiepointTag)?
        .ok_or(RasterError::MissingGeoreference("ModelTiepointTag"))?
        .into_f64_vec()?;
    if scale.len() < 2 {
        return Err(RasterError::MissingGeoreference("ModelPixelScaleTag"));
    }
    if tiepoint.len() < 6 {
        return Err(RasterError::MissingGeoreference("ModelTiepointTag"));
    }

    let crs = match decoder.find_tag(Tag::GeoKeyDirectoryTag)? {
        Some(directory) => crs_from_keys(&directory.into_u32_vec()?)?,
        None => Crs::WebMercator,
    };

    let nodata = match decoder.find_tag(Tag::GdalNodata)? {
        Some(value) => value
            .into_string()?
            .trim_matches(|c: char| c == '\0' || c.is_whitespace())
            .parse::<f64>()
            .ok(),
        None => None,
    };

    let (samples, pixel_type): (Vec<f32>, PixelType) = match decoder.read_image()? {
        DecodingResult::U8(v) => (v.into_iter().map(f32::from).collect(), PixelType::U8),
        DecodingResult::U16(v) => (v.into_iter().map(f32::from).collect(), PixelType::U16),
        DecodingResult::F32(v) => (v, PixelType::F32),
        _ => {
            return Err(RasterError::UnsupportedSampleFormat(
                "expected u8, u16 or f32 samples".to_string(),
            ))
        }
    };

    let pixels = width * height;
    if pixels == 0 || samples.len() % pixels != 0 {
        return Err(RasterError::UnsupportedSampleFormat(format!(
            "{} samples for {}x{} pixels",
            samples.len(),
            width,
            height
        )));
    }
    let bands = samples.len() / pixels;

    // Interleaved (row, col, band) -> (band, row, col)
    let data = Array3::from_shape_vec((height, width, bands), samples)?
        .permuted_axes([2, 0, 1])
        .as_standard_layout()
        .into_owned();

    let (sx, sy) = (scale[0], scale[1]);
    let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
    let transform = GeoTransform::new(x - i * sx, y + j * sy, sx, -sy);

    Ok(Raster::new(data, transform, pixel_type)
        .with_nodata(nodata)
        .with_crs(crs))
}

fn interleaved<T, F>(raster: &Raster, convert: F) -> Vec<T>
where
    F: Fn(f32) -> T,
{
    let data = raster.data();
    let (bands, rows, cols) = data.dim();
    let mut out = Vec::with_capacity(bands * rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            for b in 0..bands {
                out.push(convert(data[[b, r, c]]));
            }
        }
    }
    out
}

/// Encodes a [`Raster`] as an uncompressed GeoTIFF in its own CRS.
pub fn encode(raster: &Raster) -> Result<Vec<u8>, RasterError> {
    let width = raster.width() as u32;
    let height = raster.height() as u32;
    let t = raster.transform();

    let scale = [t.pixel_width.abs(), t.pixel_height.abs(), 0.0];
    let tiepoint = [0.0, 0.0, 0.0, t.origin_x, t.origin_y, 0.0];
    let geo_keys = key_directory(raster.crs());
    let nodata = raster.nodata().map(|v| v.to_string());

    let mut buffer = Cursor::new(Vec::new());
    let mut encoder = TiffEncoder::new(&mut buffer)?;

    macro_rules! write_image {
        ($color:ty, $data:expr) => {{
            let mut image = encoder.new_image::<$color>(width, height)?;
            let dir = image.encoder();
            dir.write_tag(Tag::ModelPixelScaleTag, &scale[..])?;
            dir.write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;
            dir.write_tag(Tag::GeoKeyDirectoryTag, &geo_keys[..])?;
            if let Some(nodata) = &nodata {
                dir.write_tag(Tag::GdalNodata, nodata.as_str())?;
            }
            image.write_data(&$data)?;
        }};
    }

    let to_u8 = |v: f32| PixelType::U8.quantize(v as f64) as u8;
    let to_u16 = |v: f32| PixelType::U16.quantize(v as f64) as u16;
    let to_f32 = |v: f32| v;

    match (raster.pixel_type(), raster.band_count()) {
        (PixelType::U8, 1) => write_image!(colortype::Gray8, interleaved(raster, to_u8)),
        (PixelType::U8, 3) => write_image!(colortype::RGB8, interleaved(raster, to_u8)),
        (PixelType::U8, 4) => write_image!(colortype::RGBA8, interleaved(raster, to_u8)),
        (PixelType::U16, 1) => write_image!(colortype::Gray16, interleaved(raster, to_u16)),
        (PixelType::U16, 3) => write_image!(colortype::RGB16, interleaved(raster, to_u16)),
        (PixelType::U16, 4) => write_image!(colortype::RGBA16, interleaved(raster, to_u16)),
        (PixelType::F32, 1) => write_image!(colortype::Gray32Float, interleaved(raster, to_f32)),
        (PixelType::F32, 3) => write_image!(colortype::RGB32Float, interleaved(raster, to_f32)),
        (PixelType::F32, 4) => write_image!(colortype::RGBA32Float, interleaved(raster, to_f32)),
        (_, n) => return Err(RasterError::UnsupportedBandCount(n)),
    }

    drop(encoder);
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GridSpec;

    fn grid(width: usize, height: usize) -> GridSpec {
        GridSpec {
            transform: GeoTransform::new(1000.0, 5000.0, 3.0, -3.0),
            width,
            height,
        }
    }

    #[test]
    fn test_single_band_u8_with_nodata() {
        let mut raster = Raster::filled(&grid(3, 2), 1, PixelType::U8, 0.0).with_nodata(Some(1.0));
        raster.band_mut(0)[[1, 2]] = 7.0;

        let bytes = encode(&raster).unwrap();
        let back = decode(&bytes).unwrap();

        assert_eq!(back.width(), 3);
        assert_eq!(back.height(), 2);
        assert_eq!(back.pixel_type(), PixelType::U8);
        assert_eq!(back.nodata(), Some(1.0));
        assert_eq!(back.band(0)[[1, 2]], 7.0);
        assert_eq!(back.transform(), raster.transform());
    }

    #[test]
    fn test_four_band_u16_keeps_band_order() {
        let mut raster = Raster::filled(&grid(2, 2), 4, PixelType::U16, 0.0);
        for b in 0..4 {
            raster.band_mut(b)[[0, 1]] = 1000.0 * (b as f32 + 1.0);
        }

        let back = decode(&encode(&raster).unwrap()).unwrap();

        assert_eq!(back.band_count(), 4);
        assert_eq!(back.pixel_type(), PixelType::U16);
        for b in 0..4 {
            assert_eq!(back.band(b)[[0, 1]], 1000.0 * (b as f32 + 1.0));
            assert_eq!(back.band(b)[[1, 0]], 0.0);
        }
    }

    #[test]
    fn test_two_bands_unsupported() {
        let raster = Raster::filled(&grid(2, 2), 2, PixelType::U8, 0.0);
        assert!(matches!(
            encode(&raster),
            Err(RasterError::UnsupportedBandCount(2))
        ));
    }

    #[test]
    fn test_plain_tiff_is_not_georeferenced() {
        let mut buffer = Cursor::new(Vec::new());
        TiffEncoder::new(&mut buffer)
            .unwrap()
            .write_image::<colortype::Gray8>(2, 2, &[0, 1, 2, 3])
            .unwrap();

        assert!(matches!(
            decode(buffer.get_ref()),
            Err(RasterError::MissingGeoreference(_))
        ));
    }

    #[test]
    fn test_utm_scene_keeps_its_crs() {
        let utm = Crs::Utm {
            zone: 33,
            south: false,
        };
        let raster = Raster::filled(
            &GridSpec {
                transform: GeoTransform::new(499_000.0, 4_983_000.0, 3.0, -3.0),
                width: 2,
                height: 2,
            },
            4,
            PixelType::U16,
            600.0,
        )
        .with_crs(utm);

        let back = decode(&encode(&raster).unwrap()).unwrap();
        assert_eq!(back.crs(), utm);
        assert_eq!(back.transform(), raster.transform());
    }

    #[test]
    fn test_geographic_keys() {
        let directory = [1, 1, 0, 2, 1024, 0, 1, 2, 2048, 0, 1, 4326];
        assert_eq!(crs_from_keys(&directory).unwrap(), Crs::Wgs84);
        // Geographic model without a type code defaults to WGS84
        assert_eq!(crs_from_keys(&[1, 1, 0, 1, 1024, 0, 1, 2]).unwrap(), Crs::Wgs84);
        assert!(matches!(
            crs_from_keys(&[1, 1, 0, 2, 1024, 0, 1, 2, 2048, 0, 1, 4269]),
            Err(RasterError::UnsupportedCrs(4269))
        ));
    }

    #[test]
    fn test_projected_keys() {
        assert_eq!(
            crs_from_keys(&[1, 1, 0, 1, 3072, 0, 1, 32633]).unwrap(),
            Crs::Utm {
                zone: 33,
                south: false
            }
        );
        assert_eq!(
            crs_from_keys(&[1, 1, 0, 1, 3072, 0, 1, 3857]).unwrap(),
            Crs::WebMercator
        );
        assert!(matches!(
            crs_from_keys(&[1, 1, 0, 1, 3072, 0, 1, 2154]),
            Err(RasterError::UnsupportedCrs(2154))
        ));
        assert_eq!(crs_from_keys(&[1, 1, 0, 0]).unwrap(), Crs::WebMercator);
    }

    #[test]
    fn test_garbage_bytes() {
        assert!(matches!(decode(b"not a tiff"), Err(RasterError::Tiff(_))));
    }
}
