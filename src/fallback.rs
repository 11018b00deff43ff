//! Last-resort decode of a plain raster.
//!
//! There is no temperature data in a plain image, so the field holds
//! luminance in `[0, 255]` and the input bytes are kept as the photograph.
use ::image::{DynamicImage, ImageFormat};
use log::debug;
use ndarray::Array2;

use crate::{
    error::DecodeError,
    field::{TemperatureField, ThermalMetadata},
    image::{DecodedImage, RealImage, Strategy},
};

/// Rec. 601 luma weights.
const LUMA: [f32; 3] = [0.299, 0.587, 0.114];

pub fn luminance(rgb: [u8; 3]) -> f32 {
    rgb.iter()
        .zip(LUMA.iter())
        .map(|(&c, &w)| c as f32 * w)
        .sum()
}

/// Per-pixel luminance of `img`. Any alpha channel is ignored.
pub fn luminance_field(img: &DynamicImage) -> Result<TemperatureField, DecodeError> {
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    let values = Array2::from_shape_fn((height as usize, width as usize), |(row, col)| {
        luminance(rgb.get_pixel(col as u32, row as u32).0)
    });
    TemperatureField::new(values, ThermalMetadata::default())
}

/// Decode `bytes` as a raster, with the format sniffed unless given.
pub(crate) fn decode_luminance(
    bytes: &[u8],
    format: Option<ImageFormat>,
) -> Result<TemperatureField, DecodeError> {
    let img = match format {
        Some(format) => ::image::load_from_memory_with_format(bytes, format)?,
        None => ::image::load_from_memory(bytes)?,
    };
    luminance_field(&img)
}

/// Decode strategy for standard rasters. Bytes with no recognizable image
/// signature are a mismatch; a recognized but broken image is an error.
pub fn decode(bytes: &[u8]) -> Result<Option<DecodedImage>, DecodeError> {
    let format = match ::image::guess_format(bytes) {
        Ok(format) => format,
        Err(_) => {
            debug!("no raster signature in {} bytes", bytes.len());
            return Ok(None);
        }
    };
    let field = decode_luminance(bytes, Some(format))?;
    debug!(
        "{:?} raster {}x{}, luminance {}..{}",
        format,
        field.width(),
        field.height(),
        field.min(),
        field.max()
    );
    DecodedImage::new(
        Strategy::Fallback,
        Some(field),
        Some(RealImage::new(bytes.to_vec())),
    )
    .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{ImageOutputFormat, Rgb, RgbImage};

    fn encoded(img: RgbImage, format: ImageOutputFormat) -> Vec<u8> {
        let mut buf = vec![];
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, format)
            .unwrap();
        buf
    }

    #[test]
    fn luma_weights() {
        assert_eq!(luminance([0, 0, 0]), 0.);
        assert!((luminance([255, 255, 255]) - 255.).abs() < 1e-3);
        assert!((luminance([100, 0, 0]) - 29.9).abs() < 1e-4);
    }

    #[test]
    fn png_fallback() {
        let mut img = RgbImage::from_pixel(3, 2, Rgb([0, 0, 0]));
        img.put_pixel(2, 1, Rgb([255, 255, 255]));
        let bytes = encoded(img, ImageOutputFormat::Png);

        let decoded = decode(&bytes).unwrap().unwrap();
        assert_eq!(decoded.source, Strategy::Fallback);
        let field = decoded.field.unwrap();
        assert_eq!((field.width(), field.height()), (3, 2));
        assert_eq!(field.min(), 0.);
        assert!((field.max() - 255.).abs() < 1e-3);
        assert_eq!(field.hottest().map(|(x, y, _)| (x, y)), Some((2, 1)));
        assert_eq!(decoded.real_image.unwrap().bytes(), &bytes[..]);
    }

    #[test]
    fn bmp_with_explicit_format() {
        let bytes = encoded(RgbImage::from_pixel(2, 2, Rgb([10, 20, 30])), ImageOutputFormat::Bmp);
        let field = decode_luminance(&bytes, Some(ImageFormat::Bmp)).unwrap();
        let expected = luminance([10, 20, 30]);
        assert!(field.values().iter().all(|&v| (v - expected).abs() < 1e-4));
    }

    #[test]
    fn unknown_bytes_are_a_mismatch() {
        assert!(decode(b"definitely not an image").unwrap().is_none());
        assert!(decode(b"").unwrap().is_none());
    }

    #[test]
    fn broken_png_is_an_error() {
        let mut bytes = encoded(RgbImage::new(4, 4), ImageOutputFormat::Png);
        bytes.truncate(20);
        assert!(matches!(decode(&bytes), Err(DecodeError::Image(_))));
    }
}
