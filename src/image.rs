//! Decode results and the ordered strategy chain.
use std::{fmt, fs::read, path::Path};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde_derive::*;

use crate::{
    bitmap, bmtf,
    error::{DecodeError, FailedAttempt},
    fallback,
    field::TemperatureField,
};

/// A way of reading a thermal export.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Bmtf,
    DualBitmap,
    Fallback,
}

impl Strategy {
    /// Preferred order when nothing is known about the input.
    pub const DEFAULT_ORDER: [Strategy; 3] =
        [Strategy::Bmtf, Strategy::DualBitmap, Strategy::Fallback];

    /// `Ok(None)` means the input is not in this strategy's format.
    pub fn try_decode(self, bytes: &[u8]) -> Result<Option<DecodedImage>, DecodeError> {
        match self {
            Strategy::Bmtf => bmtf::decode(bytes),
            Strategy::DualBitmap => bitmap::decode(bytes),
            Strategy::Fallback => fallback::decode(bytes),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Bmtf => "BMTF",
            Strategy::DualBitmap => "dual BMP",
            Strategy::Fallback => "raster fallback",
        })
    }
}

/// Photograph bytes (JPEG, PNG or BMP) carried next to the thermal data.
/// Never decoded by this crate.
#[derive(Clone, PartialEq)]
pub struct RealImage {
    bytes: Vec<u8>,
}

impl RealImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        RealImage { bytes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Format guessed from the leading bytes.
    pub fn format(&self) -> Option<::image::ImageFormat> {
        ::image::guess_format(&self.bytes).ok()
    }

    pub fn extension(&self) -> &'static str {
        match self.format() {
            Some(::image::ImageFormat::Png) => "png",
            Some(::image::ImageFormat::Bmp) => "bmp",
            Some(::image::ImageFormat::Gif) => "gif",
            Some(::image::ImageFormat::Tiff) => "tif",
            Some(::image::ImageFormat::WebP) => "webp",
            _ => "jpg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self.extension() {
            "png" => "image/png",
            "bmp" => "image/bmp",
            "gif" => "image/gif",
            "tif" => "image/tiff",
            "webp" => "image/webp",
            _ => "image/jpeg",
        }
    }

    /// `data:` URL embedding the photograph, for reports and web views.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type(),
            base64::encode(&self.bytes)
        )
    }
}

impl fmt::Debug for RealImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealImage")
            .field("format", &self.format())
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// What a successful decode recovered. At least one of `field` and
/// `real_image` is present.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub source: Strategy,
    pub field: Option<TemperatureField>,
    pub real_image: Option<RealImage>,
}

impl DecodedImage {
    pub fn new(
        source: Strategy,
        field: Option<TemperatureField>,
        real_image: Option<RealImage>,
    ) -> Result<Self, DecodeError> {
        if field.is_none() && real_image.is_none() {
            return Err(DecodeError::NothingRecovered);
        }
        Ok(DecodedImage {
            source,
            field,
            real_image,
        })
    }

    /// Decode with the default strategy order.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Decoder::default().decode(bytes)
    }

    pub fn try_from_path(path: &Path) -> Result<Self> {
        let bytes = read(path).with_context(|| format!("reading {}", path.display()))?;
        let decoder = Decoder::for_hint(&DecodeHint::from_path(path));
        Ok(decoder
            .decode(&bytes)
            .with_context(|| format!("decoding {}", path.display()))?)
    }
}

/// What the uploader claimed the file is. Only used to order strategies;
/// every strategy is still tried.
#[derive(Debug, Clone, Default)]
pub struct DecodeHint {
    pub extension: Option<String>,
    pub content_type: Option<String>,
}

impl DecodeHint {
    pub fn from_path(path: &Path) -> Self {
        DecodeHint {
            extension: path
                .extension()
                .map(|e| e.to_string_lossy().to_ascii_lowercase()),
            content_type: None,
        }
    }

    /// Whether the hint names a plain raster format with no thermal
    /// container around it.
    fn is_plain_raster(&self) -> bool {
        let ext = self.extension.as_deref().map(|e| e.trim_start_matches('.'));
        let by_ext = matches!(
            ext,
            Some("jpg") | Some("jpeg") | Some("png") | Some("gif") | Some("tif") | Some("tiff") | Some("webp")
        );
        let by_type = self.content_type.as_deref().map_or(false, |t| {
            let t = t.to_ascii_lowercase();
            t.starts_with("image/") && !t.contains("bmp")
        });
        by_ext || by_type
    }
}

/// Runs strategies in order until one recovers something.
#[derive(Debug, Clone)]
pub struct Decoder {
    order: Vec<Strategy>,
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder {
            order: Strategy::DEFAULT_ORDER.to_vec(),
        }
    }
}

impl Decoder {
    pub fn with_order(order: Vec<Strategy>) -> Self {
        Decoder { order }
    }

    /// Plain raster hints move the fallback to the front. BMP hints do
    /// not, since a dual-BMP file also looks like a single bitmap.
    pub fn for_hint(hint: &DecodeHint) -> Self {
        if hint.is_plain_raster() {
            Decoder::with_order(vec![
                Strategy::Fallback,
                Strategy::Bmtf,
                Strategy::DualBitmap,
            ])
        } else {
            Decoder::default()
        }
    }

    pub fn order(&self) -> &[Strategy] {
        &self.order
    }

    /// Try each strategy in turn. Mismatches and failures are logged and
    /// collected; only when nothing works is
    /// [`DecodeError::NoImageData`] returned.
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        let mut attempts = vec![];
        for &strategy in &self.order {
            match strategy.try_decode(bytes) {
                Ok(Some(decoded)) => {
                    info!("decoded {} bytes via {}", bytes.len(), strategy);
                    return Ok(decoded);
                }
                Ok(None) => {
                    debug!("{}: format mismatch", strategy);
                    attempts.push(FailedAttempt {
                        strategy,
                        error: None,
                    });
                }
                Err(e) => {
                    warn!("{} decode failed: {}", strategy, e);
                    attempts.push(FailedAttempt {
                        strategy,
                        error: Some(e),
                    });
                }
            }
        }
        Err(DecodeError::NoImageData { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_recovered() {
        assert!(matches!(
            DecodedImage::new(Strategy::Fallback, None, None),
            Err(DecodeError::NothingRecovered)
        ));
    }

    #[test]
    fn real_image_sniffing() {
        let jpeg = RealImage::new(vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10]);
        assert_eq!(jpeg.extension(), "jpg");
        assert_eq!(jpeg.mime_type(), "image/jpeg");
        assert_eq!(jpeg.to_data_url(), "data:image/jpeg;base64,/9j/4AAQ");

        let bmp = RealImage::new(b"BM\x3a\x00\x00\x00".to_vec());
        assert_eq!(bmp.extension(), "bmp");
    }

    #[test]
    fn hints() {
        let hint = DecodeHint::from_path(Path::new("/data/IR_0042.JPG"));
        assert_eq!(hint.extension.as_deref(), Some("jpg"));
        assert!(hint.is_plain_raster());
        assert!(!DecodeHint::from_path(Path::new("scan.bmt")).is_plain_raster());
        assert!(!DecodeHint::from_path(Path::new("pair.bmp")).is_plain_raster());
        assert_eq!(
            Decoder::for_hint(&DecodeHint::default()).order(),
            &Strategy::DEFAULT_ORDER[..]
        );
    }
}
