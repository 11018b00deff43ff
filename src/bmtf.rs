//! Decode (and encode) BMTF thermal containers.
//!
//! # Layout
//!
//! All integers are little-endian.
//!
//! File header at offset 0:
//!
//! - 0x00: magic: "BMTF"
//! - 0x04: u16 format version
//! - 0x06: u8 flags, bit 0 = has real image
//! - 0x07: i64 capture time, ms since the epoch
//! - 0x0f: u32 thermal data offset
//! - 0x13: u32 real image offset (not trusted, see below)
//!
//! Metadata block at the thermal data offset:
//!
//! - 0x00: u16 width
//! - 0x02: u16 height
//! - 0x04: u8 unit (0=C, 1=F, 2=K)
//! - 0x05: u8 pixel encoding (0=f32, 1=u16 scaled by 100)
//! - 0x06: f32 declared min, f32 declared max
//! - 0x0e: f32 emissivity, f32 ambient, f32 reflected
//! - 0x1a: u16 relative humidity x 100
//! - 0x1c: f32 distance
//! - 0x20: char[32] camera model, null padded
//!
//! The temperature matrix always starts [`METADATA_STRIDE`] bytes after
//! the thermal data offset, whatever the metadata block actually uses.
//! The embedded photograph is found by scanning for a JPEG start marker
//! after the matrix; the stored real image offset does not match real
//! files and is ignored.
use std::io;

use byteordered::ByteOrdered;
use log::{debug, info};

use crate::{
    cursor::ByteCursor,
    error::DecodeError,
    field::{TemperatureField, ThermalMetadata},
    image::{DecodedImage, RealImage, Strategy},
    parse::Parseable,
    signature::{find_any, JPEG_MAGICS},
    temperature::TemperatureUnit,
};

pub const BMTF_MAGIC: &[u8; 4] = b"BMTF";

/// Distance from the thermal data offset to the first matrix value.
pub const METADATA_STRIDE: usize = 128;

pub const FLAG_HAS_REAL_IMAGE: u8 = 0x01;

/// Version written by [`encode`].
pub const FORMAT_VERSION: u16 = 1;

/// Where [`encode`] places the metadata block.
const ENCODED_THERMAL_OFFSET: usize = 32;

const CAMERA_MODEL_LEN: usize = 32;

declare_parseable_structs! {
    /// Fixed header at the start of the file.
    #[derive(Debug, Clone)]
    pub struct BmtfHeader {
        pub magic => [u8; 4],
        pub version => u16,
        pub flags => u8,
        pub timestamp_ms => i64,
        pub thermal_data_offset => u32 as usize,
        pub real_image_offset => u32 as usize,
    }

    /// The used part of the metadata block.
    #[derive(Debug, Clone)]
    pub struct BmtfMetadata {
        pub width => u16 as usize,
        pub height => u16 as usize,
        pub unit => u8,
        pub encoding => u8,
        pub declared_min => f32,
        pub declared_max => f32,
        pub emissivity => f32,
        pub ambient_temperature => f32,
        pub reflected_temperature => f32,
        pub humidity_percent => u16,
        pub distance => f32,
        pub camera_model => [u8; 32],
    }
}

pub const HEADER_SIZE: usize = <BmtfHeader as Parseable>::SIZE;

impl BmtfHeader {
    pub fn has_real_image(&self) -> bool {
        self.flags & FLAG_HAS_REAL_IMAGE != 0
    }
}

impl BmtfMetadata {
    fn camera_model(&self) -> Option<String> {
        let end = self
            .camera_model
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(CAMERA_MODEL_LEN);
        let model = String::from_utf8_lossy(&self.camera_model[..end]);
        let model = model.trim();
        (!model.is_empty()).then(|| model.to_string())
    }

    fn thermal_metadata(&self, header: &BmtfHeader) -> ThermalMetadata {
        let unit = TemperatureUnit::from_code(self.unit).unwrap_or_else(|| {
            debug!("unknown temperature unit {}, assuming celsius", self.unit);
            TemperatureUnit::Celsius
        });
        ThermalMetadata {
            unit,
            emissivity: self.emissivity,
            ambient_temperature: self.ambient_temperature,
            reflected_temperature: self.reflected_temperature,
            relative_humidity: self.humidity_percent as f32 / 100.,
            distance: self.distance,
            camera_model: self.camera_model(),
            captured_at_ms: (header.timestamp_ms != 0).then(|| header.timestamp_ms),
            declared_range: Some((self.declared_min, self.declared_max)),
        }
    }
}

/// How matrix values are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelEncoding {
    Float32,
    /// Hundredths of a degree.
    ScaledU16,
}

impl PixelEncoding {
    pub fn from_code(code: u8) -> Result<Self, DecodeError> {
        match code {
            0 => Ok(PixelEncoding::Float32),
            1 => Ok(PixelEncoding::ScaledU16),
            other => Err(DecodeError::UnsupportedEncoding(other)),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            PixelEncoding::Float32 => 0,
            PixelEncoding::ScaledU16 => 1,
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelEncoding::Float32 => 4,
            PixelEncoding::ScaledU16 => 2,
        }
    }
}

pub fn is_bmtf(bytes: &[u8]) -> bool {
    bytes.starts_with(BMTF_MAGIC)
}

/// Parse just the file header. `Ok(None)` if the magic does not match.
pub fn read_header(bytes: &[u8]) -> Result<Option<BmtfHeader>, DecodeError> {
    if !is_bmtf(bytes) {
        return Ok(None);
    }
    BmtfHeader::parse(&ByteCursor::new(bytes), 0).map(Some)
}

/// Decode a BMTF container.
///
/// Returns `Ok(None)` when `bytes` does not start with the BMTF magic so
/// the caller can move on to another strategy. Once the magic matched,
/// every structural problem is an error.
pub fn decode(bytes: &[u8]) -> Result<Option<DecodedImage>, DecodeError> {
    let header = match read_header(bytes)? {
        Some(header) => header,
        None => {
            debug!("no BMTF magic");
            return Ok(None);
        }
    };
    let cursor = ByteCursor::new(bytes);

    let offset = header.thermal_data_offset;
    if offset == 0 || offset >= bytes.len() {
        return Err(DecodeError::MalformedContainer(format!(
            "thermal data offset {} outside file of {} bytes",
            offset,
            bytes.len()
        )));
    }

    let meta = BmtfMetadata::parse(&cursor, offset)?;
    let encoding = PixelEncoding::from_code(meta.encoding)?;
    let (width, height) = (meta.width, meta.height);
    if width == 0 || height == 0 {
        return Err(DecodeError::MalformedContainer(format!(
            "empty {}x{} thermal matrix",
            width, height
        )));
    }

    let data_start = offset + METADATA_STRIDE;
    let pixels = width * height;
    let data_len = pixels
        .checked_mul(encoding.bytes_per_pixel())
        .ok_or_else(|| {
            DecodeError::MalformedContainer(format!("{}x{} matrix too large", width, height))
        })?;
    let data = cursor.slice(data_start, data_len)?;

    let values = decode_matrix(data, encoding, pixels)?;
    let field = TemperatureField::from_vec(width, height, values, meta.thermal_metadata(&header))?;

    let data_end = data_start + data_len;
    let real_image = if header.has_real_image() {
        locate_real_image(bytes, data_end, header.real_image_offset)
    } else {
        None
    };

    info!(
        "decoded BMTF v{}: {}x{} {:?}, range {}..{}, real image: {}",
        header.version,
        width,
        height,
        encoding,
        field.min(),
        field.max(),
        real_image.as_ref().map_or(0, |r| r.len()),
    );
    DecodedImage::new(Strategy::Bmtf, Some(field), real_image).map(Some)
}

fn decode_matrix(
    data: &[u8],
    encoding: PixelEncoding,
    pixels: usize,
) -> Result<Vec<f32>, DecodeError> {
    let truncated = |e: io::Error| {
        DecodeError::MalformedContainer(format!("reading thermal matrix: {}", e))
    };

    let mut rdr = ByteOrdered::le(data);
    let mut values = Vec::with_capacity(pixels);
    for _ in 0..pixels {
        let val = match encoding {
            PixelEncoding::Float32 => rdr.read_f32().map_err(truncated)?,
            PixelEncoding::ScaledU16 => rdr.read_u16().map_err(truncated)? as f32 / 100.,
        };
        values.push(val);
    }
    Ok(values)
}

fn locate_real_image(bytes: &[u8], search_from: usize, stored_offset: usize) -> Option<RealImage> {
    match find_any(bytes, JPEG_MAGICS, search_from) {
        Some((start, _)) => {
            if start != stored_offset {
                debug!(
                    "real image found at {} (header says {})",
                    start, stored_offset
                );
            }
            Some(RealImage::new(bytes[start..].to_vec()))
        }
        None => {
            debug!("real image flagged but no JPEG marker after offset {}", search_from);
            None
        }
    }
}

/// Pack a field (and optionally a JPEG photograph) into a BMTF container
/// that [`decode`] reads back.
///
/// With [`PixelEncoding::ScaledU16`] values are rounded to hundredths and
/// clamped to `0..=655.35`.
pub fn encode(
    field: &TemperatureField,
    encoding: PixelEncoding,
    real_image: Option<&[u8]>,
) -> io::Result<Vec<u8>> {
    let dimension = |v: usize| {
        if v > u16::MAX as usize {
            Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("dimension {} does not fit the container", v),
            ))
        } else {
            Ok(v as u16)
        }
    };
    let width = dimension(field.width())?;
    let height = dimension(field.height())?;

    let md = field.metadata();
    let data_start = ENCODED_THERMAL_OFFSET + METADATA_STRIDE;
    let data_end = data_start + field.len() * encoding.bytes_per_pixel();
    let flags = if real_image.is_some() {
        FLAG_HAS_REAL_IMAGE
    } else {
        0
    };

    let mut out = Vec::with_capacity(data_end + real_image.map_or(0, |r| r.len()));
    out.extend_from_slice(BMTF_MAGIC);
    {
        let mut w = ByteOrdered::le(&mut out);
        w.write_u16(FORMAT_VERSION)?;
        w.write_u8(flags)?;
        w.write_i64(md.captured_at_ms.unwrap_or(0))?;
        w.write_u32(ENCODED_THERMAL_OFFSET as u32)?;
        w.write_u32(if real_image.is_some() { data_end as u32 } else { 0 })?;
    }
    out.resize(ENCODED_THERMAL_OFFSET, 0);

    {
        let mut w = ByteOrdered::le(&mut out);
        w.write_u16(width)?;
        w.write_u16(height)?;
        w.write_u8(md.unit.code())?;
        w.write_u8(encoding.code())?;
        w.write_f32(field.min())?;
        w.write_f32(field.max())?;
        w.write_f32(md.emissivity)?;
        w.write_f32(md.ambient_temperature)?;
        w.write_f32(md.reflected_temperature)?;
        w.write_u16((md.relative_humidity * 100.).round().max(0.).min(u16::MAX as f32) as u16)?;
        w.write_f32(md.distance)?;
    }
    let mut model = [0u8; CAMERA_MODEL_LEN];
    if let Some(name) = &md.camera_model {
        let len = name.len().min(CAMERA_MODEL_LEN);
        model[..len].copy_from_slice(&name.as_bytes()[..len]);
    }
    out.extend_from_slice(&model);
    out.resize(data_start, 0);

    {
        let mut w = ByteOrdered::le(&mut out);
        for &val in field.values().iter() {
            match encoding {
                PixelEncoding::Float32 => w.write_f32(val)?,
                PixelEncoding::ScaledU16 => {
                    w.write_u16((val * 100.).round().max(0.).min(u16::MAX as f32) as u16)?
                }
            }
        }
    }

    if let Some(jpeg) = real_image {
        out.extend_from_slice(jpeg);
    }
    Ok(out)
}
