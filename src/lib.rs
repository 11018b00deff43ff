//! Library to decode thermal camera exports into
//! temperature fields.
//!
//! Two container conventions are supported, plus a
//! fallback for anything else:
//!
//! 1. [BMTF](bmtf): a versioned binary container with a
//! header, a 128 byte metadata block, a float32 or
//! scaled uint16 temperature matrix and an optional
//! embedded JPEG photograph.
//!
//! 2. [Dual BMP](bitmap): two BMP files concatenated back
//! to back, the thermal rendering first and the real
//! photograph second.
//!
//! 3. [Any raster](fallback) the `image` crate can read;
//! the "temperatures" are then pixel luminance.
//!
//! # Usage
//!
//! [`DecodedImage::decode`] tries the strategies in that
//! order and returns the first that recovers anything.
//!
//! ```rust
//! # fn test_compile() -> anyhow::Result<()> {
//! use bmt_thermal::{palette, DecodedImage};
//!
//! let image = DecodedImage::try_from_path("capture.bmt".as_ref())?;
//! if let Some(field) = &image.field {
//!     let iron = palette::palette("iron").unwrap();
//!     let raster = palette::colorize_full_range(field, iron);
//!     raster.save("capture.png")?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The decoded [`TemperatureField`] feeds the
//! [statistics](stats) and [region](region) tools, which
//! are pure functions of the field.

#[macro_use]
mod parse;

pub mod bitmap;
pub mod bmtf;
pub mod cursor;
pub mod error;
pub mod fallback;
pub mod field;
pub mod image;
pub mod palette;
pub mod region;
pub mod signature;
pub mod stats;
pub mod temperature;

#[cfg(feature = "cli")]
pub mod cli;

pub use crate::error::DecodeError;
pub use crate::field::{TemperatureField, ThermalMetadata};
pub use crate::image::{DecodeHint, DecodedImage, Decoder, RealImage, Strategy};
pub use crate::palette::ColorPalette;
pub use crate::temperature::TemperatureUnit;
