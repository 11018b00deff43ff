//! Decoded 2-D temperature grid and its physical metadata.
use std::io::{self, BufRead, Write};

use itertools::iproduct;
use lazy_static::lazy_static;
use log::{debug, warn};
use ndarray::Array2;
use regex::Regex;
use serde_derive::*;

use crate::{error::DecodeError, temperature::TemperatureUnit};

pub const DEFAULT_EMISSIVITY: f32 = 0.95;
pub const DEFAULT_AMBIENT_TEMPERATURE: f32 = 20.;
pub const DEFAULT_REFLECTED_TEMPERATURE: f32 = 20.;
pub const DEFAULT_RELATIVE_HUMIDITY: f32 = 0.5;
pub const DEFAULT_DISTANCE: f32 = 1.;

/// Largest width or height accepted from a CSV import.
pub const MAX_CSV_DIMENSION: usize = 10_000;

/// Measurement conditions stored alongside the temperatures.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ThermalMetadata {
    pub unit: TemperatureUnit,
    /// In `[0, 1]`.
    pub emissivity: f32,
    pub ambient_temperature: f32,
    pub reflected_temperature: f32,
    /// In `[0, 1]`.
    pub relative_humidity: f32,
    /// Meters.
    pub distance: f32,
    pub camera_model: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub captured_at_ms: Option<i64>,
    /// Range written by the camera. Informational only; the field's own
    /// [`min`](TemperatureField::min) and [`max`](TemperatureField::max)
    /// are computed from the data.
    pub declared_range: Option<(f32, f32)>,
}

impl Default for ThermalMetadata {
    fn default() -> Self {
        ThermalMetadata {
            unit: TemperatureUnit::Celsius,
            emissivity: DEFAULT_EMISSIVITY,
            ambient_temperature: DEFAULT_AMBIENT_TEMPERATURE,
            reflected_temperature: DEFAULT_REFLECTED_TEMPERATURE,
            relative_humidity: DEFAULT_RELATIVE_HUMIDITY,
            distance: DEFAULT_DISTANCE,
            camera_model: None,
            captured_at_ms: None,
            declared_range: None,
        }
    }
}

/// A row-major `height x width` grid of temperatures.
///
/// `min` and `max` bound every value; both are 0 for an empty grid.
/// Fields are immutable once built: conversions produce a new field.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureField {
    values: Array2<f32>,
    min: f32,
    max: f32,
    metadata: ThermalMetadata,
}

impl TemperatureField {
    /// Build a field, computing the actual range of `values`.
    ///
    /// Non-finite values are rejected since no range could bound them.
    pub fn new(values: Array2<f32>, metadata: ThermalMetadata) -> Result<Self, DecodeError> {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for ((row, col), &val) in values.indexed_iter() {
            if !val.is_finite() {
                return Err(DecodeError::MalformedContainer(format!(
                    "non-finite temperature {} at ({}, {})",
                    val, col, row
                )));
            }
            min = min.min(val);
            max = max.max(val);
        }
        if values.is_empty() {
            min = 0.;
            max = 0.;
        }
        Ok(TemperatureField {
            values,
            min,
            max,
            metadata,
        })
    }

    pub fn from_vec(
        width: usize,
        height: usize,
        values: Vec<f32>,
        metadata: ThermalMetadata,
    ) -> Result<Self, DecodeError> {
        let values = Array2::from_shape_vec((height, width), values).map_err(|e| {
            DecodeError::MalformedContainer(format!("{}x{} temperature grid: {}", width, height, e))
        })?;
        Self::new(values, metadata)
    }

    /// A field where every pixel has the same value.
    pub fn uniform(width: usize, height: usize, value: f32, metadata: ThermalMetadata) -> Result<Self, DecodeError> {
        Self::new(Array2::from_elem((height, width), value), metadata)
    }

    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    pub fn height(&self) -> usize {
        self.values.nrows()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values indexed by `(row, col)`.
    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn metadata(&self) -> &ThermalMetadata {
        &self.metadata
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.metadata.unit
    }

    /// Value at integer pixel coordinates.
    pub fn at(&self, x: usize, y: usize) -> Option<f32> {
        self.values.get((y, x)).copied()
    }

    /// Value under a (possibly fractional) image coordinate, as picked by
    /// a pointer. Coordinates are floored; anything outside the grid is
    /// `None`.
    pub fn temperature_at(&self, x: f64, y: f64) -> Option<f32> {
        if !(x >= 0. && y >= 0.) || x >= self.width() as f64 || y >= self.height() as f64 {
            return None;
        }
        self.at(x.floor() as usize, y.floor() as usize)
    }

    /// Hottest pixel as `(x, y, value)`; the first in row-major order on ties.
    pub fn hottest(&self) -> Option<(usize, usize, f32)> {
        self.extreme(|candidate, best| candidate > best)
    }

    /// Coldest pixel as `(x, y, value)`; the first in row-major order on ties.
    pub fn coldest(&self) -> Option<(usize, usize, f32)> {
        self.extreme(|candidate, best| candidate < best)
    }

    fn extreme(&self, better: impl Fn(f32, f32) -> bool) -> Option<(usize, usize, f32)> {
        self.values
            .indexed_iter()
            .fold(None, |best, ((row, col), &val)| match best {
                Some((_, _, b)) if !better(val, b) => best,
                _ => Some((col, row, val)),
            })
    }

    /// A copy of this field with every value converted to `unit`.
    pub fn to_unit(&self, unit: TemperatureUnit) -> Self {
        let from = self.metadata.unit;
        let convert = |v: f32| from.convert(v as f64, unit) as f32;
        let mut metadata = self.metadata.clone();
        metadata.unit = unit;
        metadata.ambient_temperature = convert(metadata.ambient_temperature);
        metadata.reflected_temperature = convert(metadata.reflected_temperature);
        metadata.declared_range = metadata
            .declared_range
            .map(|(lo, hi)| (convert(lo), convert(hi)));

        // Every conversion is increasing, so the extremes carry over.
        TemperatureField {
            values: self.values.mapv(convert),
            min: convert(self.min),
            max: convert(self.max),
            metadata,
        }
    }

    /// Write the grid as `Y,X,Temperature` rows after a few `#` comment
    /// lines describing the capture.
    pub fn write_csv<W: Write>(&self, mut w: W) -> io::Result<()> {
        let md = &self.metadata;
        writeln!(w, "# Temperature Data Export")?;
        writeln!(
            w,
            "# Device: {}",
            md.camera_model.as_deref().unwrap_or("Unknown")
        )?;
        writeln!(w, "# Size: {}x{}", self.width(), self.height())?;
        writeln!(w, "# Unit: {}", md.unit)?;
        writeln!(w, "Y,X,Temperature")?;
        for (row, col) in iproduct!(0..self.height(), 0..self.width()) {
            writeln!(w, "{},{},{:.2}", row, col, self.values[(row, col)])?;
        }
        writeln!(
            w,
            "# Statistics: Min={:.2}, Max={:.2}",
            self.min, self.max
        )?;
        Ok(())
    }

    /// Rebuild a field from `Y,X,Temperature` rows as written by
    /// [`write_csv`](Self::write_csv).
    ///
    /// Blank lines, `#` comments and the header row are skipped, as are
    /// rows that lack three columns or do not parse. The grid spans the
    /// largest `X` and `Y` seen and cells without a row are 0. Input with
    /// no usable row, or a grid wider or taller than
    /// [`MAX_CSV_DIMENSION`], is rejected.
    pub fn read_csv<R: BufRead>(reader: R, metadata: ThermalMetadata) -> Result<Self, DecodeError> {
        lazy_static! {
            static ref HEADER: Regex = Regex::new(r"(?i)^Y\s*,\s*X\s*,\s*Temperature").unwrap();
        }

        let mut cells = vec![];
        let (mut width, mut height) = (0, 0);
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || HEADER.is_match(line) {
                continue;
            }
            match parse_csv_row(line) {
                Some((y, x, val)) => {
                    height = height.max(y + 1);
                    width = width.max(x + 1);
                    cells.push((y, x, val));
                }
                None => debug!("skipping CSV line {}: {:?}", lineno + 1, line),
            }
        }

        if cells.is_empty() {
            return Err(DecodeError::MalformedContainer(
                "CSV has no temperature rows".into(),
            ));
        }
        if width > MAX_CSV_DIMENSION || height > MAX_CSV_DIMENSION {
            return Err(DecodeError::MalformedContainer(format!(
                "CSV grid {}x{} exceeds {}x{}",
                width, height, MAX_CSV_DIMENSION, MAX_CSV_DIMENSION
            )));
        }

        let mut values = Array2::zeros((height, width));
        for &(y, x, val) in &cells {
            values[(y, x)] = val;
        }
        if cells.len() < width * height {
            warn!(
                "CSV covers {} of {} cells; the rest read as 0",
                cells.len(),
                width * height
            );
        }
        Self::new(values, metadata)
    }
}

fn parse_csv_row(line: &str) -> Option<(usize, usize, f32)> {
    let mut parts = line.split(',').map(str::trim);
    let y = parts.next()?.parse().ok()?;
    let x = parts.next()?.parse().ok()?;
    let val: f32 = parts.next()?.parse().ok()?;
    if !val.is_finite() {
        return None;
    }
    Some((y, x, val))
}
