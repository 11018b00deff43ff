//! Temperature units, conversion and formatting.
use std::{fmt, str::FromStr};

use anyhow::{anyhow, Error};
use serde_derive::*;

const CELICIUS_OFFSET: f64 = 273.15;

/// Unit of the values stored in a temperature field.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
    Kelvin,
}

impl Default for TemperatureUnit {
    fn default() -> Self {
        TemperatureUnit::Celsius
    }
}

impl TemperatureUnit {
    /// Unit byte of the BMTF metadata block (0=C, 1=F, 2=K).
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(TemperatureUnit::Celsius),
            1 => Some(TemperatureUnit::Fahrenheit),
            2 => Some(TemperatureUnit::Kelvin),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            TemperatureUnit::Celsius => 0,
            TemperatureUnit::Fahrenheit => 1,
            TemperatureUnit::Kelvin => 2,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
            TemperatureUnit::Kelvin => "K",
        }
    }

    pub fn to_celsius(self, value: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => value,
            TemperatureUnit::Fahrenheit => (value - 32.) * 5. / 9.,
            TemperatureUnit::Kelvin => value - CELICIUS_OFFSET,
        }
    }

    pub fn from_celsius(self, celsius: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9. / 5. + 32.,
            TemperatureUnit::Kelvin => celsius + CELICIUS_OFFSET,
        }
    }

    /// Convert `value` given in `self` into `target`.
    pub fn convert(self, value: f64, target: TemperatureUnit) -> f64 {
        if self == target {
            return value;
        }
        target.from_celsius(self.to_celsius(value))
    }

    /// `value` with one decimal and the unit symbol, e.g. `23.4°C`.
    pub fn format(self, value: f64) -> String {
        format!("{:.1}{}", value, self.symbol())
    }
}

/// Celsius value with its Fahrenheit equivalent, e.g. `23.4°C (74.1°F)`.
/// Non-finite input formats as `N/A`.
pub fn format_dual(celsius: f64) -> String {
    if !celsius.is_finite() {
        return "N/A".into();
    }
    format!(
        "{} ({})",
        TemperatureUnit::Celsius.format(celsius),
        TemperatureUnit::Fahrenheit.format(TemperatureUnit::Celsius.convert(
            celsius,
            TemperatureUnit::Fahrenheit
        ))
    )
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for TemperatureUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('°').to_ascii_lowercase().as_str() {
            "c" | "celsius" => Ok(TemperatureUnit::Celsius),
            "f" | "fahrenheit" => Ok(TemperatureUnit::Fahrenheit),
            "k" | "kelvin" => Ok(TemperatureUnit::Kelvin),
            other => Err(anyhow!("unknown temperature unit: `{}`", other)),
        }
    }
}

/// A temperature typed on the command line, e.g. `35`, `35.5C` or
/// `-4 °F`. A value without a suffix is taken to be in `default`.
pub fn parse_temperature(s: &str, default: TemperatureUnit) -> Result<(f64, TemperatureUnit), Error> {
    use lazy_static::lazy_static;
    use regex::Regex;

    lazy_static! {
        static ref RE: Regex = Regex::new(r"^\s*([-+]?\d*\.?\d+)\s*(.*?)\s*$").unwrap();
    }

    let caps = RE
        .captures(s)
        .ok_or_else(|| anyhow!("unexpected format `{}`: must begin with a number", s))?;
    let value: f64 = caps[1].parse()?;
    let unit = match &caps[2] {
        "" => default,
        suffix => suffix.parse()?,
    };
    Ok((value, unit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        let c = TemperatureUnit::Celsius;
        let f = TemperatureUnit::Fahrenheit;
        let k = TemperatureUnit::Kelvin;
        assert_eq!(c.convert(100., f), 212.);
        assert_eq!(f.convert(32., c), 0.);
        assert_eq!(c.convert(0., k), 273.15);
        assert!((k.convert(0., f) - (-459.67)).abs() < 1e-9);
        assert_eq!(k.convert(12.5, k), 12.5);
    }

    #[test]
    fn unit_codes() {
        for code in 0..3 {
            assert_eq!(TemperatureUnit::from_code(code).unwrap().code(), code);
        }
        assert_eq!(TemperatureUnit::from_code(3), None);
    }

    #[test]
    fn formatting() {
        assert_eq!(TemperatureUnit::Celsius.format(23.44), "23.4°C");
        assert_eq!(format_dual(100.), "100.0°C (212.0°F)");
        assert_eq!(format_dual(f64::NAN), "N/A");
    }

    #[test]
    fn parses_cli_temperatures() -> Result<(), Error> {
        let c = TemperatureUnit::Celsius;
        assert_eq!(parse_temperature("35", c)?, (35., c));
        assert_eq!(
            parse_temperature("-4.5 °F", c)?,
            (-4.5, TemperatureUnit::Fahrenheit)
        );
        assert_eq!(parse_temperature("300k", c)?, (300., TemperatureUnit::Kelvin));
        assert!(parse_temperature("warm", c).is_err());
        assert!(parse_temperature("12 parsecs", c).is_err());
        Ok(())
    }
}
