//! Named color ramps and the temperature colorizer.
use ::image::{Rgba, RgbaImage};
use inflector::Inflector;
use lazy_static::lazy_static;
use rayon::prelude::*;
use serde_derive::*;

use crate::{error::PaletteError, field::TemperatureField};

/// Ranges narrower than this render as a single color.
pub const LOW_CONTRAST_THRESHOLD: f64 = 0.1;

/// An ordered ramp of at least two RGB stops.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ColorPalette {
    name: String,
    label: String,
    stops: Vec<[u8; 3]>,
}

impl ColorPalette {
    pub fn new(name: &str, label: &str, stops: Vec<[u8; 3]>) -> Result<Self, PaletteError> {
        if stops.len() < 2 {
            return Err(PaletteError::TooFewStops {
                name: name.into(),
                found: stops.len(),
            });
        }
        Ok(ColorPalette {
            name: name.into(),
            label: label.into(),
            stops,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn stops(&self) -> &[[u8; 3]] {
        &self.stops
    }

    /// Used for every pixel when the range is degenerate.
    pub fn middle_stop(&self) -> [u8; 3] {
        self.stops[self.stops.len() / 2]
    }

    /// Color of `value` on a ramp spanning `[min, max]`.
    ///
    /// Values outside the range clamp to the end stops. Channels are
    /// interpolated linearly between the two stops bounding the value
    /// and rounded.
    pub fn color_at(&self, value: f64, min: f64, max: f64) -> [u8; 3] {
        let range = max - min;
        if !(range >= LOW_CONTRAST_THRESHOLD) || !range.is_finite() {
            return self.middle_stop();
        }
        // f64::max discards NaN
        let norm = ((value - min) / range).max(0.).min(1.);
        let index = norm * (self.stops.len() - 1) as f64;
        let lower = index.floor() as usize;
        let upper = index.ceil() as usize;
        let t = index - lower as f64;

        let (lo, hi) = (self.stops[lower], self.stops[upper]);
        let mut rgb = [0; 3];
        for ((out, &a), &b) in rgb.iter_mut().zip(lo.iter()).zip(hi.iter()) {
            *out = (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        }
        rgb
    }
}

const fn hex(rgb: u32) -> [u8; 3] {
    [(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8]
}

const BUILTIN: &[(&str, &str, &[[u8; 3]])] = &[
    (
        "iron",
        "Iron",
        &[
            hex(0x000033), hex(0x000055), hex(0x0000aa), hex(0x0033ff), hex(0x0088ff),
            hex(0x00ddff), hex(0x33ffaa), hex(0x88ff55), hex(0xddff00), hex(0xffaa00),
            hex(0xff5500), hex(0xff0000), hex(0xaa0000),
        ],
    ),
    (
        "rainbow",
        "Rainbow",
        &[
            hex(0x0000ff), hex(0x0055ff), hex(0x00aaff), hex(0x00ffff), hex(0x00ff88),
            hex(0x00ff00), hex(0x88ff00), hex(0xffff00), hex(0xffaa00), hex(0xff5500),
            hex(0xff0000), hex(0xffffff),
        ],
    ),
    (
        "grayscale",
        "Grayscale",
        &[
            hex(0x000000), hex(0x1a1a1a), hex(0x333333), hex(0x4d4d4d), hex(0x666666),
            hex(0x808080), hex(0x999999), hex(0xb3b3b3), hex(0xcccccc), hex(0xe6e6e6),
            hex(0xffffff),
        ],
    ),
    (
        "hot",
        "Hot",
        &[
            hex(0x000000), hex(0x330000), hex(0x660000), hex(0x990000), hex(0xcc0000),
            hex(0xff0000), hex(0xff3300), hex(0xff6600), hex(0xff9900), hex(0xffcc00),
            hex(0xffff00), hex(0xffffff),
        ],
    ),
    (
        "cold",
        "Cold",
        &[
            hex(0xffffff), hex(0xccffff), hex(0x99ffff), hex(0x66ffff), hex(0x33ffff),
            hex(0x00ffff), hex(0x00ccff), hex(0x0099ff), hex(0x0066ff), hex(0x0033ff),
            hex(0x0000ff), hex(0x000033),
        ],
    ),
    (
        "cold_hot",
        "Cold-Hot",
        &[
            hex(0x0000ff), hex(0x3366ff), hex(0x6699ff), hex(0x99ccff), hex(0xffffff),
            hex(0xffcc99), hex(0xff9966), hex(0xff6633), hex(0xff0000),
        ],
    ),
    (
        "medical",
        "Medical",
        &[
            hex(0x000080), hex(0x0000c0), hex(0x0040ff), hex(0x0080ff), hex(0x00c0ff),
            hex(0x00ffff), hex(0x80ffff), hex(0xc0ffff), hex(0xffffff),
        ],
    ),
    (
        "sepia",
        "Sepia",
        &[
            hex(0x1a0f0a), hex(0x2d1b0e), hex(0x4a2f1a), hex(0x6b4423), hex(0x8b5a2b),
            hex(0xa0673a), hex(0xb8814a), hex(0xcc9966), hex(0xd4a574), hex(0xe0b88c),
            hex(0xf5deb3),
        ],
    ),
    (
        "arctic",
        "Arctic",
        &[
            hex(0x001a33), hex(0x003366), hex(0x004d99), hex(0x0066cc), hex(0x0080ff),
            hex(0x3399ff), hex(0x66b3ff), hex(0x99ccff), hex(0xcce6ff), hex(0xe6f2ff),
            hex(0xffffff),
        ],
    ),
    (
        "lava",
        "Lava",
        &[
            hex(0x000000), hex(0x1a0000), hex(0x330000), hex(0x4d0000), hex(0x660000),
            hex(0x800000), hex(0x990000), hex(0xb30000), hex(0xcc0000), hex(0xe60000),
            hex(0xff0000), hex(0xff3333), hex(0xff6666), hex(0xff9999), hex(0xffcccc),
        ],
    ),
];

lazy_static! {
    static ref PALETTES: Vec<ColorPalette> = BUILTIN
        .iter()
        .map(|&(name, label, stops)| ColorPalette {
            name: name.into(),
            label: label.into(),
            stops: stops.to_vec(),
        })
        .collect();
}

/// Built-in palettes in display order.
pub fn all_palettes() -> &'static [ColorPalette] {
    &PALETTES
}

/// Look up a built-in palette. Names are matched in snake case, so
/// `"coldHot"`, `"Cold Hot"` and `"cold-hot"` all find `cold_hot`.
pub fn palette(name: &str) -> Option<&'static ColorPalette> {
    let key = name.to_snake_case();
    PALETTES.iter().find(|p| p.name == key)
}

/// Resolve several palette names at once. `"all"` stands for every
/// built-in palette; repeats are dropped, first occurrence wins.
pub fn palettes_named<'a, I>(names: I) -> Result<Vec<&'static ColorPalette>, PaletteError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut found: Vec<&'static ColorPalette> = vec![];
    for name in names {
        let matched: Vec<_> = if name.eq_ignore_ascii_case("all") {
            PALETTES.iter().collect()
        } else {
            vec![palette(name).ok_or_else(|| PaletteError::Unknown(name.into()))?]
        };
        for p in matched {
            if !found.iter().any(|f| f.name == p.name) {
                found.push(p);
            }
        }
    }
    Ok(found)
}

/// Render `field` on `palette` over `[min, max]` as an opaque RGBA raster.
pub fn colorize(field: &TemperatureField, palette: &ColorPalette, min: f64, max: f64) -> RgbaImage {
    let (width, height) = (field.width(), field.height());
    let mut img = RgbaImage::new(width as u32, height as u32);
    if width == 0 || height == 0 {
        return img;
    }

    let values = field.values();
    img.par_chunks_mut(width * 4)
        .enumerate()
        .for_each(|(row, line)| {
            for (col, px) in line.chunks_exact_mut(4).enumerate() {
                let [r, g, b] = palette.color_at(values[(row, col)] as f64, min, max);
                px.copy_from_slice(&Rgba([r, g, b, 255]).0);
            }
        });
    img
}

/// [`colorize`] over the field's own range.
pub fn colorize_full_range(field: &TemperatureField, palette: &ColorPalette) -> RgbaImage {
    colorize(field, palette, field.min() as f64, field.max() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::ThermalMetadata;

    fn black_white() -> ColorPalette {
        ColorPalette::new("bw", "Black-White", vec![[0; 3], [255; 3]]).unwrap()
    }

    #[test]
    fn table_is_valid() {
        assert!(all_palettes().len() >= 10);
        for p in all_palettes() {
            assert!(p.stops().len() >= 2, "{}", p.name());
        }
        assert_eq!(palette("iron").unwrap().stops()[0], [0x00, 0x00, 0x33]);
        assert_eq!(palette("coldHot").unwrap().label(), "Cold-Hot");
        assert_eq!(palette("Grayscale").unwrap().name(), "grayscale");
        assert!(palette("ultraviolet").is_none());
    }

    #[test]
    fn several_names() {
        let picked = palettes_named(vec!["iron", "Rainbow", "iron", "cold-hot"]).unwrap();
        let names: Vec<_> = picked.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["iron", "rainbow", "cold_hot"]);

        let everything = palettes_named(vec!["grayscale", "all"]).unwrap();
        assert_eq!(everything.len(), all_palettes().len());
        assert_eq!(everything[0].name(), "grayscale");

        assert_eq!(
            palettes_named(vec!["iron", "ultraviolet"]),
            Err(PaletteError::Unknown("ultraviolet".into()))
        );
    }

    #[test]
    fn too_few_stops() {
        assert_eq!(
            ColorPalette::new("one", "One", vec![[1, 2, 3]]),
            Err(PaletteError::TooFewStops {
                name: "one".into(),
                found: 1
            })
        );
    }

    #[test]
    fn interpolation() {
        let p = black_white();
        assert_eq!(p.color_at(0., 0., 1.), [0; 3]);
        assert_eq!(p.color_at(1., 0., 1.), [255; 3]);
        assert_eq!(p.color_at(0.5, 0., 1.), [128; 3]);
        assert_eq!(p.color_at(-4., 0., 1.), [0; 3]);
        assert_eq!(p.color_at(9., 0., 1.), [255; 3]);

        let gray = palette("grayscale").unwrap();
        assert_eq!(gray.color_at(20., 10., 30.), [0x80; 3]);
    }

    #[test]
    fn degenerate_range_uses_middle_stop() {
        let iron = palette("iron").unwrap();
        assert_eq!(iron.middle_stop(), hex(0x33ffaa));
        assert_eq!(iron.color_at(5., 5., 5.05), iron.middle_stop());
        assert_eq!(iron.color_at(5., 6., 5.), iron.middle_stop());
        assert_eq!(iron.color_at(5., 0., f64::NAN), iron.middle_stop());
    }

    #[test]
    fn colorize_uniform_field() {
        let field = TemperatureField::uniform(4, 3, 36.6, ThermalMetadata::default()).unwrap();
        let iron = palette("iron").unwrap();
        let img = colorize_full_range(&field, iron);
        assert_eq!(img.dimensions(), (4, 3));
        let [r, g, b] = iron.middle_stop();
        assert!(img.pixels().all(|p| p.0 == [r, g, b, 255]));
    }

    #[test]
    fn colorize_gradient() {
        let field =
            TemperatureField::from_vec(3, 1, vec![0., 5., 10.], ThermalMetadata::default()).unwrap();
        let img = colorize(&field, &black_white(), 0., 10.);
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [128, 128, 128, 255]);
        assert_eq!(img.get_pixel(2, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn colorize_empty() {
        let field = TemperatureField::from_vec(0, 0, vec![], ThermalMetadata::default()).unwrap();
        let img = colorize(&field, &black_white(), 0., 1.);
        assert_eq!(img.dimensions(), (0, 0));
    }
}
