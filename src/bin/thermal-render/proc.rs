use super::Args;
use anyhow::{anyhow, Result};
use byteordered::ByteOrdered;
use image::tiff::TiffEncoder;
use itertools::iproduct;
use log::info;
use std::{
    fs::{write, File},
    io::{BufWriter, Cursor, Write},
    path::{Path, PathBuf},
};
use bmt_thermal::{
    cli::ThermalInput,
    palette::{colorize, ColorPalette},
    temperature::parse_temperature,
    RealImage, TemperatureField,
};

pub struct RenderArgs {
    pub output: PathBuf,
    pub palettes: Vec<&'static ColorPalette>,
    pub min: Option<String>,
    pub max: Option<String>,
    pub write_real: bool,
    pub write_csv: bool,
    pub write_tiff: bool,
}

impl RenderArgs {
    pub fn from_args(args: &Args) -> Self {
        RenderArgs {
            output: args.output.clone(),
            palettes: args.palettes.clone(),
            min: args.min.clone(),
            max: args.max.clone(),
            write_real: args.write_real,
            write_csv: args.write_csv,
            write_tiff: args.write_tiff,
        }
    }

    pub fn output_stem_for(&self, path: &Path) -> Result<PathBuf> {
        let stem = path
            .file_stem()
            .ok_or_else(|| anyhow!("no file name in {}", path.display()))?;
        Ok(self.output.join(stem))
    }

    /// Color range for `field`: the given bounds converted to the
    /// field's unit, or the field's own extremes.
    pub fn range_for(&self, field: &TemperatureField) -> Result<(f64, f64)> {
        let bound = |s: &Option<String>, default: f32| -> Result<f64> {
            match s {
                Some(s) => {
                    let (val, unit) = parse_temperature(s, field.unit())?;
                    Ok(unit.convert(val, field.unit()))
                }
                None => Ok(default as f64),
            }
        };
        Ok((bound(&self.min, field.min())?, bound(&self.max, field.max())?))
    }

    /// `_thermal.png` for a single palette, `_thermal_<palette>.png` when
    /// several are rendered side by side.
    pub fn png_suffix(&self, palette: &ColorPalette) -> String {
        if self.palettes.len() > 1 {
            format!("_thermal_{}.png", palette.name())
        } else {
            "_thermal.png".into()
        }
    }
}

/// Linear map of `[min, max]` onto the full u16 range.
struct Scale {
    coeffs: [f64; 2],
}

impl Scale {
    fn new(min: f64, max: f64) -> Self {
        let factor = if max > min {
            u16::MAX as f64 / (max - min)
        } else {
            0.
        };
        Scale {
            coeffs: [-min * factor, factor],
        }
    }

    fn transform(&self, val: f64) -> u16 {
        let tval = self.coeffs[0] + self.coeffs[1] * val;
        tval.max(0.).min(u16::MAX as f64) as u16
    }
}

/// Write everything requested for one input; returns the paths written.
pub fn render(input: &ThermalInput, args: &RenderArgs) -> Result<Vec<PathBuf>> {
    let stem = args.output_stem_for(Path::new(&input.filename))?;
    let mut written = vec![];

    if let Some(field) = &input.image.field {
        let (min, max) = args.range_for(field)?;
        for palette in &args.palettes {
            let outpath = with_suffix(&stem, &args.png_suffix(palette));
            written.push(write_png(field, palette, min, max, outpath)?);
        }
        if args.write_tiff {
            written.push(write_tiff(field, min, max, &stem)?);
        }
        if args.write_csv {
            written.push(write_csv(field, &stem)?);
        }
    }
    if args.write_real {
        if let Some(real) = &input.image.real_image {
            written.push(write_real(real, &stem)?);
        }
    }
    info!("{} -> {} files", input.filename, written.len());
    Ok(written)
}

fn write_png(
    field: &TemperatureField,
    palette: &ColorPalette,
    min: f64,
    max: f64,
    outpath: PathBuf,
) -> Result<PathBuf> {
    let raster = colorize(field, palette, min, max);

    let image_writer = BufWriter::new(File::create(&outpath)?);
    let mut png_writer = {
        let mut encoder = png::Encoder::new(image_writer, raster.width(), raster.height());
        encoder.set_color(png::ColorType::RGBA);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.write_header()?
    };
    png_writer.write_image_data(&raster)?;

    Ok(outpath)
}

fn write_tiff(field: &TemperatureField, min: f64, max: f64, stem: &Path) -> Result<PathBuf> {
    let scale = Scale::new(min, max);
    let (wid, ht) = (field.width(), field.height());
    let mut image_buffer = {
        let vec = Vec::with_capacity(2 * ht * wid);
        let cursor = Cursor::new(vec);
        ByteOrdered::native(cursor)
    };
    for (row, col) in iproduct!(0..ht, 0..wid) {
        image_buffer.write_u16(scale.transform(field.values()[(row, col)] as f64))?;
    }

    let output_path = with_suffix(stem, "_thermal.tif");
    let image_writer = BufWriter::new(File::create(&output_path)?);
    TiffEncoder::new(image_writer).encode(
        &image_buffer.into_inner().into_inner(),
        wid as u32,
        ht as u32,
        image::ColorType::L16,
    )?;

    Ok(output_path)
}

fn write_csv(field: &TemperatureField, stem: &Path) -> Result<PathBuf> {
    let outpath = with_suffix(stem, "_temperatures.csv");
    let mut writer = BufWriter::new(File::create(&outpath)?);
    field.write_csv(&mut writer)?;
    writer.flush()?;
    Ok(outpath)
}

fn write_real(real: &RealImage, stem: &Path) -> Result<PathBuf> {
    let outpath = with_suffix(stem, &format!("_real.{}", real.extension()));
    write(&outpath, real.bytes())?;
    Ok(outpath)
}

fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut name = stem.as_os_str().to_owned();
    name.push(suffix);
    name.into()
}
