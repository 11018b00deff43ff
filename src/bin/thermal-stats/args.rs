use anyhow::{Context, Result};
use std::{fs::File, io::BufReader};
use bmt_thermal::{
    arg, args_parser, cli::init_logging, opt, palette::palette, region::Region,
    temperature::parse_temperature, ColorPalette, TemperatureUnit,
};

pub struct Args {
    pub paths: Vec<String>,
    pub unit: Option<TemperatureUnit>,
    pub histogram: bool,
    pub range: Option<(String, String)>,
    pub palette: &'static ColorPalette,
    pub regions: Vec<Region>,
}

impl Args {
    pub fn from_cmd_line() -> Result<Args> {
        let matches = args_parser!("thermal-stats")
            .setting(clap::AppSettings::AllowLeadingHyphen)
            .about("Compute temperature stats from thermal exports.")
            .arg(
                opt!("unit")
                    .short("u")
                    .help("Report temperatures in this unit (C, F or K). Default: as stored"),
            )
            .arg(
                opt!("histogram")
                    .short("H")
                    .takes_value(false)
                    .help("Include a 50 bin histogram per image"),
            )
            .arg(opt!("min").requires("max").help("Histogram lower bound, e.g. `20` or `68F`"))
            .arg(opt!("max").requires("min").help("Histogram upper bound"))
            .arg(
                opt!("palette")
                    .short("p")
                    .help("Palette for histogram bin colors. Default: iron"),
            )
            .arg(
                opt!("regions")
                    .short("r")
                    .help("JSON file with an array of regions to measure on every image"),
            )
            .arg(
                arg!("paths")
                    .required(true)
                    .multiple(true)
                    .help("Thermal image paths"),
            )
            .get_matches();
        init_logging(&matches)?;

        let paths = matches
            .values_of("paths")
            .unwrap()
            .map(|f| f.into())
            .collect();
        let unit = matches
            .value_of("unit")
            .map(|u| u.parse())
            .transpose()?;
        let histogram = matches.is_present("histogram");
        let range = match (matches.value_of("min"), matches.value_of("max")) {
            (Some(min), Some(max)) => {
                // validate now; units resolve per image
                parse_temperature(min, TemperatureUnit::Celsius)?;
                parse_temperature(max, TemperatureUnit::Celsius)?;
                Some((min.into(), max.into()))
            }
            _ => None,
        };
        let palette_name = matches.value_of("palette").unwrap_or("iron");
        let palette = palette(palette_name)
            .with_context(|| format!("unknown palette `{}`", palette_name))?;
        let regions = match matches.value_of("regions") {
            Some(path) => {
                let file = File::open(path).with_context(|| format!("opening {}", path))?;
                serde_json::from_reader(BufReader::new(file))
                    .with_context(|| format!("parsing regions from {}", path))?
            }
            None => vec![],
        };

        Ok(Args {
            paths,
            unit,
            histogram,
            range,
            palette,
            regions,
        })
    }
}
