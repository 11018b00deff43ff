use anyhow::{Context, Result};
use clap::value_t_or_exit;
use std::path::PathBuf;
use bmt_thermal::{arg, args_parser, cli::init_logging, opt, palette::palettes_named, ColorPalette};

pub struct Args {
    pub paths: Vec<String>,
    pub output: PathBuf,
    pub palettes: Vec<&'static ColorPalette>,
    pub min: Option<String>,
    pub max: Option<String>,
    pub write_real: bool,
    pub write_csv: bool,
    pub write_tiff: bool,
}

impl Args {
    pub fn from_cmd_line() -> Result<Args> {
        let matches = args_parser!("thermal-render")
            .setting(clap::AppSettings::AllowLeadingHyphen)
            .about("Render thermal exports with a color palette.")
            .arg(
                opt!("output")
                    .short("o")
                    .required_unless("list palettes")
                    .help("Output directory"),
            )
            .arg(
                opt!("palette")
                    .short("p")
                    .multiple(true)
                    .number_of_values(1)
                    .help("Palette name (iron, rainbow, grayscale, ...) or `all`; repeatable. Default: iron"),
            )
            .arg(opt!("min").help("Lower end of the color range, e.g. `20` or `68F`. Default: image min"))
            .arg(opt!("max").help("Upper end of the color range. Default: image max"))
            .arg(
                opt!("real")
                    .short("r")
                    .takes_value(false)
                    .help("Also write the embedded real photograph"),
            )
            .arg(
                opt!("csv")
                    .short("c")
                    .takes_value(false)
                    .help("Also write the temperature grid as CSV"),
            )
            .arg(
                opt!("tiff")
                    .short("t")
                    .takes_value(false)
                    .help("Also write a 16 bit grayscale TIFF scaled between min and max"),
            )
            .arg(
                opt!("list palettes")
                    .takes_value(false)
                    .help("Print the available palettes and exit"),
            )
            .arg(
                arg!("paths")
                    .required_unless("list palettes")
                    .multiple(true)
                    .help("Thermal image paths"),
            )
            .get_matches();
        init_logging(&matches)?;

        if matches.is_present("list palettes") {
            for p in bmt_thermal::palette::all_palettes() {
                println!("{:<12} {}", p.name(), p.label());
            }
            std::process::exit(0);
        }

        let paths = matches
            .values_of("paths")
            .unwrap()
            .map(|f| f.into())
            .collect();
        let output = value_t_or_exit!(matches, "output", PathBuf);
        let palettes = match matches.values_of("palette") {
            Some(names) => palettes_named(names),
            None => palettes_named(vec!["iron"]),
        }
        .context("selecting palettes")?;

        Ok(Args {
            paths,
            output,
            palettes,
            min: matches.value_of("min").map(String::from),
            max: matches.value_of("max").map(String::from),
            write_real: matches.is_present("real"),
            write_csv: matches.is_present("csv"),
            write_tiff: matches.is_present("tiff"),
        })
    }
}
