use anyhow::Result;
use clap::value_t_or_exit;
use std::path::PathBuf;
use bmt_thermal::{arg, args_parser, cli::init_logging, opt};

pub struct Args {
    pub paths: Vec<PathBuf>,
    pub output: PathBuf,
    pub pretty: bool,
}

impl Args {
    pub fn from_cmd_line() -> Result<Args> {
        let matches = args_parser!("thermal-extract")
            .about("Split dual-BMP thermal files into thermal and real images.")
            .arg(
                opt!("output")
                    .short("o")
                    .required(true)
                    .help("Directory to write `<name>_thermal.bmp` / `<name>_real.bmp` into; taken names get a `_<n>` suffix"),
            )
            .arg(
                opt!("pretty")
                    .short("p")
                    .takes_value(false)
                    .help("Pretty-print the JSON report"),
            )
            .arg(
                arg!("files")
                    .required(true)
                    .multiple(true)
                    .help("Dual-BMP files"),
            )
            .get_matches();
        init_logging(&matches)?;

        let paths = matches
            .values_of("files")
            .unwrap()
            .map(|f| f.into())
            .collect();
        let output = value_t_or_exit!(matches, "output", PathBuf);
        let pretty = matches.is_present("pretty");

        Ok(Args {
            paths,
            output,
            pretty,
        })
    }
}
