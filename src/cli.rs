//! Helpers to parse CLI arguments in the accompanying
//! binaries.
//!
//! APIs here shouldn't be considered stable / used as a
//! library.

use std::path::Path;

use anyhow::{Context, Result};
pub use clap::{App, Arg, ArgMatches};
use indicatif::{ProgressBar, ProgressStyle};
pub use inflector::Inflector;
use log::Level;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::DecodedImage;

#[macro_export]
macro_rules! args_parser {
    ($name:expr) => {{
        $crate::cli::App::new($name)
            .version(clap::crate_version!())
            .author(clap::crate_authors!())
            .arg($crate::cli::verbosity_arg())
    }};
}

#[macro_export]
macro_rules! arg {
    ($name:expr) => {{
        use $crate::cli::Inflector;
        $crate::cli::Arg::with_name($name).value_name(&$name.to_screaming_snake_case())
    }};
}

#[macro_export]
macro_rules! opt {
    ($name:expr) => {{
        use $crate::cli::Inflector;
        $crate::cli::Arg::with_name($name)
            .long(&$name.to_kebab_case())
            .value_name(&$name.to_screaming_snake_case())
    }};
}

/// `-v` flag, repeatable; added to every parser by [`args_parser!`].
pub fn verbosity_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("verbose")
        .short("v")
        .multiple(true)
        .help("Log more (-v info, -vv debug, -vvv trace)")
}

/// Install the stderr logger at the level picked by `-v` occurrences.
pub fn init_logging(matches: &ArgMatches<'_>) -> Result<()> {
    let level = match matches.occurrences_of("verbose") {
        0 => Level::Warn,
        1 => Level::Info,
        2 => Level::Debug,
        _ => Level::Trace,
    };
    simple_logger::init_with_level(level).context("could not install logger")
}

/// A decoded input file.
pub struct ThermalInput {
    pub filename: String,
    pub image: DecodedImage,
}

impl ThermalInput {
    fn try_from_path(filename: String) -> Result<Self> {
        let image = DecodedImage::try_from_path(Path::new(&filename))
            .context("could not decode thermal image: tried BMTF, dual BMP, raster")?;
        Ok(ThermalInput { filename, image })
    }
}

/// Decode `paths` on the rayon pool with a progress bar on stderr.
pub fn process_paths_par(paths: Vec<String>) -> impl IntoParallelIterator<Item = Result<ThermalInput>> {
    let bar = ProgressBar::new(paths.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {wide_bar:cyan/blue} {pos:>7}/{len:7}"),
    );

    paths
        .into_par_iter()
        .map(ThermalInput::try_from_path)
        .inspect(move |_| bar.inc(1))
}
