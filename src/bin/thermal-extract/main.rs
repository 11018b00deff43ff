mod args;

use std::{
    fs::{create_dir_all, read},
    path::Path,
};

use anyhow::{Context, Result};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::info;
use serde_derive::*;

use bmt_thermal::bitmap::{extract_bitmaps, ExtractedFile};

use crate::args::Args;

#[derive(Serialize, Debug)]
struct ExtractReport {
    source: String,
    success: bool,
    message: String,
    images: Vec<ExtractedFile>,
}

fn extract_file(path: &Path, output: &Path) -> Result<ExtractReport> {
    let bytes = read(path).with_context(|| format!("reading {}", path.display()))?;
    let extraction = extract_bitmaps(&bytes);

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let images = extraction
        .save_to_dir(output, &name)
        .with_context(|| format!("writing images of {}", path.display()))?;
    info!("{}: {}", path.display(), extraction.message());

    Ok(ExtractReport {
        source: format!("{}", path.display()),
        success: extraction.is_complete(),
        message: extraction.message(),
        images,
    })
}

fn main() -> Result<()> {
    let args = Args::from_cmd_line()?;
    create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let bar = ProgressBar::new(args.paths.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {wide_bar:cyan/blue} {pos:>7}/{len:7}"),
    );

    use rayon::prelude::*;
    let reports = args
        .paths
        .par_iter()
        .progress_with(bar)
        .map(|p| extract_file(p, &args.output))
        .collect::<Result<Vec<_>>>()?;

    let complete = reports.iter().filter(|r| r.success).count();
    eprintln!("Extracted {} of {} files completely", complete, reports.len());

    let stdout = std::io::stdout();
    if args.pretty {
        serde_json::to_writer_pretty(stdout.lock(), &reports)?;
    } else {
        serde_json::to_writer(stdout.lock(), &reports)?;
    }
    Ok(())
}
