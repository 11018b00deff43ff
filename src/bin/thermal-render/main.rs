mod args;
mod proc;

use std::fs::create_dir_all;

use anyhow::{Context, Result};
use bmt_thermal::cli::process_paths_par;

use crate::{
    args::Args,
    proc::{render, RenderArgs},
};

fn main() -> Result<()> {
    let args = Args::from_cmd_line()?;
    let r_args = RenderArgs::from_args(&args);
    create_dir_all(&r_args.output)
        .with_context(|| format!("creating {}", r_args.output.display()))?;

    use rayon::prelude::*;
    let count = process_paths_par(args.paths)
        .into_par_iter()
        .map(|p| -> Result<usize> {
            let inp = p?;
            Ok(render(&inp, &r_args)?.len())
        })
        .try_fold(
            || 0usize,
            |acc, res| -> Result<_> { Ok(acc + res?) },
        )
        .try_reduce(|| 0, |a, b| Ok(a + b))?;

    eprintln!("Wrote {} files to {}", count, r_args.output.display());
    let labels: Vec<_> = r_args.palettes.iter().map(|p| p.label()).collect();
    eprintln!("Palettes: {}", labels.join(", "));
    Ok(())
}
