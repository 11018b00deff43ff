mod args;

use anyhow::Result;
use args::Args;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde_derive::*;

use bmt_thermal::{
    cli::{process_paths_par, ThermalInput},
    region::{Region, RegionStats},
    stats::{accumulate, GlobalStats, Histogram, Stats},
    temperature::parse_temperature,
    Strategy, TemperatureField,
};

fn main() -> Result<()> {
    let args = Args::from_cmd_line()?;

    let (stats, cumulative) = process_paths_par(args.paths.clone())
        .into_par_iter()
        .map(|try_img| -> Result<_> { ImageStats::from_input(try_img?, &args) })
        .try_fold(
            || (vec![], Stats::default()),
            |mut acc, try_img| -> Result<_> {
                let item = try_img?;
                acc.1 += &item.cumulative;
                acc.0.push(item);
                Ok(acc)
            },
        )
        .try_reduce(
            || (vec![], Stats::default()),
            |mut acc1, acc2| -> Result<_> {
                acc1.0.extend(acc2.0);
                acc1.1 += &acc2.1;
                Ok(acc1)
            },
        )?;

    #[derive(Debug, Serialize)]
    struct OutputJson {
        image_stats: Vec<ImageStats>,
        cumulative: Stats,
    }

    serde_json::to_writer(
        std::io::stdout().lock(),
        &OutputJson {
            image_stats: stats,
            cumulative,
        },
    )?;

    Ok(())
}

#[derive(Serialize, Debug)]
struct Spot {
    x: usize,
    y: usize,
    temperature: f32,
}

#[derive(Serialize, Debug)]
struct MeasuredRegion {
    #[serde(flatten)]
    region: Region,
    stats: RegionStats,
}

#[derive(Serialize, Debug)]
struct BinnedHistogram {
    #[serde(flatten)]
    histogram: Histogram,
    colors: Vec<String>,
}

#[derive(Serialize, Debug)]
pub struct ImageStats {
    path: String,
    source: Strategy,
    has_real_image: bool,
    width: usize,
    height: usize,
    unit: Option<String>,
    stats: Option<GlobalStats>,
    hottest: Option<Spot>,
    coldest: Option<Spot>,
    histogram: Option<BinnedHistogram>,
    regions: Vec<MeasuredRegion>,
    #[serde(skip)]
    cumulative: Stats,
}

impl ImageStats {
    fn from_input(input: ThermalInput, args: &Args) -> Result<Self> {
        let ThermalInput { filename, image } = input;
        let mut out = ImageStats {
            path: filename,
            source: image.source,
            has_real_image: image.real_image.is_some(),
            width: 0,
            height: 0,
            unit: None,
            stats: None,
            hottest: None,
            coldest: None,
            histogram: None,
            regions: vec![],
            cumulative: Stats::default(),
        };
        let field = match image.field {
            Some(field) => match args.unit {
                Some(unit) => field.to_unit(unit),
                None => field,
            },
            None => return Ok(out),
        };

        out.width = field.width();
        out.height = field.height();
        out.unit = Some(field.unit().symbol().into());
        out.stats = Some(GlobalStats::compute(&field));
        out.cumulative = accumulate(&field);
        out.hottest = field.hottest().map(|(x, y, temperature)| Spot { x, y, temperature });
        out.coldest = field.coldest().map(|(x, y, temperature)| Spot { x, y, temperature });
        if args.histogram {
            out.histogram = Some(Self::histogram(&field, args)?);
        }
        out.regions = args
            .regions
            .iter()
            .map(|region| MeasuredRegion {
                region: region.clone(),
                stats: region.measure(&field),
            })
            .collect();
        Ok(out)
    }

    fn histogram(field: &TemperatureField, args: &Args) -> Result<BinnedHistogram> {
        let range = match &args.range {
            Some((min, max)) => {
                let to_field = |s: &str| -> Result<f64> {
                    let (val, unit) = parse_temperature(s, field.unit())?;
                    Ok(unit.convert(val, field.unit()))
                };
                Some((to_field(min)?, to_field(max)?))
            }
            None => None,
        };
        let histogram = Histogram::compute(field, range);
        let colors = histogram
            .bin_colors(args.palette)
            .into_iter()
            .map(|[r, g, b]| format!("#{:02x}{:02x}{:02x}", r, g, b))
            .collect();
        Ok(BinnedHistogram { histogram, colors })
    }
}
