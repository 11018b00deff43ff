//! Whole-image statistics: running moments, median and histogram.
use std::ops::AddAssign;

use rayon::prelude::*;
use serde_derive::*;

use crate::{field::TemperatureField, palette::ColorPalette};

pub const HISTOGRAM_BINS: usize = 50;

/// Running count, mean, variance and range of a stream of values.
///
/// Values are added with `+= f64`; accumulators from separate chunks
/// combine with `+= &Stats`, so the type folds and reduces under rayon.
#[derive(Serialize, Debug, Clone, Copy)]
#[serde(into = "StatsSummary")]
pub struct Stats {
    count: usize,
    mean: f64,
    /// Sum of squared deviations from the mean.
    m2: f64,
    min: f64,
    max: f64,
}

impl Default for Stats {
    fn default() -> Self {
        Stats {
            count: 0,
            mean: 0.,
            m2: 0.,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl Stats {
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance; 0 when empty.
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.
        } else {
            self.m2 / self.count as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        if self.count == 0 {
            0.
        } else {
            self.min
        }
    }

    pub fn max(&self) -> f64 {
        if self.count == 0 {
            0.
        } else {
            self.max
        }
    }
}

impl AddAssign<f64> for Stats {
    fn add_assign(&mut self, val: f64) {
        self.count += 1;
        let delta = val - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (val - self.mean);
        self.min = self.min.min(val);
        self.max = self.max.max(val);
    }
}

impl AddAssign<&Stats> for Stats {
    fn add_assign(&mut self, other: &Stats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        let (na, nb) = (self.count as f64, other.count as f64);
        let n = na + nb;
        let delta = other.mean - self.mean;
        self.mean += delta * nb / n;
        self.m2 += other.m2 + delta * delta * na * nb / n;
        self.count += other.count;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

#[derive(Serialize, Debug, Clone, Copy)]
struct StatsSummary {
    count: usize,
    mean: f64,
    std_dev: f64,
    min: f64,
    max: f64,
}

impl From<Stats> for StatsSummary {
    fn from(s: Stats) -> Self {
        StatsSummary {
            count: s.count(),
            mean: s.mean(),
            std_dev: s.std_dev(),
            min: s.min(),
            max: s.max(),
        }
    }
}

/// Summary of every value in a field. All zeros for an empty field.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct GlobalStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl GlobalStats {
    pub fn compute(field: &TemperatureField) -> Self {
        let stats = accumulate(field);

        let mut sorted: Vec<f32> = field.values().iter().copied().collect();
        sorted.par_sort_unstable_by(|a, b| a.total_cmp(b));

        GlobalStats {
            count: stats.count(),
            mean: stats.mean(),
            median: median(&sorted),
            std_dev: stats.std_dev(),
            min: stats.min(),
            max: stats.max(),
        }
    }
}

/// Fold every value of `field` into a [`Stats`] in parallel.
pub fn accumulate(field: &TemperatureField) -> Stats {
    field
        .values()
        .into_par_iter()
        .fold(Stats::default, |mut acc, &val| {
            acc += val as f64;
            acc
        })
        .reduce(Stats::default, |mut acc, val| {
            acc += &val;
            acc
        })
}

/// Median of sorted values; the mean of the middle pair for even counts.
fn median(sorted: &[f32]) -> f64 {
    let n = sorted.len();
    match n {
        0 => 0.,
        _ if n % 2 == 1 => sorted[n / 2] as f64,
        _ => (sorted[n / 2 - 1] as f64 + sorted[n / 2] as f64) / 2.,
    }
}

/// Fixed-width histogram over `[min, max]`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub bin_width: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bin every value of `field` into [`HISTOGRAM_BINS`] bins spanning
    /// `range`, or the field's own range when `None`.
    ///
    /// Bin indices are clamped, so values outside the range land in the
    /// first or last bin and every value is counted. When the range has no
    /// width every value lands in the first bin.
    pub fn compute(field: &TemperatureField, range: Option<(f64, f64)>) -> Self {
        let (min, max) = range.unwrap_or((field.min() as f64, field.max() as f64));
        let bin_width = (max - min) / HISTOGRAM_BINS as f64;

        let mut counts = vec![0; HISTOGRAM_BINS];
        for &val in field.values().iter() {
            counts[bin_index(val as f64, min, bin_width)] += 1;
        }
        Histogram {
            min,
            max,
            bin_width,
            counts,
        }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Temperature at the middle of bin `idx`.
    pub fn bin_center(&self, idx: usize) -> f64 {
        self.min + (idx as f64 + 0.5) * self.bin_width
    }

    /// Palette color of each bin's center, for drawing the bars.
    pub fn bin_colors(&self, palette: &ColorPalette) -> Vec<[u8; 3]> {
        (0..self.counts.len())
            .map(|idx| palette.color_at(self.bin_center(idx), self.min, self.max))
            .collect()
    }
}

fn bin_index(val: f64, min: f64, bin_width: f64) -> usize {
    if !(bin_width > 0.) || !bin_width.is_finite() {
        return 0;
    }
    let idx = ((val - min) / bin_width).floor();
    if idx <= 0. {
        0
    } else {
        (idx as usize).min(HISTOGRAM_BINS - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{field::ThermalMetadata, palette::palette};

    fn field(values: Vec<f32>) -> TemperatureField {
        TemperatureField::from_vec(values.len(), 1, values, ThermalMetadata::default()).unwrap()
    }

    #[test]
    fn uniform_values() {
        let f = TemperatureField::uniform(7, 3, 36.6, ThermalMetadata::default()).unwrap();
        let s = GlobalStats::compute(&f);
        assert_eq!(s.count, 21);
        assert_eq!(s.mean, 36.6f32 as f64);
        assert_eq!(s.median, 36.6f32 as f64);
        assert_eq!(s.std_dev, 0.);
        assert_eq!((s.min, s.max), (36.6f32 as f64, 36.6f32 as f64));
    }

    #[test]
    fn moments_and_median() {
        let s = GlobalStats::compute(&field(vec![2., 4., 4., 4., 5., 5., 7., 9.]));
        assert!((s.mean - 5.).abs() < 1e-12);
        assert!((s.std_dev - 2.).abs() < 1e-12);
        assert_eq!(s.median, 4.5);
        assert_eq!((s.min, s.max), (2., 9.));

        assert_eq!(GlobalStats::compute(&field(vec![3., 1., 2.])).median, 2.);
    }

    #[test]
    fn empty_field() {
        let s = GlobalStats::compute(&field(vec![]));
        assert_eq!(
            s,
            GlobalStats {
                count: 0,
                mean: 0.,
                median: 0.,
                std_dev: 0.,
                min: 0.,
                max: 0.
            }
        );
    }

    #[test]
    fn merging_matches_sequential() {
        let values: Vec<f64> = (0..100).map(|i| (i as f64 * 0.37).sin() * 40.).collect();
        let mut all = Stats::default();
        values.iter().for_each(|&v| all += v);

        let (mut left, mut right) = (Stats::default(), Stats::default());
        values[..37].iter().for_each(|&v| left += v);
        values[37..].iter().for_each(|&v| right += v);
        left += &right;

        assert_eq!(left.count(), all.count());
        assert!((left.mean() - all.mean()).abs() < 1e-9);
        assert!((left.variance() - all.variance()).abs() < 1e-9);
        assert_eq!((left.min(), left.max()), (all.min(), all.max()));

        let mut empty = Stats::default();
        empty += &all;
        assert_eq!(empty.count(), 100);
    }

    #[test]
    fn stats_serialize_summary() {
        let mut s = Stats::default();
        s += 1.;
        s += 3.;
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["count"], 2);
        assert_eq!(json["mean"], 2.);
        assert_eq!(json["std_dev"], 1.);
    }

    #[test]
    fn histogram_bins() {
        let f = field((0..=100).map(|v| v as f32).collect());
        let h = Histogram::compute(&f, None);
        assert_eq!(h.counts.len(), HISTOGRAM_BINS);
        assert_eq!(h.bin_width, 2.);
        assert_eq!(h.total(), 101);
        assert_eq!(h.counts[0], 2);
        // 98, 99 and the maximum 100 share the last bin
        assert_eq!(h.counts[HISTOGRAM_BINS - 1], 3);
        assert_eq!(h.bin_center(0), 1.);
    }

    #[test]
    fn histogram_clamps_outside_range() {
        let f = field(vec![-50., 10., 15.1, 500.]);
        let h = Histogram::compute(&f, Some((10., 20.)));
        assert_eq!(h.total(), 4);
        assert_eq!(h.counts[0], 2);
        assert_eq!(h.counts[HISTOGRAM_BINS - 1], 1);
        assert_eq!(h.counts[25], 1);
    }

    #[test]
    fn histogram_degenerate_range() {
        let f = TemperatureField::uniform(4, 4, 20., ThermalMetadata::default()).unwrap();
        let h = Histogram::compute(&f, None);
        assert_eq!(h.counts[0], 16);
        assert_eq!(h.total(), 16);
    }

    #[test]
    fn histogram_colors() {
        let f = field(vec![0., 100.]);
        let h = Histogram::compute(&f, None);
        let gray = palette("grayscale").unwrap();
        let colors = h.bin_colors(gray);
        assert_eq!(colors.len(), HISTOGRAM_BINS);
        assert!(colors[0][0] < colors[HISTOGRAM_BINS - 1][0]);
    }
}
