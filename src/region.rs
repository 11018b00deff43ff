//! Measurement regions drawn over a temperature field.
//!
//! Coordinates are image pixels and may be fractional. Statistics are a
//! pure function of the field and the region geometry.
use std::ops::RangeInclusive;

use serde_derive::*;

use crate::{
    field::{TemperatureField, DEFAULT_EMISSIVITY},
    stats::Stats,
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point { x, y }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    Point(Point),
    /// Two opposite corners, in any order.
    Rectangle { from: Point, to: Point },
    /// Vertices in drawing order; the last connects back to the first.
    Polygon { points: Vec<Point> },
}

impl Shape {
    /// Geometric area in square pixels. Points and polygons with fewer
    /// than three vertices have none.
    pub fn area(&self) -> f64 {
        match self {
            Shape::Point(_) => 0.,
            Shape::Rectangle { from, to } => ((to.x - from.x) * (to.y - from.y)).abs(),
            Shape::Polygon { points } => polygon_area(points),
        }
    }
}

/// A user-drawn region and the image it belongs to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Region {
    pub image_id: String,
    #[serde(default)]
    pub label: String,
    pub emissivity: f32,
    pub shape: Shape,
}

impl Region {
    pub fn new(image_id: &str, shape: Shape) -> Self {
        Region {
            image_id: image_id.into(),
            label: String::new(),
            emissivity: DEFAULT_EMISSIVITY,
            shape,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_emissivity(mut self, emissivity: f32) -> Self {
        self.emissivity = emissivity;
        self
    }

    pub fn measure(&self, field: &TemperatureField) -> RegionStats {
        measure(field, &self.shape)
    }
}

/// Temperatures sampled inside a region. All zeros when no pixel of the
/// field falls inside.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct RegionStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub area: f64,
    pub samples: usize,
}

impl RegionStats {
    fn from_samples(stats: &Stats, area: f64) -> Self {
        RegionStats {
            min: stats.min(),
            max: stats.max(),
            avg: stats.mean(),
            area,
            samples: stats.count(),
        }
    }
}

/// Sample `field` inside `shape`.
///
/// Rectangles and polygons cover the integer pixels of their bounding
/// box, widened to whole pixels (floor of the low corner, ceil of the
/// high one) and inclusive on both ends. Polygon pixels must also lie
/// inside or on the outline. Pixels outside the field are skipped.
pub fn measure(field: &TemperatureField, shape: &Shape) -> RegionStats {
    let mut stats = Stats::default();
    match shape {
        Shape::Point(p) => {
            if let Some(val) = field.temperature_at(p.x, p.y) {
                stats += val as f64;
            }
        }
        Shape::Rectangle { from, to } => {
            for (x, y) in pixels(field, &[*from, *to]) {
                if let Some(val) = field.at(x, y) {
                    stats += val as f64;
                }
            }
        }
        Shape::Polygon { points } if points.len() >= 3 => {
            for (x, y) in pixels(field, points) {
                if !point_in_polygon(Point::new(x as f64, y as f64), points) {
                    continue;
                }
                if let Some(val) = field.at(x, y) {
                    stats += val as f64;
                }
            }
        }
        Shape::Polygon { .. } => {}
    }
    RegionStats::from_samples(&stats, shape.area())
}

/// In-field integer pixels of the widened bounding box of `points`.
fn pixels(field: &TemperatureField, points: &[Point]) -> impl Iterator<Item = (usize, usize)> {
    let xs = span(points.iter().map(|p| p.x), field.width());
    let ys = span(points.iter().map(|p| p.y), field.height());
    ys.flat_map(move |y| xs.clone().map(move |x| (x, y)))
}

/// `floor(min)..=ceil(max)` of `coords`, clipped to `0..len`.
fn span(coords: impl Iterator<Item = f64>, len: usize) -> RangeInclusive<usize> {
    let (lo, hi) = coords.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
        (lo.min(c), hi.max(c))
    });
    let lo = lo.floor().max(0.);
    let hi = hi.ceil().min(len as f64 - 1.);
    if len == 0 || !(lo <= hi) {
        return 1..=0;
    }
    lo as usize..=hi as usize
}

/// Shoelace area; 0 for fewer than three vertices.
pub fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.;
    }
    let twice: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum();
    twice.abs() / 2.
}

/// Even-odd containment test. Points on an edge count as inside.
pub fn point_in_polygon(p: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let edges = polygon.iter().zip(polygon.iter().cycle().skip(1));

    let mut inside = false;
    for (a, b) in edges {
        if on_segment(p, *a, *b) {
            return true;
        }
        if (a.y > p.y) != (b.y > p.y) {
            let cross_x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < cross_x {
                inside = !inside;
            }
        }
    }
    inside
}

fn on_segment(p: Point, a: Point, b: Point) -> bool {
    const EPS: f64 = 1e-9;
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    cross.abs() < EPS
        && p.x >= a.x.min(b.x) - EPS
        && p.x <= a.x.max(b.x) + EPS
        && p.y >= a.y.min(b.y) - EPS
        && p.y <= a.y.max(b.y) + EPS
}
