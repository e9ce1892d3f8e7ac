use serde::{Deserialize, Serialize};

use crate::model::{Axis, Sample};

pub const DEFAULT_BUCKET_WIDTH: f64 = 0.05;
pub const DEFAULT_DOMAIN_MIN: f64 = -1.0;
pub const DEFAULT_DOMAIN_MAX: f64 = 1.0;

/// Upper bound on buckets per histogram; finer grids are rejected.
pub const MAX_BUCKETS: f64 = 100_000.0;

// Quotients this close to a whole number are treated as sitting on the edge,
// relative to their magnitude.
const EDGE_EPS: f64 = 1e-12;

// Largest grid index magnitude; keeps index arithmetic exact in f64.
const MAX_INDEX: f64 = 1e9;

/// Fixed bucket grid shared by every histogram of a report, so buckets line
/// up across keys. Runs from `domain_min` to `domain_max` inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub bucket_width: f64,
    pub domain_min: f64,
    pub domain_max: f64,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            bucket_width: DEFAULT_BUCKET_WIDTH,
            domain_min: DEFAULT_DOMAIN_MIN,
            domain_max: DEFAULT_DOMAIN_MAX,
        }
    }
}

/// `floor(value / width)`, snapping quotients that sit on an edge up to it.
fn bucket_index(value: f64, width: f64) -> f64 {
    let q = value / width;
    let nearest = q.round();
    if (q - nearest).abs() <= EDGE_EPS * nearest.abs().max(1.0) {
        nearest
    } else {
        q.floor()
    }
}

impl Grid {
    /// Returns `None` for a width that is not positive, an empty domain, or a
    /// grid with more than [`MAX_BUCKETS`] buckets.
    pub fn new(bucket_width: f64, domain_min: f64, domain_max: f64) -> Option<Self> {
        let shape_ok = bucket_width.is_finite()
            && bucket_width > 0.0
            && domain_min.is_finite()
            && domain_max.is_finite()
            && domain_max > domain_min;
        if !shape_ok {
            return None;
        }
        let first = bucket_index(domain_min, bucket_width);
        let last = bucket_index(domain_max, bucket_width);
        let sized = first.abs() <= MAX_INDEX
            && last.abs() <= MAX_INDEX
            && last - first + 1.0 <= MAX_BUCKETS;
        sized.then_some(Self {
            bucket_width,
            domain_min,
            domain_max,
        })
    }

    fn first_index(&self) -> f64 {
        bucket_index(self.domain_min, self.bucket_width)
    }

    fn last_index(&self) -> f64 {
        bucket_index(self.domain_max, self.bucket_width)
    }

    pub fn len(&self) -> usize {
        let span = self.last_index() - self.first_index() + 1.0;
        span.max(1.0).min(MAX_BUCKETS) as usize
    }

    pub fn left_edge(&self, position: usize) -> f64 {
        let edge = (self.first_index() + position as f64) * self.bucket_width;
        // Keep edges printable as the decimals they stand for.
        (edge * 1e9).round() / 1e9
    }

    pub fn edges(&self) -> Vec<f64> {
        (0..self.len()).map(|pos| self.left_edge(pos)).collect()
    }

    /// Grid position for `value`, and whether it had to be folded in from
    /// outside the domain.
    pub fn position_of(&self, value: f64) -> (usize, bool) {
        let last = self.len() - 1;
        let idx = bucket_index(value, self.bucket_width);
        let first = self.first_index();
        if idx.is_nan() || idx < first {
            return (0, true);
        }
        let pos = idx - first;
        if pos > last as f64 {
            (last, true)
        } else {
            (pos as usize, false)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub left_edge: f64,
    pub mass: f64,
    pub count: usize,
}

/// Per-bucket normalized mass on a fixed grid. Never sparse: there is one
/// bucket per grid position even when it holds nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub axis: Axis,
    pub buckets: Vec<Bucket>,
    /// Samples whose value fell outside the grid and were folded into an end bucket.
    pub clipped: usize,
}

impl Histogram {
    pub fn empty(axis: Axis, grid: &Grid) -> Self {
        let buckets = grid
            .edges()
            .into_iter()
            .map(|left_edge| Bucket {
                left_edge,
                mass: 0.0,
                count: 0,
            })
            .collect();
        Self {
            axis,
            buckets,
            clipped: 0,
        }
    }

    pub fn total_mass(&self) -> f64 {
        self.buckets.iter().map(|b| b.mass).sum()
    }

    pub fn sample_count(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }

    /// True when no sample contributed to any bucket.
    pub fn is_empty(&self) -> bool {
        self.sample_count() == 0
    }

    pub fn bucket_at(&self, left_edge: f64) -> Option<&Bucket> {
        self.buckets
            .iter()
            .find(|b| (b.left_edge - left_edge).abs() < 1e-8)
    }
}

/// Bucket one key's samples on `axis`. Each sample carries `weight / total`
/// of the key's weight; a key with no positive total weight yields an empty
/// histogram.
pub fn build_histogram(samples: &[Sample], axis: Axis, grid: &Grid) -> Histogram {
    let mut hist = Histogram::empty(axis, grid);
    let total: f64 = samples.iter().map(|s| s.weight).sum();
    if total <= 0.0 {
        return hist;
    }

    for sample in samples {
        let (pos, clipped) = grid.position_of(sample.value(axis));
        let bucket = &mut hist.buckets[pos];
        bucket.mass += sample.weight / total;
        bucket.count += 1;
        if clipped {
            hist.clipped += 1;
        }
    }
    hist
}
