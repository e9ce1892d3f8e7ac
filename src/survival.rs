use serde::{Deserialize, Serialize};

use crate::model::WeightedPoint;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub x: f64,
    /// Mass of every point with value `>= x`.
    pub cumulative: f64,
}

/// Inverse-CDF over the raw points, ordered by `x` descending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurvivalCurve {
    pub points: Vec<CurvePoint>,
}

impl SurvivalCurve {
    pub fn from_points(points: &[WeightedPoint]) -> Self {
        let mut sorted = points.to_vec();
        // Stable, so equal values keep input order and the curve is deterministic.
        sorted.sort_by(|a, b| b.x.total_cmp(&a.x));

        let mut running = 0.0;
        let points = sorted
            .into_iter()
            .map(|pt| {
                running += pt.y;
                CurvePoint {
                    x: pt.x,
                    cumulative: running,
                }
            })
            .collect();
        Self { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn total_mass(&self) -> f64 {
        self.points.last().map_or(0.0, |pt| pt.cumulative)
    }

    /// Same curve with every `x` moved down by `offset`.
    pub fn shifted(&self, offset: f64) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|pt| CurvePoint {
                    x: pt.x - offset,
                    cumulative: pt.cumulative,
                })
                .collect(),
        }
    }

    /// Mass with value at or above `threshold`.
    pub fn mass_at_or_above(&self, threshold: f64) -> f64 {
        let reached = self.points.partition_point(|pt| pt.x - threshold >= 0.0);
        if reached == 0 {
            0.0
        } else {
            self.points[reached - 1].cumulative
        }
    }

    /// `FS`/`FC` read off the curve. Only the prefix above `offset` is walked.
    pub fn thresholds(&self, offset: f64) -> ThresholdStats {
        let fc = self.mass_at_or_above(offset);
        let mut fs = 0.0;
        let mut prev = 0.0;
        for pt in &self.points {
            let excess = pt.x - offset;
            if excess <= 0.0 {
                break;
            }
            fs += (pt.cumulative - prev) * clamp_unit(excess);
            prev = pt.cumulative;
        }
        ThresholdStats { offset, fs, fc }
    }
}

/// `FC(x0)` is the normalized mass of points with `x - x0 >= 0`; `FS(x0)` is
/// the mass-weighted excess `clamp(x - x0, 0, 1)` over points with
/// `x - x0 > 0`. The raw-point scan and the curve path agree for every offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdStats {
    pub offset: f64,
    pub fs: f64,
    pub fc: f64,
}

impl ThresholdStats {
    /// Linear scan over the unshifted raw points.
    pub fn from_points(points: &[WeightedPoint], offset: f64) -> Self {
        let mut fs = 0.0;
        let mut fc = 0.0;
        for pt in points {
            let excess = pt.x - offset;
            if excess >= 0.0 {
                fc += pt.y;
            }
            if excess > 0.0 {
                fs += pt.y * clamp_unit(excess);
            }
        }
        Self { offset, fs, fc }
    }
}

pub fn clamp_unit(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}
