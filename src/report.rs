use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::{AggregatedKey, aggregate};
use crate::config::ReportConfig;
use crate::histogram::{Grid, Histogram, build_histogram};
use crate::model::{Axis, EventKey, PerAxis, WeightedPoint};
use crate::survival::{SurvivalCurve, ThresholdStats};
use crate::table_parse::ParsedTable;

/// Everything the presentation layer needs for one axis of one key.
#[derive(Debug, Clone, Serialize)]
pub struct AxisReport {
    pub axis: Axis,
    pub average: f64,
    pub histogram: Histogram,
    pub curve: SurvivalCurve,
    /// `FS(0)` / `FC(0)`.
    pub base: ThresholdStats,
    /// Unshifted normalized points, kept for later offset queries.
    pub points: Vec<WeightedPoint>,
}

impl AxisReport {
    fn build(key: &AggregatedKey, axis: Axis, grid: &Grid) -> Self {
        let points = key.points(axis).to_vec();
        Self {
            axis,
            average: key.average(axis),
            histogram: build_histogram(&key.samples, axis, grid),
            curve: SurvivalCurve::from_points(&points),
            base: ThresholdStats::from_points(&points, 0.0),
            points,
        }
    }

    pub fn thresholds(&self, offset: f64) -> ThresholdStats {
        ThresholdStats::from_points(&self.points, offset)
    }

    pub fn shifted_average(&self, offset: f64) -> f64 {
        self.average - offset
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyReport {
    pub key: EventKey,
    pub total_weight: f64,
    pub sample_count: usize,
    pub axes: PerAxis<AxisReport>,
}

impl KeyReport {
    pub fn axis(&self, axis: Axis) -> &AxisReport {
        self.axes.get(axis)
    }

    /// `None` when no sample of the key contributes to any histogram.
    pub fn assemble(key: &AggregatedKey, grid: &Grid) -> Option<Self> {
        let axes = PerAxis::from_fn(|axis| AxisReport::build(key, axis, grid));
        if axes.iter().all(|(_, ax)| ax.histogram.is_empty()) {
            debug!(key = %key.key, "skipping key without contributing samples");
            return None;
        }
        Some(Self {
            key: key.key,
            total_weight: key.total_weight,
            sample_count: key.samples.len(),
            axes,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extreme {
    pub key: EventKey,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatRange {
    pub min: Extreme,
    pub max: Extreme,
    pub mean: f64,
}

impl StatRange {
    fn collect(values: impl IntoIterator<Item = (EventKey, f64)>) -> Option<Self> {
        let mut iter = values.into_iter();
        let (key, value) = iter.next()?;
        let mut min = Extreme { key, value };
        let mut max = min;
        let mut sum = value;
        let mut n = 1usize;
        for (key, value) in iter {
            if value < min.value {
                min = Extreme { key, value };
            }
            if value > max.value {
                max = Extreme { key, value };
            }
            sum += value;
            n += 1;
        }
        Some(Self {
            min,
            max,
            mean: sum / n as f64,
        })
    }

    pub fn span(&self) -> f64 {
        self.max.value - self.min.value
    }
}

/// Cross-key view of `FS`/`FC` on one axis at one offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrossKeySummary {
    pub axis: Axis,
    pub offset: f64,
    pub keys: usize,
    pub fs: Option<StatRange>,
    pub fc: Option<StatRange>,
}

impl CrossKeySummary {
    fn from_keys(keys: &[KeyReport], axis: Axis, offset: f64) -> Self {
        let stats: Vec<(EventKey, ThresholdStats)> = keys
            .iter()
            .map(|k| (k.key, k.axis(axis).thresholds(offset)))
            .collect();
        Self {
            axis,
            offset,
            keys: stats.len(),
            fs: StatRange::collect(stats.iter().map(|(key, t)| (*key, t.fs))),
            fc: StatRange::collect(stats.iter().map(|(key, t)| (*key, t.fc))),
        }
    }

    /// Where `fs` sits between the lowest and highest key, in `[0, 1]`.
    pub fn relative_position(&self, fs: f64) -> Option<f64> {
        let range = self.fs?;
        let span = range.span();
        if span <= 0.0 {
            return None;
        }
        Some(((fs - range.min.value) / span).clamp(0.0, 1.0))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub grid: Grid,
    pub ranking_axis: Axis,
    pub offset: f64,
    pub dropped_rows: usize,
    /// Ordered by round, then game.
    pub keys: Vec<KeyReport>,
    /// Cross-key stats at offset 0.
    pub summary: CrossKeySummary,
    /// Cross-key stats at the configured offset, when it is not 0.
    pub offset_summary: Option<CrossKeySummary>,
}

impl Report {
    pub fn key(&self, key: EventKey) -> Option<&KeyReport> {
        self.keys
            .binary_search_by(|k| k.key.cmp(&key))
            .ok()
            .map(|idx| &self.keys[idx])
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Per-key `FS`/`FC` on `axis` at any offset, from the retained points.
    pub fn thresholds_at(&self, axis: Axis, offset: f64) -> Vec<(EventKey, ThresholdStats)> {
        self.keys
            .iter()
            .map(|k| (k.key, k.axis(axis).thresholds(offset)))
            .collect()
    }

    pub fn summary_at(&self, offset: f64) -> CrossKeySummary {
        CrossKeySummary::from_keys(&self.keys, self.ranking_axis, offset)
    }
}

pub fn build_report_from_table(table: &ParsedTable, cfg: &ReportConfig) -> Report {
    let aggregated = aggregate(&table.samples);
    let mut report = build_report(&aggregated, cfg);
    report.dropped_rows = table.dropped;
    report
}

pub fn build_report(aggregated: &BTreeMap<EventKey, AggregatedKey>, cfg: &ReportConfig) -> Report {
    let grid = cfg.grid();
    let groups: Vec<&AggregatedKey> = aggregated.values().collect();

    let assembled: Vec<Option<KeyReport>> = if cfg.parallelism > 1 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(cfg.parallelism)
            .build()
        {
            Ok(pool) => pool.install(|| {
                groups
                    .par_iter()
                    .map(|key| KeyReport::assemble(key, &grid))
                    .collect()
            }),
            Err(err) => {
                warn!("report thread pool unavailable, assembling sequentially: {err}");
                assemble_all(&groups, &grid)
            }
        }
    } else {
        assemble_all(&groups, &grid)
    };
    let keys: Vec<KeyReport> = assembled.into_iter().flatten().collect();

    let summary = CrossKeySummary::from_keys(&keys, cfg.ranking_axis, 0.0);
    let offset_summary = (cfg.offset != 0.0)
        .then(|| CrossKeySummary::from_keys(&keys, cfg.ranking_axis, cfg.offset));
    info!(
        groups = groups.len(),
        keys = keys.len(),
        skipped = groups.len() - keys.len(),
        "report assembled"
    );

    Report {
        generated_at: Utc::now(),
        grid,
        ranking_axis: cfg.ranking_axis,
        offset: cfg.offset,
        dropped_rows: 0,
        keys,
        summary,
        offset_summary,
    }
}

fn assemble_all(groups: &[&AggregatedKey], grid: &Grid) -> Vec<Option<KeyReport>> {
    groups
        .iter()
        .map(|key| KeyReport::assemble(key, grid))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::StatRange;
    use crate::model::EventKey;

    #[test]
    fn stat_range_keeps_first_extreme_on_ties() {
        let range = StatRange::collect([
            (EventKey::new(1, 1), 0.5),
            (EventKey::new(1, 2), 0.2),
            (EventKey::new(2, 1), 0.5),
            (EventKey::new(2, 2), 0.2),
        ])
        .unwrap();
        assert_eq!(range.max.key, EventKey::new(1, 1));
        assert_eq!(range.min.key, EventKey::new(1, 2));
        assert!((range.mean - 0.35).abs() < 1e-12);
    }

    #[test]
    fn stat_range_of_nothing_is_none() {
        assert!(StatRange::collect(Vec::<(EventKey, f64)>::new()).is_none());
    }
}
