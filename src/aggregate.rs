use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{Axis, EventKey, PerAxis, Sample, WeightedPoint};

/// All samples of one `(round, game)` merged into a single weighted record.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedKey {
    pub key: EventKey,
    pub total_weight: f64,
    /// Weight-averaged value per axis; 0 when the group is degenerate.
    pub averages: PerAxis<f64>,
    /// Normalized points per axis; empty when the group is degenerate.
    pub points: PerAxis<Vec<WeightedPoint>>,
    #[serde(skip)]
    pub samples: Vec<Sample>,
}

impl AggregatedKey {
    pub fn is_degenerate(&self) -> bool {
        self.total_weight <= 0.0
    }

    pub fn average(&self, axis: Axis) -> f64 {
        *self.averages.get(axis)
    }

    pub fn points(&self, axis: Axis) -> &[WeightedPoint] {
        self.points.get(axis)
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    total_weight: f64,
    weighted: PerAxis<f64>,
    samples: Vec<Sample>,
}

impl Accumulator {
    fn push(&mut self, sample: &Sample) {
        let w = sample.weight;
        self.total_weight += w;
        self.weighted.p += w * sample.p;
        self.weighted.home += w * sample.p_home;
        self.weighted.away += w * sample.p_away;
        self.weighted.draw += w * sample.p_draw;
        self.samples.push(*sample);
    }

    fn finish(self, key: EventKey) -> AggregatedKey {
        let total = self.total_weight;
        if total <= 0.0 {
            return AggregatedKey {
                key,
                total_weight: total,
                averages: PerAxis::default(),
                points: PerAxis::default(),
                samples: self.samples,
            };
        }

        let averages = PerAxis::from_fn(|axis| self.weighted.get(axis) / total);
        let points = PerAxis::from_fn(|axis| {
            self.samples
                .iter()
                .map(|s| WeightedPoint {
                    x: s.value(axis),
                    y: s.weight / total,
                })
                .collect()
        });
        AggregatedKey {
            key,
            total_weight: total,
            averages,
            points,
            samples: self.samples,
        }
    }
}

/// Group samples by key and merge each group with its confidence weights.
pub fn aggregate(samples: &[Sample]) -> BTreeMap<EventKey, AggregatedKey> {
    let grouped = samples.iter().fold(
        BTreeMap::<EventKey, Accumulator>::new(),
        |mut acc, sample| {
            acc.entry(sample.key()).or_default().push(sample);
            acc
        },
    );

    grouped
        .into_iter()
        .map(|(key, acc)| (key, acc.finish(key)))
        .collect()
}
