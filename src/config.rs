use std::env;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::histogram::{DEFAULT_BUCKET_WIDTH, DEFAULT_DOMAIN_MAX, DEFAULT_DOMAIN_MIN, Grid};
use crate::model::Axis;

pub const DEFAULT_DELIMITER: char = ',';
pub const MAX_PARALLELISM: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub bucket_width: f64,
    pub domain_min: f64,
    pub domain_max: f64,
    /// Threshold offset `x0` for `FS`/`FC`.
    pub offset: f64,
    /// Axis the cross-key summary ranks on.
    pub ranking_axis: Axis,
    pub delimiter: char,
    /// Worker threads for per-key assembly; 1 keeps it on the calling thread.
    pub parallelism: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            bucket_width: DEFAULT_BUCKET_WIDTH,
            domain_min: DEFAULT_DOMAIN_MIN,
            domain_max: DEFAULT_DOMAIN_MAX,
            offset: 0.0,
            ranking_axis: Axis::P,
            delimiter: DEFAULT_DELIMITER,
            parallelism: 1,
        }
    }
}

impl ReportConfig {
    /// Defaults overridden by `EV_*` environment variables. Values that do not
    /// parse keep their default.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            bucket_width: float_env("EV_BUCKET_WIDTH", d.bucket_width),
            domain_min: float_env("EV_DOMAIN_MIN", d.domain_min),
            domain_max: float_env("EV_DOMAIN_MAX", d.domain_max),
            offset: opt_env("EV_OFFSET").map_or(d.offset, |raw| parse_offset(&raw)),
            ranking_axis: opt_env("EV_RANKING_AXIS")
                .map_or(d.ranking_axis, |raw| parse_axis(&raw)),
            delimiter: opt_env("EV_DELIMITER")
                .map_or(d.delimiter, |raw| parse_delimiter(&raw)),
            parallelism: opt_env("EV_PARALLELISM")
                .and_then(|raw| raw.trim().parse::<usize>().ok())
                .unwrap_or(d.parallelism)
                .clamp(1, MAX_PARALLELISM),
        }
    }

    /// The configured grid, or the default one if the configured values
    /// describe no valid grid.
    pub fn grid(&self) -> Grid {
        Grid::new(self.bucket_width, self.domain_min, self.domain_max).unwrap_or_else(|| {
            warn!(
                bucket_width = self.bucket_width,
                domain_min = self.domain_min,
                domain_max = self.domain_max,
                "invalid histogram grid, using default"
            );
            Grid::default()
        })
    }
}

/// Query-time offset. Anything that is not a finite number means 0.
pub fn parse_offset(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            warn!(raw, "offset is not a number, using 0");
            0.0
        }
    }
}

pub fn parse_axis(raw: &str) -> Axis {
    raw.parse::<Axis>().unwrap_or_else(|err| {
        warn!("{err}, ranking on p");
        Axis::P
    })
}

pub fn parse_delimiter(raw: &str) -> char {
    match raw {
        "\\t" | "tab" => '\t',
        _ => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => {
                    warn!(raw, "delimiter must be a single character, using ','");
                    DEFAULT_DELIMITER
                }
            }
        }
    }
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|val| if val.trim().is_empty() { None } else { Some(val) })
}

fn float_env(key: &str, default: f64) -> f64 {
    opt_env(key)
        .and_then(|val| val.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}
