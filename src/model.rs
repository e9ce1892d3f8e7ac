use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One forecasting event: a `(round, game)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventKey {
    pub round: i64,
    pub game: i64,
}

impl EventKey {
    pub fn new(round: i64, game: i64) -> Self {
        Self { round, game }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "round {} game {}", self.round, self.game)
    }
}

/// One row of the source table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub round: i64,
    pub game: i64,
    /// Confidence weight, never negative.
    pub weight: f64,
    pub p: f64,
    pub p_home: f64,
    pub p_away: f64,
    pub p_draw: f64,
}

impl Sample {
    pub fn key(&self) -> EventKey {
        EventKey::new(self.round, self.game)
    }

    pub fn value(&self, axis: Axis) -> f64 {
        match axis {
            Axis::P => self.p,
            Axis::Home => self.p_home,
            Axis::Away => self.p_away,
            Axis::Draw => self.p_draw,
        }
    }
}

/// Which probability column a point collection is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Unconditional success probability.
    P,
    Home,
    Away,
    Draw,
}

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::P, Axis::Home, Axis::Away, Axis::Draw];

    pub fn code(self) -> &'static str {
        match self {
            Axis::P => "p",
            Axis::Home => "pH",
            Axis::Away => "pA",
            Axis::Draw => "pD",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Axis::P => "P(S)",
            Axis::Home => "P(S|H)",
            Axis::Away => "P(S|A)",
            Axis::Draw => "P(S|D)",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Axis {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let s = raw.trim();
        match s.to_ascii_lowercase().as_str() {
            "p" | "ps" => Ok(Axis::P),
            "ph" | "home" | "h" => Ok(Axis::Home),
            "pa" | "away" | "a" => Ok(Axis::Away),
            "pd" | "draw" | "d" => Ok(Axis::Draw),
            _ => Err(anyhow::anyhow!("unknown axis {s:?} (expected p|pH|pA|pD)")),
        }
    }
}

/// One value per axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerAxis<T> {
    pub p: T,
    pub home: T,
    pub away: T,
    pub draw: T,
}

impl<T> PerAxis<T> {
    pub fn from_fn(mut f: impl FnMut(Axis) -> T) -> Self {
        Self {
            p: f(Axis::P),
            home: f(Axis::Home),
            away: f(Axis::Away),
            draw: f(Axis::Draw),
        }
    }

    pub fn get(&self, axis: Axis) -> &T {
        match axis {
            Axis::P => &self.p,
            Axis::Home => &self.home,
            Axis::Away => &self.away,
            Axis::Draw => &self.draw,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Axis, &T)> {
        Axis::ALL.into_iter().map(move |axis| (axis, self.get(axis)))
    }
}

/// A value on one axis paired with its normalized mass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedPoint {
    pub x: f64,
    pub y: f64,
}

pub fn total_mass(points: &[WeightedPoint]) -> f64 {
    points.iter().map(|pt| pt.y).sum()
}
