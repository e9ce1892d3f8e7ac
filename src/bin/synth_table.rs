use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ev_survival::table_parse::MIN_COLUMNS;

/// Write a synthetic source table with random samples per (round, game).
#[derive(Parser, Debug)]
#[command(name = "synth_table", about)]
struct Args {
    #[arg(long, default_value_t = 3)]
    rounds: i64,

    #[arg(long, default_value_t = 4)]
    games: i64,

    /// Samples emitted per (round, game)
    #[arg(long, default_value_t = 25)]
    samples: usize,

    /// Share of rows written truncated, to exercise row dropping
    #[arg(long, default_value_t = 0.0)]
    malformed: f64,

    #[arg(long)]
    seed: Option<u64>,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut buf = String::new();
    buf.push_str(&header().join(","));
    buf.push('\n');
    for round in 1..=args.rounds.max(1) {
        for game in 1..=args.games.max(1) {
            for _ in 0..args.samples {
                let row = synth_row(&mut rng, round, game);
                if rng.gen_bool(args.malformed.clamp(0.0, 1.0)) {
                    buf.push_str(&row[..3].join(","));
                } else {
                    buf.push_str(&row.join(","));
                }
                buf.push('\n');
            }
        }
    }

    match args.out {
        Some(path) => {
            fs::write(&path, buf).with_context(|| format!("write {}", path.display()))?;
        }
        None => {
            io::stdout().write_all(buf.as_bytes()).context("write stdout")?;
        }
    }
    Ok(())
}

fn header() -> Vec<String> {
    let mut cols = vec!["round".to_string(), "game".to_string()];
    cols.extend((2..19).map(|idx| format!("c{idx}")));
    cols.extend(
        ["FC", "Eg[p]", "Eg[p | e0]", "Eg[p | e1]", "Eg[p | e2]"]
            .iter()
            .map(|s| s.to_string()),
    );
    debug_assert_eq!(cols.len(), MIN_COLUMNS);
    cols
}

fn synth_row(rng: &mut StdRng, round: i64, game: i64) -> Vec<String> {
    let mut row = vec![round.to_string(), game.to_string()];
    row.extend((2..19).map(|_| format!("{:.4}", rng.gen_range(0.0..1.0))));

    let weight: f64 = rng.gen_range(0.0..3.0);
    let home: f64 = rng.gen_range(-1.0..1.0);
    let away: f64 = rng.gen_range(-1.0..1.0);
    let draw: f64 = rng.gen_range(-1.0..1.0);
    // Unconditional estimate as a random mix of the conditional ones.
    let (a, b) = (rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0));
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    let p = lo * home + (hi - lo) * away + (1.0 - hi) * draw;

    for v in [weight, p, home, away, draw] {
        row.push(format!("{v:.6}"));
    }
    row
}
