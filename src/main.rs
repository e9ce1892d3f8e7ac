use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use ev_survival::config::{self, ReportConfig};
use ev_survival::report::{self, CrossKeySummary, Report};
use ev_survival::{report_export, table_parse};

/// Weighted histograms, survival curves and FS/FC rankings for a table of
/// per-event probability samples.
#[derive(Parser, Debug)]
#[command(name = "ev_survival", version, about)]
struct Cli {
    /// Source table; the first line is a header.
    #[arg(default_value = "output.csv")]
    input: PathBuf,

    /// Directory the report artifacts are written to
    #[arg(long, env = "EV_OUT_DIR", default_value = "visualizations")]
    out_dir: PathBuf,

    #[arg(long)]
    bucket_width: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    domain_min: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    domain_max: Option<f64>,

    /// Threshold offset x0; anything non-numeric means 0
    #[arg(long, allow_hyphen_values = true)]
    offset: Option<String>,

    /// Axis the overview ranks on (p|pH|pA|pD)
    #[arg(long)]
    axis: Option<String>,

    /// Column delimiter (single character, or "tab")
    #[arg(long)]
    delimiter: Option<String>,

    /// Worker threads for per-key assembly
    #[arg(long)]
    parallelism: Option<usize>,

    /// Extra offsets to print the cross-key summary for (repeatable)
    #[arg(long = "query", allow_hyphen_values = true)]
    queries: Vec<String>,

    /// Also write an .xlsx workbook
    #[arg(long)]
    xlsx: bool,

    /// Skip writing report.json
    #[arg(long)]
    no_json: bool,
}

impl Cli {
    fn report_config(&self) -> ReportConfig {
        let mut cfg = ReportConfig::from_env();
        if let Some(v) = self.bucket_width {
            cfg.bucket_width = v;
        }
        if let Some(v) = self.domain_min {
            cfg.domain_min = v;
        }
        if let Some(v) = self.domain_max {
            cfg.domain_max = v;
        }
        if let Some(raw) = &self.offset {
            cfg.offset = config::parse_offset(raw);
        }
        if let Some(raw) = &self.axis {
            cfg.ranking_axis = config::parse_axis(raw);
        }
        if let Some(raw) = &self.delimiter {
            cfg.delimiter = config::parse_delimiter(raw);
        }
        if let Some(v) = self.parallelism {
            cfg.parallelism = v.clamp(1, config::MAX_PARALLELISM);
        }
        cfg
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = cli.report_config();

    let table = table_parse::load_table(&cli.input, cfg.delimiter)?;
    if table.is_empty() {
        warn!(path = %cli.input.display(), "no usable rows, report will be empty");
    }
    let report = report::build_report_from_table(&table, &cfg);

    if !cli.no_json {
        let path = cli.out_dir.join("report.json");
        report_export::write_json(&report, &path)?;
        info!(path = %path.display(), "wrote report");
    }
    if cli.xlsx {
        let path = cli.out_dir.join("report.xlsx");
        let summary = report_export::write_xlsx(&report, &path)?;
        info!(
            path = %path.display(),
            keys = summary.keys,
            histogram_rows = summary.histogram_rows,
            curve_rows = summary.curve_rows,
            "wrote workbook"
        );
    }

    print_keys(&report);
    print_summary(&report.summary);
    if let Some(shifted) = &report.offset_summary {
        print_summary(shifted);
    }
    for raw in &cli.queries {
        print_summary(&report.summary_at(config::parse_offset(raw)));
    }

    Ok(())
}

fn print_keys(report: &Report) {
    println!(
        "{:>6} {:>6} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "round", "game", "samples", "avg", "FS", "FC", "rank"
    );
    let current = report.summary_at(report.offset);
    for key in &report.keys {
        let ax = key.axis(report.ranking_axis);
        let stats = ax.thresholds(report.offset);
        let rank = current
            .relative_position(stats.fs)
            .map_or_else(|| "-".to_string(), |v| format!("{v:.3}"));
        println!(
            "{:>6} {:>6} {:>8} {:>8.3} {:>8.3} {:>8.3} {:>8}",
            key.key.round,
            key.key.game,
            key.sample_count,
            ax.shifted_average(report.offset),
            stats.fs,
            stats.fc,
            rank
        );
    }
    if report.dropped_rows > 0 {
        println!("dropped rows: {}", report.dropped_rows);
    }
}

fn print_summary(summary: &CrossKeySummary) {
    println!(
        "axis {} offset {:.3}: {} keys",
        summary.axis.label(),
        summary.offset,
        summary.keys
    );
    for (label, range) in [("FS", summary.fs), ("FC", summary.fc)] {
        let Some(range) = range else {
            println!("  {label}: n/a");
            continue;
        };
        println!(
            "  {label}: min {:.3} ({}) max {:.3} ({}) mean {:.3}",
            range.min.value, range.min.key, range.max.value, range.max.key, range.mean
        );
    }
}
