use std::fs;
use std::path::PathBuf;

use approx::assert_abs_diff_eq;

use ev_survival::aggregate::aggregate;
use ev_survival::config::ReportConfig;
use ev_survival::model::{Axis, EventKey, Sample};
use ev_survival::report::{build_report, build_report_from_table};
use ev_survival::report_export::write_json;
use ev_survival::table_parse::parse_table;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn fixture_report(cfg: &ReportConfig) -> ev_survival::report::Report {
    let table = parse_table(&read_fixture("sample_table.csv"), ',');
    build_report_from_table(&table, cfg)
}

fn synthetic_samples() -> Vec<Sample> {
    let mut out = Vec::new();
    for round in 1..=4 {
        for game in 1..=5 {
            for i in 0..9 {
                let t = (round * 31 + game * 7 + i * 13) as f64;
                out.push(Sample {
                    round,
                    game,
                    weight: 0.1 + (t * 0.37).fract() * 3.0,
                    p: (t * 0.11).sin(),
                    p_home: (t * 0.23).cos(),
                    p_away: (t * 0.05).sin() * 0.8,
                    p_draw: (t * 0.71).fract() - 0.5,
                });
            }
        }
    }
    out
}

#[test]
fn fixture_keys_are_ordered_and_degenerate_keys_skipped() {
    let report = fixture_report(&ReportConfig::default());
    let keys: Vec<EventKey> = report.keys.iter().map(|k| k.key).collect();
    assert_eq!(
        keys,
        vec![EventKey::new(1, 1), EventKey::new(1, 2), EventKey::new(10, 1)]
    );
    assert!(report.key(EventKey::new(2, 1)).is_none());
    assert_eq!(report.dropped_rows, 2);
}

#[test]
fn fixture_key_statistics() {
    let report = fixture_report(&ReportConfig::default());
    let key = report.key(EventKey::new(1, 1)).expect("key 1/1");
    assert_eq!(key.sample_count, 2);
    assert_abs_diff_eq!(key.total_weight, 3.0, epsilon = 1e-12);

    let p = key.axis(Axis::P);
    assert_abs_diff_eq!(p.average, 0.6, epsilon = 1e-12);
    assert_abs_diff_eq!(p.base.fs, 0.6, epsilon = 1e-12);
    assert_abs_diff_eq!(p.base.fc, 1.0, epsilon = 1e-12);
    assert_eq!(p.points.len(), 2);
    assert_eq!(p.curve.points[0].x, 0.8);
    assert_abs_diff_eq!(p.histogram.total_mass(), 1.0, epsilon = 1e-9);

    let shifted = p.thresholds(0.5);
    assert_abs_diff_eq!(shifted.fc, 2.0 / 3.0, epsilon = 1e-12);
    assert_abs_diff_eq!(shifted.fs, 0.2, epsilon = 1e-12);
    assert_abs_diff_eq!(p.shifted_average(0.5), 0.1, epsilon = 1e-12);

    let draw = key.axis(Axis::Draw);
    assert_abs_diff_eq!(draw.average, (2.0 * 0.1 - 0.3) / 3.0, epsilon = 1e-12);
}

#[test]
fn cross_key_summary_names_extremes() {
    let report = fixture_report(&ReportConfig::default());
    let summary = report.summary;
    assert_eq!(summary.axis, Axis::P);
    assert_eq!(summary.keys, 3);

    let fs = summary.fs.expect("fs range");
    assert_eq!(fs.min.key, EventKey::new(1, 2));
    assert_abs_diff_eq!(fs.min.value, 0.25, epsilon = 1e-12);
    assert_eq!(fs.max.key, EventKey::new(1, 1));
    assert_abs_diff_eq!(fs.max.value, 0.6, epsilon = 1e-12);
    assert_abs_diff_eq!(fs.mean, (0.6 + 0.25 + 0.3) / 3.0, epsilon = 1e-12);

    let fc = summary.fc.expect("fc range");
    assert_eq!(fc.min.key, EventKey::new(1, 2));
    assert_abs_diff_eq!(fc.min.value, 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(fc.max.value, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(fc.mean, 2.5 / 3.0, epsilon = 1e-12);

    assert_abs_diff_eq!(summary.relative_position(0.6).unwrap(), 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(summary.relative_position(0.25).unwrap(), 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(
        summary.relative_position(0.3).unwrap(),
        0.05 / 0.35,
        epsilon = 1e-12
    );
}

#[test]
fn ranking_axis_drives_the_summary() {
    let cfg = ReportConfig {
        ranking_axis: Axis::Away,
        ..ReportConfig::default()
    };
    let report = fixture_report(&cfg);
    assert_eq!(report.summary.axis, Axis::Away);
    // Away values: 1/1 -> {-0.2 (2/3), 0.4 (1/3)}, 1/2 -> {0.0, 0.2}, 10/1 -> {0.3}.
    let fs = report.summary.fs.expect("fs range");
    assert_eq!(fs.min.key, EventKey::new(1, 2));
    assert_abs_diff_eq!(fs.min.value, 0.1, epsilon = 1e-12);
    assert_eq!(fs.max.key, EventKey::new(10, 1));
}

#[test]
fn offset_summary_is_recomputed_from_raw_points() {
    let cfg = ReportConfig {
        offset: 0.5,
        ..ReportConfig::default()
    };
    let report = fixture_report(&cfg);
    let shifted = report.offset_summary.expect("offset summary");
    assert_eq!(shifted, report.summary_at(0.5));
    assert_eq!(report.summary, report.summary_at(0.0));

    let fc = shifted.fc.expect("fc range");
    // 1/1 keeps its 0.8 sample, 1/2 its 0.5 sample on the threshold, 10/1 nothing.
    assert_abs_diff_eq!(fc.max.value, 2.0 / 3.0, epsilon = 1e-12);
    assert_eq!(fc.max.key, EventKey::new(1, 1));
    assert_eq!(fc.min.key, EventKey::new(10, 1));
    assert_eq!(fc.min.value, 0.0);

    let per_key = report.thresholds_at(Axis::P, 0.5);
    assert_eq!(per_key.len(), 3);
    assert_abs_diff_eq!(per_key[0].1.fs, 0.2, epsilon = 1e-12);

    assert!(fixture_report(&ReportConfig::default()).offset_summary.is_none());
}

#[test]
fn empty_input_gives_empty_report() {
    let table = parse_table("header\n1,1,3\n", ',');
    let report = build_report_from_table(&table, &ReportConfig::default());
    assert!(report.is_empty());
    assert_eq!(report.dropped_rows, 1);
    assert_eq!(report.summary.keys, 0);
    assert!(report.summary.fs.is_none());
    assert!(report.summary.fc.is_none());
    assert!(report.summary.relative_position(0.5).is_none());
}

#[test]
fn all_zero_weight_input_gives_empty_report() {
    let samples = vec![Sample {
        round: 1,
        game: 1,
        weight: 0.0,
        p: 0.4,
        p_home: 0.4,
        p_away: 0.4,
        p_draw: 0.4,
    }];
    let report = build_report(&aggregate(&samples), &ReportConfig::default());
    assert!(report.is_empty());
    assert!(report.summary.fs.is_none());
}

#[test]
fn parallel_assembly_matches_sequential() {
    let agg = aggregate(&synthetic_samples());
    let sequential = build_report(&agg, &ReportConfig::default());
    let parallel = build_report(
        &agg,
        &ReportConfig {
            parallelism: 4,
            ..ReportConfig::default()
        },
    );
    assert_eq!(sequential.keys.len(), 20);
    assert_eq!(
        serde_json::to_value(&sequential.keys).unwrap(),
        serde_json::to_value(&parallel.keys).unwrap()
    );
    assert_eq!(sequential.summary, parallel.summary);
}

#[test]
fn every_key_conserves_mass_and_bounds() {
    let report = build_report(&aggregate(&synthetic_samples()), &ReportConfig::default());
    for key in &report.keys {
        for (_, ax) in key.axes.iter() {
            let point_mass: f64 = ax.points.iter().map(|p| p.y).sum();
            assert_abs_diff_eq!(ax.histogram.total_mass(), point_mass, epsilon = 1e-9);
            assert_abs_diff_eq!(ax.curve.total_mass(), point_mass, epsilon = 1e-9);
            assert!(ax.base.fs <= ax.base.fc + 1e-12);
            assert!((0.0..=1.0 + 1e-12).contains(&ax.base.fc));
        }
    }
}

#[test]
fn json_artifact_is_written() {
    let report = fixture_report(&ReportConfig::default());
    let dir = std::env::temp_dir().join(format!("ev_survival_test_{}", std::process::id()));
    let path = dir.join("report.json");
    write_json(&report, &path).expect("report should be written");

    let raw = fs::read_to_string(&path).expect("report should be readable");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(value["keys"].as_array().map(|k| k.len()), Some(3));
    assert_eq!(value["keys"][0]["key"]["round"], 1);
    assert_eq!(
        value["keys"][0]["axes"]["p"]["histogram"]["buckets"]
            .as_array()
            .map(|b| b.len()),
        Some(41)
    );
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn huge_axis_value_in_table_still_reports() {
    let header: Vec<String> = (0..24).map(|i| format!("c{i}")).collect();
    let mut row = vec!["1".to_string(), "1".to_string()];
    row.extend(std::iter::repeat_n("0".to_string(), 17));
    row.extend(["1", "1e18", "0.2", "-1e18", "0"].map(String::from));
    let raw = format!("{}\n{}\n", header.join(","), row.join(","));

    let table = parse_table(&raw, ',');
    assert_eq!(table.samples.len(), 1);
    let report = build_report_from_table(&table, &ReportConfig::default());
    let key = report.key(EventKey::new(1, 1)).expect("key reported");

    let p = key.axis(Axis::P);
    assert_eq!(p.histogram.clipped, 1);
    assert_abs_diff_eq!(p.histogram.buckets[40].mass, 1.0, epsilon = 1e-12);
    let away = key.axis(Axis::Away);
    assert_abs_diff_eq!(away.histogram.buckets[0].mass, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(p.base.fs, 1.0, epsilon = 1e-12);
}
