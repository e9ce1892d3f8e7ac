use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::model::Axis;
use crate::report::{CrossKeySummary, Report};

pub struct ExportSummary {
    pub keys: usize,
    pub histogram_rows: usize,
    pub curve_rows: usize,
}

pub fn write_json(report: &Report, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating {}", parent.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(report).context("serialize report")?;
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}

pub fn write_xlsx(report: &Report, path: &Path) -> Result<ExportSummary> {
    let summary_rows = summary_rows(report);
    let histogram_rows = histogram_rows(report);
    let curve_rows = curve_rows(report);
    let overview_rows = overview_rows(report);

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary")?;
        write_rows(sheet, &summary_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Overview")?;
        write_rows(sheet, &overview_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Histograms")?;
        write_rows(sheet, &histogram_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Survival")?;
        write_rows(sheet, &curve_rows)?;
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating {}", parent.display()))?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportSummary {
        keys: report.keys.len(),
        histogram_rows: histogram_rows.len().saturating_sub(1),
        curve_rows: curve_rows.len().saturating_sub(1),
    })
}

fn summary_rows(report: &Report) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Round".to_string(),
        "Game".to_string(),
        "Samples".to_string(),
        "Total Weight".to_string(),
        "Avg P(S)".to_string(),
        "Avg P(S|H)".to_string(),
        "Avg P(S|A)".to_string(),
        "Avg P(S|D)".to_string(),
        "FS(0)".to_string(),
        "FC(0)".to_string(),
        "Rank Position".to_string(),
    ]];
    for key in &report.keys {
        let ranked = key.axis(report.ranking_axis);
        let mut row = vec![
            key.key.round.to_string(),
            key.key.game.to_string(),
            key.sample_count.to_string(),
            fmt_num(key.total_weight),
        ];
        row.extend(Axis::ALL.iter().map(|axis| fmt_num(key.axis(*axis).average)));
        row.push(fmt_num(ranked.base.fs));
        row.push(fmt_num(ranked.base.fc));
        row.push(
            report
                .summary
                .relative_position(ranked.base.fs)
                .map(fmt_num)
                .unwrap_or_default(),
        );
        rows.push(row);
    }
    rows
}

fn overview_rows(report: &Report) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Offset".to_string(),
        "Axis".to_string(),
        "Stat".to_string(),
        "Min".to_string(),
        "Min Key".to_string(),
        "Max".to_string(),
        "Max Key".to_string(),
        "Mean".to_string(),
    ]];
    push_overview(&mut rows, &report.summary);
    if let Some(shifted) = &report.offset_summary {
        push_overview(&mut rows, shifted);
    }
    rows
}

fn push_overview(rows: &mut Vec<Vec<String>>, summary: &CrossKeySummary) {
    for (label, range) in [("FS", summary.fs), ("FC", summary.fc)] {
        let Some(range) = range else { continue };
        rows.push(vec![
            fmt_num(summary.offset),
            summary.axis.label().to_string(),
            label.to_string(),
            fmt_num(range.min.value),
            range.min.key.to_string(),
            fmt_num(range.max.value),
            range.max.key.to_string(),
            fmt_num(range.mean),
        ]);
    }
}

fn histogram_rows(report: &Report) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Round".to_string(),
        "Game".to_string(),
        "Axis".to_string(),
        "Bucket".to_string(),
        "Mass".to_string(),
        "Count".to_string(),
    ]];
    for key in &report.keys {
        for (axis, ax) in key.axes.iter() {
            for bucket in &ax.histogram.buckets {
                rows.push(vec![
                    key.key.round.to_string(),
                    key.key.game.to_string(),
                    axis.label().to_string(),
                    format!("{:.2}", bucket.left_edge),
                    fmt_num(bucket.mass),
                    bucket.count.to_string(),
                ]);
            }
        }
    }
    rows
}

fn curve_rows(report: &Report) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Round".to_string(),
        "Game".to_string(),
        "Axis".to_string(),
        "X".to_string(),
        "Cumulative".to_string(),
    ]];
    for key in &report.keys {
        for (axis, ax) in key.axes.iter() {
            for pt in &ax.curve.points {
                rows.push(vec![
                    key.key.round.to_string(),
                    key.key.game.to_string(),
                    axis.label().to_string(),
                    fmt_num(pt.x),
                    fmt_num(pt.cumulative),
                ]);
            }
        }
    }
    rows
}

fn fmt_num(v: f64) -> String {
    format!("{v:.6}")
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
