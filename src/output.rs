use crate::error::Result;
use crate::reports::Dashboard;
use crate::types::{
    AnomalyRow, AnomalyTableRow, BreakdownRow, BreakdownTableRow, DashboardSummary,
    HouseholdRecord, OverviewTableRow, ScoreRow, ScoreTableRow, ANOMALY_COLUMNS,
    INSIGHT_COLUMNS, SCORE_COLUMNS,
};
use crate::util::format_number;
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

pub const INSIGHTS_FILE: &str = "household_insights.csv";
pub const ANOMALIES_FILE: &str = "anomalies.csv";
pub const TOP_FILE: &str = "top_efficient.csv";
pub const BOTTOM_FILE: &str = "least_efficient.csv";
pub const RECOMMENDATIONS_FILE: &str = "recommendations.txt";
pub const SUMMARY_FILE: &str = "summary.json";

/// Write `header` then one line per row. The header is written even when
/// `rows` is empty, so every export keeps its schema.
pub fn write_csv<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    wtr.write_record(header)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn write_text(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

pub fn overview_rows(records: &[HouseholdRecord]) -> Vec<OverviewTableRow> {
    records
        .iter()
        .map(|r| OverviewTableRow {
            household_id: r.household_id.clone(),
            region: r.region.clone(),
            income: format_number(r.monthly_income_inr, 0),
            energy: format_number(r.monthly_energy_kwh, 2),
            appliances: r.total_appliances(),
            ev_charging: r.ev_charging,
        })
        .collect()
}

pub fn breakdown_rows(rows: &[BreakdownRow]) -> Vec<BreakdownTableRow> {
    rows.iter()
        .map(|r| BreakdownTableRow {
            count: r.count,
            households: r.households,
            mean_kwh: format_number(r.mean_kwh, 2),
        })
        .collect()
}

pub fn anomaly_rows(rows: &[AnomalyRow]) -> Vec<AnomalyTableRow> {
    rows.iter()
        .map(|r| AnomalyTableRow {
            household_id: r.household_id.clone(),
            energy: format_number(r.energy_kwh, 2),
            z_score: format!("{:.3}", r.z_score),
            anomaly: r.anomaly_label().to_string(),
        })
        .collect()
}

pub fn score_rows(rows: &[ScoreRow]) -> Vec<ScoreTableRow> {
    rows.iter()
        .map(|r| ScoreTableRow {
            household_id: r.household_id.clone(),
            score: format!("{:.2}", r.score),
        })
        .collect()
}

/// Files written by [`export_dashboard`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub written: Vec<PathBuf>,
}

/// Write every dashboard artifact into `out_dir`. The recommendations file is
/// only produced when at least one household qualifies.
pub fn export_dashboard(dashboard: &Dashboard, out_dir: &Path) -> Result<ExportReport> {
    std::fs::create_dir_all(out_dir)?;
    let mut written = Vec::new();

    let path = out_dir.join(INSIGHTS_FILE);
    write_csv(&path, &INSIGHT_COLUMNS, &dashboard.insights)?;
    written.push(path);

    let path = out_dir.join(ANOMALIES_FILE);
    write_csv(&path, &ANOMALY_COLUMNS, &dashboard.anomalies.anomalies())?;
    written.push(path);

    let path = out_dir.join(TOP_FILE);
    write_csv(&path, &SCORE_COLUMNS, &dashboard.scores.top)?;
    written.push(path);

    let path = out_dir.join(BOTTOM_FILE);
    write_csv(&path, &SCORE_COLUMNS, &dashboard.scores.bottom)?;
    written.push(path);

    if dashboard.recommendations.is_empty() {
        tracing::info!("no household qualifies for a recommendation, skipping export");
    } else {
        let path = out_dir.join(RECOMMENDATIONS_FILE);
        write_text(&path, &dashboard.recommendations.join("\n"))?;
        written.push(path);
    }

    let summary = DashboardSummary {
        region: dashboard.region.to_string(),
        households: dashboard.aggregates.households,
        avg_energy_kwh: dashboard.aggregates.mean_kwh,
        total_energy_kwh: dashboard.aggregates.total_kwh,
        anomalies: dashboard.anomalies.count(),
        recommendations: dashboard.recommendations.len(),
        generated_at: Utc::now(),
    };
    let path = out_dir.join(SUMMARY_FILE);
    write_json(&path, &summary)?;
    written.push(path);

    tracing::info!(files = written.len(), dir = %out_dir.display(), "dashboard exported");
    Ok(ExportReport { written })
}
