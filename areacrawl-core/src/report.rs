// Report generation from database

use crate::data::{CrawlRun, Database, RunStatus};
use crate::error::{CoreError, Result};
use chrono::{TimeZone, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelCount {
    pub level: i64,
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub run: CrawlRun,
    pub total_areas: i64,
    pub levels: Vec<LevelCount>,
}

pub fn level_label(level: i64) -> String {
    match level {
        0 => "country".to_string(),
        1 => "province".to_string(),
        2 => "city".to_string(),
        3 => "county".to_string(),
        n => format!("level {}", n),
    }
}

/// Collects the report for `run_id`, or for the most recent run when `None`.
pub fn gather_report_data(db: &Database, run_id: Option<&str>) -> Result<ReportData> {
    let run = match run_id {
        Some(id) => db.get_run(id)?,
        None => db.latest_run()?,
    }
    .ok_or_else(|| CoreError::UnknownRun(run_id.unwrap_or("latest").to_string()))?;

    let total_areas = db.count_areas_for_run(&run.id)?;
    let levels = db
        .count_areas_by_level(Some(&run.id))?
        .into_iter()
        .map(|(level, count)| LevelCount {
            level,
            label: level_label(level),
            count,
        })
        .collect();

    Ok(ReportData {
        run,
        total_areas,
        levels,
    })
}

fn format_timestamp(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn status_to_string(status: &str) -> String {
    match RunStatus::parse(status) {
        Some(RunStatus::Completed) => status.green().to_string(),
        Some(RunStatus::Failed) => status.red().to_string(),
        Some(RunStatus::Running) => status.yellow().to_string(),
        None => status.to_string(),
    }
}

pub fn generate_text_report(data: &ReportData) -> String {
    let mut report = String::new();

    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    report.push_str("                 AREA CRAWL REPORT\n");
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    report.push_str(&format!("Run ID:       {}\n", data.run.id));
    report.push_str(&format!("Status:       {}\n", status_to_string(&data.run.status)));
    report.push_str(&format!("Root parent:  {}\n", data.run.root_id));
    report.push_str(&format!("Started:      {}\n", format_timestamp(data.run.start_time)));
    if let Some(end_time) = data.run.end_time {
        report.push_str(&format!(
            "Duration:     {} seconds\n",
            end_time - data.run.start_time
        ));
    }
    report.push_str(&format!("Areas saved:  {}\n\n", data.total_areas));

    if !data.levels.is_empty() {
        report.push_str("# Areas by level:\n");
        for level in &data.levels {
            report.push_str(&format!("  {:<10} {}\n", level.label, level.count));
        }
        report.push('\n');
    }

    if let Some(ref stats) = data.run.stats {
        report.push_str("# Traversal:\n");
        report.push_str(&format!("  Pages fetched:       {}\n", stats.pages_fetched));
        report.push_str(&format!("  Empty pages:         {}\n", stats.empty_pages));
        report.push_str(&format!("  Undecodable pages:   {}\n", stats.undecodable_pages));
        report.push_str(&format!("  Records seen:        {}\n", stats.records_seen));
        report.push_str(&format!("  Save failures:       {}\n", stats.persist_failures));
        report.push_str(&format!("  Duplicates skipped:  {}\n", stats.duplicates_skipped));
        report.push_str(&format!("  Deepest level:       {}\n", stats.max_depth));
        report.push('\n');
    }

    if let Some(ref error) = data.run.error {
        report.push_str(&format!("Stopped early: {}\n", error));
    }

    report
}

pub fn generate_json_report(data: &ReportData) -> Result<String> {
    Ok(serde_json::to_string_pretty(data)?)
}

pub fn generate_report(data: &ReportData, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(data)),
        ReportFormat::Json => generate_json_report(data),
    }
}
