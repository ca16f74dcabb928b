//! Rendering of canonical findings for the terminal or a file.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::model::{Finding, Severity};

/// Output format for the findings report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    Table,
    /// JSON format for programmatic use
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use 'table' or 'json'", s)),
        }
    }
}

/// The canonical findings of one report plus summary counts.
#[derive(Debug, Serialize)]
pub struct FindingsReport {
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub findings: Vec<Finding>,
}

impl FindingsReport {
    pub fn new(findings: Vec<Finding>) -> Self {
        let count = |tier| findings.iter().filter(|f| f.severity == tier).count();
        let (critical, high, medium, low) = (
            count(Severity::Critical),
            count(Severity::High),
            count(Severity::Medium),
            count(Severity::Low),
        );
        Self {
            generated_at: Utc::now(),
            total: findings.len(),
            critical,
            high,
            medium,
            low,
            findings,
        }
    }

    /// Worst severity present, if any findings survived.
    pub fn worst_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }
}

#[derive(Tabled)]
struct FindingRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Installed")]
    installed: String,
    #[tabled(rename = "Fixed In")]
    fixed_in: String,
    #[tabled(rename = "Rule")]
    rule: String,
    #[tabled(rename = "File")]
    file: String,
}

impl From<&Finding> for FindingRow {
    fn from(finding: &Finding) -> Self {
        Self {
            severity: finding.severity.as_upper_str().to_string(),
            package: placeholder(&finding.package_name),
            installed: placeholder(&finding.installed_version),
            fixed_in: placeholder(&finding.fixed_version),
            rule: finding.rule_id.clone(),
            file: placeholder(&finding.file_path),
        }
    }
}

fn placeholder(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

pub fn print_report(report: &FindingsReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_table(report),
        OutputFormat::Json => print_json(report),
    }
}

/// Format report to string for file output.
pub fn format_report_to_string(report: &FindingsReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Table => Ok(render_table(report)),
    }
}

fn print_table(report: &FindingsReport) -> Result<()> {
    println!("{}", render_table(report));
    Ok(())
}

fn render_table(report: &FindingsReport) -> String {
    if report.findings.is_empty() {
        return "No vulnerabilities found.".to_string();
    }

    let rows: Vec<FindingRow> = report.findings.iter().map(FindingRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());

    format!(
        "{}\n\n{} findings: {} critical, {} high, {} medium, {} low",
        table, report.total, report.critical, report.high, report.medium, report.low
    )
}

fn print_json(report: &FindingsReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{}", json);
    Ok(())
}
