use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::model::{Finding, Severity};

use super::FieldExtractor;

// -- SARIF 2.1.0 schema (subset) --

#[derive(Debug, Clone, Deserialize)]
struct RuleDef {
    id: Option<String>,
    name: Option<String>,
    #[serde(rename = "helpUri")]
    help_uri: Option<String>,
    #[serde(rename = "shortDescription")]
    short_description: Option<MessageText>,
    #[serde(rename = "fullDescription")]
    full_description: Option<MessageText>,
    properties: Option<RuleProperties>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RuleProperties {
    #[serde(rename = "security-severity")]
    security_severity: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct MessageText {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultEntry {
    #[serde(rename = "ruleId")]
    rule_id: Option<String>,
    message: Option<MessageText>,
    #[serde(default)]
    locations: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct LocationEntry {
    #[serde(rename = "physicalLocation")]
    physical_location: Option<PhysicalLocation>,
}

#[derive(Debug, Deserialize)]
struct PhysicalLocation {
    #[serde(rename = "artifactLocation")]
    artifact_location: Option<ArtifactLocation>,
    region: Option<Region>,
}

#[derive(Debug, Deserialize)]
struct ArtifactLocation {
    uri: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Region {
    #[serde(rename = "startLine")]
    start_line: Option<u32>,
    #[serde(rename = "startColumn")]
    start_column: Option<u32>,
    #[serde(rename = "endLine")]
    end_line: Option<u32>,
    #[serde(rename = "endColumn")]
    end_column: Option<u32>,
}

/// Walks a SARIF report and emits one raw [`Finding`] per usable
/// (result, location) pair.
///
/// Parsing is best-effort: a malformed rule, result, or location is
/// logged and skipped, and a missing or undecodable document yields an
/// empty list rather than an error. Rules, results, and locations are
/// deserialized element by element so one bad entry never poisons its
/// neighbors.
pub struct SarifIngestor<E> {
    extractor: E,
}

impl<E: FieldExtractor> SarifIngestor<E> {
    pub fn new(extractor: E) -> Self {
        Self { extractor }
    }

    /// Parses a SARIF report file. Missing file, unreadable content, or
    /// undecodable JSON yield an empty list.
    pub fn parse_file(&self, path: &Path) -> Vec<Finding> {
        if !path.exists() {
            warn!("SARIF report file does not exist: {}", path.display());
            return Vec::new();
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                error!("Error reading SARIF report file {}: {}", path.display(), err);
                return Vec::new();
            }
        };

        let document: Value = match serde_json::from_str(&content) {
            Ok(document) => document,
            Err(err) => {
                error!("Error parsing SARIF report file {}: {}", path.display(), err);
                return Vec::new();
            }
        };

        let findings = self.parse_document(&document);
        info!("Parsed {} raw findings from SARIF report", findings.len());
        findings
    }

    /// Parses an already-decoded SARIF document.
    pub fn parse_document(&self, document: &Value) -> Vec<Finding> {
        let mut findings = Vec::new();

        let runs = match document.get("runs").and_then(Value::as_array) {
            Some(runs) => runs,
            None => {
                warn!("No 'runs' array found in SARIF report");
                return findings;
            }
        };

        for run in runs {
            self.parse_run(run, &mut findings);
        }

        findings
    }

    fn parse_run(&self, run: &Value, findings: &mut Vec<Finding>) {
        let driver = match run.pointer("/tool/driver") {
            Some(driver) => driver,
            None => return,
        };

        let rules = parse_rules(driver);

        let results = match run.get("results").and_then(Value::as_array) {
            Some(results) => results,
            None => return,
        };

        for result in results {
            self.parse_result(result, &rules, findings);
        }
    }

    fn parse_result(
        &self,
        result: &Value,
        rules: &HashMap<String, RuleDef>,
        findings: &mut Vec<Finding>,
    ) {
        let entry: ResultEntry = match serde_json::from_value(result.clone()) {
            Ok(entry) => entry,
            Err(err) => {
                error!("Error parsing result: {}", err);
                return;
            }
        };

        let rule_id = entry.rule_id.unwrap_or_default();
        let rule = match rules.get(&rule_id) {
            Some(rule) => rule,
            None => {
                warn!("Rule not found for ruleId: {}", rule_id);
                return;
            }
        };

        let message = entry
            .message
            .and_then(|m| m.text)
            .unwrap_or_default();
        let severity = resolve_severity(rule);

        if entry.locations.is_empty() {
            // No location information at all: one finding with defaults.
            findings.push(self.build_finding(&rule_id, rule, &message, severity, None, None));
            return;
        }

        for location in &entry.locations {
            let location: LocationEntry = match serde_json::from_value(location.clone()) {
                Ok(location) => location,
                Err(err) => {
                    debug!("Skipping malformed location: {}", err);
                    continue;
                }
            };

            let physical = match location.physical_location {
                Some(physical) => physical,
                None => continue,
            };

            let file_path = physical
                .artifact_location
                .and_then(|a| a.uri);

            findings.push(self.build_finding(
                &rule_id,
                rule,
                &message,
                severity,
                file_path,
                physical.region.as_ref(),
            ));
        }
    }

    fn build_finding(
        &self,
        rule_id: &str,
        rule: &RuleDef,
        message: &str,
        severity: Severity,
        file_path: Option<String>,
        region: Option<&Region>,
    ) -> Finding {
        let fields = self.extractor.extract(message);

        let mut links = Vec::new();
        if let Some(link) = fields.link {
            links.push(link);
        }

        // Region fields default individually; end positions inherit the
        // start positions when absent.
        let default_region = Region::default();
        let region = region.unwrap_or(&default_region);
        let start_line = region.start_line.unwrap_or(1);
        let start_column = region.start_column.unwrap_or(1);
        let end_line = region.end_line.unwrap_or(start_line);
        let end_column = region.end_column.unwrap_or(start_column);

        Finding {
            rule_id: rule_id.to_string(),
            rule_name: rule.name.clone().unwrap_or_default(),
            severity,
            message: message.to_string(),
            help_uri: rule.help_uri.clone().unwrap_or_default(),
            description: rule_description(rule),
            file_path: file_path.unwrap_or_default(),
            start_line,
            start_column,
            end_line,
            end_column,
            package_name: fields.package_name,
            installed_version: fields.installed_version,
            fixed_version: fields.fixed_version,
            links,
        }
    }
}

/// Builds the rule lookup table for one run, keyed by rule id. Entries
/// without an id, and malformed entries, are skipped.
fn parse_rules(driver: &Value) -> HashMap<String, RuleDef> {
    let mut rules = HashMap::new();

    let entries = match driver.get("rules").and_then(Value::as_array) {
        Some(entries) => entries,
        None => return rules,
    };

    for entry in entries {
        let rule: RuleDef = match serde_json::from_value(entry.clone()) {
            Ok(rule) => rule,
            Err(err) => {
                debug!("Skipping malformed rule: {}", err);
                continue;
            }
        };
        if let Some(id) = rule.id.clone() {
            rules.insert(id, rule);
        }
    }

    rules
}

fn rule_description(rule: &RuleDef) -> String {
    rule.full_description
        .as_ref()
        .and_then(|d| d.text.clone())
        .or_else(|| {
            rule.short_description
                .as_ref()
                .and_then(|d| d.text.clone())
        })
        .unwrap_or_default()
}

/// Resolves a rule's severity tier.
///
/// `properties.security-severity` takes priority when it carries a
/// numeric value (Trivy emits it as a string, some tools as a number):
/// >= 9.0 critical, >= 7.0 high, >= 4.0 medium, else low. Otherwise the
/// first rule tag exactly matching CRITICAL/HIGH/MEDIUM/LOW decides.
/// With neither source, the tier defaults to high.
fn resolve_severity(rule: &RuleDef) -> Severity {
    if let Some(score) = rule
        .properties
        .as_ref()
        .and_then(|p| p.security_severity.as_ref())
        .and_then(numeric_value)
    {
        return if score >= 9.0 {
            Severity::Critical
        } else if score >= 7.0 {
            Severity::High
        } else if score >= 4.0 {
            Severity::Medium
        } else {
            Severity::Low
        };
    }

    for tag in &rule.tags {
        match tag.as_str() {
            "CRITICAL" => return Severity::Critical,
            "HIGH" => return Severity::High,
            "MEDIUM" => return Severity::Medium,
            "LOW" => return Severity::Low,
            _ => {}
        }
    }

    Severity::High
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(num) => num.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
