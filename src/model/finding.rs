use serde::{Deserialize, Serialize};

/// Severity tier of a finding.
///
/// The four tiers form a total order (`Critical` > `High` > `Medium` >
/// `Low`) which the arbitration engine uses to break fixed-version ties.
/// Inputs that resolve to no tier default to [`Severity::High`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Upper-case form used in comment text (`"| Severity: HIGH"`).
    pub fn as_upper_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::High
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            _ => Err(format!(
                "Unknown severity: {}. Use 'critical', 'high', 'medium', or 'low'",
                s
            )),
        }
    }
}

/// One reconciled vulnerability record.
///
/// Raw findings are produced by the report ingestor, one per
/// (result, location) pair; the arbitration engine then collapses raw
/// findings that share a package identity into a single canonical entry.
/// Absent string fields are empty strings, never `None` — downstream
/// matching and key building rely on that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub rule_id: String,
    pub rule_name: String,
    pub severity: Severity,
    /// Original free-text message body, retained for traceability.
    pub message: String,
    pub help_uri: String,
    pub description: String,
    pub file_path: String,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub package_name: String,
    pub installed_version: String,
    pub fixed_version: String,
    /// Reference URLs in insertion order, duplicate-free.
    pub links: Vec<String>,
}

impl Finding {
    /// Adds a reference link, preserving insertion order and skipping
    /// duplicates.
    pub fn push_link(&mut self, link: impl Into<String>) {
        let link = link.into();
        if !self.links.contains(&link) {
            self.links.push(link);
        }
    }
}

impl Default for Finding {
    fn default() -> Self {
        Self {
            rule_id: String::new(),
            rule_name: String::new(),
            severity: Severity::default(),
            message: String::new(),
            help_uri: String::new(),
            description: String::new(),
            file_path: String::new(),
            start_line: 1,
            start_column: 1,
            end_line: 1,
            end_column: 1,
            package_name: String::new(),
            installed_version: String::new(),
            fixed_version: String::new(),
            links: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_severity_default_is_high() {
        assert_eq!(Severity::default(), Severity::High);
    }

    #[test]
    fn test_severity_round_trip() {
        for sev in [
            Severity::Critical,
            Severity::High,
            Severity::Medium,
            Severity::Low,
        ] {
            assert_eq!(sev.as_str().parse::<Severity>(), Ok(sev));
        }
        assert!("bogus".parse::<Severity>().is_err());
    }

    #[test]
    fn test_push_link_deduplicates() {
        let mut finding = Finding::default();
        finding.push_link("https://example.com/a");
        finding.push_link("https://example.com/b");
        finding.push_link("https://example.com/a");
        assert_eq!(
            finding.links,
            vec!["https://example.com/a", "https://example.com/b"]
        );
    }

    #[test]
    fn test_default_location_fields() {
        let finding = Finding::default();
        assert_eq!(
            (
                finding.start_line,
                finding.start_column,
                finding.end_line,
                finding.end_column
            ),
            (1, 1, 1, 1)
        );
    }
}
