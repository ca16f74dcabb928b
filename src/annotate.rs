//! The comment phase: match canonical findings to tracked issues and
//! post vulnerability-link comments.
//!
//! Findings are processed strictly sequentially: one issue search per
//! finding, then one comment post per matching issue. A failure while
//! processing one finding is logged and never aborts the rest. The whole
//! phase starts with a one-time settle delay because a freshly-analyzed
//! report is not immediately queryable on the server; finding no matching
//! issue afterwards is a normal outcome, not an error.

use std::time::Duration;

use anyhow::Context;
use tracing::{debug, error, info, warn};

use crate::comment::{create_comment_text, LINK_MARKER};
use crate::model::{Finding, Severity};
use crate::tracker::{Issue, IssueTracker};

#[derive(Debug, Clone)]
pub struct AnnotateOptions {
    /// Rule repository the tracker files vulnerability issues under;
    /// combined with the severity into rule keys like `trivy:high`.
    pub rule_repository: String,
    /// One-time delay before the first search, to let the server settle.
    pub settle_delay: Duration,
    /// Synthesize and log comments without posting them.
    pub dry_run: bool,
}

impl Default for AnnotateOptions {
    fn default() -> Self {
        Self {
            rule_repository: "trivy".to_string(),
            settle_delay: Duration::from_secs(5),
            dry_run: false,
        }
    }
}

/// Outcome counters for one annotation run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AnnotateSummary {
    pub findings: usize,
    pub matched_issues: usize,
    pub comments_posted: usize,
    pub skipped_existing: usize,
}

/// Runs the comment phase over the canonical findings.
pub async fn annotate_findings(
    findings: &[Finding],
    tracker: &dyn IssueTracker,
    options: &AnnotateOptions,
) -> AnnotateSummary {
    let mut summary = AnnotateSummary {
        findings: findings.len(),
        ..AnnotateSummary::default()
    };

    if findings.is_empty() {
        info!("No findings, skipping comment phase");
        return summary;
    }

    info!(
        "Waiting {}s for the server to settle before searching issues",
        options.settle_delay.as_secs()
    );
    tokio::time::sleep(options.settle_delay).await;

    for finding in findings {
        debug!(
            "Processing finding {} for package: {}",
            finding.rule_id, finding.package_name
        );
        if let Err(err) = annotate_finding(finding, tracker, options, &mut summary).await {
            error!("Error annotating finding {}: {:#}", finding.rule_id, err);
        }
    }

    info!(
        "Comment phase finished: {} findings, {} matched issues, {} comments posted, {} skipped",
        summary.findings, summary.matched_issues, summary.comments_posted, summary.skipped_existing
    );

    summary
}

async fn annotate_finding(
    finding: &Finding,
    tracker: &dyn IssueTracker,
    options: &AnnotateOptions,
    summary: &mut AnnotateSummary,
) -> anyhow::Result<()> {
    // A finding with no message links falls back to its rule help URI.
    let links: Vec<String> = if finding.links.is_empty() {
        if finding.help_uri.is_empty() {
            warn!("No links found for finding: {}", finding.rule_id);
            return Ok(());
        }
        vec![finding.help_uri.clone()]
    } else {
        finding.links.clone()
    };

    let rule_key = rule_key_for(&options.rule_repository, finding.severity);
    let issues = tracker
        .search_issues(&rule_key)
        .await
        .with_context(|| format!("searching issues for rule {}", rule_key))?;
    info!("Found {} issues for rule: {}", issues.len(), rule_key);

    let mut found = false;
    for issue in &issues {
        if !issue_matches_package(&issue.message, &finding.package_name) {
            continue;
        }
        found = true;
        summary.matched_issues += 1;
        info!(
            "Found matching issue for package: {} - issue key: {}",
            finding.package_name, issue.key
        );

        if has_existing_comment(issue) {
            debug!("Comment already exists for issue: {}", issue.key);
            summary.skipped_existing += 1;
            continue;
        }

        let text = create_comment_text(&links, Some(finding.severity));
        if options.dry_run {
            info!("Dry run, would comment on issue {}:\n{}", issue.key, text);
            continue;
        }

        match tracker.add_comment(&issue.key, &text).await {
            Ok(()) => {
                debug!("Successfully added comment to issue: {}", issue.key);
                summary.comments_posted += 1;
            }
            Err(err) => {
                error!("Failed to add comment to issue {}: {}", issue.key, err);
            }
        }
    }

    if !found {
        warn!(
            "No matching issue found for package: {}",
            finding.package_name
        );
    }

    Ok(())
}

/// Rule key the tracker files a severity tier under, e.g. `trivy:high`.
pub fn rule_key_for(repository: &str, severity: Severity) -> String {
    format!("{}:{}", repository, severity)
}

/// An issue belongs to a package when its display message carries the
/// labeled form `"Package: <name>"` or the bare package name anywhere.
pub fn issue_matches_package(message: &str, package_name: &str) -> bool {
    message.contains(&format!("Package: {}", package_name)) || message.contains(package_name)
}

/// Approximate idempotency check: any existing comment carrying the link
/// marker means a vulnerability comment was already posted on the issue.
fn has_existing_comment(issue: &Issue) -> bool {
    issue
        .comments
        .iter()
        .any(|comment| comment.markdown.contains(LINK_MARKER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{IssueComment, TrackerError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeTracker {
        issues: Vec<Issue>,
        fail_search: bool,
        searches: Mutex<Vec<String>>,
        comments: Mutex<Vec<(String, String)>>,
    }

    impl FakeTracker {
        fn new(issues: Vec<Issue>) -> Self {
            Self {
                issues,
                fail_search: false,
                searches: Mutex::new(Vec::new()),
                comments: Mutex::new(Vec::new()),
            }
        }

        fn posted(&self) -> Vec<(String, String)> {
            self.comments.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl IssueTracker for FakeTracker {
        async fn search_issues(&self, rule_key: &str) -> Result<Vec<Issue>, TrackerError> {
            self.searches.lock().unwrap().push(rule_key.to_string());
            if self.fail_search {
                return Err(TrackerError::Status {
                    endpoint: "issues/search",
                    status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                });
            }
            Ok(self.issues.clone())
        }

        async fn add_comment(&self, issue_key: &str, text: &str) -> Result<(), TrackerError> {
            self.comments
                .lock()
                .unwrap()
                .push((issue_key.to_string(), text.to_string()));
            Ok(())
        }
    }

    fn issue(key: &str, message: &str) -> Issue {
        Issue {
            key: key.to_string(),
            message: message.to_string(),
            comments: Vec::new(),
        }
    }

    fn log4j_finding() -> Finding {
        Finding {
            rule_id: "CVE-2021-44228".to_string(),
            severity: Severity::Critical,
            package_name: "org.apache.logging.log4j:log4j-core".to_string(),
            installed_version: "2.14.1".to_string(),
            fixed_version: "2.15.0".to_string(),
            links: vec!["https://avd.aquasec.com/nvd/cve-2021-44228".to_string()],
            ..Finding::default()
        }
    }

    fn options() -> AnnotateOptions {
        AnnotateOptions {
            settle_delay: Duration::ZERO,
            ..AnnotateOptions::default()
        }
    }

    #[tokio::test]
    async fn test_comments_all_matching_issues() {
        let tracker = FakeTracker::new(vec![
            issue("AX1", "Package: org.apache.logging.log4j:log4j-core is vulnerable"),
            issue("AX2", "Unrelated issue about com.google.code.gson:gson"),
            issue("AX3", "org.apache.logging.log4j:log4j-core needs an upgrade"),
        ]);

        let summary =
            annotate_findings(&[log4j_finding()], &tracker, &options()).await;

        let posted = tracker.posted();
        assert_eq!(summary.matched_issues, 2);
        assert_eq!(summary.comments_posted, 2);
        assert_eq!(posted.len(), 2);
        assert_eq!(posted[0].0, "AX1");
        assert_eq!(posted[1].0, "AX3");
        assert!(posted[0].1.contains("CVE-2021-44228:"));
        assert!(posted[0].1.contains("| Severity: CRITICAL"));
    }

    #[tokio::test]
    async fn test_searches_severity_keyed_rule() {
        let tracker = FakeTracker::new(Vec::new());
        annotate_findings(&[log4j_finding()], &tracker, &options()).await;
        assert_eq!(
            tracker.searches.lock().unwrap().clone(),
            vec!["trivy:critical".to_string()]
        );
    }

    #[tokio::test]
    async fn test_existing_link_comment_suppresses_posting() {
        let mut commented = issue("AX1", "Package: org.apache.logging.log4j:log4j-core");
        commented.comments.push(IssueComment {
            markdown: "Link: https://old.example.com | Severity: HIGH".to_string(),
        });
        let tracker = FakeTracker::new(vec![
            commented,
            issue("AX2", "Package: org.apache.logging.log4j:log4j-core"),
        ]);

        let summary =
            annotate_findings(&[log4j_finding()], &tracker, &options()).await;

        assert_eq!(summary.matched_issues, 2);
        assert_eq!(summary.skipped_existing, 1);
        assert_eq!(summary.comments_posted, 1);
        assert_eq!(tracker.posted()[0].0, "AX2");
    }

    #[tokio::test]
    async fn test_help_uri_fallback_when_no_links() {
        let mut finding = log4j_finding();
        finding.links.clear();
        finding.help_uri = "https://avd.aquasec.com/nvd/cve-2021-44228".to_string();

        let tracker = FakeTracker::new(vec![issue(
            "AX1",
            "Package: org.apache.logging.log4j:log4j-core",
        )]);
        let summary = annotate_findings(&[finding], &tracker, &options()).await;

        assert_eq!(summary.comments_posted, 1);
        assert!(tracker.posted()[0].1.contains("CVE-2021-44228:"));
    }

    #[tokio::test]
    async fn test_finding_without_links_or_help_uri_is_skipped() {
        let mut finding = log4j_finding();
        finding.links.clear();
        finding.help_uri.clear();

        let tracker = FakeTracker::new(vec![issue(
            "AX1",
            "Package: org.apache.logging.log4j:log4j-core",
        )]);
        let summary = annotate_findings(&[finding], &tracker, &options()).await;

        assert!(tracker.searches.lock().unwrap().is_empty());
        assert_eq!(summary.comments_posted, 0);
    }

    #[tokio::test]
    async fn test_search_failure_does_not_abort_remaining_findings() {
        let mut tracker = FakeTracker::new(vec![issue(
            "AX1",
            "Package: org.apache.logging.log4j:log4j-core",
        )]);
        tracker.fail_search = true;

        let other = Finding {
            package_name: "com.google.code.gson:gson".to_string(),
            ..log4j_finding()
        };
        let summary =
            annotate_findings(&[log4j_finding(), other], &tracker, &options()).await;

        // Both findings were attempted despite the failing searches.
        assert_eq!(tracker.searches.lock().unwrap().len(), 2);
        assert_eq!(summary.comments_posted, 0);
    }

    #[tokio::test]
    async fn test_dry_run_posts_nothing() {
        let tracker = FakeTracker::new(vec![issue(
            "AX1",
            "Package: org.apache.logging.log4j:log4j-core",
        )]);
        let opts = AnnotateOptions {
            dry_run: true,
            ..options()
        };
        let summary = annotate_findings(&[log4j_finding()], &tracker, &opts).await;

        assert_eq!(summary.matched_issues, 1);
        assert_eq!(summary.comments_posted, 0);
        assert!(tracker.posted().is_empty());
    }

    #[test]
    fn test_issue_matches_package() {
        assert!(issue_matches_package("Package: lodash is vulnerable", "lodash"));
        assert!(issue_matches_package("upgrade lodash soon", "lodash"));
        assert!(!issue_matches_package("upgrade underscore", "lodash"));
    }
}
