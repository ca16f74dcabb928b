//! Issue-tracker boundary.
//!
//! The annotation phase only needs two operations from the remote
//! tracker: search the open issues of a rule, and add a comment to one
//! issue. [`IssueTracker`] captures exactly that, keeping authentication
//! and transport behind the trait so tests can substitute an in-memory
//! tracker.

mod sonarqube;

pub use sonarqube::SonarTracker;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {status} from {endpoint}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },
}

/// A tracked issue as returned by the search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub key: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub comments: Vec<IssueComment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueComment {
    #[serde(default)]
    pub markdown: String,
}

#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Searches issues raised under the given rule key, with their
    /// existing comments.
    async fn search_issues(&self, rule_key: &str) -> Result<Vec<Issue>, TrackerError>;

    /// Adds a comment to an issue.
    async fn add_comment(&self, issue_key: &str, text: &str) -> Result<(), TrackerError>;
}
