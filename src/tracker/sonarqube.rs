use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{Issue, IssueTracker, TrackerError};

/// Page size for issue searches.
const SEARCH_PAGE_SIZE: &str = "500";

/// Client for the SonarQube Web API.
///
/// Authentication uses HTTP basic auth: `login` is a username or a
/// token; the password is blank for token auth.
pub struct SonarTracker {
    client: reqwest::Client,
    base_url: String,
    login: String,
    password: String,
}

impl SonarTracker {
    pub fn new(
        base_url: impl Into<String>,
        login: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
            login: login.into(),
            password: password.into(),
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<Issue>,
}

#[async_trait]
impl IssueTracker for SonarTracker {
    async fn search_issues(&self, rule_key: &str) -> Result<Vec<Issue>, TrackerError> {
        let url = format!("{}/api/issues/search", self.base_url);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.login, Some(&self.password))
            .query(&[
                ("ps", SEARCH_PAGE_SIZE),
                ("additionalFields", "comments"),
                ("rules", rule_key),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::Status {
                endpoint: "issues/search",
                status,
            });
        }

        let body: SearchResponse = response.json().await?;
        debug!("Search for rule {} returned {} issues", rule_key, body.issues.len());
        Ok(body.issues)
    }

    async fn add_comment(&self, issue_key: &str, text: &str) -> Result<(), TrackerError> {
        let url = format!("{}/api/issues/add_comment", self.base_url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.login, Some(&self.password))
            .query(&[("issue", issue_key), ("text", text)])
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(TrackerError::Status {
                endpoint: "issues/add_comment",
                status,
            });
        }

        debug!("Added comment to issue {}", issue_key);
        Ok(())
    }
}
