use std::sync::LazyLock;

use regex::Regex;

use super::{FieldExtractor, MessageFields};

static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("markdown link pattern"));

/// Extractor for Trivy's labeled message format:
///
/// ```text
/// Package: org.apache.logging.log4j:log4j-core
/// Installed Version: 2.14.1
/// Fixed Version: 2.15.0
/// Link: [CVE-2021-44228](https://avd.aquasec.com/nvd/cve-2021-44228)
/// ```
///
/// Each field is the trimmed text between the first occurrence of its
/// label and the next newline. Missing labels yield empty strings; a
/// `Link:` line without a markdown link yields no link.
pub struct LabeledFieldExtractor;

impl FieldExtractor for LabeledFieldExtractor {
    fn extract(&self, message: &str) -> MessageFields {
        MessageFields {
            package_name: labeled_value(message, "Package:"),
            installed_version: labeled_value(message, "Installed Version:"),
            fixed_version: labeled_value(message, "Fixed Version:"),
            link: extract_link(message),
        }
    }
}

/// The substring after the first `label` up to the next newline (or end
/// of string), trimmed. Empty string when the label is absent.
fn labeled_value(message: &str, label: &str) -> String {
    match message.find(label) {
        Some(idx) => {
            let start = idx + label.len();
            let rest = &message[start..];
            let value = match rest.find('\n') {
                Some(end) => &rest[..end],
                None => rest,
            };
            value.trim().to_string()
        }
        None => String::new(),
    }
}

/// The URL of the first markdown link on the `Link:` line, if any.
fn extract_link(message: &str) -> Option<String> {
    let line = labeled_value(message, "Link:");
    if line.is_empty() {
        return None;
    }
    MARKDOWN_LINK
        .captures(&line)
        .map(|caps| caps[2].to_string())
}
