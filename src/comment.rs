//! Comment text synthesis for tracked issues.

use crate::model::Severity;

/// Marker every synthesized link line carries in one of its forms; the
/// presence of this text in an existing issue comment is treated as proof
/// that a vulnerability comment was already posted.
pub const LINK_MARKER: &str = "Link:";

/// Builds the comment body for a finding's reference links.
///
/// Each link becomes one line: `"CVE-2021-44228: <url>"` when the URL
/// carries a CVE token, `"Link: <url>"` otherwise, with
/// `" | Severity: HIGH"` appended when a severity is present. Lines are
/// newline-joined with no trailing newline.
pub fn create_comment_text(links: &[String], severity: Option<Severity>) -> String {
    let mut text = String::new();

    for (i, link) in links.iter().enumerate() {
        match extract_cve_id(link) {
            Some(cve_id) => {
                text.push_str(&cve_id);
                text.push_str(": ");
                text.push_str(link);
            }
            None => {
                text.push_str(LINK_MARKER);
                text.push(' ');
                text.push_str(link);
            }
        }

        if let Some(severity) = severity {
            text.push_str(" | Severity: ");
            text.push_str(severity.as_upper_str());
        }

        if i < links.len() - 1 {
            text.push('\n');
        }
    }

    text
}

/// Extracts an upper-cased CVE token from a URL like
/// `https://avd.aquasec.com/nvd/cve-2020-13956`: the text from the
/// (case-insensitive) `cve-` marker up to the next `/` or the end of the
/// string.
pub fn extract_cve_id(url: &str) -> Option<String> {
    let start = url
        .as_bytes()
        .windows(4)
        .position(|window| window.eq_ignore_ascii_case(b"cve-"))?;
    let token = &url[start..];
    let token = match token.find('/') {
        Some(end) => &token[..end],
        None => token,
    };
    Some(token.to_uppercase())
}
