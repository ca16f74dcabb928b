//! Deduplication and fixed-version arbitration.
//!
//! A scanner report usually describes the same underlying vulnerability
//! several times: once per advisory, once per fixed-version state, once
//! per manifest location. Arbitration collapses raw findings that share a
//! package identity into one canonical finding that carries the highest
//! fixed version, the winning severity, and the union of all reference
//! links.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::{debug, info};

use crate::model::Finding;
use crate::version::compare_versions;

/// Collapses raw findings into canonical ones.
///
/// Findings are folded left to right. The first finding for a key becomes
/// canonical; later findings for the same key donate their links (order
/// preserved, duplicates dropped) and replace the canonical entry only
/// when their fixed version is strictly greater, or equal with a strictly
/// higher severity. Output is in first-seen key order.
pub fn dedupe_findings(raw: Vec<Finding>) -> Vec<Finding> {
    let total = raw.len();
    let mut order: Vec<String> = Vec::new();
    let mut canonical: HashMap<String, Finding> = HashMap::new();

    for finding in raw {
        let key = dedupe_key(&finding);
        match canonical.entry(key.clone()) {
            Entry::Vacant(slot) => {
                order.push(key);
                slot.insert(finding);
            }
            Entry::Occupied(mut slot) => {
                let current = slot.get_mut();

                let mut merged = current.links.clone();
                for link in &finding.links {
                    if !merged.contains(link) {
                        merged.push(link.clone());
                    }
                }

                let comparison = compare_versions(
                    Some(finding.fixed_version.as_str()),
                    Some(current.fixed_version.as_str()),
                );
                let replace = match comparison {
                    Ordering::Greater => {
                        debug!(
                            "Replacing entry for key {} with higher fixed version: {} -> {}",
                            key, current.fixed_version, finding.fixed_version
                        );
                        true
                    }
                    Ordering::Equal if finding.severity > current.severity => {
                        debug!(
                            "Replacing entry for key {} with higher severity: {} -> {}",
                            key, current.severity, finding.severity
                        );
                        true
                    }
                    _ => false,
                };

                if replace {
                    let mut winner = finding;
                    winner.links = merged;
                    *current = winner;
                } else {
                    current.links = merged;
                }
            }
        }
    }

    info!(
        "Deduplication reduced {} entries to {} unique entries",
        total,
        canonical.len()
    );

    order
        .into_iter()
        .filter_map(|key| canonical.remove(&key))
        .collect()
}

/// Arbitration key: package identity, or the rule id when the finding
/// carries no package information (so unrelated rule-only findings are
/// never merged together).
fn dedupe_key(finding: &Finding) -> String {
    if finding.package_name.is_empty() && finding.installed_version.is_empty() {
        return finding.rule_id.clone();
    }
    format!("{}|{}", finding.package_name, finding.installed_version)
}
