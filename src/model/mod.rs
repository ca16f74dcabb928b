//! Core data types for findings and severities.
//!
//! This module contains the fundamental types used throughout vulnrelay:
//!
//! - [`Finding`] - A normalized vulnerability record
//! - [`Severity`] - Severity tier with a total order
//!
//! # Example
//!
//! ```
//! use vulnrelay::{Finding, Severity};
//!
//! let mut finding = Finding {
//!     rule_id: "CVE-2021-44228".to_string(),
//!     package_name: "org.apache.logging.log4j:log4j-core".to_string(),
//!     installed_version: "2.14.1".to_string(),
//!     fixed_version: "2.15.0".to_string(),
//!     ..Finding::default()
//! };
//! finding.push_link("https://avd.aquasec.com/nvd/cve-2021-44228");
//!
//! assert_eq!(finding.severity, Severity::High);
//! ```

mod finding;

pub use finding::*;
