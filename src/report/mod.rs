//! Report ingestion: SARIF walking and free-text field extraction.
//!
//! The ingestor walks a report's `runs → rules/results → locations`
//! structure and emits one raw [`Finding`](crate::model::Finding) per
//! (result, location) pair. Package identity lives in the result's
//! free-text message; a [`FieldExtractor`] pulls it out, so report formats
//! that carry structured fields can plug in their own extractor without
//! touching the ingestor or the arbitration engine.

mod message;
mod sarif;

pub use message::LabeledFieldExtractor;
pub use sarif::SarifIngestor;

/// Structured fields recovered from a result's message body.
///
/// Absent fields are empty strings (the arbitration key and issue
/// matching depend on that), except the reference link which is genuinely
/// optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageFields {
    pub package_name: String,
    pub installed_version: String,
    pub fixed_version: String,
    pub link: Option<String>,
}

/// Extracts package identity fields from a result message.
pub trait FieldExtractor: Send + Sync {
    fn extract(&self, message: &str) -> MessageFields;
}

/// Returns the extractor for Trivy-style labeled message bodies.
pub fn default_extractor() -> LabeledFieldExtractor {
    LabeledFieldExtractor
}
