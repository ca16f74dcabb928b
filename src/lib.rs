pub mod annotate;
pub mod comment;
pub mod config;
pub mod dedupe;
pub mod model;
pub mod output;
pub mod report;
pub mod tracker;
pub mod version;

pub use config::Config;
pub use model::{Finding, Severity};
pub use report::{FieldExtractor, LabeledFieldExtractor, SarifIngestor};
pub use tracker::{IssueTracker, SonarTracker};
