//! Tagged gif catalog used by the gifbot Slack runtime.
//!
//! Holds the url/tag records, the per-tag reference index, random lookups over
//! tag expressions, status reports, and the flat-file manifest format the
//! catalog is persisted in.

pub mod error;
pub mod manifest;
pub mod report;
pub mod store;
pub mod tag_expression;

pub use error::StoreError;
pub use manifest::{parse_manifest, ManifestEntry, ManifestFile, ManifestLoadSummary};
pub use report::{StoreReport, TagComparison, TagReportLine};
pub use store::{GifStore, DEFAULT_MODIFIER};
pub use tag_expression::{TagExpression, AND_DELIMITER, WILDCARD};
