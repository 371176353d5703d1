use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
/// Failures surfaced by manifest persistence.
///
/// Lookups and mutations never fail; only reading or writing the manifest
/// file can, and callers must not treat those as a silently stale catalog.
pub enum StoreError {
    #[error("manifest path cannot be empty")]
    EmptyPath,
    #[error("failed to read manifest '{}': {source}", .path.display())]
    ManifestRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write manifest '{}': {source}", .path.display())]
    ManifestWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}
