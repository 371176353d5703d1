//! Flat-file manifest codec: one `url,tag1,tag2,...` line per record.

use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::store::GifStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub url: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManifestLoadSummary {
    pub records: usize,
    pub tags: usize,
    /// Non-blank lines dropped for lacking a url or any tag.
    pub skipped_lines: usize,
}

/// Splits manifest text into entries, returning them with the number of
/// malformed non-blank lines that were skipped.
pub fn parse_manifest(text: &str) -> (Vec<ManifestEntry>, usize) {
    let mut entries = Vec::new();
    let mut skipped = 0_usize;
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split(',');
        let url = fields.next().unwrap_or_default();
        let tags = fields
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        if url.is_empty() || tags.is_empty() {
            skipped = skipped.saturating_add(1);
            continue;
        }
        entries.push(ManifestEntry {
            url: url.to_string(),
            tags,
        });
    }
    (entries, skipped)
}

impl GifStore {
    /// Builds a store from manifest text.
    pub fn from_manifest(modifiers: Vec<String>, text: &str) -> (Self, ManifestLoadSummary) {
        let mut store = Self::new(modifiers);
        let summary = store.load(text);
        (store, summary)
    }

    /// Replaces the whole catalog with the records in `text`.
    pub fn load(&mut self, text: &str) -> ManifestLoadSummary {
        let (entries, skipped_lines) = parse_manifest(text);
        self.clear();
        for entry in entries {
            self.add(entry.url, entry.tags);
        }
        if skipped_lines > 0 {
            tracing::debug!(skipped_lines, "skipped malformed manifest lines");
        }
        ManifestLoadSummary {
            records: self.len(),
            tags: self.tags().len(),
            skipped_lines,
        }
    }

    /// Renders the catalog as manifest text, ordered by url with sorted tags.
    pub fn serialize(&self) -> String {
        let mut text = String::new();
        for (url, tags) in self.records() {
            text.push_str(url);
            for tag in tags {
                text.push(',');
                text.push_str(tag);
            }
            text.push('\n');
        }
        text
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A manifest on disk. Loads are all-or-nothing and saves replace the file
/// through a temporary sibling so readers never observe a partial write.
pub struct ManifestFile {
    path: PathBuf,
}

impl ManifestFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(
        &self,
        modifiers: Vec<String>,
    ) -> Result<(GifStore, ManifestLoadSummary), StoreError> {
        if self.path.as_os_str().is_empty() {
            return Err(StoreError::EmptyPath);
        }
        let text =
            std::fs::read_to_string(&self.path).map_err(|source| StoreError::ManifestRead {
                path: self.path.clone(),
                source,
            })?;
        let (store, summary) = GifStore::from_manifest(modifiers, &text);
        tracing::info!(
            path = %self.path.display(),
            records = summary.records,
            tags = summary.tags,
            skipped_lines = summary.skipped_lines,
            "loaded gif manifest"
        );
        Ok((store, summary))
    }

    pub fn save(&self, store: &GifStore) -> Result<(), StoreError> {
        if self.path.as_os_str().is_empty() {
            return Err(StoreError::EmptyPath);
        }
        let untagged = store.untagged_len();
        if untagged > 0 {
            tracing::warn!(
                path = %self.path.display(),
                untagged,
                "records without tags cannot be persisted and will be dropped on the next load"
            );
        }
        write_replacing(&self.path, &store.serialize()).map_err(|source| {
            StoreError::ManifestWrite {
                path: self.path.clone(),
                source,
            }
        })?;
        tracing::info!(
            path = %self.path.display(),
            records = store.len(),
            "saved gif manifest"
        );
        Ok(())
    }
}

fn write_replacing(path: &Path, content: &str) -> std::io::Result<()> {
    let parent_dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent_dir)?;

    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    let temp_path = parent_dir.join(format!(
        ".{}.tmp-{}-{nanos}",
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("manifest"),
        std::process::id(),
    ));
    std::fs::write(&temp_path, content)?;
    if let Err(error) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(error);
    }
    Ok(())
}
