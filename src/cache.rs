use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Which pipeline artifact a cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Raw,
    Labeled,
}

impl ArtifactKind {
    fn file_name(self) -> &'static str {
        match self {
            Self::Raw => "raw.txt",
            Self::Labeled => "labeled.txt",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::Labeled => write!(f, "labeled"),
        }
    }
}

/// Durable `(kind, source_id) -> text` storage.
///
/// `read` returns `Ok(None)` for a missing entry and
/// `Err(PipelineError::CacheCorruption)` for an entry that is not text.
/// `write` replaces the whole value; entries are never patched in place.
pub trait ArtifactStore {
    fn exists(&self, kind: ArtifactKind, source_id: &str) -> bool;
    fn read(&self, kind: ArtifactKind, source_id: &str) -> Result<Option<String>>;
    fn write(&mut self, kind: ArtifactKind, source_id: &str, text: &str) -> Result<()>;

    /// Human-readable location of an entry, for logs and run summaries.
    fn describe(&self, kind: ArtifactKind, source_id: &str) -> String {
        format!("{}:{}", kind, source_id)
    }
}

/// Filesystem store: `<root>/<source_id>/{raw,labeled}.txt`.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, kind: ArtifactKind, source_id: &str) -> PathBuf {
        self.root
            .join(sanitize_source_id(source_id))
            .join(kind.file_name())
    }

    /// Delete every cached artifact for `source_id`. Returns how many were removed.
    pub fn remove_all(&self, source_id: &str) -> Result<usize> {
        let mut removed = 0;
        for kind in [ArtifactKind::Raw, ArtifactKind::Labeled] {
            let path = self.path(kind, source_id);
            if path.exists() {
                std::fs::remove_file(&path)?;
                tracing::info!("Removed cached {} artifact: {}", kind, path.display());
                removed += 1;
            }
        }
        let dir = self.root.join(sanitize_source_id(source_id));
        if dir.is_dir() && std::fs::read_dir(&dir)?.next().is_none() {
            std::fs::remove_dir(&dir)?;
        }
        Ok(removed)
    }
}

impl ArtifactStore for FsArtifactStore {
    fn exists(&self, kind: ArtifactKind, source_id: &str) -> bool {
        self.path(kind, source_id).is_file()
    }

    fn read(&self, kind: ArtifactKind, source_id: &str) -> Result<Option<String>> {
        let path = self.path(kind, source_id);
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| PipelineError::CacheCorruption {
                kind,
                source_id: source_id.to_string(),
            })
    }

    fn write(&mut self, kind: ArtifactKind, source_id: &str, text: &str) -> Result<()> {
        let path = self.path(kind, source_id);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        // Write to a sibling temp file then rename, so readers never see a
        // half-written artifact.
        let tmp_path = path.with_extension("txt.tmp");
        std::fs::write(&tmp_path, text)?;
        std::fs::rename(&tmp_path, &path)?;
        tracing::debug!("Wrote {} artifact to {}", kind, path.display());
        Ok(())
    }

    fn describe(&self, kind: ArtifactKind, source_id: &str) -> String {
        self.path(kind, source_id).display().to_string()
    }
}

/// In-memory store, used for tests and dry runs. Entries are raw bytes so
/// corrupt (non-UTF-8) artifacts can be simulated.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<(ArtifactKind, String), Vec<u8>>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_bytes(&mut self, kind: ArtifactKind, source_id: &str, bytes: Vec<u8>) {
        self.entries.insert((kind, source_id.to_string()), bytes);
    }

    pub fn get(&self, kind: ArtifactKind, source_id: &str) -> Option<&str> {
        self.entries
            .get(&(kind, source_id.to_string()))
            .and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Number of `write` calls seen so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl ArtifactStore for MemoryStore {
    fn exists(&self, kind: ArtifactKind, source_id: &str) -> bool {
        self.entries.contains_key(&(kind, source_id.to_string()))
    }

    fn read(&self, kind: ArtifactKind, source_id: &str) -> Result<Option<String>> {
        match self.entries.get(&(kind, source_id.to_string())) {
            None => Ok(None),
            Some(bytes) => String::from_utf8(bytes.clone()).map(Some).map_err(|_| {
                PipelineError::CacheCorruption {
                    kind,
                    source_id: source_id.to_string(),
                }
            }),
        }
    }

    fn write(&mut self, kind: ArtifactKind, source_id: &str, text: &str) -> Result<()> {
        self.entries
            .insert((kind, source_id.to_string()), text.as_bytes().to_vec());
        self.writes += 1;
        Ok(())
    }
}

/// Map an opaque source id onto a safe single path component.
fn sanitize_source_id(source_id: &str) -> String {
    let cleaned: String = source_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}
