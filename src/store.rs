use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::types::Document;

/// Durable home of the data document. Every run re-reads it; nothing is cached.
pub trait Store: Send + Sync {
    /// Previously saved document, or an empty one. Never fails.
    fn load(&self) -> Document;

    /// Replace the whole document. On error the previous one is still readable.
    fn save(&self, document: &Document) -> Result<(), StoreError>;
}

/// Pretty-printed JSON file, replaced by rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when the file does not exist yet.
    pub fn read(&self) -> Result<Option<Document>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let value: Value = serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        match value {
            Value::Object(doc) => Ok(Some(doc)),
            _ => Err(StoreError::NotAnObject {
                path: self.path.clone(),
            }),
        }
    }

    /// Write the document to a temporary file beside the target. Nothing is
    /// visible at the target path until [`StagedWrite::commit`].
    pub fn stage(&self, document: &Document) -> Result<StagedWrite, StoreError> {
        let mut bytes = serde_json::to_vec_pretty(document)?;
        bytes.push(b'\n');

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let write_err = |source: io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        fs::create_dir_all(dir).map_err(write_err)?;

        let mut temp = tempfile::Builder::new()
            .prefix(".data-")
            .suffix(".json.tmp")
            .tempfile_in(dir)
            .map_err(write_err)?;
        temp.write_all(&bytes).map_err(write_err)?;
        temp.as_file().sync_all().map_err(write_err)?;
        set_permissions(&temp, &self.path).map_err(write_err)?;

        Ok(StagedWrite {
            temp,
            target: self.path.clone(),
        })
    }
}

// Temp files are created owner-only; the published document must stay
// readable by whatever serves it.
fn set_permissions(temp: &NamedTempFile, target: &Path) -> io::Result<()> {
    if let Ok(meta) = fs::metadata(target) {
        return temp.as_file().set_permissions(meta.permissions());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))?;
    }
    Ok(())
}

/// A fully written document waiting to be renamed into place.
/// Dropping it without committing removes the temporary file.
#[derive(Debug)]
pub struct StagedWrite {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedWrite {
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    pub fn commit(self) -> Result<(), StoreError> {
        self.temp
            .persist(&self.target)
            .map_err(|e| StoreError::Commit {
                path: self.target.clone(),
                source: e.error,
            })?;
        Ok(())
    }
}

impl Store for JsonFileStore {
    fn load(&self) -> Document {
        match self.read() {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                info!(path = %self.path.display(), "no data file yet, starting from an empty document");
                Document::new()
            }
            Err(e) => {
                warn!(error = %e, "data file unreadable, starting from an empty document");
                Document::new()
            }
        }
    }

    fn save(&self, document: &Document) -> Result<(), StoreError> {
        self.stage(document)?.commit()
    }
}
