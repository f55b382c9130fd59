use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crawl_core::{sha256_hex, Manifest};
use engine_logging::engine_warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

pub const MANIFEST_FILENAME: &str = "manifest.json";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    // Basic writability probe: try creating a temp file.
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file then renaming.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

/// An artifact that made it to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifact {
    pub path: PathBuf,
    pub sha256: String,
}

/// Phase artifacts and the manifest inside one output directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    writer: AtomicFileWriter,
}

impl ArtifactStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir.clone()),
            dir,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Missing manifest means nothing finished yet. An unreadable one is
    /// treated the same way so the affected phases simply run again.
    pub fn load_manifest(&self) -> Manifest {
        let path = self.path_of(MANIFEST_FILENAME);
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Manifest::default(),
            Err(err) => {
                engine_warn!("Failed to read manifest {:?}: {}", path, err);
                return Manifest::default();
            }
        };
        match serde_json::from_slice(&content) {
            Ok(manifest) => manifest,
            Err(err) => {
                engine_warn!("Failed to parse manifest {:?}: {}", path, err);
                Manifest::default()
            }
        }
    }

    pub fn save_manifest(&self, manifest: &Manifest) -> Result<PathBuf, PersistError> {
        self.write_json(MANIFEST_FILENAME, manifest)
            .map(|written| written.path)
    }

    /// SHA-256 of an artifact on disk, `None` if it does not exist.
    pub fn digest_of(&self, filename: &str) -> Result<Option<String>, PersistError> {
        match fs::read(self.path_of(filename)) {
            Ok(bytes) => Ok(Some(sha256_hex(&bytes))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn read_json<T: DeserializeOwned>(&self, filename: &str) -> Result<T, PersistError> {
        let path = self.path_of(filename);
        let bytes = fs::read(&path)?;
        serde_json::from_slice(&bytes).map_err(|source| PersistError::Json { path, source })
    }

    /// Pretty-printed UTF-8 JSON, written atomically.
    pub fn write_json<T: Serialize + ?Sized>(
        &self,
        filename: &str,
        value: &T,
    ) -> Result<WrittenArtifact, PersistError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| PersistError::Json {
            path: self.path_of(filename),
            source,
        })?;
        let path = self.writer.write(filename, &bytes)?;
        Ok(WrittenArtifact {
            path,
            sha256: sha256_hex(&bytes),
        })
    }
}
