use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    List,
    Detail,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::List => write!(f, "list"),
            Phase::Detail => write!(f, "detail"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseState {
    NotStarted,
    Complete,
}

/// What a finished phase left behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseEntry {
    /// Artifact file name, relative to the output directory.
    pub artifact: String,
    pub count: usize,
    pub sha256: String,
    /// Identifies the crawl target the artifact was produced for.
    pub scope: String,
    #[serde(default)]
    pub completed_utc: String,
}

/// Completion ledger stored next to the phase artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<PhaseEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<PhaseEntry>,
}

impl Manifest {
    pub fn entry(&self, phase: Phase) -> Option<&PhaseEntry> {
        match phase {
            Phase::List => self.list.as_ref(),
            Phase::Detail => self.detail.as_ref(),
        }
    }

    pub fn record(&mut self, phase: Phase, entry: PhaseEntry) {
        match phase {
            Phase::List => self.list = Some(entry),
            Phase::Detail => self.detail = Some(entry),
        }
    }

    /// The list phase is complete when it was recorded for the same scope and
    /// the artifact on disk still hashes to the recorded digest.
    ///
    /// `artifact_digest` is the digest of the artifact currently on disk, or
    /// `None` when the file is missing.
    pub fn list_state(&self, scope: &str, artifact_digest: Option<&str>) -> PhaseState {
        match (&self.list, artifact_digest) {
            (Some(entry), Some(digest)) if entry.scope == scope && entry.sha256 == digest => {
                PhaseState::Complete
            }
            _ => PhaseState::NotStarted,
        }
    }

    /// The detail phase is complete when, on top of the list checks, the
    /// recorded count covers every item.
    pub fn detail_state(
        &self,
        scope: &str,
        item_count: usize,
        artifact_digest: Option<&str>,
    ) -> PhaseState {
        match (&self.detail, artifact_digest) {
            (Some(entry), Some(digest))
                if entry.scope == scope && entry.sha256 == digest && entry.count >= item_count =>
            {
                PhaseState::Complete
            }
            _ => PhaseState::NotStarted,
        }
    }
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
