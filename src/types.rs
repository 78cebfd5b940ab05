//! Core types shared by the local and distributed transfer paths.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Name of a member process in the cluster.
pub type MemberName = String;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Identity of a process that owns (part of) a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberInfo {
    /// Member name, used in export file names and import placement.
    pub name: MemberName,

    /// Host the member runs on.
    pub host: String,
}

impl MemberInfo {
    /// Create a new member identity.
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
        }
    }

    /// Whether this member is the one named by an import hint.
    pub fn matches(&self, hint: &str) -> bool {
        self.name.eq_ignore_ascii_case(hint)
    }
}

/// Which way data moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferDirection {
    Export,
    Import,
}

impl std::fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferDirection::Export => write!(f, "export"),
            TransferDirection::Import => write!(f, "import"),
        }
    }
}

/// Outcome of one export or import of one file by one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardResult {
    /// Export or import.
    pub direction: TransferDirection,

    /// Full path of the dataset, e.g. `/orders`.
    pub region_path: String,

    /// Directory holding the file.
    pub file_dir: String,

    /// File name within `file_dir`.
    pub file_name: String,

    /// Member that did the work, empty for a client.
    pub member: String,

    /// Host of that member, empty for a client.
    pub host: String,

    /// Keys enumerated (export) or records decoded (import).
    pub records_read: u64,

    /// Records encoded (export) or written to the store (import).
    pub records_written: u64,

    /// Failure message if the transfer did not complete.
    pub error: Option<String>,
}

impl ShardResult {
    /// Create an empty result for the given direction and dataset.
    pub fn new(direction: TransferDirection, region_path: impl Into<String>) -> Self {
        Self {
            direction,
            region_path: region_path.into(),
            file_dir: String::new(),
            file_name: String::new(),
            member: String::new(),
            host: String::new(),
            records_read: 0,
            records_written: 0,
            error: None,
        }
    }

    /// Attach the identity of the process doing the work.
    pub fn with_member(mut self, member: Option<&MemberInfo>) -> Self {
        if let Some(member) = member {
            self.member = member.name.clone();
            self.host = member.host.clone();
        }
        self
    }

    /// Whether the transfer completed.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Full path of the file.
    pub fn path(&self) -> PathBuf {
        if self.file_dir.is_empty() {
            PathBuf::from(&self.file_name)
        } else {
            Path::new(&self.file_dir).join(&self.file_name)
        }
    }

    /// Sort key used for reporting: host, member, then file name for imports.
    ///
    /// Comparison is case-insensitive. Exports leave the file component out,
    /// so two exports from the same member compare equal.
    pub fn sort_key(&self) -> (String, String, Option<String>) {
        let file = match self.direction {
            TransferDirection::Export => None,
            TransferDirection::Import => Some(self.file_name.to_lowercase()),
        };
        (self.host.to_lowercase(), self.member.to_lowercase(), file)
    }

    /// Compare two results by [`ShardResult::sort_key`].
    pub fn report_order(a: &ShardResult, b: &ShardResult) -> Ordering {
        a.sort_key().cmp(&b.sort_key())
    }
}

/// One file to import, optionally pinned to a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRequest {
    /// Member that should import the file. `None` for client-local import.
    pub member: Option<MemberName>,

    /// Directory holding the file, empty for the working directory.
    pub file_dir: String,

    /// File name, `<dataset>[.<member>].<timestamp>.<suffix>`.
    pub file_name: String,

    /// Dataset the file is imported into, derived from `file_name`.
    pub region: String,
}

impl ImportRequest {
    /// Full path of the file.
    pub fn path(&self) -> PathBuf {
        if self.file_dir.is_empty() {
            PathBuf::from(&self.file_name)
        } else {
            Path::new(&self.file_dir).join(&self.file_name)
        }
    }

    /// Whether the given member should process this request.
    pub fn is_for(&self, member: &MemberInfo) -> bool {
        self.member.as_deref().map_or(false, |hint| member.matches(hint))
    }
}
