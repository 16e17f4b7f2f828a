//! Access, creation and failure-discipline selectors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Access requested for a mapping
///
/// A read-only open of a segment created read-write is a legal downgrade;
/// the reverse is rejected by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    ReadOnly,
    #[default]
    ReadWrite,
}

impl AccessMode {
    pub fn is_writable(self) -> bool {
        self == AccessMode::ReadWrite
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::ReadOnly => write!(f, "read_only"),
            AccessMode::ReadWrite => write!(f, "read_write"),
        }
    }
}

impl std::str::FromStr for AccessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "read_only" | "ro" | "r" => Ok(AccessMode::ReadOnly),
            "read_write" | "rw" => Ok(AccessMode::ReadWrite),
            _ => Err(format!(
                "Unknown access mode: {}. Available: read_only, read_write",
                s
            )),
        }
    }
}

/// How a segment comes into existence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateMode {
    /// Create a new identity, fail with `AlreadyExists` if it is present
    CreateOnly,
    /// Open the identity if present (keeping its size), create it otherwise
    OpenOrCreate,
    /// Create if absent, reuse if present. A larger existing identity keeps
    /// its size; a smaller one fails with `SizeMismatch`.
    OpenAlways,
    /// Open an identity that must already exist; its size is discovered
    OpenExisting,
}

impl CreateMode {
    /// Whether this mode may bring a new identity into existence
    pub fn may_create(self) -> bool {
        !matches!(self, CreateMode::OpenExisting)
    }

    pub fn all() -> [CreateMode; 4] {
        [
            CreateMode::CreateOnly,
            CreateMode::OpenOrCreate,
            CreateMode::OpenAlways,
            CreateMode::OpenExisting,
        ]
    }
}

impl fmt::Display for CreateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreateMode::CreateOnly => write!(f, "create_only"),
            CreateMode::OpenOrCreate => write!(f, "open_or_create"),
            CreateMode::OpenAlways => write!(f, "open_always"),
            CreateMode::OpenExisting => write!(f, "open_existing"),
        }
    }
}

impl std::str::FromStr for CreateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "create_only" | "create" => Ok(CreateMode::CreateOnly),
            "open_or_create" => Ok(CreateMode::OpenOrCreate),
            "open_always" => Ok(CreateMode::OpenAlways),
            "open_existing" | "open" => Ok(CreateMode::OpenExisting),
            _ => Err(format!(
                "Unknown create mode: {}. Available: {:?}",
                s,
                CreateMode::all()
                    .iter()
                    .map(|m| m.to_string())
                    .collect::<Vec<_>>()
            )),
        }
    }
}

/// How a failed create/open is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    /// Return the error immediately
    #[default]
    FailFast,
    /// Return an invalid instance whose `last_error()` holds the failure
    FailSoft,
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discipline::FailFast => write!(f, "fail_fast"),
            Discipline::FailSoft => write!(f, "fail_soft"),
        }
    }
}
