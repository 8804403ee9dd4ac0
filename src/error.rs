//! Error taxonomy for the embedded config engine.
//!
//! Pure helpers (block location, fragment parsing) report errors without a
//! path; the gateway attaches the host path before returning to callers.
use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by extract/persist and their building blocks.
#[derive(Error, Debug)]
pub enum ParserConfigError {
    #[error("@ParserConfig block not found in {}", display_opt(.path))]
    FragmentNotFound { path: Option<PathBuf> },

    #[error("failed to parse @ParserConfig JSON in {}: {source}", display_opt(.path))]
    MalformedFragment {
        path: Option<PathBuf>,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "@ParserConfig version {found} is newer than supported version {supported}; upgrade the application"
    )]
    UnsupportedNewerVersion { found: u32, supported: u32 },

    #[error("no migration step registered from version {from} (target {target})")]
    MissingMigrationStep { from: u32, target: u32 },

    #[error("migration step from version {from} failed: {reason}")]
    MigrationStepFailed { from: u32, reason: String },

    #[error("failed to access {}: {source}", .path.display())]
    HostIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result alias used across the engine.
pub type ParserConfigResult<T> = Result<T, ParserConfigError>;

/// How a caller at the UI boundary should react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Host file is missing, unreadable or holds a broken block; offer to repair it.
    Repair,
    /// Data was written by a newer application build.
    UpgradeApplication,
    /// A gap or fault inside the engine itself.
    Internal,
}

impl ParserConfigError {
    /// Classify the error for user-facing handling.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::FragmentNotFound { .. } | Self::MalformedFragment { .. } | Self::HostIo { .. } => {
                ErrorClass::Repair
            }
            Self::UnsupportedNewerVersion { .. } => ErrorClass::UpgradeApplication,
            Self::MissingMigrationStep { .. } | Self::MigrationStepFailed { .. } => {
                ErrorClass::Internal
            }
        }
    }

    /// True when the user can fix the problem without a new application build.
    pub fn is_user_recoverable(&self) -> bool {
        self.class() == ErrorClass::Repair
    }

    /// Attach the host path to path-less errors raised by pure helpers.
    pub(crate) fn with_path(self, host: &std::path::Path) -> Self {
        match self {
            Self::FragmentNotFound { path: None } => Self::FragmentNotFound {
                path: Some(host.to_path_buf()),
            },
            Self::MalformedFragment { path: None, source } => Self::MalformedFragment {
                path: Some(host.to_path_buf()),
                source,
            },
            other => other,
        }
    }
}

fn display_opt(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "host document".to_string(),
    }
}
