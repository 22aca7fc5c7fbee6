//! Error types for layout computation.
//!
//! Only configuration problems and record slices that do not match the
//! layout are fatal. Everything that can go wrong with
//! the data itself is reported as a [`Diagnostic`](crate::Diagnostic) and the
//! run continues with a lower-quality distribution.

use thiserror::Error;

/// Errors that can occur loading or validating a [`LayoutConfig`](crate::LayoutConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Error parsing TOML config
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    /// Error writing TOML config
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    /// A value is outside its accepted range
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the engine entry points.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// No anchor with a usable position was supplied
    #[error("no anchors to allocate volume for")]
    NoAnchors,
    /// Configuration could not be used
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Write-back target does not hold the records the layout was built from
    #[error("expected {expected} item records, got {found}")]
    RecordCountMismatch { expected: usize, found: usize },
    /// A record at `index` carries a different id than the laid-out item
    #[error("record {index} is {found:?}, expected {expected:?}")]
    RecordIdMismatch {
        index: usize,
        expected: String,
        found: String,
    },
}
