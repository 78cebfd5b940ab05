//! Configuration types for export and import.

use crate::error::Result;
use crate::format::FileType;
use crate::locator::{parse_locators, Locator};
use std::path::PathBuf;
use std::time::Duration;

/// Number of keys fetched or written per round trip when nothing else is configured.
pub const DEFAULT_BLOCK_SIZE: usize = 1000;

/// Environment variable consulted by [`TransferConfig::from_env`].
pub const BLOCK_SIZE_ENV: &str = "ADP_BLOCK_SIZE";

/// Environment variable holding the `host[port],host[port]` cluster locators.
pub const LOCATORS_ENV: &str = "ADP_LOCATORS";

/// Configuration for one export or import run.
///
/// Built once and passed into every operation; nothing here is cached in
/// process-wide state.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Explicit block size override. Used when positive.
    pub block_size: Option<i64>,

    /// Block size supplied by the environment, unparsed.
    pub configured_block_size: Option<String>,

    /// Directory export files are written to.
    pub export_dir: PathBuf,

    /// Record stream format.
    pub file_type: FileType,

    /// How far a member's clock may drift from the coordinating timestamp
    /// before a warning is logged.
    pub clock_skew_tolerance: Duration,

    /// Cluster entry points for a client process.
    pub locators: Vec<Locator>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            block_size: None,
            configured_block_size: None,
            export_dir: PathBuf::from("."),
            file_type: FileType::Adp,
            clock_skew_tolerance: Duration::from_secs(1),
            locators: Vec::new(),
        }
    }
}

impl TransferConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration that picks up `ADP_BLOCK_SIZE` and
    /// `ADP_LOCATORS` from the environment.
    ///
    /// Unparseable locators are logged and left unset.
    pub fn from_env() -> Self {
        let config = Self {
            configured_block_size: std::env::var(BLOCK_SIZE_ENV).ok(),
            ..Default::default()
        };

        match std::env::var(LOCATORS_ENV) {
            Ok(raw) => config.clone().with_locators(&raw).unwrap_or_else(|e| {
                tracing::error!(value = %raw, error = %e, "Can't use configured locators");
                config
            }),
            Err(_) => config,
        }
    }

    /// Set an explicit block size.
    pub fn with_block_size(mut self, block_size: i64) -> Self {
        self.block_size = Some(block_size);
        self
    }

    /// Set the externally configured block size.
    pub fn with_configured_block_size(mut self, value: impl Into<String>) -> Self {
        self.configured_block_size = Some(value.into());
        self
    }

    /// Set the export directory.
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    /// Set the cluster locators from a `host[port],host[port]` list.
    pub fn with_locators(mut self, arg: &str) -> Result<Self> {
        self.locators = parse_locators(arg)?;
        Ok(self)
    }

    /// Set the clock skew tolerance.
    pub fn with_clock_skew_tolerance(mut self, tolerance: Duration) -> Self {
        self.clock_skew_tolerance = tolerance;
        self
    }

    /// Block size to use for this run.
    ///
    /// A positive override wins, then a valid configured value, then
    /// [`DEFAULT_BLOCK_SIZE`]. Invalid values are logged and skipped.
    pub fn resolved_block_size(&self) -> usize {
        let resolved = self
            .override_block_size()
            .or_else(|| self.env_block_size())
            .unwrap_or(DEFAULT_BLOCK_SIZE);

        tracing::debug!(block_size = resolved, "Block size selected");
        resolved
    }

    fn override_block_size(&self) -> Option<usize> {
        match self.block_size {
            Some(n) if n > 0 => Some(n as usize),
            Some(n) => {
                tracing::error!(block_size = n, "Can't use block size override, must be positive");
                None
            }
            None => None,
        }
    }

    fn env_block_size(&self) -> Option<usize> {
        let raw = self.configured_block_size.as_deref()?;
        match raw.trim().parse::<i64>() {
            Ok(n) if n > 0 => Some(n as usize),
            Ok(_) => {
                tracing::error!(value = raw, "Can't use configured block size, must be positive");
                None
            }
            Err(e) => {
                tracing::error!(value = raw, error = %e, "Can't use configured block size");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TransferConfig::default();
        assert_eq!(config.resolved_block_size(), DEFAULT_BLOCK_SIZE);
        assert_eq!(config.export_dir, PathBuf::from("."));
        assert_eq!(config.clock_skew_tolerance, Duration::from_secs(1));
        assert!(config.locators.is_empty());
    }

    #[test]
    fn test_locators() {
        let config = TransferConfig::new()
            .with_locators("alpha[10334],beta:10335")
            .unwrap();
        assert_eq!(
            config.locators,
            vec![Locator::new("alpha", 10334), Locator::new("beta", 10335)]
        );

        assert!(TransferConfig::new().with_locators("alpha[10334]").is_err());
    }

    #[test]
    fn test_override_wins() {
        let config = TransferConfig::new()
            .with_configured_block_size("50")
            .with_block_size(7);
        assert_eq!(config.resolved_block_size(), 7);
    }

    #[test]
    fn test_configured_value_used_without_override() {
        let config = TransferConfig::new().with_configured_block_size(" 250 ");
        assert_eq!(config.resolved_block_size(), 250);
    }

    #[test]
    fn test_invalid_values_fall_back_to_default() {
        let config = TransferConfig::new().with_block_size(0);
        assert_eq!(config.resolved_block_size(), DEFAULT_BLOCK_SIZE);

        let config = TransferConfig::new().with_configured_block_size("lots");
        assert_eq!(config.resolved_block_size(), DEFAULT_BLOCK_SIZE);

        let config = TransferConfig::new()
            .with_block_size(-3)
            .with_configured_block_size("-1");
        assert_eq!(config.resolved_block_size(), DEFAULT_BLOCK_SIZE);
    }
}
