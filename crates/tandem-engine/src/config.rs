//! Run configuration, loaded from TOML.
//!
//! ```toml
//! compute_grid = [2, 1, 1]
//! recv_timeout_ms = 30000
//!
//! [checkpoint]
//! every = 1000
//! folder = "restart"
//!
//! [[plugins]]
//! kind = "stats"
//! name = "stats"
//! every = 100
//! vectors = ["solvent"]
//! path = "stats.csv"
//! ```

use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use indexmap::IndexSet;
use serde::Deserialize;
use tandem_core::{LayoutError, RankLayout, StepIndex};
use tandem_plugin::PluginSpec;

// ── CheckpointConfig ───────────────────────────────────────────────

/// When and where plugins checkpoint.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckpointConfig {
    /// Checkpoint every N steps. 0 disables checkpointing.
    #[serde(default)]
    pub every: u64,
    /// Folder handed to plugin checkpoint hooks.
    #[serde(default = "default_checkpoint_folder")]
    pub folder: PathBuf,
}

fn default_checkpoint_folder() -> PathBuf {
    PathBuf::from("restart")
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            every: 0,
            folder: default_checkpoint_folder(),
        }
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while loading or validating a [`RunConfig`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The TOML could not be parsed into a `RunConfig`.
    Parse {
        /// Parser message.
        reason: String,
    },
    /// The rank layout derived from the config is invalid.
    Layout(LayoutError),
    /// A compute grid dimension is zero.
    EmptyGrid {
        /// The rejected grid.
        compute_grid: [u32; 3],
    },
    /// A plugin declaration has an empty name.
    EmptyPluginName {
        /// Position of the declaration in `[[plugins]]`.
        index: usize,
    },
    /// A plugin declaration has an empty kind.
    EmptyKind {
        /// The plugin's name.
        plugin: String,
    },
    /// Two plugin declarations share a name.
    DuplicatePluginName {
        /// The repeated name.
        name: String,
    },
    /// `recv_timeout_ms` is zero.
    ZeroTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { reason } => write!(f, "invalid run config: {reason}"),
            Self::Layout(e) => write!(f, "layout: {e}"),
            Self::EmptyGrid { compute_grid } => {
                write!(f, "compute_grid {compute_grid:?} has a zero dimension")
            }
            Self::EmptyPluginName { index } => {
                write!(f, "plugin declaration #{index} has an empty name")
            }
            Self::EmptyKind { plugin } => write!(f, "plugin '{plugin}' has an empty kind"),
            Self::DuplicatePluginName { name } => {
                write!(f, "plugin name '{name}' is declared more than once")
            }
            Self::ZeroTimeout => write!(f, "recv_timeout_ms must be at least 1"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Layout(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LayoutError> for ConfigError {
    fn from(e: LayoutError) -> Self {
        Self::Layout(e)
    }
}

// ── RunConfig ──────────────────────────────────────────────────────

/// Everything a rank needs to set up its coordinator.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Number of compute ranks along each axis.
    pub compute_grid: [u32; 3],
    /// Checkpoint cadence and folder.
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    /// Receive timeout for consumer halves. Blocks forever when absent.
    #[serde(default)]
    pub recv_timeout_ms: Option<u64>,
    /// Plugins created on every rank, in order.
    #[serde(default)]
    pub plugins: Vec<PluginSpec>,
}

impl RunConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. Every grid dimension is non-zero.
        if self.compute_grid.contains(&0) {
            return Err(ConfigError::EmptyGrid {
                compute_grid: self.compute_grid,
            });
        }
        // 2. Timeout, if present, is positive.
        if self.recv_timeout_ms == Some(0) {
            return Err(ConfigError::ZeroTimeout);
        }
        // 3. Plugin declarations are named, typed and unique.
        let mut seen = IndexSet::with_capacity(self.plugins.len());
        for (index, spec) in self.plugins.iter().enumerate() {
            if spec.name.is_empty() {
                return Err(ConfigError::EmptyPluginName { index });
            }
            if spec.kind.is_empty() {
                return Err(ConfigError::EmptyKind {
                    plugin: spec.name.clone(),
                });
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(ConfigError::DuplicatePluginName {
                    name: spec.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Derive the rank partition for a world of `world_size` ranks.
    pub fn layout(&self, world_size: u32) -> Result<RankLayout, ConfigError> {
        Ok(RankLayout::new(self.compute_grid, world_size)?)
    }

    /// Receive timeout as a `Duration`.
    pub fn recv_timeout(&self) -> Option<Duration> {
        self.recv_timeout_ms.map(Duration::from_millis)
    }

    /// Whether a checkpoint is due after `step` has run.
    ///
    /// Step 0 never checkpoints.
    pub fn checkpoint_due(&self, step: StepIndex) -> bool {
        let every = self.checkpoint.every;
        every > 0 && step.0 > 0 && step.0 % every == 0
    }
}
