//! Error types for the Tandem coordination layer.
//!
//! Organized by subsystem: rank layout (bootstrap), channel (transport),
//! plugin (individual hook execution) and coordinator (registration,
//! dispatch and lifecycle). Every coordinator error names the rank role,
//! and every error tied to a plugin names the plugin, so logs from
//! different ranks can be lined up.

use std::error::Error;
use std::fmt;

use crate::id::StepIndex;
use crate::lifecycle::LifecycleState;
use crate::role::Role;

/// Errors from deriving the rank partition at bootstrap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutError {
    /// A compute grid dimension is zero.
    EmptyGrid {
        /// The rejected grid.
        compute_grid: [u32; 3],
    },
    /// The world size is neither the grid cell count nor twice that.
    RankCountMismatch {
        /// The requested compute grid.
        compute_grid: [u32; 3],
        /// The number of ranks actually launched.
        world_size: u32,
    },
    /// A rank index outside the world was looked up.
    RankOutOfRange {
        /// The offending rank.
        rank: u32,
        /// Number of ranks in the world.
        world_size: u32,
    },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyGrid { compute_grid } => {
                let [x, y, z] = compute_grid;
                write!(f, "compute grid {x} x {y} x {z} has a zero dimension")
            }
            Self::RankCountMismatch {
                compute_grid,
                world_size,
            } => {
                let [x, y, z] = compute_grid;
                write!(
                    f,
                    "asked for {x} x {y} x {z} compute ranks, but {world_size} ranks were \
                     launched (expected the grid size, or twice it for postprocessing)"
                )
            }
            Self::RankOutOfRange { rank, world_size } => {
                write!(f, "rank {rank} is outside a world of {world_size} ranks")
            }
        }
    }
}

impl Error for LayoutError {}

/// Errors from moving payloads between a producer and its consumer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelError {
    /// The other end of the channel is gone.
    Disconnected {
        /// Channel name.
        channel: String,
    },
    /// No frame arrived within the transport's receive timeout.
    Timeout {
        /// Channel name.
        channel: String,
    },
    /// A payload could not be decoded (truncated or corrupt).
    Malformed {
        /// What went wrong.
        detail: String,
    },
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected { channel } => write!(f, "channel '{channel}' disconnected"),
            Self::Timeout { channel } => write!(f, "timed out waiting on channel '{channel}'"),
            Self::Malformed { detail } => write!(f, "malformed payload: {detail}"),
        }
    }
}

impl Error for ChannelError {}

/// Errors returned by a single plugin hook.
///
/// Wrapped in [`CoordinatorError::PluginFailed`] by the coordinator, which
/// adds the plugin name, role, hook and step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PluginError {
    /// The hook failed for a plugin-specific reason.
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// A creation argument is missing or has the wrong shape.
    InvalidArgument {
        /// What is wrong with the argument.
        reason: String,
    },
    /// The hook needs engine state the caller did not provide.
    MissingState {
        /// What was missing (e.g. a particle vector name).
        what: String,
    },
    /// Sending or receiving a payload failed.
    Channel(ChannelError),
    /// A consumer received a frame for a different step than expected.
    OutOfOrder {
        /// Channel name.
        channel: String,
        /// The step the consumer is at.
        expected: StepIndex,
        /// The step stamped on the frame.
        received: StepIndex,
    },
    /// Writing or reading a plugin's own files failed.
    Io {
        /// The formatted I/O error.
        reason: String,
    },
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionFailed { reason } => write!(f, "execution failed: {reason}"),
            Self::InvalidArgument { reason } => write!(f, "invalid argument: {reason}"),
            Self::MissingState { what } => write!(f, "missing engine state: {what}"),
            Self::Channel(e) => write!(f, "channel: {e}"),
            Self::OutOfOrder {
                channel,
                expected,
                received,
            } => write!(
                f,
                "channel '{channel}' delivered step {received} while at step {expected}"
            ),
            Self::Io { reason } => write!(f, "I/O error: {reason}"),
        }
    }
}

impl Error for PluginError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Channel(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ChannelError> for PluginError {
    fn from(e: ChannelError) -> Self {
        Self::Channel(e)
    }
}

impl From<std::io::Error> for PluginError {
    fn from(e: std::io::Error) -> Self {
        Self::Io {
            reason: e.to_string(),
        }
    }
}

/// The plugin hook a failure came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PluginHook {
    /// One-time setup before the first step.
    Setup,
    /// Per-step hook.
    Step,
    /// Checkpoint hook.
    Checkpoint,
    /// Teardown hook.
    Finalize,
}

impl fmt::Display for PluginHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Setup => "setup",
            Self::Step => "step",
            Self::Checkpoint => "checkpoint",
            Self::Finalize => "finalize",
        })
    }
}

/// Errors from the coordinator: setup defects, invariant violations and
/// fatal plugin failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoordinatorError {
    /// Another coordinator is already active in this process.
    AlreadyActive {
        /// Role of the coordinator that was refused.
        role: Role,
    },
    /// The call requires an active coordinator.
    NotActive {
        /// The refused operation.
        operation: &'static str,
        /// Role of this coordinator.
        role: Role,
        /// The state it is actually in.
        state: LifecycleState,
    },
    /// A plugin half was offered to a rank of the other role.
    RoleMismatch {
        /// Plugin name.
        plugin: String,
        /// Role of this rank.
        role: Role,
        /// Role the plugin half belongs to.
        half: Role,
    },
    /// A creation or registration argument is invalid, including a
    /// duplicate name within the role-local list.
    InvalidArgument {
        /// Plugin name.
        plugin: String,
        /// Role of this rank.
        role: Role,
        /// What is wrong.
        reason: String,
    },
    /// No plugin kind is registered under this name.
    UnknownKind {
        /// The requested kind.
        kind: String,
        /// Plugin name.
        plugin: String,
        /// Role of this rank.
        role: Role,
    },
    /// A plugin hook failed. Fatal for the whole run.
    PluginFailed {
        /// Plugin name.
        plugin: String,
        /// Role of this rank.
        role: Role,
        /// Which hook failed.
        hook: PluginHook,
        /// Coordinator step at the time of failure.
        step: StepIndex,
        /// The underlying plugin error.
        reason: PluginError,
    },
}

impl fmt::Display for CoordinatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyActive { role } => write!(
                f,
                "[{role}] a coordinator is already active in this process"
            ),
            Self::NotActive {
                operation,
                role,
                state,
            } => write!(f, "[{role}] cannot {operation}: coordinator is {state}"),
            Self::RoleMismatch { plugin, role, half } => write!(
                f,
                "[{role}] plugin '{plugin}' is a {half} half and cannot be registered here"
            ),
            Self::InvalidArgument {
                plugin,
                role,
                reason,
            } => write!(f, "[{role}] plugin '{plugin}': {reason}"),
            Self::UnknownKind { kind, plugin, role } => {
                write!(f, "[{role}] plugin '{plugin}': unknown plugin kind '{kind}'")
            }
            Self::PluginFailed {
                plugin,
                role,
                hook,
                step,
                reason,
            } => write!(
                f,
                "[{role}] plugin '{plugin}' failed in {hook} at step {step}: {reason}"
            ),
        }
    }
}

impl Error for CoordinatorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::PluginFailed { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_failure_names_plugin_and_role() {
        let err = CoordinatorError::PluginFailed {
            plugin: "stats".into(),
            role: Role::Postprocess,
            hook: PluginHook::Step,
            step: StepIndex(7),
            reason: PluginError::ExecutionFailed {
                reason: "disk full".into(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("postprocess"));
        assert!(msg.contains("'stats'"));
        assert!(msg.contains("step 7"));
        assert!(msg.contains("disk full"));
        assert!(err.source().is_some());
    }

    #[test]
    fn channel_error_chains_through_plugin_error() {
        let err = PluginError::from(ChannelError::Timeout {
            channel: "mesh".into(),
        });
        assert!(err.to_string().contains("mesh"));
        assert!(err.source().is_some());
    }

    #[test]
    fn io_error_converts_to_plugin_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such dir");
        match PluginError::from(io) {
            PluginError::Io { reason } => assert!(reason.contains("no such dir")),
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn layout_mismatch_message_mentions_counts() {
        let err = LayoutError::RankCountMismatch {
            compute_grid: [2, 1, 1],
            world_size: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("2 x 1 x 1"));
        assert!(msg.contains('3'));
    }
}
