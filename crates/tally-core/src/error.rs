//! Error types for the Tally output engine.
//!
//! Organized by subsystem: registry (field declaration and lookup), index
//! cache (calibrated replay), rank collectives, convergence monitoring,
//! and contributors.
//! Every variant here is fatal for the session that produced it; the
//! recoverable configuration case (a request that matches nothing) is
//! reported through `RequestReport`, not through an error.

use std::error::Error;
use std::fmt;

use crate::field::FieldScope;
use crate::id::FieldKey;

/// Errors from field registration and lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// Two collaborators declared the same key in the same scope.
    DuplicateField {
        /// The offending key.
        key: FieldKey,
        /// Registry the key collided in.
        scope: FieldScope,
    },
    /// A value was set or read under a key that was never declared.
    UnknownField {
        /// The offending key.
        key: String,
        /// Registry the lookup ran against.
        scope: FieldScope,
    },
    /// A per-surface value was set for a marker index past the marker list.
    MarkerOutOfRange {
        /// The per-surface field key.
        key: String,
        /// Requested marker index.
        index: usize,
        /// Number of markers the field was declared with.
        markers: usize,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateField { key, scope } => {
                write!(f, "{scope} field '{key}' is already registered")
            }
            Self::UnknownField { key, scope } => {
                write!(f, "cannot find {scope} output field with name '{key}'")
            }
            Self::MarkerOutOfRange {
                key,
                index,
                markers,
            } => write!(
                f,
                "marker index {index} out of range for per-surface field '{key}' ({markers} markers)"
            ),
        }
    }
}

impl Error for RegistryError {}

/// Errors from the calibrated index cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheError {
    /// A name looked up during calibration is not registered.
    UnknownField {
        /// The offending name.
        name: String,
    },
    /// An entity replayed a different number of accesses than calibration
    /// recorded.
    CountMismatch {
        /// Accesses recorded during calibration.
        recorded: usize,
        /// Accesses made by the replaying entity.
        replayed: usize,
    },
    /// A replayed access named a different field than the calibration
    /// access at the same slot (debug builds only).
    SequenceMismatch {
        /// Slot at which the sequences diverged.
        slot: usize,
        /// Name passed on replay.
        name: String,
    },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField { name } => {
                write!(f, "cannot find output field with name '{name}'")
            }
            Self::CountMismatch { recorded, replayed } => write!(
                f,
                "index cache order violation: calibrated {recorded} accesses, replayed {replayed}"
            ),
            Self::SequenceMismatch { slot, name } => write!(
                f,
                "index cache order violation: slot {slot} replayed as '{name}'"
            ),
        }
    }
}

impl Error for CacheError {}

/// Errors from the collective operations behind distributed agreement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommError {
    /// A peer rank hung up before the collective completed.
    Disconnected {
        /// Rank of the peer that went away.
        peer: usize,
    },
}

impl fmt::Display for CommError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected { peer } => {
                write!(f, "rank {peer} disconnected during a collective")
            }
        }
    }
}

impl Error for CommError {}

/// Errors from convergence monitoring.
#[derive(Clone, Debug, PartialEq)]
pub enum ConvergenceError {
    /// The monitored value is NaN. The run must stop without saving.
    Diverged {
        /// Field whose value was NaN.
        field: String,
        /// Iteration at which it was observed.
        iteration: u64,
    },
    /// The monitored field is not registered.
    MissingField {
        /// The configured field name.
        field: String,
    },
    /// The agreement collective failed.
    Comm(CommError),
}

impl fmt::Display for ConvergenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Diverged { field, iteration } => write!(
                f,
                "solution diverged: NaN detected in '{field}' at iteration {iteration}"
            ),
            Self::MissingField { field } => {
                write!(f, "convergence monitoring field '{field}' not available")
            }
            Self::Comm(e) => write!(f, "convergence agreement: {e}"),
        }
    }
}

impl Error for ConvergenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Comm(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CommError> for ConvergenceError {
    fn from(e: CommError) -> Self {
        Self::Comm(e)
    }
}

/// Errors raised by, or on behalf of, a field contributor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContributorError {
    /// The contributor itself failed.
    Failed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// A registry operation issued by the contributor failed.
    Registry(RegistryError),
    /// A cached volume access issued by the contributor failed.
    Cache(CacheError),
}

impl fmt::Display for ContributorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "contributor failed: {reason}"),
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::Cache(e) => write!(f, "index cache: {e}"),
        }
    }
}

impl Error for ContributorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Registry(e) => Some(e),
            Self::Cache(e) => Some(e),
            Self::Failed { .. } => None,
        }
    }
}

impl From<RegistryError> for ContributorError {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

impl From<CacheError> for ContributorError {
    fn from(e: CacheError) -> Self {
        Self::Cache(e)
    }
}
