//! Top-level error type for output sessions.

use std::error::Error;
use std::fmt;

use tally_core::{CacheError, ContributorError, ConvergenceError, RegistryError};

use crate::config::ConfigError;

/// Any error an [`OutputSession`](crate::OutputSession) can return.
///
/// All variants are fatal for the session. [`SessionError::Convergence`]
/// with [`ConvergenceError::Diverged`] means the run must stop without
/// saving further state.
#[derive(Debug, PartialEq)]
pub enum SessionError {
    /// Invalid configuration.
    Config(ConfigError),
    /// Field registration or lookup failed.
    Registry(RegistryError),
    /// Cached volume access failed.
    Cache(CacheError),
    /// Convergence monitoring failed or the run diverged.
    Convergence(ConvergenceError),
    /// A contributor failed.
    Contributor {
        /// The contributor's name.
        name: String,
        /// What went wrong.
        source: ContributorError,
    },
    /// A surface vertex referenced an entity outside the volume table.
    EntityOutOfRange {
        /// The offending entity index.
        entity: usize,
        /// Number of entities in the table.
        n_entities: usize,
    },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::Cache(e) => write!(f, "index cache: {e}"),
            Self::Convergence(e) => write!(f, "convergence: {e}"),
            Self::Contributor { name, source } => {
                write!(f, "contributor '{name}': {source}")
            }
            Self::EntityOutOfRange { entity, n_entities } => write!(
                f,
                "entity {entity} out of range for a volume table of {n_entities} entities"
            ),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Registry(e) => Some(e),
            Self::Cache(e) => Some(e),
            Self::Convergence(e) => Some(e),
            Self::Contributor { source, .. } => Some(source),
            Self::EntityOutOfRange { .. } => None,
        }
    }
}

impl From<ConfigError> for SessionError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<RegistryError> for SessionError {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

impl From<CacheError> for SessionError {
    fn from(e: CacheError) -> Self {
        Self::Cache(e)
    }
}

impl From<ConvergenceError> for SessionError {
    fn from(e: ConvergenceError) -> Self {
        Self::Convergence(e)
    }
}

/// Attach a contributor's name to its error.
pub(crate) fn contributor(name: &str) -> impl FnOnce(ContributorError) -> SessionError + '_ {
    move |source| SessionError::Contributor {
        name: name.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contributor_error_names_contributor() {
        let e = contributor("flow")(ContributorError::Failed {
            reason: "bad state".into(),
        });
        assert_eq!(e.to_string(), "contributor 'flow': contributor failed: bad state");
        assert!(e.source().is_some());
    }

    #[test]
    fn diverged_converts() {
        let e: SessionError = ConvergenceError::Diverged {
            field: "DRAG".into(),
            iteration: 3,
        }
        .into();
        assert!(matches!(
            e,
            SessionError::Convergence(ConvergenceError::Diverged { .. })
        ));
    }
}
