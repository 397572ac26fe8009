//! Tally: output fields, index caching and convergence monitoring for
//! iterative solvers.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Tally sub-crates. For most users, adding `tally` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use tally::prelude::*;
//!
//! // A contributor reporting one residual that drops by a decade per iteration.
//! struct Residual;
//! impl FieldContributor for Residual {
//!     fn name(&self) -> &str { "residual" }
//!     fn declare_history(&self, fields: &mut dyn HistoryDeclare) -> Result<(), ContributorError> {
//!         fields.add(HistoryField::new(
//!             "RMS_DENSITY", "rms[Rho]", ScreenFormat::Fixed, "RMS_RES", FieldKind::Residual, "",
//!         ))?;
//!         Ok(())
//!     }
//!     fn load_history(
//!         &self,
//!         it: &IterationInfo,
//!         out: &mut dyn HistorySink,
//!     ) -> Result<(), ContributorError> {
//!         out.set("RMS_DENSITY", -(it.inner as f64))?;
//!         Ok(())
//!     }
//! }
//!
//! let mut session = SessionBuilder::new()
//!     .with_contributor(Residual)
//!     .build(SessionConfig::default(), Box::new(SingleProcess))
//!     .unwrap();
//!
//! let converged_at = (0..100)
//!     .find(|&i| session.record_iteration(IterationInfo::inner(i)).unwrap().converged);
//! assert_eq!(converged_at, Some(8));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `tally-core` | Keys, field descriptors, errors, contributor and sink traits |
//! | [`signal`] | `tally-signal` | Window kernels and running averages |
//! | [`registry`] | `tally-registry` | History and volume registries, derived fields |
//! | [`cache`] | `tally-cache` | Calibrate-then-replay index cache |
//! | [`converge`] | `tally-converge` | Cauchy convergence monitors and rank collectives |
//! | [`session`] | `tally-session` | Session configuration, lifecycle and volume sweeps |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and keys (`tally-core`).
///
/// Contains field descriptors, error types, and the
/// [`types::FieldContributor`] extension point.
pub use tally_core as types;

/// Window kernels and running averages (`tally-signal`).
pub use tally_signal as signal;

/// History and volume field registries (`tally-registry`).
///
/// [`registry::HistoryRegistry`] for per-iteration scalars,
/// [`registry::VolumeRegistry`] for per-entity columns.
pub use tally_registry as registry;

/// Calibrated index cache (`tally-cache`).
pub use tally_cache as cache;

/// Convergence monitoring (`tally-converge`).
///
/// [`converge::ConvergenceMonitor`] for the inner loop,
/// [`converge::TimeConvergenceMonitor`] for windowed time averages, and
/// the [`converge::Communicator`] trait for multi-rank agreement.
pub use tally_converge as converge;

/// Output sessions (`tally-session`).
pub use tally_session as session;

/// Common imports for typical Tally usage.
///
/// ```rust
/// use tally::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use tally_core::{
        FieldContributor, FieldKey, FieldKind, HistoryDeclare, HistoryField, HistorySink,
        IterationInfo, ScreenFormat, VolumeDeclare, VolumeField, VolumeSink,
    };

    // Errors
    pub use tally_core::{CacheError, ContributorError, ConvergenceError, RegistryError};

    // Convergence
    pub use tally_converge::{ChannelComm, Communicator, SingleProcess};

    // Signal
    pub use tally_signal::{RunningAverage, WindowKind};

    // Session
    pub use tally_session::{
        IterationReport, OutputSession, SessionBuilder, SessionConfig, SessionError,
        SessionMetrics, SurfaceVertex,
    };
}
