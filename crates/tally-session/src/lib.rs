//! Output session for the Tally engine.
//!
//! An [`OutputSession`] owns everything a solver's output layer keeps
//! between iterations: the history and volume registries, both
//! convergence monitors, the volume results table and its index caches.
//! It is built once by [`SessionBuilder`] from a [`SessionConfig`] and a
//! set of [`FieldContributor`](tally_core::FieldContributor)s, then driven
//! by [`OutputSession::record_iteration`] and
//! [`OutputSession::collect_volume`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod common;
pub mod config;
pub mod error;
pub mod history;
pub mod metrics;
pub mod schedule;
pub mod session;
pub mod volume;

pub use config::{
    ConfigError, ConvergenceConfig, SessionConfig, WindowConvergenceConfig, WriteFrequency,
};
pub use error::SessionError;
pub use history::{HistoryColumn, HistoryPostprocessor, ScreenCell};
pub use metrics::SessionMetrics;
pub use schedule::WriteSchedule;
pub use session::{IterationReport, OutputSession, SessionBuilder};
pub use volume::{SurfaceVertex, VolumeSnapshot, VolumeTable, VolumeWriter};
