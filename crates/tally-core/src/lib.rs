//! Core types and traits for the Tally output and convergence engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the Tally workspace:
//! field keys, field descriptors, error types, and the contributor traits.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod field;
pub mod id;
pub mod traits;

pub use error::{CacheError, CommError, ContributorError, ConvergenceError, RegistryError};
pub use field::{FieldKind, FieldScope, HistoryField, ScreenFormat, VolumeField};
pub use id::{ColumnId, FieldKey, MarkerList};
pub use traits::{
    FieldContributor, HistoryDeclare, HistorySink, IterationInfo, VolumeDeclare, VolumeSink,
};
