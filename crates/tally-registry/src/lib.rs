//! History and volume field registries for the Tally output engine.
//!
//! [`HistoryRegistry`] holds the session-wide scalars reported once per
//! iteration, including per-surface fields split over boundary markers.
//! [`VolumeRegistry`] holds the per-entity fields and assigns results-table
//! columns to the requested ones. [`declare_derived`] adds the fields the
//! session computes from contributor-declared ones.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod derived;
pub mod history;
pub mod request;
pub mod volume;

pub use derived::{declare_derived, DerivedLayout, DerivedOptions};
pub use history::{HistoryRegistry, HistoryRequestReport, SurfaceFieldSet};
pub use request::{RequestList, RequestReport};
pub use volume::VolumeRegistry;
