//! Calibrated index cache for Tally per-entity output.
//!
//! See [`IndexCache`] for the calibrate-then-replay protocol and its
//! ordering contract.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod fingerprint;
pub mod index;

pub use fingerprint::SequenceFingerprint;
pub use index::{CachePair, IndexCache};
