//! Window kernels and running averages for Tally time-averaged outputs.
//!
//! [`window`] holds the pure kernel functions and the trapezoidal
//! quadrature; [`average`] builds the incremental mean and the windowed
//! running average on top of them.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod average;
pub mod window;

pub use average::RunningAverage;
pub use window::{mean, weight, windowed_average, WindowKind, BUMP_NORMALIZATION};
