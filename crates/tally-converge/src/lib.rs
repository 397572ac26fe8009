//! Convergence monitoring for the Tally output engine.
//!
//! Two independent tests share the Cauchy-series mechanics in
//! [`CauchySeries`]:
//!
//! - [`ConvergenceMonitor`] decides whether the inner loop has converged,
//!   and agrees on the decision across ranks through a [`Communicator`].
//! - [`TimeConvergenceMonitor`] decides whether the bump-windowed time
//!   average of a designated field has settled, once per time step.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cauchy;
pub mod comm;
pub mod monitor;
pub mod windowed;

pub use cauchy::CauchySeries;
pub use comm::{agree_all, ChannelComm, Communicator, SingleProcess};
pub use monitor::{is_monitorable, CauchyCriterion, ConvergenceMonitor, Evaluation};
pub use windowed::{TimeConvergenceMonitor, WindowCriterion};
