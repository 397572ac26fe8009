//! Time-domain convergence on a bump-window time average.
//!
//! Evaluated once per time step after the inner loop has finished. The
//! monitored quantity is the bump-windowed running average of a designated
//! field, so the test asks whether the windowed mean of a periodic signal
//! has settled rather than whether the signal itself has.

use tally_core::{ConvergenceError, FieldKind};
use tracing::debug;

use crate::cauchy::CauchySeries;
use crate::monitor::Evaluation;

/// Parameters of the windowed time-convergence test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowCriterion {
    /// Evaluate the test at all. When `false` the decision is always
    /// `false`, but the Cauchy value is still tracked.
    pub enabled: bool,
    /// Number of successive differences summed.
    pub capacity: usize,
    /// Convergence threshold on the sum of differences.
    pub epsilon: f64,
    /// Threshold for residual-kind fields (log10 scale).
    pub min_log_residual: f64,
    /// Time iteration at which windowed averaging starts.
    pub start_window_iteration: u64,
    /// Time iterations after `start_window_iteration` that never count as
    /// converged.
    pub start_convergence_offset: u64,
}

impl Default for WindowCriterion {
    fn default() -> Self {
        Self {
            enabled: false,
            capacity: 100,
            epsilon: 1e-3,
            min_log_residual: -8.0,
            start_window_iteration: 0,
            start_convergence_offset: 15,
        }
    }
}

/// Windowed time-convergence state machine.
#[derive(Clone, Debug)]
pub struct TimeConvergenceMonitor {
    criterion: WindowCriterion,
    series: CauchySeries,
    /// Time iteration the series was last seeded at.
    window_origin: Option<u64>,
    previous: f64,
    current: f64,
    cauchy: f64,
}

impl TimeConvergenceMonitor {
    /// Create a monitor with an empty series.
    pub fn new(criterion: WindowCriterion) -> Self {
        Self {
            series: CauchySeries::new(criterion.capacity),
            criterion,
            window_origin: None,
            previous: 0.0,
            current: 0.0,
            cauchy: 1.0,
        }
    }

    /// Evaluate at `time_iteration`.
    ///
    /// `inner_done` is whether the inner loop converged or exhausted its
    /// budget for this time step. `kind` is the kind of the designated
    /// field and `windowed` its bump-windowed average. Before the window
    /// starts, or while the inner loop is still running, nothing is
    /// evaluated and the decision is `false`. The series is seeded at the
    /// window start, or at the first evaluation when that comes later, as
    /// after a restart.
    ///
    /// # Errors
    ///
    /// [`ConvergenceError::Diverged`] if `windowed` is NaN.
    pub fn evaluate(
        &mut self,
        time_iteration: u64,
        inner_done: bool,
        field: &str,
        kind: FieldKind,
        windowed: f64,
    ) -> Result<Evaluation, ConvergenceError> {
        let start = self.criterion.start_window_iteration;
        if !inner_done || time_iteration < start {
            let cauchy = (time_iteration == 0).then_some(1.0);
            return Ok(Evaluation {
                converged: false,
                cauchy,
            });
        }

        let mut converged = false;
        let mut cauchy = None;
        if kind.is_coefficient() {
            if time_iteration == start || self.window_origin.is_none() {
                self.series.clear();
                self.current = windowed;
                self.window_origin = Some(time_iteration);
            }
            let origin = self.window_origin.unwrap_or(start);
            self.previous = self.current;
            self.current = windowed;
            self.series
                .push(time_iteration, (self.current - self.previous).abs());
            self.cauchy = if time_iteration >= origin + self.series.capacity() as u64 {
                self.series.sum()
            } else {
                1.0
            };
            converged = self.cauchy < self.criterion.epsilon;
            cauchy = Some(self.cauchy);
        } else if kind.is_residual() {
            converged = windowed <= self.criterion.min_log_residual;
        }

        if time_iteration <= start + self.criterion.start_convergence_offset {
            converged = false;
        }
        if !self.criterion.enabled {
            converged = false;
        }

        if windowed.is_nan() {
            return Err(ConvergenceError::Diverged {
                field: field.to_string(),
                iteration: time_iteration,
            });
        }
        if converged {
            debug!(field, time_iteration, "windowed time average converged");
        }
        Ok(Evaluation { converged, cauchy })
    }

    /// Last Cauchy value (1 until a full series is available).
    pub fn cauchy_value(&self) -> f64 {
        self.cauchy
    }

    /// The test parameters.
    pub fn criterion(&self) -> &WindowCriterion {
        &self.criterion
    }
}
