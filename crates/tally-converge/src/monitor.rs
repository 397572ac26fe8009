//! Inner-loop convergence: Cauchy test for coefficients, threshold test
//! for log-scaled residuals, unanimous agreement across ranks.

use tally_core::{ConvergenceError, FieldKind, HistoryField};
use tracing::debug;

use crate::cauchy::CauchySeries;
use crate::comm::{agree_all, Communicator};

/// Parameters of the inner convergence test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CauchyCriterion {
    /// Number of successive differences summed.
    pub capacity: usize,
    /// Convergence threshold on the sum of differences.
    pub epsilon: f64,
    /// Threshold for residual-kind fields (log10 scale).
    pub min_log_residual: f64,
    /// Iterations before this one never count as converged.
    pub start_iteration: u64,
}

impl Default for CauchyCriterion {
    fn default() -> Self {
        Self {
            capacity: 100,
            epsilon: 1e-10,
            min_log_residual: -8.0,
            start_iteration: 5,
        }
    }
}

/// Result of one convergence evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Evaluation {
    /// Global decision.
    pub converged: bool,
    /// Cauchy value to publish, when the test produced one.
    pub cauchy: Option<f64>,
}

/// Inner-loop convergence state machine.
///
/// States are accumulating and converged. The state resets whenever
/// iteration 0 is evaluated; once the group agrees on convergence the
/// decision holds until that reset.
#[derive(Clone, Debug)]
pub struct ConvergenceMonitor {
    criterion: CauchyCriterion,
    series: CauchySeries,
    previous: f64,
    current: f64,
    cauchy: f64,
    converged: bool,
}

impl ConvergenceMonitor {
    /// Create a monitor in the accumulating state.
    pub fn new(criterion: CauchyCriterion) -> Self {
        Self {
            series: CauchySeries::new(criterion.capacity),
            criterion,
            previous: 0.0,
            current: 0.0,
            cauchy: 1.0,
            converged: false,
        }
    }

    /// Evaluate `field` at `iteration` and agree on the outcome with every
    /// rank in `comm`.
    ///
    /// Every rank takes part in the collective before the NaN check, so a
    /// diverged rank does not leave its peers blocked.
    ///
    /// # Errors
    ///
    /// [`ConvergenceError::Diverged`] if the monitored value is NaN;
    /// [`ConvergenceError::Comm`] if the collective fails.
    pub fn evaluate(
        &mut self,
        iteration: u64,
        field: &HistoryField,
        comm: &dyn Communicator,
    ) -> Result<Evaluation, ConvergenceError> {
        let monitor = field.value;
        if iteration == 0 {
            self.reset();
            self.current = monitor;
        }

        let mut local = false;
        let mut cauchy = None;
        if field.kind.is_coefficient() {
            self.previous = self.current;
            self.current = monitor;
            self.series
                .push(iteration, (self.current - self.previous).abs());
            self.cauchy = if iteration >= self.series.capacity() as u64 {
                self.series.sum()
            } else {
                1.0
            };
            local = self.cauchy < self.criterion.epsilon;
            cauchy = Some(self.cauchy);
        } else if field.kind.is_residual() {
            local = iteration != 0 && monitor <= self.criterion.min_log_residual;
        }
        if iteration < self.criterion.start_iteration {
            local = false;
        }

        let converged = agree_all(comm, self.converged || local)?;

        if monitor.is_nan() {
            return Err(ConvergenceError::Diverged {
                field: field.key.to_string(),
                iteration,
            });
        }

        if converged && !self.converged {
            debug!(field = %field.key, iteration, "inner loop converged");
        }
        self.converged = converged;
        Ok(Evaluation { converged, cauchy })
    }

    /// Return to the accumulating state with an empty series.
    pub fn reset(&mut self) {
        self.series.clear();
        self.previous = 0.0;
        self.current = 0.0;
        self.cauchy = 1.0;
        self.converged = false;
    }

    /// Current decision.
    pub fn is_converged(&self) -> bool {
        self.converged
    }

    /// Last Cauchy value (1 until a full series is available).
    pub fn cauchy_value(&self) -> f64 {
        self.cauchy
    }

    /// The test parameters.
    pub fn criterion(&self) -> &CauchyCriterion {
        &self.criterion
    }
}

/// Whether `kind` has a convergence test. Other kinds never converge.
pub fn is_monitorable(kind: FieldKind) -> bool {
    kind.is_coefficient() || kind.is_residual()
}
