//! Session configuration, validation, and error types.
//!
//! [`SessionConfig`] is the builder input for an
//! [`OutputSession`](crate::OutputSession). It carries what a solver's
//! configuration layer has already parsed: requested output lists, iteration
//! budgets, write frequencies and the parameters of both convergence tests.
//! [`validate()`](SessionConfig::validate) checks the structural invariants
//! before any field is registered.

use std::error::Error;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use tally_converge::{CauchyCriterion, WindowCriterion};

// ── ConvergenceConfig ──────────────────────────────────────────────

/// Inner-loop convergence test on a monitored history field.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConvergenceConfig {
    /// Key of the monitored history field. Default: `"RMS_DENSITY"`.
    pub field: String,
    /// Cauchy series length. Default: 100.
    pub capacity: usize,
    /// Threshold on the Cauchy sum. Default: 1e-10.
    pub epsilon: f64,
    /// Threshold on log10 residuals. Default: -8.
    pub min_log_residual: f64,
    /// First inner iteration at which convergence may be declared. Default: 5.
    pub start_iteration: u64,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        let c = CauchyCriterion::default();
        Self {
            field: "RMS_DENSITY".to_string(),
            capacity: c.capacity,
            epsilon: c.epsilon,
            min_log_residual: c.min_log_residual,
            start_iteration: c.start_iteration,
        }
    }
}

impl ConvergenceConfig {
    /// Parameters for [`ConvergenceMonitor`](tally_converge::ConvergenceMonitor).
    pub fn criterion(&self) -> CauchyCriterion {
        CauchyCriterion {
            capacity: self.capacity,
            epsilon: self.epsilon,
            min_log_residual: self.min_log_residual,
            start_iteration: self.start_iteration,
        }
    }
}

// ── WindowConvergenceConfig ────────────────────────────────────────

/// Time-domain convergence test on a bump-windowed time average.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WindowConvergenceConfig {
    /// Whether the test can end the run. Default: false.
    pub enabled: bool,
    /// Key of the field whose windowed average is monitored. Default: none.
    pub field: Option<String>,
    /// Cauchy series length. Default: 100.
    pub capacity: usize,
    /// Threshold on the Cauchy sum. Default: 1e-3.
    pub epsilon: f64,
    /// Threshold on log10 residuals. Default: -8.
    pub min_log_residual: f64,
    /// Time iteration at which windowed averaging starts. Default: 0.
    pub start_window_iteration: u64,
    /// Time iterations after the window start that never count as
    /// converged. Default: 15.
    pub start_convergence_offset: u64,
}

impl Default for WindowConvergenceConfig {
    fn default() -> Self {
        let c = WindowCriterion::default();
        Self {
            enabled: c.enabled,
            field: None,
            capacity: c.capacity,
            epsilon: c.epsilon,
            min_log_residual: c.min_log_residual,
            start_window_iteration: c.start_window_iteration,
            start_convergence_offset: c.start_convergence_offset,
        }
    }
}

impl WindowConvergenceConfig {
    /// Parameters for
    /// [`TimeConvergenceMonitor`](tally_converge::TimeConvergenceMonitor).
    pub fn criterion(&self) -> WindowCriterion {
        WindowCriterion {
            enabled: self.enabled,
            capacity: self.capacity,
            epsilon: self.epsilon,
            min_log_residual: self.min_log_residual,
            start_window_iteration: self.start_window_iteration,
            start_convergence_offset: self.start_convergence_offset,
        }
    }
}

// ── WriteFrequency ─────────────────────────────────────────────────

/// Output frequency per iteration level. 0 means "never" at that level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WriteFrequency {
    /// Every n-th time iteration.
    pub time: u64,
    /// Every n-th outer iteration.
    pub outer: u64,
    /// Every n-th inner iteration.
    pub inner: u64,
}

impl Default for WriteFrequency {
    fn default() -> Self {
        Self {
            time: 1,
            outer: 1,
            inner: 1,
        }
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`SessionConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// A Cauchy series capacity is zero.
    ZeroCapacity {
        /// Which test the capacity belongs to.
        which: &'static str,
    },
    /// An epsilon is NaN, infinite, zero or negative.
    InvalidEpsilon {
        /// Which test the epsilon belongs to.
        which: &'static str,
        /// The invalid value.
        value: f64,
    },
    /// A residual threshold is NaN.
    InvalidResidualThreshold {
        /// Which test the threshold belongs to.
        which: &'static str,
    },
    /// An iteration budget is zero.
    ZeroIterationBudget {
        /// Which loop the budget belongs to.
        which: &'static str,
    },
    /// The volume write frequency is zero.
    ZeroVolumeFrequency,
    /// The time step is NaN, infinite or negative.
    InvalidTimeStep {
        /// The invalid value.
        value: f64,
    },
    /// A monitored field name is empty.
    EmptyFieldName {
        /// Which test the name belongs to.
        which: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCapacity { which } => {
                write!(f, "{which} Cauchy capacity must be at least 1")
            }
            Self::InvalidEpsilon { which, value } => {
                write!(f, "{which} epsilon must be finite and positive, got {value}")
            }
            Self::InvalidResidualThreshold { which } => {
                write!(f, "{which} min log residual must not be NaN")
            }
            Self::ZeroIterationBudget { which } => {
                write!(f, "{which} iteration budget must be at least 1")
            }
            Self::ZeroVolumeFrequency => write!(f, "volume write frequency must be at least 1"),
            Self::InvalidTimeStep { value } => {
                write!(f, "time step must be finite and non-negative, got {value}")
            }
            Self::EmptyFieldName { which } => {
                write!(f, "{which} monitored field name is empty")
            }
        }
    }
}

impl Error for ConfigError {}

// ── SessionConfig ──────────────────────────────────────────────────

/// Complete configuration of an output session.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionConfig {
    /// History file request: field keys or groups.
    pub history_fields: Vec<String>,
    /// Screen request: field keys.
    pub screen_fields: Vec<String>,
    /// Volume request: field keys or groups.
    pub volume_fields: Vec<String>,
    /// Whether the run is time-accurate. Enables time averages.
    pub time_domain: bool,
    /// Whether this session belongs to one zone of a multizone run.
    pub multizone: bool,
    /// Print per-zone convergence in multizone runs.
    pub write_zone_convergence: bool,
    /// Whether this session reports the outer loop of a multizone driver.
    ///
    /// A driver session monitors convergence on the outer iteration and
    /// declares no relative, averaged or windowed history fields; only the
    /// Cauchy fields are derived. The windowed time test does not run.
    /// Default: false.
    pub driver: bool,
    /// Time iteration budget. Default: 1.
    pub time_iterations: u64,
    /// Outer iteration budget. Default: 1.
    pub outer_iterations: u64,
    /// Inner iteration budget. Default: 1000.
    pub inner_iterations: u64,
    /// Time iteration the run restarted from, if any.
    pub restart_iteration: Option<u64>,
    /// Physical time step, published as `TIME_STEP`. Default: 0.
    pub time_step: f64,
    /// Inner convergence test.
    pub convergence: ConvergenceConfig,
    /// Windowed time-convergence test.
    pub window_convergence: WindowConvergenceConfig,
    /// Screen output frequency.
    pub screen_frequency: WriteFrequency,
    /// History file output frequency.
    pub history_frequency: WriteFrequency,
    /// Volume output frequency (every n-th iteration). Default: 250.
    pub volume_frequency: u64,
    /// Whether this session writes anything at all. Default: true.
    pub write_output: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_fields: vec!["ITER".to_string(), "RMS_RES".to_string()],
            screen_fields: vec!["INNER_ITER".to_string()],
            volume_fields: Vec::new(),
            time_domain: false,
            multizone: false,
            write_zone_convergence: true,
            driver: false,
            time_iterations: 1,
            outer_iterations: 1,
            inner_iterations: 1000,
            restart_iteration: None,
            time_step: 0.0,
            convergence: ConvergenceConfig::default(),
            window_convergence: WindowConvergenceConfig::default(),
            screen_frequency: WriteFrequency::default(),
            history_frequency: WriteFrequency::default(),
            volume_frequency: 250,
            write_output: true,
        }
    }
}

impl SessionConfig {
    /// Check structural invariants.
    ///
    /// Existence of the monitored fields is checked later, once every
    /// contributor has declared its fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let inner = &self.convergence;
        if inner.field.is_empty() {
            return Err(ConfigError::EmptyFieldName { which: "inner" });
        }
        check_criterion("inner", inner.capacity, inner.epsilon, inner.min_log_residual)?;

        let wnd = &self.window_convergence;
        if wnd.field.as_deref() == Some("") {
            return Err(ConfigError::EmptyFieldName { which: "windowed" });
        }
        check_criterion("windowed", wnd.capacity, wnd.epsilon, wnd.min_log_residual)?;

        for (which, budget) in [
            ("time", self.time_iterations),
            ("outer", self.outer_iterations),
            ("inner", self.inner_iterations),
        ] {
            if budget == 0 {
                return Err(ConfigError::ZeroIterationBudget { which });
            }
        }
        if self.volume_frequency == 0 {
            return Err(ConfigError::ZeroVolumeFrequency);
        }
        if !self.time_step.is_finite() || self.time_step < 0.0 {
            return Err(ConfigError::InvalidTimeStep {
                value: self.time_step,
            });
        }
        Ok(())
    }

    /// Time iteration a restarted time-domain run resumed from; 0 otherwise.
    pub fn restart_time_iteration(&self) -> u64 {
        match self.restart_iteration {
            Some(it) if self.time_domain => it,
            _ => 0,
        }
    }
}

fn check_criterion(
    which: &'static str,
    capacity: usize,
    epsilon: f64,
    min_log_residual: f64,
) -> Result<(), ConfigError> {
    if capacity == 0 {
        return Err(ConfigError::ZeroCapacity { which });
    }
    if !epsilon.is_finite() || epsilon <= 0.0 {
        return Err(ConfigError::InvalidEpsilon {
            which,
            value: epsilon,
        });
    }
    if min_log_residual.is_nan() {
        return Err(ConfigError::InvalidResidualThreshold { which });
    }
    Ok(())
}
