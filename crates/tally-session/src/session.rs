//! The output session: registration at build time, then per-iteration
//! history evaluation, convergence decisions and volume collection.
//!
//! # Lifecycle
//!
//! 1. [`SessionBuilder`] collects the contributors.
//! 2. [`SessionBuilder::build`] validates the configuration, runs every
//!    declaration, adds the derived fields, checks the output requests
//!    and activates the requested volume columns. The field set is frozen
//!    afterwards.
//! 3. [`OutputSession::record_iteration`] runs once per iteration and
//!    reports both convergence decisions and which rows are due.
//! 4. [`OutputSession::collect_volume`] fills the volume table whenever
//!    the driver wants a snapshot.

use std::time::Instant;

use tracing::{debug, info, warn};

use tally_cache::CachePair;
use tally_converge::{Communicator, ConvergenceMonitor, TimeConvergenceMonitor};
use tally_core::{
    ConvergenceError, FieldContributor, FieldKey, FieldKind, HistoryField, IterationInfo,
};
use tally_registry::derived::{CAUCHY_KEY, TIME_WND_CAUCHY_KEY};
use tally_registry::{
    declare_derived, DerivedOptions, HistoryRegistry, RequestList, RequestReport, VolumeRegistry,
};
use tally_signal::{RunningAverage, WindowKind};

use crate::common::{self, CommonFields};
use crate::config::SessionConfig;
use crate::error::{contributor, SessionError};
use crate::history::{self, HistoryColumn, HistoryPostprocessor, ScreenCell};
use crate::metrics::SessionMetrics;
use crate::schedule::WriteSchedule;
use crate::volume::{SurfaceVertex, VolumeSnapshot, VolumeSweep, VolumeTable};

// ── Builder ────────────────────────────────────────────────────────

/// Collects contributors ahead of the registration phase.
#[derive(Default)]
pub struct SessionBuilder {
    contributors: Vec<Box<dyn FieldContributor>>,
}

impl SessionBuilder {
    /// Create a builder with no contributors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a contributor. Declarations run in the order added.
    pub fn with_contributor(mut self, c: impl FieldContributor + 'static) -> Self {
        self.contributors.push(Box::new(c));
        self
    }

    /// Add an already boxed contributor.
    pub fn add_contributor(&mut self, c: Box<dyn FieldContributor>) -> &mut Self {
        self.contributors.push(c);
        self
    }

    /// Run the registration phase and freeze the field set.
    ///
    /// # Errors
    ///
    /// Invalid configuration, a failing or colliding declaration, or a
    /// monitored field that no contributor declared.
    pub fn build(
        self,
        config: SessionConfig,
        comm: Box<dyn Communicator + Send>,
    ) -> Result<OutputSession, SessionError> {
        config.validate()?;
        let root = comm.is_root();

        let mut history = HistoryRegistry::new();
        let mut volume = VolumeRegistry::new();
        common::declare(&mut history)?;
        for c in &self.contributors {
            c.declare_history(&mut history)
                .map_err(contributor(c.name()))?;
            c.declare_volume(&mut volume)
                .map_err(contributor(c.name()))?;
        }

        let convergence_field = FieldKey::from(config.convergence.field.as_str());
        let monitored_kind = monitored(&history, convergence_field.as_str())?.kind;
        if root && !tally_converge::is_monitorable(monitored_kind) {
            warn!(
                field = %convergence_field,
                "monitored field is neither a residual nor a coefficient; the inner loop never converges"
            );
        }

        let window = match config.window_convergence.field.as_deref() {
            Some(name) if config.time_domain && !config.driver => {
                let kind = monitored(&history, name)?.kind;
                let key = FieldKey::from(name);
                if root && !tally_converge::is_monitorable(kind) {
                    warn!(
                        field = %key,
                        "windowed monitored field is neither a residual nor a coefficient; the time average never converges"
                    );
                }
                let averaged = if kind.is_coefficient() {
                    key.prefixed(WindowKind::Bump.field_prefix())
                } else {
                    key.clone()
                };
                Some(WindowTarget {
                    key,
                    averaged,
                    kind,
                })
            }
            _ => None,
        };

        let layout = declare_derived(
            &mut history,
            &DerivedOptions {
                time_domain: config.time_domain,
                convergence_field: Some(convergence_field.as_str()),
                window_field: config.window_convergence.field.as_deref(),
                cauchy_only: config.driver,
            },
        )?;

        let mut screen: RequestList = config.screen_fields.iter().cloned().collect();
        let mut history_requests: RequestList = config.history_fields.iter().cloned().collect();
        let mut volume_requests: RequestList = config.volume_fields.iter().cloned().collect();
        let requests = history.check_requests(&mut screen, &mut history_requests);
        let volume_report = volume.filter(&mut volume_requests);
        if root {
            report("screen", &requests.screen);
            report("history", &requests.history);
            report("volume", &volume_report);
        }

        let volume_columns = volume.active_count();
        Ok(OutputSession {
            monitor: ConvergenceMonitor::new(config.convergence.criterion()),
            time_monitor: TimeConvergenceMonitor::new(config.window_convergence.criterion()),
            postprocessor: HistoryPostprocessor::new(
                layout,
                config.time_domain,
                config.window_convergence.start_window_iteration,
            ),
            common: CommonFields::new(config.time_domain, config.time_step),
            schedule: WriteSchedule::new(&config),
            contributors: self.contributors,
            history,
            volume,
            screen,
            history_requests,
            convergence_field,
            window,
            caches: CachePair::new(),
            table: VolumeTable::new(0, volume_columns),
            comm,
            root,
            last: IterationInfo::default(),
            converged: false,
            time_converged: false,
            metrics: SessionMetrics::default(),
            config,
        })
    }
}

fn monitored<'a>(history: &'a HistoryRegistry, name: &str) -> Result<&'a HistoryField, SessionError> {
    history.get(name).ok_or_else(|| {
        ConvergenceError::MissingField {
            field: name.to_string(),
        }
        .into()
    })
}

fn report(which: &str, r: &RequestReport) {
    for name in &r.dropped {
        warn!(output = which, request = %name, "requested output field not found, ignoring");
    }
    info!(output = which, fields = ?r.kept, "output fields");
}

// ── Session ────────────────────────────────────────────────────────

/// Field whose windowed average drives the time-convergence test.
#[derive(Clone, Debug)]
struct WindowTarget {
    key: FieldKey,
    /// `BUMP_WND_AVG_<key>` for coefficients, the field itself otherwise.
    averaged: FieldKey,
    kind: FieldKind,
}

/// Outcome of one [`OutputSession::record_iteration`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct IterationReport {
    /// Inner loop converged on every rank.
    pub converged: bool,
    /// Windowed time average converged.
    pub time_converged: bool,
    /// Inner Cauchy value, for coefficient-monitored runs.
    pub cauchy: Option<f64>,
    /// The screen header is due.
    pub write_screen_header: bool,
    /// A screen row is due.
    pub write_screen: bool,
    /// A history row is due.
    pub write_history: bool,
}

/// A built output session.
///
/// Owns the registries, both convergence monitors, the volume table and
/// its index caches. All write-due flags are `false` off the root rank
/// and when output is disabled.
pub struct OutputSession {
    config: SessionConfig,
    contributors: Vec<Box<dyn FieldContributor>>,
    history: HistoryRegistry,
    volume: VolumeRegistry,
    screen: RequestList,
    history_requests: RequestList,
    convergence_field: FieldKey,
    window: Option<WindowTarget>,
    monitor: ConvergenceMonitor,
    time_monitor: TimeConvergenceMonitor,
    postprocessor: HistoryPostprocessor,
    common: CommonFields,
    schedule: WriteSchedule,
    caches: CachePair,
    table: VolumeTable,
    comm: Box<dyn Communicator + Send>,
    root: bool,
    last: IterationInfo,
    converged: bool,
    time_converged: bool,
    metrics: SessionMetrics,
}

impl OutputSession {
    /// Evaluate the history output for `it`.
    ///
    /// Loads the common fields and every contributor's values, runs the
    /// inner convergence test (a collective: every rank must call this for
    /// the same iterations), postprocesses the derived fields and runs the
    /// windowed time test. A driver session tests the outer iteration
    /// instead and derives nothing beyond the Cauchy value.
    ///
    /// # Errors
    ///
    /// A failing contributor, a failed collective, or
    /// [`ConvergenceError::Diverged`] when a monitored value is NaN. The
    /// latter must end the run.
    pub fn record_iteration(&mut self, it: IterationInfo) -> Result<IterationReport, SessionError> {
        self.last = it;
        self.metrics.iterations += 1;

        self.common.load(&mut self.history, &it)?;
        for c in &self.contributors {
            c.load_history(&it, &mut self.history)
                .map_err(contributor(c.name()))?;
        }

        let iteration = if self.config.driver { it.outer } else { it.inner };
        let field = monitored(&self.history, self.convergence_field.as_str())?;
        let inner = self
            .monitor
            .evaluate(iteration, field, self.comm.as_ref())?;
        if inner.converged && !self.converged && self.root {
            info!(field = %self.convergence_field, iteration, driver = self.config.driver, "loop converged");
        }
        self.converged = inner.converged;

        if !self.config.driver {
            self.postprocessor.process(&mut self.history, &it)?;
        }
        if let Some(c) = inner.cauchy {
            self.history.set_value(CAUCHY_KEY, c)?;
        }

        self.time_converged = false;
        if let Some(w) = &self.window {
            let inner_done = inner.converged || it.inner + 1 >= self.config.inner_iterations;
            let value = self.history.value(w.averaged.as_str())?;
            let ev = self
                .time_monitor
                .evaluate(it.time, inner_done, w.key.as_str(), w.kind, value)?;
            if let Some(c) = ev.cauchy {
                self.history.set_value(TIME_WND_CAUCHY_KEY, c)?;
            }
            if ev.converged && self.root {
                info!(field = %w.key, time = it.time, "windowed time average converged");
            }
            self.time_converged = ev.converged;
        }

        let writes = self.root && self.config.write_output;
        Ok(IterationReport {
            converged: inner.converged,
            time_converged: self.time_converged,
            cauchy: inner.cauchy,
            write_screen_header: writes && self.schedule.write_screen_header(&it),
            write_screen: writes && self.schedule.write_screen(&it, inner.converged),
            write_history: writes && self.schedule.write_history(&it, inner.converged),
        })
    }

    /// Fill the volume table for `n_entities` entities, then visit the
    /// surface vertices.
    ///
    /// Running averages weigh the new value by `1 / (n + 1)`, where `n` is
    /// the number of time iterations since the (re)start.
    pub fn collect_volume(
        &mut self,
        n_entities: usize,
        surface: &[SurfaceVertex],
    ) -> Result<(), SessionError> {
        let started = Instant::now();
        self.table.reshape(n_entities, self.volume.active_count());
        let abs_time = self
            .last
            .time
            .saturating_sub(self.config.restart_time_iteration());
        debug!(n_entities, surface = surface.len(), "volume sweep started");
        VolumeSweep {
            registry: &self.volume,
            caches: &mut self.caches,
            table: &mut self.table,
            average_scaling: 1.0 / (abs_time + 1) as f64,
        }
        .run(&self.contributors, surface)?;

        self.metrics.volume_sweeps += 1;
        self.metrics.last_sweep_us = started.elapsed().as_micros() as u64;
        debug!(elapsed_us = self.metrics.last_sweep_us, "volume sweep finished");
        Ok(())
    }

    /// Names, labels and values of the active volume fields.
    pub fn volume_snapshot(&self) -> VolumeSnapshot {
        VolumeSnapshot {
            names: self
                .volume
                .active_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            labels: self
                .volume
                .active_labels()
                .into_iter()
                .map(str::to_string)
                .collect(),
            table: self.table.clone(),
        }
    }

    /// Whether a volume snapshot is due at `iteration`.
    pub fn write_volume(&self, iteration: u64) -> bool {
        self.config.write_output && self.schedule.write_volume(iteration)
    }

    /// Print the screen header with the next report.
    pub fn force_screen_header(&mut self) {
        self.schedule.force_header();
    }

    /// Columns of the history file.
    pub fn history_header(&self) -> Vec<HistoryColumn> {
        history::header(&self.history, &self.history_requests)
    }

    /// Current history file row, in [`history_header`](Self::history_header)
    /// order.
    pub fn history_row(&self) -> Vec<f64> {
        history::row(&self.history, &self.history_requests)
    }

    /// Current screen row, in request order.
    pub fn screen_row(&self) -> Vec<ScreenCell> {
        history::screen_row(&self.history, &self.screen)
    }

    /// The history registry.
    pub fn history(&self) -> &HistoryRegistry {
        &self.history
    }

    /// The volume registry.
    pub fn volume(&self) -> &VolumeRegistry {
        &self.volume
    }

    /// Screen requests that matched a field.
    pub fn screen_requests(&self) -> &RequestList {
        &self.screen
    }

    /// History requests that matched a field or group.
    pub fn history_requests(&self) -> &RequestList {
        &self.history_requests
    }

    /// Running average behind the time averages of coefficient `key`.
    pub fn running_average(&self, key: &str) -> Option<&RunningAverage> {
        self.postprocessor.running_average(key)
    }

    /// Last inner decision.
    pub fn is_converged(&self) -> bool {
        self.converged
    }

    /// Last windowed time decision.
    pub fn is_time_converged(&self) -> bool {
        self.time_converged
    }

    /// Whether this session runs on the root rank.
    pub fn is_root(&self) -> bool {
        self.root
    }

    /// The configuration the session was built with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Cumulative counters.
    pub fn metrics(&self) -> SessionMetrics {
        SessionMetrics {
            cache_lookups: self.caches.lookups(),
            cache_replayed: self.caches.replayed(),
            cache_calibrations: self.caches.calibrations(),
            ..self.metrics.clone()
        }
    }
}
