//! When to write screen rows, history rows and volume snapshots.

use tally_core::IterationInfo;

use crate::config::{SessionConfig, WriteFrequency};

/// `true` if `iteration` is a multiple of a non-zero `frequency`.
fn on_frequency(iteration: u64, frequency: u64) -> bool {
    frequency != 0 && iteration % frequency == 0
}

/// Write-frequency predicates for one session.
///
/// Every level (time, outer, inner) must be on its frequency, or at the
/// last iteration of its budget, for a row to be written. A converged
/// iteration is always written once the time level passes.
#[derive(Clone, Debug)]
pub struct WriteSchedule {
    screen: WriteFrequency,
    history: WriteFrequency,
    volume: u64,
    budgets: IterationInfo,
    restart_time: u64,
    multizone: bool,
    zone_convergence: bool,
    header_needed: bool,
}

impl WriteSchedule {
    /// Build the schedule from a validated configuration.
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            screen: config.screen_frequency,
            history: config.history_frequency,
            volume: config.volume_frequency,
            budgets: IterationInfo {
                time: config.time_iterations,
                outer: config.outer_iterations,
                inner: config.inner_iterations,
            },
            restart_time: config.restart_time_iteration(),
            multizone: config.multizone,
            zone_convergence: config.write_zone_convergence,
            header_needed: false,
        }
    }

    /// Print the screen header on the next call to
    /// [`write_screen_header`](Self::write_screen_header) regardless of
    /// iteration.
    pub fn force_header(&mut self) {
        self.header_needed = true;
    }

    fn time_level(&self, freq: &WriteFrequency, it: &IterationInfo) -> bool {
        on_frequency(it.time, freq.time) || it.time + 1 == self.budgets.time
    }

    /// Whether the screen header is due at `it`.
    pub fn write_screen_header(&mut self, it: &IterationInfo) -> bool {
        if self.header_needed {
            self.header_needed = false;
            return true;
        }
        if self.multizone && !self.zone_convergence {
            return false;
        }
        if it.inner == 0 && it.outer == 0 && it.time == self.restart_time {
            return true;
        }
        if !self.time_level(&self.screen, it) {
            return false;
        }
        if self.screen.outer == 0 && self.screen.inner == 0 {
            return false;
        }
        it.inner == 0
    }

    /// Whether a screen row is due at `it`.
    pub fn write_screen(&self, it: &IterationInfo, converged: bool) -> bool {
        if self.multizone && !self.zone_convergence {
            return false;
        }
        self.row_due(&self.screen, it, converged)
    }

    /// Whether a history row is due at `it`.
    pub fn write_history(&self, it: &IterationInfo, converged: bool) -> bool {
        self.row_due(&self.history, it, converged)
    }

    fn row_due(&self, freq: &WriteFrequency, it: &IterationInfo, converged: bool) -> bool {
        if !self.time_level(freq, it) {
            return false;
        }
        if converged {
            return true;
        }
        if !on_frequency(it.outer, freq.outer) && it.outer + 1 != self.budgets.outer {
            return false;
        }
        on_frequency(it.inner, freq.inner) || it.inner + 1 == self.budgets.inner
    }

    /// Whether a volume snapshot is due at `iteration`. Never at 0.
    pub fn write_volume(&self, iteration: u64) -> bool {
        iteration > 0 && on_frequency(iteration, self.volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        SessionConfig {
            time_iterations: 10,
            outer_iterations: 1,
            inner_iterations: 100,
            screen_frequency: WriteFrequency {
                time: 1,
                outer: 1,
                inner: 10,
            },
            history_frequency: WriteFrequency {
                time: 2,
                outer: 1,
                inner: 5,
            },
            volume_frequency: 25,
            ..SessionConfig::default()
        }
    }

    fn at(time: u64, inner: u64) -> IterationInfo {
        IterationInfo {
            time,
            outer: 0,
            inner,
        }
    }

    #[test]
    fn screen_rows_follow_inner_frequency_and_budget_end() {
        let s = WriteSchedule::new(&config());
        assert!(s.write_screen(&at(0, 0), false));
        assert!(!s.write_screen(&at(0, 7), false));
        assert!(s.write_screen(&at(0, 20), false));
        assert!(s.write_screen(&at(0, 99), false));
        assert!(s.write_screen(&at(0, 7), true));
    }

    #[test]
    fn history_rows_respect_time_frequency() {
        let s = WriteSchedule::new(&config());
        assert!(s.write_history(&at(0, 5), false));
        assert!(!s.write_history(&at(1, 5), false));
        assert!(!s.write_history(&at(1, 5), true));
        // Last time iteration is always eligible.
        assert!(s.write_history(&at(9, 5), false));
    }

    #[test]
    fn header_on_first_iteration_and_each_time_step() {
        let mut s = WriteSchedule::new(&config());
        assert!(s.write_screen_header(&at(0, 0)));
        assert!(!s.write_screen_header(&at(0, 1)));
        assert!(s.write_screen_header(&at(3, 0)));
        s.force_header();
        assert!(s.write_screen_header(&at(3, 17)));
        assert!(!s.write_screen_header(&at(3, 18)));
    }

    #[test]
    fn no_header_without_inner_or_outer_output() {
        let mut cfg = config();
        cfg.screen_frequency.inner = 0;
        cfg.screen_frequency.outer = 0;
        let mut s = WriteSchedule::new(&cfg);
        assert!(s.write_screen_header(&at(0, 0)));
        assert!(!s.write_screen_header(&at(3, 0)));
    }

    #[test]
    fn multizone_suppresses_zone_screen_output() {
        let mut cfg = config();
        cfg.multizone = true;
        cfg.write_zone_convergence = false;
        let mut s = WriteSchedule::new(&cfg);
        assert!(!s.write_screen(&at(0, 0), true));
        assert!(!s.write_screen_header(&at(0, 0)));
        assert!(s.write_history(&at(0, 0), false));
    }

    #[test]
    fn volume_on_multiples_only() {
        let s = WriteSchedule::new(&config());
        assert!(!s.write_volume(0));
        assert!(!s.write_volume(24));
        assert!(s.write_volume(25));
        assert!(s.write_volume(50));
    }
}
