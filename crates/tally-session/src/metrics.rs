//! Counters describing the work an output session has done.

/// Cumulative counters for one session.
///
/// Cache counters cover both the write and read streams of every volume
/// and surface sweep since the session was built.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionMetrics {
    /// History evaluations recorded.
    pub iterations: u64,
    /// Volume collections performed.
    pub volume_sweeps: u64,
    /// Name lookups performed while calibrating.
    pub cache_lookups: u64,
    /// Accesses served from a calibrated cache.
    pub cache_replayed: u64,
    /// Calibrations completed.
    pub cache_calibrations: u64,
    /// Wall-clock time of the last volume collection, in microseconds.
    pub last_sweep_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = SessionMetrics::default();
        assert_eq!(m.iterations, 0);
        assert_eq!(m.volume_sweeps, 0);
        assert_eq!(m.cache_lookups, 0);
        assert_eq!(m.cache_replayed, 0);
        assert_eq!(m.cache_calibrations, 0);
        assert_eq!(m.last_sweep_us, 0);
    }
}
