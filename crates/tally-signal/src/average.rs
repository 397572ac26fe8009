//! Incremental and windowed running averages.

use crate::window::{windowed_average, WindowKind};

/// Running arithmetic mean plus a windowed average over a sample history.
///
/// The incremental mean ([`update`](Self::update)) and the sample history
/// ([`add_sample`](Self::add_sample)) are independent: the mean weights by
/// the number of `update` calls, while windowed averages integrate over
/// whatever the history holds. This lets a caller start windowing after a
/// warm-up period without disturbing the plain time average.
#[derive(Clone, Debug, Default)]
pub struct RunningAverage {
    value: f64,
    count: u64,
    samples: Vec<f64>,
    windowed: [f64; 4],
}

impl RunningAverage {
    /// Create an empty average.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `x` into the arithmetic mean and return the new mean.
    ///
    /// The scaling factor is recomputed from `count` on every call rather
    /// than accumulated, so long runs do not drift.
    pub fn update(&mut self, x: f64) -> f64 {
        let scaling = 1.0 / (self.count + 1) as f64;
        self.value = x * scaling + self.value * (1.0 - scaling);
        self.count += 1;
        self.value
    }

    /// Append `x` to the sample history if `iteration >= start_iteration`.
    pub fn add_sample(&mut self, x: f64, iteration: u64, start_iteration: u64) {
        if iteration >= start_iteration {
            self.samples.push(x);
        }
    }

    /// Recompute the windowed average of the whole history for `kind`,
    /// cache it, and return it.
    ///
    /// O(n) in the history length. Returns 0 while fewer than two samples
    /// have been collected.
    pub fn windowed_update(&mut self, kind: WindowKind) -> f64 {
        let v = windowed_average(&self.samples, kind);
        self.windowed[kind.index()] = v;
        v
    }

    /// Last value computed by [`windowed_update`](Self::windowed_update)
    /// for `kind`.
    pub fn windowed_value(&self, kind: WindowKind) -> f64 {
        self.windowed[kind.index()]
    }

    /// Current arithmetic mean.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Number of [`update`](Self::update) calls since the last reset.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// The collected sample history.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Clear the mean, the count and all cached windowed values.
    ///
    /// The sample history is left alone; call
    /// [`clear_samples`](Self::clear_samples) for that.
    pub fn reset(&mut self) {
        self.value = 0.0;
        self.count = 0;
        self.windowed = [0.0; 4];
    }

    /// Drop the sample history.
    pub fn clear_samples(&mut self) {
        self.samples.clear();
    }
}
