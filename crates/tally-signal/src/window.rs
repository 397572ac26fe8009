//! Window kernels and the trapezoidal windowed time average.
//!
//! A window maps a sample position `i` within a series of length `n` to a
//! weight. Weighting the samples before integrating tapers the
//! contribution of the interval edges, which removes the start-up and
//! truncation bias from time averages of periodic signals.
//!
//! All kernels are normalized so that the windowed average of a constant
//! signal tends to that constant as the series grows.

use std::f64::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Integral of `exp(-1 / (t - t^2))` over `t` in `(0, 1)`.
///
/// Dividing the bump kernel by this constant gives it unit mean.
pub const BUMP_NORMALIZATION: f64 = 0.00702986;

/// Window function applied before time integration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WindowKind {
    /// Rectangular window: every sample has weight 1.
    Square,
    /// `1 - cos(2*pi*i/n)`.
    Hann,
    /// `2/3 * hann(i, n)^2`.
    HannSquared,
    /// `exp(-1 / (tau - tau^2)) / C` with `tau = i/n`; zero at both ends.
    Bump,
}

impl WindowKind {
    /// All kinds, in cache-slot order.
    pub const ALL: [WindowKind; 4] = [
        WindowKind::Square,
        WindowKind::Hann,
        WindowKind::HannSquared,
        WindowKind::Bump,
    ];

    /// Dense index used for per-kind caches.
    pub fn index(self) -> usize {
        match self {
            Self::Square => 0,
            Self::Hann => 1,
            Self::HannSquared => 2,
            Self::Bump => 3,
        }
    }

    /// Key prefix of the derived history field holding this average.
    pub fn field_prefix(self) -> &'static str {
        match self {
            Self::Square => "SQ_WND_AVG_",
            Self::Hann => "HANN_WND_AVG_",
            Self::HannSquared => "HANNSQ_WND_AVG_",
            Self::Bump => "BUMP_WND_AVG_",
        }
    }

    /// Label prefix of the derived history field holding this average.
    pub fn label_prefix(self) -> &'static str {
        match self {
            Self::Square => "sq_wnd_avg",
            Self::Hann => "hann_wnd_avg",
            Self::HannSquared => "hannSq_wnd_avg",
            Self::Bump => "bump_wnd_avg",
        }
    }

    /// Description of the derived history field holding this average.
    pub fn description(self) -> &'static str {
        match self {
            Self::Square => "Time averaged square window weighted values.",
            Self::Hann => "Time averaged hann window weighted values.",
            Self::HannSquared => "Time averaged hann-square window weighted values.",
            Self::Bump => "Time averaged bump window weighted values.",
        }
    }
}

/// Window weight at position `i` of a window of length `n`.
///
/// A zero-length window has zero weight everywhere except for
/// [`WindowKind::Square`].
pub fn weight(kind: WindowKind, i: usize, n: usize) -> f64 {
    if kind == WindowKind::Square {
        return 1.0;
    }
    if n == 0 {
        return 0.0;
    }
    let tau = i as f64 / n as f64;
    match kind {
        WindowKind::Square => 1.0,
        WindowKind::Hann => hann(tau),
        WindowKind::HannSquared => {
            let h = hann(tau);
            2.0 / 3.0 * h * h
        }
        WindowKind::Bump => {
            if i == 0 || i >= n {
                0.0
            } else {
                (-1.0 / (tau - tau * tau)).exp() / BUMP_NORMALIZATION
            }
        }
    }
}

fn hann(tau: f64) -> f64 {
    1.0 - (2.0 * PI * tau).cos()
}

/// Windowed time average of `samples` by the composite trapezoidal rule.
///
/// The window spans `n = samples.len()` positions and sample `i` sits at
/// position `i`, so the final sample is weighted at `n - 1`, not at the
/// window end. Returns 0 for fewer than two samples.
pub fn windowed_average(samples: &[f64], kind: WindowKind) -> f64 {
    let n = samples.len();
    if n < 2 {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut prev = weight(kind, 0, n) * samples[0];
    for (i, &v) in samples.iter().enumerate().skip(1) {
        let cur = weight(kind, i, n) * v;
        sum += 0.5 * (cur + prev);
        prev = cur;
    }
    sum / (n - 1) as f64
}

/// Arithmetic mean of `samples`; 0 for an empty slice.
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}
