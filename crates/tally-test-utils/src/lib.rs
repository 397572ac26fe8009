//! Test utilities and mock contributors for Tally development.
//!
//! Provides deterministic signal generators, mock
//! [`FieldContributor`](tally_core::FieldContributor)s in [`fixtures`],
//! and [`run_ranks`] for driving one session per simulated rank.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::thread;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tally_converge::ChannelComm;

/// Standard normal sample by the Box-Muller transform.
fn box_muller(rng: &mut ChaCha8Rng) -> f64 {
    let u1: f64 = rng.random::<f64>().max(1e-300);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Gaussian noise with standard deviation `sigma`, reproducible from
/// `seed XOR iteration`.
pub fn noise(seed: u64, iteration: u64, sigma: f64) -> f64 {
    if sigma == 0.0 {
        return 0.0;
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ iteration);
    sigma * box_muller(&mut rng)
}

/// `mean + amplitude * sin(2 pi i / period)` plus noise, for `i` in `0..n`.
pub fn noisy_sine(
    seed: u64,
    n: usize,
    mean: f64,
    amplitude: f64,
    period: f64,
    sigma: f64,
) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * i as f64 / period;
            mean + amplitude * phase.sin() + noise(seed, i as u64, sigma)
        })
        .collect()
}

/// Run `f` on `n` threads, one per rank of a [`ChannelComm`] group, and
/// collect the results in rank order.
///
/// # Panics
///
/// Panics if any rank's thread panics.
pub fn run_ranks<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(ChannelComm) -> T + Send + Sync + Clone + 'static,
{
    let handles: Vec<_> = ChannelComm::group(n)
        .into_iter()
        .map(|comm| {
            let f = f.clone();
            thread::spawn(move || f(comm))
        })
        .collect();
    handles
        .into_iter()
        .map(|h| h.join().expect("rank thread panicked"))
        .collect()
}
