//! Benchmark profiles for the Tally output engine.
//!
//! - [`reference_profile`]: a time-domain run with residual, coefficient
//!   and volume contributors and the windowed test enabled
//! - [`reference_session`]: the profile built on a single process

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use tally_converge::SingleProcess;
use tally_session::{OutputSession, SessionBuilder, SessionConfig, SessionError};
use tally_test_utils::fixtures::{FlowVolume, OscillatingCoefficient, ResidualDecay};

/// Entities swept per volume collection in the reference profile.
pub const REFERENCE_ENTITIES: usize = 10_000;

/// Time-domain configuration with every volume field requested.
pub fn reference_profile() -> SessionConfig {
    let mut cfg = SessionConfig {
        time_domain: true,
        time_iterations: 10_000,
        inner_iterations: 10,
        time_step: 1e-3,
        history_fields: ["ITER", "RMS_RES", "AERO_COEFF", "BUMP_WND_AVG_AERO_COEFF"]
            .map(String::from)
            .to_vec(),
        volume_fields: ["SOLUTION", "PRIMITIVE", "TIME_AVERAGE"]
            .map(String::from)
            .to_vec(),
        ..SessionConfig::default()
    };
    cfg.window_convergence.enabled = true;
    cfg.window_convergence.field = Some("DRAG".into());
    cfg
}

/// Build [`reference_profile`] with noisy drag and lift coefficients.
pub fn reference_session(seed: u64) -> Result<OutputSession, SessionError> {
    SessionBuilder::new()
        .with_contributor(ResidualDecay::new(
            &["RMS_DENSITY", "RMS_MOMENTUM-X", "RMS_ENERGY"],
            -1.0,
            0.3,
        ))
        .with_contributor(
            OscillatingCoefficient::new("DRAG", "CD", 0.02, 0.002, 25.0)
                .with_noise(seed, 1e-4)
                .with_markers(&["wing", "flap", "slat"]),
        )
        .with_contributor(
            OscillatingCoefficient::new("LIFT", "CL", 0.4, 0.05, 25.0).with_noise(seed + 1, 1e-3),
        )
        .with_contributor(FlowVolume)
        .build(reference_profile(), Box::new(SingleProcess))
}
