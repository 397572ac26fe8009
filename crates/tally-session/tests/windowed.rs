//! Windowed time-convergence on an oscillating coefficient.

use tally_converge::SingleProcess;
use tally_core::IterationInfo;
use tally_session::{IterationReport, OutputSession, SessionBuilder, SessionConfig};
use tally_signal::WindowKind;
use tally_test_utils::fixtures::{OscillatingCoefficient, ResidualDecay};

const INNER: u64 = 3;

fn session(enabled: bool) -> OutputSession {
    let mut cfg = SessionConfig {
        time_domain: true,
        time_iterations: 400,
        inner_iterations: INNER,
        time_step: 1e-3,
        ..SessionConfig::default()
    };
    cfg.window_convergence.enabled = enabled;
    cfg.window_convergence.field = Some("DRAG".into());
    cfg.window_convergence.capacity = 5;
    cfg.window_convergence.epsilon = 1e-3;
    cfg.window_convergence.start_convergence_offset = 5;
    SessionBuilder::new()
        .with_contributor(ResidualDecay::new(&["RMS_DENSITY"], -1.0, 0.5))
        .with_contributor(OscillatingCoefficient::new("DRAG", "CD", 1.0, 0.1, 10.0))
        .build(cfg, Box::new(SingleProcess))
        .unwrap()
}

/// Run one time step; return the report of its last inner iteration.
fn step(s: &mut OutputSession, time: u64) -> IterationReport {
    let mut last = IterationReport::default();
    for inner in 0..INNER {
        last = s
            .record_iteration(IterationInfo {
                time,
                outer: 0,
                inner,
            })
            .unwrap();
    }
    last
}

#[test]
fn bump_average_settles_and_converges() {
    let mut s = session(true);
    let converged_at = (0..400).find(|&t| step(&mut s, t).time_converged);
    let t = converged_at.expect("windowed average never converged");
    assert!(t > 5, "converged inside the suppression offset at {t}");

    let h = s.history();
    assert!(h.value("TIME_WND_CAUCHY").unwrap() < 1e-3);
    assert!((h.value("BUMP_WND_AVG_DRAG").unwrap() - 1.0).abs() < 0.05);
    assert_eq!(h.get("TIME_WND_CAUCHY").unwrap().label, "t_wnd_C[CD]");
}

#[test]
fn first_time_step_reports_unit_cauchy() {
    let mut s = session(true);
    s.record_iteration(IterationInfo::default()).unwrap();
    assert_eq!(s.history().value("TIME_WND_CAUCHY").unwrap(), 1.0);
}

#[test]
fn disabled_test_tracks_cauchy_but_never_converges() {
    let mut s = session(false);
    assert!((0..400).all(|t| !step(&mut s, t).time_converged));
    assert!(s.history().value("TIME_WND_CAUCHY").unwrap() < 1e-3);
}

#[test]
fn time_averages_cover_whole_periods() {
    let mut s = session(false);
    for t in 0..20 {
        step(&mut s, t);
    }
    let h = s.history();
    assert!((h.value("TAVG_DRAG").unwrap() - 1.0).abs() < 1e-12);
    let avg = s.running_average("DRAG").unwrap();
    assert_eq!(avg.samples().len(), 20);
    for kind in WindowKind::ALL {
        let key = format!("{}DRAG", kind.field_prefix());
        assert_eq!(h.value(&key).unwrap(), avg.windowed_value(kind));
    }
    // Physical time advanced once per time step.
    assert!((h.value("CUR_TIME").unwrap() - 0.02).abs() < 1e-12);
}
