//! A multizone driver session: convergence follows the outer iteration and
//! only the Cauchy fields are derived.

use tally_converge::SingleProcess;
use tally_core::{
    ContributorError, FieldContributor, FieldKind, HistoryDeclare, HistoryField, HistorySink,
    IterationInfo, ScreenFormat,
};
use tally_session::{OutputSession, SessionBuilder, SessionConfig};

/// Residual `-outer` that ignores the inner iteration.
struct OuterDecay;

impl FieldContributor for OuterDecay {
    fn name(&self) -> &str {
        "outer-decay"
    }

    fn declare_history(&self, fields: &mut dyn HistoryDeclare) -> Result<(), ContributorError> {
        fields.add(HistoryField::new(
            "RMS_DENSITY",
            "rms[Rho]",
            ScreenFormat::Fixed,
            "RMS_RES",
            FieldKind::Residual,
            "",
        ))?;
        fields.add(HistoryField::new(
            "DRAG",
            "CD",
            ScreenFormat::Fixed,
            "AERO",
            FieldKind::Coefficient,
            "",
        ))?;
        Ok(())
    }

    fn load_history(
        &self,
        it: &IterationInfo,
        out: &mut dyn HistorySink,
    ) -> Result<(), ContributorError> {
        out.set("RMS_DENSITY", -(it.outer as f64))?;
        out.set("DRAG", 0.02)?;
        Ok(())
    }
}

fn config(driver: bool) -> SessionConfig {
    let mut cfg = SessionConfig {
        driver,
        outer_iterations: 20,
        ..SessionConfig::default()
    };
    cfg.convergence.min_log_residual = -6.0;
    cfg
}

fn session(config: SessionConfig) -> OutputSession {
    SessionBuilder::new()
        .with_contributor(OuterDecay)
        .build(config, Box::new(SingleProcess))
        .unwrap()
}

fn outer(outer: u64) -> IterationInfo {
    IterationInfo {
        time: 0,
        outer,
        inner: 0,
    }
}

fn first_converged(s: &mut OutputSession) -> Option<u64> {
    (0..10).find(|&o| s.record_iteration(outer(o)).unwrap().converged)
}

#[test]
fn outer_iteration_decides_convergence() {
    let mut s = session(config(true));
    assert_eq!(first_converged(&mut s), Some(6));
    assert!(s.is_converged());
}

#[test]
fn zone_session_ignores_outer_iteration() {
    // The inner counter stays at 0, which restarts the inner test each call.
    let mut s = session(config(false));
    assert_eq!(first_converged(&mut s), None);
}

#[test]
fn driver_declares_only_cauchy_fields() {
    let mut cfg = config(true);
    cfg.time_domain = true;
    cfg.window_convergence.enabled = true;
    cfg.window_convergence.field = Some("DRAG".into());
    let mut s = session(cfg);
    for o in 0..10 {
        let report = s.record_iteration(outer(o)).unwrap();
        assert!(!report.time_converged);
    }

    let h = s.history();
    assert!(h.get("REL_RMS_DENSITY").is_none());
    assert!(h.get("AVG_RMS_RES").is_none());
    assert!(h.get("TAVG_DRAG").is_none());
    assert!(h.get("BUMP_WND_AVG_DRAG").is_none());
    assert_eq!(h.get("CAUCHY").unwrap().label, "C[rms[Rho]]");
    assert!(h.get("TIME_WND_CAUCHY").is_some());
}
