//! Sessions on simulated ranks agree on inner convergence.

use tally_core::IterationInfo;
use tally_converge::Communicator;
use tally_session::{SessionBuilder, SessionConfig};
use tally_test_utils::fixtures::ResidualDecay;
use tally_test_utils::run_ranks;

#[derive(Debug, PartialEq)]
struct RankOutcome {
    rank: usize,
    converged_at: Option<u64>,
    wrote_history: bool,
    root: bool,
}

#[test]
fn slowest_rank_decides_convergence() {
    let outcomes = run_ranks(3, |comm| {
        let rank = comm.rank();
        let mut cfg = SessionConfig {
            inner_iterations: 40,
            ..SessionConfig::default()
        };
        cfg.convergence.min_log_residual = -5.0;
        // Ranks reach the threshold at inner iterations 8, 16 and 32.
        let rate = 0.5 / (1u32 << rank) as f64;
        let mut s = SessionBuilder::new()
            .with_contributor(ResidualDecay::new(&["RMS_DENSITY"], -1.0, rate))
            .build(cfg, Box::new(comm))
            .unwrap();

        let mut converged_at = None;
        let mut wrote_history = false;
        for inner in 0..40 {
            let r = s.record_iteration(IterationInfo::inner(inner)).unwrap();
            wrote_history |= r.write_history;
            if r.converged && converged_at.is_none() {
                converged_at = Some(inner);
            }
        }
        RankOutcome {
            rank,
            converged_at,
            wrote_history,
            root: s.is_root(),
        }
    });

    for o in &outcomes {
        assert_eq!(o.converged_at, Some(32), "rank {}", o.rank);
        assert_eq!(o.root, o.rank == 0);
        assert_eq!(o.wrote_history, o.rank == 0);
    }
}
