//! History fields every session carries: iteration counters, physical
//! time and wall-clock time per iteration.

use std::time::Instant;

use tally_core::{FieldKind, HistoryField, IterationInfo, RegistryError, ScreenFormat};
use tally_registry::HistoryRegistry;

/// Time iteration counter.
pub const TIME_ITER: &str = "TIME_ITER";
/// Outer iteration counter.
pub const OUTER_ITER: &str = "OUTER_ITER";
/// Inner iteration counter.
pub const INNER_ITER: &str = "INNER_ITER";
/// Accumulated physical time.
pub const CUR_TIME: &str = "CUR_TIME";
/// Physical time step.
pub const TIME_STEP: &str = "TIME_STEP";
/// Wall-clock seconds per iteration.
pub const PHYS_TIME: &str = "PHYS_TIME";

/// Declare the common fields, ahead of every contributor's.
pub fn declare(registry: &mut HistoryRegistry) -> Result<(), RegistryError> {
    let fields = [
        (TIME_ITER, "Time_Iter", ScreenFormat::Integer, "ITER", "Time iteration index"),
        (OUTER_ITER, "Outer_Iter", ScreenFormat::Integer, "ITER", "Outer iteration index"),
        (INNER_ITER, "Inner_Iter", ScreenFormat::Integer, "ITER", "Inner iteration index"),
        (CUR_TIME, "Cur_Time", ScreenFormat::Scientific, "TIME_DOMAIN", "Current physical time (s)"),
        (TIME_STEP, "Time_Step", ScreenFormat::Scientific, "TIME_DOMAIN", "Current time step (s)"),
        (PHYS_TIME, "Time(sec)", ScreenFormat::Scientific, "PHYS_TIME", "Average wall-clock time"),
    ];
    for (key, label, format, group, description) in fields {
        registry.add(HistoryField::new(key, label, format, group, FieldKind::Value, description))?;
    }
    Ok(())
}

/// Produces the common field values each iteration.
#[derive(Clone, Debug)]
pub struct CommonFields {
    started: Instant,
    time_domain: bool,
    time_step: f64,
}

impl CommonFields {
    /// Start the wall clock now.
    pub fn new(time_domain: bool, time_step: f64) -> Self {
        Self {
            started: Instant::now(),
            time_domain,
            time_step,
        }
    }

    /// Write this iteration's common values.
    ///
    /// In time-domain runs the physical time advances by one step at the
    /// first inner iteration of each time step.
    pub fn load(
        &self,
        registry: &mut HistoryRegistry,
        it: &IterationInfo,
    ) -> Result<(), RegistryError> {
        registry.set_value(TIME_ITER, it.time as f64)?;
        registry.set_value(INNER_ITER, it.inner as f64)?;
        registry.set_value(OUTER_ITER, it.outer as f64)?;

        if self.time_domain {
            registry.set_value(TIME_STEP, self.time_step)?;
            if it.inner == 0 {
                let now = registry.value(CUR_TIME)? + registry.value(TIME_STEP)?;
                registry.set_value(CUR_TIME, now)?;
            }
        }

        let per_iteration = self.started.elapsed().as_secs_f64()
            / ((it.outer + 1) * (it.inner + 1)) as f64;
        registry.set_value(PHYS_TIME, per_iteration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_iteration_group() {
        let mut reg = HistoryRegistry::new();
        declare(&mut reg).unwrap();
        let iter: Vec<_> = reg
            .iter()
            .filter(|f| f.group == "ITER")
            .map(|f| f.key.as_str())
            .collect();
        assert_eq!(iter, vec![TIME_ITER, OUTER_ITER, INNER_ITER]);
        assert_eq!(reg.get(PHYS_TIME).unwrap().label, "Time(sec)");
    }

    #[test]
    fn time_advances_once_per_time_step() {
        let mut reg = HistoryRegistry::new();
        declare(&mut reg).unwrap();
        let common = CommonFields::new(true, 0.25);
        for time in 0..3u64 {
            for inner in 0..4u64 {
                common
                    .load(&mut reg, &IterationInfo { time, outer: 0, inner })
                    .unwrap();
            }
        }
        assert_eq!(reg.value(CUR_TIME).unwrap(), 0.75);
        assert_eq!(reg.value(TIME_ITER).unwrap(), 2.0);
        assert_eq!(reg.value(INNER_ITER).unwrap(), 3.0);
        assert!(reg.value(PHYS_TIME).unwrap() >= 0.0);
    }

    #[test]
    fn steady_run_leaves_time_untouched() {
        let mut reg = HistoryRegistry::new();
        declare(&mut reg).unwrap();
        let common = CommonFields::new(false, 0.25);
        common.load(&mut reg, &IterationInfo::inner(0)).unwrap();
        assert_eq!(reg.value(CUR_TIME).unwrap(), 0.0);
        assert_eq!(reg.value(TIME_STEP).unwrap(), 0.0);
    }
}
