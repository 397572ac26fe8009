//! Per-iteration history postprocessing and tabular history rows.

use std::collections::HashMap;

use tally_core::{FieldKey, IterationInfo, RegistryError, ScreenFormat};
use tally_registry::derived::{AVG_PREFIX, REL_PREFIX, TAVG_PREFIX};
use tally_registry::{DerivedLayout, HistoryRegistry, RequestList};
use tally_signal::{mean, RunningAverage, WindowKind};

/// Column of a history row.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryColumn {
    /// Field key.
    pub key: FieldKey,
    /// Header label.
    pub label: String,
    /// Rendering.
    pub format: ScreenFormat,
    /// Column width: the label plus two, at least the format minimum.
    pub width: usize,
}

/// A requested screen value.
#[derive(Clone, Debug, PartialEq)]
pub struct ScreenCell {
    /// Header label.
    pub label: String,
    /// Rendering.
    pub format: ScreenFormat,
    /// Current value.
    pub value: f64,
}

/// Header for the fields selected by `requests`.
pub fn header(registry: &HistoryRegistry, requests: &RequestList) -> Vec<HistoryColumn> {
    registry
        .selected(requests)
        .into_iter()
        .map(|f| HistoryColumn {
            key: f.key.clone(),
            label: f.label.clone(),
            format: f.format,
            width: (f.label.len() + 2).max(f.format.min_width()),
        })
        .collect()
}

/// Current values of the fields selected by `requests`, in header order.
pub fn row(registry: &HistoryRegistry, requests: &RequestList) -> Vec<f64> {
    registry
        .selected(requests)
        .into_iter()
        .map(|f| f.value)
        .collect()
}

/// Current values of the requested screen fields, in request order.
///
/// A per-surface field shows its first marker.
pub fn screen_row(registry: &HistoryRegistry, screen: &RequestList) -> Vec<ScreenCell> {
    screen
        .iter()
        .filter_map(|key| {
            registry
                .get(key)
                .or_else(|| registry.surface(key).and_then(|s| s.fields.first()))
        })
        .map(|f| ScreenCell {
            label: f.label.clone(),
            format: f.format,
            value: f.value,
        })
        .collect()
}

/// Computes the derived history values after contributors have loaded
/// theirs.
///
/// Relative residuals are measured against an initial residual that is
/// reset at the start of each time step (or in the first two iterations of
/// a steady run) and raised whenever a residual exceeds it. Time averages
/// are updated once per time step.
#[derive(Clone, Debug)]
pub struct HistoryPostprocessor {
    layout: DerivedLayout,
    initial: HashMap<FieldKey, f64>,
    averages: HashMap<FieldKey, RunningAverage>,
    time_domain: bool,
    start_window_iteration: u64,
}

impl HistoryPostprocessor {
    /// Create a postprocessor for the derived fields in `layout`.
    pub fn new(layout: DerivedLayout, time_domain: bool, start_window_iteration: u64) -> Self {
        let averages = layout
            .coefficients
            .iter()
            .map(|k| (k.clone(), RunningAverage::new()))
            .collect();
        Self {
            layout,
            initial: HashMap::new(),
            averages,
            time_domain,
            start_window_iteration,
        }
    }

    fn resets_initial_residuals(&self, it: &IterationInfo) -> bool {
        if self.time_domain {
            it.inner == 0
        } else {
            it.inner < 2
        }
    }

    fn updates_averages(&self, it: &IterationInfo) -> bool {
        self.time_domain && it.inner == 0
    }

    /// Update every derived field for `it`.
    pub fn process(
        &mut self,
        registry: &mut HistoryRegistry,
        it: &IterationInfo,
    ) -> Result<(), RegistryError> {
        let reset = self.resets_initial_residuals(it);
        for key in &self.layout.residuals {
            let value = registry.value(key.as_str())?;
            let initial = self.initial.entry(key.clone()).or_insert(value);
            if reset || value > *initial {
                *initial = value;
            }
            let relative = value - *initial;
            registry.set_value(key.prefixed(REL_PREFIX).as_str(), relative)?;
        }

        for (group, members) in &self.layout.residual_groups {
            let values = members
                .iter()
                .map(|k| registry.value(k.as_str()))
                .collect::<Result<Vec<_>, _>>()?;
            registry.set_value(&format!("{AVG_PREFIX}{group}"), mean(&values))?;
        }

        if self.updates_averages(it) {
            for key in &self.layout.coefficients {
                let value = registry.value(key.as_str())?;
                let Some(avg) = self.averages.get_mut(key) else {
                    continue;
                };
                registry.set_value(key.prefixed(TAVG_PREFIX).as_str(), avg.update(value))?;
                avg.add_sample(value, it.time, self.start_window_iteration);
                for kind in WindowKind::ALL {
                    registry.set_value(
                        key.prefixed(kind.field_prefix()).as_str(),
                        avg.windowed_update(kind),
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Running average backing the time averages of `key`.
    pub fn running_average(&self, key: &str) -> Option<&RunningAverage> {
        self.averages.get(key)
    }
}
