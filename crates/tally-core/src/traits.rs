//! Capability traits connecting physics collaborators to the output session.
//!
//! Collaborators implement [`FieldContributor`]. The session hands them the
//! narrow declaration and sink traits below, so a contributor never sees
//! the registry, the index cache or the results table directly.

use crate::error::{CacheError, ContributorError, RegistryError};
use crate::field::{HistoryField, VolumeField};

/// Iteration counters for the current history evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IterationInfo {
    /// Physical time step index.
    pub time: u64,
    /// Outer (coupling) iteration index.
    pub outer: u64,
    /// Inner (pseudo-time) iteration index.
    pub inner: u64,
}

impl IterationInfo {
    /// Counters for a steady run at inner iteration `inner`.
    pub fn inner(inner: u64) -> Self {
        Self {
            time: 0,
            outer: 0,
            inner,
        }
    }
}

/// Registration surface for history fields.
pub trait HistoryDeclare {
    /// Declare a history field. Duplicate keys are fatal.
    fn add(&mut self, field: HistoryField) -> Result<(), RegistryError>;

    /// Declare one field per surface marker, keyed under `field.key`.
    fn add_per_surface(
        &mut self,
        field: HistoryField,
        markers: &[String],
    ) -> Result<(), RegistryError>;
}

/// Registration surface for volume fields.
pub trait VolumeDeclare {
    /// Declare a volume field. Duplicate keys are fatal.
    fn add(&mut self, field: VolumeField) -> Result<(), RegistryError>;
}

/// Per-iteration write access to history values.
pub trait HistorySink {
    /// Set the current value of a history field.
    fn set(&mut self, key: &str, value: f64) -> Result<(), RegistryError>;

    /// Set the value of a per-surface field for the marker at `marker`.
    fn set_surface(&mut self, key: &str, marker: usize, value: f64) -> Result<(), RegistryError>;

    /// Current value of a history field, if registered.
    fn get(&self, key: &str) -> Option<f64>;
}

/// Per-entity access to volume values during a sweep.
///
/// Every entity in a sweep must issue the same named accesses in the same
/// order; the session replays offsets recorded on the first entity.
pub trait VolumeSink {
    /// Write `value` for the current entity.
    fn set(&mut self, key: &str, value: f64) -> Result<(), CacheError>;

    /// Read back the value stored for the current entity (0 if inactive).
    fn get(&mut self, key: &str) -> Result<f64, CacheError>;

    /// Fold `value` into the running time average stored for the current
    /// entity.
    fn set_running_average(&mut self, key: &str, value: f64) -> Result<(), CacheError>;
}

/// A physics collaborator that declares and produces output fields.
///
/// # Contract
///
/// - `declare_*` are called once, during the session's registration phase.
/// - `load_history` is called once per iteration, after common fields.
/// - `load_volume` / `load_surface` are called once per entity per sweep
///   and must access fields in a fixed order.
///
/// # Examples
///
/// ```
/// use tally_core::{
///     ContributorError, FieldContributor, FieldKind, HistoryDeclare, HistoryField,
///     HistorySink, IterationInfo, ScreenFormat,
/// };
///
/// struct Drag;
///
/// impl FieldContributor for Drag {
///     fn name(&self) -> &str { "drag" }
///
///     fn declare_history(&self, fields: &mut dyn HistoryDeclare) -> Result<(), ContributorError> {
///         fields.add(HistoryField::new(
///             "DRAG", "CD", ScreenFormat::Fixed, "AERO", FieldKind::Coefficient, "Drag",
///         ))?;
///         Ok(())
///     }
///
///     fn load_history(
///         &self,
///         iteration: &IterationInfo,
///         out: &mut dyn HistorySink,
///     ) -> Result<(), ContributorError> {
///         out.set("DRAG", 0.02 + 1.0 / (iteration.inner as f64 + 1.0))?;
///         Ok(())
///     }
/// }
///
/// assert_eq!(Drag.name(), "drag");
/// ```
pub trait FieldContributor: Send {
    /// Human-readable name for error reporting.
    fn name(&self) -> &str;

    /// Declare history fields.
    fn declare_history(&self, fields: &mut dyn HistoryDeclare) -> Result<(), ContributorError>;

    /// Declare volume fields. Default: none.
    fn declare_volume(&self, _fields: &mut dyn VolumeDeclare) -> Result<(), ContributorError> {
        Ok(())
    }

    /// Push this iteration's history values.
    fn load_history(
        &self,
        iteration: &IterationInfo,
        out: &mut dyn HistorySink,
    ) -> Result<(), ContributorError>;

    /// Push volume values for one entity. Default: nothing.
    fn load_volume(&self, _entity: usize, _out: &mut dyn VolumeSink) -> Result<(), ContributorError> {
        Ok(())
    }

    /// Push surface values for one boundary vertex owned by `entity`.
    /// Default: nothing.
    fn load_surface(
        &self,
        _entity: usize,
        _marker: usize,
        _vertex: usize,
        _out: &mut dyn VolumeSink,
    ) -> Result<(), ContributorError> {
        Ok(())
    }
}
