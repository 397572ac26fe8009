//! Registry of history fields: session-wide scalars, plus per-surface
//! fields split over a list of boundary markers.

use indexmap::IndexMap;
use tally_core::{
    FieldKey, FieldScope, HistoryDeclare, HistoryField, HistorySink, MarkerList,
    RegistryError,
};

use crate::request::{RequestList, RequestReport};

/// A history field declared once per surface marker.
///
/// Every entry in `fields` shares the set's key, group and kind; the label
/// carries the marker name as `"<label>(<marker>)"`.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceFieldSet {
    /// Key shared by every per-marker entry.
    pub key: FieldKey,
    /// Marker names, one per entry of `fields`.
    pub markers: MarkerList,
    /// One field per marker, in marker order.
    pub fields: Vec<HistoryField>,
}

/// Outcome of [`HistoryRegistry::check_requests`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HistoryRequestReport {
    /// Screen requests, matched by field key.
    pub screen: RequestReport,
    /// History file requests, matched by group or key.
    pub history: RequestReport,
}

/// Ordered registry of history fields.
///
/// Iteration order is declaration order; it fixes the column order of
/// history rows. Keys are unique across scalar and per-surface fields.
#[derive(Clone, Debug, Default)]
pub struct HistoryRegistry {
    fields: IndexMap<FieldKey, HistoryField>,
    surface: IndexMap<FieldKey, SurfaceFieldSet>,
}

impl HistoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a scalar history field.
    pub fn add(&mut self, field: HistoryField) -> Result<(), RegistryError> {
        self.check_free(&field.key)?;
        self.fields.insert(field.key.clone(), field);
        Ok(())
    }

    /// Declare `field` once per marker in `markers`.
    ///
    /// An empty marker list still reserves the key.
    pub fn add_per_surface(
        &mut self,
        field: HistoryField,
        markers: &[String],
    ) -> Result<(), RegistryError> {
        self.check_free(&field.key)?;
        let fields = markers
            .iter()
            .map(|m| HistoryField {
                label: format!("{}({m})", field.label),
                ..field.clone()
            })
            .collect();
        let set = SurfaceFieldSet {
            key: field.key.clone(),
            markers: markers.iter().cloned().collect(),
            fields,
        };
        self.surface.insert(field.key, set);
        Ok(())
    }

    fn check_free(&self, key: &FieldKey) -> Result<(), RegistryError> {
        if self.fields.contains_key(key) || self.surface.contains_key(key) {
            return Err(RegistryError::DuplicateField {
                key: key.clone(),
                scope: FieldScope::History,
            });
        }
        Ok(())
    }

    /// Look up a scalar field.
    pub fn get(&self, key: &str) -> Option<&HistoryField> {
        self.fields.get(key)
    }

    /// Look up a per-surface field set.
    pub fn surface(&self, key: &str) -> Option<&SurfaceFieldSet> {
        self.surface.get(key)
    }

    /// Whether `key` names a scalar or per-surface field.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key) || self.surface.contains_key(key)
    }

    /// Set the value of a scalar field.
    pub fn set_value(&mut self, key: &str, value: f64) -> Result<(), RegistryError> {
        let field = self.fields.get_mut(key).ok_or_else(|| unknown(key))?;
        field.value = value;
        Ok(())
    }

    /// Set the value of a per-surface field for the marker at `marker`.
    pub fn set_surface_value(
        &mut self,
        key: &str,
        marker: usize,
        value: f64,
    ) -> Result<(), RegistryError> {
        let set = self.surface.get_mut(key).ok_or_else(|| unknown(key))?;
        let markers = set.fields.len();
        let field = set
            .fields
            .get_mut(marker)
            .ok_or_else(|| RegistryError::MarkerOutOfRange {
                key: key.to_string(),
                index: marker,
                markers,
            })?;
        field.value = value;
        Ok(())
    }

    /// Current value of a scalar field.
    pub fn value(&self, key: &str) -> Result<f64, RegistryError> {
        self.fields
            .get(key)
            .map(|f| f.value)
            .ok_or_else(|| unknown(key))
    }

    /// Scalar fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryField> {
        self.fields.values()
    }

    /// Number of scalar fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// `true` if no scalar field is registered.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields selected by `requests` (key or group), scalars first and then
    /// per-surface entries, each in declaration order.
    pub fn selected<'a>(&'a self, requests: &'a RequestList) -> Vec<&'a HistoryField> {
        let wanted = |f: &HistoryField| requests.iter().any(|r| f.matches(r));
        self.fields
            .values()
            .filter(|&f| wanted(f))
            .chain(
                self.surface
                    .values()
                    .flat_map(|s| s.fields.iter())
                    .filter(|&f| wanted(f)),
            )
            .collect()
    }

    /// Drop requests that match nothing.
    ///
    /// Screen entries must name a field key (scalar or per-surface).
    /// History entries may name a key or a group. Both lists keep their
    /// order; removed entries are returned in the report.
    pub fn check_requests(
        &self,
        screen: &mut RequestList,
        history: &mut RequestList,
    ) -> HistoryRequestReport {
        let screen_dropped = screen.split_off_unmatched(|r| self.contains(r));
        let history_dropped = history.split_off_unmatched(|r| {
            self.fields.values().any(|f| f.matches(r))
                || self
                    .surface
                    .values()
                    .any(|s| s.key.as_str() == r || s.fields.iter().any(|f| f.group == r))
        });
        HistoryRequestReport {
            screen: RequestReport {
                kept: screen.as_slice().to_vec(),
                dropped: screen_dropped,
            },
            history: RequestReport {
                kept: history.as_slice().to_vec(),
                dropped: history_dropped,
            },
        }
    }
}

fn unknown(key: &str) -> RegistryError {
    RegistryError::UnknownField {
        key: key.to_string(),
        scope: FieldScope::History,
    }
}

impl HistoryDeclare for HistoryRegistry {
    fn add(&mut self, field: HistoryField) -> Result<(), RegistryError> {
        HistoryRegistry::add(self, field)
    }

    fn add_per_surface(
        &mut self,
        field: HistoryField,
        markers: &[String],
    ) -> Result<(), RegistryError> {
        HistoryRegistry::add_per_surface(self, field, markers)
    }
}

impl HistorySink for HistoryRegistry {
    fn set(&mut self, key: &str, value: f64) -> Result<(), RegistryError> {
        self.set_value(key, value)
    }

    fn set_surface(&mut self, key: &str, marker: usize, value: f64) -> Result<(), RegistryError> {
        self.set_surface_value(key, marker, value)
    }

    fn get(&self, key: &str) -> Option<f64> {
        self.fields.get(key).map(|f| f.value)
    }
}
