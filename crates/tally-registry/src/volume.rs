//! Registry of volume fields and column assignment.

use indexmap::IndexMap;
use tally_core::{ColumnId, FieldKey, FieldScope, RegistryError, VolumeDeclare, VolumeField};

use crate::request::{RequestList, RequestReport};

/// Ordered registry of per-entity output fields.
///
/// Fields are declared inactive. [`filter`](Self::filter) assigns dense
/// column offsets to the requested ones, in declaration order. Offsets
/// are never reassigned, so repeated filtering only appends columns.
#[derive(Clone, Debug, Default)]
pub struct VolumeRegistry {
    fields: IndexMap<FieldKey, VolumeField>,
    columns: Vec<FieldKey>,
}

impl VolumeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a volume field. Any offset on `field` is discarded.
    pub fn add(&mut self, mut field: VolumeField) -> Result<(), RegistryError> {
        if self.fields.contains_key(&field.key) {
            return Err(RegistryError::DuplicateField {
                key: field.key,
                scope: FieldScope::Volume,
            });
        }
        field.offset = None;
        self.fields.insert(field.key.clone(), field);
        Ok(())
    }

    /// Activate every inactive field selected by `requested` (key or group).
    ///
    /// New columns continue from the current column count. Requests that
    /// select no field at all are removed from `requested` and reported.
    pub fn filter(&mut self, requested: &mut RequestList) -> RequestReport {
        for field in self.fields.values_mut() {
            if field.offset.is_some() || !requested.iter().any(|r| field.matches(r)) {
                continue;
            }
            field.offset = Some(ColumnId(self.columns.len() as u32));
            self.columns.push(field.key.clone());
        }
        let fields = &self.fields;
        let dropped = requested.split_off_unmatched(|r| fields.values().any(|f| f.matches(r)));
        RequestReport {
            kept: requested.as_slice().to_vec(),
            dropped,
        }
    }

    /// Look up a field by key.
    pub fn lookup(&self, key: &str) -> Result<&VolumeField, RegistryError> {
        self.fields.get(key).ok_or_else(|| RegistryError::UnknownField {
            key: key.to_string(),
            scope: FieldScope::Volume,
        })
    }

    /// Column of `key`, or `None` when the field is inactive.
    pub fn offset(&self, key: &str) -> Result<Option<ColumnId>, RegistryError> {
        self.lookup(key).map(|f| f.offset)
    }

    /// Keys of the active fields in column order.
    pub fn active_names(&self) -> Vec<&str> {
        self.columns.iter().map(FieldKey::as_str).collect()
    }

    /// Labels of the active fields in column order.
    pub fn active_labels(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter_map(|k| self.fields.get(k))
            .map(|f| f.label.as_str())
            .collect()
    }

    /// Number of active fields (the results-table width).
    pub fn active_count(&self) -> usize {
        self.columns.len()
    }

    /// All declared fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &VolumeField> {
        self.fields.values()
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// `true` if no field is declared.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl VolumeDeclare for VolumeRegistry {
    fn add(&mut self, field: VolumeField) -> Result<(), RegistryError> {
        VolumeRegistry::add(self, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn registry() -> VolumeRegistry {
        let mut reg = VolumeRegistry::new();
        reg.add(VolumeField::new("COORD-X", "x", "COORDINATES", ""))
            .unwrap();
        reg.add(VolumeField::new("COORD-Y", "y", "COORDINATES", ""))
            .unwrap();
        reg.add(VolumeField::new("DENSITY", "Density", "SOLUTION", ""))
            .unwrap();
        reg.add(VolumeField::new("PRESSURE", "Pressure", "PRIMITIVE", ""))
            .unwrap();
        reg.add(VolumeField::new("MACH", "Mach", "PRIMITIVE", ""))
            .unwrap();
        reg
    }

    #[test]
    fn filter_assigns_columns_in_declaration_order() {
        let mut reg = registry();
        let mut req: RequestList = ["PRIMITIVE", "COORD-X"].into_iter().collect();
        let report = reg.filter(&mut req);
        assert!(report.all_matched());
        assert_eq!(reg.active_names(), vec!["COORD-X", "PRESSURE", "MACH"]);
        assert_eq!(reg.offset("COORD-X").unwrap(), Some(ColumnId(0)));
        assert_eq!(reg.offset("MACH").unwrap(), Some(ColumnId(2)));
        assert_eq!(reg.offset("DENSITY").unwrap(), None);
        assert_eq!(reg.active_labels(), vec!["x", "Pressure", "Mach"]);
    }

    #[test]
    fn unmatched_request_is_dropped() {
        let mut reg = registry();
        let mut req: RequestList = ["SOLUTION", "VORTICITY"].into_iter().collect();
        let report = reg.filter(&mut req);
        assert_eq!(report.dropped, vec!["VORTICITY".to_string()]);
        assert_eq!(report.kept, vec!["SOLUTION".to_string()]);
        assert!(!req.contains("VORTICITY"));
    }

    #[test]
    fn refilter_continues_from_high_water_mark() {
        let mut reg = registry();
        let mut first: RequestList = ["SOLUTION"].into_iter().collect();
        reg.filter(&mut first);
        let mut second: RequestList = ["COORDINATES", "SOLUTION"].into_iter().collect();
        let report = reg.filter(&mut second);
        assert!(report.all_matched());
        assert_eq!(reg.offset("DENSITY").unwrap(), Some(ColumnId(0)));
        assert_eq!(reg.offset("COORD-X").unwrap(), Some(ColumnId(1)));
        assert_eq!(reg.offset("COORD-Y").unwrap(), Some(ColumnId(2)));
    }

    #[test]
    fn duplicate_and_unknown() {
        let mut reg = registry();
        assert!(matches!(
            reg.add(VolumeField::new("MACH", "M", "X", "")),
            Err(RegistryError::DuplicateField {
                scope: FieldScope::Volume,
                ..
            })
        ));
        assert!(matches!(
            reg.lookup("NOPE"),
            Err(RegistryError::UnknownField { .. })
        ));
    }

    #[test]
    fn add_discards_preset_offset() {
        let mut reg = VolumeRegistry::new();
        let mut f = VolumeField::new("Q", "q", "G", "");
        f.offset = Some(ColumnId(9));
        reg.add(f).unwrap();
        assert_eq!(reg.offset("Q").unwrap(), None);
        assert_eq!(reg.active_count(), 0);
    }

    proptest! {
        #[test]
        fn matching_fields_get_dense_increasing_offsets(
            groups in prop::collection::vec(0u8..4, 1..40),
            first in 0u8..4,
            second in 0u8..4,
        ) {
            let mut reg = VolumeRegistry::new();
            for (i, g) in groups.iter().enumerate() {
                reg.add(VolumeField::new(format!("F{i}"), format!("f{i}"), format!("G{g}"), ""))
                    .unwrap();
            }
            let mut req: RequestList = [format!("G{first}")].into_iter().collect();
            reg.filter(&mut req);
            let high_water = reg.active_count();
            prop_assert_eq!(high_water, groups.iter().filter(|&&g| g == first).count());

            let mut req: RequestList = [format!("G{second}")].into_iter().collect();
            reg.filter(&mut req);

            let mut offsets: Vec<(usize, u32)> = reg
                .iter()
                .enumerate()
                .filter_map(|(i, f)| f.offset.map(|c| (i, c.0)))
                .collect();
            // First-pass columns are 0..high_water in declaration order.
            let first_pass: Vec<u32> = offsets
                .iter()
                .filter(|(i, _)| groups[*i] == first)
                .map(|&(_, c)| c)
                .collect();
            prop_assert_eq!(first_pass, (0..high_water as u32).collect::<Vec<_>>());
            // Second-pass additions continue from the high-water mark.
            offsets.retain(|(i, _)| groups[*i] != first);
            let second_pass: Vec<u32> = offsets.iter().map(|&(_, c)| c).collect();
            let want: Vec<u32> = (high_water as u32..(high_water + second_pass.len()) as u32).collect();
            prop_assert_eq!(second_pass, want);
        }
    }
}
