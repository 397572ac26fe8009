//! Per-entity results table and the cached volume/surface sweeps that
//! fill it.

use tally_cache::CachePair;
use tally_core::{CacheError, ColumnId, FieldContributor, VolumeSink};
use tally_registry::VolumeRegistry;

use crate::error::{contributor, SessionError};

/// Dense entity-major table of active volume values.
///
/// Row `e` holds one value per active column for entity `e`. The table
/// keeps its contents between sweeps so running averages can fold new
/// values into old ones; it is zeroed only when its shape changes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VolumeTable {
    columns: usize,
    n_entities: usize,
    data: Vec<f64>,
}

impl VolumeTable {
    /// Create a zeroed table.
    pub fn new(n_entities: usize, columns: usize) -> Self {
        Self {
            columns,
            n_entities,
            data: vec![0.0; n_entities * columns],
        }
    }

    /// Resize to `n_entities x columns`, zeroing if the shape changed.
    pub fn reshape(&mut self, n_entities: usize, columns: usize) {
        if self.n_entities != n_entities || self.columns != columns {
            *self = Self::new(n_entities, columns);
        }
    }

    /// Number of entities (rows).
    pub fn n_entities(&self) -> usize {
        self.n_entities
    }

    /// Number of active columns.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Value at `(entity, column)`.
    pub fn get(&self, entity: usize, column: ColumnId) -> f64 {
        self.data[entity * self.columns + column.index()]
    }

    fn set(&mut self, entity: usize, column: ColumnId, value: f64) {
        self.data[entity * self.columns + column.index()] = value;
    }

    /// All values of `entity`, in column order.
    pub fn row(&self, entity: usize) -> &[f64] {
        let start = entity * self.columns;
        &self.data[start..start + self.columns]
    }

    /// Raw entity-major storage.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// Names and values of the active volume fields at one iteration.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeSnapshot {
    /// Active field keys in column order.
    pub names: Vec<String>,
    /// Active field labels in column order.
    pub labels: Vec<String>,
    /// The values.
    pub table: VolumeTable,
}

/// A surface vertex to visit in the surface sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceVertex {
    /// Marker index.
    pub marker: usize,
    /// Vertex index within the marker.
    pub vertex: usize,
    /// Entity (row) owning the vertex.
    pub entity: usize,
}

/// [`VolumeSink`] handed to contributors for one entity.
///
/// Writes and reads go through their own cache; a field that is
/// registered but inactive swallows writes and reads as zero.
pub struct VolumeWriter<'a> {
    registry: &'a VolumeRegistry,
    caches: &'a mut CachePair,
    table: &'a mut VolumeTable,
    entity: usize,
    average_scaling: f64,
}

fn resolver(
    registry: &VolumeRegistry,
) -> impl FnOnce(&str) -> Result<Option<ColumnId>, CacheError> + '_ {
    move |name| {
        registry.offset(name).map_err(|_| CacheError::UnknownField {
            name: name.to_string(),
        })
    }
}

impl VolumeSink for VolumeWriter<'_> {
    fn set(&mut self, key: &str, value: f64) -> Result<(), CacheError> {
        if let Some(col) = self.caches.write.resolve(key, resolver(self.registry))? {
            self.table.set(self.entity, col, value);
        }
        Ok(())
    }

    fn get(&mut self, key: &str) -> Result<f64, CacheError> {
        Ok(self
            .caches
            .read
            .resolve(key, resolver(self.registry))?
            .map_or(0.0, |col| self.table.get(self.entity, col)))
    }

    fn set_running_average(&mut self, key: &str, value: f64) -> Result<(), CacheError> {
        if let Some(col) = self.caches.write.resolve(key, resolver(self.registry))? {
            let old = self.table.get(self.entity, col);
            let s = self.average_scaling;
            self.table.set(self.entity, col, value * s + old * (1.0 - s));
        }
        Ok(())
    }
}

/// Fills a [`VolumeTable`] from a set of contributors.
pub(crate) struct VolumeSweep<'a> {
    pub registry: &'a VolumeRegistry,
    pub caches: &'a mut CachePair,
    pub table: &'a mut VolumeTable,
    /// Weight of the new value in running averages.
    pub average_scaling: f64,
}

impl VolumeSweep<'_> {
    fn entity<F>(&mut self, entity: usize, mut load: F) -> Result<(), SessionError>
    where
        F: FnMut(&mut VolumeWriter<'_>) -> Result<(), SessionError>,
    {
        self.caches.begin_entity();
        let mut writer = VolumeWriter {
            registry: self.registry,
            caches: &mut *self.caches,
            table: &mut *self.table,
            entity,
            average_scaling: self.average_scaling,
        };
        load(&mut writer)?;
        self.caches.finish_entity()?;
        Ok(())
    }

    /// Run the volume sweep over every entity, then the surface sweep over
    /// `surface`. Each sweep calibrates its own access sequence.
    pub fn run(
        &mut self,
        contributors: &[Box<dyn FieldContributor>],
        surface: &[SurfaceVertex],
    ) -> Result<(), SessionError> {
        let n_entities = self.table.n_entities();
        if let Some(v) = surface.iter().find(|v| v.entity >= n_entities) {
            return Err(SessionError::EntityOutOfRange {
                entity: v.entity,
                n_entities,
            });
        }

        self.caches.invalidate();
        for entity in 0..n_entities {
            self.entity(entity, |w| {
                for c in contributors {
                    c.load_volume(entity, w).map_err(contributor(c.name()))?;
                }
                Ok(())
            })?;
        }

        self.caches.invalidate();
        for v in surface {
            self.entity(v.entity, |w| {
                for c in contributors {
                    c.load_surface(v.entity, v.marker, v.vertex, w)
                        .map_err(contributor(c.name()))?;
                }
                Ok(())
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{
        ContributorError, HistoryDeclare, HistorySink, IterationInfo, VolumeDeclare, VolumeField,
    };
    use tally_registry::RequestList;

    struct Flow;

    impl FieldContributor for Flow {
        fn name(&self) -> &str {
            "flow"
        }

        fn declare_history(&self, _: &mut dyn HistoryDeclare) -> Result<(), ContributorError> {
            Ok(())
        }

        fn declare_volume(&self, fields: &mut dyn VolumeDeclare) -> Result<(), ContributorError> {
            fields.add(VolumeField::new("DENSITY", "Density", "SOLUTION", ""))?;
            fields.add(VolumeField::new("MACH", "Mach", "PRIMITIVE", ""))?;
            fields.add(VolumeField::new("MEAN_MACH", "MeanMach", "TIME_AVERAGE", ""))?;
            fields.add(VolumeField::new("CP", "Pressure_Coefficient", "PRIMITIVE", ""))?;
            Ok(())
        }

        fn load_history(&self, _: &IterationInfo, _: &mut dyn HistorySink) -> Result<(), ContributorError> {
            Ok(())
        }

        fn load_volume(&self, entity: usize, out: &mut dyn VolumeSink) -> Result<(), ContributorError> {
            let rho = 1.0 + entity as f64;
            out.set("DENSITY", rho)?;
            out.set("MACH", rho * 0.5)?;
            let mach = out.get("MACH")?;
            out.set_running_average("MEAN_MACH", mach)?;
            Ok(())
        }

        fn load_surface(
            &self,
            entity: usize,
            _marker: usize,
            vertex: usize,
            out: &mut dyn VolumeSink,
        ) -> Result<(), ContributorError> {
            out.set("CP", -(entity as f64) - vertex as f64 * 0.25)?;
            Ok(())
        }
    }

    fn registry(requested: &[&str]) -> VolumeRegistry {
        let mut reg = VolumeRegistry::new();
        Flow.declare_volume(&mut reg).unwrap();
        let mut req: RequestList = requested.iter().copied().collect();
        reg.filter(&mut req);
        reg
    }

    fn sweep(
        reg: &VolumeRegistry,
        caches: &mut CachePair,
        table: &mut VolumeTable,
        scaling: f64,
        surface: &[SurfaceVertex],
    ) -> Result<(), SessionError> {
        let contributors: Vec<Box<dyn FieldContributor>> = vec![Box::new(Flow)];
        VolumeSweep {
            registry: reg,
            caches,
            table,
            average_scaling: scaling,
        }
        .run(&contributors, surface)
    }

    #[test]
    fn sweep_fills_active_columns_only() {
        let reg = registry(&["DENSITY", "PRIMITIVE"]);
        let mut caches = CachePair::new();
        let mut table = VolumeTable::new(3, reg.active_count());
        let surface = [SurfaceVertex { marker: 0, vertex: 1, entity: 2 }];
        sweep(&reg, &mut caches, &mut table, 1.0, &surface).unwrap();

        // DENSITY, MACH, CP are active; MEAN_MACH is not.
        assert_eq!(table.row(0), &[1.0, 0.5, 0.0]);
        assert_eq!(table.row(1), &[2.0, 1.0, 0.0]);
        assert_eq!(table.row(2), &[3.0, 1.5, -2.25]);
        // One calibration per stream per sweep: volume writes, volume
        // reads, surface writes.
        assert_eq!(caches.calibrations(), 3);
        assert_eq!(caches.lookups(), 5);
    }

    #[test]
    fn running_average_folds_across_sweeps() {
        let reg = registry(&["MACH", "MEAN_MACH"]);
        let mut caches = CachePair::new();
        let mut table = VolumeTable::new(2, 2);
        sweep(&reg, &mut caches, &mut table, 0.0, &[]).unwrap();
        assert_eq!(table.row(1), &[1.0, 0.0]);
        sweep(&reg, &mut caches, &mut table, 0.5, &[]).unwrap();
        assert_eq!(table.row(1), &[1.0, 0.5]);
        assert_eq!(table.row(0), &[0.5, 0.25]);
    }

    #[test]
    fn surface_vertex_outside_table_rejected() {
        let reg = registry(&["CP"]);
        let mut caches = CachePair::new();
        let mut table = VolumeTable::new(2, 1);
        let surface = [SurfaceVertex { marker: 0, vertex: 0, entity: 5 }];
        assert_eq!(
            sweep(&reg, &mut caches, &mut table, 1.0, &surface),
            Err(SessionError::EntityOutOfRange {
                entity: 5,
                n_entities: 2
            })
        );
    }

    #[test]
    fn reshape_zeroes_only_on_change() {
        let mut table = VolumeTable::new(2, 1);
        table.set(1, ColumnId(0), 4.0);
        table.reshape(2, 1);
        assert_eq!(table.get(1, ColumnId(0)), 4.0);
        table.reshape(3, 1);
        assert_eq!(table.as_slice(), &[0.0, 0.0, 0.0]);
    }
}
