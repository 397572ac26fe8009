//! Calibrate-then-replay cache of name-to-column resolutions.
//!
//! Per-entity output code addresses fields by name. Resolving a name is a
//! hash lookup; doing it for every field of every entity dominates a sweep.
//! [`IndexCache`] records the resolutions made while the first entity is
//! processed and hands them back positionally for every later entity, so a
//! sweep costs one lookup per distinct access instead of one per access.
//!
//! # Order contract
//!
//! Replay is positional: the k-th access of every entity must name the
//! same field as the k-th access during calibration. The cache checks this
//! in two ways:
//!
//! - every build compares the number of accesses at
//!   [`finish_entity`](IndexCache::finish_entity);
//! - debug builds also compare a hash of each replayed name against the
//!   name recorded for that slot.
//!
//! # Invalidation
//!
//! The recorded sequence is cleared by [`invalidate`](IndexCache::invalidate).
//! Callers invalidate between sweeps whose access pattern differs (volume
//! then surface) and whenever the set of active columns changes.

use tally_core::{CacheError, ColumnId};
use tracing::{debug, warn};

use crate::fingerprint::SequenceFingerprint;
#[cfg(debug_assertions)]
use crate::fingerprint::name_hash;

/// Positional cache of column resolutions for one access stream.
///
/// A resolution of `None` means the field is registered but inactive;
/// writes to it are dropped and reads return zero.
#[derive(Debug, Default)]
pub struct IndexCache {
    slots: Vec<Option<ColumnId>>,
    #[cfg(debug_assertions)]
    slot_hashes: Vec<u64>,
    fingerprint: SequenceFingerprint,
    cursor: usize,
    calibrating: bool,
    lookups: u64,
    replayed: u64,
    calibrations: u64,
}

impl IndexCache {
    /// Create an empty cache. The first entity will calibrate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start processing an entity.
    ///
    /// The entity calibrates if no slot has been recorded yet; otherwise
    /// it replays from slot 0.
    pub fn begin_entity(&mut self) {
        self.calibrating = self.slots.is_empty();
        self.cursor = 0;
    }

    /// Resolve `name` to a column.
    ///
    /// While calibrating, `lookup` is called and its result recorded. While
    /// replaying, the next recorded slot is returned and `lookup` is not
    /// called. A failed lookup discards the partial calibration.
    pub fn resolve<F>(&mut self, name: &str, lookup: F) -> Result<Option<ColumnId>, CacheError>
    where
        F: FnOnce(&str) -> Result<Option<ColumnId>, CacheError>,
    {
        if self.calibrating {
            self.lookups += 1;
            let column = match lookup(name) {
                Ok(c) => c,
                Err(e) => {
                    self.invalidate();
                    return Err(e);
                }
            };
            self.slots.push(column);
            #[cfg(debug_assertions)]
            {
                self.slot_hashes.push(name_hash(name));
            }
            self.fingerprint.push(name);
            return Ok(column);
        }

        let slot = self.cursor;
        let column = *self.slots.get(slot).ok_or(CacheError::CountMismatch {
            recorded: self.slots.len(),
            replayed: slot + 1,
        })?;
        #[cfg(debug_assertions)]
        {
            if self.slot_hashes[slot] != name_hash(name) {
                warn!(slot, name, "index cache replayed a different field than calibrated");
                return Err(CacheError::SequenceMismatch {
                    slot,
                    name: name.to_string(),
                });
            }
        }
        self.cursor += 1;
        self.replayed += 1;
        Ok(column)
    }

    /// Finish the current entity.
    ///
    /// Ends calibration, or checks that the replaying entity made exactly
    /// as many accesses as were recorded.
    pub fn finish_entity(&mut self) -> Result<(), CacheError> {
        if self.calibrating {
            self.calibrating = false;
            if !self.slots.is_empty() {
                self.calibrations += 1;
                debug!(
                    slots = self.slots.len(),
                    hash = self.fingerprint.hash,
                    "index cache calibrated"
                );
            }
            return Ok(());
        }
        if self.cursor != self.slots.len() {
            warn!(
                recorded = self.slots.len(),
                replayed = self.cursor,
                "index cache access count changed between entities"
            );
            return Err(CacheError::CountMismatch {
                recorded: self.slots.len(),
                replayed: self.cursor,
            });
        }
        Ok(())
    }

    /// Drop the recorded sequence. The next entity calibrates.
    pub fn invalidate(&mut self) {
        self.slots.clear();
        #[cfg(debug_assertions)]
        {
            self.slot_hashes.clear();
        }
        self.fingerprint = SequenceFingerprint::EMPTY;
        self.cursor = 0;
        self.calibrating = false;
    }

    /// Whether the current entity is recording.
    pub fn is_calibrating(&self) -> bool {
        self.calibrating
    }

    /// Number of recorded slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` if nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Total lookups performed since creation.
    pub fn lookups(&self) -> u64 {
        self.lookups
    }

    /// Total accesses answered from recorded slots since creation.
    pub fn replayed(&self) -> u64 {
        self.replayed
    }

    /// Number of completed, non-empty calibrations since creation.
    pub fn calibrations(&self) -> u64 {
        self.calibrations
    }

    /// Fingerprint of the recorded sequence.
    pub fn fingerprint(&self) -> SequenceFingerprint {
        self.fingerprint
    }
}

/// Independent caches for the write stream and the read stream of a sweep.
///
/// Writes and reads interleave differently per contributor, so each stream
/// is recorded and replayed on its own.
#[derive(Debug, Default)]
pub struct CachePair {
    /// Cache for value writes.
    pub write: IndexCache,
    /// Cache for value reads.
    pub read: IndexCache,
}

impl CachePair {
    /// Create an empty pair.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an entity on both streams.
    pub fn begin_entity(&mut self) {
        self.write.begin_entity();
        self.read.begin_entity();
    }

    /// Finish an entity on both streams.
    pub fn finish_entity(&mut self) -> Result<(), CacheError> {
        self.write.finish_entity()?;
        self.read.finish_entity()
    }

    /// Invalidate both streams.
    pub fn invalidate(&mut self) {
        self.write.invalidate();
        self.read.invalidate();
    }

    /// Lookups performed by both streams.
    pub fn lookups(&self) -> u64 {
        self.write.lookups() + self.read.lookups()
    }

    /// Replayed accesses on both streams.
    pub fn replayed(&self) -> u64 {
        self.write.replayed() + self.read.replayed()
    }

    /// Calibrations completed on both streams.
    pub fn calibrations(&self) -> u64 {
        self.write.calibrations() + self.read.calibrations()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn table() -> HashMap<&'static str, Option<ColumnId>> {
        HashMap::from([
            ("DENSITY", Some(ColumnId(0))),
            ("PRESSURE", Some(ColumnId(1))),
            ("MACH", Some(ColumnId(2))),
            ("VORTICITY", None),
        ])
    }

    fn lookup<'a>(
        table: &'a HashMap<&'static str, Option<ColumnId>>,
        counter: &'a mut u32,
    ) -> impl FnMut(&str) -> Result<Option<ColumnId>, CacheError> + 'a {
        move |name: &str| {
            *counter += 1;
            table.get(name).copied().ok_or_else(|| CacheError::UnknownField {
                name: name.to_string(),
            })
        }
    }

    #[test]
    fn one_lookup_per_distinct_access_over_many_entities() {
        let table = table();
        let mut calls = 0u32;
        let mut find = lookup(&table, &mut calls);
        let mut cache = IndexCache::new();
        for _ in 0..1000 {
            cache.begin_entity();
            assert_eq!(cache.resolve("DENSITY", &mut find).unwrap(), Some(ColumnId(0)));
            assert_eq!(cache.resolve("PRESSURE", &mut find).unwrap(), Some(ColumnId(1)));
            assert_eq!(cache.resolve("MACH", &mut find).unwrap(), Some(ColumnId(2)));
            cache.finish_entity().unwrap();
        }
        drop(find);
        assert_eq!(calls, 3);
        assert_eq!(cache.lookups(), 3);
        assert_eq!(cache.replayed(), 2997);
        assert_eq!(cache.calibrations(), 1);
    }

    #[test]
    fn inactive_field_resolves_to_none() {
        let table = table();
        let mut calls = 0u32;
        let mut find = lookup(&table, &mut calls);
        let mut cache = IndexCache::new();
        cache.begin_entity();
        assert_eq!(cache.resolve("VORTICITY", &mut find).unwrap(), None);
        cache.finish_entity().unwrap();
        cache.begin_entity();
        assert_eq!(cache.resolve("VORTICITY", &mut find).unwrap(), None);
        cache.finish_entity().unwrap();
    }

    #[test]
    fn unknown_name_fails_calibration() {
        let table = table();
        let mut calls = 0u32;
        let mut find = lookup(&table, &mut calls);
        let mut cache = IndexCache::new();
        cache.begin_entity();
        cache.resolve("DENSITY", &mut find).unwrap();
        let err = cache.resolve("NOPE", &mut find).unwrap_err();
        assert_eq!(err, CacheError::UnknownField { name: "NOPE".into() });
        assert!(cache.is_empty());
    }

    #[test]
    fn fewer_accesses_on_replay_is_detected() {
        let table = table();
        let mut calls = 0u32;
        let mut find = lookup(&table, &mut calls);
        let mut cache = IndexCache::new();
        cache.begin_entity();
        cache.resolve("DENSITY", &mut find).unwrap();
        cache.resolve("MACH", &mut find).unwrap();
        cache.finish_entity().unwrap();

        cache.begin_entity();
        cache.resolve("DENSITY", &mut find).unwrap();
        assert_eq!(
            cache.finish_entity(),
            Err(CacheError::CountMismatch {
                recorded: 2,
                replayed: 1
            })
        );
    }

    #[test]
    fn extra_access_on_replay_is_detected() {
        let table = table();
        let mut calls = 0u32;
        let mut find = lookup(&table, &mut calls);
        let mut cache = IndexCache::new();
        cache.begin_entity();
        cache.resolve("DENSITY", &mut find).unwrap();
        cache.finish_entity().unwrap();

        cache.begin_entity();
        cache.resolve("DENSITY", &mut find).unwrap();
        assert_eq!(
            cache.resolve("DENSITY", &mut find),
            Err(CacheError::CountMismatch {
                recorded: 1,
                replayed: 2
            })
        );
    }

    #[cfg(debug_assertions)]
    #[test]
    fn swapped_order_is_detected_in_debug_builds() {
        let table = table();
        let mut calls = 0u32;
        let mut find = lookup(&table, &mut calls);
        let mut cache = IndexCache::new();
        cache.begin_entity();
        cache.resolve("DENSITY", &mut find).unwrap();
        cache.resolve("MACH", &mut find).unwrap();
        cache.finish_entity().unwrap();

        cache.begin_entity();
        assert_eq!(
            cache.resolve("MACH", &mut find),
            Err(CacheError::SequenceMismatch {
                slot: 0,
                name: "MACH".into()
            })
        );
    }

    #[test]
    fn invalidate_forces_recalibration() {
        let table = table();
        let mut calls = 0u32;
        let mut find = lookup(&table, &mut calls);
        let mut cache = IndexCache::new();
        cache.begin_entity();
        cache.resolve("DENSITY", &mut find).unwrap();
        cache.finish_entity().unwrap();
        let before = cache.fingerprint();

        cache.invalidate();
        assert_eq!(cache.fingerprint(), SequenceFingerprint::EMPTY);
        cache.begin_entity();
        assert!(cache.is_calibrating());
        cache.resolve("PRESSURE", &mut find).unwrap();
        cache.finish_entity().unwrap();
        assert_ne!(cache.fingerprint(), before);
        assert_eq!(cache.lookups(), 2);
    }

    #[test]
    fn empty_entity_keeps_calibrating() {
        let mut cache = IndexCache::new();
        cache.begin_entity();
        cache.finish_entity().unwrap();
        cache.begin_entity();
        assert!(cache.is_calibrating());
        assert_eq!(cache.calibrations(), 0);
    }

    #[test]
    fn pair_streams_are_independent() {
        let table = table();
        let mut calls = 0u32;
        let mut find = lookup(&table, &mut calls);
        let mut pair = CachePair::new();
        for _ in 0..10 {
            pair.begin_entity();
            pair.write.resolve("DENSITY", &mut find).unwrap();
            pair.write.resolve("MACH", &mut find).unwrap();
            pair.read.resolve("PRESSURE", &mut find).unwrap();
            pair.finish_entity().unwrap();
        }
        assert_eq!(pair.lookups(), 3);
        assert_eq!(pair.replayed(), 27);
        assert_eq!(pair.calibrations(), 2);
    }

    proptest! {
        #[test]
        fn replay_matches_direct_lookup(
            sequence in prop::collection::vec(0usize..4, 1..20),
            entities in 1usize..50,
        ) {
            let names = ["DENSITY", "PRESSURE", "MACH", "VORTICITY"];
            let table = table();
            let mut cache = IndexCache::new();
            for _ in 0..entities {
                cache.begin_entity();
                for &i in &sequence {
                    let got = cache
                        .resolve(names[i], |n| Ok(table[n]))
                        .unwrap();
                    prop_assert_eq!(got, table[names[i]]);
                }
                cache.finish_entity().unwrap();
            }
            prop_assert_eq!(cache.lookups(), sequence.len() as u64);
            prop_assert_eq!(
                cache.fingerprint(),
                SequenceFingerprint::of(sequence.iter().map(|&i| names[i]))
            );
        }
    }
}
