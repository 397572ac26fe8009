//! Fingerprint of a recorded access sequence.

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a hash of a single field name.
#[cfg_attr(not(debug_assertions), allow(dead_code))]
pub(crate) fn name_hash(name: &str) -> u64 {
    fold(FNV_OFFSET, name.as_bytes())
}

fn fold(mut hash: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Identity of a calibrated access sequence: slot count plus an FNV-1a
/// hash over the names in order.
///
/// Two caches calibrated against the same registry with the same access
/// sequence have equal fingerprints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SequenceFingerprint {
    /// Number of recorded accesses.
    pub count: usize,
    /// Order-sensitive hash of the accessed names.
    pub hash: u64,
}

impl SequenceFingerprint {
    /// Fingerprint of an empty sequence.
    pub const EMPTY: Self = Self {
        count: 0,
        hash: FNV_OFFSET,
    };

    /// Extend the fingerprint by one access.
    pub(crate) fn push(&mut self, name: &str) {
        // 0xff never occurs in UTF-8, so "AB","C" and "A","BC" differ.
        self.hash = fold(fold(self.hash, name.as_bytes()), &[0xff]);
        self.count += 1;
    }

    /// Fingerprint of `names` accessed in order.
    pub fn of<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut fp = Self::EMPTY;
        for n in names {
            fp.push(n);
        }
        fp
    }
}

impl Default for SequenceFingerprint {
    fn default() -> Self {
        Self::EMPTY
    }
}
