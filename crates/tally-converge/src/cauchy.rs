//! Fixed-capacity ring of successive differences.

/// Ring buffer of `|x_k - x_{k-1}|` values indexed by iteration.
///
/// Slot `k % capacity` holds the difference recorded at iteration `k`, so
/// once `capacity` iterations have been pushed the sum covers exactly the
/// last `capacity` differences.
#[derive(Clone, Debug)]
pub struct CauchySeries {
    buf: Vec<f64>,
}

impl CauchySeries {
    /// Create a zeroed series. A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0.0; capacity.max(1)],
        }
    }

    /// Record `diff` for `iteration`.
    pub fn push(&mut self, iteration: u64, diff: f64) {
        let slot = (iteration % self.buf.len() as u64) as usize;
        self.buf[slot] = diff;
    }

    /// Sum of all slots.
    pub fn sum(&self) -> f64 {
        self.buf.iter().sum()
    }

    /// Zero every slot.
    pub fn clear(&mut self) {
        self.buf.fill(0.0);
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn wraps_by_iteration() {
        let mut s = CauchySeries::new(3);
        for it in 0..5u64 {
            s.push(it, it as f64);
        }
        // Slots hold iterations 3, 4, 2.
        assert_eq!(s.sum(), 9.0);
        s.clear();
        assert_eq!(s.sum(), 0.0);
    }

    #[test]
    fn zero_capacity_is_one_slot() {
        let mut s = CauchySeries::new(0);
        assert_eq!(s.capacity(), 1);
        s.push(7, 2.5);
        s.push(8, 1.5);
        assert_eq!(s.sum(), 1.5);
    }

    proptest! {
        #[test]
        fn sum_covers_last_capacity_pushes(
            cap in 1usize..8,
            diffs in prop::collection::vec(0u32..1000, 0..40),
        ) {
            let mut s = CauchySeries::new(cap);
            for (it, d) in diffs.iter().enumerate() {
                s.push(it as u64, *d as f64);
            }
            let start = diffs.len().saturating_sub(cap);
            let expected: u32 = diffs[start..].iter().sum();
            prop_assert_eq!(s.sum(), expected as f64);
        }
    }
}
