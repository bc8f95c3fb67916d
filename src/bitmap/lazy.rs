//! Deferred-maintenance set operations.
//!
//! The lazy operations skip per-chunk cardinality maintenance and layout
//! canonicalization, which makes long chains of unions or symmetric
//! differences cheaper. The price is a contract: once a bitmap has been
//! touched by a lazy operation, [`Bitmap::repair_after_lazy`] must run
//! before anything reads cardinalities or relies on minimal layouts.

use crate::bitmap::Pairs;
use crate::Bitmap;

impl Bitmap {
    /// In-place union that defers cardinality and layout maintenance.
    ///
    /// Until [`Bitmap::repair_after_lazy`] is called, `self` may report
    /// cardinalities slowly and hold non-minimal chunk layouts. Queries
    /// remain correct in the meantime.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap;
    ///
    /// let mut acc = Bitmap::new();
    /// for chunk in [&[1u32, 2, 3][..], &[3, 4], &[100_000]] {
    ///     acc.lazy_bitor_assign(&chunk.iter().copied().collect());
    /// }
    /// acc.repair_after_lazy();
    /// assert_eq!(acc, Bitmap::from([1, 2, 3, 4, 100_000]));
    /// ```
    pub fn lazy_bitor_assign(&mut self, rhs: &Bitmap) {
        for container in &rhs.containers {
            let key = container.key;
            match self.containers.binary_search_by_key(&key, |c| c.key) {
                Err(loc) => self.containers.insert(loc, container.clone()),
                Ok(loc) => self.containers[loc].lazy_bitor_assign(container),
            }
        }
    }

    /// In-place symmetric difference that defers cardinality and layout
    /// maintenance.
    ///
    /// Chunks emptied by the operation stay around until
    /// [`Bitmap::repair_after_lazy`] removes them, so even `is_empty` may
    /// be wrong until then. Same repair contract as
    /// [`Bitmap::lazy_bitor_assign`].
    pub fn lazy_bitxor_assign(&mut self, rhs: &Bitmap) {
        let lhs_containers = core::mem::take(&mut self.containers);
        for pair in Pairs::new(lhs_containers, &rhs.containers) {
            match pair {
                (Some(mut lhs), Some(rhs)) => {
                    lhs.lazy_bitxor_assign(rhs);
                    self.containers.push(lhs);
                }
                (Some(lhs), None) => self.containers.push(lhs),
                (None, Some(rhs)) => self.containers.push(rhs.clone()),
                (None, None) => break,
            }
        }
    }

    /// Restores the invariants deferred by the lazy operations: recomputes
    /// cached cardinalities, drops emptied chunks and installs minimal
    /// layouts.
    pub fn repair_after_lazy(&mut self) {
        self.containers.retain_mut(|container| {
            container.repair();
            !container.is_empty()
        });
    }
}
