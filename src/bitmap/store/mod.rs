mod array_store;
mod bitmap_store;
mod interval_store;

use core::mem;
use core::ops::{
    BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, RangeInclusive, Sub, SubAssign,
};
use core::slice;

pub use self::bitmap_store::BITMAP_LENGTH;
pub(crate) use self::bitmap_store::BITMAP_BYTES;
use self::Store::{Array, Bitmap, Run};

pub(crate) use self::array_store::ArrayStore;
pub use self::bitmap_store::{BitmapIter, BitmapStore};
pub(crate) use self::interval_store::{Interval, IntervalStore};

use crate::bitmap::container::ARRAY_LIMIT;

/// The per-chunk store. One variant per layout; the copy-on-write wrapper
/// lives a level up in the container, so kernels never see a shared store.
#[derive(Clone, Debug)]
pub(crate) enum Store {
    Array(ArrayStore),
    Bitmap(BitmapStore),
    Run(IntervalStore),
}

#[derive(Clone)]
pub(crate) enum Iter<'a> {
    Array(slice::Iter<'a, u16>),
    Vec(std::vec::IntoIter<u16>),
    BitmapBorrowed(BitmapIter<&'a [u64; BITMAP_LENGTH]>),
    BitmapOwned(BitmapIter<Box<[u64; BITMAP_LENGTH]>>),
    Run(RunIter),
}

impl Store {
    pub fn new() -> Store {
        Store::Array(ArrayStore::new())
    }

    pub fn full() -> Store {
        Store::Run(IntervalStore::full())
    }

    #[inline]
    pub fn insert(&mut self, index: u16) -> bool {
        match self {
            Array(vec) => vec.insert(index),
            Bitmap(bits) => bits.insert(index),
            Run(runs) => runs.insert(index),
        }
    }

    pub fn insert_range(&mut self, range: RangeInclusive<u16>) -> u64 {
        if range.is_empty() {
            return 0;
        }
        match self {
            Array(vec) => vec.insert_range(range),
            Bitmap(bits) => bits.insert_range(range),
            Run(runs) => runs.insert_range(range),
        }
    }

    /// Push `index` at the end of the store only if `index` is the new max.
    ///
    /// Returns whether `index` was effectively pushed.
    pub fn push(&mut self, index: u16) -> bool {
        match self {
            Array(vec) => vec.push(index),
            Bitmap(bits) => bits.push(index),
            Run(runs) => runs.push(index),
        }
    }

    ///
    /// Pushes `index` at the end of the store.
    /// It is up to the caller to have validated index > self.max()
    ///
    /// # Panics
    ///
    /// If debug_assertions enabled and index is > self.max()
    pub(crate) fn push_unchecked(&mut self, index: u16) {
        match self {
            Array(vec) => vec.push_unchecked(index),
            Bitmap(bits) => bits.push_unchecked(index),
            Run(runs) => {
                let pushed = runs.push(index);
                debug_assert!(pushed, "store max >= index");
            }
        }
    }

    pub fn remove(&mut self, index: u16) -> bool {
        match self {
            Array(vec) => vec.remove(index),
            Bitmap(bits) => bits.remove(index),
            Run(runs) => runs.remove(index),
        }
    }

    pub fn remove_range(&mut self, range: RangeInclusive<u16>) -> u64 {
        if range.is_empty() {
            return 0;
        }
        match self {
            Array(vec) => vec.remove_range(range),
            Bitmap(bits) => bits.remove_range(range),
            Run(runs) => runs.remove_range(range),
        }
    }

    pub fn remove_smallest(&mut self, n: u64) {
        match self {
            Array(vec) => vec.remove_smallest(n),
            Bitmap(bits) => bits.remove_smallest(n),
            Run(runs) => runs.remove_smallest(n),
        }
    }

    pub fn remove_biggest(&mut self, n: u64) {
        match self {
            Array(vec) => vec.remove_biggest(n),
            Bitmap(bits) => bits.remove_biggest(n),
            Run(runs) => runs.remove_biggest(n),
        }
    }

    /// Toggles every position in the range.
    pub fn flip_range(&mut self, range: RangeInclusive<u16>) {
        if range.is_empty() {
            return;
        }
        // Negation is symmetric difference with a single full run.
        BitXorAssign::bitxor_assign(self, &Run(IntervalStore::new_with_range(range)));
    }

    pub fn contains(&self, index: u16) -> bool {
        match self {
            Array(vec) => vec.contains(index),
            Bitmap(bits) => bits.contains(index),
            Run(runs) => runs.contains(index),
        }
    }

    pub fn contains_range(&self, range: RangeInclusive<u16>) -> bool {
        if range.is_empty() {
            return true;
        }
        match self {
            Array(vec) => vec.contains_range(range),
            Bitmap(bits) => bits.contains_range(range),
            Run(runs) => runs.contains_range(range),
        }
    }

    pub fn intersects_range(&self, range: RangeInclusive<u16>) -> bool {
        if range.is_empty() {
            return false;
        }
        match self {
            Array(vec) => vec.intersects_range(range),
            Bitmap(bits) => bits.intersects_range(range),
            Run(runs) => runs.intersects_range(range),
        }
    }

    pub fn is_full(&self) -> bool {
        match self {
            Run(runs) => runs.is_full(),
            _ => self.len() == (1 << 16),
        }
    }

    pub fn is_disjoint(&self, other: &Self) -> bool {
        match (self, other) {
            (Array(vec1), Array(vec2)) => vec1.is_disjoint(vec2),
            (Bitmap(bits1), Bitmap(bits2)) => bits1.is_disjoint(bits2),
            (Array(vec), Bitmap(bits)) | (Bitmap(bits), Array(vec)) => {
                vec.iter().all(|&i| !bits.contains(i))
            }
            (Run(runs1), Run(runs2)) => runs1.is_disjoint(runs2),
            (Array(vec), Run(runs)) | (Run(runs), Array(vec)) => {
                vec.iter().all(|&i| !runs.contains(i))
            }
            (Bitmap(bits), Run(runs)) | (Run(runs), Bitmap(bits)) => runs
                .iter_intervals()
                .all(|iv| !bits.intersects_range(iv.start..=iv.end)),
        }
    }

    pub fn is_subset(&self, other: &Self) -> bool {
        match (self, other) {
            (Array(vec1), Array(vec2)) => vec1.is_subset(vec2),
            (Bitmap(bits1), Bitmap(bits2)) => bits1.is_subset(bits2),
            (Array(vec), Bitmap(bits)) => vec.iter().all(|&i| bits.contains(i)),
            (Bitmap(bits), Array(vec)) => bits.iter().all(|i| vec.contains(i)),
            (Array(vec), Run(runs)) => vec.iter().all(|&i| runs.contains(i)),
            (Run(runs), Array(vec)) => {
                runs.iter_intervals().all(|iv| vec.contains_range(iv.start..=iv.end))
            }
            (Run(runs), Bitmap(bits)) => {
                runs.iter_intervals().all(|iv| bits.contains_range(iv.start..=iv.end))
            }
            (Bitmap(bits), Run(runs)) => bits.iter().all(|i| runs.contains(i)),
            (Run(runs1), Run(runs2)) => runs1.is_subset(runs2),
        }
    }

    pub fn intersection_len(&self, other: &Self) -> u64 {
        match (self, other) {
            (Array(vec1), Array(vec2)) => vec1.intersection_len(vec2),
            (Bitmap(bits1), Bitmap(bits2)) => bits1.intersection_len_bitmap(bits2),
            (Array(vec), Bitmap(bits)) | (Bitmap(bits), Array(vec)) => {
                bits.intersection_len_array(vec)
            }
            (Run(runs1), Run(runs2)) => runs1.intersection_len(runs2),
            (Array(vec), Run(runs)) | (Run(runs), Array(vec)) => {
                runs.iter_intervals().map(|iv| vec.intersection_len_interval(iv)).sum()
            }
            (Bitmap(bits), Run(runs)) | (Run(runs), Bitmap(bits)) => {
                runs.iter_intervals().map(|iv| bits.intersection_len_interval(iv)).sum()
            }
        }
    }

    pub fn len(&self) -> u64 {
        match self {
            Array(vec) => vec.len(),
            Bitmap(bits) => bits.len(),
            Run(runs) => runs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Array(vec) => vec.is_empty(),
            Bitmap(bits) => bits.is_empty(),
            Run(runs) => runs.is_empty(),
        }
    }

    pub fn min(&self) -> Option<u16> {
        match self {
            Array(vec) => vec.min(),
            Bitmap(bits) => bits.min(),
            Run(runs) => runs.min(),
        }
    }

    #[inline]
    pub fn max(&self) -> Option<u16> {
        match self {
            Array(vec) => vec.max(),
            Bitmap(bits) => bits.max(),
            Run(runs) => runs.max(),
        }
    }

    pub fn rank(&self, index: u16) -> u64 {
        match self {
            Array(vec) => vec.rank(index),
            Bitmap(bits) => bits.rank(index),
            Run(runs) => runs.rank(index),
        }
    }

    pub fn select(&self, n: u16) -> Option<u16> {
        match self {
            Array(vec) => vec.select(n),
            Bitmap(bits) => bits.select(n),
            Run(runs) => runs.select(n),
        }
    }

    pub fn count_runs(&self) -> u64 {
        match self {
            Array(vec) => vec.count_runs(),
            Bitmap(bits) => bits.count_runs(),
            Run(runs) => runs.n_runs(),
        }
    }

    /// Bytes this store would take in the portable format.
    pub fn byte_size(&self) -> usize {
        match self {
            Array(vec) => vec.byte_size(),
            Bitmap(_) => BITMAP_BYTES,
            Run(runs) => runs.byte_size(),
        }
    }

    /// Releases slack heap capacity, returning the number of bytes freed.
    pub fn shrink_to_fit(&mut self) -> u64 {
        match self {
            Array(vec) => vec.shrink_to_fit(),
            Bitmap(_) => 0,
            Run(runs) => runs.shrink_to_fit(),
        }
    }

    /// Whether a lazy operation left this store with an unknown cardinality.
    pub(crate) fn needs_repair(&self) -> bool {
        match self {
            Bitmap(bits) => bits.len_is_unknown(),
            _ => false,
        }
    }

    pub(crate) fn repair_len(&mut self) {
        if let Bitmap(bits) = self {
            bits.repair_len();
        }
    }

    pub(crate) fn to_bitmap(&self) -> Store {
        match self {
            Array(arr) => Bitmap(arr.to_bitmap_store()),
            Bitmap(_) => self.clone(),
            Run(runs) => Bitmap(runs.to_bitmap()),
        }
    }

    pub(crate) fn to_run(&self) -> Store {
        match self {
            Array(vec) => Run(vec.to_interval_store()),
            Bitmap(bits) => Run(bits.to_interval_store()),
            Run(_) => self.clone(),
        }
    }

    pub(crate) fn to_array(&self) -> Store {
        match self {
            Array(_) => self.clone(),
            Bitmap(bits) => Array(bits.to_array_store()),
            Run(runs) => Array(runs.to_array()),
        }
    }

    /// Union without cardinality maintenance or canonicalization.
    ///
    /// The result may carry an unknown cardinality or a non-minimal layout;
    /// callers must repair the container before it is observed again.
    pub(crate) fn lazy_bitor_assign(&mut self, rhs: &Store) {
        let new_store = match (&mut *self, rhs) {
            (Bitmap(bits1), Bitmap(bits2)) => {
                bits1.lazy_bitor_assign(bits2);
                None
            }
            (Bitmap(bits1), Array(vec2)) => {
                bits1.lazy_bitor_assign_array(vec2);
                None
            }
            (Array(vec1), Bitmap(bits2)) => {
                let mut bits = bits2.clone();
                bits.lazy_bitor_assign_array(vec1);
                Some(Bitmap(bits))
            }
            (Array(vec1), Array(vec2)) => {
                if vec1.len() + vec2.len() > ARRAY_LIMIT {
                    let mut bits = vec1.to_bitmap_store();
                    bits.lazy_bitor_assign_array(vec2);
                    Some(Bitmap(bits))
                } else {
                    let this = mem::take(vec1);
                    *vec1 = BitOr::bitor(&this, vec2);
                    None
                }
            }
            // Run unions are already cheap to do exactly.
            _ => {
                BitOrAssign::bitor_assign(self, rhs);
                None
            }
        };
        if let Some(new_store) = new_store {
            *self = new_store;
        }
    }

    /// Symmetric difference without cardinality maintenance or
    /// canonicalization. Same repair contract as `lazy_bitor_assign`.
    pub(crate) fn lazy_bitxor_assign(&mut self, rhs: &Store) {
        let new_store = match (&mut *self, rhs) {
            (Bitmap(bits1), Bitmap(bits2)) => {
                bits1.lazy_bitxor_assign(bits2);
                None
            }
            (Bitmap(bits1), Array(vec2)) => {
                bits1.lazy_bitxor_assign_array(vec2);
                None
            }
            (Array(vec1), Bitmap(bits2)) => {
                let mut bits = bits2.clone();
                bits.lazy_bitxor_assign_array(vec1);
                Some(Bitmap(bits))
            }
            _ => {
                BitXorAssign::bitxor_assign(self, rhs);
                None
            }
        };
        if let Some(new_store) = new_store {
            *self = new_store;
        }
    }

    pub(crate) fn internal_validate(&self) -> Result<(), &'static str> {
        match self {
            Array(vec) => vec.internal_validate(),
            Bitmap(bits) => {
                if bits.is_empty() {
                    Err("empty bitmap container")
                } else {
                    Ok(())
                }
            }
            Run(runs) => runs.internal_validate(),
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Store::new()
    }
}

// Clears the positions of `bits` not covered by `runs`.
fn bitmap_retain_intervals(bits: &mut BitmapStore, runs: &IntervalStore) {
    let mut prev = 0u32;
    for iv in runs.iter_intervals() {
        if u32::from(iv.start) > prev {
            bits.remove_range(prev as u16..=iv.start - 1);
        }
        prev = u32::from(iv.end) + 1;
    }
    if prev <= u32::from(u16::MAX) {
        bits.remove_range(prev as u16..=u16::MAX);
    }
}

impl BitOr<&Store> for &Store {
    type Output = Store;

    fn bitor(self, rhs: &Store) -> Store {
        match (self, rhs) {
            (Array(vec1), Array(vec2)) => Array(BitOr::bitor(vec1, vec2)),
            // Clone whichever side already has the dense layout.
            (Array(..) | Run(..), Bitmap(..)) => {
                let mut rhs = rhs.clone();
                BitOrAssign::bitor_assign(&mut rhs, self);
                rhs
            }
            _ => {
                let mut lhs = self.clone();
                BitOrAssign::bitor_assign(&mut lhs, rhs);
                lhs
            }
        }
    }
}

impl BitOrAssign<Store> for Store {
    fn bitor_assign(&mut self, mut rhs: Store) {
        // Reuse the dense allocation when only the right side has one.
        if let (Array(..) | Run(..), Bitmap(..)) = (&*self, &rhs) {
            mem::swap(self, &mut rhs);
        }
        BitOrAssign::bitor_assign(self, &rhs);
    }
}

impl BitOrAssign<&Store> for Store {
    fn bitor_assign(&mut self, rhs: &Store) {
        // Arms that change the layout report the replacement instead of
        // assigning over the store they are still matched on.
        let new_store = match (&mut *self, rhs) {
            (Array(vec1), Array(vec2)) => {
                let this = mem::take(vec1);
                *vec1 = BitOr::bitor(&this, vec2);
                None
            }
            (Array(vec1), Bitmap(bits2)) => {
                let mut bits = bits2.clone();
                BitOrAssign::bitor_assign(&mut bits, &*vec1);
                Some(Bitmap(bits))
            }
            (Array(vec1), Run(runs2)) => {
                let mut runs = runs2.clone();
                for &i in vec1.iter() {
                    runs.insert(i);
                }
                Some(Run(runs))
            }
            (Bitmap(bits1), Array(vec2)) => {
                BitOrAssign::bitor_assign(bits1, vec2);
                None
            }
            (Bitmap(bits1), Bitmap(bits2)) => {
                BitOrAssign::bitor_assign(bits1, bits2);
                None
            }
            (Bitmap(bits1), Run(runs2)) => {
                for iv in runs2.iter_intervals() {
                    bits1.insert_range(iv.start..=iv.end);
                }
                None
            }
            (Run(runs1), Array(vec2)) => {
                for &i in vec2.iter() {
                    runs1.insert(i);
                }
                None
            }
            (Run(runs1), Bitmap(bits2)) => {
                let mut bits = bits2.clone();
                for iv in runs1.iter_intervals() {
                    bits.insert_range(iv.start..=iv.end);
                }
                Some(Bitmap(bits))
            }
            (Run(runs1), Run(runs2)) => {
                *runs1 = runs1.union(runs2);
                None
            }
        };
        if let Some(new_store) = new_store {
            *self = new_store;
        }
    }
}

impl BitAnd<&Store> for &Store {
    type Output = Store;

    fn bitand(self, rhs: &Store) -> Store {
        match (self, rhs) {
            (Array(vec1), Array(vec2)) => Array(BitAnd::bitand(vec1, vec2)),
            // Intersections shrink: start from the sparse side.
            (Bitmap(..) | Run(..), Array(..)) => {
                let mut rhs = rhs.clone();
                BitAndAssign::bitand_assign(&mut rhs, self);
                rhs
            }
            _ => {
                let mut lhs = self.clone();
                BitAndAssign::bitand_assign(&mut lhs, rhs);
                lhs
            }
        }
    }
}

impl BitAndAssign<Store> for Store {
    fn bitand_assign(&mut self, mut rhs: Store) {
        // Keep the array side in place, it shrinks in place for free.
        if let (Bitmap(..) | Run(..), Array(..)) = (&*self, &rhs) {
            mem::swap(self, &mut rhs);
        }
        BitAndAssign::bitand_assign(self, &rhs);
    }
}

impl BitAndAssign<&Store> for Store {
    #[allow(clippy::suspicious_op_assign_impl)]
    fn bitand_assign(&mut self, rhs: &Store) {
        let new_store = match (&mut *self, rhs) {
            (Array(vec1), Array(vec2)) => {
                BitAndAssign::bitand_assign(vec1, vec2);
                None
            }
            (Array(vec1), Bitmap(bits2)) => {
                BitAndAssign::bitand_assign(vec1, bits2);
                None
            }
            (Array(vec1), Run(runs2)) => {
                vec1.retain(|i| runs2.contains(i));
                None
            }
            (Bitmap(bits1), Array(vec2)) => {
                let mut vec = vec2.clone();
                BitAndAssign::bitand_assign(&mut vec, &*bits1);
                Some(Array(vec))
            }
            (Bitmap(bits1), Bitmap(bits2)) => {
                BitAndAssign::bitand_assign(bits1, bits2);
                None
            }
            (Bitmap(bits1), Run(runs2)) => {
                bitmap_retain_intervals(bits1, runs2);
                None
            }
            (Run(runs1), Array(vec2)) => {
                let mut vec = vec2.clone();
                vec.retain(|i| runs1.contains(i));
                Some(Array(vec))
            }
            (Run(runs1), Bitmap(bits2)) => {
                let mut bits = bits2.clone();
                bitmap_retain_intervals(&mut bits, runs1);
                Some(Bitmap(bits))
            }
            (Run(runs1), Run(runs2)) => {
                *runs1 = runs1.intersection(runs2);
                None
            }
        };
        if let Some(new_store) = new_store {
            *self = new_store;
        }
    }
}

impl Sub<&Store> for &Store {
    type Output = Store;

    fn sub(self, rhs: &Store) -> Store {
        match (self, rhs) {
            (Array(vec1), Array(vec2)) => Array(Sub::sub(vec1, vec2)),
            _ => {
                let mut lhs = self.clone();
                SubAssign::sub_assign(&mut lhs, rhs);
                lhs
            }
        }
    }
}

impl SubAssign<&Store> for Store {
    fn sub_assign(&mut self, rhs: &Store) {
        let new_store = match (&mut *self, rhs) {
            (Array(vec1), Array(vec2)) => {
                SubAssign::sub_assign(vec1, vec2);
                None
            }
            (Array(vec1), Bitmap(bits2)) => {
                SubAssign::sub_assign(vec1, bits2);
                None
            }
            (Array(vec1), Run(runs2)) => {
                vec1.retain(|i| !runs2.contains(i));
                None
            }
            (Bitmap(bits1), Array(vec2)) => {
                SubAssign::sub_assign(bits1, vec2);
                None
            }
            (Bitmap(bits1), Bitmap(bits2)) => {
                SubAssign::sub_assign(bits1, bits2);
                None
            }
            (Bitmap(bits1), Run(runs2)) => {
                for iv in runs2.iter_intervals() {
                    bits1.remove_range(iv.start..=iv.end);
                }
                None
            }
            (Run(runs1), Array(vec2)) => {
                for &i in vec2.iter() {
                    runs1.remove(i);
                }
                None
            }
            (Run(runs1), Bitmap(bits2)) => {
                let mut bits = runs1.to_bitmap();
                SubAssign::sub_assign(&mut bits, bits2);
                Some(Bitmap(bits))
            }
            (Run(runs1), Run(runs2)) => {
                *runs1 = runs1.difference(runs2);
                None
            }
        };
        if let Some(new_store) = new_store {
            *self = new_store;
        }
    }
}

impl BitXor<&Store> for &Store {
    type Output = Store;

    fn bitxor(self, rhs: &Store) -> Store {
        match (self, rhs) {
            (Array(vec1), Array(vec2)) => Array(BitXor::bitxor(vec1, vec2)),
            (Array(..) | Run(..), Bitmap(..)) => {
                let mut lhs = rhs.clone();
                BitXorAssign::bitxor_assign(&mut lhs, self);
                lhs
            }
            _ => {
                let mut lhs = self.clone();
                BitXorAssign::bitxor_assign(&mut lhs, rhs);
                lhs
            }
        }
    }
}

impl BitXorAssign<Store> for Store {
    fn bitxor_assign(&mut self, mut rhs: Store) {
        if let (Array(..) | Run(..), Bitmap(..)) = (&*self, &rhs) {
            mem::swap(self, &mut rhs);
        }
        BitXorAssign::bitxor_assign(self, &rhs);
    }
}

impl BitXorAssign<&Store> for Store {
    fn bitxor_assign(&mut self, rhs: &Store) {
        let new_store = match (&mut *self, rhs) {
            (Array(vec1), Array(vec2)) => {
                let this = mem::take(vec1);
                *vec1 = BitXor::bitxor(&this, vec2);
                None
            }
            (Array(vec1), Bitmap(bits2)) => {
                let mut bits = bits2.clone();
                BitXorAssign::bitxor_assign(&mut bits, &*vec1);
                Some(Bitmap(bits))
            }
            (Array(vec1), Run(runs2)) => {
                let mut runs = runs2.clone();
                for &i in vec1.iter() {
                    if !runs.insert(i) {
                        runs.remove(i);
                    }
                }
                Some(Run(runs))
            }
            (Bitmap(bits1), Array(vec2)) => {
                BitXorAssign::bitxor_assign(bits1, vec2);
                None
            }
            (Bitmap(bits1), Bitmap(bits2)) => {
                BitXorAssign::bitxor_assign(bits1, bits2);
                None
            }
            (Bitmap(bits1), Run(runs2)) => {
                for iv in runs2.iter_intervals() {
                    bits1.flip_range(iv.start..=iv.end);
                }
                None
            }
            (Run(runs1), Array(vec2)) => {
                for &i in vec2.iter() {
                    if !runs1.insert(i) {
                        runs1.remove(i);
                    }
                }
                None
            }
            (Run(runs1), Bitmap(bits2)) => {
                let mut bits = bits2.clone();
                for iv in runs1.iter_intervals() {
                    bits.flip_range(iv.start..=iv.end);
                }
                Some(Bitmap(bits))
            }
            (Run(runs1), Run(runs2)) => {
                *runs1 = runs1.symmetric_difference(runs2);
                None
            }
        };
        if let Some(new_store) = new_store {
            *self = new_store;
        }
    }
}

impl<'a> IntoIterator for &'a Store {
    type Item = u16;
    type IntoIter = Iter<'a>;
    fn into_iter(self) -> Iter<'a> {
        match self {
            Array(vec) => Iter::Array(vec.iter()),
            Bitmap(bits) => Iter::BitmapBorrowed(bits.iter()),
            Run(runs) => Iter::Run(RunIter::new(runs.iter_intervals().copied().collect())),
        }
    }
}

impl IntoIterator for Store {
    type Item = u16;
    type IntoIter = Iter<'static>;
    fn into_iter(self) -> Iter<'static> {
        match self {
            Array(vec) => Iter::Vec(vec.into_iter()),
            Bitmap(bits) => Iter::BitmapOwned(bits.into_iter()),
            Run(runs) => Iter::Run(RunIter::new(runs.into_intervals())),
        }
    }
}

impl PartialEq for Store {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Array(vec1), Array(vec2)) => vec1 == vec2,
            (Bitmap(bits1), Bitmap(bits2)) => bits1 == bits2,
            (Run(runs1), Run(runs2)) => runs1 == runs2,
            // Containers are usually canonical, but optimized and plain
            // forms of the same set must still compare equal.
            _ => self.len() == other.len() && self.is_subset(other),
        }
    }
}

#[derive(Clone)]
pub struct RunIter {
    intervals: Vec<Interval>,
    front_iv: usize,
    front_val: u32,
    back_iv: usize,
    back_val: u32,
    remaining: u64,
}

impl RunIter {
    fn new(intervals: Vec<Interval>) -> RunIter {
        let remaining = intervals.iter().map(Interval::run_len).sum();
        let front_val = intervals.first().map_or(0, |iv| u32::from(iv.start));
        let back_iv = intervals.len().saturating_sub(1);
        let back_val = intervals.last().map_or(0, |iv| u32::from(iv.end));
        RunIter { intervals, front_iv: 0, front_val, back_iv, back_val, remaining }
    }

    // Values of `intervals` less than or equal to `x`.
    fn rank(&self, x: u32) -> u64 {
        let mut rank = 0;
        for iv in &self.intervals {
            if x < u32::from(iv.start) {
                break;
            }
            if x <= u32::from(iv.end) {
                rank += u64::from(x - u32::from(iv.start)) + 1;
                break;
            }
            rank += iv.run_len();
        }
        rank
    }

    fn recount(&mut self) {
        if self.front_val > self.back_val {
            self.remaining = 0;
            return;
        }
        let below_front =
            if self.front_val == 0 { 0 } else { self.rank(self.front_val - 1) };
        self.remaining = self.rank(self.back_val) - below_front;
    }

    fn advance_to(&mut self, n: u16) {
        let n = u32::from(n);
        if self.remaining == 0 || n <= self.front_val {
            return;
        }
        let loc = self.intervals.partition_point(|iv| u32::from(iv.end) < n);
        if loc == self.intervals.len() {
            self.remaining = 0;
            return;
        }
        self.front_iv = loc;
        self.front_val = n.max(u32::from(self.intervals[loc].start));
        self.recount();
    }

    fn advance_back_to(&mut self, n: u16) {
        let n = u32::from(n);
        if self.remaining == 0 || n >= self.back_val {
            return;
        }
        let loc = self.intervals.partition_point(|iv| u32::from(iv.start) <= n);
        if loc == 0 {
            self.remaining = 0;
            return;
        }
        self.back_iv = loc - 1;
        self.back_val = n.min(u32::from(self.intervals[loc - 1].end));
        self.recount();
    }
}

impl Iterator for RunIter {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        if self.remaining == 0 {
            return None;
        }
        let result = self.front_val as u16;
        self.remaining -= 1;
        if self.remaining > 0 {
            if self.front_val == u32::from(self.intervals[self.front_iv].end) {
                self.front_iv += 1;
                self.front_val = u32::from(self.intervals[self.front_iv].start);
            } else {
                self.front_val += 1;
            }
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }

    fn count(self) -> usize
    where
        Self: Sized,
    {
        self.remaining as usize
    }
}

impl DoubleEndedIterator for RunIter {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let result = self.back_val as u16;
        self.remaining -= 1;
        if self.remaining > 0 {
            if self.back_val == u32::from(self.intervals[self.back_iv].start) {
                self.back_iv -= 1;
                self.back_val = u32::from(self.intervals[self.back_iv].end);
            } else {
                self.back_val -= 1;
            }
        }
        Some(result)
    }
}

impl ExactSizeIterator for RunIter {}

impl Iter<'_> {
    /// Advance the iterator to the first value greater than or equal to `n`.
    pub(crate) fn advance_to(&mut self, n: u16) {
        match self {
            Iter::Array(inner) => {
                let skip = inner.as_slice().partition_point(|&i| i < n);
                if let Some(nth) = skip.checked_sub(1) {
                    inner.nth(nth);
                }
            }
            Iter::Vec(inner) => {
                let skip = inner.as_slice().partition_point(|&i| i < n);
                if let Some(nth) = skip.checked_sub(1) {
                    inner.nth(nth);
                }
            }
            Iter::BitmapBorrowed(inner) => inner.advance_to(n),
            Iter::BitmapOwned(inner) => inner.advance_to(n),
            Iter::Run(inner) => inner.advance_to(n),
        }
    }

    /// Advance the back of the iterator to the first value less than or
    /// equal to `n`.
    pub(crate) fn advance_back_to(&mut self, n: u16) {
        match self {
            Iter::Array(inner) => {
                let slice = inner.as_slice();
                let from_front = slice.partition_point(|&i| i <= n);
                let skip = slice.len() - from_front;
                if let Some(nth) = skip.checked_sub(1) {
                    inner.nth_back(nth);
                }
            }
            Iter::Vec(inner) => {
                let slice = inner.as_slice();
                let from_front = slice.partition_point(|&i| i <= n);
                let skip = slice.len() - from_front;
                if let Some(nth) = skip.checked_sub(1) {
                    inner.nth_back(nth);
                }
            }
            Iter::BitmapBorrowed(inner) => inner.advance_back_to(n),
            Iter::BitmapOwned(inner) => inner.advance_back_to(n),
            Iter::Run(inner) => inner.advance_back_to(n),
        }
    }
}

impl Iterator for Iter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        match self {
            Iter::Array(inner) => inner.next().cloned(),
            Iter::Vec(inner) => inner.next(),
            Iter::BitmapBorrowed(inner) => inner.next(),
            Iter::BitmapOwned(inner) => inner.next(),
            Iter::Run(inner) => inner.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Iter::Array(inner) => inner.size_hint(),
            Iter::Vec(inner) => inner.size_hint(),
            Iter::BitmapBorrowed(inner) => inner.size_hint(),
            Iter::BitmapOwned(inner) => inner.size_hint(),
            Iter::Run(inner) => inner.size_hint(),
        }
    }

    fn count(self) -> usize
    where
        Self: Sized,
    {
        match self {
            Iter::Array(inner) => inner.count(),
            Iter::Vec(inner) => inner.count(),
            Iter::BitmapBorrowed(inner) => inner.count(),
            Iter::BitmapOwned(inner) => inner.count(),
            Iter::Run(inner) => inner.count(),
        }
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        match self {
            Iter::Array(inner) => inner.nth(n).copied(),
            Iter::Vec(inner) => inner.nth(n),
            Iter::BitmapBorrowed(inner) => inner.nth(n),
            Iter::BitmapOwned(inner) => inner.nth(n),
            Iter::Run(inner) => inner.nth(n),
        }
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        match self {
            Iter::Array(inner) => inner.next_back().cloned(),
            Iter::Vec(inner) => inner.next_back(),
            Iter::BitmapBorrowed(inner) => inner.next_back(),
            Iter::BitmapOwned(inner) => inner.next_back(),
            Iter::Run(inner) => inner.next_back(),
        }
    }

    fn nth_back(&mut self, n: usize) -> Option<Self::Item> {
        match self {
            Iter::Array(inner) => inner.nth_back(n).copied(),
            Iter::Vec(inner) => inner.nth_back(n),
            Iter::BitmapBorrowed(inner) => {
                for _ in 0..n {
                    inner.next_back()?;
                }
                inner.next_back()
            }
            Iter::BitmapOwned(inner) => {
                for _ in 0..n {
                    inner.next_back()?;
                }
                inner.next_back()
            }
            Iter::Run(inner) => {
                for _ in 0..n {
                    inner.next_back()?;
                }
                inner.next_back()
            }
        }
    }
}

impl ExactSizeIterator for Iter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn array(values: &[u16]) -> Store {
        Array(ArrayStore::from_vec_unchecked(values.to_vec()))
    }

    fn bitmap(values: &[u16]) -> Store {
        let mut bits = BitmapStore::new();
        for &v in values {
            bits.insert(v);
        }
        Bitmap(bits)
    }

    fn run(intervals: &[(u16, u16)]) -> Store {
        let mut runs = IntervalStore::new();
        for &(s, e) in intervals {
            assert!(runs.try_push_interval(s, e));
        }
        Run(runs)
    }

    fn to_vec(store: &Store) -> Vec<u16> {
        store.into_iter().collect()
    }

    fn variants(values: &[u16]) -> [Store; 3] {
        let arr = ArrayStore::from_vec_unchecked(values.to_vec());
        [Array(arr.clone()), Bitmap(arr.to_bitmap_store()), Run(arr.to_interval_store())]
    }

    // Reference implementations over plain sorted vecs.
    fn merge(lhs: &[u16], rhs: &[u16], keep: impl Fn(bool, bool) -> bool) -> Vec<u16> {
        let mut out = Vec::new();
        for v in 0..=u16::MAX {
            if keep(lhs.contains(&v), rhs.contains(&v)) {
                out.push(v);
            }
        }
        out
    }

    #[test]
    fn all_type_pairs_agree_on_ops() {
        let lhs_values = [0, 1, 2, 3, 90, 91, 92, 93, 94, 95, 300, 65535];
        let rhs_values = [2, 3, 4, 92, 93, 200, 201, 202, 203, 65535];

        let or = merge(&lhs_values, &rhs_values, |a, b| a | b);
        let and = merge(&lhs_values, &rhs_values, |a, b| a & b);
        let xor = merge(&lhs_values, &rhs_values, |a, b| a ^ b);
        let sub = merge(&lhs_values, &rhs_values, |a, b| a & !b);

        for lhs in variants(&lhs_values) {
            for rhs in variants(&rhs_values) {
                assert_eq!(to_vec(&BitOr::bitor(&lhs, &rhs)), or, "or");
                assert_eq!(to_vec(&BitAnd::bitand(&lhs, &rhs)), and, "and");
                assert_eq!(to_vec(&BitXor::bitxor(&lhs, &rhs)), xor, "xor");
                assert_eq!(to_vec(&Sub::sub(&lhs, &rhs)), sub, "sub");

                let mut inplace = lhs.clone();
                BitOrAssign::bitor_assign(&mut inplace, &rhs);
                assert_eq!(to_vec(&inplace), or, "or_assign");

                let mut inplace = lhs.clone();
                BitAndAssign::bitand_assign(&mut inplace, &rhs);
                assert_eq!(to_vec(&inplace), and, "and_assign");

                let mut inplace = lhs.clone();
                BitXorAssign::bitxor_assign(&mut inplace, &rhs);
                assert_eq!(to_vec(&inplace), xor, "xor_assign");

                let mut inplace = lhs.clone();
                SubAssign::sub_assign(&mut inplace, &rhs);
                assert_eq!(to_vec(&inplace), sub, "sub_assign");

                assert_eq!(lhs.intersection_len(&rhs), and.len() as u64);
                assert!(!lhs.is_disjoint(&rhs));
            }
        }
    }

    #[test]
    fn cross_type_equality_is_structural() {
        let values = [1, 2, 3, 4, 5, 100];
        let [a, b, r] = variants(&values);
        assert_eq!(a, b);
        assert_eq!(b, r);
        assert_eq!(a, r);

        let different = array(&[1, 2, 3, 4, 5, 101]);
        assert_ne!(a, different);
        assert_ne!(b, different);
        assert_ne!(r, different);
    }

    #[test]
    fn subset_across_types() {
        let small = variants(&[2, 3, 90, 91]);
        let big = variants(&[0, 1, 2, 3, 90, 91, 92, 300]);
        for s in &small {
            for b in &big {
                assert!(s.is_subset(b));
                assert!(!b.is_subset(s));
            }
        }
    }

    #[test]
    fn disjoint_across_types() {
        let evens = variants(&[0, 2, 4, 6, 8, 10]);
        let odds = variants(&[1, 3, 5, 7, 9, 11]);
        for a in &evens {
            for b in &odds {
                assert!(a.is_disjoint(b));
                assert_eq!(a.intersection_len(b), 0);
            }
        }
    }

    #[test]
    fn flip_range_toggles() {
        for mut store in variants(&[0, 1, 5]) {
            store.flip_range(1..=4);
            assert_eq!(to_vec(&store), vec![0, 2, 3, 4, 5]);
        }
    }

    #[test]
    fn run_iter_is_double_ended() {
        let store = run(&[(1, 3), (10, 12)]);
        let mut iter = store.into_iter();
        assert_eq!(iter.next(), Some(1));
        assert_eq!(iter.next_back(), Some(12));
        assert_eq!(iter.next(), Some(2));
        assert_eq!(iter.next_back(), Some(11));
        assert_eq!(iter.next(), Some(3));
        assert_eq!(iter.next_back(), Some(10));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
    }

    #[test]
    fn run_iter_advance_to() {
        let store = run(&[(1, 3), (10, 12), (100, 100)]);
        let mut iter = store.into_iter();
        iter.advance_to(4);
        assert_eq!(iter.size_hint(), (4, Some(4)));
        assert_eq!(iter.next(), Some(10));

        let store = run(&[(1, 3), (10, 12), (100, 100)]);
        let mut iter = store.into_iter();
        iter.advance_back_to(11);
        assert_eq!(iter.next_back(), Some(11));
        assert_eq!(iter.next_back(), Some(10));
        assert_eq!(iter.next_back(), Some(3));

        let store = run(&[(1, 3)]);
        let mut iter = store.into_iter();
        iter.advance_to(4);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn lazy_or_then_exact_matches() {
        let lhs_values: Vec<u16> = (0..5000).map(|i| i * 13 % 60000).collect();
        let mut lhs_values: Vec<u16> = lhs_values;
        lhs_values.sort_unstable();
        lhs_values.dedup();
        let rhs_values: Vec<u16> = {
            let mut v: Vec<u16> = (0..5000).map(|i| (i * 7 + 3) % 60000).collect();
            v.sort_unstable();
            v.dedup();
            v
        };

        let lhs = Array(ArrayStore::from_vec_unchecked(lhs_values.clone()));
        let rhs = Array(ArrayStore::from_vec_unchecked(rhs_values.clone()));

        let mut lazy = lhs.clone();
        lazy.lazy_bitor_assign(&rhs);
        assert!(matches!(lazy, Bitmap(_)));
        assert!(lazy.needs_repair());
        lazy.repair_len();

        let exact = BitOr::bitor(&lhs, &rhs);
        assert_eq!(lazy.len(), exact.len());
        assert_eq!(to_vec(&lazy), to_vec(&exact));
    }

    #[test]
    fn lazy_xor_then_exact_matches() {
        let lhs = bitmap(&[1, 2, 3, 1000, 2000]);
        let rhs = bitmap(&[2, 3, 4, 2000, 3000]);

        let mut lazy = lhs.clone();
        lazy.lazy_bitxor_assign(&rhs);
        assert!(lazy.needs_repair());
        lazy.repair_len();

        assert_eq!(to_vec(&lazy), vec![1, 4, 1000, 3000]);
    }
}
