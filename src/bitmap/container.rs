use core::fmt;
use core::ops::{
    BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, RangeInclusive, Sub, SubAssign,
};
use std::sync::Arc;

use super::store::{self, ArrayStore, Interval, IntervalStore, Store, BITMAP_BYTES};
use super::util;

pub const ARRAY_LIMIT: u64 = 4096;

/// The copy-on-write handle around a store.
///
/// A shared handle never wraps another shared handle, and no kernel ever
/// observes one: reads unwrap it, writes take sole ownership first, cloning
/// the payload only when another container still holds it.
///
/// The count is atomic so bitmaps stay `Send`; sharing itself still
/// requires exclusive access to every bitmap involved.
pub(crate) enum CowStore {
    Owned(Store),
    Shared(Arc<Store>),
}

impl CowStore {
    #[inline]
    fn get(&self) -> &Store {
        match self {
            CowStore::Owned(store) => store,
            CowStore::Shared(store) => store,
        }
    }

    fn make_mut(&mut self) -> &mut Store {
        if let CowStore::Shared(_) = self {
            let arc = match std::mem::replace(self, CowStore::Owned(Store::new())) {
                CowStore::Shared(arc) => arc,
                CowStore::Owned(_) => unreachable!(),
            };
            let store = Arc::try_unwrap(arc).unwrap_or_else(|arc| (*arc).clone());
            *self = CowStore::Owned(store);
        }
        match self {
            CowStore::Owned(store) => store,
            CowStore::Shared(_) => unreachable!(),
        }
    }

    fn into_store(self) -> Store {
        match self {
            CowStore::Owned(store) => store,
            CowStore::Shared(arc) => Arc::try_unwrap(arc).unwrap_or_else(|arc| (*arc).clone()),
        }
    }

    // Hands out a second handle to the same payload, wrapping it first if
    // this one still owns it.
    fn share(&mut self) -> CowStore {
        if let CowStore::Owned(_) = self {
            let store = match std::mem::replace(self, CowStore::Owned(Store::new())) {
                CowStore::Owned(store) => store,
                CowStore::Shared(_) => unreachable!(),
            };
            *self = CowStore::Shared(Arc::new(store));
        }
        match self {
            CowStore::Shared(arc) => CowStore::Shared(Arc::clone(arc)),
            CowStore::Owned(_) => unreachable!(),
        }
    }
}

impl Clone for CowStore {
    fn clone(&self) -> Self {
        CowStore::Owned(self.get().clone())
    }
}

#[derive(Clone)]
pub(crate) struct Container {
    pub key: u16,
    store: CowStore,
}

#[derive(Clone)]
pub(crate) struct Iter<'a> {
    pub key: u16,
    inner: store::Iter<'a>,
}

impl Container {
    pub fn new(key: u16) -> Container {
        Container { key, store: CowStore::Owned(Store::new()) }
    }

    pub fn from_store(key: u16, store: Store) -> Container {
        Container { key, store: CowStore::Owned(store) }
    }

    pub fn new_with_range(key: u16, range: RangeInclusive<u16>) -> Container {
        if range.len() <= 2 {
            let mut array = ArrayStore::new();
            array.insert_range(range);
            Container::from_store(key, Store::Array(array))
        } else {
            Container::from_store(key, Store::Run(IntervalStore::new_with_range(range)))
        }
    }

    pub fn full(key: u16) -> Container {
        Container::from_store(key, Store::full())
    }

    #[inline]
    pub fn store(&self) -> &Store {
        self.store.get()
    }

    #[inline]
    pub fn store_mut(&mut self) -> &mut Store {
        self.store.make_mut()
    }

    pub fn into_store(self) -> Store {
        self.store.into_store()
    }

    fn set_store(&mut self, store: Store) {
        self.store = CowStore::Owned(store);
    }

    /// A second container referring to the same payload, for copy-on-write
    /// bitmap copies.
    pub(crate) fn shared_clone(&mut self) -> Container {
        Container { key: self.key, store: self.store.share() }
    }

    #[cfg(test)]
    pub(crate) fn share_count(&self) -> usize {
        match &self.store {
            CowStore::Owned(_) => 1,
            CowStore::Shared(arc) => Arc::strong_count(arc),
        }
    }
}

impl Container {
    pub fn len(&self) -> u64 {
        self.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    #[inline]
    pub fn insert(&mut self, index: u16) -> bool {
        if self.store_mut().insert(index) {
            self.ensure_correct_store();
            true
        } else {
            false
        }
    }

    pub fn insert_range(&mut self, range: RangeInclusive<u16>) -> u64 {
        if range.is_empty() {
            return 0;
        }
        let interval = Interval::new(*range.start(), *range.end());
        match self.store() {
            Store::Bitmap(bits) => {
                let added_amount = interval.run_len() - bits.intersection_len_interval(&interval);
                let union_cardinality = bits.len() + added_amount;
                if union_cardinality == 1 << 16 {
                    self.set_store(Store::full());
                    added_amount
                } else {
                    self.store_mut().insert_range(range)
                }
            }
            Store::Array(vec) => {
                let added_amount = interval.run_len() - vec.intersection_len_interval(&interval);
                let union_cardinality = vec.len() + added_amount;
                if union_cardinality == 1 << 16 {
                    self.set_store(Store::full());
                    added_amount
                } else if union_cardinality <= ARRAY_LIMIT {
                    self.store_mut().insert_range(range)
                } else {
                    let mut bits = self.store().to_bitmap();
                    let added = bits.insert_range(range);
                    self.set_store(bits);
                    added
                }
            }
            Store::Run(_) => self.store_mut().insert_range(range),
        }
    }

    /// Pushes `index` at the end of the container only if `index` is the new max.
    ///
    /// Returns whether the `index` was effectively pushed.
    pub fn push(&mut self, index: u16) -> bool {
        if self.store_mut().push(index) {
            self.ensure_correct_store();
            true
        } else {
            false
        }
    }

    ///
    /// Pushes `index` at the end of the container.
    /// It is up to the caller to have validated index > self.max()
    ///
    /// # Panics
    ///
    /// If debug_assertions enabled and index is > self.max()
    pub(crate) fn push_unchecked(&mut self, index: u16) {
        self.store_mut().push_unchecked(index);
        self.ensure_correct_store();
    }

    pub fn remove(&mut self, index: u16) -> bool {
        if self.store().contains(index) {
            self.store_mut().remove(index);
            self.ensure_correct_store();
            true
        } else {
            false
        }
    }

    pub fn remove_range(&mut self, range: RangeInclusive<u16>) -> u64 {
        if range.is_empty() || !self.store().intersects_range(range.clone()) {
            return 0;
        }
        let result = self.store_mut().remove_range(range);
        self.ensure_correct_store();
        result
    }

    pub fn remove_smallest(&mut self, n: u64) {
        if n == 0 {
            return;
        }
        match self.store() {
            Store::Bitmap(bits) if bits.len() - n <= ARRAY_LIMIT => {
                let mut replace_array = Vec::with_capacity((bits.len() - n) as usize);
                replace_array.extend(bits.iter().skip(n as usize));
                self.set_store(Store::Array(ArrayStore::from_vec_unchecked(replace_array)));
            }
            _ => self.store_mut().remove_smallest(n),
        }
    }

    pub fn remove_biggest(&mut self, n: u64) {
        if n == 0 {
            return;
        }
        match self.store() {
            Store::Bitmap(bits) if bits.len() - n <= ARRAY_LIMIT => {
                let mut replace_array = Vec::with_capacity((bits.len() - n) as usize);
                replace_array.extend(bits.iter().take((bits.len() - n) as usize));
                self.set_store(Store::Array(ArrayStore::from_vec_unchecked(replace_array)));
            }
            _ => self.store_mut().remove_biggest(n),
        }
    }

    pub fn flip_range(&mut self, range: RangeInclusive<u16>) {
        if range.is_empty() {
            return;
        }
        self.store_mut().flip_range(range);
        self.repack();
    }

    pub fn contains(&self, index: u16) -> bool {
        self.store().contains(index)
    }

    pub fn contains_range(&self, range: RangeInclusive<u16>) -> bool {
        self.store().contains_range(range)
    }

    pub fn intersects_range(&self, range: RangeInclusive<u16>) -> bool {
        self.store().intersects_range(range)
    }

    pub fn is_full(&self) -> bool {
        self.store().is_full()
    }

    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.store().is_disjoint(other.store())
    }

    pub fn is_subset(&self, other: &Self) -> bool {
        self.len() <= other.len() && self.store().is_subset(other.store())
    }

    pub fn intersection_len(&self, other: &Self) -> u64 {
        self.store().intersection_len(other.store())
    }

    pub fn min(&self) -> Option<u16> {
        self.store().min()
    }

    #[inline]
    pub fn max(&self) -> Option<u16> {
        self.store().max()
    }

    pub fn rank(&self, index: u16) -> u64 {
        self.store().rank(index)
    }

    pub fn select(&self, n: u16) -> Option<u16> {
        self.store().select(n)
    }

    pub fn shrink_to_fit(&mut self) -> u64 {
        // Shrinking a shared payload would deep-clone it for no gain.
        match &mut self.store {
            CowStore::Owned(store) => store.shrink_to_fit(),
            CowStore::Shared(_) => 0,
        }
    }

    /// Moves between array and bitmap layouts when the element-op
    /// thresholds say so. Run layouts are only revisited by `repack`,
    /// `optimize` and `repair`.
    pub(crate) fn ensure_correct_store(&mut self) {
        let new_store = match self.store() {
            Store::Bitmap(bits) if bits.len() <= ARRAY_LIMIT => {
                Some(Store::Array(bits.to_array_store()))
            }
            Store::Array(vec) if vec.len() > ARRAY_LIMIT => {
                Some(Store::Bitmap(vec.to_bitmap_store()))
            }
            _ => None,
        };
        if let Some(new_store) = new_store {
            self.set_store(new_store);
        }
    }

    /// Installs the smallest layout for the current contents, including
    /// dropping an uncompetitive run layout. Binary operation results and
    /// `repair` go through here.
    pub(crate) fn repack(&mut self) {
        let new_store = match self.store() {
            Store::Bitmap(bits) if bits.len() <= ARRAY_LIMIT => {
                Some(Store::Array(bits.to_array_store()))
            }
            Store::Array(vec) if vec.len() > ARRAY_LIMIT => {
                Some(Store::Bitmap(vec.to_bitmap_store()))
            }
            Store::Run(runs) => {
                let card = runs.len();
                let size_as_array = ArrayStore::serialized_byte_size(card);
                let min_size_non_run = size_as_array.min(BITMAP_BYTES);
                if runs.byte_size() < min_size_non_run {
                    None
                } else if card <= ARRAY_LIMIT {
                    Some(Store::Array(runs.to_array()))
                } else {
                    Some(Store::Bitmap(runs.to_bitmap()))
                }
            }
            _ => None,
        };
        if let Some(new_store) = new_store {
            self.set_store(new_store);
        }
    }

    /// Recomputes a lazily-maintained cardinality and restores the
    /// minimal layout.
    pub(crate) fn repair(&mut self) {
        if self.store().needs_repair() {
            self.store_mut().repair_len();
        }
        self.repack();
    }

    pub fn optimize(&mut self) -> bool {
        let new_store = match self.store() {
            Store::Bitmap(bits) => {
                let num_runs = bits.count_runs();
                let size_as_run = IntervalStore::serialized_byte_size(num_runs);
                if BITMAP_BYTES <= size_as_run {
                    return false;
                }
                Store::Run(bits.to_interval_store())
            }
            Store::Array(vec) => {
                let size_as_array = vec.byte_size();
                let num_runs = vec.count_runs();
                let size_as_run = IntervalStore::serialized_byte_size(num_runs);
                if size_as_array <= size_as_run {
                    return false;
                }
                Store::Run(vec.to_interval_store())
            }
            Store::Run(runs) => {
                let size_as_run = runs.byte_size();
                let card = runs.len();
                let size_as_array = ArrayStore::serialized_byte_size(card);
                let min_size_non_run = size_as_array.min(BITMAP_BYTES);
                if size_as_run <= min_size_non_run {
                    return false;
                }
                if card <= ARRAY_LIMIT {
                    Store::Array(runs.to_array())
                } else {
                    Store::Bitmap(runs.to_bitmap())
                }
            }
        };
        self.set_store(new_store);
        true
    }

    pub fn remove_run_compression(&mut self) -> bool {
        let new_store = match self.store() {
            Store::Bitmap(_) | Store::Array(_) => return false,
            Store::Run(runs) => {
                if runs.len() <= ARRAY_LIMIT {
                    Store::Array(runs.to_array())
                } else {
                    Store::Bitmap(runs.to_bitmap())
                }
            }
        };
        self.set_store(new_store);
        true
    }

    pub(crate) fn lazy_bitor_assign(&mut self, other: &Container) {
        self.store_mut().lazy_bitor_assign(other.store());
    }

    pub(crate) fn lazy_bitxor_assign(&mut self, other: &Container) {
        self.store_mut().lazy_bitxor_assign(other.store());
    }

    pub(crate) fn internal_validate(&self) -> Result<(), &'static str> {
        self.store().internal_validate()
    }
}

impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.store() == other.store()
    }
}

impl BitOr<&Container> for &Container {
    type Output = Container;

    fn bitor(self, rhs: &Container) -> Container {
        let store = BitOr::bitor(self.store(), rhs.store());
        let mut container = Container::from_store(self.key, store);
        container.repack();
        container
    }
}

impl BitOrAssign<Container> for Container {
    fn bitor_assign(&mut self, rhs: Container) {
        BitOrAssign::bitor_assign(self.store_mut(), rhs.into_store());
        self.repack();
    }
}

impl BitOrAssign<&Container> for Container {
    fn bitor_assign(&mut self, rhs: &Container) {
        BitOrAssign::bitor_assign(self.store_mut(), rhs.store());
        self.repack();
    }
}

impl BitAnd<&Container> for &Container {
    type Output = Container;

    fn bitand(self, rhs: &Container) -> Container {
        let store = BitAnd::bitand(self.store(), rhs.store());
        let mut container = Container::from_store(self.key, store);
        container.repack();
        container
    }
}

impl BitAndAssign<Container> for Container {
    fn bitand_assign(&mut self, rhs: Container) {
        BitAndAssign::bitand_assign(self.store_mut(), rhs.into_store());
        self.repack();
    }
}

impl BitAndAssign<&Container> for Container {
    fn bitand_assign(&mut self, rhs: &Container) {
        BitAndAssign::bitand_assign(self.store_mut(), rhs.store());
        self.repack();
    }
}

impl Sub<&Container> for &Container {
    type Output = Container;

    fn sub(self, rhs: &Container) -> Container {
        let store = Sub::sub(self.store(), rhs.store());
        let mut container = Container::from_store(self.key, store);
        container.repack();
        container
    }
}

impl SubAssign<&Container> for Container {
    fn sub_assign(&mut self, rhs: &Container) {
        SubAssign::sub_assign(self.store_mut(), rhs.store());
        self.repack();
    }
}

impl BitXor<&Container> for &Container {
    type Output = Container;

    fn bitxor(self, rhs: &Container) -> Container {
        let store = BitXor::bitxor(self.store(), rhs.store());
        let mut container = Container::from_store(self.key, store);
        container.repack();
        container
    }
}

impl BitXorAssign<Container> for Container {
    fn bitxor_assign(&mut self, rhs: Container) {
        BitXorAssign::bitxor_assign(self.store_mut(), rhs.into_store());
        self.repack();
    }
}

impl BitXorAssign<&Container> for Container {
    fn bitxor_assign(&mut self, rhs: &Container) {
        BitXorAssign::bitxor_assign(self.store_mut(), rhs.store());
        self.repack();
    }
}

impl<'a> IntoIterator for &'a Container {
    type Item = u32;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        Iter { key: self.key, inner: self.store().into_iter() }
    }
}

impl IntoIterator for Container {
    type Item = u32;
    type IntoIter = Iter<'static>;

    fn into_iter(self) -> Iter<'static> {
        Iter { key: self.key, inner: self.into_store().into_iter() }
    }
}

impl Iterator for Iter<'_> {
    type Item = u32;
    fn next(&mut self) -> Option<u32> {
        self.inner.next().map(|i| util::join(self.key, i))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }

    fn count(self) -> usize
    where
        Self: Sized,
    {
        self.inner.count()
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        self.inner.nth(n).map(|i| util::join(self.key, i))
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|i| util::join(self.key, i))
    }

    fn nth_back(&mut self, n: usize) -> Option<Self::Item> {
        self.inner.nth_back(n).map(|i| util::join(self.key, i))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl Iter<'_> {
    pub(crate) fn advance_to(&mut self, index: u16) {
        self.inner.advance_to(index);
    }

    pub(crate) fn advance_back_to(&mut self, index: u16) {
        self.inner.advance_back_to(index);
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        format!("Container<{:?} @ {:?}>", self.len(), self.key).fmt(formatter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(key: u16, values: impl IntoIterator<Item = u16>) -> Container {
        let mut container = Container::new(key);
        for value in values {
            container.insert(value);
        }
        container
    }

    #[test]
    fn converts_array_to_bitmap_past_limit() {
        let mut container = Container::new(0);
        for i in 0..=ARRAY_LIMIT as u16 {
            container.insert(i);
        }
        assert!(matches!(container.store(), Store::Bitmap(_)));
        assert_eq!(container.len(), ARRAY_LIMIT + 1);

        container.remove(0);
        assert!(matches!(container.store(), Store::Array(_)));
    }

    #[test]
    fn insert_range_fills_to_run() {
        let mut container = Container::new(0);
        assert_eq!(container.insert_range(0..=u16::MAX), 1 << 16);
        assert!(container.is_full());
        assert!(matches!(container.store(), Store::Run(_)));
    }

    #[test]
    fn optimize_round_trip_preserves_contents() {
        let mut container = filled(0, (0..2000).map(|i| i * 2));
        let before = container.clone();

        // Alternating values compress terribly as runs.
        assert!(!container.optimize());

        let mut container = filled(0, 100..4000);
        assert!(container.optimize());
        assert!(matches!(container.store(), Store::Run(_)));
        assert_eq!(container.len(), 3900);
        assert!(container.remove_run_compression());
        assert_eq!(container, filled(0, 100..4000));

        assert_eq!(before, filled(0, (0..2000).map(|i| i * 2)));
    }

    #[test]
    fn shared_clone_counts_and_unshares() {
        let mut container = filled(0, [1, 2, 3]);
        let mut copy = container.shared_clone();
        assert_eq!(container.share_count(), 2);
        assert_eq!(copy.share_count(), 2);
        assert_eq!(container, copy);

        // First mutation takes a private copy.
        copy.insert(4);
        assert_eq!(copy.share_count(), 1);
        assert_eq!(container.share_count(), 1);
        assert!(!container.contains(4));
        assert!(copy.contains(4));
    }

    #[test]
    fn repack_shrinks_sparse_run() {
        // A fragmented run layout is worse than a plain array.
        let mut container = Container::new(0);
        assert_eq!(container.insert_range(0..=u16::MAX), 1 << 16);
        container.remove_range(0..=60000);
        assert_eq!(container.len(), 65536 - 60001);
        let mut removed = 0;
        for i in (60002..=u16::MAX).step_by(2) {
            removed += u64::from(container.remove(i));
        }
        assert_eq!(container.len(), 65536 - 60001 - removed);
        container.repack();
        assert!(matches!(container.store(), Store::Array(_)));
    }
}
