use core::ops::RangeBounds;
use core::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::bitmap::Container;
use crate::bitmap64::art::{Art, Leaf, MAX_KEY};
use crate::bitmap64::util;
use crate::{Bitmap64, NonSortedIntegers};

// Bitmap identities are process unique and never reused, so a context
// carrying a matching id is known to have been filled by this bitmap.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A cursor that makes runs of operations on nearby values cheap.
///
/// Consecutive values sharing their high 48 bits hit the chunk cached in
/// the context and skip the trie walk entirely. A context starts empty,
/// may only be used with the bitmap that filled it, and falls back to a
/// fresh lookup whenever the bitmap was restructured since; misuse costs
/// performance, never correctness.
///
/// # Examples
///
/// ```rust
/// use riptide::{Bitmap64, BulkContext};
///
/// let mut rb = Bitmap64::new();
/// let mut context = BulkContext::new();
/// for value in 0..1000u64 {
///     rb.insert_bulk(&mut context, value * 3);
/// }
/// assert_eq!(rb.len(), 1000);
/// ```
#[derive(Default)]
pub struct BulkContext {
    bitmap_id: u64,
    version: u64,
    high: u64,
    // Only dereferenced after id and version match, which proves the leaf
    // is still alive in the owning trie.
    leaf: Option<NonNull<Leaf<Container>>>,
    // Whether `leaf` was derived from a mutable walk and may be written
    // through.
    mutable: bool,
}

impl BulkContext {
    /// An empty context, not yet bound to any bitmap.
    pub fn new() -> BulkContext {
        BulkContext::default()
    }
}

impl Bitmap64 {
    /// Creates an empty `Bitmap64`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap64;
    /// let rb = Bitmap64::new();
    /// ```
    pub fn new() -> Bitmap64 {
        Bitmap64 { art: Art::new(), id: NEXT_ID.fetch_add(1, Ordering::Relaxed), version: 0 }
    }

    pub(crate) fn container(&self, high: u64) -> Option<&Container> {
        self.art.get(high)
    }

    pub(crate) fn container_mut(&mut self, high: u64) -> Option<&mut Container> {
        self.art.get_mut(high)
    }

    pub(crate) fn insert_container(&mut self, high: u64, container: Container) {
        debug_assert_eq!(container.key, high as u16);
        self.version += 1;
        self.art.insert(high, container);
    }

    pub(crate) fn remove_container(&mut self, high: u64) {
        self.version += 1;
        self.art.remove(high);
    }

    pub(crate) fn art(&self) -> &Art<Container> {
        &self.art
    }

    pub(crate) fn take_art(self) -> Art<Container> {
        self.art
    }

    fn container_or_new(&mut self, high: u64) -> &mut Container {
        if self.art.get(high).is_none() {
            self.insert_container(high, Container::new(high as u16));
        }
        self.art.get_mut(high).unwrap()
    }

    /// Adds a value to the set.
    ///
    /// Returns whether the value was absent from the set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap64;
    ///
    /// let mut rb = Bitmap64::new();
    /// assert_eq!(rb.insert(3), true);
    /// assert_eq!(rb.insert(3), false);
    /// assert_eq!(rb.contains(3), true);
    /// ```
    #[inline]
    pub fn insert(&mut self, value: u64) -> bool {
        let (high, low) = util::split(value);
        self.container_or_new(high).insert(low)
    }

    /// Adds a value to the set, caching the chunk lookup in `context`.
    ///
    /// Returns whether the value was absent from the set.
    pub fn insert_bulk(&mut self, context: &mut BulkContext, value: u64) -> bool {
        let (high, low) = util::split(value);
        if let Some(leaf) = self.cached_leaf_mut(context, high) {
            return leaf.value.insert(low);
        }
        if self.art.get(high).is_none() {
            self.insert_container(high, Container::new(high as u16));
        }
        let id = self.id;
        let version = self.version;
        let leaf = self.art.find_leaf_mut(high).unwrap();
        *context = BulkContext {
            bitmap_id: id,
            version,
            high,
            leaf: Some(NonNull::from(&mut *leaf)),
            mutable: true,
        };
        leaf.value.insert(low)
    }

    /// The chunk cached by `context`, if it is still valid for this bitmap
    /// and covers `high`.
    fn cached_leaf_mut(&mut self, context: &BulkContext, high: u64) -> Option<&mut Leaf<Container>> {
        if context.bitmap_id != self.id
            || context.version != self.version
            || context.high != high
            || !context.mutable
        {
            return None;
        }
        let mut leaf = context.leaf?;
        // The id proves the context was filled by this bitmap and the
        // version that no chunk was added or removed since, so the boxed
        // leaf is still owned by `self.art` and `&mut self` grants
        // exclusive access to it.
        Some(unsafe { leaf.as_mut() })
    }

    fn cached_leaf(&self, context: &BulkContext, high: u64) -> Option<&Leaf<Container>> {
        if context.bitmap_id != self.id || context.version != self.version || context.high != high
        {
            return None;
        }
        let leaf = context.leaf?;
        // Same liveness argument as `cached_leaf_mut`; `&self` makes the
        // access read-only.
        Some(unsafe { leaf.as_ref() })
    }

    /// Inserts a range of values.
    /// Returns the number of inserted values.
    ///
    /// Chunks are materialized for every 2^16 span the range touches, so
    /// the cost is proportional to the width of the range.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap64;
    ///
    /// let mut rb = Bitmap64::new();
    /// rb.insert_range(2..4);
    /// assert!(rb.contains(2));
    /// assert!(rb.contains(3));
    /// assert!(!rb.contains(4));
    /// ```
    pub fn insert_range<R>(&mut self, range: R) -> u64
    where
        R: RangeBounds<u64>,
    {
        let Some(range) = util::convert_range_to_inclusive(range) else {
            return 0;
        };
        let (start_high, start_low) = util::split(*range.start());
        let (end_high, end_low) = util::split(*range.end());

        let mut inserted = 0;
        let mut high = start_high;
        loop {
            let low_start = if high == start_high { start_low } else { 0 };
            let low_end = if high == end_high { end_low } else { u16::MAX };
            inserted += self.container_or_new(high).insert_range(low_start..=low_end);
            if high == end_high {
                break;
            }
            high += 1;
        }
        inserted
    }

    /// Pushes `value` in the bitmap only if it is greater than the current maximum value.
    ///
    /// Returns whether the value was inserted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap64;
    ///
    /// let mut rb = Bitmap64::new();
    /// assert!(rb.push(1));
    /// assert!(rb.push(1 << 40));
    /// assert_eq!(rb.push(3), false);
    /// ```
    pub fn push(&mut self, value: u64) -> bool {
        let (high, low) = util::split(value);
        match self.art.last().map(|leaf| leaf.key) {
            Some(last) if last == high => self.art.get_mut(high).unwrap().push(low),
            Some(last) if last > high => false,
            _otherwise => {
                let mut container = Container::new(high as u16);
                container.push(low);
                self.insert_container(high, container);
                true
            }
        }
    }

    pub(crate) fn push_unchecked(&mut self, value: u64) {
        let pushed = self.push(value);
        debug_assert!(pushed, "value <= max");
    }

    /// Removes a value from the set. Returns `true` if the value was present in the set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap64;
    ///
    /// let mut rb = Bitmap64::new();
    /// rb.insert(3);
    /// assert_eq!(rb.remove(3), true);
    /// assert_eq!(rb.remove(3), false);
    /// assert_eq!(rb.contains(3), false);
    /// ```
    pub fn remove(&mut self, value: u64) -> bool {
        let (high, low) = util::split(value);
        match self.art.get_mut(high) {
            Some(container) => {
                if container.remove(low) {
                    if container.is_empty() {
                        self.remove_container(high);
                    }
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }

    /// Removes a value from the set, caching the chunk lookup in `context`.
    ///
    /// Returns whether the value was present in the set.
    pub fn remove_bulk(&mut self, context: &mut BulkContext, value: u64) -> bool {
        let (high, low) = util::split(value);
        if let Some(leaf) = self.cached_leaf_mut(context, high) {
            let removed = leaf.value.remove(low);
            if removed && leaf.value.is_empty() {
                self.remove_container(high);
                *context = BulkContext::new();
            }
            return removed;
        }
        match self.art.find_leaf_mut(high) {
            Some(leaf) => {
                let removed = leaf.value.remove(low);
                if removed && leaf.value.is_empty() {
                    self.remove_container(high);
                    *context = BulkContext::new();
                } else {
                    let id = self.id;
                    let version = self.version;
                    let leaf = self.art.find_leaf_mut(high).unwrap();
                    *context = BulkContext {
                        bitmap_id: id,
                        version,
                        high,
                        leaf: Some(NonNull::from(&mut *leaf)),
                        mutable: true,
                    };
                }
                removed
            }
            None => false,
        }
    }

    /// Removes a range of values.
    /// Returns the number of removed values.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap64;
    ///
    /// let mut rb = Bitmap64::new();
    /// rb.insert(2);
    /// rb.insert(3);
    /// assert_eq!(rb.remove_range(2..4), 2);
    /// ```
    pub fn remove_range<R>(&mut self, range: R) -> u64
    where
        R: RangeBounds<u64>,
    {
        let Some(range) = util::convert_range_to_inclusive(range) else {
            return 0;
        };
        let (start_high, start_low) = util::split(*range.start());
        let (end_high, end_low) = util::split(*range.end());

        // The affected chunks are a contiguous key range of the trie.
        let keys: Vec<u64> = {
            let mut iter = self.art.iter();
            iter.advance_to(start_high);
            iter.map(|leaf| leaf.key).take_while(|&key| key <= end_high).collect()
        };

        let mut removed = 0;
        for high in keys {
            let low_start = if high == start_high { start_low } else { 0 };
            let low_end = if high == end_high { end_low } else { u16::MAX };
            let container = self.art.get_mut(high).unwrap();
            removed += container.remove_range(low_start..=low_end);
            if container.is_empty() {
                self.remove_container(high);
            }
        }
        removed
    }

    /// Returns `true` if this set contains the specified integer.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap64;
    ///
    /// let mut rb = Bitmap64::new();
    /// rb.insert(1);
    /// assert_eq!(rb.contains(0), false);
    /// assert_eq!(rb.contains(1), true);
    /// ```
    #[inline]
    pub fn contains(&self, value: u64) -> bool {
        let (high, low) = util::split(value);
        match self.art.get(high) {
            Some(container) => container.contains(low),
            None => false,
        }
    }

    /// Returns `true` if this set contains the specified integer, caching
    /// the chunk lookup in `context`.
    pub fn contains_bulk(&self, context: &mut BulkContext, value: u64) -> bool {
        let (high, low) = util::split(value);
        if let Some(leaf) = self.cached_leaf(context, high) {
            return leaf.value.contains(low);
        }
        match self.art.find_leaf(high) {
            Some(leaf) => {
                // A context refilled through a shared walk must not be
                // written through later.
                *context = BulkContext {
                    bitmap_id: self.id,
                    version: self.version,
                    high,
                    leaf: Some(NonNull::from(leaf)),
                    mutable: false,
                };
                leaf.value.contains(low)
            }
            None => false,
        }
    }

    /// Returns `true` if all values in the range are present in this set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap64;
    ///
    /// let mut rb = Bitmap64::new();
    /// rb.insert_range(1..0x1_0000_0001);
    /// assert!(rb.contains_range(1..0x1_0000_0001));
    /// assert!(!rb.contains_range(0..2));
    /// ```
    pub fn contains_range<R>(&self, range: R) -> bool
    where
        R: RangeBounds<u64>,
    {
        let Some(range) = util::convert_range_to_inclusive(range) else {
            // Empty/Invalid ranges are always contained
            return true;
        };
        let (start_high, start_low) = util::split(*range.start());
        let (end_high, end_low) = util::split(*range.end());

        let mut iter = self.art.iter();
        iter.advance_to(start_high);
        let mut expected = start_high;
        for leaf in iter {
            if leaf.key != expected {
                return false;
            }
            let low_start = if leaf.key == start_high { start_low } else { 0 };
            let low_end = if leaf.key == end_high { end_low } else { u16::MAX };
            if !leaf.value.contains_range(low_start..=low_end) {
                return false;
            }
            if leaf.key == end_high {
                return true;
            }
            expected += 1;
        }
        false
    }

    /// Returns the number of elements in this set which are in the passed range.
    pub fn range_cardinality<R>(&self, range: R) -> u64
    where
        R: RangeBounds<u64>,
    {
        let Some(range) = util::convert_range_to_inclusive(range) else {
            return 0;
        };
        let (start_high, start_low) = util::split(*range.start());
        let (end_high, end_low) = util::split(*range.end());

        let mut iter = self.art.iter();
        iter.advance_to(start_high);
        let mut cardinality = 0;
        for leaf in iter {
            if leaf.key > end_high {
                break;
            }
            let full = leaf.value.len();
            let mut count = if leaf.key == end_high { leaf.value.rank(end_low) } else { full };
            if leaf.key == start_high && start_low != 0 {
                count -= leaf.value.rank(start_low - 1);
            }
            cardinality += count;
            if leaf.key == end_high {
                break;
            }
        }
        cardinality
    }

    /// Clears all integers in this set.
    pub fn clear(&mut self) {
        self.version += 1;
        self.art.clear();
    }

    /// Returns `true` if there are no integers in this set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap64;
    ///
    /// let mut rb = Bitmap64::new();
    /// assert_eq!(rb.is_empty(), true);
    ///
    /// rb.insert(3);
    /// assert_eq!(rb.is_empty(), false);
    /// ```
    pub fn is_empty(&self) -> bool {
        self.art.is_empty()
    }

    /// Returns the number of distinct integers added to the set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap64;
    ///
    /// let mut rb = Bitmap64::new();
    /// assert_eq!(rb.len(), 0);
    ///
    /// rb.insert(3);
    /// assert_eq!(rb.len(), 1);
    /// ```
    pub fn len(&self) -> u64 {
        self.art.iter().map(|leaf| leaf.value.len()).sum()
    }

    /// Returns the minimum value in the set (if the set is non-empty).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap64;
    ///
    /// let mut rb = Bitmap64::new();
    /// assert_eq!(rb.min(), None);
    ///
    /// rb.insert(1 << 40);
    /// assert_eq!(rb.min(), Some(1 << 40));
    /// ```
    pub fn min(&self) -> Option<u64> {
        let leaf = self.art.first()?;
        leaf.value.min().map(|low| util::join(leaf.key, low))
    }

    /// Returns the maximum value in the set (if the set is non-empty).
    pub fn max(&self) -> Option<u64> {
        let leaf = self.art.last()?;
        leaf.value.max().map(|low| util::join(leaf.key, low))
    }

    /// Returns the number of integers that are <= value.
    /// rank(u64::MAX) == len()
    pub fn rank(&self, value: u64) -> u64 {
        let (high, low) = util::split(value);
        let mut rank = 0;
        for leaf in self.art.iter() {
            if leaf.key > high {
                break;
            }
            if leaf.key == high {
                rank += leaf.value.rank(low);
                break;
            }
            rank += leaf.value.len();
        }
        rank
    }

    /// Returns the `n`th integer in the set or `None` if `n >= len()`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap64;
    ///
    /// let rb = Bitmap64::from([0, 10, 1 << 40]);
    /// assert_eq!(rb.select(0), Some(0));
    /// assert_eq!(rb.select(2), Some(1 << 40));
    /// assert_eq!(rb.select(3), None);
    /// ```
    pub fn select(&self, n: u64) -> Option<u64> {
        let mut n = n;
        for leaf in self.art.iter() {
            let len = leaf.value.len();
            if len > n {
                return leaf.value.select(n as u16).map(|low| util::join(leaf.key, low));
            }
            n -= len;
        }
        None
    }

    /// Returns the zero-based index of `value` in the ascending order of the
    /// set, or `None` if the value is absent.
    pub fn position(&self, value: u64) -> Option<u64> {
        let (high, low) = util::split(value);
        self.art.get(high)?.contains(low).then(|| self.rank(value) - 1)
    }

    /// Compresses every chunk into its run layout where that is smaller.
    ///
    /// Returns whether any chunk changed layout.
    pub fn run_optimize(&mut self) -> bool {
        let mut changed = false;
        let keys: Vec<u64> = self.art.iter().map(|leaf| leaf.key).collect();
        for key in keys {
            changed |= self.art.get_mut(key).unwrap().optimize();
        }
        changed
    }

    /// Replaces every run-encoded chunk by its array or bitmap layout.
    ///
    /// Returns whether any chunk changed layout.
    pub fn remove_run_compression(&mut self) -> bool {
        let mut changed = false;
        let keys: Vec<u64> = self.art.iter().map(|leaf| leaf.key).collect();
        for key in keys {
            changed |= self.art.get_mut(key).unwrap().remove_run_compression();
        }
        changed
    }

    /// Releases slack heap capacity, returning an estimate of the bytes
    /// freed.
    pub fn shrink_to_fit(&mut self) -> u64 {
        let mut saved = 0;
        let keys: Vec<u64> = self.art.iter().map(|leaf| leaf.key).collect();
        for key in keys {
            saved += self.art.get_mut(key).unwrap().shrink_to_fit();
        }
        saved
    }

    /// An estimate of the in-memory bytes used by this bitmap.
    pub fn size_in_bytes(&self) -> usize {
        core::mem::size_of::<Bitmap64>()
            + self
                .art
                .iter()
                .map(|leaf| {
                    core::mem::size_of::<Leaf<Container>>() + leaf.value.store().byte_size()
                })
                .sum::<usize>()
    }

    /// Create the set from a sorted iterator. Values must be sorted and deduplicated.
    ///
    /// Returns `Ok` with the requested `Bitmap64`, `Err` with the number of elements
    /// that were correctly appended before failure.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap64;
    ///
    /// let rb = Bitmap64::from_sorted_iter(0..10).unwrap();
    /// assert!(rb.iter().eq(0..10));
    /// ```
    pub fn from_sorted_iter<I: IntoIterator<Item = u64>>(
        iterator: I,
    ) -> Result<Bitmap64, NonSortedIntegers> {
        let mut rb = Bitmap64::new();
        rb.append(iterator).map(|_| rb)
    }

    /// Extend the set with a sorted iterator.
    ///
    /// Returns `Ok` with the number of elements appended to the set, `Err` with
    /// the number of elements we effectively appended before an error occurred.
    pub fn append<I: IntoIterator<Item = u64>>(
        &mut self,
        iterator: I,
    ) -> Result<u64, NonSortedIntegers> {
        let mut iterator = iterator.into_iter();

        let mut prev = match (iterator.next(), self.max()) {
            (None, _) => return Ok(0),
            (Some(first), Some(max)) if first <= max => {
                return Err(NonSortedIntegers { valid_until: 0 })
            }
            (Some(first), _) => first,
        };

        self.push_unchecked(prev);

        let mut count = 1;

        for value in iterator {
            if value <= prev {
                return Err(NonSortedIntegers { valid_until: count });
            } else {
                self.push_unchecked(value);
                prev = value;
                count += 1;
            }
        }

        Ok(count)
    }

    #[doc(hidden)]
    pub fn internal_validate(&self) -> Result<(), &'static str> {
        let mut prev_key = None;
        for leaf in self.art.iter() {
            if leaf.key > MAX_KEY {
                return Err("chunk prefix exceeds 48 bits");
            }
            if prev_key.map_or(false, |prev| prev >= leaf.key) {
                return Err("chunk prefixes not strictly increasing");
            }
            prev_key = Some(leaf.key);
            if leaf.value.key != leaf.key as u16 {
                return Err("chunk key does not match its prefix");
            }
            leaf.value.internal_validate()?;
        }
        Ok(())
    }
}

impl Default for Bitmap64 {
    fn default() -> Bitmap64 {
        Bitmap64::new()
    }
}

impl Clone for Bitmap64 {
    fn clone(&self) -> Self {
        Bitmap64 {
            art: self.art.clone(),
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            version: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_contains_remove_across_chunks() {
        let mut rb = Bitmap64::new();
        let values = [0u64, 1, 0xFFFF, 0x1_0000, 0xFFFF_FFFF, 0x1_0000_0000, u64::MAX];
        for &value in &values {
            assert!(rb.insert(value));
            assert!(!rb.insert(value));
        }
        assert_eq!(rb.len(), values.len() as u64);
        for &value in &values {
            assert!(rb.contains(value));
        }
        assert_eq!(rb.min(), Some(0));
        assert_eq!(rb.max(), Some(u64::MAX));

        for &value in &values {
            assert!(rb.remove(value));
            assert!(!rb.remove(value));
        }
        assert!(rb.is_empty());
    }

    #[test]
    fn bulk_context_inserts_and_queries() {
        let mut rb = Bitmap64::new();
        let mut context = BulkContext::new();
        for value in 0..100_000u64 {
            assert!(rb.insert_bulk(&mut context, value));
        }
        assert_eq!(rb.len(), 100_000);

        let mut context = BulkContext::new();
        for value in 0..100_000u64 {
            assert!(rb.contains_bulk(&mut context, value));
        }
        assert!(!rb.contains_bulk(&mut context, 100_000));

        let mut context = BulkContext::new();
        for value in 0..100_000u64 {
            assert!(rb.remove_bulk(&mut context, value));
        }
        assert!(rb.is_empty());
    }

    #[test]
    fn bulk_context_survives_interleaved_direct_mutation() {
        let mut rb = Bitmap64::new();
        let mut context = BulkContext::new();
        rb.insert_bulk(&mut context, 10);
        // A structural change through the plain API invalidates the cached
        // chunk; the next bulk call must re-walk and still be correct.
        rb.insert(1 << 40);
        assert!(rb.insert_bulk(&mut context, 11));
        assert!(rb.contains(10));
        assert!(rb.contains(11));
        assert!(rb.contains(1 << 40));
    }

    #[test]
    fn bulk_context_from_another_bitmap_is_ignored() {
        let mut a = Bitmap64::new();
        let mut b = Bitmap64::new();
        let mut context = BulkContext::new();
        a.insert_bulk(&mut context, 42);
        // Same shape, different identity: the cache must not be trusted.
        assert!(!b.contains_bulk(&mut context, 42));
        assert!(b.insert_bulk(&mut context, 42));
        assert!(b.contains(42));
        assert!(a.contains(42));
    }

    #[test]
    fn insert_remove_range_spanning_chunks() {
        let mut rb = Bitmap64::new();
        let inserted = rb.insert_range(0xFFFE..=0x2_0001);
        assert_eq!(inserted, 0x2_0001 - 0xFFFE + 1);
        assert!(rb.contains(0xFFFF));
        assert!(rb.contains(0x1_0000));
        assert!(rb.contains(0x2_0001));
        assert!(!rb.contains(0x2_0002));

        assert_eq!(rb.remove_range(0x1_0000..=0x1_FFFF), 0x1_0000);
        assert!(rb.contains(0xFFFF));
        assert!(!rb.contains(0x1_0000));
        assert!(rb.contains(0x2_0000));

        let remaining = rb.len();
        assert_eq!(rb.remove_range(..), remaining);
        assert!(rb.is_empty());
    }

    #[test]
    fn rank_select_position_roundtrip() {
        let values = [1u64, 100, 0xFFFF, 0x1_0000, 1 << 33, (1 << 48) + 5, u64::MAX];
        let rb = Bitmap64::from(values);
        for (i, &value) in values.iter().enumerate() {
            assert_eq!(rb.rank(value), i as u64 + 1);
            assert_eq!(rb.select(i as u64), Some(value));
            assert_eq!(rb.position(value), Some(i as u64));
        }
        assert_eq!(rb.rank(0), 0);
        assert_eq!(rb.rank(u64::MAX), rb.len());
        assert_eq!(rb.select(values.len() as u64), None);
        assert_eq!(rb.position(2), None);
    }

    #[test]
    fn contains_range_requires_full_chunks() {
        let mut rb = Bitmap64::new();
        rb.insert_range(0x1_0000..=0x3_FFFF);
        assert!(rb.contains_range(0x1_0000..=0x3_FFFF));
        assert!(rb.contains_range(0x1_1234..=0x2_0000));
        assert!(!rb.contains_range(0xFFFF..=0x1_0000));
        assert!(!rb.contains_range(0x3_FFFF..=0x4_0000));

        rb.remove(0x2_5000);
        assert!(!rb.contains_range(0x1_0000..=0x3_FFFF));
        assert!(rb.contains_range(0x2_5001..=0x3_0000));
    }

    #[test]
    fn range_cardinality_spanning_chunks() {
        let mut rb = Bitmap64::new();
        rb.insert_range(0..=0x2_FFFF);
        rb.insert(1 << 40);
        assert_eq!(rb.range_cardinality(..), rb.len());
        assert_eq!(rb.range_cardinality(0x1_0000..0x2_0000), 0x1_0000);
        assert_eq!(rb.range_cardinality(0x2_8000..=1 << 40), 0x8000 + 1);
        assert_eq!(rb.range_cardinality((1 << 40) + 1..), 0);
    }

    #[test]
    fn append_rejects_unsorted() {
        let mut rb = Bitmap64::new();
        assert_eq!(rb.append([1, 2, 3]), Ok(3));
        let err = rb.append([10, 9]).unwrap_err();
        assert_eq!(err.valid_until(), 1);
        assert!(rb.contains(10));
        assert!(!rb.contains(9));
    }
}
