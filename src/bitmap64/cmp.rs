use core::cmp::Ordering;
use core::iter::Peekable;

use super::art::{Iter as ArtIter, Leaf};
use crate::bitmap::Container;
use crate::Bitmap64;

impl Bitmap64 {
    /// Returns true if the set has no elements in common with other. This is equivalent to
    /// checking for an empty intersection.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap64;
    ///
    /// let rb1 = Bitmap64::from([1, 1 << 40]);
    /// let rb2 = Bitmap64::from([2, 2 << 40]);
    ///
    /// assert!(rb1.is_disjoint(&rb2));
    /// assert!(!rb1.is_disjoint(&rb1));
    /// ```
    pub fn is_disjoint(&self, other: &Self) -> bool {
        !self.intersect(other)
    }

    /// Returns true if the two sets have at least one value in common.
    pub fn intersect(&self, other: &Self) -> bool {
        Pairs::new(self, other)
            .filter_map(|(c1, c2)| c1.zip(c2))
            .any(|(c1, c2)| !c1.value.is_disjoint(&c2.value))
    }

    /// Returns `true` if this set is a subset of `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap64;
    ///
    /// let rb1 = Bitmap64::from([1, 1 << 40]);
    /// let rb2 = Bitmap64::from([1, 2, 1 << 40]);
    ///
    /// assert!(rb1.is_subset(&rb2));
    /// assert!(!rb2.is_subset(&rb1));
    /// ```
    pub fn is_subset(&self, other: &Self) -> bool {
        for pair in Pairs::new(self, other) {
            match pair {
                (None, _) => (),
                (_, None) => return false,
                (Some(c1), Some(c2)) => {
                    if !c1.value.is_subset(&c2.value) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Returns `true` if this set is a subset of `other` and the two sets
    /// are not equal.
    pub fn is_strict_subset(&self, other: &Self) -> bool {
        self.len() < other.len() && self.is_subset(other)
    }

    /// Returns `true` if this set is a superset of `other`.
    pub fn is_superset(&self, other: &Self) -> bool {
        other.is_subset(self)
    }
}

impl PartialEq for Bitmap64 {
    fn eq(&self, other: &Self) -> bool {
        self.art().len() == other.art().len()
            && self
                .art()
                .iter()
                .zip(other.art().iter())
                .all(|(c1, c2)| c1.key == c2.key && c1.value == c2.value)
    }
}

/// The chunk-aligned walk over two bitmaps, yielding the chunk of the
/// smaller pending prefix or both chunks when the prefixes match.
pub(crate) struct Pairs<'a> {
    left: Peekable<ArtIter<'a, Container>>,
    right: Peekable<ArtIter<'a, Container>>,
}

impl<'a> Pairs<'a> {
    pub fn new(left: &'a Bitmap64, right: &'a Bitmap64) -> Pairs<'a> {
        Pairs { left: left.art().iter().peekable(), right: right.art().iter().peekable() }
    }
}

impl<'a> Iterator for Pairs<'a> {
    type Item = (Option<&'a Leaf<Container>>, Option<&'a Leaf<Container>>);

    fn next(&mut self) -> Option<Self::Item> {
        match (self.left.peek(), self.right.peek()) {
            (None, None) => None,
            (Some(_), None) => Some((self.left.next(), None)),
            (None, Some(_)) => Some((None, self.right.next())),
            (Some(c1), Some(c2)) => match c1.key.cmp(&c2.key) {
                Ordering::Equal => Some((self.left.next(), self.right.next())),
                Ordering::Less => Some((self.left.next(), None)),
                Ordering::Greater => Some((None, self.right.next())),
            },
        }
    }
}
