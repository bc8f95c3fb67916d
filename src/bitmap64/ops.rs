use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Sub, SubAssign};

use super::cmp::Pairs;
use crate::Bitmap64;

impl Bitmap64 {
    /// Computes the len of the intersection with the specified other bitmap without creating a
    /// new bitmap.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap64;
    ///
    /// let rb1 = Bitmap64::from([1, 2, 1 << 40]);
    /// let rb2 = Bitmap64::from([2, 1 << 40, 1 << 41]);
    ///
    /// assert_eq!(rb1.intersection_len(&rb2), (rb1 & rb2).len());
    /// ```
    pub fn intersection_len(&self, other: &Bitmap64) -> u64 {
        Pairs::new(self, other)
            .map(|pair| match pair {
                (Some(lhs), Some(rhs)) => lhs.value.intersection_len(&rhs.value),
                _ => 0,
            })
            .sum()
    }

    /// Computes the len of the union with the specified other bitmap without creating a new
    /// bitmap.
    pub fn union_len(&self, other: &Bitmap64) -> u64 {
        self.len().wrapping_add(other.len()).wrapping_sub(self.intersection_len(other))
    }

    /// Computes the len of the difference with the specified other bitmap without creating a new
    /// bitmap.
    pub fn difference_len(&self, other: &Bitmap64) -> u64 {
        self.len() - self.intersection_len(other)
    }

    /// Computes the len of the symmetric difference with the specified other bitmap without
    /// creating a new bitmap.
    pub fn symmetric_difference_len(&self, other: &Bitmap64) -> u64 {
        let intersection_len = self.intersection_len(other);
        self.len()
            .wrapping_add(other.len())
            .wrapping_sub(intersection_len)
            .wrapping_sub(intersection_len)
    }
}

impl BitOr<Bitmap64> for Bitmap64 {
    type Output = Bitmap64;

    /// An `union` between two sets.
    fn bitor(mut self, rhs: Bitmap64) -> Bitmap64 {
        BitOrAssign::bitor_assign(&mut self, &rhs);
        self
    }
}

impl BitOr<&Bitmap64> for Bitmap64 {
    type Output = Bitmap64;

    /// An `union` between two sets.
    fn bitor(mut self, rhs: &Bitmap64) -> Bitmap64 {
        BitOrAssign::bitor_assign(&mut self, rhs);
        self
    }
}

impl BitOr<Bitmap64> for &Bitmap64 {
    type Output = Bitmap64;

    /// An `union` between two sets.
    fn bitor(self, rhs: Bitmap64) -> Bitmap64 {
        BitOr::bitor(rhs, self)
    }
}

impl BitOr<&Bitmap64> for &Bitmap64 {
    type Output = Bitmap64;

    /// An `union` between two sets.
    fn bitor(self, rhs: &Bitmap64) -> Bitmap64 {
        let mut result = Bitmap64::new();
        for pair in Pairs::new(self, rhs) {
            match pair {
                (Some(lhs), None) => result.insert_container(lhs.key, lhs.value.clone()),
                (None, Some(rhs)) => result.insert_container(rhs.key, rhs.value.clone()),
                (Some(lhs), Some(rhs)) => {
                    result.insert_container(lhs.key, BitOr::bitor(&lhs.value, &rhs.value))
                }
                (None, None) => break,
            }
        }
        result
    }
}

impl BitOrAssign<Bitmap64> for Bitmap64 {
    /// An `union` between two sets.
    fn bitor_assign(&mut self, rhs: Bitmap64) {
        BitOrAssign::bitor_assign(self, &rhs);
    }
}

impl BitOrAssign<&Bitmap64> for Bitmap64 {
    /// An `union` between two sets.
    fn bitor_assign(&mut self, rhs: &Bitmap64) {
        for leaf in rhs.art().iter() {
            if self.container(leaf.key).is_some() {
                let container = self.container_mut(leaf.key).unwrap();
                BitOrAssign::bitor_assign(container, &leaf.value);
            } else {
                self.insert_container(leaf.key, leaf.value.clone());
            }
        }
    }
}

impl BitAnd<Bitmap64> for Bitmap64 {
    type Output = Bitmap64;

    /// An `intersection` between two sets.
    fn bitand(mut self, rhs: Bitmap64) -> Bitmap64 {
        BitAndAssign::bitand_assign(&mut self, &rhs);
        self
    }
}

impl BitAnd<&Bitmap64> for Bitmap64 {
    type Output = Bitmap64;

    /// An `intersection` between two sets.
    fn bitand(mut self, rhs: &Bitmap64) -> Bitmap64 {
        BitAndAssign::bitand_assign(&mut self, rhs);
        self
    }
}

impl BitAnd<Bitmap64> for &Bitmap64 {
    type Output = Bitmap64;

    /// An `intersection` between two sets.
    fn bitand(self, rhs: Bitmap64) -> Bitmap64 {
        BitAnd::bitand(rhs, self)
    }
}

impl BitAnd<&Bitmap64> for &Bitmap64 {
    type Output = Bitmap64;

    /// An `intersection` between two sets.
    fn bitand(self, rhs: &Bitmap64) -> Bitmap64 {
        let mut result = Bitmap64::new();
        for pair in Pairs::new(self, rhs) {
            if let (Some(lhs), Some(rhs)) = pair {
                let container = BitAnd::bitand(&lhs.value, &rhs.value);
                if !container.is_empty() {
                    result.insert_container(lhs.key, container);
                }
            }
        }
        result
    }
}

impl BitAndAssign<Bitmap64> for Bitmap64 {
    /// An `intersection` between two sets.
    fn bitand_assign(&mut self, rhs: Bitmap64) {
        BitAndAssign::bitand_assign(self, &rhs);
    }
}

impl BitAndAssign<&Bitmap64> for Bitmap64 {
    /// An `intersection` between two sets.
    fn bitand_assign(&mut self, rhs: &Bitmap64) {
        let keys: Vec<u64> = self.art().iter().map(|leaf| leaf.key).collect();
        for key in keys {
            match rhs.container(key) {
                Some(other) => {
                    let container = self.container_mut(key).unwrap();
                    BitAndAssign::bitand_assign(container, other);
                    if container.is_empty() {
                        self.remove_container(key);
                    }
                }
                None => self.remove_container(key),
            }
        }
    }
}

impl Sub<Bitmap64> for Bitmap64 {
    type Output = Bitmap64;

    /// A `difference` between two sets.
    fn sub(mut self, rhs: Bitmap64) -> Bitmap64 {
        SubAssign::sub_assign(&mut self, &rhs);
        self
    }
}

impl Sub<&Bitmap64> for Bitmap64 {
    type Output = Bitmap64;

    /// A `difference` between two sets.
    fn sub(mut self, rhs: &Bitmap64) -> Bitmap64 {
        SubAssign::sub_assign(&mut self, rhs);
        self
    }
}

impl Sub<Bitmap64> for &Bitmap64 {
    type Output = Bitmap64;

    /// A `difference` between two sets.
    fn sub(self, rhs: Bitmap64) -> Bitmap64 {
        Sub::sub(self, &rhs)
    }
}

impl Sub<&Bitmap64> for &Bitmap64 {
    type Output = Bitmap64;

    /// A `difference` between two sets.
    fn sub(self, rhs: &Bitmap64) -> Bitmap64 {
        let mut result = Bitmap64::new();
        for pair in Pairs::new(self, rhs) {
            match pair {
                (Some(lhs), None) => result.insert_container(lhs.key, lhs.value.clone()),
                (None, Some(_)) => (),
                (Some(lhs), Some(rhs)) => {
                    let container = Sub::sub(&lhs.value, &rhs.value);
                    if !container.is_empty() {
                        result.insert_container(lhs.key, container);
                    }
                }
                (None, None) => break,
            }
        }
        result
    }
}

impl SubAssign<Bitmap64> for Bitmap64 {
    /// A `difference` between two sets.
    fn sub_assign(&mut self, rhs: Bitmap64) {
        SubAssign::sub_assign(self, &rhs);
    }
}

impl SubAssign<&Bitmap64> for Bitmap64 {
    /// A `difference` between two sets.
    fn sub_assign(&mut self, rhs: &Bitmap64) {
        for leaf in rhs.art().iter() {
            if self.container(leaf.key).is_some() {
                let container = self.container_mut(leaf.key).unwrap();
                SubAssign::sub_assign(container, &leaf.value);
                if container.is_empty() {
                    self.remove_container(leaf.key);
                }
            }
        }
    }
}

impl BitXor<Bitmap64> for Bitmap64 {
    type Output = Bitmap64;

    /// A `symmetric difference` between two sets.
    fn bitxor(mut self, rhs: Bitmap64) -> Bitmap64 {
        BitXorAssign::bitxor_assign(&mut self, &rhs);
        self
    }
}

impl BitXor<&Bitmap64> for Bitmap64 {
    type Output = Bitmap64;

    /// A `symmetric difference` between two sets.
    fn bitxor(mut self, rhs: &Bitmap64) -> Bitmap64 {
        BitXorAssign::bitxor_assign(&mut self, rhs);
        self
    }
}

impl BitXor<Bitmap64> for &Bitmap64 {
    type Output = Bitmap64;

    /// A `symmetric difference` between two sets.
    fn bitxor(self, rhs: Bitmap64) -> Bitmap64 {
        BitXor::bitxor(rhs, self)
    }
}

impl BitXor<&Bitmap64> for &Bitmap64 {
    type Output = Bitmap64;

    /// A `symmetric difference` between two sets.
    fn bitxor(self, rhs: &Bitmap64) -> Bitmap64 {
        let mut result = Bitmap64::new();
        for pair in Pairs::new(self, rhs) {
            match pair {
                (Some(lhs), None) => result.insert_container(lhs.key, lhs.value.clone()),
                (None, Some(rhs)) => result.insert_container(rhs.key, rhs.value.clone()),
                (Some(lhs), Some(rhs)) => {
                    let container = BitXor::bitxor(&lhs.value, &rhs.value);
                    if !container.is_empty() {
                        result.insert_container(lhs.key, container);
                    }
                }
                (None, None) => break,
            }
        }
        result
    }
}

impl BitXorAssign<Bitmap64> for Bitmap64 {
    /// A `symmetric difference` between two sets.
    fn bitxor_assign(&mut self, rhs: Bitmap64) {
        BitXorAssign::bitxor_assign(self, &rhs);
    }
}

impl BitXorAssign<&Bitmap64> for Bitmap64 {
    /// A `symmetric difference` between two sets.
    fn bitxor_assign(&mut self, rhs: &Bitmap64) {
        for leaf in rhs.art().iter() {
            if self.container(leaf.key).is_some() {
                let container = self.container_mut(leaf.key).unwrap();
                BitXorAssign::bitxor_assign(container, &leaf.value);
                if container.is_empty() {
                    self.remove_container(leaf.key);
                }
            } else {
                self.insert_container(leaf.key, leaf.value.clone());
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::Bitmap64;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn fast_counts_match_materialized_ops(
            a in Bitmap64::arbitrary(),
            b in Bitmap64::arbitrary()
        ) {
            prop_assert_eq!(a.union_len(&b), (&a | &b).len());
            prop_assert_eq!(a.intersection_len(&b), (&a & &b).len());
            prop_assert_eq!(a.difference_len(&b), (&a - &b).len());
            prop_assert_eq!(a.symmetric_difference_len(&b), (&a ^ &b).len());
        }

        #[test]
        fn inplace_ops_match_allocating_ops(
            a in Bitmap64::arbitrary(),
            b in Bitmap64::arbitrary()
        ) {
            let mut and = a.clone();
            and &= &b;
            prop_assert_eq!(&and, &(&a & &b));

            let mut or = a.clone();
            or |= &b;
            prop_assert_eq!(&or, &(&a | &b));

            let mut xor = a.clone();
            xor ^= &b;
            prop_assert_eq!(&xor, &(&a ^ &b));

            let mut sub = a.clone();
            sub -= &b;
            prop_assert_eq!(&sub, &(&a - &b));
        }
    }
}
