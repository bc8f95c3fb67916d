use core::mem;
use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Sub, SubAssign};

use crate::bitmap::container::Container;
use crate::bitmap::Pairs;
use crate::Bitmap;

impl Bitmap {
    /// Computes the len of the intersection with the specified other bitmap without creating a
    /// new bitmap.
    ///
    /// This is faster and more space efficient when you're only interested in the cardinality of
    /// the intersection.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap;
    ///
    /// let rb1: Bitmap = (1..4).collect();
    /// let rb2: Bitmap = (3..5).collect();
    ///
    ///
    /// assert_eq!(rb1.intersection_len(&rb2), (rb1 & rb2).len());
    /// ```
    pub fn intersection_len(&self, other: &Bitmap) -> u64 {
        Pairs::new(&self.containers, &other.containers)
            .map(|pair| match pair {
                (Some(lhs), Some(rhs)) => lhs.intersection_len(rhs),
                _ => 0,
            })
            .sum()
    }

    /// Computes the len of the union with the specified other bitmap without creating a new bitmap.
    ///
    /// This is faster and more space efficient when you're only interested in the cardinality of
    /// the union.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap;
    ///
    /// let rb1: Bitmap = (1..4).collect();
    /// let rb2: Bitmap = (3..5).collect();
    ///
    ///
    /// assert_eq!(rb1.union_len(&rb2), (rb1 | rb2).len());
    /// ```
    pub fn union_len(&self, other: &Bitmap) -> u64 {
        self.len().wrapping_add(other.len()).wrapping_sub(self.intersection_len(other))
    }

    /// Computes the len of the difference with the specified other bitmap without creating a new
    /// bitmap.
    ///
    /// This is faster and more space efficient when you're only interested in the cardinality of
    /// the difference.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap;
    ///
    /// let rb1: Bitmap = (1..4).collect();
    /// let rb2: Bitmap = (3..5).collect();
    ///
    ///
    /// assert_eq!(rb1.difference_len(&rb2), (rb1 - rb2).len());
    /// ```
    pub fn difference_len(&self, other: &Bitmap) -> u64 {
        self.len() - self.intersection_len(other)
    }

    /// Computes the len of the symmetric difference with the specified other bitmap without
    /// creating a new bitmap.
    ///
    /// This is faster and more space efficient when you're only interested in the cardinality of
    /// the symmetric difference.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap;
    ///
    /// let rb1: Bitmap = (1..4).collect();
    /// let rb2: Bitmap = (3..5).collect();
    ///
    ///
    /// assert_eq!(rb1.symmetric_difference_len(&rb2), (rb1 ^ rb2).len());
    /// ```
    pub fn symmetric_difference_len(&self, other: &Bitmap) -> u64 {
        let intersection_len = self.intersection_len(other);
        self.len()
            .wrapping_add(other.len())
            .wrapping_sub(intersection_len)
            .wrapping_sub(intersection_len)
    }

    /// The Jaccard index of the two sets: intersection size over union size.
    ///
    /// `NaN` when both sets are empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use riptide::Bitmap;
    ///
    /// let rb1 = Bitmap::from([1, 2, 3, 4]);
    /// let rb2 = Bitmap::from([3, 4, 5, 6]);
    ///
    /// assert_eq!(rb1.jaccard_index(&rb2), 2.0 / 6.0);
    /// ```
    pub fn jaccard_index(&self, other: &Bitmap) -> f64 {
        let intersection_len = self.intersection_len(other);
        let union_len =
            self.len().wrapping_add(other.len()).wrapping_sub(intersection_len);
        intersection_len as f64 / union_len as f64
    }
}

impl BitOr<Bitmap> for Bitmap {
    type Output = Bitmap;

    /// An `union` between two sets.
    fn bitor(mut self, rhs: Bitmap) -> Bitmap {
        BitOrAssign::bitor_assign(&mut self, rhs);
        self
    }
}

impl BitOr<&Bitmap> for Bitmap {
    type Output = Bitmap;

    /// An `union` between two sets.
    fn bitor(mut self, rhs: &Bitmap) -> Bitmap {
        BitOrAssign::bitor_assign(&mut self, rhs);
        self
    }
}

impl BitOr<Bitmap> for &Bitmap {
    type Output = Bitmap;

    /// An `union` between two sets.
    fn bitor(self, rhs: Bitmap) -> Bitmap {
        BitOr::bitor(rhs, self)
    }
}

impl BitOr<&Bitmap> for &Bitmap {
    type Output = Bitmap;

    /// An `union` between two sets.
    fn bitor(self, rhs: &Bitmap) -> Bitmap {
        let mut containers = Vec::new();

        for pair in Pairs::new(&self.containers, &rhs.containers) {
            match pair {
                (Some(lhs), None) => containers.push(lhs.clone()),
                (None, Some(rhs)) => containers.push(rhs.clone()),
                (Some(lhs), Some(rhs)) => containers.push(BitOr::bitor(lhs, rhs)),
                (None, None) => break,
            }
        }

        Bitmap::from_containers(containers)
    }
}

impl BitOrAssign<Bitmap> for Bitmap {
    /// An `union` between two sets.
    fn bitor_assign(&mut self, mut rhs: Bitmap) {
        // We make sure that we apply the union operation on the biggest map.
        if self.len() < rhs.len() {
            mem::swap(self, &mut rhs);
        }

        for container in rhs.containers {
            let key = container.key;
            match self.containers.binary_search_by_key(&key, |c| c.key) {
                Err(loc) => self.containers.insert(loc, container),
                Ok(loc) => BitOrAssign::bitor_assign(&mut self.containers[loc], container),
            }
        }
    }
}

impl BitOrAssign<&Bitmap> for Bitmap {
    /// An `union` between two sets.
    fn bitor_assign(&mut self, rhs: &Bitmap) {
        for container in &rhs.containers {
            let key = container.key;
            match self.containers.binary_search_by_key(&key, |c| c.key) {
                Err(loc) => self.containers.insert(loc, container.clone()),
                Ok(loc) => BitOrAssign::bitor_assign(&mut self.containers[loc], container),
            }
        }
    }
}

impl BitAnd<Bitmap> for Bitmap {
    type Output = Bitmap;

    /// An `intersection` between two sets.
    fn bitand(mut self, rhs: Bitmap) -> Bitmap {
        BitAndAssign::bitand_assign(&mut self, rhs);
        self
    }
}

impl BitAnd<&Bitmap> for Bitmap {
    type Output = Bitmap;

    /// An `intersection` between two sets.
    fn bitand(mut self, rhs: &Bitmap) -> Bitmap {
        BitAndAssign::bitand_assign(&mut self, rhs);
        self
    }
}

impl BitAnd<Bitmap> for &Bitmap {
    type Output = Bitmap;

    /// An `intersection` between two sets.
    fn bitand(self, rhs: Bitmap) -> Bitmap {
        BitAnd::bitand(rhs, self)
    }
}

impl BitAnd<&Bitmap> for &Bitmap {
    type Output = Bitmap;

    /// An `intersection` between two sets.
    fn bitand(self, rhs: &Bitmap) -> Bitmap {
        let mut containers = Vec::new();

        for pair in Pairs::new(&self.containers, &rhs.containers) {
            if let (Some(lhs), Some(rhs)) = pair {
                let container = BitAnd::bitand(lhs, rhs);
                if !container.is_empty() {
                    containers.push(container);
                }
            }
        }

        Bitmap::from_containers(containers)
    }
}

impl BitAndAssign<Bitmap> for Bitmap {
    /// An `intersection` between two sets.
    fn bitand_assign(&mut self, mut rhs: Bitmap) {
        // We make sure that we apply the intersection operation on the smallest map.
        if rhs.containers.len() < self.containers.len() {
            mem::swap(self, &mut rhs);
        }

        self.containers.retain_mut(|cont| {
            let key = cont.key;
            match rhs.containers.binary_search_by_key(&key, |c| c.key) {
                Ok(loc) => {
                    let rhs_cont = &mut rhs.containers[loc];
                    let rhs_cont = mem::replace(rhs_cont, Container::new(key));
                    BitAndAssign::bitand_assign(cont, rhs_cont);
                    !cont.is_empty()
                }
                Err(_) => false,
            }
        })
    }
}

impl BitAndAssign<&Bitmap> for Bitmap {
    /// An `intersection` between two sets.
    fn bitand_assign(&mut self, rhs: &Bitmap) {
        self.containers.retain_mut(|cont| {
            let key = cont.key;
            match rhs.containers.binary_search_by_key(&key, |c| c.key) {
                Ok(loc) => {
                    BitAndAssign::bitand_assign(cont, &rhs.containers[loc]);
                    !cont.is_empty()
                }
                Err(_) => false,
            }
        })
    }
}

impl Sub<Bitmap> for Bitmap {
    type Output = Bitmap;

    /// A `difference` between two sets.
    fn sub(mut self, rhs: Bitmap) -> Bitmap {
        SubAssign::sub_assign(&mut self, &rhs);
        self
    }
}

impl Sub<&Bitmap> for Bitmap {
    type Output = Bitmap;

    /// A `difference` between two sets.
    fn sub(mut self, rhs: &Bitmap) -> Bitmap {
        SubAssign::sub_assign(&mut self, rhs);
        self
    }
}

impl Sub<Bitmap> for &Bitmap {
    type Output = Bitmap;

    /// A `difference` between two sets.
    fn sub(self, rhs: Bitmap) -> Bitmap {
        Sub::sub(self, &rhs)
    }
}

impl Sub<&Bitmap> for &Bitmap {
    type Output = Bitmap;

    /// A `difference` between two sets.
    fn sub(self, rhs: &Bitmap) -> Bitmap {
        let mut containers = Vec::new();

        for pair in Pairs::new(&self.containers, &rhs.containers) {
            match pair {
                (Some(lhs), None) => containers.push(lhs.clone()),
                (None, Some(_)) => (),
                (Some(lhs), Some(rhs)) => {
                    let container = Sub::sub(lhs, rhs);
                    if !container.is_empty() {
                        containers.push(container);
                    }
                }
                (None, None) => break,
            }
        }

        Bitmap::from_containers(containers)
    }
}

impl SubAssign<Bitmap> for Bitmap {
    /// A `difference` between two sets.
    fn sub_assign(&mut self, rhs: Bitmap) {
        SubAssign::sub_assign(self, &rhs)
    }
}

impl SubAssign<&Bitmap> for Bitmap {
    /// A `difference` between two sets.
    fn sub_assign(&mut self, rhs: &Bitmap) {
        self.containers.retain_mut(|cont| {
            match rhs.containers.binary_search_by_key(&cont.key, |c| c.key) {
                Ok(loc) => {
                    SubAssign::sub_assign(cont, &rhs.containers[loc]);
                    !cont.is_empty()
                }
                Err(_) => true,
            }
        })
    }
}

impl BitXor<Bitmap> for Bitmap {
    type Output = Bitmap;

    /// A `symmetric difference` between two sets.
    fn bitxor(mut self, rhs: Bitmap) -> Bitmap {
        BitXorAssign::bitxor_assign(&mut self, rhs);
        self
    }
}

impl BitXor<&Bitmap> for Bitmap {
    type Output = Bitmap;

    /// A `symmetric difference` between two sets.
    fn bitxor(mut self, rhs: &Bitmap) -> Bitmap {
        BitXorAssign::bitxor_assign(&mut self, rhs);
        self
    }
}

impl BitXor<Bitmap> for &Bitmap {
    type Output = Bitmap;

    /// A `symmetric difference` between two sets.
    fn bitxor(self, rhs: Bitmap) -> Bitmap {
        BitXor::bitxor(rhs, self)
    }
}

impl BitXor<&Bitmap> for &Bitmap {
    type Output = Bitmap;

    /// A `symmetric difference` between two sets.
    fn bitxor(self, rhs: &Bitmap) -> Bitmap {
        let mut containers = Vec::new();

        for pair in Pairs::new(&self.containers, &rhs.containers) {
            match pair {
                (Some(lhs), None) => containers.push(lhs.clone()),
                (None, Some(rhs)) => containers.push(rhs.clone()),
                (Some(lhs), Some(rhs)) => {
                    let container = BitXor::bitxor(lhs, rhs);
                    if !container.is_empty() {
                        containers.push(container);
                    }
                }
                (None, None) => break,
            }
        }

        Bitmap::from_containers(containers)
    }
}

impl BitXorAssign<Bitmap> for Bitmap {
    /// A `symmetric difference` between two sets.
    fn bitxor_assign(&mut self, rhs: Bitmap) {
        for pair in Pairs::new(mem::take(&mut self.containers), rhs.containers) {
            match pair {
                (Some(mut lhs), Some(rhs)) => {
                    BitXorAssign::bitxor_assign(&mut lhs, rhs);
                    if !lhs.is_empty() {
                        self.containers.push(lhs);
                    }
                }
                (Some(lhs), None) => self.containers.push(lhs),
                (None, Some(rhs)) => self.containers.push(rhs),
                (None, None) => break,
            }
        }
    }
}

impl BitXorAssign<&Bitmap> for Bitmap {
    /// A `symmetric difference` between two sets.
    fn bitxor_assign(&mut self, rhs: &Bitmap) {
        for pair in Pairs::new(mem::take(&mut self.containers), &rhs.containers) {
            match pair {
                (Some(mut lhs), Some(rhs)) => {
                    BitXorAssign::bitxor_assign(&mut lhs, rhs);
                    if !lhs.is_empty() {
                        self.containers.push(lhs);
                    }
                }
                (Some(lhs), None) => self.containers.push(lhs),
                (None, Some(rhs)) => self.containers.push(rhs.clone()),
                (None, None) => break,
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::Bitmap;
    use proptest::prelude::*;

    // fast count tests
    proptest! {
        #[test]
        fn union_len_eq_len_of_materialized_union(
            a in Bitmap::arbitrary(),
            b in Bitmap::arbitrary()
        ) {
            prop_assert_eq!(a.union_len(&b), (a | b).len());
        }

        #[test]
        fn intersection_len_eq_len_of_materialized_intersection(
            a in Bitmap::arbitrary(),
            b in Bitmap::arbitrary()
        ) {
            prop_assert_eq!(a.intersection_len(&b), (a & b).len());
        }

        #[test]
        fn difference_len_eq_len_of_materialized_difference(
            a in Bitmap::arbitrary(),
            b in Bitmap::arbitrary()
        ) {
            prop_assert_eq!(a.difference_len(&b), (a - b).len());
        }

        #[test]
        fn symmetric_difference_len_eq_len_of_materialized_symmetric_difference(
            a in Bitmap::arbitrary(),
            b in Bitmap::arbitrary()
        ) {
            prop_assert_eq!(a.symmetric_difference_len(&b), (a ^ b).len());
        }

        #[test]
        fn all_union_give_the_same_result(
            a in Bitmap::arbitrary(),
            b in Bitmap::arbitrary(),
            c in Bitmap::arbitrary()
        ) {
            let mut ref_assign = a.clone();
            ref_assign |= &b;
            ref_assign |= &c;

            let mut own_assign = a.clone();
            own_assign |= b.clone();
            own_assign |= c.clone();

            let ref_inline = &a | &b | &c;
            let own_inline = a | b | c;

            for roar in &[own_assign, ref_inline, own_inline] {
                prop_assert_eq!(&ref_assign, roar);
            }
        }

        #[test]
        fn all_intersection_give_the_same_result(
            a in Bitmap::arbitrary(),
            b in Bitmap::arbitrary(),
            c in Bitmap::arbitrary()
        ) {
            let mut ref_assign = a.clone();
            ref_assign &= &b;
            ref_assign &= &c;

            let mut own_assign = a.clone();
            own_assign &= b.clone();
            own_assign &= c.clone();

            let ref_inline = &a & &b & &c;
            let own_inline = a & b & c;

            for roar in &[own_assign, ref_inline, own_inline] {
                prop_assert_eq!(&ref_assign, roar);
            }
        }

        #[test]
        fn all_difference_give_the_same_result(
            a in Bitmap::arbitrary(),
            b in Bitmap::arbitrary(),
            c in Bitmap::arbitrary()
        ) {
            let mut ref_assign = a.clone();
            ref_assign -= &b;
            ref_assign -= &c;

            let mut own_assign = a.clone();
            own_assign -= b.clone();
            own_assign -= c.clone();

            let ref_inline = &a - &b - &c;
            let own_inline = a - b - c;

            for roar in &[own_assign, ref_inline, own_inline] {
                prop_assert_eq!(&ref_assign, roar);
            }
        }

        #[test]
        fn all_symmetric_difference_give_the_same_result(
            a in Bitmap::arbitrary(),
            b in Bitmap::arbitrary(),
            c in Bitmap::arbitrary()
        ) {
            let mut ref_assign = a.clone();
            ref_assign ^= &b;
            ref_assign ^= &c;

            let mut own_assign = a.clone();
            own_assign ^= b.clone();
            own_assign ^= c.clone();

            let ref_inline = &a ^ &b ^ &c;
            let own_inline = a ^ b ^ c;

            for roar in &[own_assign, ref_inline, own_inline] {
                prop_assert_eq!(&ref_assign, roar);
            }
        }
    }
}
