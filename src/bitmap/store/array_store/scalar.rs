//! Scalar binary set operations on sorted `u16` slices.

use core::cmp::Ordering::*;

use super::visitor::BinaryOperationVisitor;

/// Size ratio above which intersection switches from a linear merge to a
/// galloping walk over the larger side.
const GALLOP_THRESHOLD: usize = 64;

#[inline]
pub fn or(lhs: &[u16], rhs: &[u16], visitor: &mut impl BinaryOperationVisitor) {
    let mut i = 0;
    let mut j = 0;
    while i < lhs.len() && j < rhs.len() {
        let a = lhs[i];
        let b = rhs[j];
        match a.cmp(&b) {
            Less => {
                visitor.visit_scalar(a);
                i += 1;
            }
            Greater => {
                visitor.visit_scalar(b);
                j += 1;
            }
            Equal => {
                visitor.visit_scalar(a);
                i += 1;
                j += 1;
            }
        }
    }

    // Store remaining elements of the arrays
    visitor.visit_slice(&lhs[i..]);
    visitor.visit_slice(&rhs[j..]);
}

#[inline]
pub fn and(lhs: &[u16], rhs: &[u16], visitor: &mut impl BinaryOperationVisitor) {
    // A very skewed pair is joined faster by probing the large side than by
    // walking it.
    if lhs.len() * GALLOP_THRESHOLD < rhs.len() {
        and_gallop(lhs, rhs, visitor);
        return;
    }
    if rhs.len() * GALLOP_THRESHOLD < lhs.len() {
        and_gallop(rhs, lhs, visitor);
        return;
    }

    let mut i = 0;
    let mut j = 0;
    while i < lhs.len() && j < rhs.len() {
        let a = lhs[i];
        let b = rhs[j];
        match a.cmp(&b) {
            Less => i += 1,
            Greater => j += 1,
            Equal => {
                visitor.visit_scalar(a);
                i += 1;
                j += 1;
            }
        }
    }
}

/// Intersects a small sorted slice against a much larger one by advancing
/// through the large side with doubling probes followed by a binary search.
fn and_gallop(small: &[u16], mut large: &[u16], visitor: &mut impl BinaryOperationVisitor) {
    for &value in small {
        let skip = gallop(large, value);
        large = &large[skip..];
        match large.first() {
            Some(&first) if first == value => visitor.visit_scalar(value),
            Some(_) => {}
            None => break,
        }
    }
}

/// Number of leading elements of `slice` strictly less than `value`, found
/// with an exponential probe then a binary search of the bracketed window.
fn gallop(slice: &[u16], value: u16) -> usize {
    let mut hi = 1;
    while hi < slice.len() && slice[hi] < value {
        hi *= 2;
    }
    let lo = hi / 2;
    let hi = hi.min(slice.len());
    lo + slice[lo..hi].partition_point(|&x| x < value)
}

#[inline]
pub fn sub(lhs: &[u16], rhs: &[u16], visitor: &mut impl BinaryOperationVisitor) {
    let mut i = 0;
    let mut j = 0;
    while i < lhs.len() && j < rhs.len() {
        let a = lhs[i];
        let b = rhs[j];
        match a.cmp(&b) {
            Less => {
                visitor.visit_scalar(a);
                i += 1;
            }
            Greater => j += 1,
            Equal => {
                i += 1;
                j += 1;
            }
        }
    }

    // Store remaining elements of the left array
    visitor.visit_slice(&lhs[i..]);
}

#[inline]
pub fn xor(lhs: &[u16], rhs: &[u16], visitor: &mut impl BinaryOperationVisitor) {
    let mut i = 0;
    let mut j = 0;
    while i < lhs.len() && j < rhs.len() {
        let a = lhs[i];
        let b = rhs[j];
        match a.cmp(&b) {
            Less => {
                visitor.visit_scalar(a);
                i += 1;
            }
            Greater => {
                visitor.visit_scalar(b);
                j += 1;
            }
            Equal => {
                i += 1;
                j += 1;
            }
        }
    }

    // Store remaining elements of the arrays
    visitor.visit_slice(&lhs[i..]);
    visitor.visit_slice(&rhs[j..]);
}
