//! Chunked compressed bitsets for `u32` and `u64` keys.
//!
//! A [`Bitmap`] stores a set of `u32` values as a sorted sequence of 2^16
//! wide chunks, each chunk picking whichever of three layouts (sorted array,
//! dense bitset, run list) is smallest for its contents. A [`Bitmap64`]
//! extends the same chunks to `u64` keys through an adaptive radix trie over
//! the 48 high bits.
//!
//! Both types serialize to the portable
//! [Roaring format](https://github.com/RoaringBitmap/RoaringFormatSpec) and
//! round-trip against the other mainstream implementations.
//!
//! # Examples
//!
//! ```rust
//! use riptide::Bitmap;
//!
//! let mut rb = Bitmap::new();
//!
//! // insert all primes less than 10
//! rb.insert(2);
//! rb.insert(3);
//! rb.insert(5);
//! rb.insert(7);
//! println!("total bits set to true: {}", rb.len());
//! ```

mod bitmap;
mod bitmap64;
#[cfg(feature = "serde")]
mod serde_support;

pub use bitmap::{Bitmap, IntoIter, Iter, Statistics};
pub use bitmap64::{
    Bitmap64, BulkContext, IntoIter as IntoIter64, Iter as Iter64,
};

use core::fmt;

/// An error type that is returned when an iterator isn't sorted.
#[derive(Debug, PartialEq, Eq)]
pub struct NonSortedIntegers {
    valid_until: u64,
}

impl NonSortedIntegers {
    /// Returns the number of elements that were consumed before the
    /// out-of-order element was found.
    pub fn valid_until(&self) -> u64 {
        self.valid_until
    }
}

impl fmt::Display for NonSortedIntegers {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "integers are ordered up to the {}th element", self.valid_until())
    }
}

impl std::error::Error for NonSortedIntegers {}
