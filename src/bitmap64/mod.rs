mod art;
mod fmt;
mod util;

// Order of these modules matters as it determines the `impl` blocks order in
// the docs
mod cmp;
mod inherent;
mod iter;
mod ops;
#[cfg(feature = "serde")]
mod serde;
mod serialization;

pub use self::inherent::BulkContext;
pub use self::iter::{IntoIter, Iter};

use self::art::Art;
use crate::bitmap::Container;

/// A compressed bitmap for `u64` values.
///
/// The high 48 bits of a value select a chunk through an adaptive radix
/// trie; the low 16 bits land in the same chunk layouts a [`crate::Bitmap`]
/// uses.
///
/// # Examples
///
/// ```rust
/// use riptide::Bitmap64;
///
/// let mut rb = Bitmap64::new();
///
/// rb.insert(7);
/// rb.insert(u64::MAX);
/// assert_eq!(rb.len(), 2);
/// ```
pub struct Bitmap64 {
    art: Art<Container>,
    // Identity and structural stamp validating cached bulk contexts.
    id: u64,
    version: u64,
}
