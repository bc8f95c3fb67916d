pub(crate) mod container;
mod fmt;
pub(crate) mod store;
pub(crate) mod util;

// Order of these modules matters as it determines the `impl` blocks order in
// the docs
mod cmp;
mod inherent;
mod iter;
mod lazy;
mod ops;
#[cfg(feature = "serde")]
mod serde;
pub(crate) mod serialization;
mod statistics;

use self::cmp::Pairs;
pub use self::iter::IntoIter;
pub use self::iter::Iter;
pub use self::statistics::Statistics;

pub(crate) use self::container::Container;

/// A compressed bitmap for `u32` values.
///
/// # Examples
///
/// ```rust
/// use riptide::Bitmap;
///
/// let mut rb = Bitmap::new();
///
/// // insert all primes less than 10
/// rb.insert(2);
/// rb.insert(3);
/// rb.insert(5);
/// rb.insert(7);
/// println!("total bits set to true: {}", rb.len());
/// ```
pub struct Bitmap {
    containers: Vec<container::Container>,
    copy_on_write: bool,
}
