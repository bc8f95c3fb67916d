use crate::bitmap::store::Store;
use crate::Bitmap;

/// Detailed statistics on the composition of a bitmap.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
#[non_exhaustive]
pub struct Statistics {
    /// Number of containers in the bitmap
    pub n_containers: u32,
    /// Number of array containers in the bitmap
    pub n_array_containers: u32,
    /// Number of run containers in the bitmap
    pub n_run_containers: u32,
    /// Number of bitset containers in the bitmap
    pub n_bitset_containers: u32,
    /// Number of values stored in array containers
    pub n_values_array_containers: u64,
    /// Number of values stored in run containers
    pub n_values_run_containers: u64,
    /// Number of values stored in bitset containers
    pub n_values_bitset_containers: u64,
    /// Number of bytes used by array containers
    pub n_bytes_array_containers: u64,
    /// Number of bytes used by run containers
    pub n_bytes_run_containers: u64,
    /// Number of bytes used by bitset containers
    pub n_bytes_bitset_containers: u64,
    /// Maximum value stored in the bitmap
    pub max_value: Option<u32>,
    /// Minimum value stored in the bitmap
    pub min_value: Option<u32>,
    /// Number of values stored in the bitmap
    pub cardinality: u64,
}

impl Bitmap {
    /// Returns statistics about the composition of the bitmap.
    ///
    /// ```
    /// use riptide::Bitmap;
    ///
    /// let bitmap: Bitmap = (1..100).collect();
    /// let statistics = bitmap.statistics();
    ///
    /// assert_eq!(statistics.n_containers, 1);
    /// assert_eq!(statistics.n_array_containers, 1);
    /// assert_eq!(statistics.n_run_containers, 0);
    /// assert_eq!(statistics.n_bitset_containers, 0);
    /// assert_eq!(statistics.n_values_array_containers, 99);
    /// assert_eq!(statistics.n_bytes_array_containers, 198);
    /// assert_eq!(statistics.max_value, Some(99));
    /// assert_eq!(statistics.min_value, Some(1));
    /// assert_eq!(statistics.cardinality, 99);
    /// ```
    pub fn statistics(&self) -> Statistics {
        let mut stats = Statistics::default();

        for container in &self.containers {
            stats.n_containers += 1;
            match container.store() {
                Store::Array(array) => {
                    stats.n_array_containers += 1;
                    stats.n_values_array_containers += array.len();
                    stats.n_bytes_array_containers += array.byte_size() as u64;
                    stats.cardinality += array.len();
                }
                Store::Bitmap(bits) => {
                    stats.n_bitset_containers += 1;
                    stats.n_values_bitset_containers += bits.len();
                    stats.n_bytes_bitset_containers += (bits.capacity() / 8) as u64;
                    stats.cardinality += bits.len();
                }
                Store::Run(runs) => {
                    stats.n_run_containers += 1;
                    stats.n_values_run_containers += runs.len();
                    stats.n_bytes_run_containers += runs.byte_size() as u64;
                    stats.cardinality += runs.len();
                }
            }
        }

        stats.min_value = self.min();
        stats.max_value = self.max();
        stats
    }
}
