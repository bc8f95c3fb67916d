use riptide::Bitmap;

#[test]
fn smoke() {
    let mut bitmap = Bitmap::new();
    assert_eq!(bitmap.len(), 0);
    assert!(bitmap.is_empty());
    bitmap.remove(0);
    assert_eq!(bitmap.len(), 0);
    assert!(bitmap.is_empty());
    bitmap.insert(1);
    assert!(bitmap.contains(1));
    assert_eq!(bitmap.len(), 1);
    assert!(!bitmap.is_empty());
    bitmap.insert(u32::MAX - 2);
    assert!(bitmap.contains(u32::MAX - 2));
    assert_eq!(bitmap.len(), 2);
    bitmap.insert(u32::MAX);
    assert!(bitmap.contains(u32::MAX));
    assert_eq!(bitmap.len(), 3);
    bitmap.insert(2);
    assert!(bitmap.contains(2));
    assert_eq!(bitmap.len(), 4);
    bitmap.remove(2);
    assert!(!bitmap.contains(2));
    assert_eq!(bitmap.len(), 3);
    assert!(!bitmap.contains(0));
    assert!(bitmap.contains(1));
    assert!(!bitmap.contains(100));
    assert!(bitmap.contains(u32::MAX - 2));
    assert!(!bitmap.contains(u32::MAX - 1));
    assert!(bitmap.contains(u32::MAX));
}

#[test]
fn empty_bitmap_round_trips_through_bytes() {
    let bitmap = Bitmap::new();
    assert!(bitmap.is_empty());
    assert_eq!(bitmap.len(), 0);

    let mut bytes = Vec::new();
    bitmap.serialize_into(&mut bytes).unwrap();
    // Just the cookie and a zero container count.
    assert_eq!(bytes.len(), 8);
    assert_eq!(bytes.len(), bitmap.serialized_size());

    let back = Bitmap::deserialize_from(bytes.as_slice()).unwrap();
    assert_eq!(back, bitmap);
    assert!(back.is_empty());
}

#[test]
fn dense_range_compresses_to_runs() {
    let mut bitmap = Bitmap::from_range_step(0..100_000, 1);
    assert_eq!(bitmap.len(), 100_000);
    assert!(bitmap.contains(50_000));
    assert!(!bitmap.contains(100_000));

    assert!(bitmap.run_optimize());
    assert_eq!(bitmap.len(), 100_000);

    let stats = bitmap.statistics();
    assert_eq!(stats.n_containers, 2);
    assert_eq!(stats.n_run_containers, 2);

    // Two single-run containers: header, descriptors and a 6-byte run
    // payload each.
    let mut bytes = Vec::new();
    bitmap.serialize_into(&mut bytes).unwrap();
    assert_eq!(bytes.len(), bitmap.serialized_size());
    assert!(bytes.len() < 40);

    let back = Bitmap::deserialize_from(bytes.as_slice()).unwrap();
    assert_eq!(back, bitmap);
}

#[test]
fn concrete_set_algebra() {
    let a = Bitmap::from([1, 2, 3, 100, 1000, 10_000, 1_000_000, 20_000_000]);
    let b = Bitmap::from([1000, 2000, 10_000]);

    assert_eq!(&a & &b, Bitmap::from([1000, 10_000]));
    assert_eq!(&a | &b, Bitmap::from([1, 2, 3, 100, 1000, 2000, 10_000, 1_000_000, 20_000_000]));
    assert_eq!(&a - &b, Bitmap::from([1, 2, 3, 100, 1_000_000, 20_000_000]));
    assert_eq!(&a ^ &b, Bitmap::from([1, 2, 3, 100, 2000, 1_000_000, 20_000_000]));
    assert_eq!(&a ^ &b, &(&a - &b) | &(&b - &a));

    assert_eq!(a.intersection_len(&b), 2);
    assert_eq!(a.union_len(&b), 9);
    assert_eq!(a.difference_len(&b), 6);
    assert_eq!(a.symmetric_difference_len(&b), 7);
    assert_eq!(a.jaccard_index(&b), 2.0 / 9.0);
}

#[test]
fn stepped_range_rank_select() {
    // values 0, 3, 6, ..., 999
    let bitmap = Bitmap::from_range_step(0..1000, 3);
    assert_eq!(bitmap.len(), 334);
    assert_eq!(bitmap.select(100), Some(300));
    assert_eq!(bitmap.rank(299), 100);
    assert_eq!(bitmap.rank(300), 101);
    assert_eq!(bitmap.position(300), Some(100));
    assert_eq!(bitmap.position(301), None);
}

#[test]
fn min_max() {
    let mut bitmap = Bitmap::new();
    assert_eq!(bitmap.min(), None);
    assert_eq!(bitmap.max(), None);
    bitmap.insert(5);
    bitmap.insert(1_000_000);
    assert_eq!(bitmap.min(), Some(5));
    assert_eq!(bitmap.max(), Some(1_000_000));
}

#[test]
fn clone_is_deep() {
    let original = Bitmap::from([1, 2, 3, 100_000]);
    let mut copy = original.clone();
    assert_eq!(original, copy);
    copy.insert(4);
    assert_ne!(original, copy);
    assert!(!original.contains(4));
}

#[test]
fn is_full_and_flip() {
    let mut bitmap = Bitmap::new();
    assert!(!bitmap.is_full());
    bitmap.flip_range(..);
    assert!(bitmap.is_full());
    assert_eq!(bitmap.len(), 1 << 32);
    assert_eq!(bitmap.rank(u32::MAX), 1 << 32);
    bitmap.flip_range(..);
    assert!(bitmap.is_empty());
}

#[test]
fn contains_range_and_cardinality() {
    let mut bitmap = Bitmap::new();
    bitmap.insert_range(100..=200_000);
    assert!(bitmap.contains_range(100..=200_000));
    assert!(bitmap.contains_range(150_000..=160_000));
    assert!(!bitmap.contains_range(99..=100));
    assert_eq!(bitmap.range_cardinality(0..=99), 0);
    assert_eq!(bitmap.range_cardinality(100..=200_000), 199_901);
    assert_eq!(bitmap.range_cardinality(..), bitmap.len());
}

#[test]
fn shrink_to_fit_preserves_contents() {
    let mut bitmap = Bitmap::new();
    for i in 0..10_000 {
        bitmap.insert(i * 7);
    }
    let before = bitmap.clone();
    bitmap.shrink_to_fit();
    assert_eq!(bitmap, before);
    bitmap.internal_validate().unwrap();
}
