use riptide::Bitmap;

#[test]
fn iterates_all_layouts_in_order() {
    let mut bitmap = Bitmap::new();
    // array chunk
    bitmap.extend([5, 10, 20]);
    // bitset chunk
    bitmap.insert_range(0x10000..0x12000);
    // run chunk
    bitmap.insert_range(0x20000..0x20100);
    bitmap.run_optimize();

    let values: Vec<u32> = bitmap.iter().collect();
    assert_eq!(values.len() as u64, bitmap.len());
    assert!(values.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(values[0], 5);
    assert_eq!(*values.last().unwrap(), 0x200FF);

    let mut reversed: Vec<u32> = bitmap.iter().rev().collect();
    reversed.reverse();
    assert_eq!(values, reversed);
}

#[test]
fn advance_to_lands_on_lower_bound() {
    let bitmap = Bitmap::from([10, 20, 30, 0x10000, 0x10005]);

    let mut iter = bitmap.iter();
    iter.advance_to(15);
    assert_eq!(iter.next(), Some(20));

    let mut iter = bitmap.iter();
    iter.advance_to(30);
    assert_eq!(iter.next(), Some(30));

    let mut iter = bitmap.iter();
    iter.advance_to(0x10006);
    assert_eq!(iter.next(), None);

    let mut iter = bitmap.into_iter();
    iter.advance_to(0x9999);
    assert_eq!(iter.next(), Some(0x10000));
}

#[test]
fn advance_back_to_lands_on_upper_bound() {
    let bitmap = Bitmap::from([10, 20, 30, 0x10000, 0x10005]);

    let mut iter = bitmap.iter();
    iter.advance_back_to(0x10004);
    assert_eq!(iter.next_back(), Some(0x10000));
    assert_eq!(iter.next_back(), Some(30));

    let mut iter = bitmap.iter();
    iter.advance_back_to(9);
    assert_eq!(iter.next_back(), None);
}

#[test]
fn range_views() {
    let bitmap = Bitmap::from([0, 1, 2, 3, 4, 5, 10, 11, 12, 20, 21, u32::MAX]);

    assert_eq!(bitmap.range(10..20).collect::<Vec<u32>>(), vec![10, 11, 12]);
    assert_eq!(bitmap.range(100..).collect::<Vec<u32>>(), vec![u32::MAX]);
    assert_eq!(bitmap.range(3..=11).collect::<Vec<u32>>(), vec![3, 4, 5, 10, 11]);
    assert_eq!(bitmap.clone().into_range(3..=11).collect::<Vec<u32>>(), vec![3, 4, 5, 10, 11]);
    assert!(bitmap.range(6..10).next().is_none());
}

#[test]
fn next_many_fills_buffers() {
    let mut bitmap = Bitmap::new();
    bitmap.insert_range(0..100_000);

    let mut iter = bitmap.iter();
    let mut buf = vec![0u32; 30_000];
    assert_eq!(iter.next_many(&mut buf), 30_000);
    assert_eq!(buf[0], 0);
    assert_eq!(buf[29_999], 29_999);
    assert_eq!(iter.next_many(&mut buf), 30_000);
    assert_eq!(iter.next_many(&mut buf), 30_000);
    assert_eq!(iter.next_many(&mut buf), 10_000);
    assert_eq!(buf[9_999], 99_999);
    assert_eq!(iter.next_many(&mut buf), 0);
}

#[test]
fn from_sorted_iter_and_append() {
    let bitmap = Bitmap::from_sorted_iter(0..1000).unwrap();
    assert_eq!(bitmap.len(), 1000);

    let mut bitmap = Bitmap::from_sorted_iter([1, 5, 10]).unwrap();
    assert_eq!(bitmap.append([11, 12, 13]), Ok(3));
    let err = bitmap.append([100, 50]).unwrap_err();
    assert_eq!(err.valid_until(), 1);
    assert!(bitmap.contains(100));
    assert!(!bitmap.contains(50));

    assert!(Bitmap::from_sorted_iter([3, 2, 1]).is_err());
}

#[test]
fn size_hints_are_exact() {
    let mut bitmap = Bitmap::new();
    bitmap.insert_range(0..10_000);
    bitmap.insert(1 << 20);
    bitmap.run_optimize();

    let mut iter = bitmap.iter();
    assert_eq!(iter.size_hint(), (10_001, Some(10_001)));
    iter.next();
    assert_eq!(iter.size_hint(), (10_000, Some(10_000)));
    assert_eq!(iter.count(), 10_000);
}
