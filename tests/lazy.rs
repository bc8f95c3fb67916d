use riptide::Bitmap;

#[test]
fn lazy_union_of_many_parts() {
    // Accumulate many chunks the way a query engine folds posting lists.
    let parts: Vec<Bitmap> = (0..50)
        .map(|i| {
            let mut part = Bitmap::new();
            part.insert_range(i * 1000..(i + 2) * 1000);
            part.insert(i * 1_000_000);
            part
        })
        .collect();

    let mut lazy = Bitmap::new();
    for part in &parts {
        lazy.lazy_bitor_assign(part);
    }
    lazy.repair_after_lazy();

    let mut eager = Bitmap::new();
    for part in &parts {
        eager |= part;
    }

    assert_eq!(lazy, eager);
    assert_eq!(lazy.len(), eager.len());
    lazy.internal_validate().unwrap();
}

#[test]
fn lazy_xor_of_many_parts() {
    let parts: Vec<Bitmap> = (0..20)
        .map(|i| {
            let mut part = Bitmap::new();
            part.insert_range(i * 500..(i * 500) + 20_000);
            part
        })
        .collect();

    let mut lazy = Bitmap::new();
    for part in &parts {
        lazy.lazy_bitxor_assign(part);
    }
    lazy.repair_after_lazy();

    let mut eager = Bitmap::new();
    for part in &parts {
        eager ^= part;
    }

    assert_eq!(lazy, eager);
    lazy.internal_validate().unwrap();
}

#[test]
fn queries_stay_correct_between_lazy_and_repair() {
    let a = Bitmap::from_range_step(0..100_000, 2);
    let b = Bitmap::from_range_step(1..100_000, 2);

    let mut lazy = a.clone();
    lazy.lazy_bitor_assign(&b);

    // The cardinality cache may be cold, but membership and counting still
    // answer correctly before repair.
    assert!(lazy.contains(0));
    assert!(lazy.contains(1));
    assert_eq!(lazy.len(), 100_000);

    lazy.repair_after_lazy();
    assert_eq!(lazy.len(), 100_000);
    assert_eq!(lazy, &a | &b);
}

#[test]
fn repair_drops_cancelled_chunks() {
    let a = Bitmap::from_range_step(0..200_000, 1);
    let mut lazy = a.clone();
    lazy.lazy_bitxor_assign(&a);
    lazy.repair_after_lazy();
    assert!(lazy.is_empty());
    assert_eq!(lazy, Bitmap::new());
}

#[test]
fn repair_restores_compact_layouts() {
    // The lazy union of two small arrays over the threshold leaves a
    // bitmap layout behind; repair must pack the result back down when the
    // cardinality allows.
    let a: Bitmap = (0..3000).map(|i| i * 2).collect();
    let b: Bitmap = (0..3000).map(|i| i * 2).collect();

    let mut lazy = a.clone();
    lazy.lazy_bitor_assign(&b);
    lazy.repair_after_lazy();

    assert_eq!(lazy, a);
    assert_eq!(lazy.statistics().n_array_containers, 1);
    assert_eq!(lazy.statistics().n_bitset_containers, 0);
}
