//! Selection basket tests.
mod common;
use common::row;
use erabu::basket::SelectionBasket;

#[test]
fn test_toggle_is_its_own_inverse() {
    let mut basket = SelectionBasket::new();
    basket.toggle(row("T1", "Blue Moon"));
    let snapshot: Vec<_> = basket.entries().to_vec();

    assert!(basket.toggle(row("T2", "Harvest")));
    assert!(!basket.toggle(row("T2", "Harvest")));
    assert_eq!(basket.entries(), snapshot.as_slice());
}

#[test]
fn test_ranks_are_contiguous_and_one_based() {
    let mut basket = SelectionBasket::new();
    for (id, name) in [("T1", "a"), ("T2", "b"), ("T3", "c")] {
        basket.toggle(row(id, name));
    }
    let ranks: Vec<usize> = basket.entries().iter().map(|e| e.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);

    // Removing from the middle renumbers without gaps.
    basket.toggle(row("T2", "b"));
    let ranks: Vec<usize> = basket.entries().iter().map(|e| e.rank).collect();
    assert_eq!(ranks, vec![1, 2]);
}

#[test]
fn test_reorder_preserves_membership_and_renumbers() {
    let mut basket = SelectionBasket::new();
    for (id, name) in [("T1", "a"), ("T2", "b"), ("T3", "c"), ("T4", "d")] {
        basket.toggle(row(id, name));
    }

    basket.reorder(0, 2);
    let order: Vec<&str> = basket.entries().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(order, vec!["T2", "T3", "T1", "T4"]);
    let ranks: Vec<usize> = basket.entries().iter().map(|e| e.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3, 4]);

    // The moved entry keeps its identity.
    assert_eq!(basket.entries()[2].row.name, "a");
    assert_eq!(basket.len(), 4);

    // Out-of-range reorders are no-ops.
    basket.reorder(0, 9);
    assert_eq!(basket.len(), 4);
    let order: Vec<&str> = basket.entries().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(order, vec!["T2", "T3", "T1", "T4"]);
}

#[test]
fn test_remove_many() {
    let mut basket = SelectionBasket::new();
    for (id, name) in [("T1", "a"), ("T2", "b"), ("T3", "c")] {
        basket.toggle(row(id, name));
    }
    basket.remove_many(["T1", "T3", "T9"]);
    assert_eq!(basket.len(), 1);
    assert_eq!(basket.entries()[0].id, "T2");
    assert_eq!(basket.entries()[0].rank, 1);
}

#[test]
fn test_clear_and_into_rows() {
    let mut basket = SelectionBasket::new();
    basket.toggle(row("T1", "a"));
    basket.toggle(row("T2", "b"));

    let names: Vec<String> = basket.clone().into_rows().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["a", "b"]);

    basket.clear();
    assert!(basket.is_empty());
}
