//! End-to-end scenarios against the public tree API.

use bptree::{BPlusTree, BPlusTreeError};

fn chain(tree: &BPlusTree<i64, String>) -> Vec<i64> {
    tree.iter().map(|e| *e.key()).collect()
}

fn build(order: usize, keys: &[i64]) -> BPlusTree<i64, String> {
    let mut tree = BPlusTree::new(order).unwrap();
    for &k in keys {
        tree.insert(k, format!("v{k}")).unwrap();
    }
    tree
}

/// Order 4: mixed-order inserts, a range scan, then deletes.
#[test]
fn test_order_four_walkthrough() {
    let mut tree = build(4, &[10, 20, 5, 6, 12, 30, 7, 17]);

    assert_eq!(chain(&tree), vec![5, 6, 7, 10, 12, 17, 20, 30]);
    let range: Vec<_> = tree.range(&7, &20).map(|e| *e.key()).collect();
    assert_eq!(range, vec![7, 10, 12, 17]);

    tree.delete(&6).unwrap();
    tree.delete(&20).unwrap();

    assert_eq!(chain(&tree), vec![5, 7, 10, 12, 17, 30]);
    tree.validate().unwrap();

    // Every non-root node holds at least one key for order 4
    for level in tree.keys_by_level().iter().skip(1) {
        assert!(level.iter().all(|node| !node.keys.is_empty() && node.keys.len() <= 3));
    }
}

#[test]
fn test_order_below_three_is_rejected() {
    let result = BPlusTree::<i64, String>::new(2);
    assert_eq!(result.unwrap_err(), BPlusTreeError::InvalidOrder(2));
}

#[test]
fn test_round_trips() {
    let mut tree = BPlusTree::new(3).unwrap();

    tree.insert(42, "x".to_string()).unwrap();
    assert_eq!(tree.search(&42).map(String::as_str), Some("x"));

    assert_eq!(tree.delete(&42).unwrap(), "x");
    assert_eq!(tree.search(&42), None);

    // The key can be inserted again with a new value
    tree.insert(42, "y".to_string()).unwrap();
    assert_eq!(tree.search(&42).map(String::as_str), Some("y"));
}

#[test]
fn test_failed_operations_do_not_mutate() {
    let mut tree = build(3, &(0..30).collect::<Vec<_>>());
    let levels = tree.keys_by_level();
    let nodes = tree.node_count();

    assert_eq!(tree.delete(&100), Err(BPlusTreeError::KeyNotFound(100)));
    assert_eq!(
        tree.insert(15, "dup".to_string()),
        Err(BPlusTreeError::DuplicateKey(15))
    );

    assert_eq!(tree.keys_by_level(), levels);
    assert_eq!(tree.node_count(), nodes);
    assert_eq!(tree.len(), 30);
    assert_eq!(tree.search(&15).map(String::as_str), Some("v15"));
}

#[test]
fn test_depth_changes_by_one_level_at_a_time() {
    let mut tree = BPlusTree::new(3).unwrap();
    let mut height = tree.height();

    for k in 0..200 {
        tree.insert(k, k).unwrap();
        let now = tree.height();
        assert!(now == height || now == height + 1);
        height = now;
    }

    for k in 0..200 {
        tree.delete(&k).unwrap();
        let now = tree.height();
        assert!(now == height || now + 1 == height);
        height = now;
    }

    assert_eq!(height, 1);
    assert!(tree.is_empty());
}

#[test]
fn test_interleaved_workload_keeps_invariants() {
    for order in 3..=7 {
        let mut tree = BPlusTree::new(order).unwrap();

        // A fixed permutation of 0..97 (97 is prime)
        let keys: Vec<i64> = (0..97).map(|i| (i * 31) % 97).collect();
        for &k in &keys {
            tree.insert(k, k * 2).unwrap();
        }
        tree.validate().unwrap();

        for &k in keys.iter().filter(|&&k| k % 3 != 0) {
            tree.delete(&k).unwrap();
            tree.validate().unwrap();
        }

        let expected: Vec<i64> = (0..97).filter(|k| k % 3 == 0).collect();
        let actual: Vec<i64> = tree.iter().map(|e| *e.key()).collect();
        assert_eq!(actual, expected, "order {order}");
        assert_eq!(tree.search(&30), Some(&60));
        assert_eq!(tree.search(&31), None);
    }
}
