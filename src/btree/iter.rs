//! Leaf-chain iterators
//!
//! Both iterators walk the `next` links between leaves and never re-descend
//! the tree. They hold a shared borrow of the tree for their whole lifetime.

use std::iter::FusedIterator;

use super::{BPlusTree, Entry, NodeId};

/// Position in the leaf chain
struct LeafCursor<'a, K, V> {
    tree: &'a BPlusTree<K, V>,
    current_leaf: Option<NodeId>,
    current_idx: usize,
}

impl<'a, K: Ord + Clone, V> LeafCursor<'a, K, V> {
    fn next_entry(&mut self) -> Option<&'a Entry<K, V>> {
        let tree = self.tree;

        loop {
            let leaf_id = self.current_leaf?;
            let leaf = tree.get_node(leaf_id)?.as_leaf()?;

            if let Some(entry) = leaf.entries.get(self.current_idx) {
                self.current_idx += 1;
                return Some(entry);
            }

            // Move to next leaf
            self.current_leaf = leaf.next;
            self.current_idx = 0;
        }
    }
}

/// Iterator over all B+ tree entries in key order
pub struct Iter<'a, K, V> {
    cursor: LeafCursor<'a, K, V>,
    remaining: usize,
}

impl<'a, K: Ord + Clone, V> Iter<'a, K, V> {
    pub(super) fn new(tree: &'a BPlusTree<K, V>, first_leaf: NodeId) -> Self {
        Self {
            cursor: LeafCursor {
                tree,
                current_leaf: Some(first_leaf),
                current_idx: 0,
            },
            remaining: tree.len(),
        }
    }
}

impl<'a, K: Ord + Clone, V> Iterator for Iter<'a, K, V> {
    type Item = &'a Entry<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.cursor.next_entry()?;
        self.remaining = self.remaining.saturating_sub(1);
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Ord + Clone, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K: Ord + Clone, V> FusedIterator for Iter<'_, K, V> {}

/// Lazy iterator over the entries of a half-open key range
///
/// Stops at the first key >= the upper bound or at the end of the chain.
pub struct Range<'a, K, V> {
    cursor: LeafCursor<'a, K, V>,
    high: K,
}

impl<'a, K: Ord + Clone, V> Range<'a, K, V> {
    pub(super) fn new(tree: &'a BPlusTree<K, V>, leaf: NodeId, idx: usize, high: K) -> Self {
        Self {
            cursor: LeafCursor {
                tree,
                current_leaf: Some(leaf),
                current_idx: idx,
            },
            high,
        }
    }

    pub(super) fn empty(tree: &'a BPlusTree<K, V>, high: K) -> Self {
        Self {
            cursor: LeafCursor {
                tree,
                current_leaf: None,
                current_idx: 0,
            },
            high,
        }
    }
}

impl<'a, K: Ord + Clone, V> Iterator for Range<'a, K, V> {
    type Item = &'a Entry<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.cursor.next_entry()?;

        if entry.key() >= &self.high {
            self.cursor.current_leaf = None;
            return None;
        }

        Some(entry)
    }
}

impl<K: Ord + Clone, V> FusedIterator for Range<'_, K, V> {}
