//! An order-`m` B+ tree index with unique keys, borrow/merge rebalancing,
//! and range scans over a linked chain of leaves.
//!
//! ```
//! use bptree::BPlusTree;
//!
//! let mut tree = BPlusTree::new(4)?;
//! for (key, value) in [(10, "a"), (20, "b"), (5, "c"), (6, "d")] {
//!     tree.insert(key, value)?;
//! }
//!
//! assert_eq!(tree.search(&6), Some(&"d"));
//! let keys: Vec<_> = tree.range(&6, &20).map(|e| *e.key()).collect();
//! assert_eq!(keys, vec![6, 10]);
//!
//! tree.delete(&6)?;
//! assert_eq!(tree.search(&6), None);
//! # Ok::<(), bptree::BPlusTreeError<i32>>(())
//! ```

pub mod btree;
pub mod shell;

pub use btree::{
    BPlusNode, BPlusTree, BPlusTreeError, BPlusTreeResult, DEFAULT_ORDER, Entry, Iter,
    NodeSnapshot, Range,
};
