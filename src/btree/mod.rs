//! B+ Tree implementation for ordered indexing
//!
//! This module provides an order-`m` B+ tree. It supports:
//! - Unique keys of any totally ordered type
//! - Point lookups and half-open range scans (via linked leaf nodes)
//! - Deletion with borrow/merge rebalancing
//!
//! Nodes live in an arena and are addressed by `NodeId`. There are no parent
//! pointers: insert and delete record the root-to-leaf path while descending
//! and repair the tree bottom-up along that path.

mod error;
mod iter;
mod node;

pub use error::{BPlusTreeError, BPlusTreeResult};
pub use iter::{Iter, Range};
pub use node::{BPlusNode, Entry, InternalNode, LeafNode, NodeId, max_keys, min_keys};

use std::mem;

use log::{debug, trace};

/// Default B+ tree order
pub const DEFAULT_ORDER: usize = 4;

/// Root-to-node descent: (internal node ID, index of the child taken)
type Path = Vec<(NodeId, usize)>;

/// Keys of one node, as seen by a level-order walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSnapshot<K> {
    pub is_leaf: bool,
    pub keys: Vec<K>,
}

/// B+ Tree data structure
///
/// Order `m` means:
/// - Internal nodes have at most `m` children
/// - Every node holds at most `m-1` keys
/// - Every node except the root holds at least `ceil(m/2)-1` keys
#[derive(Debug)]
pub struct BPlusTree<K, V> {
    /// Root node ID (an empty leaf for an empty tree)
    root: NodeId,

    /// Tree order (max children per internal node)
    order: usize,

    /// Node storage
    nodes: Vec<Option<BPlusNode<K, V>>>,

    /// Free list for recycling deleted nodes
    free_list: Vec<NodeId>,

    /// Total number of entries in the tree
    entry_count: usize,
}

impl<K: Ord + Clone, V> BPlusTree<K, V> {
    /// Create a new empty B+ tree with the given order
    ///
    /// # Arguments
    /// * `order` - The tree order (must be >= 3)
    ///
    /// # Returns
    /// * `Ok(BPlusTree)` - A new tree whose root is an empty leaf
    /// * `Err(BPlusTreeError::InvalidOrder)` - If order is below 3
    pub fn new(order: usize) -> BPlusTreeResult<Self, K> {
        if order < 3 {
            return Err(BPlusTreeError::InvalidOrder(order));
        }

        Ok(Self::with_order(order))
    }

    fn with_order(order: usize) -> Self {
        Self {
            root: 0,
            order,
            nodes: vec![Some(BPlusNode::Leaf(LeafNode::new()))],
            free_list: Vec::new(),
            entry_count: 0,
        }
    }

    /// Get the tree order
    pub fn order(&self) -> usize {
        self.order
    }

    /// Maximum keys per node
    pub fn max_keys(&self) -> usize {
        max_keys(self.order)
    }

    /// Minimum keys per non-root node
    pub fn min_keys(&self) -> usize {
        min_keys(self.order)
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    /// Get number of entries in the tree
    pub fn len(&self) -> usize {
        self.entry_count
    }

    /// Get tree height (1 for a single leaf)
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut current = self.root;

        while let Some(BPlusNode::Internal(node)) = self.get_node(current) {
            match node.children.first() {
                Some(&child_id) => {
                    current = child_id;
                    height += 1;
                }
                None => break,
            }
        }

        height
    }

    // ========== Node Management ==========

    /// Allocate a new node, returning its ID
    fn allocate_node(&mut self, node: BPlusNode<K, V>) -> NodeId {
        if let Some(id) = self.free_list.pop() {
            self.nodes[id] = Some(node);
            id
        } else {
            let id = self.nodes.len();
            self.nodes.push(Some(node));
            id
        }
    }

    /// Remove a node from storage, adding its slot to the free list
    fn free_node(&mut self, id: NodeId) -> BPlusTreeResult<BPlusNode<K, V>, K> {
        let node = self
            .nodes
            .get_mut(id)
            .and_then(Option::take)
            .ok_or(BPlusTreeError::NodeNotFound(id))?;
        self.free_list.push(id);
        Ok(node)
    }

    /// Get a reference to a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&BPlusNode<K, V>> {
        self.nodes.get(id).and_then(|n| n.as_ref())
    }

    fn node(&self, id: NodeId) -> BPlusTreeResult<&BPlusNode<K, V>, K> {
        self.get_node(id).ok_or(BPlusTreeError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> BPlusTreeResult<&mut BPlusNode<K, V>, K> {
        self.nodes
            .get_mut(id)
            .and_then(|n| n.as_mut())
            .ok_or(BPlusTreeError::NodeNotFound(id))
    }

    fn leaf_mut(&mut self, id: NodeId) -> BPlusTreeResult<&mut LeafNode<K, V>, K> {
        self.node_mut(id)?
            .as_leaf_mut()
            .ok_or_else(|| BPlusTreeError::InvalidState(format!("node {id} is not a leaf")))
    }

    fn internal(&self, id: NodeId) -> BPlusTreeResult<&InternalNode<K>, K> {
        self.node(id)?
            .as_internal()
            .ok_or_else(|| BPlusTreeError::InvalidState(format!("node {id} is not internal")))
    }

    fn internal_mut(&mut self, id: NodeId) -> BPlusTreeResult<&mut InternalNode<K>, K> {
        self.node_mut(id)?
            .as_internal_mut()
            .ok_or_else(|| BPlusTreeError::InvalidState(format!("node {id} is not internal")))
    }

    /// Get the root node ID
    pub fn root_node_id(&self) -> NodeId {
        self.root
    }

    /// Get the leftmost leaf node ID, the head of the leaf chain
    pub fn first_leaf_id(&self) -> NodeId {
        let mut current = self.root;

        while let Some(BPlusNode::Internal(node)) = self.get_node(current) {
            match node.children.first() {
                Some(&child_id) => current = child_id,
                None => break,
            }
        }

        current
    }

    /// Get the number of live nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    // ========== Search Operations ==========

    /// Search for a key, returning its value
    pub fn search(&self, key: &K) -> Option<&V> {
        let leaf_id = self.find_leaf(key)?;
        self.get_node(leaf_id)?.as_leaf()?.search(key)
    }

    /// Check whether the key is present
    pub fn contains_key(&self, key: &K) -> bool {
        self.search(key).is_some()
    }

    /// Lazily iterate over entries with `low <= key < high`, in key order
    ///
    /// The iterator borrows the tree, so the tree cannot be modified while
    /// a range is being consumed:
    ///
    /// ```compile_fail
    /// use bptree::BPlusTree;
    ///
    /// let mut tree = BPlusTree::new(4).unwrap();
    /// tree.insert(1, "a").unwrap();
    /// let mut range = tree.range(&0, &10);
    /// tree.insert(2, "b").unwrap();
    /// range.next();
    /// ```
    pub fn range(&self, low: &K, high: &K) -> Range<'_, K, V> {
        if low >= high {
            return Range::empty(self, high.clone());
        }

        // Start at the first entry >= low in the leaf whose range holds low
        let start = self.find_leaf(low).and_then(|leaf_id| {
            let leaf = self.get_node(leaf_id)?.as_leaf()?;
            let idx = leaf.find(low).unwrap_or_else(|pos| pos);
            Some((leaf_id, idx))
        });

        match start {
            Some((leaf_id, idx)) => Range::new(self, leaf_id, idx, high.clone()),
            None => Range::empty(self, high.clone()),
        }
    }

    /// Iterate over all entries in key order
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self, self.first_leaf_id())
    }

    /// Find the leaf node that should contain the given key
    fn find_leaf(&self, key: &K) -> Option<NodeId> {
        let mut current = self.root;

        loop {
            match self.get_node(current)? {
                BPlusNode::Leaf(_) => return Some(current),
                BPlusNode::Internal(node) => {
                    let child_idx = node.find_child_index(key);
                    current = *node.children.get(child_idx)?;
                }
            }
        }
    }

    /// Find the leaf node and the path from root to it
    fn find_leaf_with_path(&self, key: &K) -> BPlusTreeResult<(NodeId, Path), K> {
        let mut current = self.root;
        let mut path = Vec::new();

        loop {
            match self.node(current)? {
                BPlusNode::Leaf(_) => {
                    trace!("descended to leaf {} at depth {}", current, path.len());
                    return Ok((current, path));
                }
                BPlusNode::Internal(node) => {
                    let child_idx = node.find_child_index(key);
                    path.push((current, child_idx));
                    current = *node.children.get(child_idx).ok_or_else(|| {
                        BPlusTreeError::InvalidState(format!(
                            "node {current} has no child {child_idx}"
                        ))
                    })?;
                }
            }
        }
    }

    // ========== Insert Operations ==========

    /// Insert a key-value pair into the tree
    ///
    /// Fails with `DuplicateKey`, handing the key back, if the key is
    /// already present. The tree is left unchanged in that case.
    pub fn insert(&mut self, key: K, value: V) -> BPlusTreeResult<(), K> {
        let (leaf_id, path) = self.find_leaf_with_path(&key)?;

        self.leaf_mut(leaf_id)?
            .insert(key, value)
            .map_err(BPlusTreeError::DuplicateKey)?;

        self.entry_count += 1;

        if self.node(leaf_id)?.is_overflowing(self.order) {
            self.split_leaf(leaf_id, path)?;
        }

        Ok(())
    }

    /// Split an overflowing leaf node
    fn split_leaf(&mut self, leaf_id: NodeId, path: Path) -> BPlusTreeResult<(), K> {
        let right = self.leaf_mut(leaf_id)?.split();
        let separator = right.first_key().cloned().ok_or_else(|| {
            BPlusTreeError::InvalidState(format!("split of leaf {leaf_id} left no right half"))
        })?;

        let right_id = self.allocate_node(BPlusNode::Leaf(right));
        self.leaf_mut(leaf_id)?.next = Some(right_id);

        debug!("split leaf {}, new right sibling {}", leaf_id, right_id);

        self.insert_into_parent(path, leaf_id, separator, right_id)
    }

    /// Insert a separator and new right child into the parent after a split
    fn insert_into_parent(
        &mut self,
        mut path: Path,
        left_id: NodeId,
        separator: K,
        right_id: NodeId,
    ) -> BPlusTreeResult<(), K> {
        let Some((parent_id, child_idx)) = path.pop() else {
            // Split the root - create new root
            let new_root = InternalNode::new(vec![separator], vec![left_id, right_id]);
            self.root = self.allocate_node(BPlusNode::Internal(new_root));
            debug!(
                "root split: new root {} over {} and {}",
                self.root, left_id, right_id
            );
            return Ok(());
        };

        self.internal_mut(parent_id)?
            .insert_child(child_idx, separator, right_id);

        if self.node(parent_id)?.is_overflowing(self.order) {
            self.split_internal(parent_id, path)?;
        }

        Ok(())
    }

    /// Split an overflowing internal node, promoting its median key
    fn split_internal(&mut self, node_id: NodeId, path: Path) -> BPlusTreeResult<(), K> {
        let (median, right) = self.internal_mut(node_id)?.split();
        let right_id = self.allocate_node(BPlusNode::Internal(right));

        debug!("split internal {}, new right sibling {}", node_id, right_id);

        self.insert_into_parent(path, node_id, median, right_id)
    }

    // ========== Delete Operations ==========

    /// Delete the entry with the given key, returning its value
    ///
    /// Fails with `KeyNotFound` if the key is absent. The tree is left
    /// unchanged in that case.
    pub fn delete(&mut self, key: &K) -> BPlusTreeResult<V, K> {
        let (leaf_id, path) = self.find_leaf_with_path(key)?;

        let value = self
            .leaf_mut(leaf_id)?
            .remove(key)
            .ok_or_else(|| BPlusTreeError::KeyNotFound(key.clone()))?;

        self.entry_count -= 1;

        self.handle_underflow(leaf_id, path)?;

        Ok(value)
    }

    /// Repair an underflowing node by borrowing from or merging with a sibling
    ///
    /// Siblings are reached through the parent at the end of `path`. A merge
    /// removes a key from the parent, so the repair continues one level up.
    fn handle_underflow(&mut self, node_id: NodeId, mut path: Path) -> BPlusTreeResult<(), K> {
        let Some((parent_id, child_idx)) = path.pop() else {
            return self.collapse_root();
        };

        if !self.node(node_id)?.is_underflowing(self.order) {
            return Ok(());
        }

        let (left_sibling, right_sibling) = {
            let parent = self.internal(parent_id)?;
            let left = child_idx.checked_sub(1).map(|i| parent.children[i]);
            let right = parent.children.get(child_idx + 1).copied();
            (left, right)
        };

        let is_leaf = self.node(node_id)?.is_leaf();

        if let Some(left_id) = left_sibling {
            if self.node(left_id)?.can_lend(self.order) {
                debug!("node {} borrows from left sibling {}", node_id, left_id);
                return if is_leaf {
                    self.borrow_leaf_from_left(node_id, left_id, parent_id, child_idx)
                } else {
                    self.borrow_internal_from_left(node_id, left_id, parent_id, child_idx)
                };
            }
        }

        if let Some(right_id) = right_sibling {
            if self.node(right_id)?.can_lend(self.order) {
                debug!("node {} borrows from right sibling {}", node_id, right_id);
                return if is_leaf {
                    self.borrow_leaf_from_right(node_id, right_id, parent_id, child_idx)
                } else {
                    self.borrow_internal_from_right(node_id, right_id, parent_id, child_idx)
                };
            }
        }

        // Prefer folding into the left sibling
        let (left_id, right_id, separator_idx) = match (left_sibling, right_sibling) {
            (Some(left_id), _) => (left_id, node_id, child_idx - 1),
            (None, Some(right_id)) => (node_id, right_id, child_idx),
            (None, None) => {
                return Err(BPlusTreeError::InvalidState(format!(
                    "underflowing node {node_id} has no sibling"
                )));
            }
        };

        self.merge_siblings(parent_id, separator_idx, left_id, right_id)?;

        self.handle_underflow(parent_id, path)
    }

    /// Replace an internal root left without keys by its only child
    fn collapse_root(&mut self) -> BPlusTreeResult<(), K> {
        let only_child = match self.node(self.root)? {
            BPlusNode::Internal(node) if node.keys.is_empty() => node.children[0],
            _ => return Ok(()),
        };

        let old_root = self.root;
        self.free_node(old_root)?;
        self.root = only_child;

        debug!("root {} collapsed, new root {}", old_root, only_child);

        Ok(())
    }

    /// Move the last entry of the left sibling to the front of the leaf
    fn borrow_leaf_from_left(
        &mut self,
        leaf_id: NodeId,
        left_id: NodeId,
        parent_id: NodeId,
        child_idx: usize,
    ) -> BPlusTreeResult<(), K> {
        let entry = self.leaf_mut(left_id)?.entries.pop().ok_or_else(|| {
            BPlusTreeError::InvalidState(format!("left sibling {left_id} is empty"))
        })?;
        let separator = entry.key().clone();

        self.leaf_mut(leaf_id)?.entries.insert(0, entry);
        self.internal_mut(parent_id)?.keys[child_idx - 1] = separator;

        Ok(())
    }

    /// Move the first entry of the right sibling to the back of the leaf
    fn borrow_leaf_from_right(
        &mut self,
        leaf_id: NodeId,
        right_id: NodeId,
        parent_id: NodeId,
        child_idx: usize,
    ) -> BPlusTreeResult<(), K> {
        let (entry, separator) = {
            let right = self.leaf_mut(right_id)?;
            if right.entries.len() < 2 {
                return Err(BPlusTreeError::InvalidState(format!(
                    "right sibling {right_id} cannot lend"
                )));
            }
            let entry = right.entries.remove(0);
            (entry, right.entries[0].key().clone())
        };

        self.leaf_mut(leaf_id)?.entries.push(entry);
        self.internal_mut(parent_id)?.keys[child_idx] = separator;

        Ok(())
    }

    /// Rotate the last child of the left sibling through the parent
    fn borrow_internal_from_left(
        &mut self,
        node_id: NodeId,
        left_id: NodeId,
        parent_id: NodeId,
        child_idx: usize,
    ) -> BPlusTreeResult<(), K> {
        let (key, child) = {
            let left = self.internal_mut(left_id)?;
            match (left.keys.pop(), left.children.pop()) {
                (Some(key), Some(child)) => (key, child),
                _ => {
                    return Err(BPlusTreeError::InvalidState(format!(
                        "left sibling {left_id} is empty"
                    )));
                }
            }
        };

        let separator = mem::replace(&mut self.internal_mut(parent_id)?.keys[child_idx - 1], key);

        let node = self.internal_mut(node_id)?;
        node.keys.insert(0, separator);
        node.children.insert(0, child);

        Ok(())
    }

    /// Rotate the first child of the right sibling through the parent
    fn borrow_internal_from_right(
        &mut self,
        node_id: NodeId,
        right_id: NodeId,
        parent_id: NodeId,
        child_idx: usize,
    ) -> BPlusTreeResult<(), K> {
        let (key, child) = {
            let right = self.internal_mut(right_id)?;
            if right.keys.is_empty() {
                return Err(BPlusTreeError::InvalidState(format!(
                    "right sibling {right_id} is empty"
                )));
            }
            (right.keys.remove(0), right.children.remove(0))
        };

        let separator = mem::replace(&mut self.internal_mut(parent_id)?.keys[child_idx], key);

        let node = self.internal_mut(node_id)?;
        node.keys.push(separator);
        node.children.push(child);

        Ok(())
    }

    /// Fold `right_id` into its left neighbour `left_id`
    ///
    /// The separator between them is removed from the parent. Internal nodes
    /// pull it down, leaves drop it and splice the leaf chain past `right_id`.
    fn merge_siblings(
        &mut self,
        parent_id: NodeId,
        separator_idx: usize,
        left_id: NodeId,
        right_id: NodeId,
    ) -> BPlusTreeResult<(), K> {
        let (separator, removed) = self.internal_mut(parent_id)?.remove_child(separator_idx);
        if removed != right_id {
            return Err(BPlusTreeError::InvalidState(format!(
                "parent {parent_id} does not hold {right_id} after separator {separator_idx}"
            )));
        }

        let right = self.free_node(right_id)?;

        match (self.node_mut(left_id)?, right) {
            (BPlusNode::Leaf(left), BPlusNode::Leaf(right)) => left.merge(right),
            (BPlusNode::Internal(left), BPlusNode::Internal(right)) => left.merge(separator, right),
            _ => {
                return Err(BPlusTreeError::InvalidState(format!(
                    "siblings {left_id} and {right_id} are at different depths"
                )));
            }
        }

        debug!("merged node {} into {}", right_id, left_id);

        Ok(())
    }

    // ========== Diagnostics ==========

    /// Snapshot the keys of every node, level by level from the root
    pub fn keys_by_level(&self) -> Vec<Vec<NodeSnapshot<K>>> {
        let mut levels = Vec::new();
        let mut current = vec![self.root];

        while !current.is_empty() {
            let mut level = Vec::with_capacity(current.len());
            let mut next = Vec::new();

            for id in current {
                match self.get_node(id) {
                    Some(BPlusNode::Internal(node)) => {
                        level.push(NodeSnapshot {
                            is_leaf: false,
                            keys: node.keys.clone(),
                        });
                        next.extend_from_slice(&node.children);
                    }
                    Some(BPlusNode::Leaf(leaf)) => level.push(NodeSnapshot {
                        is_leaf: true,
                        keys: leaf.entries.iter().map(|e| e.key().clone()).collect(),
                    }),
                    None => {}
                }
            }

            levels.push(level);
            current = next;
        }

        levels
    }

    /// Check every structural invariant of the tree
    ///
    /// Verifies node occupancy, key ordering, separator bounds, equal leaf
    /// depth, and that the leaf chain visits every leaf in order exactly once.
    pub fn validate(&self) -> BPlusTreeResult<(), K> {
        let mut leaves = Vec::new();
        let mut leaf_depth = None;
        self.validate_node(self.root, 0, None, None, &mut leaf_depth, &mut leaves)?;

        // The chain must visit exactly the leaves found by the walk, in order
        let mut chained = Vec::with_capacity(leaves.len());
        let mut current = Some(self.first_leaf_id());
        while let Some(id) = current {
            if chained.len() == leaves.len() {
                return Err(BPlusTreeError::InvalidState(format!(
                    "leaf chain continues past the last leaf at {id}"
                )));
            }
            chained.push(id);
            current = self
                .get_node(id)
                .and_then(|n| n.as_leaf())
                .ok_or(BPlusTreeError::NodeNotFound(id))?
                .next;
        }
        if chained != leaves {
            return Err(BPlusTreeError::InvalidState(format!(
                "leaf chain {chained:?} does not match leaves {leaves:?}"
            )));
        }

        let counted: usize = leaves
            .iter()
            .filter_map(|&id| self.get_node(id))
            .map(BPlusNode::key_count)
            .sum();
        if counted != self.entry_count {
            return Err(BPlusTreeError::InvalidState(format!(
                "tree holds {counted} entries but len() is {}",
                self.entry_count
            )));
        }

        Ok(())
    }

    fn validate_node(
        &self,
        id: NodeId,
        depth: usize,
        lower: Option<&K>,
        upper: Option<&K>,
        leaf_depth: &mut Option<usize>,
        leaves: &mut Vec<NodeId>,
    ) -> BPlusTreeResult<(), K> {
        let node = self.node(id)?;
        let is_root = id == self.root;
        let count = node.key_count();

        if count > self.max_keys() {
            return Err(BPlusTreeError::InvalidState(format!(
                "node {id} holds {count} keys, max is {}",
                self.max_keys()
            )));
        }
        if !is_root && count < self.min_keys() {
            return Err(BPlusTreeError::InvalidState(format!(
                "node {id} holds {count} keys, min is {}",
                self.min_keys()
            )));
        }

        let keys: Vec<&K> = match node {
            BPlusNode::Internal(internal) => internal.keys.iter().collect(),
            BPlusNode::Leaf(leaf) => leaf.entries.iter().map(Entry::key).collect(),
        };
        if keys.windows(2).any(|w| w[0] >= w[1]) {
            return Err(BPlusTreeError::InvalidState(format!(
                "keys of node {id} are not strictly ascending"
            )));
        }
        let in_bounds = |k: &K| lower.is_none_or(|lo| k >= lo) && upper.is_none_or(|hi| k < hi);
        if !keys.iter().all(|&k| in_bounds(k)) {
            return Err(BPlusTreeError::InvalidState(format!(
                "node {id} holds a key outside its parent's separators"
            )));
        }

        match node {
            BPlusNode::Leaf(_) => {
                match *leaf_depth {
                    None => *leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        return Err(BPlusTreeError::InvalidState(format!(
                            "leaf {id} at depth {depth}, expected {expected}"
                        )));
                    }
                    Some(_) => {}
                }
                leaves.push(id);
            }
            BPlusNode::Internal(internal) => {
                if internal.children.len() != internal.keys.len() + 1 {
                    return Err(BPlusTreeError::InvalidState(format!(
                        "internal node {id} has {} keys and {} children",
                        internal.keys.len(),
                        internal.children.len()
                    )));
                }
                if internal.keys.is_empty() {
                    return Err(BPlusTreeError::InvalidState(format!(
                        "internal node {id} has no keys"
                    )));
                }
                for (i, &child) in internal.children.iter().enumerate() {
                    let child_lower = if i == 0 { lower } else { Some(&internal.keys[i - 1]) };
                    let child_upper = internal.keys.get(i).or(upper);
                    self.validate_node(child, depth + 1, child_lower, child_upper, leaf_depth, leaves)?;
                }
            }
        }

        Ok(())
    }
}

impl<K: Ord + Clone, V> Default for BPlusTree<K, V> {
    /// Create a new B+ tree of `DEFAULT_ORDER`
    fn default() -> Self {
        Self::with_order(DEFAULT_ORDER)
    }
}

impl<'a, K: Ord + Clone, V> IntoIterator for &'a BPlusTree<K, V> {
    type Item = &'a Entry<K, V>;
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
