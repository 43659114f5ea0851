/// Node identifier (index into node storage)
pub type NodeId = usize;

/// Maximum keys a node of the given order may hold
pub fn max_keys(order: usize) -> usize {
    order - 1
}

/// Minimum keys a non-root node of the given order must hold
pub fn min_keys(order: usize) -> usize {
    order.div_ceil(2) - 1 // ceil(m/2) - 1
}

/// A key/value pair, stored only in leaves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<K, V> {
    key: K,
    value: V,
}

impl<K, V> Entry<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_parts(self) -> (K, V) {
        (self.key, self.value)
    }
}

/// Internal node: stores separator keys and child pointers
///
/// Layout:
/// - children.len() == keys.len() + 1
/// - every key under children[i] is < keys[i]
/// - every key under children[i + 1] is >= keys[i]
#[derive(Debug, Clone)]
pub struct InternalNode<K> {
    /// Separator keys (strictly ascending)
    pub keys: Vec<K>,
    /// Child node IDs
    pub children: Vec<NodeId>,
}

impl<K: Ord + Clone> InternalNode<K> {
    /// Create a new internal node with given keys and children
    pub fn new(keys: Vec<K>, children: Vec<NodeId>) -> Self {
        debug_assert_eq!(keys.len() + 1, children.len());
        Self { keys, children }
    }

    /// Number of separator keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Find the child index whose range contains `key`
    ///
    /// Returns the number of separators <= key, i.e. the `i` with
    /// `keys[i - 1] <= key < keys[i]`.
    pub fn find_child_index(&self, key: &K) -> usize {
        self.keys.partition_point(|k| k <= key)
    }

    /// Insert a separator and the child to its right, after the child at `child_idx` split
    pub fn insert_child(&mut self, child_idx: usize, separator: K, right: NodeId) {
        self.keys.insert(child_idx, separator);
        self.children.insert(child_idx + 1, right);
    }

    /// Remove the separator at `key_idx` together with the child to its right
    pub fn remove_child(&mut self, key_idx: usize) -> (K, NodeId) {
        let key = self.keys.remove(key_idx);
        let child = self.children.remove(key_idx + 1);
        (key, child)
    }

    /// Split an overflowing internal node around its median key
    ///
    /// This node keeps the keys below the median, the returned node gets the
    /// keys above it. The median itself is returned for promotion.
    pub fn split(&mut self) -> (K, InternalNode<K>) {
        let mid = self.keys.len() / 2;

        let right_keys = self.keys.split_off(mid + 1);
        let right_children = self.children.split_off(mid + 1);
        // keys.len() > mid, so the median is still present
        let median = self.keys.remove(mid);

        (median, InternalNode::new(right_keys, right_children))
    }

    /// Append the separator from the parent and all of `right` to this node
    pub fn merge(&mut self, separator: K, right: InternalNode<K>) {
        self.keys.push(separator);
        self.keys.extend(right.keys);
        self.children.extend(right.children);
    }
}

/// Leaf node: stores entries, linked to next leaf
#[derive(Debug, Clone)]
pub struct LeafNode<K, V> {
    /// Entries (sorted by key, unique)
    pub entries: Vec<Entry<K, V>>,
    /// Link to next leaf for range queries
    pub next: Option<NodeId>,
}

impl<K: Ord, V> LeafNode<K, V> {
    /// Create a new empty leaf node
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next: None,
        }
    }

    /// Create a leaf node with given entries
    pub fn with_entries(entries: Vec<Entry<K, V>>) -> Self {
        Self {
            entries,
            next: None,
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if leaf is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Binary search for `key`, `Err` holds the insertion point
    pub fn find(&self, key: &K) -> Result<usize, usize> {
        self.entries.binary_search_by(|e| e.key.cmp(key))
    }

    /// Insert a key-value pair in sorted order
    ///
    /// Returns the key back if it is already present.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), K> {
        match self.find(&key) {
            Ok(_) => Err(key),
            Err(pos) => {
                self.entries.insert(pos, Entry::new(key, value));
                Ok(())
            }
        }
    }

    /// Search for a key
    pub fn search(&self, key: &K) -> Option<&V> {
        self.find(key).ok().map(|i| &self.entries[i].value)
    }

    /// Remove the entry with the given key, returning its value
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.find(key).ok()?;
        Some(self.entries.remove(idx).value)
    }

    pub fn first_key(&self) -> Option<&K> {
        self.entries.first().map(|e| &e.key)
    }

    pub fn last_key(&self) -> Option<&K> {
        self.entries.last().map(|e| &e.key)
    }

    /// Split this leaf node, returning the new right sibling
    ///
    /// This node keeps the lower half, the new node gets the upper (larger on
    /// odd counts) half and inherits this node's `next` link. The caller
    /// links this node to the new one once it has an ID.
    pub fn split(&mut self) -> LeafNode<K, V> {
        let mid = self.entries.len() / 2;

        let mut right = LeafNode::with_entries(self.entries.split_off(mid));
        right.next = self.next.take();

        right
    }

    /// Append all of `right` to this leaf and take over its `next` link
    pub fn merge(&mut self, right: LeafNode<K, V>) {
        self.entries.extend(right.entries);
        self.next = right.next;
    }
}

impl<K: Ord, V> Default for LeafNode<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// B+ tree node (either internal or leaf)
#[derive(Debug, Clone)]
pub enum BPlusNode<K, V> {
    Internal(InternalNode<K>),
    Leaf(LeafNode<K, V>),
}

impl<K, V> BPlusNode<K, V> {
    /// Check if this is a leaf node
    pub fn is_leaf(&self) -> bool {
        matches!(self, BPlusNode::Leaf(_))
    }

    /// Number of keys held, separators for internal nodes
    pub fn key_count(&self) -> usize {
        match self {
            BPlusNode::Internal(node) => node.keys.len(),
            BPlusNode::Leaf(node) => node.entries.len(),
        }
    }

    /// More keys than a node of this order may hold
    pub fn is_overflowing(&self, order: usize) -> bool {
        self.key_count() > max_keys(order)
    }

    /// Fewer keys than a non-root node of this order must hold
    pub fn is_underflowing(&self, order: usize) -> bool {
        self.key_count() < min_keys(order)
    }

    /// Can give a key to a sibling without underflowing
    pub fn can_lend(&self, order: usize) -> bool {
        self.key_count() > min_keys(order)
    }

    /// Get as internal node reference
    pub fn as_internal(&self) -> Option<&InternalNode<K>> {
        match self {
            BPlusNode::Internal(node) => Some(node),
            BPlusNode::Leaf(_) => None,
        }
    }

    /// Get as internal node mutable reference
    pub fn as_internal_mut(&mut self) -> Option<&mut InternalNode<K>> {
        match self {
            BPlusNode::Internal(node) => Some(node),
            BPlusNode::Leaf(_) => None,
        }
    }

    /// Get as leaf node reference
    pub fn as_leaf(&self) -> Option<&LeafNode<K, V>> {
        match self {
            BPlusNode::Internal(_) => None,
            BPlusNode::Leaf(node) => Some(node),
        }
    }

    /// Get as leaf node mutable reference
    pub fn as_leaf_mut(&mut self) -> Option<&mut LeafNode<K, V>> {
        match self {
            BPlusNode::Internal(_) => None,
            BPlusNode::Leaf(node) => Some(node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_of(keys: &[i64]) -> LeafNode<i64, i64> {
        let mut leaf = LeafNode::new();
        for &k in keys {
            leaf.insert(k, k * 100).unwrap();
        }
        leaf
    }

    fn leaf_keys(leaf: &LeafNode<i64, i64>) -> Vec<i64> {
        leaf.entries.iter().map(|e| *e.key()).collect()
    }

    #[test]
    fn test_order_bounds() {
        assert_eq!(max_keys(3), 2);
        assert_eq!(min_keys(3), 1);
        assert_eq!(max_keys(4), 3);
        assert_eq!(min_keys(4), 1);
        assert_eq!(min_keys(5), 2);
        assert_eq!(min_keys(6), 2);
    }

    #[test]
    fn test_leaf_node_insert() {
        let leaf = leaf_of(&[5, 3, 7]);

        assert_eq!(leaf.len(), 3);
        assert_eq!(leaf_keys(&leaf), vec![3, 5, 7]);
    }

    #[test]
    fn test_leaf_node_insert_duplicate() {
        let mut leaf = leaf_of(&[5, 3]);

        assert_eq!(leaf.insert(5, 0), Err(5));
        assert_eq!(leaf.len(), 2);
        assert_eq!(leaf.search(&5), Some(&500));
    }

    #[test]
    fn test_leaf_node_search() {
        let leaf = leaf_of(&[3, 5, 7]);

        assert_eq!(leaf.search(&5), Some(&500));
        assert_eq!(leaf.search(&4), None);
        assert_eq!(leaf.search(&10), None);
    }

    #[test]
    fn test_leaf_node_remove() {
        let mut leaf = leaf_of(&[3, 5, 7]);

        assert_eq!(leaf.remove(&5), Some(500));
        assert_eq!(leaf.len(), 2);
        assert_eq!(leaf.search(&5), None);

        assert_eq!(leaf.remove(&5), None); // Already removed
    }

    #[test]
    fn test_leaf_node_split() {
        let mut leaf = leaf_of(&[0, 1, 2, 3, 4]);
        leaf.next = Some(9);

        let right = leaf.split();

        assert_eq!(leaf_keys(&leaf), vec![0, 1]);
        assert_eq!(leaf_keys(&right), vec![2, 3, 4]);
        assert_eq!(leaf.next, None);
        assert_eq!(right.next, Some(9));
        assert_eq!(right.first_key(), Some(&2));
    }

    #[test]
    fn test_leaf_node_merge() {
        let mut left = leaf_of(&[1, 2]);
        let mut right = leaf_of(&[5, 6]);
        left.next = Some(1);
        right.next = Some(2);

        left.merge(right);

        assert_eq!(leaf_keys(&left), vec![1, 2, 5, 6]);
        assert_eq!(left.next, Some(2));
    }

    #[test]
    fn test_internal_node_find_child() {
        let node = InternalNode::new(vec![3, 7, 12], vec![0, 1, 2, 3]);

        assert_eq!(node.find_child_index(&1), 0); // < 3
        assert_eq!(node.find_child_index(&3), 1); // == 3 goes right
        assert_eq!(node.find_child_index(&5), 1);
        assert_eq!(node.find_child_index(&7), 2);
        assert_eq!(node.find_child_index(&11), 2);
        assert_eq!(node.find_child_index(&15), 3); // > all, rightmost child
    }

    #[test]
    fn test_internal_node_insert_child() {
        let mut node = InternalNode::new(vec![3, 12], vec![0, 1, 2]);

        node.insert_child(1, 7, 9);

        assert_eq!(node.keys, vec![3, 7, 12]);
        assert_eq!(node.children, vec![0, 1, 9, 2]);
    }

    #[test]
    fn test_internal_node_split() {
        let mut node = InternalNode::new(vec![10, 20, 30, 40], vec![0, 1, 2, 3, 4]);

        let (median, right) = node.split();

        assert_eq!(median, 30);
        assert_eq!(node.keys, vec![10, 20]);
        assert_eq!(node.children, vec![0, 1, 2]);
        assert_eq!(right.keys, vec![40]);
        assert_eq!(right.children, vec![3, 4]);
    }

    #[test]
    fn test_internal_node_merge_and_remove() {
        let mut left = InternalNode::new(vec![10], vec![0, 1]);
        let right = InternalNode::new(vec![30], vec![2, 3]);

        left.merge(20, right);
        assert_eq!(left.keys, vec![10, 20, 30]);
        assert_eq!(left.children, vec![0, 1, 2, 3]);

        assert_eq!(left.remove_child(1), (20, 2));
        assert_eq!(left.keys, vec![10, 30]);
        assert_eq!(left.children, vec![0, 1, 3]);
    }

    #[test]
    fn test_node_capacity_queries() {
        let node: BPlusNode<i64, i64> = BPlusNode::Leaf(leaf_of(&[1, 2, 3, 4]));
        assert!(node.is_overflowing(4));
        assert!(!node.is_overflowing(5));
        assert!(node.can_lend(4));

        let empty: BPlusNode<i64, i64> = BPlusNode::Leaf(LeafNode::new());
        assert!(empty.is_underflowing(4));
        assert!(!empty.can_lend(4));
    }
}
