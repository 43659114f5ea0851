use thiserror::Error;

use super::node::NodeId;

/// Errors that can occur during B+ tree operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BPlusTreeError<K> {
    #[error("Duplicate key: {0:?}")]
    DuplicateKey(K),

    #[error("Key not found: {0:?}")]
    KeyNotFound(K),

    #[error("Invalid order: {0} (must be >= 3)")]
    InvalidOrder(usize),

    #[error("Invalid tree state: {0}")]
    InvalidState(String),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
}

pub type BPlusTreeResult<T, K> = Result<T, BPlusTreeError<K>>;
