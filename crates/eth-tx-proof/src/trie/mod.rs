//! In-memory Merkle-Patricia trie over a fixed set of key/value pairs.
//!
//! The trie is built once from all of its entries and is read-only afterwards. Hashed nodes
//! live in an arena keyed by their hash, so the hash references between nodes resolve by
//! lookup and no node owns another one except for inlined children.

mod nibbles;
mod node;

use std::collections::{BTreeMap, HashMap};

use alloy_primitives::{b256, keccak256, Bytes, B256};
use tracing::debug;

use crate::error::ProofError;

pub use nibbles::{common_prefix_len, decode_path, encode_path, to_nibbles};
pub use node::{NodeRef, TrieNode};

/// Root of a trie without entries, keccak256 of the empty RLP string
pub const EMPTY_ROOT_HASH: B256 =
    b256!("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421");

/// Key of the transaction at `index` in the transactions trie
pub fn transaction_key(index: u64) -> Vec<u8> {
    alloy_rlp::encode(index)
}

/// Collects entries, sorted by nibble key, until the trie is built
#[derive(Debug, Default, Clone)]
pub struct TrieBuilder {
    entries: BTreeMap<Vec<u8>, Bytes>,
}

impl TrieBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry. An empty value deletes the key.
    pub fn insert(&mut self, key: &[u8], value: impl Into<Bytes>) {
        let value = value.into();
        let key = to_nibbles(key);
        if value.is_empty() {
            self.entries.remove(&key);
        } else {
            self.entries.insert(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn build(self) -> Trie {
        let items: Vec<(Vec<u8>, Bytes)> = self.entries.into_iter().collect();
        let mut nodes = HashMap::new();
        if items.is_empty() {
            return Trie { root: None, nodes };
        }

        let root = build_node(&items, 0, &mut nodes);
        // The root is always referenced by hash, whatever its size
        let root_hash = root.hash();
        nodes.insert(root_hash, root);
        debug!("Built trie of {} entries, {} hashed nodes", items.len(), nodes.len());

        Trie {
            root: Some(root_hash),
            nodes,
        }
    }
}

/// Build the node covering `items`, which all share their first `depth` nibbles
fn build_node(items: &[(Vec<u8>, Bytes)], depth: usize, nodes: &mut HashMap<B256, TrieNode>) -> TrieNode {
    if let [(key, value)] = items {
        return TrieNode::Leaf {
            suffix: key[depth..].to_vec(),
            value: value.clone(),
        };
    }

    // Items are sorted, so the prefix shared by the first and last key is shared by all
    let first = &items[0].0[depth..];
    let last = &items[items.len() - 1].0[depth..];
    let shared = common_prefix_len(first, last);
    if shared > 0 {
        let child = build_node(items, depth + shared, nodes);
        return TrieNode::Extension {
            prefix: first[..shared].to_vec(),
            child: store(child, nodes),
        };
    }

    let mut children: [Option<NodeRef>; 16] = Default::default();
    let mut value = None;
    let mut rest = items;
    if let Some(((key, terminal), tail)) = rest.split_first() {
        if key.len() == depth {
            value = Some(terminal.clone());
            rest = tail;
        }
    }

    while let Some((key, _)) = rest.first() {
        let nibble = key[depth];
        let end = rest
            .iter()
            .position(|(key, _)| key[depth] != nibble)
            .unwrap_or(rest.len());
        let child = build_node(&rest[..end], depth + 1, nodes);
        children[nibble as usize] = Some(store(child, nodes));
        rest = &rest[end..];
    }

    TrieNode::Branch {
        children: Box::new(children),
        value,
    }
}

/// Reference a child from its parent: embedded when shorter than 32 bytes, hashed otherwise
fn store(node: TrieNode, nodes: &mut HashMap<B256, TrieNode>) -> NodeRef {
    let encoded = alloy_rlp::encode(&node);
    if encoded.len() < 32 {
        NodeRef::Inline(Box::new(node))
    } else {
        let hash = keccak256(&encoded);
        nodes.insert(hash, node);
        NodeRef::Hash(hash)
    }
}

#[derive(Debug, Clone)]
pub struct Trie {
    root: Option<B256>,
    nodes: HashMap<B256, TrieNode>,
}

impl Trie {
    /// Transactions trie of a block: the value at RLP(index) is the encoded transaction
    pub fn from_transactions(encoded: &[Bytes]) -> Self {
        let mut builder = TrieBuilder::new();
        for (index, transaction) in encoded.iter().enumerate() {
            builder.insert(&transaction_key(index as u64), transaction.clone());
        }
        builder.build()
    }

    pub fn root_hash(&self) -> B256 {
        self.root.unwrap_or(EMPTY_ROOT_HASH)
    }

    pub fn root_node(&self) -> Option<&TrieNode> {
        self.root.as_ref().and_then(|hash| self.nodes.get(hash))
    }

    pub fn resolve<'a>(&'a self, node_ref: &'a NodeRef) -> Result<&'a TrieNode, ProofError> {
        match node_ref {
            NodeRef::Hash(hash) => self.nodes.get(hash).ok_or(ProofError::MissingNode(*hash)),
            NodeRef::Inline(node) => Ok(node),
        }
    }

    /// Number of nodes referenced by hash, root included
    pub fn hashed_node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn verify_root(&self, expected: B256) -> Result<(), ProofError> {
        let computed = self.root_hash();
        if computed != expected {
            return Err(ProofError::TrieRootMismatch { expected, computed });
        }
        Ok(())
    }
}
