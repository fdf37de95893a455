//! Root-to-leaf walk of a trie for one key, recording every node visited.

use alloy_primitives::Bytes;

use crate::error::ProofError;
use crate::trie::{common_prefix_len, Trie, TrieNode};

/// Node visited on the way down, with the branch slot taken from it.
///
/// `branch_index` is `0..=15` for the child slot followed out of a branch, `16` when the
/// key ended on the branch itself, and `None` for extensions and leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofStep {
    pub node: TrieNode,
    pub branch_index: Option<u8>,
}

/// Where the walk ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminus {
    /// The key is present with this value
    Found(Bytes),
    /// An extension or leaf path disagrees with the key
    Divergence,
    /// The branch slot (or value slot) for the key is empty
    EmptySlot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofPath {
    pub steps: Vec<ProofStep>,
    pub terminus: Terminus,
}

impl ProofPath {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn value(&self) -> Option<&Bytes> {
        match &self.terminus {
            Terminus::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TrieNode> {
        self.steps.iter().map(|step| &step.node)
    }

    /// RLP encoding of each visited node, root first
    pub fn raw_nodes(&self) -> Vec<Bytes> {
        self.nodes().map(TrieNode::raw_encoding).collect()
    }
}

/// Walk `trie` from its root along `key` (as nibbles).
///
/// The path is returned for absent keys too, ending on the node that rules the key out.
pub fn extract_path(trie: &Trie, key: &[u8]) -> Result<ProofPath, ProofError> {
    let mut steps = Vec::new();
    let terminus = match trie.root_node() {
        Some(root) => descend(trie, root, key, &mut steps)?,
        None => Terminus::EmptySlot,
    };
    Ok(ProofPath { steps, terminus })
}

fn descend(trie: &Trie, node: &TrieNode, key: &[u8], steps: &mut Vec<ProofStep>) -> Result<Terminus, ProofError> {
    let mut visit = |branch_index| {
        steps.push(ProofStep {
            node: node.clone(),
            branch_index,
        })
    };

    match node {
        TrieNode::Branch { children, value } => match key.split_first() {
            None => {
                visit(Some(16));
                Ok(value.clone().map_or(Terminus::EmptySlot, Terminus::Found))
            }
            Some((&nibble, rest)) => {
                visit(Some(nibble));
                match children.get(nibble as usize).and_then(Option::as_ref) {
                    Some(child) => descend(trie, trie.resolve(child)?, rest, steps),
                    None => Ok(Terminus::EmptySlot),
                }
            }
        },
        TrieNode::Extension { prefix, child } => {
            visit(None);
            if common_prefix_len(prefix, key) < prefix.len() {
                return Ok(Terminus::Divergence);
            }
            descend(trie, trie.resolve(child)?, &key[prefix.len()..], steps)
        }
        TrieNode::Leaf { suffix, value } => {
            visit(None);
            if suffix.as_slice() == key {
                Ok(Terminus::Found(value.clone()))
            } else {
                Ok(Terminus::Divergence)
            }
        }
    }
}
