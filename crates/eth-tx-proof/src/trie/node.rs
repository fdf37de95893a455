//! Merkle-Patricia trie node shapes and their RLP encoding.

use alloy_primitives::{keccak256, Bytes, B256};
use alloy_rlp::{BufMut, Encodable, EMPTY_STRING_CODE};

use super::nibbles::{decode_path, encode_path};
use crate::error::ProofError;
use crate::types::put_list;

/// Reference from a parent node to a child.
///
/// Children whose encoding is 32 bytes or longer are referenced by hash; shorter ones are
/// embedded verbatim in the parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    Hash(B256),
    Inline(Box<TrieNode>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrieNode {
    Branch {
        children: Box<[Option<NodeRef>; 16]>,
        value: Option<Bytes>,
    },
    Extension {
        /// Shared key nibbles
        prefix: Vec<u8>,
        child: NodeRef,
    },
    Leaf {
        /// Remaining key nibbles
        suffix: Vec<u8>,
        value: Bytes,
    },
}

impl Encodable for NodeRef {
    fn encode(&self, out: &mut dyn BufMut) {
        match self {
            NodeRef::Hash(hash) => hash.encode(out),
            NodeRef::Inline(node) => node.encode(out),
        }
    }
}

impl Encodable for TrieNode {
    fn encode(&self, out: &mut dyn BufMut) {
        let mut payload = Vec::new();
        match self {
            TrieNode::Branch { children, value } => {
                for child in children.iter() {
                    match child {
                        Some(child) => child.encode(&mut payload),
                        None => payload.put_u8(EMPTY_STRING_CODE),
                    }
                }
                match value {
                    Some(value) => value.encode(&mut payload),
                    None => payload.put_u8(EMPTY_STRING_CODE),
                }
            }
            TrieNode::Extension { prefix, child } => {
                encode_path(prefix, false).as_slice().encode(&mut payload);
                child.encode(&mut payload);
            }
            TrieNode::Leaf { suffix, value } => {
                encode_path(suffix, true).as_slice().encode(&mut payload);
                value.encode(&mut payload);
            }
        }
        put_list(&payload, out);
    }
}

impl TrieNode {
    /// Node encoding as committed by its parent's hash
    pub fn raw_encoding(&self) -> Bytes {
        alloy_rlp::encode(self).into()
    }

    pub fn hash(&self) -> B256 {
        keccak256(self.raw_encoding())
    }

    /// Decode a raw node; the input must hold exactly one node
    pub fn decode(raw: &[u8]) -> Result<Self, ProofError> {
        let mut buf = raw;
        let item = next_item(&mut buf)?;
        if !buf.is_empty() {
            return Err(alloy_rlp::Error::Custom("trailing bytes after trie node").into());
        }
        Self::from_item(item)
    }

    fn from_item(item: RlpItem<'_>) -> Result<Self, ProofError> {
        if !item.list {
            return Err(alloy_rlp::Error::UnexpectedString.into());
        }
        let mut payload = item.payload;
        let mut items = Vec::with_capacity(17);
        while !payload.is_empty() {
            items.push(next_item(&mut payload)?);
        }

        match items.as_slice() {
            [path, second] => {
                let (nibbles, is_leaf) = decode_path(path.string()?)?;
                if is_leaf {
                    Ok(TrieNode::Leaf {
                        suffix: nibbles,
                        value: Bytes::copy_from_slice(second.string()?),
                    })
                } else {
                    let child = decode_ref(second)?
                        .ok_or(alloy_rlp::Error::Custom("extension without child"))?;
                    Ok(TrieNode::Extension {
                        prefix: nibbles,
                        child,
                    })
                }
            }
            [slots @ .., value] if slots.len() == 16 => {
                let mut children: [Option<NodeRef>; 16] = Default::default();
                for (child, slot) in children.iter_mut().zip(slots) {
                    *child = decode_ref(slot)?;
                }
                let value = value.string()?;
                Ok(TrieNode::Branch {
                    children: Box::new(children),
                    value: (!value.is_empty()).then(|| Bytes::copy_from_slice(value)),
                })
            }
            other => Err(ProofError::UnsupportedNodeType(other.len())),
        }
    }
}

/// One undecoded RLP item: its payload and its full encoding
struct RlpItem<'a> {
    list: bool,
    payload: &'a [u8],
    raw: &'a [u8],
}

impl<'a> RlpItem<'a> {
    fn string(&self) -> Result<&'a [u8], ProofError> {
        if self.list {
            return Err(alloy_rlp::Error::UnexpectedList.into());
        }
        Ok(self.payload)
    }
}

fn next_item<'a>(buf: &mut &'a [u8]) -> Result<RlpItem<'a>, ProofError> {
    let start: &'a [u8] = *buf;
    let header = alloy_rlp::Header::decode(buf)?;
    if buf.len() < header.payload_length {
        return Err(alloy_rlp::Error::InputTooShort.into());
    }
    let header_length = start.len() - buf.len();
    let payload = &buf[..header.payload_length];
    *buf = &buf[header.payload_length..];
    Ok(RlpItem {
        list: header.list,
        payload,
        raw: &start[..header_length + header.payload_length],
    })
}

fn decode_ref(item: &RlpItem<'_>) -> Result<Option<NodeRef>, ProofError> {
    if item.list {
        if item.raw.len() >= 32 {
            return Err(alloy_rlp::Error::Custom("embedded node of 32 bytes or more").into());
        }
        return Ok(Some(NodeRef::Inline(Box::new(TrieNode::decode(item.raw)?))));
    }
    match item.payload.len() {
        0 => Ok(None),
        32 => Ok(Some(NodeRef::Hash(B256::from_slice(item.payload)))),
        _ => Err(alloy_rlp::Error::Custom("invalid node reference length").into()),
    }
}
