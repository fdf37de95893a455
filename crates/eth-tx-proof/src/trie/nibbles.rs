//! Nibble keys and the hex-prefix path encoding of extension and leaf nodes.

use crate::error::ProofError;

/// Split bytes into 4-bit nibbles, high nibble first
pub fn to_nibbles(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().flat_map(|b| [b >> 4, b & 0x0f]).collect()
}

/// Hex-prefix encode a nibble path.
///
/// The flag nibble carries the node kind (2 for leaves) and the parity of the path; even
/// paths are padded with a zero nibble.
pub fn encode_path(nibbles: &[u8], is_leaf: bool) -> Vec<u8> {
    let flag = if is_leaf { 0x20 } else { 0x00 };
    let mut out = Vec::with_capacity(nibbles.len() / 2 + 1);
    let rest = if nibbles.len() % 2 == 1 {
        out.push(flag | 0x10 | nibbles[0]);
        &nibbles[1..]
    } else {
        out.push(flag);
        nibbles
    };
    out.extend(rest.chunks_exact(2).map(|pair| (pair[0] << 4) | pair[1]));
    out
}

/// Decode a hex-prefix path into `(nibbles, is_leaf)`
pub fn decode_path(encoded: &[u8]) -> Result<(Vec<u8>, bool), ProofError> {
    let (first, rest) = encoded
        .split_first()
        .ok_or(alloy_rlp::Error::Custom("empty hex-prefix path"))?;
    let flag = first >> 4;
    if flag > 3 {
        return Err(alloy_rlp::Error::Custom("invalid hex-prefix flag").into());
    }
    let is_leaf = flag & 0x02 != 0;
    let is_odd = flag & 0x01 != 0;

    let mut nibbles = Vec::with_capacity(rest.len() * 2 + 1);
    if is_odd {
        nibbles.push(first & 0x0f);
    } else if first & 0x0f != 0 {
        return Err(alloy_rlp::Error::Custom("non-zero hex-prefix padding").into());
    }
    nibbles.extend(to_nibbles(rest));
    Ok((nibbles, is_leaf))
}

pub fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}
