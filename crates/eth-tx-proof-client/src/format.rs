//! Verified inclusion formatting for terminal display.

use chrono::DateTime;
use eth_tx_proof::TxType;
use eth_tx_proof_verify::VerifiedInclusion;

use crate::fetch::ProofFile;

const WIDTH: usize = 80;

/// Format a verified transaction inclusion for terminal display
pub fn format_inclusion(
    proof_file: &ProofFile,
    verified: &VerifiedInclusion,
    proof_nodes: usize,
) -> String {
    let rule = "─".repeat(WIDTH + 2);
    let title = " Transaction Inclusion Proof ";
    let mut output = String::new();

    output.push('\n');
    output.push_str(&format!(
        "┌─{}{}┐\n",
        title,
        "─".repeat(WIDTH + 1 - title.chars().count())
    ));
    output.push_str(&format!(
        "│ {} │\n",
        format_column_content(
            &format!("\x1b[33mTX:\x1b[0m {}", verified.transaction_hash),
            WIDTH
        )
    ));
    output.push_str(&format!("├{}┤\n", rule));

    for line in format_details(proof_file, verified, proof_nodes).lines() {
        output.push_str(&format!("│ {} │\n", format_column_content(line, WIDTH)));
    }

    output.push_str(&format!("└{}┘\n", rule));
    output
}

fn format_details(proof_file: &ProofFile, verified: &VerifiedInclusion, proof_nodes: usize) -> String {
    let mut output = String::new();
    output.push_str("\x1b[33mDETAILS:\x1b[0m\n");

    output.push_str(&format!("Network: {}\n", proof_file.network));
    output.push_str(&format!("Transaction type: {}\n", transaction_type(verified)));
    output.push_str(&format!(
        "Transaction size: {} bytes\n",
        verified.transaction.len()
    ));
    output.push_str(&format!("Transaction index: {}\n", verified.index));
    output.push_str(&format!("Block hash: {}\n", verified.block_hash));
    output.push_str(&format!("Block number: {}\n", verified.block_number));
    output.push_str(&format!(
        "Block timestamp: {}\n",
        format_unix_timestamp(proof_file.block_timestamp)
    ));
    output.push_str(&format!(
        "Proof: {} bytes, {} trie nodes\n",
        proof_file.proof.len(),
        proof_nodes
    ));

    output
}

/// Typed envelopes start with their type byte, legacy transactions with an RLP list prefix
fn transaction_type(verified: &VerifiedInclusion) -> String {
    match verified.transaction.first() {
        Some(&byte) if byte >= 0xc0 => TxType::Legacy.to_string(),
        Some(&byte) => TxType::try_from(byte as u64)
            .map(|tx_type| tx_type.to_string())
            .unwrap_or_else(|_| format!("{byte:#04x} (unknown)")),
        None => "empty".to_string(),
    }
}

/// Format content for a column with proper padding
fn format_column_content(content: &str, width: usize) -> String {
    let visible_len = strip_ansi_codes(content).chars().count();

    if visible_len <= width {
        format!("{}{}", content, " ".repeat(width - visible_len))
    } else {
        content.to_string()
    }
}

/// Remove ANSI color codes from a string for length calculation
fn strip_ansi_codes(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for next_c in chars.by_ref() {
                if next_c == 'm' {
                    break;
                }
            }
        } else {
            result.push(c);
        }
    }

    result
}

fn format_unix_timestamp(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("{timestamp} (out of range)"))
}
