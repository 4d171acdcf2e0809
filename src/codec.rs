//! Multi-pass base64url obfuscation for on-disk records.
//!
//! Every record that should not be casually readable (credentials, the
//! session config, the journal document, backup snapshots) is serialized to
//! JSON and then run through base64url encoding a configurable number of
//! times. Each round's output feeds the next, so decoding applies the same
//! number of rounds in reverse.
//!
//! This is reversible obfuscation, NOT encryption. It keeps records out of
//! a text editor, nothing more. If real confidentiality is ever required,
//! swap this module for an authenticated encryption primitive and keep the
//! same contract: obfuscate at rest, detect corruption on read.
//!
//! Corruption is a value here: a malformed round, invalid UTF-8, or a failed
//! JSON parse all yield `None`, never a panic or an `Err`. Callers treat
//! `None` as "record is corrupted, act as if it were absent".

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Apply base64url encoding `passes` times in sequence.
///
/// `passes` below 1 is clamped to a single round so the output is always
/// decodable with the same count.
pub fn encode_str(data: &str, passes: u32) -> String {
    let mut encoded = URL_SAFE.encode(data.as_bytes());
    for _ in 1..passes {
        encoded = URL_SAFE.encode(encoded.as_bytes());
    }
    encoded
}

/// Apply base64url decoding `passes` times in sequence.
///
/// Returns `None` if any round fails or the final bytes are not UTF-8.
pub fn decode_str(data: &str, passes: u32) -> Option<String> {
    let mut bytes = data.as_bytes().to_vec();
    for _ in 0..passes.max(1) {
        bytes = URL_SAFE.decode(&bytes).ok()?;
    }
    String::from_utf8(bytes).ok()
}

/// Serialize `value` to JSON and obfuscate it with `passes` rounds.
pub fn encode_value<T: Serialize>(value: &T, passes: u32) -> crate::Result<String> {
    Ok(encode_str(&serde_json::to_string(value)?, passes))
}

/// Decode `passes` rounds and parse the result back into a structure.
///
/// Returns `None` on any decode or parse failure.
pub fn decode_value<T: DeserializeOwned>(data: &str, passes: u32) -> Option<T> {
    let plain = decode_str(data, passes)?;
    serde_json::from_str(&plain).ok()
}
