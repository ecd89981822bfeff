// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SHA-256 fingerprint helpers.
//!
//! Release descriptors and code artifacts are identified by hex-encoded
//! SHA-256 digests of their bytes or canonical JSON serialization.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hex SHA-256 of a byte slice.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Hex SHA-256 of a string's UTF-8 bytes.
pub fn sha256_str(text: &str) -> String {
    sha256_hex(text.as_bytes())
}

/// Hex SHA-256 of a value's JSON serialization.
pub fn sha256_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(sha256_hex(&serde_json::to_vec(value)?))
}

/// Hex SHA-256 of a file's contents.
pub fn sha256_file(path: &std::path::Path) -> std::io::Result<String> {
    Ok(sha256_hex(&std::fs::read(path)?))
}

#[cfg(test)]
#[path = "digest_tests.rs"]
mod tests;
