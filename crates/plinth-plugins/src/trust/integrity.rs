//! SHA-256 digest verification for downloaded plugin binaries.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::{PluginError, PluginResult};

/// Lowercase hex SHA-256 digest of `data`.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Verify downloaded bytes against the digest advertised by the source.
///
/// An absent or empty expected digest is accepted without hashing. The
/// expected value may carry a `sha256:` prefix and any letter case.
///
/// # Errors
///
/// Returns [`PluginError::IntegrityMismatch`] naming both digests on mismatch.
pub fn verify_post_download(plugin: &str, expected: Option<&str>, data: &[u8]) -> PluginResult<()> {
    let Some(expected) = expected.map(str::trim).filter(|d| !d.is_empty()) else {
        return Ok(());
    };
    let normalized = expected
        .strip_prefix("sha256:")
        .unwrap_or(expected)
        .to_ascii_lowercase();

    let actual = sha256_hex(data);

    // Constant-time comparison; the lengths of hex digests are public.
    if !bool::from(actual.as_bytes().ct_eq(normalized.as_bytes())) {
        return Err(PluginError::IntegrityMismatch {
            plugin: plugin.to_string(),
            expected: expected.to_string(),
            actual,
        });
    }

    Ok(())
}
