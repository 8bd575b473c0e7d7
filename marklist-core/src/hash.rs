//! Content fingerprint shared by document-level change detection and
//! item-level identity.

use sha2::{Digest, Sha256};

/// SHA-256 of `bytes`, lowercase hex.
///
/// Bytes are hashed exactly as given; callers must pass raw text, never a
/// normalized or rendered form.
pub fn fingerprint(bytes: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes.as_ref());
    hex::encode(hasher.finalize())
}
