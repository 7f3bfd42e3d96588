//! Ephemeral signing-secret handling.
//!
//! The XRPL seed is produced by the out-of-scope authentication flow and is
//! only borrowed by the coordinator for the duration of one submission. The
//! wrapper never appears in logs or serialized output, and the backing
//! bytes are overwritten when the value is dropped.

use std::fmt;

/// Use-once wrapper around an XRPL seed.
///
/// Consumed by value on submission so a secret cannot be reused for a
/// second transfer; zeroed on drop.
pub struct SigningSecret {
    seed: String,
}

impl SigningSecret {
    pub fn new(seed: impl Into<String>) -> Self {
        Self { seed: seed.into() }
    }

    /// Exposes the seed for the ledger call. Callers must not copy it into
    /// any longer-lived structure.
    pub fn expose(&self) -> &str {
        &self.seed
    }
}

impl Drop for SigningSecret {
    fn drop(&mut self) {
        // Overwrite in place before the allocation is released.
        unsafe {
            for byte in self.seed.as_bytes_mut() {
                std::ptr::write_volatile(byte, 0);
            }
        }
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(****)")
    }
}
