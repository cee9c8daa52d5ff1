//! Reversible mapping between ciphertext bytes and filesystem-safe text.
//!
//! Encrypted names have to live inside ordinary directory entries, so the raw
//! cipher output is re-spelled in a URL-safe base64 alphabet (`A-Z a-z 0-9 - _`,
//! optional `=` padding). Content ciphertext never goes through this codec; it
//! is written to disk as raw bytes.

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use thiserror::Error;

/// A text run could not be decoded back into bytes.
#[derive(Error, Debug)]
#[error("name is not valid base64: {0}")]
pub struct CodecError(#[from] base64::DecodeError);

/// URL-safe base64 codec for encrypted names.
///
/// Whether `=` padding is retained is a per-instance policy fixed at
/// construction; both spellings of the same bytes decode identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameCodec {
    padded: bool,
}

impl NameCodec {
    /// Codec that retains `=` padding (the on-disk default).
    pub fn padded() -> Self {
        Self { padded: true }
    }

    /// Codec that strips `=` padding.
    pub fn unpadded() -> Self {
        Self { padded: false }
    }

    /// Whether this instance emits `=` padding.
    pub fn emits_padding(&self) -> bool {
        self.padded
    }

    pub fn encode(&self, bytes: &[u8]) -> String {
        if self.padded {
            URL_SAFE.encode(bytes)
        } else {
            URL_SAFE_NO_PAD.encode(bytes)
        }
    }

    pub fn decode(&self, text: &str) -> Result<Vec<u8>, CodecError> {
        // Tolerate either padding policy on input; repositories written by
        // older generations may differ from this instance's setting.
        let trimmed = text.trim_end_matches('=');
        Ok(URL_SAFE_NO_PAD.decode(trimmed)?)
    }
}

impl Default for NameCodec {
    fn default() -> Self {
        Self::padded()
    }
}
