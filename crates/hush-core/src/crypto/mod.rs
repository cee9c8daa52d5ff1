//! Cryptographic primitives for the secrets repository.

pub mod cipher;
pub mod codec;
pub mod detect;

// Re-export commonly used types
pub use cipher::{AesCipher, Cipher, CipherError, IdentityCipher, DEFAULT_ITERATIONS, SALT_LEN};
pub use codec::{CodecError, NameCodec};
pub use detect::{candidate_runs, is_ciphertext_shaped};
