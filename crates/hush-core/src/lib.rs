//! Storage engine for hush: a tree of individually encryptable secret files
//! layered on an ordinary filesystem.
//!
//! Each entry's name and content are independently plaintext or ciphertext,
//! with no metadata index recording which; see [`repo::Repository`] for the
//! operations and [`crypto`] for the primitives it is built from.

pub mod crypto;
pub mod error;
pub mod repo;

pub use crypto::{AesCipher, Cipher, IdentityCipher, NameCodec};
pub use repo::{
    ContentEncryption, Item, ItemPath, ListOptions, Name, NameEncryption, Repository,
};
