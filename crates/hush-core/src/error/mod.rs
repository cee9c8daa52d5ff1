//! Error types for the hush-core crate
//!
//! This module re-exports all error types so callers have a single place to
//! import them from.

pub use crate::crypto::cipher::CipherError;
pub use crate::crypto::codec::CodecError;
pub use crate::repo::name::InvalidNameError;
pub use crate::repo::path::InvalidPathError;
pub use crate::repo::RepositoryError;
