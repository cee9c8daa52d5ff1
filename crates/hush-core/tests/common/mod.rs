//! Shared helpers for repository integration tests.
//!
//! `TreeBuilder` seeds a physical directory the way any repository generation
//! might have written it: every entry's name and content independently plain
//! or encrypted, with no metadata anywhere.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use hush_core::crypto::cipher::{AesCipher, Cipher};
use hush_core::crypto::codec::NameCodec;
use hush_core::{ContentEncryption, NameEncryption, Repository};
use tempfile::TempDir;

pub const PASSWORD: &str = "test password";

// Production iteration counts are pointlessly slow for tests.
pub const TEST_ITERATIONS: u32 = 1_000;

pub fn test_cipher() -> Arc<AesCipher> {
    Arc::new(AesCipher::with_iterations(PASSWORD, TEST_ITERATIONS))
}

/// Seeds a physical tree entry by entry.
pub struct TreeBuilder {
    dir: TempDir,
    cipher: Arc<AesCipher>,
    codec: NameCodec,
    /// Logical folder path ("" is the root) to physical location.
    folders: HashMap<String, PathBuf>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create scratch directory");
        let mut folders = HashMap::new();
        folders.insert(String::new(), dir.path().to_path_buf());
        Self {
            dir,
            cipher: test_cipher(),
            codec: NameCodec::padded(),
            folders,
        }
    }

    fn physical_name(&self, leaf: &str, encrypt: bool) -> String {
        if encrypt {
            let encrypted = self.cipher.encrypt(leaf.as_bytes()).expect("encrypt name");
            self.codec.encode(&encrypted)
        } else {
            leaf.to_string()
        }
    }

    fn split(logical: &str) -> (String, &str) {
        match logical.rsplit_once('/') {
            Some((parent, leaf)) => (parent.to_string(), leaf),
            None => (String::new(), logical),
        }
    }

    /// Seed a folder. The parent must have been seeded first.
    pub fn folder(mut self, logical: &str, encrypt_name: bool) -> Self {
        let (parent, leaf) = Self::split(logical);
        let parent_physical = self.folders[&parent].clone();
        let physical = parent_physical.join(self.physical_name(leaf, encrypt_name));
        std::fs::create_dir(&physical).expect("seed folder");
        self.folders.insert(logical.to_string(), physical);
        self
    }

    /// Seed a file. The parent folder must have been seeded first.
    pub fn file(
        self,
        logical: &str,
        content: &[u8],
        encrypt_name: bool,
        encrypt_content: bool,
    ) -> Self {
        let (parent, leaf) = Self::split(logical);
        let physical = self.folders[&parent].join(self.physical_name(leaf, encrypt_name));
        let bytes = if encrypt_content {
            self.cipher.encrypt(content).expect("encrypt content")
        } else {
            content.to_vec()
        };
        std::fs::write(physical, bytes).expect("seed file");
        self
    }

    /// Seed a physical entry verbatim, bypassing the name helpers. Used for
    /// corrupted or foreign entries.
    pub fn raw_file(self, physical_name: &str, bytes: &[u8]) -> Self {
        std::fs::write(self.dir.path().join(physical_name), bytes).expect("seed raw file");
        self
    }

    /// Finish seeding and open a fully encrypting repository over the tree.
    ///
    /// The `TempDir` is returned alongside; dropping it deletes the tree.
    pub fn build(self) -> (TempDir, Repository) {
        let repo = Repository::open(
            self.dir.path(),
            NameEncryption::Encrypted {
                cipher: test_cipher(),
                codec: NameCodec::padded(),
            },
            ContentEncryption::Encrypted(test_cipher()),
        )
        .expect("open repository");
        (self.dir, repo)
    }

    /// Finish seeding and open a repository with explicit policies.
    pub fn build_with(
        self,
        names: NameEncryption,
        content: ContentEncryption,
    ) -> (TempDir, Repository) {
        let repo = Repository::open(self.dir.path(), names, content).expect("open repository");
        (self.dir, repo)
    }
}

/// Logical paths of `items`, sorted for deterministic assertions (the engine
/// itself guarantees no ordering).
pub fn sorted_paths(items: &[hush_core::Item]) -> Vec<String> {
    let mut paths: Vec<String> = items.iter().map(|item| item.path().to_string()).collect();
    paths.sort();
    paths
}
