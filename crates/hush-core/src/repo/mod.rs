//! The encrypted repository: a logical tree of secrets over a physical
//! directory.
//!
//! Every logical entry is exactly one filesystem entry below the root. Its
//! name and its content are independently either plaintext or ciphertext, and
//! no index records which: names are classified per access by the shape
//! detector (then trial-decrypted), content mode is fixed per repository.
//!
//! All operations are plain sequences of filesystem calls behind async
//! signatures; nothing is cached, no background work is spawned, and no locks
//! are held. Concurrent external mutation gets whatever atomicity the OS
//! gives the individual `rename`/`write` — multi-step sequences (such as
//! ancestor creation) are not atomic as a whole, and cancellation never rolls
//! back completed steps. Callers wanting check-then-act semantics do their
//! own `get` first and accept the race window.

pub mod item;
pub mod name;
pub mod path;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::fs;
use tracing::{debug, instrument, trace, warn};

use crate::crypto::cipher::{AesCipher, Cipher, CipherError};
use crate::crypto::codec::NameCodec;
use crate::crypto::detect::is_ciphertext_shaped;

pub use item::{Item, ListOptions};
pub use name::{InvalidNameError, Name};
pub use path::{InvalidPathError, ItemPath};

/// Failures surfaced by repository operations.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error(transparent)]
    Name(#[from] InvalidNameError),

    #[error(transparent)]
    Path(#[from] InvalidPathError),

    /// Encryption or decryption failed for a specific entry.
    #[error("cipher failure on '{path}': {source}")]
    Cipher {
        path: ItemPath,
        #[source]
        source: CipherError,
    },

    /// Underlying filesystem failure. Never retried.
    #[error("I/O failure on '{path}': {source}")]
    Io {
        path: ItemPath,
        #[source]
        source: std::io::Error,
    },

    /// A create or move targeted an already-existing destination.
    #[error("'{path}' already exists")]
    Conflict { path: ItemPath },

    #[error("'{path}' does not exist")]
    NotFound { path: ItemPath },

    #[error("'{path}' is not a folder")]
    NotAFolder { path: ItemPath },

    #[error("'{path}' is not a file")]
    NotAFile { path: ItemPath },

    /// `read_to_string` on content that is not UTF-8.
    #[error("content of '{path}' is not valid UTF-8")]
    NotUtf8 { path: ItemPath },

    /// The operation does not apply to the repository root.
    #[error("operation not supported on the repository root")]
    Root,

    /// The configured root directory is missing; the repository never
    /// creates it.
    #[error("repository root '{}' does not exist or is not a directory", .0.display())]
    MissingRoot(PathBuf),
}

impl RepositoryError {
    fn io(path: &ItemPath) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.clone(),
            source,
        }
    }
}

/// Naming policy: how logical names map to directory entry names.
///
/// The policy governs what this repository *writes*; what it reads is decided
/// per entry by the shape detector, so mixed trees from other generations
/// stay listable.
pub enum NameEncryption {
    /// Entry names are the logical names verbatim.
    Plain,
    /// Entry names are `codec.encode(cipher.encrypt(logical_name))`.
    Encrypted {
        cipher: Arc<dyn Cipher>,
        codec: NameCodec,
    },
}

impl NameEncryption {
    /// The production configuration: AES-256-CBC name cipher with the padded
    /// base64url codec.
    pub fn aes(password: &str) -> Self {
        Self::Encrypted {
            cipher: Arc::new(AesCipher::new(password)),
            codec: NameCodec::padded(),
        }
    }
}

/// Content policy: whether file bytes are wrapped by a cipher.
///
/// Fixed per repository, never inferred per file; a decrypt is simply
/// attempted and its failure surfaced.
pub enum ContentEncryption {
    Plain,
    Encrypted(Arc<dyn Cipher>),
}

impl ContentEncryption {
    /// The production configuration: AES-256-CBC content cipher.
    pub fn aes(password: &str) -> Self {
        Self::Encrypted(Arc::new(AesCipher::new(password)))
    }
}

/// A physical child together with its recovered logical name.
struct RawChild {
    name: Name,
    physical: PathBuf,
    is_dir: bool,
}

/// Outcome of resolving a logical path to a physical location.
struct Resolved {
    physical: PathBuf,
    is_dir: bool,
}

/// A tree of individually encryptable files over an ordinary directory.
///
/// Configuration (root, naming policy, content policy) is fixed for the
/// repository's lifetime. The root directory must already exist.
pub struct Repository {
    root: PathBuf,
    names: NameEncryption,
    content: ContentEncryption,
}

impl Repository {
    /// Open a repository over an existing directory.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::MissingRoot`] if `root` is not a directory;
    /// the repository never creates its own root.
    pub fn open(
        root: impl Into<PathBuf>,
        names: NameEncryption,
        content: ContentEncryption,
    ) -> Result<Self, RepositoryError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(RepositoryError::MissingRoot(root));
        }
        Ok(Self {
            root,
            names,
            content,
        })
    }

    /// Look up an item by logical path.
    ///
    /// Walks one segment at a time from the root, scanning each level for a
    /// case-insensitive match on the *decrypted* names. Absence is `None`,
    /// not an error; nothing is ever created.
    #[instrument(level = "debug", skip(self), fields(path = %path))]
    pub async fn get(&self, path: &ItemPath) -> Result<Option<Item>, RepositoryError> {
        if path.is_root() {
            return Ok(Some(Item::Root));
        }
        Ok(self.resolve(path).await?.map(|resolved| {
            if resolved.is_dir {
                Item::Folder { path: path.clone() }
            } else {
                Item::File { path: path.clone() }
            }
        }))
    }

    /// List the children of a folder.
    ///
    /// Sibling order is whatever the underlying directory enumeration
    /// returns; callers needing determinism sort the result themselves.
    /// Entries whose name cannot be recovered (undecryptable or undecodable)
    /// are skipped with a diagnostic log, never failing the listing as a
    /// whole.
    #[instrument(level = "debug", skip(self), fields(folder = %folder))]
    pub async fn list(
        &self,
        folder: &ItemPath,
        options: ListOptions,
    ) -> Result<Vec<Item>, RepositoryError> {
        let physical = if folder.is_root() {
            self.root.clone()
        } else {
            match self.resolve(folder).await? {
                Some(resolved) if resolved.is_dir => resolved.physical,
                Some(_) => {
                    return Err(RepositoryError::NotAFolder {
                        path: folder.clone(),
                    })
                }
                None => {
                    return Err(RepositoryError::NotFound {
                        path: folder.clone(),
                    })
                }
            }
        };

        let mut items = Vec::new();
        let mut pending = vec![(folder.clone(), physical)];
        while let Some((logical_dir, physical_dir)) = pending.pop() {
            for child in self.scan_children(&logical_dir, &physical_dir).await? {
                if !options.include_dotted && child.name.is_dotted() {
                    trace!(name = %child.name, "Hiding dotted entry");
                    continue;
                }
                let child_path = logical_dir.down(child.name);
                if child.is_dir {
                    if options.include_folders {
                        items.push(Item::Folder {
                            path: child_path.clone(),
                        });
                    }
                    if options.recursive {
                        pending.push((child_path, child.physical));
                    }
                } else {
                    items.push(Item::File { path: child_path });
                }
            }
        }

        debug!(count = items.len(), "Listed folder");
        Ok(items)
    }

    /// Create a file at `path`, creating missing ancestor folders.
    ///
    /// The new file is empty (an encrypted empty buffer when content
    /// encryption is on). A failure partway through may leave some ancestors
    /// behind; there is no rollback.
    #[instrument(level = "debug", skip(self), fields(path = %path))]
    pub async fn create_file(&self, path: &ItemPath) -> Result<Item, RepositoryError> {
        let physical = self.create_ancestors(path).await?;
        let bytes = self.encode_content(path, &[])?;
        fs::write(&physical, bytes)
            .await
            .map_err(RepositoryError::io(path))?;
        debug!("Created file");
        Ok(Item::File { path: path.clone() })
    }

    /// Create a folder at `path`, creating missing ancestor folders.
    #[instrument(level = "debug", skip(self), fields(path = %path))]
    pub async fn create_folder(&self, path: &ItemPath) -> Result<Item, RepositoryError> {
        let physical = self.create_ancestors(path).await?;
        fs::create_dir(&physical)
            .await
            .map_err(RepositoryError::io(path))?;
        debug!("Created folder");
        Ok(Item::Folder { path: path.clone() })
    }

    /// Read a file's content, decrypting when the repository's content
    /// policy says so.
    #[instrument(level = "debug", skip(self), fields(item = %item))]
    pub async fn read(&self, item: &Item) -> Result<Vec<u8>, RepositoryError> {
        let (path, physical) = self.locate_file(item).await?;
        let bytes = fs::read(&physical)
            .await
            .map_err(RepositoryError::io(&path))?;
        match &self.content {
            ContentEncryption::Plain => Ok(bytes),
            ContentEncryption::Encrypted(cipher) => {
                cipher
                    .decrypt(&bytes)
                    .map_err(|source| RepositoryError::Cipher { path, source })
            }
        }
    }

    /// Read a file's content as UTF-8 text.
    pub async fn read_to_string(&self, item: &Item) -> Result<String, RepositoryError> {
        let bytes = self.read(item).await?;
        String::from_utf8(bytes).map_err(|_| RepositoryError::NotUtf8 { path: item.path() })
    }

    /// Overwrite a file's content, encrypting when the repository's content
    /// policy says so.
    #[instrument(level = "debug", skip(self, content), fields(item = %item, len = content.len()))]
    pub async fn write(&self, item: &Item, content: &[u8]) -> Result<(), RepositoryError> {
        let (path, physical) = self.locate_file(item).await?;
        let bytes = self.encode_content(&path, content)?;
        fs::write(&physical, bytes)
            .await
            .map_err(RepositoryError::io(&path))
    }

    /// Remove an item: a file, or a folder with everything beneath it.
    #[instrument(level = "debug", skip(self), fields(item = %item))]
    pub async fn delete(&self, item: &Item) -> Result<(), RepositoryError> {
        if matches!(item, Item::Root) {
            return Err(RepositoryError::Root);
        }
        let path = item.path();
        let resolved = self
            .resolve(&path)
            .await?
            .ok_or_else(|| RepositoryError::NotFound { path: path.clone() })?;
        if resolved.is_dir {
            fs::remove_dir_all(&resolved.physical)
                .await
                .map_err(RepositoryError::io(&path))?;
        } else {
            fs::remove_file(&resolved.physical)
                .await
                .map_err(RepositoryError::io(&path))?;
        }
        debug!("Deleted item");
        Ok(())
    }

    /// Rename a file to a new logical path.
    ///
    /// The destination's physical name is freshly derived from the naming
    /// policy. Fails with [`RepositoryError::Conflict`] — leaving the source
    /// untouched — when an entry already resolves to the destination.
    #[instrument(level = "debug", skip(self), fields(item = %item, to = %to))]
    pub async fn move_file(&self, item: &Item, to: &ItemPath) -> Result<Item, RepositoryError> {
        let (from, source) = self.locate_file(item).await?;
        let leaf = to.name().ok_or(RepositoryError::Root)?;
        let parent = to.parent().unwrap_or_default();

        let parent_physical = if parent.is_root() {
            self.root.clone()
        } else {
            match self.resolve(&parent).await? {
                Some(resolved) if resolved.is_dir => resolved.physical,
                Some(_) => {
                    return Err(RepositoryError::NotAFolder {
                        path: parent.clone(),
                    })
                }
                None => {
                    return Err(RepositoryError::NotFound {
                        path: parent.clone(),
                    })
                }
            }
        };

        let occupied = self
            .scan_children(&parent, &parent_physical)
            .await?
            .into_iter()
            .any(|child| child.name == *leaf);
        if occupied {
            return Err(RepositoryError::Conflict { path: to.clone() });
        }

        let destination = parent_physical.join(self.physical_name(to, leaf)?);
        fs::rename(&source, &destination)
            .await
            .map_err(RepositoryError::io(&from))?;
        debug!("Moved file");
        Ok(Item::File { path: to.clone() })
    }

    // ---- physical <-> logical translation ----------------------------------

    /// The on-disk entry name for a logical name, per the naming policy.
    fn physical_name(&self, path: &ItemPath, name: &Name) -> Result<String, RepositoryError> {
        match &self.names {
            NameEncryption::Plain => Ok(name.as_str().to_string()),
            NameEncryption::Encrypted { cipher, codec } => {
                let encrypted = cipher.encrypt(name.as_str().as_bytes()).map_err(|source| {
                    RepositoryError::Cipher {
                        path: path.clone(),
                        source,
                    }
                })?;
                Ok(codec.encode(&encrypted))
            }
        }
    }

    /// Recover the logical name of an on-disk entry, or `None` when the
    /// entry should be skipped as corrupted.
    fn logical_name(&self, physical: &str) -> Option<Name> {
        if let NameEncryption::Encrypted { cipher, codec } = &self.names {
            if is_ciphertext_shaped(physical) {
                // Shaped like our ciphertext: decode, trial-decrypt, validate.
                // Each step can fail on corrupted or foreign entries.
                let decoded = match codec.decode(physical) {
                    Ok(decoded) => decoded,
                    Err(error) => {
                        warn!(entry = %physical, %error, "Skipping entry: undecodable name");
                        return None;
                    }
                };
                let decrypted = match cipher.decrypt(&decoded) {
                    Ok(decrypted) => decrypted,
                    Err(error) => {
                        warn!(entry = %physical, %error, "Skipping entry: undecryptable name");
                        return None;
                    }
                };
                let text = match String::from_utf8(decrypted) {
                    Ok(text) => text,
                    Err(error) => {
                        warn!(entry = %physical, %error, "Skipping entry: name is not UTF-8");
                        return None;
                    }
                };
                return match Name::parse(&text) {
                    Ok(name) => Some(name),
                    Err(error) => {
                        warn!(entry = %physical, %error, "Skipping entry: invalid decrypted name");
                        None
                    }
                };
            }
        }
        match Name::parse(physical) {
            Ok(name) => Some(name),
            Err(error) => {
                warn!(entry = %physical, %error, "Skipping entry: invalid name");
                None
            }
        }
    }

    /// Content bytes as they go to disk, per the content policy.
    fn encode_content(&self, path: &ItemPath, content: &[u8]) -> Result<Vec<u8>, RepositoryError> {
        match &self.content {
            ContentEncryption::Plain => Ok(content.to_vec()),
            ContentEncryption::Encrypted(cipher) => {
                cipher
                    .encrypt(content)
                    .map_err(|source| RepositoryError::Cipher {
                        path: path.clone(),
                        source,
                    })
            }
        }
    }

    // ---- tree walking -------------------------------------------------------

    /// Enumerate the physical children of one directory with their recovered
    /// logical names. Unrecoverable entries are skipped (logged above).
    async fn scan_children(
        &self,
        logical_dir: &ItemPath,
        physical_dir: &Path,
    ) -> Result<Vec<RawChild>, RepositoryError> {
        let mut children = Vec::new();
        let mut entries = fs::read_dir(physical_dir)
            .await
            .map_err(RepositoryError::io(logical_dir))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(RepositoryError::io(logical_dir))?
        {
            let file_name = entry.file_name();
            let Some(physical_name) = file_name.to_str() else {
                warn!(entry = ?file_name, "Skipping entry: name is not Unicode");
                continue;
            };
            let Some(name) = self.logical_name(physical_name) else {
                continue;
            };
            let is_dir = entry
                .file_type()
                .await
                .map_err(RepositoryError::io(logical_dir))?
                .is_dir();
            children.push(RawChild {
                name,
                physical: entry.path(),
                is_dir,
            });
        }
        Ok(children)
    }

    /// Walk `path` from the root, one scanned level per segment.
    ///
    /// `None` when any segment has no case-insensitive logical match (or a
    /// file occupies a non-leaf position).
    async fn resolve(&self, path: &ItemPath) -> Result<Option<Resolved>, RepositoryError> {
        let mut current = Resolved {
            physical: self.root.clone(),
            is_dir: true,
        };
        let mut walked = ItemPath::root();
        for segment in path.segments() {
            if !current.is_dir {
                return Ok(None);
            }
            let children = self.scan_children(&walked, &current.physical).await?;
            let Some(child) = children.into_iter().find(|child| child.name == *segment) else {
                trace!(path = %path, segment = %segment, "Path segment not found");
                return Ok(None);
            };
            walked = walked.down(segment.clone());
            current = Resolved {
                physical: child.physical,
                is_dir: child.is_dir,
            };
        }
        Ok(Some(current))
    }

    /// Resolve a file item to its logical path and physical location.
    async fn locate_file(&self, item: &Item) -> Result<(ItemPath, PathBuf), RepositoryError> {
        let Item::File { path } = item else {
            return Err(match item {
                Item::Root => RepositoryError::Root,
                _ => RepositoryError::NotAFile { path: item.path() },
            });
        };
        match self.resolve(path).await? {
            Some(resolved) if !resolved.is_dir => Ok((path.clone(), resolved.physical)),
            Some(_) => Err(RepositoryError::NotAFile { path: path.clone() }),
            None => Err(RepositoryError::NotFound { path: path.clone() }),
        }
    }

    /// Ensure every ancestor of `path` exists as a folder and return the
    /// physical location the leaf should be created at.
    ///
    /// Ancestors are matched logically (an existing encrypted folder is
    /// reused, not duplicated); missing ones are created with fresh physical
    /// names. An existing leaf is a conflict.
    async fn create_ancestors(&self, path: &ItemPath) -> Result<PathBuf, RepositoryError> {
        let Some(leaf) = path.name() else {
            return Err(RepositoryError::Root);
        };
        let mut walked = ItemPath::root();
        let mut physical_dir = self.root.clone();

        for segment in &path.segments()[..path.depth() - 1] {
            let children = self.scan_children(&walked, &physical_dir).await?;
            walked = walked.down(segment.clone());
            match children.into_iter().find(|child| child.name == *segment) {
                Some(child) if child.is_dir => physical_dir = child.physical,
                Some(_) => return Err(RepositoryError::NotAFolder { path: walked }),
                None => {
                    let next = physical_dir.join(self.physical_name(&walked, segment)?);
                    fs::create_dir(&next)
                        .await
                        .map_err(RepositoryError::io(&walked))?;
                    trace!(folder = %walked, "Created missing ancestor");
                    physical_dir = next;
                }
            }
        }

        let children = self.scan_children(&walked, &physical_dir).await?;
        if children.into_iter().any(|child| child.name == *leaf) {
            return Err(RepositoryError::Conflict { path: path.clone() });
        }
        Ok(physical_dir.join(self.physical_name(path, leaf)?))
    }
}
