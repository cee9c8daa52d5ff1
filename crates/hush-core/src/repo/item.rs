//! The logical tree node variants exposed by a repository.

use std::fmt;

use super::name::Name;
use super::path::ItemPath;

/// A node of the logical tree.
///
/// Items are transient values materialized fresh by every `list`/`get` call;
/// nothing is cached between calls. They carry logical identity only — no
/// parent pointers and no physical location. Whenever an operation needs the
/// on-disk location it re-walks the tree from the root, because an encrypted
/// entry's physical name is salted and can only be found by scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// The single entry point of a repository. No name, no parent.
    Root,
    /// A folder with children reachable through `list`/`get`.
    Folder { path: ItemPath },
    /// A file whose content is reachable through `read`/`write`.
    File { path: ItemPath },
}

impl Item {
    /// The logical path. Empty for the root.
    pub fn path(&self) -> ItemPath {
        match self {
            Item::Root => ItemPath::root(),
            Item::Folder { path } | Item::File { path } => path.clone(),
        }
    }

    /// The logical name; `None` for the root.
    pub fn name(&self) -> Option<&Name> {
        match self {
            Item::Root => None,
            Item::Folder { path } | Item::File { path } => path.name(),
        }
    }

    /// Whether children can be listed beneath this item.
    pub fn is_container(&self) -> bool {
        matches!(self, Item::Root | Item::Folder { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Item::File { .. })
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Root => f.write_str("/"),
            Item::Folder { path } => write!(f, "{path}/"),
            Item::File { path } => write!(f, "{path}"),
        }
    }
}

/// Flags controlling `list`.
///
/// Defaults are all off: shallow, file leaves only, dotted entries hidden.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Descend into subfolders and flatten their entries into the result.
    pub recursive: bool,
    /// Include folder nodes themselves in the result. File leaves always
    /// appear; folders only with this flag.
    pub include_folders: bool,
    /// Include entries whose logical name starts with `.` or `_`.
    pub include_dotted: bool,
}

impl ListOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    #[must_use]
    pub fn include_folders(mut self) -> Self {
        self.include_folders = true;
        self
    }

    #[must_use]
    pub fn include_dotted(mut self) -> Self {
        self.include_dotted = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_accessors() {
        let path = ItemPath::parse("a/b").unwrap();
        let file = Item::File { path: path.clone() };
        let folder = Item::Folder { path };

        assert!(file.is_file());
        assert!(!file.is_container());
        assert!(folder.is_container());
        assert!(Item::Root.is_container());

        assert_eq!(file.name().unwrap().as_str(), "b");
        assert!(Item::Root.name().is_none());
        assert!(Item::Root.path().is_root());

        assert_eq!(file.to_string(), "a/b");
        assert_eq!(folder.to_string(), "a/b/");
        assert_eq!(Item::Root.to_string(), "/");
    }

    #[test]
    fn options_default_off() {
        let options = ListOptions::new();
        assert!(!options.recursive && !options.include_folders && !options.include_dotted);
        let options = ListOptions::new().recursive().include_folders();
        assert!(options.recursive && options.include_folders && !options.include_dotted);
    }
}
