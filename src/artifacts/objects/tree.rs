//! Tree object
//!
//! Trees represent directory snapshots. They contain entries for files (blobs),
//! subdirectories (other trees) and submodules (commits), along with their names
//! and modes.
//!
//! ## Format
//!
//! On disk: `tree <size>\0<entries>`
//! Each entry: `<mode> <name>\0<raw object id>`
//!
//! ## Ordering
//!
//! Entries are kept in canonical order: names compare bytewise, with directory
//! names compared as if they ended in `/`. Entries are keyed by that sort key,
//! so serialization is canonical no matter the insertion order.

use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::{HashAlgorithm, ObjectId};
use crate::artifacts::objects::object_kind::ObjectKind;
use crate::errors::{Error, Result};
use bytes::Bytes;
use derive_new::new;
use std::collections::BTreeMap;
use std::io::BufRead;

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct TreeEntry {
    name: String,
    mode: EntryMode,
    oid: ObjectId,
}

impl TreeEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> EntryMode {
        self.mode
    }

    pub fn oid(&self) -> &ObjectId {
        &self.oid
    }

    pub fn is_tree(&self) -> bool {
        self.mode.is_tree()
    }

    fn sort_key(name: &str, mode: EntryMode) -> String {
        if mode.is_tree() {
            format!("{name}/")
        } else {
            name.to_string()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: BTreeMap<String, TreeEntry>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry
    ///
    /// Fails on an empty name, a name containing `/` or NUL, `.`/`..`, or a name
    /// already present (as a file or as a directory).
    pub fn insert(&mut self, name: impl Into<String>, mode: EntryMode, oid: ObjectId) -> Result<()> {
        let name = name.into();
        Self::validate_name(&name)?;

        if self.get(&name).is_some() {
            return Err(Error::parse(
                "tree entry",
                format!("duplicate entry '{name}'"),
            ));
        }

        self.entries.insert(
            TreeEntry::sort_key(&name, mode),
            TreeEntry::new(name, mode, oid),
        );

        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries
            .get(name)
            .or_else(|| self.entries.get(&format!("{name}/")))
    }

    /// Entries in canonical order
    pub fn entries(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
            return Err(Error::parse(
                "tree entry",
                format!("invalid entry name '{name}'"),
            ));
        }

        Ok(())
    }
}

impl Packable for Tree {
    fn serialize(&self) -> Result<Bytes> {
        let mut content = Vec::new();

        for entry in self.entries.values() {
            content.extend_from_slice(entry.mode.as_str().as_bytes());
            content.push(b' ');
            content.extend_from_slice(entry.name.as_bytes());
            content.push(0);
            entry
                .oid
                .write_raw_to(&mut content)
                .map_err(|e| Error::parse("tree object", e.to_string()))?;
        }

        Ok(content.into())
    }
}

impl Unpackable for Tree {
    fn deserialize(mut reader: impl BufRead, algorithm: HashAlgorithm) -> Result<Self> {
        let invalid = |reason: String| Error::parse("tree object", reason);
        let mut tree = Tree::new();

        // Reuse scratch buffers to reduce allocs
        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            // Read "mode " (space-delimited)
            let n = reader
                .read_until(b' ', &mut mode_bytes)
                .map_err(|e| invalid(e.to_string()))?;
            if n == 0 {
                break; // clean EOF: no more entries
            }
            if mode_bytes.pop() != Some(b' ') {
                return Err(invalid("unexpected end of data in entry mode".to_string()));
            }

            let mode = std::str::from_utf8(&mode_bytes)
                .ok()
                .and_then(EntryMode::from_octal_str)
                .ok_or_else(|| {
                    invalid(format!(
                        "invalid entry mode '{}'",
                        String::from_utf8_lossy(&mode_bytes)
                    ))
                })?;

            // Read "name\0"
            name_bytes.clear();
            reader
                .read_until(b'\0', &mut name_bytes)
                .map_err(|e| invalid(e.to_string()))?;
            if name_bytes.pop() != Some(b'\0') {
                return Err(invalid("unexpected end of data in entry name".to_string()));
            }
            let name = std::str::from_utf8(&name_bytes)
                .map_err(|_| invalid("entry name is not valid UTF-8".to_string()))?
                .to_owned();

            let oid = ObjectId::read_raw_from(algorithm, &mut reader)
                .map_err(|_| invalid(format!("truncated object id for entry '{name}'")))?;

            tree.insert(name, mode, oid)
                .map_err(|e| match e {
                    Error::Parse { reason, .. } => invalid(reason),
                    other => other,
                })?;
        }

        Ok(tree)
    }
}

impl Object for Tree {
    fn object_kind(&self) -> ObjectKind {
        ObjectKind::Tree
    }
}
