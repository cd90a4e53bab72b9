//! Reference storage
//!
//! References live either as loose files under the git directory
//! (`HEAD`, `refs/heads/main`, ...) or as lines of `packed-refs`. A loose file
//! shadows a packed entry of the same name.
//!
//! ## Updates
//!
//! Every write takes `<ref>.lock` with exclusive create, writes the new content
//! into it and renames it over the reference, so readers never see a torn
//! value and concurrent writers of the same reference fail instead of racing.

use crate::artifacts::core::lock_file::LockFile;
use crate::artifacts::objects::object_id::{HashAlgorithm, ObjectId};
use crate::artifacts::refs::packed_refs::{PACKED_REFS_FILE, PackedRefs};
use crate::artifacts::refs::reference::{Reference, ReferenceTarget};
use crate::artifacts::refs::reference_name::{REFS_PREFIX, ReferenceName};
use crate::errors::{Error, Result, StorageContext};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const HEAD_REF_NAME: &str = "HEAD";

/// Longest chain of symbolic references that is followed
pub const MAX_SYMREF_DEPTH: usize = 5;

#[derive(Debug)]
pub struct Refs {
    path: Box<Path>,
    algorithm: HashAlgorithm,
}

impl Refs {
    pub fn new(path: Box<Path>, algorithm: HashAlgorithm) -> Self {
        Refs { path, algorithm }
    }

    /// The reference as stored, without following symbolic targets
    pub fn lookup(&self, name: &str) -> Result<Reference> {
        let name = ReferenceName::try_parse(name)?;

        if let Some(target) = self.read_loose(&name)? {
            return Ok(Reference::new(name.into_string(), target));
        }

        match self.read_packed()?.get(name.as_str()) {
            Some(entry) => Ok(Reference::new(
                name.into_string(),
                ReferenceTarget::Direct(entry.oid),
            )),
            None => Err(Error::ReferenceNotFound(name.into_string())),
        }
    }

    /// Look up `name`; with `peel`, follow symbolic targets (at most
    /// [`MAX_SYMREF_DEPTH`] hops) to the direct reference at the end.
    pub fn resolve(&self, name: &str, peel: bool) -> Result<Reference> {
        let mut reference = self.lookup(name)?;
        if !peel {
            return Ok(reference);
        }

        let mut hops = 0;
        while let ReferenceTarget::Symbolic(target) = reference.target() {
            if hops == MAX_SYMREF_DEPTH {
                return Err(Error::ResolutionLoop {
                    start: name.to_string(),
                    limit: MAX_SYMREF_DEPTH,
                });
            }

            tracing::trace!(from = reference.name(), to = %target, "following symbolic reference");
            reference = self.lookup(target)?;
            hops += 1;
        }

        Ok(reference)
    }

    pub fn head(&self) -> Result<Reference> {
        self.resolve(HEAD_REF_NAME, true)
    }

    pub fn set(&self, name: &str, oid: &ObjectId) -> Result<()> {
        let name = ReferenceName::try_parse(name)?;
        self.write_loose(&name, &ReferenceTarget::Direct(*oid))?;

        tracing::debug!(name = %name, oid = %oid, "updated reference");
        Ok(())
    }

    pub fn set_symbolic(&self, name: &str, target: &str) -> Result<()> {
        let name = ReferenceName::try_parse(name)?;
        let target = ReferenceName::try_parse(target)?;
        self.write_loose(&name, &ReferenceTarget::Symbolic(target.into_string()))?;

        tracing::debug!(name = %name, "updated symbolic reference");
        Ok(())
    }

    /// Remove a reference from both the loose files and `packed-refs`
    ///
    /// Both locks are taken before anything changes. `packed-refs` is rewritten
    /// first and the loose file removed last, so a reader never sees the packed
    /// value the loose file was shadowing, and a failed delete changes nothing.
    pub fn delete(&self, name: &str) -> Result<()> {
        let name = ReferenceName::try_parse(name)?;
        let loose_path = self.ref_path(&name);
        let packed_path = self.packed_refs_path();

        let packed_update = if self.read_packed()?.get(name.as_str()).is_some() {
            let mut lock = LockFile::acquire(&packed_path)?;
            // re-read under the lock
            let mut packed = self.read_packed()?;
            match packed.remove(name.as_str()) {
                Some(_) => {
                    lock.write_all(packed.serialize().as_bytes())?;
                    Some(lock)
                }
                None => None,
            }
        } else {
            None
        };

        let loose_lock = if loose_path.is_file() {
            Some(LockFile::acquire(&loose_path)?)
        } else {
            None
        };

        if packed_update.is_none() && loose_lock.is_none() {
            return Err(Error::ReferenceNotFound(name.into_string()));
        }

        if let Some(lock) = packed_update {
            lock.commit()?;
        }

        if let Some(lock) = loose_lock {
            std::fs::remove_file(&loose_path)
                .with_context(|| format!("Unable to delete {}", loose_path.display()))?;
            lock.rollback();
            self.prune_empty_parent_dirs(&loose_path)?;
        }

        tracing::debug!(name = %name, "deleted reference");
        Ok(())
    }

    /// Names of all loose and packed references under `refs/`, sorted and
    /// optionally restricted to those starting with `prefix`.
    pub fn list(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let mut names = BTreeSet::new();

        for entry in WalkDir::new(self.refs_path()) {
            let entry = entry.map_err(|error| {
                let context = format!("Unable to list references in {}", self.path.display());
                match error.into_io_error() {
                    Some(source) => Error::Storage { context, source },
                    None => Error::InvalidLayout {
                        path: self.refs_path(),
                        reason: "filesystem loop under refs/".to_string(),
                    },
                }
            })?;

            if !entry.file_type().is_file() || LockFile::is_lock_path(entry.path()) {
                continue;
            }

            if let Ok(relative_path) = entry.path().strip_prefix(&self.path) {
                let name = relative_path
                    .components()
                    .map(|component| component.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                names.insert(name);
            }
        }

        let packed = self.read_packed()?;
        names.extend(packed.names().map(str::to_string));

        Ok(names
            .into_iter()
            .filter(|name| prefix.is_none_or(|prefix| name.starts_with(prefix)))
            .collect())
    }

    fn read_loose(&self, name: &ReferenceName) -> Result<Option<ReferenceTarget>> {
        let path = self.ref_path(name);

        if !path.is_file() {
            return Ok(None);
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => ReferenceTarget::parse(name.as_str(), &content, self.algorithm).map(Some),
            // deleted between the check and the read
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => {
                Err(error).with_context(|| format!("Unable to read reference {}", path.display()))
            }
        }
    }

    fn read_packed(&self) -> Result<PackedRefs> {
        let path = self.packed_refs_path();

        match std::fs::read_to_string(&path) {
            Ok(content) => PackedRefs::parse(&content, self.algorithm),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(PackedRefs::default()),
            Err(error) => Err(error).with_context(|| format!("Unable to read {}", path.display())),
        }
    }

    fn write_loose(&self, name: &ReferenceName, target: &ReferenceTarget) -> Result<()> {
        let path = self.ref_path(name);

        let mut lock = LockFile::acquire(&path)?;
        lock.write_all(target.to_file_content().as_bytes())?;
        lock.commit()
    }

    fn prune_empty_parent_dirs(&self, path: &Path) -> Result<()> {
        let refs_path = self.refs_path();

        // refs/ and its direct children (heads/, tags/, ...) are kept
        if let Some(parent) = path.parent()
            && parent.starts_with(&refs_path)
            && parent != refs_path
            && parent.parent() != Some(refs_path.as_path())
            && parent
                .read_dir()
                .with_context(|| format!("Unable to list {}", parent.display()))?
                .next()
                .is_none()
        {
            std::fs::remove_dir(parent).with_context(|| {
                format!("Unable to remove empty directory {}", parent.display())
            })?;
            self.prune_empty_parent_dirs(parent)?;
        }

        Ok(())
    }

    fn ref_path(&self, name: &ReferenceName) -> PathBuf {
        name.as_str()
            .split('/')
            .fold(self.path.to_path_buf(), |path, component| path.join(component))
    }

    pub fn refs_path(&self) -> PathBuf {
        self.path.join(REFS_PREFIX.trim_end_matches('/'))
    }

    pub fn packed_refs_path(&self) -> PathBuf {
        self.path.join(PACKED_REFS_FILE)
    }
}
