//! Repository handle
//!
//! A [`Repository`] owns the object database, the reference store, the object
//! cache and the configuration of one git directory. After [`Repository::close`]
//! every operation fails with [`Error::UseAfterClose`].

use crate::areas::database::Database;
use crate::areas::object_model::{ObjectCache, ObjectModel};
use crate::areas::refs::{HEAD_REF_NAME, Refs};
use crate::artifacts::config::{CONFIG_FILE_NAME, Config};
use crate::artifacts::objects::object::{Object, RawObject, TypedObject};
use crate::artifacts::objects::object_id::{HashAlgorithm, ObjectId};
use crate::artifacts::objects::object_kind::{ObjectHeader, ObjectKind};
use crate::artifacts::objects::signature::Signature;
use crate::artifacts::refs::reference::Reference;
use crate::artifacts::refs::reference_name::HEADS_PREFIX;
use crate::errors::{Error, Result, StorageContext};
use std::path::{Path, PathBuf};

pub const DOT_GIT: &str = ".git";
pub const OBJECTS_DIR: &str = "objects";
pub const REFS_DIR: &str = "refs";
pub const INDEX_FILE: &str = "index";
pub const DEFAULT_BRANCH: &str = "master";

const GITDIR_PREFIX: &str = "gitdir:";
const DESCRIPTION: &str =
    "Unnamed repository; edit this file 'description' to name the repository.\n";

#[derive(Debug)]
struct Components {
    database: Database,
    refs: Refs,
    cache: ObjectCache,
    config: Config,
}

#[derive(Debug)]
pub struct Repository {
    git_dir: Box<Path>,
    object_dir: Box<Path>,
    index_path: Option<Box<Path>>,
    work_tree: Option<Box<Path>>,
    algorithm: HashAlgorithm,
    components: Option<Components>,
}

/// `HEAD` file plus `objects/` and `refs/` directories
fn is_git_dir(path: &Path) -> bool {
    path.join(HEAD_REF_NAME).is_file()
        && path.join(OBJECTS_DIR).is_dir()
        && path.join(REFS_DIR).is_dir()
}

fn canonicalize(path: &Path) -> Result<PathBuf> {
    path.canonicalize()
        .with_context(|| format!("Unable to resolve path {}", path.display()))
}

impl Repository {
    /// Open the repository at `path`: a work tree with a `.git` directory, a
    /// work tree with a `.git` file pointing elsewhere (`gitdir: <dir>`), or a
    /// bare git directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let not_a_repository = || Error::NotARepository(path.to_path_buf());

        let path = path.canonicalize().map_err(|_| not_a_repository())?;
        let dot_git = path.join(DOT_GIT);

        let (git_dir, work_tree) = if dot_git.is_dir() && is_git_dir(&dot_git) {
            (dot_git, Some(path.clone()))
        } else if dot_git.is_file() {
            let git_dir = Self::read_gitdir_file(&dot_git)?;
            if !is_git_dir(&git_dir) {
                return Err(not_a_repository());
            }
            (canonicalize(&git_dir)?, Some(path.clone()))
        } else if is_git_dir(&path) {
            (path.clone(), None)
        } else {
            return Err(not_a_repository());
        };

        let config = Config::load(&git_dir.join(CONFIG_FILE_NAME))?;
        let work_tree = work_tree.filter(|_| !config.is_bare());
        let index_path = work_tree.as_ref().map(|_| git_dir.join(INDEX_FILE));
        let object_dir = git_dir.join(OBJECTS_DIR);

        let repository = Self::assemble(git_dir, object_dir, index_path, work_tree, config)?;
        tracing::debug!(
            git_dir = %repository.git_dir.display(),
            bare = repository.work_tree.is_none(),
            algorithm = %repository.algorithm,
            "opened repository"
        );

        Ok(repository)
    }

    /// Open a repository whose parts live in explicitly given places
    pub fn open_explicit(
        git_dir: impl AsRef<Path>,
        object_dir: impl AsRef<Path>,
        index_file: Option<&Path>,
        work_tree: Option<&Path>,
    ) -> Result<Self> {
        let git_dir = git_dir.as_ref();
        let object_dir = object_dir.as_ref();
        let invalid = |path: &Path, reason: &str| Error::InvalidLayout {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        if !git_dir.join(HEAD_REF_NAME).is_file() || !git_dir.join(REFS_DIR).is_dir() {
            return Err(invalid(git_dir, "git directory needs HEAD and refs/"));
        }
        if !object_dir.is_dir() {
            return Err(invalid(object_dir, "object directory does not exist"));
        }
        if let Some(index_file) = index_file {
            let parent_exists = index_file
                .parent()
                .is_some_and(|parent| parent.as_os_str().is_empty() || parent.is_dir());
            if !parent_exists {
                return Err(invalid(index_file, "index file directory does not exist"));
            }
        }
        if let Some(work_tree) = work_tree
            && !work_tree.is_dir()
        {
            return Err(invalid(work_tree, "work tree does not exist"));
        }

        let git_dir = canonicalize(git_dir)?;
        let config = Config::load(&git_dir.join(CONFIG_FILE_NAME))?;

        Self::assemble(
            git_dir,
            canonicalize(object_dir)?,
            index_file.map(Path::to_path_buf),
            work_tree.map(canonicalize).transpose()?,
            config,
        )
    }

    /// Create a SHA-1 repository at `path` and open it
    pub fn init(path: impl AsRef<Path>, bare: bool) -> Result<Self> {
        Self::init_with(path, bare, HashAlgorithm::Sha1)
    }

    pub fn init_with(path: impl AsRef<Path>, bare: bool, algorithm: HashAlgorithm) -> Result<Self> {
        let path = path.as_ref();
        let git_dir = if bare {
            path.to_path_buf()
        } else {
            path.join(DOT_GIT)
        };

        if is_git_dir(&git_dir) || (!bare && path.join(DOT_GIT).is_file()) {
            return Err(Error::AlreadyExists(git_dir));
        }

        for dir in [
            git_dir.join(OBJECTS_DIR).join("info"),
            git_dir.join(OBJECTS_DIR).join("pack"),
            git_dir.join(REFS_DIR).join("heads"),
            git_dir.join(REFS_DIR).join("tags"),
        ] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Unable to create directory {}", dir.display()))?;
        }

        let refs = Refs::new(git_dir.clone().into_boxed_path(), algorithm);
        refs.set_symbolic(HEAD_REF_NAME, &format!("{HEADS_PREFIX}{DEFAULT_BRANCH}"))?;

        let config_path = git_dir.join(CONFIG_FILE_NAME);
        Config::for_new_repository(bare, algorithm)?.save(Some(&config_path))?;

        let description_path = git_dir.join("description");
        std::fs::write(&description_path, DESCRIPTION)
            .with_context(|| format!("Unable to write {}", description_path.display()))?;

        tracing::debug!(git_dir = %git_dir.display(), bare, algorithm = %algorithm, "initialized repository");

        Self::open(path)
    }

    fn read_gitdir_file(dot_git: &Path) -> Result<PathBuf> {
        let content = std::fs::read_to_string(dot_git)
            .with_context(|| format!("Unable to read {}", dot_git.display()))?;

        let target = content
            .trim()
            .strip_prefix(GITDIR_PREFIX)
            .map(str::trim)
            .filter(|target| !target.is_empty())
            .ok_or_else(|| Error::NotARepository(dot_git.to_path_buf()))?;

        // relative targets are relative to the directory holding the .git file
        Ok(match dot_git.parent() {
            Some(parent) => parent.join(target),
            None => PathBuf::from(target),
        })
    }

    fn assemble(
        git_dir: PathBuf,
        object_dir: PathBuf,
        index_path: Option<PathBuf>,
        work_tree: Option<PathBuf>,
        config: Config,
    ) -> Result<Self> {
        let algorithm = config.hash_algorithm()?;

        let database = Database::new(object_dir.clone().into_boxed_path(), algorithm);
        let refs = Refs::new(git_dir.clone().into_boxed_path(), algorithm);

        Ok(Repository {
            git_dir: git_dir.into_boxed_path(),
            object_dir: object_dir.into_boxed_path(),
            index_path: index_path.map(PathBuf::into_boxed_path),
            work_tree: work_tree.map(PathBuf::into_boxed_path),
            algorithm,
            components: Some(Components {
                database,
                refs,
                cache: ObjectCache::new(),
                config,
            }),
        })
    }

    /// Release the database, references and cache. Closing twice is an error.
    pub fn close(&mut self) -> Result<()> {
        self.components.take().ok_or(Error::UseAfterClose)?;

        tracing::debug!(git_dir = %self.git_dir.display(), "closed repository");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.components.is_none()
    }

    fn components(&self) -> Result<&Components> {
        self.components.as_ref().ok_or(Error::UseAfterClose)
    }

    pub fn database(&self) -> Result<&Database> {
        Ok(&self.components()?.database)
    }

    pub fn refs(&self) -> Result<&Refs> {
        Ok(&self.components()?.refs)
    }

    pub fn config(&self) -> Result<&Config> {
        Ok(&self.components()?.config)
    }

    pub fn objects(&self) -> Result<ObjectModel<'_>> {
        let components = self.components()?;
        Ok(ObjectModel::new(&components.database, &components.cache))
    }

    pub fn git_dir(&self) -> Result<&Path> {
        self.components()?;
        Ok(&self.git_dir)
    }

    pub fn object_dir(&self) -> Result<&Path> {
        self.components()?;
        Ok(&self.object_dir)
    }

    pub fn index_path(&self) -> Result<Option<&Path>> {
        self.components()?;
        Ok(self.index_path.as_deref())
    }

    pub fn work_tree(&self) -> Result<Option<&Path>> {
        self.components()?;
        Ok(self.work_tree.as_deref())
    }

    pub fn is_bare(&self) -> Result<bool> {
        self.components()?;
        Ok(self.work_tree.is_none())
    }

    pub fn hash_algorithm(&self) -> Result<HashAlgorithm> {
        self.components()?;
        Ok(self.algorithm)
    }

    // object database

    pub fn exists(&self, object_id: &ObjectId) -> Result<bool> {
        self.database()?.exists(object_id)
    }

    pub fn read_header(&self, object_id: &ObjectId) -> Result<ObjectHeader> {
        self.database()?.read_header(object_id)
    }

    pub fn read(&self, object_id: &ObjectId) -> Result<RawObject> {
        self.database()?.read(object_id)
    }

    pub fn write(&self, kind: ObjectKind, payload: &[u8]) -> Result<ObjectId> {
        self.database()?.write(kind, payload)
    }

    // object model

    pub fn peek(&self, object_id: &ObjectId) -> Result<ObjectHeader> {
        self.objects()?.peek(object_id)
    }

    pub fn materialize(&self, object_id: &ObjectId) -> Result<TypedObject> {
        self.objects()?.materialize(object_id)
    }

    pub fn lookup(&self, object_id: &ObjectId, expected: Option<ObjectKind>) -> Result<TypedObject> {
        self.objects()?.lookup(object_id, expected)
    }

    pub fn lookup_by_name(&self, name: &str, expected: Option<ObjectKind>) -> Result<TypedObject> {
        self.objects()?.lookup_by_name(name, expected)
    }

    pub fn peel(&self, object_id: &ObjectId) -> Result<TypedObject> {
        self.objects()?.peel(object_id)
    }

    pub fn create_tag(
        &self,
        target: &ObjectId,
        name: &str,
        message: &str,
        tagger: &Signature,
    ) -> Result<ObjectId> {
        self.objects()?.create_tag(target, name, message, tagger)
    }

    pub fn write_object(&self, object: &impl Object) -> Result<ObjectId> {
        self.objects()?.write_object(object)
    }

    // references

    pub fn resolve(&self, name: &str, peel: bool) -> Result<Reference> {
        self.refs()?.resolve(name, peel)
    }

    pub fn head(&self) -> Result<Reference> {
        self.refs()?.head()
    }

    pub fn set_reference(&self, name: &str, object_id: &ObjectId) -> Result<()> {
        self.refs()?.set(name, object_id)
    }

    pub fn set_symbolic_reference(&self, name: &str, target: &str) -> Result<()> {
        self.refs()?.set_symbolic(name, target)
    }

    pub fn delete_reference(&self, name: &str) -> Result<()> {
        self.refs()?.delete(name)
    }

    pub fn references(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        self.refs()?.list(prefix)
    }
}
