#![allow(dead_code)]

use assert_fs::TempDir;
use bitstore::{
    Commit, EntryMode, HashAlgorithm, ObjectId, ObjectKind, Repository, Signature, Tree,
};
use fake::Fake;
use fake::faker::internet::en::FreeEmail;
use fake::faker::lorem::en::Words;
use fake::faker::name::en::Name;
use rstest::fixture;
use std::path::Path;

#[fixture]
pub fn repository_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

/// A freshly initialized non-bare SHA-1 repository and the directory holding it
pub struct TestRepository {
    pub dir: TempDir,
    pub repository: Repository,
}

impl TestRepository {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the loose object file for `oid`
    pub fn object_file(&self, oid: &ObjectId) -> std::path::PathBuf {
        self.repository
            .object_dir()
            .expect("Repository is closed")
            .join(oid.to_path())
    }
}

#[fixture]
pub fn repository(repository_dir: TempDir) -> TestRepository {
    let repository =
        Repository::init(repository_dir.path(), false).expect("Failed to init repository");

    TestRepository {
        dir: repository_dir,
        repository,
    }
}

#[fixture]
pub fn sha256_repository(repository_dir: TempDir) -> TestRepository {
    let repository = Repository::init_with(repository_dir.path(), false, HashAlgorithm::Sha256)
        .expect("Failed to init repository");

    TestRepository {
        dir: repository_dir,
        repository,
    }
}

#[fixture]
pub fn signature() -> Signature {
    let name = Name().fake::<String>();
    let email = FreeEmail().fake::<String>();

    Signature::from_unix(name, email, 1_700_000_000, 120).expect("valid signature")
}

#[fixture]
pub fn content() -> String {
    Words(5..10).fake::<Vec<String>>().join(" ")
}

/// Store a commit holding a single file, returning its ID
pub fn write_commit(
    repository: &Repository,
    parents: Vec<ObjectId>,
    file_content: &str,
    message: &str,
    author: &Signature,
) -> ObjectId {
    let blob = repository
        .write(ObjectKind::Blob, file_content.as_bytes())
        .expect("Failed to write blob");

    let mut tree = Tree::new();
    tree.insert("file.txt", EntryMode::Regular, blob)
        .expect("Failed to build tree");
    let tree = repository
        .write_object(&tree)
        .expect("Failed to write tree");

    let commit = Commit::new(parents, tree, author.clone(), message.to_string());
    repository
        .write_object(&commit)
        .expect("Failed to write commit")
}

/// Overwrite a stored object's file with arbitrary bytes
pub fn overwrite_object_file(path: &Path, content: &[u8]) {
    assert!(path.is_file(), "{} is not stored", path.display());
    std::fs::write(path, content).expect("Failed to overwrite object");
}

/// zlib-compress `content` the way loose objects are stored
pub fn deflate(content: &[u8]) -> Vec<u8> {
    use std::io::Write;

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(content).expect("Failed to compress");
    encoder.finish().expect("Failed to compress")
}

pub fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}
