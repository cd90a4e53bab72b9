use crate::common::{TestRepository, repository, repository_dir};
use assert_fs::TempDir;
use assert_fs::prelude::{FileWriteStr, PathChild, PathCreateDir};
use bitstore::{ErrorKind, HashAlgorithm, ObjectKind, Repository};
use pretty_assertions::assert_eq;
use rstest::rstest;

mod common;

#[rstest]
fn init_creates_the_git_layout(repository_dir: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    let sut = Repository::init(repository_dir.path(), false)?;
    let git_dir = repository_dir.path().canonicalize()?.join(".git");

    for dir in ["objects/info", "objects/pack", "refs/heads", "refs/tags"] {
        assert!(git_dir.join(dir).is_dir(), "{dir} is missing");
    }
    assert_eq!(std::fs::read_to_string(git_dir.join("HEAD"))?, "ref: refs/heads/master\n");
    assert!(git_dir.join("description").is_file());

    let config = std::fs::read_to_string(git_dir.join("config"))?;
    assert!(config.contains("repositoryformatversion = 0"));
    assert!(config.contains("bare = false"));

    assert_eq!(sut.git_dir()?, git_dir);
    assert_eq!(sut.object_dir()?, git_dir.join("objects"));
    assert_eq!(sut.work_tree()?, Some(repository_dir.path().canonicalize()?.as_path()));
    assert_eq!(sut.index_path()?, Some(git_dir.join("index").as_path()));
    assert!(!sut.is_bare()?);
    assert_eq!(sut.hash_algorithm()?, HashAlgorithm::Sha1);

    Ok(())
}

#[rstest]
fn init_bare_puts_the_layout_at_the_root(
    repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let sut = Repository::init(repository_dir.path(), true)?;

    assert!(sut.is_bare()?);
    assert_eq!(sut.work_tree()?, None);
    assert_eq!(sut.index_path()?, None);
    assert_eq!(sut.git_dir()?, repository_dir.path().canonicalize()?);
    assert!(!repository_dir.path().join(".git").exists());
    assert_eq!(sut.config()?.get_bool("core.bare"), Some(true));

    let reopened = Repository::open(repository_dir.path())?;
    assert!(reopened.is_bare()?);

    Ok(())
}

#[rstest]
fn init_twice_fails(repository_dir: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    Repository::init(repository_dir.path(), false)?;

    let error = Repository::init(repository_dir.path(), false).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::AlreadyExists);

    Ok(())
}

#[rstest]
fn sha256_repository_is_reopened_with_sha256(
    repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let oid = {
        let sut = Repository::init_with(repository_dir.path(), false, HashAlgorithm::Sha256)?;
        sut.write(ObjectKind::Blob, b"hello\n")?
    };

    let config = std::fs::read_to_string(repository_dir.path().join(".git/config"))?;
    assert!(config.contains("objectformat = sha256"));
    assert!(config.contains("repositoryformatversion = 1"));

    let sut = Repository::open(repository_dir.path())?;
    assert_eq!(sut.hash_algorithm()?, HashAlgorithm::Sha256);
    assert_eq!(oid.to_hex().len(), 64);
    assert_eq!(sut.read_header(&oid)?.size, 6);

    Ok(())
}

#[rstest]
fn unknown_object_format_is_an_invalid_layout(
    repository: TestRepository,
) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = repository.repository.git_dir()?.join("config");
    let config = std::fs::read_to_string(&config_path)?;
    std::fs::write(&config_path, format!("{config}[extensions]\n\tobjectformat = md5\n"))?;

    let error = Repository::open(repository.path()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidLayout);

    Ok(())
}

#[rstest]
fn open_from_the_work_tree_or_the_git_dir(
    repository: TestRepository,
) -> Result<(), Box<dyn std::error::Error>> {
    let git_dir = repository.repository.git_dir()?.to_path_buf();

    let from_work_tree = Repository::open(repository.path())?;
    assert_eq!(from_work_tree.git_dir()?, git_dir);
    assert!(!from_work_tree.is_bare()?);

    // the .git directory itself looks like a bare layout
    let from_git_dir = Repository::open(&git_dir)?;
    assert_eq!(from_git_dir.git_dir()?, git_dir);

    Ok(())
}

#[rstest]
fn open_follows_a_gitdir_file(repository_dir: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    let storage = repository_dir.child("storage");
    storage.create_dir_all()?;
    Repository::init(storage.path(), false)?;

    let work_tree = repository_dir.child("work");
    work_tree.create_dir_all()?;
    work_tree.child(".git").write_str("gitdir: ../storage/.git\n")?;

    let sut = Repository::open(work_tree.path())?;
    assert_eq!(sut.git_dir()?, storage.path().join(".git").canonicalize()?);
    assert_eq!(sut.work_tree()?, Some(work_tree.path().canonicalize()?.as_path()));

    Ok(())
}

#[rstest]
fn open_outside_a_repository_fails(
    repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let error = Repository::open(repository_dir.path()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotARepository);

    let error = Repository::open(repository_dir.path().join("missing")).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotARepository);

    repository_dir.child(".git").write_str("not a gitdir line\n")?;
    let error = Repository::open(repository_dir.path()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotARepository);

    Ok(())
}

#[rstest]
fn open_explicit_with_separate_parts(
    repository: TestRepository,
) -> Result<(), Box<dyn std::error::Error>> {
    let git_dir = repository.repository.git_dir()?.to_path_buf();
    let oid = repository.repository.write(ObjectKind::Blob, b"shared")?;

    let sut = Repository::open_explicit(
        &git_dir,
        git_dir.join("objects"),
        Some(git_dir.join("index").as_path()),
        Some(repository.path()),
    )?;

    assert!(sut.exists(&oid)?);
    assert_eq!(sut.index_path()?, Some(git_dir.join("index").as_path()));
    assert!(!sut.is_bare()?);

    Ok(())
}

#[rstest]
fn open_explicit_rejects_inconsistent_layouts(
    repository: TestRepository,
) -> Result<(), Box<dyn std::error::Error>> {
    let git_dir = repository.repository.git_dir()?.to_path_buf();
    let nowhere = repository.path().join("nowhere");

    let cases = [
        Repository::open_explicit(repository.path(), git_dir.join("objects"), None, None),
        Repository::open_explicit(&git_dir, &nowhere, None, None),
        Repository::open_explicit(&git_dir, git_dir.join("objects"), Some(nowhere.join("index").as_path()), None),
        Repository::open_explicit(&git_dir, git_dir.join("objects"), None, Some(nowhere.as_path())),
    ];

    for result in cases {
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidLayout);
    }

    Ok(())
}

#[rstest]
fn closed_repository_refuses_every_operation(
    repository: TestRepository,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut sut = repository.repository;
    let oid = sut.write(ObjectKind::Blob, b"before close")?;

    sut.close()?;
    assert!(sut.is_closed());

    assert_eq!(sut.exists(&oid).unwrap_err().kind(), ErrorKind::UseAfterClose);
    assert_eq!(sut.read(&oid).unwrap_err().kind(), ErrorKind::UseAfterClose);
    assert_eq!(sut.lookup(&oid, None).unwrap_err().kind(), ErrorKind::UseAfterClose);
    assert_eq!(sut.head().unwrap_err().kind(), ErrorKind::UseAfterClose);
    assert_eq!(
        sut.write(ObjectKind::Blob, b"after").unwrap_err().kind(),
        ErrorKind::UseAfterClose
    );
    assert_eq!(sut.close().unwrap_err().kind(), ErrorKind::UseAfterClose);

    assert_eq!(sut.git_dir().unwrap_err().kind(), ErrorKind::UseAfterClose);
    assert_eq!(sut.object_dir().unwrap_err().kind(), ErrorKind::UseAfterClose);
    assert_eq!(sut.index_path().unwrap_err().kind(), ErrorKind::UseAfterClose);
    assert_eq!(sut.work_tree().unwrap_err().kind(), ErrorKind::UseAfterClose);
    assert_eq!(sut.is_bare().unwrap_err().kind(), ErrorKind::UseAfterClose);
    assert_eq!(sut.hash_algorithm().unwrap_err().kind(), ErrorKind::UseAfterClose);
    assert_eq!(sut.config().unwrap_err().kind(), ErrorKind::UseAfterClose);

    Ok(())
}
