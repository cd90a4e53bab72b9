use crate::common::{TestRepository, content, git_available, repository, signature, write_commit};
use assert_cmd::Command;
use bitstore::{ObjectId, ObjectKind, Signature};
use predicates::prelude::predicate;
use pretty_assertions::assert_eq;
use rstest::rstest;

mod common;

fn git(repository: &TestRepository, args: &[&str]) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(repository.path()).args(args);
    cmd
}

#[rstest]
fn git_reads_objects_we_write(
    repository: TestRepository,
    signature: Signature,
    content: String,
) -> Result<(), Box<dyn std::error::Error>> {
    if !git_available() {
        eprintln!("git is not installed, skipping");
        return Ok(());
    }

    let sut = &repository.repository;
    let commit = write_commit(sut, vec![], &content, "Initial commit\n", &signature);
    let tag = sut.create_tag(&commit, "v1.0", "Release\n", &signature)?;
    sut.set_reference("refs/heads/master", &commit)?;
    sut.set_reference("refs/tags/v1.0", &tag)?;

    let file = git(&repository, &["cat-file", "-p", "HEAD:file.txt"]).output()?;
    assert!(file.status.success());
    assert_eq!(String::from_utf8(file.stdout)?, content);

    git(&repository, &["cat-file", "-t", &tag.to_hex()])
        .assert()
        .success()
        .stdout(predicate::str::diff("tag\n"));
    git(&repository, &["fsck", "--strict", "--no-dangling"])
        .assert()
        .success();

    let peeled = git(&repository, &["rev-parse", "v1.0^{commit}"]).output()?.stdout;
    assert_eq!(String::from_utf8(peeled)?.trim(), commit.to_hex());

    Ok(())
}

#[rstest]
fn we_read_objects_git_writes(
    repository: TestRepository,
    content: String,
) -> Result<(), Box<dyn std::error::Error>> {
    if !git_available() {
        eprintln!("git is not installed, skipping");
        return Ok(());
    }

    std::fs::write(repository.path().join("file.txt"), &content)?;
    let output = git(&repository, &["hash-object", "-w", "file.txt"]).output()?;
    let oid = ObjectId::try_parse(String::from_utf8(output.stdout)?.trim())?;

    let sut = &repository.repository;
    assert_eq!(sut.read_header(&oid)?.kind, ObjectKind::Blob);
    assert_eq!(&sut.read(&oid)?.payload[..], content.as_bytes());
    assert_eq!(sut.database()?.hash(ObjectKind::Blob, content.as_bytes()), oid);

    Ok(())
}
