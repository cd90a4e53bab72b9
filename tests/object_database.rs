use crate::common::{
    TestRepository, content, deflate, overwrite_object_file, repository, repository_dir,
    sha256_repository,
};
use assert_fs::TempDir;
use bitstore::{ErrorKind, HashAlgorithm, ObjectHeader, ObjectId, ObjectKind, Repository};
use fake::Fake;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;
use std::time::Duration;

mod common;

#[rstest]
fn written_object_round_trips(
    repository: TestRepository,
    content: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let sut = &repository.repository;

    let oid = sut.write(ObjectKind::Blob, content.as_bytes())?;

    assert!(sut.exists(&oid)?);
    assert_eq!(
        sut.read_header(&oid)?,
        ObjectHeader {
            kind: ObjectKind::Blob,
            size: content.len()
        }
    );

    let raw = sut.read(&oid)?;
    assert_eq!(raw.kind, ObjectKind::Blob);
    assert_eq!(&raw.payload[..], content.as_bytes());

    Ok(())
}

#[rstest]
fn writing_the_same_content_twice_keeps_one_copy(
    repository: TestRepository,
    content: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let sut = &repository.repository;

    let first = sut.write(ObjectKind::Blob, content.as_bytes())?;
    let stored = std::fs::read(repository.object_file(&first))?;
    let second = sut.write(ObjectKind::Blob, content.as_bytes())?;

    assert_eq!(first, second);
    assert_eq!(std::fs::read(repository.object_file(&second))?, stored);

    let fan_out_dir = repository.object_file(&first);
    let fan_out_dir = fan_out_dir.parent().ok_or("object file has a parent")?;
    assert_eq!(std::fs::read_dir(fan_out_dir)?.count(), 1);

    Ok(())
}

#[rstest]
fn init_write_exists_read_header_scenario(
    repository: TestRepository,
) -> Result<(), Box<dyn std::error::Error>> {
    let sut = &repository.repository;

    let oid = sut.write(ObjectKind::Blob, b"hello\n")?;

    assert_eq!(oid.to_hex(), "ce013625030ba8dba906f756967f9e9ca394464a");
    assert!(sut.exists(&oid)?);
    assert_eq!(sut.read_header(&oid)?.size, 6);
    assert_eq!(sut.read_header(&oid)?.kind, ObjectKind::Blob);

    Ok(())
}

#[rstest]
fn swapped_content_is_detected_as_corrupt(
    repository: TestRepository,
) -> Result<(), Box<dyn std::error::Error>> {
    let sut = &repository.repository;

    let victim = sut.write(ObjectKind::Blob, b"original")?;
    let other = sut.write(ObjectKind::Blob, b"replaced")?;
    let other_bytes = std::fs::read(repository.object_file(&other))?;

    overwrite_object_file(&repository.object_file(&victim), &other_bytes);

    assert_eq!(sut.read(&victim).unwrap_err().kind(), ErrorKind::Corrupt);
    // the header alone still looks fine
    assert_eq!(sut.read_header(&victim)?.kind, ObjectKind::Blob);

    Ok(())
}

#[rstest]
#[case::not_zlib(b"definitely not zlib".to_vec())]
#[case::unknown_kind(deflate(b"banana 3\0abc"))]
#[case::missing_nul(deflate(b"blob 3abc"))]
fn garbled_object_files_are_corrupt(
    repository: TestRepository,
    #[case] stored: Vec<u8>,
) -> Result<(), Box<dyn std::error::Error>> {
    let sut = &repository.repository;
    let oid = sut.write(ObjectKind::Blob, b"abc")?;

    overwrite_object_file(&repository.object_file(&oid), &stored);

    assert_eq!(sut.read(&oid).unwrap_err().kind(), ErrorKind::Corrupt);
    assert_eq!(sut.read_header(&oid).unwrap_err().kind(), ErrorKind::Corrupt);

    Ok(())
}

#[rstest]
fn declared_size_must_match_the_payload(
    repository: TestRepository,
) -> Result<(), Box<dyn std::error::Error>> {
    let sut = &repository.repository;

    // a well-formed file whose name matches its content but whose header lies
    let framed = b"blob 5\0abc";
    let oid = ObjectId::digest(sut.hash_algorithm()?, framed);
    let path = repository.object_file(&oid);
    std::fs::create_dir_all(path.parent().ok_or("object file has a parent")?)?;
    std::fs::write(&path, deflate(framed))?;

    assert_eq!(sut.read_header(&oid)?.size, 5);
    assert_eq!(sut.read(&oid).unwrap_err().kind(), ErrorKind::Corrupt);

    Ok(())
}

#[rstest]
fn missing_objects_are_reported_as_not_found(
    repository: TestRepository,
) -> Result<(), Box<dyn std::error::Error>> {
    let sut = &repository.repository;
    let oid = ObjectId::try_parse("0123456789abcdef0123456789abcdef01234567")?;

    assert!(!sut.exists(&oid)?);
    assert_eq!(sut.read(&oid).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(sut.read_header(&oid).unwrap_err().kind(), ErrorKind::NotFound);

    Ok(())
}

#[rstest]
fn sha256_repository_uses_long_identifiers(
    sha256_repository: TestRepository,
) -> Result<(), Box<dyn std::error::Error>> {
    let sut = &sha256_repository.repository;

    let oid = sut.write(ObjectKind::Blob, b"")?;

    assert_eq!(
        oid.to_hex(),
        "473a0f4c3be8a93681a267e3b1e9a7dcda1185436fe141f7749120a303721813"
    );
    assert_eq!(sut.read(&oid)?.payload.len(), 0);
    assert!(sha256_repository.object_file(&oid).is_file());

    Ok(())
}

#[rstest]
fn write_expecting_checks_the_identifier(
    repository: TestRepository,
) -> Result<(), Box<dyn std::error::Error>> {
    let database = repository.repository.database()?;

    let expected = database.hash(ObjectKind::Blob, b"payload");
    assert_eq!(
        database.write_expecting(ObjectKind::Blob, b"payload", &expected)?,
        expected
    );

    let error = database
        .write_expecting(ObjectKind::Blob, b"tampered", &expected)
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Corrupt);

    Ok(())
}

fn object_kind() -> impl Strategy<Value = ObjectKind> {
    prop_oneof![
        Just(ObjectKind::Blob),
        Just(ObjectKind::Tree),
        Just(ObjectKind::Commit),
        Just(ObjectKind::Tag),
    ]
}

fn hash_algorithm() -> impl Strategy<Value = HashAlgorithm> {
    prop_oneof![Just(HashAlgorithm::Sha1), Just(HashAlgorithm::Sha256)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn any_payload_of_any_kind_round_trips(
        kind in object_kind(),
        algorithm in hash_algorithm(),
        payload in prop::collection::vec(any::<u8>(), 0..4096),
    ) {
        let dir = TempDir::new().unwrap();
        let sut = Repository::init_with(dir.path(), true, algorithm).unwrap();

        let oid = sut.write(kind, &payload).unwrap();

        prop_assert_eq!(oid, sut.database().unwrap().hash(kind, &payload));
        prop_assert!(sut.exists(&oid).unwrap());
        prop_assert_eq!(
            sut.read_header(&oid).unwrap(),
            ObjectHeader { kind, size: payload.len() }
        );

        let raw = sut.read(&oid).unwrap();
        prop_assert_eq!(raw.kind, kind);
        prop_assert_eq!(&raw.payload[..], &payload[..]);
    }

    #[test]
    fn any_payload_of_any_kind_is_stored_once(
        kind in object_kind(),
        algorithm in hash_algorithm(),
        payload in prop::collection::vec(any::<u8>(), 0..4096),
    ) {
        let dir = TempDir::new().unwrap();
        let sut = Repository::init_with(dir.path(), true, algorithm).unwrap();

        let first = sut.write(kind, &payload).unwrap();
        let path = sut.object_dir().unwrap().join(first.to_path());
        let stored = std::fs::read(&path).unwrap();
        let second = sut.write(kind, &payload).unwrap();

        prop_assert_eq!(first, second);
        prop_assert_eq!(std::fs::read(&path).unwrap(), stored);

        let fan_out_dir = path.parent().unwrap();
        prop_assert_eq!(std::fs::read_dir(fan_out_dir).unwrap().count(), 1);
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_writers_of_the_same_content_store_one_copy(
    repository_dir: TempDir,
    content: String,
) -> Result<(), Box<dyn std::error::Error>> {
    Repository::init(repository_dir.path(), false)?;

    let writer_count = 16;
    let mut tasks = Vec::new();

    for _ in 0..writer_count {
        let path = repository_dir.path().to_path_buf();
        let content = content.clone();

        // every writer opens its own handle
        let task = tokio::task::spawn_blocking(move || {
            let delay_ms = (0..20).fake::<u64>();
            std::thread::sleep(Duration::from_millis(delay_ms));

            Repository::open(&path)?.write(ObjectKind::Blob, content.as_bytes())
        });

        tasks.push(task);
    }

    let mut ids = Vec::new();
    for result in futures::future::join_all(tasks).await {
        ids.push(result??);
    }

    let expected = ids[0];
    assert!(ids.iter().all(|oid| *oid == expected));

    let sut = Repository::open(repository_dir.path())?;
    assert_eq!(&sut.read(&expected)?.payload[..], content.as_bytes());

    let fan_out_dir = sut.object_dir()?.join(expected.to_path());
    let fan_out_dir = fan_out_dir.parent().ok_or("object file has a parent")?;
    let entries = std::fs::read_dir(fan_out_dir)?
        .map(|entry| entry.map(|entry| entry.file_name().to_string_lossy().into_owned()))
        .collect::<Result<Vec<_>, _>>()?;

    assert_eq!(entries.len(), 1, "{entries:?}");
    assert!(entries.iter().all(|name| !name.starts_with("tmp-obj-")));

    Ok(())
}
