//! Loose object storage
//!
//! Each object lives in `objects/xx/yyyy...`, named after the hex digest of its
//! framed content and compressed with zlib:
//!
//! ```text
//! zlib("<kind> <size>\0<payload>")
//! ```

use crate::artifacts::objects::object::{Object, RawObject};
use crate::artifacts::objects::object_id::{HashAlgorithm, ObjectId};
use crate::artifacts::objects::object_kind::{ObjectHeader, ObjectKind};
use crate::errors::{Error, Result, StorageContext};
use bytes::Bytes;
use std::io::{BufReader, Cursor, Read, Write};
use std::path::{Path, PathBuf};

/// Longest possible `<kind> <size>\0` prefix: `commit ` + 20 digits + NUL
const MAX_HEADER_LENGTH: u64 = 32;

#[derive(Debug)]
pub struct Database {
    path: Box<Path>,
    algorithm: HashAlgorithm,
}

impl Database {
    pub fn new(path: Box<Path>, algorithm: HashAlgorithm) -> Self {
        Database { path, algorithm }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    fn object_path(&self, object_id: &ObjectId) -> PathBuf {
        self.path.join(object_id.to_path())
    }

    pub fn exists(&self, object_id: &ObjectId) -> Result<bool> {
        let object_path = self.object_path(object_id);

        match std::fs::metadata(&object_path) {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(error) => Err(error)
                .with_context(|| format!("Unable to stat object file {}", object_path.display())),
        }
    }

    /// Kind and size of an object, inflating only the header prefix
    pub fn read_header(&self, object_id: &ObjectId) -> Result<ObjectHeader> {
        let file = self.open_object(object_id)?;

        let decoder = flate2::read::ZlibDecoder::new(file);
        let mut reader = BufReader::new(decoder.take(MAX_HEADER_LENGTH));

        let header = ObjectHeader::parse(&mut reader)
            .map_err(|reason| Error::corrupt(*object_id, reason))?;

        tracing::trace!(oid = %object_id, kind = %header.kind, size = header.size, "read object header");
        Ok(header)
    }

    /// Inflate, parse and verify a whole object
    pub fn read(&self, object_id: &ObjectId) -> Result<RawObject> {
        let mut file = self.open_object(object_id)?;

        let mut compressed = Vec::new();
        file.read_to_end(&mut compressed).with_context(|| {
            format!(
                "Unable to read object file {}",
                self.object_path(object_id).display()
            )
        })?;

        let content = Self::decompress(&compressed)
            .map_err(|error| Error::corrupt(*object_id, format!("bad zlib stream: {error}")))?;

        // the name of the file must match what is in it
        if ObjectId::digest(object_id.algorithm(), &content) != *object_id {
            return Err(Error::corrupt(*object_id, "digest does not match content"));
        }

        let mut reader = Cursor::new(&content[..]);
        let header =
            ObjectHeader::parse(&mut reader).map_err(|reason| Error::corrupt(*object_id, reason))?;

        let offset = reader.position() as usize;
        let payload = content.slice(offset..);
        if payload.len() != header.size {
            return Err(Error::corrupt(
                *object_id,
                format!(
                    "declared size {} but payload has {} bytes",
                    header.size,
                    payload.len()
                ),
            ));
        }

        tracing::trace!(oid = %object_id, kind = %header.kind, size = header.size, "read object");
        Ok(RawObject::new(header.kind, payload))
    }

    /// Store a payload, returning its ID. Writing an object that already exists
    /// leaves the existing file untouched.
    pub fn write(&self, kind: ObjectKind, payload: &[u8]) -> Result<ObjectId> {
        let raw = RawObject::new(kind, Bytes::copy_from_slice(payload));
        let framed = raw.framed();
        let object_id = ObjectId::digest(self.algorithm, &framed);

        self.write_framed(&object_id, &framed)?;
        Ok(object_id)
    }

    /// Store a payload that must hash to `expected`
    pub fn write_expecting(
        &self,
        kind: ObjectKind,
        payload: &[u8],
        expected: &ObjectId,
    ) -> Result<ObjectId> {
        let computed = self.hash(kind, payload);
        if computed != *expected {
            return Err(Error::corrupt(
                *expected,
                format!("content hashes to {computed}"),
            ));
        }

        self.write(kind, payload)
    }

    pub fn store(&self, object: &impl Object) -> Result<ObjectId> {
        let payload = object.serialize()?;
        self.write(object.object_kind(), &payload)
    }

    /// ID an object would get, without storing it
    pub fn hash(&self, kind: ObjectKind, payload: &[u8]) -> ObjectId {
        ObjectId::compute(self.algorithm, kind, payload)
    }

    fn write_framed(&self, object_id: &ObjectId, framed: &[u8]) -> Result<()> {
        let object_path = self.object_path(object_id);

        if self.exists(object_id)? {
            tracing::trace!(oid = %object_id, "object already stored");
            return Ok(());
        }

        let object_dir = object_path.parent().ok_or_else(|| Error::InvalidLayout {
            path: object_path.clone(),
            reason: "object path has no parent".to_string(),
        })?;
        std::fs::create_dir_all(object_dir).with_context(|| {
            format!("Unable to create object directory {}", object_dir.display())
        })?;

        let temp_object_path = object_dir.join(Self::generate_temp_name());
        let object_content = Self::compress(framed)
            .with_context(|| format!("Unable to compress object {object_id}"))?;

        // O_CREAT | O_EXCL so concurrent writers never share a temp file
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_object_path)
            .with_context(|| {
                format!("Unable to open object file {}", temp_object_path.display())
            })?;

        let written = file
            .write_all(&object_content)
            .and_then(|_| file.sync_all())
            .and_then(|_| std::fs::rename(&temp_object_path, &object_path));

        if let Err(error) = written {
            if let Err(cleanup) = std::fs::remove_file(&temp_object_path) {
                tracing::warn!(path = %temp_object_path.display(), error = %cleanup, "unable to remove temporary object file");
            }
            // another writer got there first with the same content
            if self.exists(object_id)? {
                return Ok(());
            }
            return Err(error)
                .with_context(|| format!("Unable to write object file {}", object_path.display()));
        }

        tracing::debug!(oid = %object_id, size = framed.len(), "stored object");
        Ok(())
    }

    fn open_object(&self, object_id: &ObjectId) -> Result<std::fs::File> {
        let object_path = self.object_path(object_id);

        std::fs::File::open(&object_path).map_err(|error| match error.kind() {
            std::io::ErrorKind::NotFound => Error::ObjectNotFound(*object_id),
            _ => Error::Storage {
                context: format!("Unable to open object file {}", object_path.display()),
                source: error,
            },
        })
    }

    fn compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data)?;
        encoder.finish()
    }

    fn decompress(data: &[u8]) -> std::io::Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(data);
        let mut decompressed_content = Vec::new();
        decoder.read_to_end(&mut decompressed_content)?;

        Ok(decompressed_content.into())
    }

    fn generate_temp_name() -> String {
        format!("tmp-obj-{}", rand::random::<u32>())
    }

    /// Find all objects whose ID starts with the given hex prefix.
    ///
    /// For prefixes of 2+ characters only the matching fan-out directory is
    /// searched; shorter prefixes scan all 256 of them.
    pub fn find_by_prefix(&self, prefix: &str) -> Result<Vec<ObjectId>> {
        let prefix = prefix.to_ascii_lowercase();
        if !prefix.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(Error::InvalidIdentifier(prefix));
        }

        let dir_names = if prefix.len() >= 2 {
            vec![prefix[..2].to_string()]
        } else {
            (0..=255u8).map(|i| format!("{i:02x}")).collect()
        };

        let mut matches = Vec::new();
        for dir_name in dir_names {
            let dir_path = self.path.join(&dir_name);
            if !dir_path.is_dir() {
                continue;
            }

            let entries = std::fs::read_dir(&dir_path)
                .with_context(|| format!("Unable to list {}", dir_path.display()))?;
            for entry in entries {
                let entry =
                    entry.with_context(|| format!("Unable to list {}", dir_path.display()))?;
                let full_oid = format!("{dir_name}{}", entry.file_name().to_string_lossy());

                // temp files and foreign names simply fail to parse
                if full_oid.starts_with(&prefix)
                    && let Ok(oid) = ObjectId::try_parse_with(self.algorithm, &full_oid)
                {
                    matches.push(oid);
                }
            }
        }

        matches.sort();
        Ok(matches)
    }
}
