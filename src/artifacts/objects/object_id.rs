//! Object identifier (content digest)
//!
//! Object IDs are digests over `<kind> <size>\0<payload>`. Two algorithms are
//! supported: SHA-1 (20 bytes, 40 hex characters) and SHA-256 (32 bytes, 64 hex
//! characters).
//!
//! ## Storage
//!
//! Objects are stored in `objects/<first-2-chars>/<remaining-chars>`

use crate::artifacts::objects::object_kind::ObjectKind;
use crate::errors::{Error, Result};
use sha1::{Digest, Sha1};
use sha2::Sha256;
use std::io;
use std::path::PathBuf;

/// Largest raw identifier we handle (SHA-256)
pub const MAX_RAW_LENGTH: usize = 32;

/// Length of the abbreviated form shown to users
pub const SHORT_OID_LENGTH: usize = 7;

/// Digest function a repository addresses its objects with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum HashAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    pub const fn raw_len(self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
        }
    }

    pub const fn hex_len(self) -> usize {
        self.raw_len() * 2
    }

    /// Name used by the `extensions.objectformat` configuration key
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sha1" => Some(HashAlgorithm::Sha1),
            "sha256" => Some(HashAlgorithm::Sha256),
            _ => None,
        }
    }

    fn from_hex_len(len: usize) -> Option<Self> {
        match len {
            40 => Some(HashAlgorithm::Sha1),
            64 => Some(HashAlgorithm::Sha256),
            _ => None,
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Object identifier
///
/// Immutable once computed; equality is byte-wise (and algorithm-wise).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    algorithm: HashAlgorithm,
    raw: [u8; MAX_RAW_LENGTH],
}

impl ObjectId {
    /// Digest an already framed object (`<kind> <size>\0<payload>`)
    pub fn digest(algorithm: HashAlgorithm, framed: &[u8]) -> Self {
        Self::hash_parts(algorithm, &[framed])
    }

    /// Identifier of `payload` stored as an object of the given kind
    pub fn compute(algorithm: HashAlgorithm, kind: ObjectKind, payload: &[u8]) -> Self {
        let header = kind.header(payload.len());
        Self::hash_parts(algorithm, &[header.as_bytes(), payload])
    }

    fn hash_parts(algorithm: HashAlgorithm, parts: &[&[u8]]) -> Self {
        let mut raw = [0; MAX_RAW_LENGTH];

        match algorithm {
            HashAlgorithm::Sha1 => {
                let mut hasher = Sha1::new();
                parts.iter().for_each(|part| hasher.update(part));
                raw[..20].copy_from_slice(&hasher.finalize());
            }
            HashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                parts.iter().for_each(|part| hasher.update(part));
                raw.copy_from_slice(&hasher.finalize());
            }
        }

        ObjectId { algorithm, raw }
    }

    /// The all-zero identifier
    pub fn null(algorithm: HashAlgorithm) -> Self {
        ObjectId {
            algorithm,
            raw: [0; MAX_RAW_LENGTH],
        }
    }

    pub fn is_null(&self) -> bool {
        self.as_bytes().iter().all(|byte| *byte == 0)
    }

    /// Parse and validate an object ID from its hex form
    ///
    /// The algorithm is inferred from the length (40 or 64 characters).
    pub fn try_parse(id: &str) -> Result<Self> {
        let algorithm = HashAlgorithm::from_hex_len(id.len())
            .ok_or_else(|| Error::InvalidIdentifier(id.to_string()))?;

        Self::try_parse_with(algorithm, id)
    }

    /// Parse an object ID that must belong to the given algorithm
    pub fn try_parse_with(algorithm: HashAlgorithm, id: &str) -> Result<Self> {
        if id.len() != algorithm.hex_len() {
            return Err(Error::InvalidIdentifier(id.to_string()));
        }

        let mut raw = [0; MAX_RAW_LENGTH];
        hex::decode_to_slice(id, &mut raw[..algorithm.raw_len()])
            .map_err(|_| Error::InvalidIdentifier(id.to_string()))?;

        Ok(ObjectId { algorithm, raw })
    }

    pub fn from_raw(algorithm: HashAlgorithm, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != algorithm.raw_len() {
            return Err(Error::InvalidIdentifier(hex::encode(bytes)));
        }

        let mut raw = [0; MAX_RAW_LENGTH];
        raw[..bytes.len()].copy_from_slice(bytes);

        Ok(ObjectId { algorithm, raw })
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw[..self.algorithm.raw_len()]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Write the object ID in binary form, as tree entries store it
    pub fn write_raw_to<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(self.as_bytes())
    }

    /// Read an object ID in binary form, as tree entries store it
    pub fn read_raw_from<R: io::Read + ?Sized>(
        algorithm: HashAlgorithm,
        reader: &mut R,
    ) -> io::Result<Self> {
        let mut raw = [0; MAX_RAW_LENGTH];
        reader.read_exact(&mut raw[..algorithm.raw_len()])?;

        Ok(ObjectId { algorithm, raw })
    }

    /// Convert to file system path for object storage
    ///
    /// Splits the hash as `XX/YYYYYY...` where XX is the first 2 chars.
    pub fn to_path(&self) -> PathBuf {
        let hex = self.to_hex();
        let (dir, file) = hex.split_at(2);
        PathBuf::from(dir).join(file)
    }

    pub fn to_short_oid(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(SHORT_OID_LENGTH);
        hex
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectId({}:{})", self.algorithm, self.to_hex())
    }
}

impl std::str::FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::try_parse(s)
    }
}
