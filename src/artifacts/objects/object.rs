use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::{HashAlgorithm, ObjectId};
use crate::artifacts::objects::object_kind::ObjectKind;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::objects::tree::Tree;
use crate::errors::Result;
use bytes::Bytes;
use derive_new::new;
use std::io::{BufRead, Cursor};

/// Payload encoding, without the `<kind> <size>\0` frame
pub trait Packable {
    fn serialize(&self) -> Result<Bytes>;
}

pub trait Unpackable {
    fn deserialize(reader: impl BufRead, algorithm: HashAlgorithm) -> Result<Self>
    where
        Self: Sized;
}

pub trait Object: Packable {
    fn object_kind(&self) -> ObjectKind;

    fn object_id(&self, algorithm: HashAlgorithm) -> Result<ObjectId> {
        let payload = self.serialize()?;
        Ok(ObjectId::compute(algorithm, self.object_kind(), &payload))
    }
}

/// A payload together with its kind, as stored
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct RawObject {
    pub kind: ObjectKind,
    pub payload: Bytes,
}

impl RawObject {
    /// `<kind> <size>\0<payload>`, the bytes that get hashed and compressed
    pub fn framed(&self) -> Bytes {
        let header = self.kind.header(self.payload.len());
        let mut framed = Vec::with_capacity(header.len() + self.payload.len());
        framed.extend_from_slice(header.as_bytes());
        framed.extend_from_slice(&self.payload);
        framed.into()
    }
}

/// A fully decoded object of any kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedObject {
    Blob(Blob),
    Tree(Tree),
    Commit(Commit),
    Tag(Tag),
}

impl TypedObject {
    pub fn parse(raw: &RawObject, algorithm: HashAlgorithm) -> Result<Self> {
        let reader = Cursor::new(&raw.payload[..]);

        Ok(match raw.kind {
            ObjectKind::Blob => TypedObject::Blob(Blob::deserialize(reader, algorithm)?),
            ObjectKind::Tree => TypedObject::Tree(Tree::deserialize(reader, algorithm)?),
            ObjectKind::Commit => TypedObject::Commit(Commit::deserialize(reader, algorithm)?),
            ObjectKind::Tag => TypedObject::Tag(Tag::deserialize(reader, algorithm)?),
        })
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            TypedObject::Blob(_) => ObjectKind::Blob,
            TypedObject::Tree(_) => ObjectKind::Tree,
            TypedObject::Commit(_) => ObjectKind::Commit,
            TypedObject::Tag(_) => ObjectKind::Tag,
        }
    }

    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            TypedObject::Blob(blob) => Some(blob),
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            TypedObject::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_commit(&self) -> Option<&Commit> {
        match self {
            TypedObject::Commit(commit) => Some(commit),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            TypedObject::Tag(tag) => Some(tag),
            _ => None,
        }
    }
}

impl Packable for TypedObject {
    fn serialize(&self) -> Result<Bytes> {
        match self {
            TypedObject::Blob(blob) => blob.serialize(),
            TypedObject::Tree(tree) => tree.serialize(),
            TypedObject::Commit(commit) => commit.serialize(),
            TypedObject::Tag(tag) => tag.serialize(),
        }
    }
}

impl Object for TypedObject {
    fn object_kind(&self) -> ObjectKind {
        self.kind()
    }
}
