//! Typed access to the object database
//!
//! [`ObjectModel::peek`] only reads the header of an object. Every other lookup
//! fully decodes it and, for tags, realizes the whole chain of targets: looking
//! up a tag fails unless everything it (transitively) points at exists, has the
//! kind the tag declares and parses.
//!
//! ## Caching
//!
//! Realized blobs, trees and commits are kept in the repository's bounded
//! [`ObjectCache`]. Tags are never cached, and the targets of a tag are always
//! read back from the store, so a tag lookup notices a target that went
//! missing or got corrupted after an earlier successful lookup.

use crate::areas::database::Database;
use crate::artifacts::objects::object::{Object, TypedObject};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_kind::{ObjectHeader, ObjectKind};
use crate::artifacts::objects::signature::Signature;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::refs::reference_name::ReferenceName;
use crate::errors::{Error, Result};
use derive_new::new;
use std::cell::RefCell;
use std::collections::HashMap;

/// Longest tag chain (tag of a tag of ...) that is followed
pub const MAX_TAG_DEPTH: usize = 16;

/// Shortest abbreviated identifier accepted by name lookups
pub const MIN_PREFIX_LENGTH: usize = 4;

/// Number of objects an [`ObjectCache`] holds by default
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

#[derive(Debug)]
pub struct ObjectCache {
    entries: RefCell<HashMap<ObjectId, TypedObject>>,
    capacity: usize,
}

impl Default for ObjectCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl ObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ObjectCache {
            entries: RefCell::new(HashMap::new()),
            capacity,
        }
    }

    fn get(&self, object_id: &ObjectId) -> Option<TypedObject> {
        self.entries.borrow().get(object_id).cloned()
    }

    fn insert(&self, object_id: ObjectId, object: TypedObject) {
        if self.capacity == 0 {
            return;
        }

        let mut entries = self.entries.borrow_mut();
        if entries.len() >= self.capacity && !entries.contains_key(&object_id) {
            // hash order picks an arbitrary victim
            if let Some(victim) = entries.keys().next().copied() {
                entries.remove(&victim);
            }
        }
        entries.insert(object_id, object);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

#[derive(Debug, new)]
pub struct ObjectModel<'r> {
    database: &'r Database,
    cache: &'r ObjectCache,
}

impl<'r> ObjectModel<'r> {
    pub fn peek(&self, object_id: &ObjectId) -> Result<ObjectHeader> {
        self.database.read_header(object_id)
    }

    /// Fully decode an object of any kind
    pub fn materialize(&self, object_id: &ObjectId) -> Result<TypedObject> {
        self.lookup(object_id, None)
    }

    pub fn lookup(
        &self,
        object_id: &ObjectId,
        expected: Option<ObjectKind>,
    ) -> Result<TypedObject> {
        let mut realized = Vec::new();
        let object = self.realize(object_id, object_id, expected, 0, &mut realized)?;

        // only once the whole chain realized
        for (object_id, object) in realized {
            self.cache.insert(object_id, object);
        }

        Ok(object)
    }

    fn realize(
        &self,
        start: &ObjectId,
        object_id: &ObjectId,
        expected: Option<ObjectKind>,
        depth: usize,
        realized: &mut Vec<(ObjectId, TypedObject)>,
    ) -> Result<TypedObject> {
        if depth > MAX_TAG_DEPTH {
            return Err(Error::ResolutionLoop {
                start: start.to_hex(),
                limit: MAX_TAG_DEPTH,
            });
        }

        let check_kind = |actual: ObjectKind| match expected {
            Some(expected) if expected != actual => Err(Error::TypeMismatch {
                id: *object_id,
                expected,
                actual,
            }),
            _ => Ok(()),
        };

        // targets of a tag always come from the store
        if depth == 0
            && let Some(object) = self.cache.get(object_id)
        {
            tracing::trace!(oid = %object_id, "object cache hit");
            check_kind(object.kind())?;
            return Ok(object);
        }

        let raw = self.database.read(object_id)?;
        check_kind(raw.kind)?;

        let object = TypedObject::parse(&raw, self.database.algorithm())?;

        match &object {
            TypedObject::Tag(tag) => {
                self.realize(start, tag.target(), Some(tag.target_kind()), depth + 1, realized)?;
            }
            _ => realized.push((*object_id, object.clone())),
        }

        Ok(object)
    }

    /// Look up an object by its hex name, full or abbreviated (at least
    /// [`MIN_PREFIX_LENGTH`] characters).
    pub fn lookup_by_name(&self, name: &str, expected: Option<ObjectKind>) -> Result<TypedObject> {
        let object_id = self.resolve_name(name)?;
        self.lookup(&object_id, expected)
    }

    /// Turn a hex name into a full identifier
    pub fn resolve_name(&self, name: &str) -> Result<ObjectId> {
        let algorithm = self.database.algorithm();

        let well_formed = name.len() >= MIN_PREFIX_LENGTH
            && name.len() <= algorithm.hex_len()
            && name.bytes().all(|byte| byte.is_ascii_hexdigit());
        if !well_formed {
            return Err(Error::InvalidIdentifier(name.to_string()));
        }

        if name.len() == algorithm.hex_len() {
            return ObjectId::try_parse_with(algorithm, name);
        }

        let mut candidates = self.database.find_by_prefix(name)?;
        match candidates.len() {
            0 => Err(Error::PrefixNotFound(name.to_string())),
            1 => Ok(candidates.remove(0)),
            _ => Err(Error::Ambiguous {
                prefix: name.to_string(),
                candidates,
            }),
        }
    }

    /// Follow tags down to the first object that is not a tag
    pub fn peel(&self, object_id: &ObjectId) -> Result<TypedObject> {
        let mut object = self.lookup(object_id, None)?;

        for _ in 0..=MAX_TAG_DEPTH {
            let TypedObject::Tag(tag) = &object else {
                return Ok(object);
            };
            object = self.lookup(tag.target(), Some(tag.target_kind()))?;
        }

        Err(Error::ResolutionLoop {
            start: object_id.to_hex(),
            limit: MAX_TAG_DEPTH,
        })
    }

    /// Write an annotated tag object pointing at `target`.
    ///
    /// The target must fully realize. No reference is created for the tag.
    pub fn create_tag(
        &self,
        target: &ObjectId,
        name: &str,
        message: &str,
        tagger: &Signature,
    ) -> Result<ObjectId> {
        ReferenceName::tag(name)?;

        let target_object = self.lookup(target, None)?;
        let tag = Tag::new(
            *target,
            target_object.kind(),
            name.to_string(),
            Some(tagger.clone()),
            message.to_string(),
        );

        let tag_id = self.write_object(&tag)?;
        tracing::debug!(oid = %tag_id, target = %target, name, "created tag");

        Ok(tag_id)
    }

    pub fn write_object(&self, object: &impl Object) -> Result<ObjectId> {
        self.database.store(object)
    }
}
