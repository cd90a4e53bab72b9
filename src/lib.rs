//! A git-compatible content-addressed object store
//!
//! Objects are stored loose under `objects/` in git's on-disk format and read
//! back either as raw payloads ([`Database`]) or as typed values
//! ([`ObjectModel`]). References are resolved through [`Refs`]. A
//! [`Repository`] ties them together for one git directory.
//!
//! ```no_run
//! use bitstore::{ObjectKind, Repository};
//!
//! let repository = Repository::init("/tmp/example", false)?;
//! let oid = repository.write(ObjectKind::Blob, b"hello\n")?;
//! assert_eq!(repository.read_header(&oid)?.size, 6);
//! # Ok::<(), bitstore::Error>(())
//! ```

pub mod areas;
pub mod artifacts;
pub mod errors;

pub use areas::database::Database;
pub use areas::object_model::{ObjectCache, ObjectModel};
pub use areas::refs::Refs;
pub use areas::repository::Repository;
pub use artifacts::config::Config;
pub use artifacts::objects::blob::Blob;
pub use artifacts::objects::commit::Commit;
pub use artifacts::objects::entry_mode::EntryMode;
pub use artifacts::objects::object::{Object, Packable, RawObject, TypedObject, Unpackable};
pub use artifacts::objects::object_id::{HashAlgorithm, ObjectId};
pub use artifacts::objects::object_kind::{ObjectHeader, ObjectKind};
pub use artifacts::objects::signature::Signature;
pub use artifacts::objects::tag::Tag;
pub use artifacts::objects::tree::{Tree, TreeEntry};
pub use artifacts::refs::reference::{Reference, ReferenceTarget};
pub use artifacts::refs::reference_name::ReferenceName;
pub use errors::{Error, ErrorKind, Result};
