//! Object types and operations
//!
//! All content is stored as objects identified by a digest. There are four types:
//!
//! - **Blob**: File content (raw bytes)
//! - **Tree**: Directory listing (names, modes, and object IDs)
//! - **Commit**: Snapshot with metadata (author, message, parent commits, tree)
//! - **Tag**: Annotated, signed-off pointer to another object
//!
//! All objects implement serialization/deserialization of their payload; the
//! database adds the `<type> <size>\0` frame.

pub mod blob;
pub mod commit;
pub mod entry_mode;
pub mod object;
pub mod object_id;
pub mod object_kind;
pub mod signature;
pub mod tag;
pub mod tree;
