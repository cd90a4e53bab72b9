//! Storage areas of a repository
//!
//! - `database`: Loose object storage (read, write, verify)
//! - `object_model`: Typed object lookup with cascading tag realization
//! - `refs`: Reference management (HEAD, branches, tags, packed refs)
//! - `repository`: The handle owning all of the above

pub mod database;
pub mod object_model;
pub mod refs;
pub mod repository;
