//! Git data structures
//!
//! - `config`: Repository configuration file
//! - `core`: Shared utilities (lock files)
//! - `objects`: Git object types (blob, tree, commit, tag) and identifiers
//! - `refs`: Reference values, names and the packed-refs file

pub mod config;
pub mod core;
pub mod objects;
pub mod refs;
