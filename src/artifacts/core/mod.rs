//! Core utilities shared by the storage areas

pub mod lock_file;
