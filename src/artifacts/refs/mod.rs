//! Reference values, names and the packed-refs file

pub mod packed_refs;
pub mod reference;
pub mod reference_name;
