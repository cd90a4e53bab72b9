//! Reference values
//!
//! ## File Format
//!
//! Loose reference files contain either:
//! - A hex object ID (direct reference)
//! - `ref: <name>` (symbolic reference)

use crate::artifacts::objects::object_id::{HashAlgorithm, ObjectId};
use crate::artifacts::refs::reference_name::compile;
use crate::errors::{Error, Result};
use derive_new::new;

/// Regex pattern for parsing symbolic references
const SYMREF_REGEX: &str = r"^ref:\s*(\S+)$";

/// What a reference points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceTarget {
    /// Direct object ID
    Direct(ObjectId),
    /// Name of another reference
    Symbolic(String),
}

impl ReferenceTarget {
    /// Parse the content of a loose reference file
    pub fn parse(name: &str, content: &str, algorithm: HashAlgorithm) -> Result<Self> {
        let content = content.trim();

        let symref_match = compile(SYMREF_REGEX)?.captures(content);
        if let Some(symref) = symref_match {
            return Ok(ReferenceTarget::Symbolic(symref[1].to_string()));
        }

        ObjectId::try_parse_with(algorithm, content)
            .map(ReferenceTarget::Direct)
            .map_err(|_| {
                Error::parse(
                    format!("reference '{name}'"),
                    format!("unrecognized content '{content}'"),
                )
            })
    }

    /// Content of the loose reference file
    pub fn to_file_content(&self) -> String {
        match self {
            ReferenceTarget::Direct(oid) => format!("{oid}\n"),
            ReferenceTarget::Symbolic(name) => format!("ref: {name}\n"),
        }
    }
}

/// A named pointer, as stored (not peeled)
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Reference {
    name: String,
    target: ReferenceTarget,
}

impl Reference {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &ReferenceTarget {
        &self.target
    }

    pub fn is_symbolic(&self) -> bool {
        matches!(self.target, ReferenceTarget::Symbolic(_))
    }

    pub fn target_id(&self) -> Option<&ObjectId> {
        match &self.target {
            ReferenceTarget::Direct(oid) => Some(oid),
            ReferenceTarget::Symbolic(_) => None,
        }
    }

    pub fn symbolic_target(&self) -> Option<&str> {
        match &self.target {
            ReferenceTarget::Direct(_) => None,
            ReferenceTarget::Symbolic(name) => Some(name),
        }
    }
}
