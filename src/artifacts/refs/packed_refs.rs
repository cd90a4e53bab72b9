//! The `packed-refs` file
//!
//! ```text
//! # pack-refs with: peeled fully-peeled sorted
//! <hex id> refs/heads/main
//! <hex id> refs/tags/v1.0
//! ^<hex id of the peeled tag target>
//! ```
//!
//! Lines starting with `#` are headers, lines starting with `^` record the peeled
//! value of the reference just above them.

use crate::artifacts::objects::object_id::{HashAlgorithm, ObjectId};
use crate::errors::{Error, Result};
use std::collections::BTreeMap;

pub const PACKED_REFS_FILE: &str = "packed-refs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedRef {
    pub oid: ObjectId,
    pub peeled: Option<ObjectId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedRefs {
    header: Option<String>,
    entries: BTreeMap<String, PackedRef>,
}

impl PackedRefs {
    pub fn parse(content: &str, algorithm: HashAlgorithm) -> Result<Self> {
        let mut packed = PackedRefs::default();
        let mut last_name: Option<String> = None;

        for (number, line) in content.lines().enumerate() {
            let line = line.trim_end();
            let malformed =
                |reason: &str| Error::parse(PACKED_REFS_FILE, format!("line {}: {reason}", number + 1));

            if line.is_empty() {
                continue;
            }

            if line.starts_with('#') {
                if packed.header.is_none() && packed.entries.is_empty() {
                    packed.header = Some(line.to_string());
                }
                continue;
            }

            if let Some(peeled) = line.strip_prefix('^') {
                let oid = ObjectId::try_parse_with(algorithm, peeled)
                    .map_err(|_| malformed("bad peeled id"))?;
                let entry = last_name
                    .as_ref()
                    .and_then(|name| packed.entries.get_mut(name))
                    .ok_or_else(|| malformed("peeled line without a reference"))?;
                entry.peeled = Some(oid);
                continue;
            }

            let (hex, name) = line
                .split_once(' ')
                .ok_or_else(|| malformed("expected '<id> <name>'"))?;
            let oid =
                ObjectId::try_parse_with(algorithm, hex).map_err(|_| malformed("bad object id"))?;

            packed
                .entries
                .insert(name.to_string(), PackedRef { oid, peeled: None });
            last_name = Some(name.to_string());
        }

        Ok(packed)
    }

    pub fn get(&self, name: &str) -> Option<&PackedRef> {
        self.entries.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<PackedRef> {
        self.entries.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn serialize(&self) -> String {
        let mut content = String::new();

        if let Some(header) = &self.header {
            content.push_str(header);
            content.push('\n');
        }

        for (name, entry) in &self.entries {
            content.push_str(&format!("{} {name}\n", entry.oid));
            if let Some(peeled) = &entry.peeled {
                content.push_str(&format!("^{peeled}\n"));
            }
        }

        content
    }
}
