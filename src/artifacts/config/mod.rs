//! Repository configuration (`<git dir>/config`)
//!
//! The file uses git's INI-like format:
//!
//! ```text
//! [core]
//!     repositoryformatversion = 1
//!     bare = false
//! [extensions]
//!     objectformat = sha256
//! ```
//!
//! Keys are addressed with dotted names (`core.bare`, `remote.origin.url`).
//! Section and key names are case-insensitive, subsection names are not. When
//! a key appears more than once, the last value wins.

mod parser;

use crate::artifacts::core::lock_file::LockFile;
use crate::artifacts::objects::object_id::HashAlgorithm;
use crate::errors::{Error, Result, StorageContext};
use derive_new::new;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config";

#[derive(Debug, Clone, PartialEq, Eq, new)]
struct Section {
    name: String,
    subsection: Option<String>,
    #[new(default)]
    entries: Vec<(String, String)>,
}

impl Section {
    fn matches(&self, name: &str, subsection: Option<&str>) -> bool {
        self.name == name && self.subsection.as_deref() == subsection
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    path: Option<PathBuf>,
    sections: Vec<Section>,
}

/// Split `section[.subsection].key` into its lowercase section, subsection and
/// lowercase key.
fn split_key(dotted: &str) -> Option<(String, Option<&str>, String)> {
    let (section, rest) = dotted.split_once('.')?;
    let (subsection, key) = match rest.rsplit_once('.') {
        Some((subsection, key)) => (Some(subsection), key),
        None => (None, rest),
    };

    if section.is_empty() || key.is_empty() {
        return None;
    }

    Some((section.to_lowercase(), subsection, key.to_lowercase()))
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(content: &str) -> Result<Self> {
        parser::parse(content)
    }

    /// Read the config file at `path`; a missing file yields an empty config
    /// bound to that path.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content)?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Self::new(),
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("Unable to read {}", path.display()));
            }
        };
        config.path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Write the config back to the file it was loaded from (or `path` if given)
    pub fn save(&mut self, path: Option<&Path>) -> Result<()> {
        if let Some(path) = path {
            self.path = Some(path.to_path_buf());
        }

        let Some(path) = self.path.as_deref() else {
            return Err(Error::InvalidLayout {
                path: PathBuf::new(),
                reason: "config has no backing file".to_string(),
            });
        };

        let mut lock = LockFile::acquire(path)?;
        lock.write_all(self.serialize().as_bytes())?;
        lock.commit()?;

        tracing::debug!(path = %path.display(), "wrote config");
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, dotted: &str) -> Option<&str> {
        let (section, subsection, key) = split_key(dotted)?;

        self.sections
            .iter()
            .rev()
            .filter(|candidate| candidate.matches(&section, subsection))
            .find_map(|candidate| {
                candidate
                    .entries
                    .iter()
                    .rev()
                    .find(|(name, _)| *name == key)
                    .map(|(_, value)| value.as_str())
            })
    }

    /// Git booleans: `true/yes/on/1` and `false/no/off/0/<empty>`
    pub fn get_bool(&self, dotted: &str) -> Option<bool> {
        match self.get(dotted)?.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" | "" => Some(false),
            _ => None,
        }
    }

    pub fn get_int(&self, dotted: &str) -> Option<i64> {
        self.get(dotted)?.parse().ok()
    }

    pub fn set(&mut self, dotted: &str, value: impl Into<String>) -> Result<()> {
        let (section, subsection, key) = split_key(dotted)
            .ok_or_else(|| Error::parse(CONFIG_FILE_NAME, format!("bad key '{dotted}'")))?;
        let value = value.into();

        let index = match self
            .sections
            .iter()
            .rposition(|candidate| candidate.matches(&section, subsection))
        {
            Some(index) => index,
            None => {
                self.sections
                    .push(Section::new(section, subsection.map(str::to_string)));
                self.sections.len() - 1
            }
        };

        let entries = &mut self.sections[index].entries;
        match entries.iter_mut().rev().find(|(name, _)| *name == key) {
            Some(entry) => entry.1 = value,
            None => entries.push((key, value)),
        }

        Ok(())
    }

    pub fn serialize(&self) -> String {
        let mut content = String::new();

        for section in &self.sections {
            match &section.subsection {
                Some(subsection) => content.push_str(&format!(
                    "[{} \"{}\"]\n",
                    section.name,
                    parser::escape_subsection(subsection)
                )),
                None => content.push_str(&format!("[{}]\n", section.name)),
            }

            for (key, value) in &section.entries {
                content.push_str(&format!("\t{key} = {}\n", parser::escape_value(value)));
            }
        }

        content
    }

    /// `extensions.objectformat`, SHA-1 when unset
    pub fn hash_algorithm(&self) -> Result<HashAlgorithm> {
        match self.get("extensions.objectformat") {
            None => Ok(HashAlgorithm::default()),
            Some(name) => HashAlgorithm::from_name(&name.to_lowercase()).ok_or_else(|| {
                Error::InvalidLayout {
                    path: self.path.clone().unwrap_or_default(),
                    reason: format!("unknown object format '{name}'"),
                }
            }),
        }
    }

    pub fn is_bare(&self) -> bool {
        self.get_bool("core.bare").unwrap_or(false)
    }

    /// Default content written by `init`
    pub fn for_new_repository(bare: bool, algorithm: HashAlgorithm) -> Result<Self> {
        let mut config = Self::new();

        let format_version = match algorithm {
            HashAlgorithm::Sha1 => "0",
            HashAlgorithm::Sha256 => "1",
        };
        config.set("core.repositoryformatversion", format_version)?;
        config.set("core.filemode", "true")?;
        config.set("core.bare", bare.to_string())?;
        if algorithm != HashAlgorithm::Sha1 {
            config.set("extensions.objectformat", algorithm.as_str())?;
        }

        Ok(config)
    }
}
