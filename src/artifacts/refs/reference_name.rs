use crate::errors::{Error, Result};

/// Anything matching this is not a valid reference name: a component starting
/// with `.`, `..` anywhere, leading/trailing/double `/`, a component ending in
/// `.lock`, a trailing `.`, `@{`, and control or `*:?[\~^` characters.
pub const INVALID_REF_NAME_REGEX: &str =
    r"^\.|\/\.|\.\.|^\/|\/$|\/\/|\.lock$|\.lock\/|\.$|@\{|[\x00-\x20\*:\?\[\\~\^\x7f]";

/// One-level names outside `refs/` (`HEAD`, `FETCH_HEAD`, `ORIG_HEAD`, ...)
const PSEUDO_REF_REGEX: &str = r"^[A-Z][A-Z_]*$";

pub const REFS_PREFIX: &str = "refs/";
pub const HEADS_PREFIX: &str = "refs/heads/";
pub const TAGS_PREFIX: &str = "refs/tags/";

pub(crate) fn compile(pattern: &str) -> Result<regex::Regex> {
    regex::Regex::new(pattern)
        .map_err(|error| Error::parse(format!("pattern {pattern}"), error.to_string()))
}

/// A validated, full reference name such as `refs/heads/main` or `HEAD`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferenceName(String);

impl ReferenceName {
    pub fn try_parse(name: impl Into<String>) -> Result<Self> {
        let name = name.into();

        let invalid = compile(INVALID_REF_NAME_REGEX)?;
        let pseudo_ref = compile(PSEUDO_REF_REGEX)?;

        let well_formed = !name.is_empty()
            && name != "@"
            && !invalid.is_match(&name)
            && (name.starts_with(REFS_PREFIX) || pseudo_ref.is_match(&name));

        if well_formed {
            Ok(Self(name))
        } else {
            Err(Error::InvalidReferenceName(name))
        }
    }

    /// `refs/tags/<short name>`
    pub fn tag(short_name: &str) -> Result<Self> {
        Self::try_parse(format!("{TAGS_PREFIX}{short_name}"))
    }

    /// `refs/heads/<short name>`
    pub fn branch(short_name: &str) -> Result<Self> {
        Self::try_parse(format!("{HEADS_PREFIX}{short_name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name without its `refs/heads/`, `refs/tags/` or `refs/` prefix
    pub fn short_name(&self) -> &str {
        [HEADS_PREFIX, TAGS_PREFIX, REFS_PREFIX]
            .iter()
            .find_map(|prefix| self.0.strip_prefix(prefix))
            .unwrap_or(&self.0)
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for ReferenceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReferenceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
