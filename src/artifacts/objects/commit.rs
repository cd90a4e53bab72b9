//! Commit object
//!
//! Commits represent snapshots of the repository at specific points in time.
//! They contain:
//! - A tree object ID (directory snapshot)
//! - Parent commit ID(s) (for history)
//! - Author and committer information
//! - Commit message
//!
//! ## Format
//!
//! ```text
//! tree <tree-id>
//! parent <parent-id>
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//! encoding <encoding>          (optional)
//! <other-header> <value>       (optional, e.g. gpgsig, continuation lines start with ' ')
//!
//! <commit message>
//! ```

use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::{HashAlgorithm, ObjectId};
use crate::artifacts::objects::object_kind::ObjectKind;
use crate::artifacts::objects::signature::Signature;
use crate::errors::{Error, Result};
use bytes::Bytes;
use std::io::BufRead;

const SUBJECT: &str = "commit object";

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Commit {
    /// Parent commit IDs (empty for initial commit, multiple for merge commits)
    parents: Vec<ObjectId>,
    tree_oid: ObjectId,
    author: Signature,
    committer: Signature,
    encoding: Option<String>,
    /// Headers this model does not interpret, kept verbatim and in order
    extra_headers: Vec<(String, String)>,
    message: String,
}

impl Commit {
    /// Create a new commit whose committer is its author
    pub fn new(
        parents: Vec<ObjectId>,
        tree_oid: ObjectId,
        author: Signature,
        message: String,
    ) -> Self {
        Commit {
            parents,
            tree_oid,
            committer: author.clone(),
            author,
            encoding: None,
            extra_headers: Vec::new(),
            message,
        }
    }

    pub fn with_committer(mut self, committer: Signature) -> Self {
        self.committer = committer;
        self
    }

    /// Get the first line of the commit message
    pub fn short_message(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn tree_oid(&self) -> &ObjectId {
        &self.tree_oid
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    pub fn parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    pub fn author(&self) -> &Signature {
        &self.author
    }

    pub fn committer(&self) -> &Signature {
        &self.committer
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Value of a header the model does not interpret (e.g. `gpgsig`)
    pub fn extra_header(&self, name: &str) -> Option<&str> {
        self.extra_headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Split an object body into `(key, value)` headers and the message
///
/// Continuation lines (leading space) are folded into the previous value with
/// a newline. Shared by commits and tags.
pub(crate) fn split_headers<'a>(
    subject: &str,
    content: &'a str,
) -> Result<(Vec<(&'a str, String)>, &'a str)> {
    let (head, message) = match content.find("\n\n") {
        Some(index) => (&content[..index], &content[index + 2..]),
        None => (content.strip_suffix('\n').unwrap_or(content), ""),
    };

    let mut headers: Vec<(&str, String)> = Vec::new();
    for line in head.split('\n') {
        if let Some(continuation) = line.strip_prefix(' ') {
            let (_, value) = headers
                .last_mut()
                .ok_or_else(|| Error::parse(subject, "continuation line without a header"))?;
            value.push('\n');
            value.push_str(continuation);
        } else {
            let (key, value) = line
                .split_once(' ')
                .ok_or_else(|| Error::parse(subject, format!("invalid header line '{line}'")))?;
            headers.push((key, value.to_string()));
        }
    }

    Ok((headers, message))
}

impl Packable for Commit {
    fn serialize(&self) -> Result<Bytes> {
        let mut content = String::new();

        content.push_str(&format!("tree {}\n", self.tree_oid));
        for parent in &self.parents {
            content.push_str(&format!("parent {parent}\n"));
        }
        content.push_str(&format!("author {}\n", self.author.display()));
        content.push_str(&format!("committer {}\n", self.committer.display()));
        if let Some(encoding) = &self.encoding {
            content.push_str(&format!("encoding {encoding}\n"));
        }
        for (key, value) in &self.extra_headers {
            content.push_str(&format!("{key} {}\n", value.replace('\n', "\n ")));
        }
        content.push('\n');
        content.push_str(&self.message);

        Ok(Bytes::from(content))
    }
}

impl Unpackable for Commit {
    fn deserialize(mut reader: impl BufRead, algorithm: HashAlgorithm) -> Result<Self> {
        let mut content = Vec::new();
        reader
            .read_to_end(&mut content)
            .map_err(|e| Error::parse(SUBJECT, e.to_string()))?;
        let content =
            String::from_utf8(content).map_err(|_| Error::parse(SUBJECT, "not valid UTF-8"))?;

        let (headers, message) = split_headers(SUBJECT, &content)?;
        let mut headers = headers.into_iter().peekable();

        let parse_oid = |value: &str| {
            ObjectId::try_parse_with(algorithm, value)
                .map_err(|_| Error::parse(SUBJECT, format!("invalid object id '{value}'")))
        };

        let tree_oid = match headers.next() {
            Some(("tree", value)) => parse_oid(value.as_str())?,
            _ => return Err(Error::parse(SUBJECT, "missing tree line")),
        };

        // Parse all parent lines (there can be 0, 1, or multiple parents)
        let mut parents = Vec::new();
        while let Some((_, value)) = headers.next_if(|(key, _)| *key == "parent") {
            parents.push(parse_oid(value.as_str())?);
        }

        let author = match headers.next() {
            Some(("author", value)) => Signature::try_from(value.as_str())?,
            _ => return Err(Error::parse(SUBJECT, "missing author line")),
        };
        let committer = match headers.next() {
            Some(("committer", value)) => Signature::try_from(value.as_str())?,
            _ => return Err(Error::parse(SUBJECT, "missing committer line")),
        };

        let mut encoding = None;
        let mut extra_headers = Vec::new();
        for (key, value) in headers {
            match key {
                "tree" | "author" | "committer" => {
                    return Err(Error::parse(SUBJECT, format!("repeated {key} line")));
                }
                "encoding" if encoding.is_none() => encoding = Some(value),
                _ => extra_headers.push((key.to_string(), value)),
            }
        }

        Ok(Commit {
            parents,
            tree_oid,
            author,
            committer,
            encoding,
            extra_headers,
            message: message.to_string(),
        })
    }
}

impl Object for Commit {
    fn object_kind(&self) -> ObjectKind {
        ObjectKind::Commit
    }
}
