//! Annotated tag object
//!
//! Annotated tags are objects of their own, distinct from the `refs/tags/*`
//! references that usually point at them. A tag may target another tag.
//!
//! ## Format
//!
//! ```text
//! object <target-id>
//! type <target-kind>
//! tag <tag-name>
//! tagger <name> <email> <timestamp> <timezone>    (absent in very old tags)
//!
//! <message>
//! ```

use crate::artifacts::objects::commit::split_headers;
use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::{HashAlgorithm, ObjectId};
use crate::artifacts::objects::object_kind::ObjectKind;
use crate::artifacts::objects::signature::Signature;
use crate::errors::{Error, Result};
use bytes::Bytes;
use derive_new::new;
use std::io::BufRead;

const SUBJECT: &str = "tag object";

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Tag {
    target: ObjectId,
    target_kind: ObjectKind,
    name: String,
    tagger: Option<Signature>,
    message: String,
}

impl Tag {
    pub fn target(&self) -> &ObjectId {
        &self.target
    }

    pub fn target_kind(&self) -> ObjectKind {
        self.target_kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tagger(&self) -> Option<&Signature> {
        self.tagger.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn short_message(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

impl Packable for Tag {
    fn serialize(&self) -> Result<Bytes> {
        let mut content = String::new();

        content.push_str(&format!("object {}\n", self.target));
        content.push_str(&format!("type {}\n", self.target_kind));
        content.push_str(&format!("tag {}\n", self.name));
        if let Some(tagger) = &self.tagger {
            content.push_str(&format!("tagger {}\n", tagger.display()));
        }
        content.push('\n');
        content.push_str(&self.message);

        Ok(Bytes::from(content))
    }
}

impl Unpackable for Tag {
    fn deserialize(mut reader: impl BufRead, algorithm: HashAlgorithm) -> Result<Self> {
        let mut content = Vec::new();
        reader
            .read_to_end(&mut content)
            .map_err(|e| Error::parse(SUBJECT, e.to_string()))?;
        let content =
            String::from_utf8(content).map_err(|_| Error::parse(SUBJECT, "not valid UTF-8"))?;

        let (headers, message) = split_headers(SUBJECT, &content)?;
        let mut headers = headers.into_iter();

        let target = match headers.next() {
            Some(("object", value)) => ObjectId::try_parse_with(algorithm, &value)
                .map_err(|_| Error::parse(SUBJECT, format!("invalid object id '{value}'")))?,
            _ => return Err(Error::parse(SUBJECT, "missing object line")),
        };
        let target_kind = match headers.next() {
            Some(("type", value)) => ObjectKind::from_name(&value)
                .ok_or_else(|| Error::parse(SUBJECT, format!("unknown target type '{value}'")))?,
            _ => return Err(Error::parse(SUBJECT, "missing type line")),
        };
        let name = match headers.next() {
            Some(("tag", value)) => value,
            _ => return Err(Error::parse(SUBJECT, "missing tag line")),
        };

        let mut tagger = None;
        for (key, value) in headers {
            if key == "tagger" && tagger.is_none() {
                tagger = Some(Signature::try_from(value.as_str())?);
            }
        }

        Ok(Tag {
            target,
            target_kind,
            name,
            tagger,
            message: message.to_string(),
        })
    }
}

impl Object for Tag {
    fn object_kind(&self) -> ObjectKind {
        ObjectKind::Tag
    }
}
