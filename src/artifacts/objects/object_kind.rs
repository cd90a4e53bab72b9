use std::io::BufRead;

/// The four kinds of objects a store can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
    Tag,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
            ObjectKind::Tag => "tag",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "blob" => Some(ObjectKind::Blob),
            "tree" => Some(ObjectKind::Tree),
            "commit" => Some(ObjectKind::Commit),
            "tag" => Some(ObjectKind::Tag),
            _ => None,
        }
    }

    /// The `<kind> <size>\0` prefix every stored object starts with.
    pub fn header(&self, size: usize) -> String {
        format!("{} {}\0", self.as_str(), size)
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind and payload size of a stored object, read without decoding the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHeader {
    pub kind: ObjectKind,
    pub size: usize,
}

impl ObjectHeader {
    /// Parse `<kind> <size>\0` from the start of an inflated object.
    ///
    /// Leaves the reader positioned at the first payload byte. The error is a
    /// plain reason; callers know which object it belongs to.
    pub(crate) fn parse(reader: &mut impl BufRead) -> Result<Self, String> {
        let mut kind = Vec::new();
        reader
            .read_until(b' ', &mut kind)
            .map_err(|e| e.to_string())?;
        if kind.pop() != Some(b' ') {
            return Err("unexpected end of object header".to_string());
        }

        let kind = std::str::from_utf8(&kind)
            .ok()
            .and_then(ObjectKind::from_name)
            .ok_or_else(|| {
                format!(
                    "unknown object kind '{}'",
                    String::from_utf8_lossy(&kind)
                )
            })?;

        let mut size = Vec::new();
        reader
            .read_until(b'\0', &mut size)
            .map_err(|e| e.to_string())?;
        if size.pop() != Some(b'\0') {
            return Err("unexpected end of object header".to_string());
        }

        // decimal without sign or leading zeros, the way every writer emits it
        let size = std::str::from_utf8(&size)
            .ok()
            .filter(|s| !s.is_empty() && (s == &"0" || !s.starts_with('0')))
            .filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or_else(|| format!("invalid object size '{}'", String::from_utf8_lossy(&size)))?;

        Ok(ObjectHeader { kind, size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    #[test]
    fn parses_header_and_leaves_payload() {
        let mut reader = Cursor::new(b"commit 11\0hello world".to_vec());
        let header = ObjectHeader::parse(&mut reader).unwrap();

        assert_eq!(
            header,
            ObjectHeader {
                kind: ObjectKind::Commit,
                size: 11
            }
        );

        let mut rest = String::new();
        reader.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "hello world");
    }

    #[test]
    fn rejects_unknown_kinds_and_bad_sizes() {
        assert!(ObjectHeader::parse(&mut Cursor::new(b"note 3\0abc".to_vec())).is_err());
        assert!(ObjectHeader::parse(&mut Cursor::new(b"blob 03\0abc".to_vec())).is_err());
        assert!(ObjectHeader::parse(&mut Cursor::new(b"blob -3\0abc".to_vec())).is_err());
        assert!(ObjectHeader::parse(&mut Cursor::new(b"blob 3".to_vec())).is_err());
    }

    #[test]
    fn empty_payload_has_size_zero() {
        let header = ObjectHeader::parse(&mut Cursor::new(b"blob 0\0".to_vec())).unwrap();
        assert_eq!(header.size, 0);
    }
}
