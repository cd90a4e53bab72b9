//! Author, committer and tagger identities
//!
//! ## Format
//!
//! `<name> <<email>> <unix-seconds> <+hhmm>`, e.g.
//! `Al <al@x> 1700000000 +0200`

use crate::errors::{Error, Result};
use chrono::{DateTime, FixedOffset, TimeZone};

/// Identity plus the moment it acted
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Signature {
    name: String,
    email: String,
    timestamp: DateTime<FixedOffset>,
}

impl Signature {
    /// Create a new signature with the current local time
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Signature {
            name: name.into(),
            email: email.into(),
            timestamp: chrono::Local::now().fixed_offset(),
        }
    }

    pub fn new_with_timestamp(
        name: impl Into<String>,
        email: impl Into<String>,
        timestamp: DateTime<FixedOffset>,
    ) -> Self {
        Signature {
            name: name.into(),
            email: email.into(),
            timestamp,
        }
    }

    /// Create a signature from a unix time and a UTC offset in minutes
    pub fn from_unix(
        name: impl Into<String>,
        email: impl Into<String>,
        seconds: i64,
        offset_minutes: i32,
    ) -> Result<Self> {
        let offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                Error::parse("signature", format!("invalid UTC offset {offset_minutes}"))
            })?;
        let timestamp = offset
            .timestamp_opt(seconds, 0)
            .single()
            .ok_or_else(|| Error::parse("signature", format!("invalid timestamp {seconds}")))?;

        Ok(Self::new_with_timestamp(name, email, timestamp))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    pub fn offset_minutes(&self) -> i32 {
        self.timestamp.offset().local_minus_utc() / 60
    }

    /// Render in the object format: `Name <email> seconds +hhmm`
    pub fn display(&self) -> String {
        format!(
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.timestamp.timestamp(),
            self.timestamp.format("%z")
        )
    }
}

impl TryFrom<&str> for Signature {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::parse("signature", format!("{reason} in '{value}'"));

        let email_start = value.find('<').ok_or_else(|| invalid("missing '<'"))?;
        let email_end = value.rfind('>').ok_or_else(|| invalid("missing '>'"))?;
        if email_end < email_start {
            return Err(invalid("misplaced '>'"));
        }

        let name = value[..email_start].trim().to_string();
        let email = value[email_start + 1..email_end].to_string();

        let mut when = value[email_end + 1..].split_whitespace();
        let seconds = when
            .next()
            .and_then(|seconds| seconds.parse::<i64>().ok())
            .ok_or_else(|| invalid("invalid timestamp"))?;
        let offset_minutes = match when.next() {
            Some(timezone) => parse_timezone(timezone).ok_or_else(|| invalid("invalid timezone"))?,
            None => 0,
        };

        Signature::from_unix(name, email, seconds, offset_minutes)
    }
}

/// `+hhmm` / `-hhmm` into minutes east of UTC
fn parse_timezone(timezone: &str) -> Option<i32> {
    let (sign, digits) = match timezone.as_bytes().first()? {
        b'+' => (1, &timezone[1..]),
        b'-' => (-1, &timezone[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;

    Some(sign * (hours * 60 + minutes))
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}
