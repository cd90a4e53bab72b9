//! Parser for the git INI-like configuration format

use super::{Config, Section};
use crate::artifacts::refs::reference_name::compile;
use crate::errors::{Error, Result};

/// `[section]` or `[section "subsection"]`
const SECTION_HEADER_REGEX: &str = r#"^\[\s*([A-Za-z0-9.-]+)(?:\s+"((?:[^"\\]|\\.)*)")?\s*\]$"#;
const KEY_REGEX: &str = r"^[A-Za-z][A-Za-z0-9-]*$";

const CONFIG_FILE: &str = "config";

pub(super) fn parse(content: &str) -> Result<Config> {
    let section_header = compile(SECTION_HEADER_REGEX)?;
    let valid_key = compile(KEY_REGEX)?;

    let mut config = Config::new();

    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        let malformed = |reason: String| {
            Error::parse(CONFIG_FILE, format!("line {}: {reason}", number + 1))
        };

        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') {
            let captures = section_header
                .captures(line)
                .ok_or_else(|| malformed(format!("bad section header '{line}'")))?;
            config.sections.push(Section::new(
                captures[1].to_lowercase(),
                captures.get(2).map(|sub| unescape(sub.as_str())),
            ));
            continue;
        }

        let (key, value) = match line.split_once('=') {
            Some((key, value)) => (key.trim(), parse_value(value)),
            // a bare key is boolean true
            None => (line, "true".to_string()),
        };

        if !valid_key.is_match(key) {
            return Err(malformed(format!("bad key '{key}'")));
        }

        let section = config
            .sections
            .last_mut()
            .ok_or_else(|| malformed(format!("key '{key}' outside of any section")))?;
        section.entries.push((key.to_lowercase(), value));
    }

    Ok(config)
}

fn parse_value(raw: &str) -> String {
    let mut value = String::with_capacity(raw.len());
    // unquoted trailing whitespace is dropped
    let mut significant = 0;
    let mut in_quotes = false;
    let mut chars = raw.trim().chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                continue;
            }
            '#' | ';' if !in_quotes => break,
            '\\' => match chars.next() {
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some(other) => value.push(other),
                None => value.push('\\'),
            },
            _ => value.push(c),
        }

        if in_quotes || c == '\\' || !c.is_whitespace() {
            significant = value.len();
        }
    }

    value.truncate(significant);
    value
}

fn unescape(subsection: &str) -> String {
    let mut result = String::with_capacity(subsection.len());
    let mut chars = subsection.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                result.push(next);
            }
        } else {
            result.push(c);
        }
    }

    result
}

pub(super) fn escape_value(value: &str) -> String {
    let needs_quotes = value.starts_with(' ')
        || value.ends_with(' ')
        || value.contains(['#', ';']);

    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(c),
        }
    }

    if needs_quotes {
        format!("\"{escaped}\"")
    } else {
        escaped
    }
}

pub(super) fn escape_subsection(subsection: &str) -> String {
    subsection.replace('\\', "\\\\").replace('"', "\\\"")
}
