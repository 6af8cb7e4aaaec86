//! Parsers for the flat-file passwd and group formats
//!
//! Used for `/etc/passwd`-style files and for `getent` output, which
//! share the same layout.

use crate::record::{GroupEntry, PasswdEntry};
use tracing::warn;

/// Parse a single `name:passwd:uid:gid:gecos:dir:shell` line
pub fn parse_passwd_line(line: &str) -> Result<PasswdEntry, String> {
    let fields: Vec<&str> = line.split(':').collect();
    if fields.len() != 7 {
        return Err(format!("expected 7 fields, found {}", fields.len()));
    }

    Ok(PasswdEntry {
        name: fields[0].to_string(),
        passwd: Some(fields[1].to_string()),
        uid: parse_id(fields[2], "uid")?,
        gid: parse_id(fields[3], "gid")?,
        gecos: Some(fields[4].to_string()),
        dir: Some(fields[5].to_string()),
        shell: Some(fields[6].to_string()),
    })
}

/// Parse a single `name:passwd:gid:member,member` line
pub fn parse_group_line(line: &str) -> Result<GroupEntry, String> {
    let fields: Vec<&str> = line.split(':').collect();
    if fields.len() != 4 {
        return Err(format!("expected 4 fields, found {}", fields.len()));
    }

    let members = fields[3]
        .split(',')
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect();

    Ok(GroupEntry {
        name: fields[0].to_string(),
        passwd: Some(fields[1].to_string()),
        gid: parse_id(fields[2], "gid")?,
        members: Some(members),
    })
}

/// Parse every entry of a passwd file, skipping lines that are not entries
pub fn parse_passwd(content: &str, origin: &str) -> Vec<PasswdEntry> {
    parse_lines(content, origin, parse_passwd_line)
}

/// Parse every entry of a group file, skipping lines that are not entries
pub fn parse_group(content: &str, origin: &str) -> Vec<GroupEntry> {
    parse_lines(content, origin, parse_group_line)
}

fn parse_lines<T>(
    content: &str,
    origin: &str,
    parse: impl Fn(&str) -> Result<T, String>,
) -> Vec<T> {
    let mut entries = Vec::new();

    for (number, line) in content.lines().enumerate() {
        if is_skippable(line) {
            continue;
        }
        match parse(line) {
            Ok(entry) => entries.push(entry),
            Err(reason) => warn!("{}:{}: skipping malformed line: {}", origin, number + 1, reason),
        }
    }

    entries
}

// Blank lines, comments and NIS compat (`+`/`-`) entries
fn is_skippable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#') || line.starts_with('+') || line.starts_with('-')
}

fn parse_id(field: &str, what: &str) -> Result<i64, String> {
    field
        .parse::<i64>()
        .map_err(|_| format!("invalid {} '{}'", what, field))
}
