//! Identity records and their cache value format
//!
//! Values use the flat-file layout readers already know from `/etc/passwd`
//! and `/etc/group`. Fields are joined with `:` and never escaped.

use crate::error::{UpdateDbError, UpdateDbResult};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// The two maps a cache can be built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MapKind {
    /// User accounts
    Passwd,
    /// Groups
    Group,
}

impl MapKind {
    /// All maps, in update order
    pub const ALL: [MapKind; 2] = [MapKind::Passwd, MapKind::Group];

    /// Default location of this map's cache file
    pub fn default_path(&self) -> PathBuf {
        match self {
            Self::Passwd => PathBuf::from("/var/db/passwd.db"),
            Self::Group => PathBuf::from("/var/db/group.db"),
        }
    }
}

impl fmt::Display for MapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Passwd => "passwd",
            Self::Group => "group",
        };
        write!(f, "{}", name)
    }
}

/// A record that can be indexed in a cache session
pub trait CacheRecord {
    /// Map the record belongs to
    const MAP: MapKind;

    /// Primary name; empty means absent
    fn name(&self) -> &str;

    /// Primary numeric id (uid or gid), possibly negative
    fn id(&self) -> i64;

    /// Canonical single-line value stored under every key of the record
    fn to_cache_value(&self) -> UpdateDbResult<String>;
}

/// A user account entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswdEntry {
    pub name: String,
    pub passwd: Option<String>,
    pub uid: i64,
    pub gid: i64,
    pub gecos: Option<String>,
    pub dir: Option<String>,
    pub shell: Option<String>,
}

impl PasswdEntry {
    /// Create an entry with only the required fields set
    pub fn new(name: impl Into<String>, uid: i64, gid: i64) -> Self {
        Self {
            name: name.into(),
            uid,
            gid,
            ..Self::default()
        }
    }
}

impl CacheRecord for PasswdEntry {
    const MAP: MapKind = MapKind::Passwd;

    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> i64 {
        self.uid
    }

    fn to_cache_value(&self) -> UpdateDbResult<String> {
        if self.name.is_empty() {
            return Err(UpdateDbError::MissingName { map: Self::MAP });
        }

        let uid = self.uid.to_string();
        let gid = self.gid.to_string();
        let fields: [&str; 7] = [
            &self.name,
            self.passwd.as_deref().unwrap_or("x"),
            &uid,
            &gid,
            self.gecos.as_deref().unwrap_or(""),
            self.dir.as_deref().unwrap_or(""),
            self.shell.as_deref().unwrap_or(""),
        ];

        join_fields(&fields, &self.name)
    }
}

/// A group entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupEntry {
    pub name: String,
    pub passwd: Option<String>,
    pub gid: i64,
    pub members: Option<Vec<String>>,
}

impl GroupEntry {
    /// Create a group with no password and no member list
    pub fn new(name: impl Into<String>, gid: i64) -> Self {
        Self {
            name: name.into(),
            gid,
            ..Self::default()
        }
    }

    /// Set the member list
    pub fn with_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members = Some(members.into_iter().map(Into::into).collect());
        self
    }
}

impl CacheRecord for GroupEntry {
    const MAP: MapKind = MapKind::Group;

    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> i64 {
        self.gid
    }

    fn to_cache_value(&self) -> UpdateDbResult<String> {
        if self.name.is_empty() {
            return Err(UpdateDbError::MissingName { map: Self::MAP });
        }

        let members = self.members.as_deref().unwrap_or(&[]);
        let members_len = members.iter().map(String::len).sum::<usize>()
            + members.len().saturating_sub(1);

        let mut members_field = String::new();
        members_field.try_reserve_exact(members_len).map_err(|e| {
            UpdateDbError::out_of_memory(format!("listing members of {}", self.name), e)
        })?;
        for (i, member) in members.iter().enumerate() {
            if i > 0 {
                members_field.push(',');
            }
            members_field.push_str(member);
        }

        let gid = self.gid.to_string();
        let fields: [&str; 4] = [
            &self.name,
            self.passwd.as_deref().unwrap_or("x"),
            &gid,
            &members_field,
        ];

        join_fields(&fields, &self.name)
    }
}

/// Join fields with `:` into a freshly reserved buffer
fn join_fields(fields: &[&str], name: &str) -> UpdateDbResult<String> {
    let len = fields.iter().map(|f| f.len()).sum::<usize>() + fields.len() - 1;

    let mut value = String::new();
    value
        .try_reserve_exact(len)
        .map_err(|e| UpdateDbError::out_of_memory(format!("serializing {}", name), e))?;

    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            value.push(':');
        }
        value.push_str(field);
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatusKind;

    #[test]
    fn passwd_defaults() {
        let entry = PasswdEntry::new("alice", 1000, 1000);
        assert_eq!(entry.to_cache_value().unwrap(), "alice:x:1000:1000:::");
    }

    #[test]
    fn passwd_all_fields() {
        let entry = PasswdEntry {
            name: "bob".to_string(),
            passwd: Some("*".to_string()),
            uid: 1001,
            gid: 100,
            gecos: Some("Bob Builder,,,".to_string()),
            dir: Some("/home/bob".to_string()),
            shell: Some("/bin/zsh".to_string()),
        };
        assert_eq!(
            entry.to_cache_value().unwrap(),
            "bob:*:1001:100:Bob Builder,,,:/home/bob:/bin/zsh"
        );
    }

    #[test]
    fn passwd_colons_not_escaped() {
        let mut entry = PasswdEntry::new("carol", 7, 7);
        entry.gecos = Some("a:b".to_string());
        assert_eq!(entry.to_cache_value().unwrap(), "carol:x:7:7:a:b::");
    }

    #[test]
    fn passwd_large_uid_keeps_digits() {
        let entry = PasswdEntry::new("nfsnobody", 4294967294, 4294967294);
        assert_eq!(
            entry.to_cache_value().unwrap(),
            "nfsnobody:x:4294967294:4294967294:::"
        );
    }

    #[test]
    fn passwd_negative_ids_keep_sign() {
        let entry = PasswdEntry::new("nobody", -2, -2);
        assert_eq!(entry.to_cache_value().unwrap(), "nobody:x:-2:-2:::");
        assert_eq!(entry.id(), -2);
    }

    #[test]
    fn passwd_missing_name() {
        let entry = PasswdEntry::new("", 0, 0);
        let err = entry.to_cache_value().unwrap_err();
        assert_eq!(err.kind(), StatusKind::NotFound);
    }

    #[test]
    fn group_members_joined() {
        let group = GroupEntry::new("wheel", 10).with_members(["root", "alice"]);
        assert_eq!(group.to_cache_value().unwrap(), "wheel:x:10:root,alice");
    }

    #[test]
    fn group_without_members() {
        let group = GroupEntry::new("nogroup", 65534);
        assert_eq!(group.to_cache_value().unwrap(), "nogroup:x:65534:");

        let empty = GroupEntry::new("empty", 5).with_members(Vec::<String>::new());
        assert_eq!(empty.to_cache_value().unwrap(), "empty:x:5:");
    }

    #[test]
    fn group_negative_gid() {
        let group = GroupEntry::new("nogroup", -2);
        assert_eq!(group.to_cache_value().unwrap(), "nogroup:x:-2:");
    }

    #[test]
    fn group_password_kept() {
        let mut group = GroupEntry::new("staff", 50).with_members(["dave"]);
        group.passwd = Some("!".to_string());
        assert_eq!(group.to_cache_value().unwrap(), "staff:!:50:dave");
    }

    #[test]
    fn group_missing_name() {
        let group = GroupEntry::new("", 1).with_members(["x"]);
        assert!(matches!(
            group.to_cache_value(),
            Err(UpdateDbError::MissingName {
                map: MapKind::Group
            })
        ));
    }

    #[test]
    fn map_kind_display() {
        assert_eq!(MapKind::Passwd.to_string(), "passwd");
        assert_eq!(MapKind::Group.to_string(), "group");
        assert_eq!(MapKind::Group.default_path(), PathBuf::from("/var/db/group.db"));
    }
}
