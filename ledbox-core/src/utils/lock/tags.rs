//! Registered RFID tags.

use core::fmt;

use heapless::{String, Vec};
use serde::{Serialize, Serializer};

/// Longest UID an RC522 reports.
pub const MAX_UID_LEN: usize = 10;
/// Tags the lock remembers.
pub const MAX_TAGS: usize = 8;
/// Name bytes kept per tag.
pub const MAX_NAME_LEN: usize = 31;

pub type Uid = Vec<u8, MAX_UID_LEN>;

/// Factory tag every lock starts with.
const SEED_UID: [u8; 4] = [0xE3, 0x59, 0x28, 0xF7];
const SEED_NAME: &str = "Chica";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagListError {
    Duplicate,
    Full,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagEntry {
    #[serde(serialize_with = "serialize_uid")]
    pub uid: Uid,
    pub name: String<MAX_NAME_LEN>,
}

impl TagEntry {
    /// Build an entry, cutting `name` down to [`MAX_NAME_LEN`] bytes.
    pub fn new(
        uid: Uid,
        name: &str,
    ) -> Self {
        Self {
            uid,
            name: truncated(name),
        }
    }
}

fn truncated(name: &str) -> String<MAX_NAME_LEN> {
    let mut end = name.len().min(MAX_NAME_LEN);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::new();
    // `end` fits by construction
    let _ = out.push_str(&name[..end]);
    out
}

/// Fixed-capacity list of tags allowed to open the door. UIDs are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagList {
    tags: Vec<TagEntry, MAX_TAGS>,
}

impl TagList {
    /// The list a fresh lock starts with.
    pub fn seeded() -> Self {
        let mut list = Self::default();
        let uid = Uid::from_slice(&SEED_UID).unwrap_or_default();
        let _ = list.add(uid, SEED_NAME);
        list
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.tags.is_full()
    }

    pub fn contains(
        &self,
        uid: &[u8],
    ) -> bool {
        self.tags.iter().any(|t| t.uid.as_slice() == uid)
    }

    pub fn add(
        &mut self,
        uid: Uid,
        name: &str,
    ) -> Result<(), TagListError> {
        if self.contains(&uid) {
            return Err(TagListError::Duplicate);
        }
        self.tags
            .push(TagEntry::new(uid, name))
            .map_err(|_| TagListError::Full)
    }

    /// Remove a tag, keeping the others in order.
    pub fn remove(
        &mut self,
        uid: &[u8],
    ) -> Result<TagEntry, TagListError> {
        let pos = self
            .tags
            .iter()
            .position(|t| t.uid.as_slice() == uid)
            .ok_or(TagListError::NotFound)?;
        Ok(self.tags.remove(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagEntry> {
        self.tags.iter()
    }

    pub fn entries(&self) -> &[TagEntry] {
        &self.tags
    }
}

/// Parse `"E3 59 28 F7"`, `"e3:59:28:f7"` or `"E35928F7"`.
pub fn parse_uid(text: &str) -> Option<Uid> {
    let mut uid = Uid::new();
    let mut high: Option<u8> = None;
    for c in text.chars() {
        if c == ' ' || c == ':' || c == '-' {
            if high.is_some() {
                return None;
            }
            continue;
        }
        let nibble = c.to_digit(16)? as u8;
        match high.take() {
            Some(h) => uid.push(h << 4 | nibble).ok()?,
            None => high = Some(nibble),
        }
    }
    if high.is_some() || uid.is_empty() {
        return None;
    }
    Some(uid)
}

/// Upper-case hex bytes separated by spaces.
pub struct UidHex<'a>(pub &'a [u8]);

impl fmt::Display for UidHex<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}

fn serialize_uid<S: Serializer>(
    uid: &Uid,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&UidHex(uid))
}
