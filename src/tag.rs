//! Field kinds of a test vector template.
//!
//! Every template line starts with a three character tag name. The name table is fixed and
//! positionally aligned with [`Tag`], so `Tag::ALL[i].index() == i` and
//! `NAMES[i]` is the name of `Tag::ALL[i]`.

use crate::err::{Result, TemplateError};

use serde::{Serialize, Serializer};
use std::fmt;

/// Number of real tags (the `ERR` sentinel is not counted).
pub const TAG_COUNT: usize = 11;

/// Tag names, padded to three characters.
const NAMES: [&str; TAG_COUNT] = [
    "KEY", "PTX", "CTX", "NCE", "IV ", "HDR", "TGL", "TAG", "VEC", "GEN", "END",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Tag {
    /// Key.
    Key = 0,
    /// Plaintext.
    Ptx,
    /// Ciphertext.
    Ctx,
    /// Nonce.
    Nce,
    /// Initialization vector.
    Iv,
    /// Header, or associated data.
    Hdr,
    /// Tag length control.
    Tgl,
    /// Authentication tag.
    Tag,
    /// Vector boundary marker, carries the vector number.
    Vec,
    /// Marks a block as a generation request.
    Gen,
    /// End of the template file.
    End,
    /// `ERR`: returned for lines whose prefix matches no tag name.
    Unknown,
}

impl Tag {
    pub const ALL: [Tag; TAG_COUNT] = [
        Tag::Key,
        Tag::Ptx,
        Tag::Ctx,
        Tag::Nce,
        Tag::Iv,
        Tag::Hdr,
        Tag::Tgl,
        Tag::Tag,
        Tag::Vec,
        Tag::Gen,
        Tag::End,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Maps a declaration index back to its tag.
    pub fn from_index(index: usize) -> Result<Tag> {
        Tag::ALL
            .get(index)
            .copied()
            .ok_or(TemplateError::UnknownTag { index })
    }

    /// The tag name without padding, `ERR` for the sentinel.
    pub fn name(self) -> &'static str {
        match NAMES.get(self.index()) {
            Some(name) => name.trim_end(),
            None => "ERR",
        }
    }

    /// True for tags that carry vector data and take part in enumeration.
    ///
    /// `VEC`, `GEN` and `END` are control markers.
    pub fn is_field(self) -> bool {
        self.index() < Tag::Vec.index()
    }

    /// Matches the leading alphabetic prefix of `line` against the name table.
    ///
    /// Only the first three characters of the prefix are compared, ignoring case. The prefix
    /// must be followed by whitespace or the end of the line. Returns the tag and the rest of
    /// the line with leading whitespace removed, or [`Tag::Unknown`] and the whole line.
    pub fn split_line(line: &str) -> (Tag, &str) {
        let prefix_len = line
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(line.len());
        let (prefix, rest) = line.split_at(prefix_len);

        if prefix.len() < 2 || rest.chars().next().is_some_and(|c| !c.is_whitespace()) {
            return (Tag::Unknown, line);
        }

        let mut key = [b' '; 3];
        for (dst, src) in key.iter_mut().zip(prefix.bytes()) {
            *dst = src.to_ascii_uppercase();
        }

        match NAMES.iter().position(|name| name.as_bytes() == key) {
            Some(index) => (Tag::ALL[index], rest.trim_start()),
            None => (Tag::Unknown, line),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}
