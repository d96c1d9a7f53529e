use crate::tag::Tag;

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TemplateError>;

#[derive(Debug, Error)]
pub enum TemplateError {
    /// A tag index outside the fixed enumeration, or the `ERR` sentinel, was used for lookup.
    #[error("unknown tag (index {index})")]
    UnknownTag { index: usize },

    /// `add_tag` was called for a tag the template already holds.
    #[error("tag `{tag}` is already registered")]
    DuplicateTag { tag: Tag },

    #[error("cannot convert {len} bytes to a 64-bit number (at most 8 bytes are allowed)")]
    NumberTooWide { len: usize },

    #[error("line {line_no}: unrecognized tag in `{line}`")]
    UnknownLine { line_no: usize, line: String },

    #[error("an I/O error has occurred: {0}")]
    Io(#[from] io::Error),
}
