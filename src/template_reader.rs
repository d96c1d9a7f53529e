//! Reads template files block by block.
//!
//! A file is a sequence of tag lines. `VEC n` opens a block, the field lines after it fill the
//! block, and the next `VEC` line opens the following one. `END` ends the file, anything after
//! it is never read. A file without `VEC` lines is a single block.
//!
//! ```text
//! ; AES-CCM, two plaintexts
//! VEC 1
//! KEY 404142434445464748494a4b4c4d4e4f
//! NCE 10111213141516
//! PTX 20212223,#16
//! END
//! ```

use crate::err::{Result, TemplateError};
use crate::tag::Tag;
use crate::template::Template;

use log::{debug, warn};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderSettings {
    strict: bool,
    comment_prefixes: Vec<String>,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        ReaderSettings {
            strict: false,
            comment_prefixes: vec![";".to_owned(), "//".to_owned()],
        }
    }
}

impl ReaderSettings {
    pub fn new() -> Self {
        ReaderSettings::default()
    }

    /// When set, a line that matches no tag fails the read instead of being skipped.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Lines starting with any of `prefixes` are skipped.
    pub fn comment_prefixes(mut self, prefixes: &[&str]) -> Self {
        self.comment_prefixes = prefixes.iter().map(|p| (*p).to_owned()).collect();
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    fn is_comment(&self, line: &str) -> bool {
        self.comment_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && line.starts_with(prefix.as_str()))
    }
}

pub struct TemplateReader<R: BufRead> {
    lines: io::Split<R>,
    settings: ReaderSettings,
    line_no: usize,
    /// A `VEC` line that opened the next block while the current one was being read.
    pending: Option<String>,
    next_vector: u64,
    finished: bool,
}

impl TemplateReader<BufReader<File>> {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let f = File::open(path.as_ref())?;
        Ok(TemplateReader::new(BufReader::new(f)))
    }
}

impl<R: BufRead> TemplateReader<R> {
    pub fn new(reader: R) -> Self {
        TemplateReader {
            lines: reader.split(b'\n'),
            settings: ReaderSettings::default(),
            line_no: 0,
            pending: None,
            next_vector: 1,
            finished: false,
        }
    }

    pub fn with_configuration(mut self, settings: ReaderSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Reads the next block into `template`, replacing whatever it held.
    ///
    /// Returns the block's vector number, taken from its `VEC` line or counted up from the
    /// previous block, or `None` once the file is exhausted or `END` was read.
    pub fn read_block(&mut self, template: &mut Template) -> Result<Option<u64>> {
        template.reset();
        if self.finished {
            return Ok(None);
        }

        let mut vector = None;
        let mut has_content = false;

        loop {
            let line = match self.pending.take() {
                Some(line) => line,
                None => match self.lines.next() {
                    Some(bytes) => {
                        self.line_no += 1;
                        match String::from_utf8(bytes?) {
                            Ok(line) => line,
                            Err(e) => {
                                let line = String::from_utf8_lossy(e.as_bytes()).trim().to_owned();
                                if self.settings.strict {
                                    return Err(TemplateError::UnknownLine {
                                        line_no: self.line_no,
                                        line,
                                    });
                                }
                                warn!("line {}: skipping non UTF-8 line `{}`", self.line_no, line);
                                continue;
                            }
                        }
                    }
                    None => {
                        self.finished = true;
                        break;
                    }
                },
            };

            let line = line.trim();
            if line.is_empty() || self.settings.is_comment(line) {
                continue;
            }

            let (tag, rest) = Tag::split_line(line);
            match tag {
                Tag::Unknown => {
                    if self.settings.strict {
                        return Err(TemplateError::UnknownLine {
                            line_no: self.line_no,
                            line: line.to_owned(),
                        });
                    }
                    debug!("line {}: skipping `{}`", self.line_no, line);
                }
                Tag::End => {
                    self.finished = true;
                    break;
                }
                Tag::Vec if has_content => {
                    self.pending = Some(line.to_owned());
                    break;
                }
                Tag::Vec => {
                    template.set_tag(line);
                    vector = match rest.parse::<u64>() {
                        Ok(number) => Some(number),
                        Err(_) => {
                            if !rest.is_empty() {
                                warn!("line {}: `{}` is not a vector number", self.line_no, rest);
                            }
                            None
                        }
                    };
                    has_content = true;
                }
                _ => {
                    template.set_tag(line);
                    if tag.is_field() {
                        template.register_tag(tag)?;
                    }
                    has_content = true;
                }
            }
        }

        if !has_content {
            return Ok(None);
        }

        let number = vector.unwrap_or(self.next_vector);
        self.next_vector = number.saturating_add(1);
        debug!(
            "read vector block {} with fields {:?}",
            number,
            template.tag_order()
        );
        Ok(Some(number))
    }
}
