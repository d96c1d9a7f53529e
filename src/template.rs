use crate::err::{Result, TemplateError};
use crate::field_record::{FieldRecord, Step};
use crate::tag::Tag;

use hashbrown::HashMap;
use log::{debug, trace};

/// One vector block: a [`FieldRecord`] for every tag, plus the order in which field tags were
/// first referenced.
///
/// Enumeration treats the referenced fields as the digits of an odometer. The last declared
/// field is the least significant digit and changes on every call to [`Template::next`]; the
/// first declared field changes only when every field after it wraps. A template with fields
/// `KEY a,b` and `PTX x,y,z` therefore yields `(a,x) (a,y) (a,z) (b,x) (b,y) (b,z)`.
#[derive(Debug)]
pub struct Template {
    records: HashMap<Tag, FieldRecord>,
    tag_order: Vec<Tag>,
    primed: bool,
    generator: bool,
}

impl Default for Template {
    fn default() -> Self {
        Self::new()
    }
}

impl Template {
    /// Creates a template with an empty record for every tag.
    pub fn new() -> Self {
        let records = Tag::ALL
            .iter()
            .map(|tag| (*tag, FieldRecord::new()))
            .collect();

        Template {
            records,
            tag_order: Vec::new(),
            primed: false,
            generator: false,
        }
    }

    /// Adds a fresh record for `tag`.
    ///
    /// Every tag is present from construction, so for any real tag this reports
    /// [`TemplateError::DuplicateTag`].
    pub fn add_tag(&mut self, tag: Tag) -> Result<()> {
        if tag == Tag::Unknown {
            return Err(TemplateError::UnknownTag { index: tag.index() });
        }
        if self.records.contains_key(&tag) {
            return Err(TemplateError::DuplicateTag { tag });
        }

        self.records.insert(tag, FieldRecord::new());
        Ok(())
    }

    /// Routes one template line to the record named by its prefix.
    ///
    /// Returns [`Tag::Unknown`] and leaves the template untouched when the prefix matches no
    /// tag. Callers decide whether that is an error.
    pub fn set_tag(&mut self, line: &str) -> Tag {
        let (tag, rest) = Tag::split_line(line);

        match self.records.get_mut(&tag) {
            Some(record) => {
                record.add_to_record(rest);
                if tag == Tag::Gen {
                    self.generator = true;
                }
                tag
            }
            None => {
                debug!("no tag matches line `{}`", line);
                Tag::Unknown
            }
        }
    }

    /// Appends `tag` to the enumeration order, unless it is already there.
    pub fn register_tag(&mut self, tag: Tag) -> Result<()> {
        if !self.records.contains_key(&tag) {
            return Err(TemplateError::UnknownTag { index: tag.index() });
        }
        if !self.tag_order.contains(&tag) {
            self.tag_order.push(tag);
        }
        Ok(())
    }

    pub fn tag_order(&self) -> &[Tag] {
        &self.tag_order
    }

    /// True once a `GEN` line was read into this block.
    pub fn is_generator(&self) -> bool {
        self.generator
    }

    pub fn record(&self, tag: Tag) -> Result<&FieldRecord> {
        self.records
            .get(&tag)
            .ok_or(TemplateError::UnknownTag { index: tag.index() })
    }

    pub fn record_mut(&mut self, tag: Tag) -> Result<&mut FieldRecord> {
        self.records
            .get_mut(&tag)
            .ok_or(TemplateError::UnknownTag { index: tag.index() })
    }

    /// Looks a record up by its tag's declaration index.
    pub fn record_at(&mut self, index: usize) -> Result<&mut FieldRecord> {
        let tag = Tag::from_index(index)?;
        self.record_mut(tag)
    }

    /// Clears the enumeration order and every record's text, ready for the next block.
    pub fn reset(&mut self) {
        self.tag_order.clear();
        for record in self.records.values_mut() {
            record.reset();
        }
        self.primed = false;
        self.generator = false;
    }

    /// Moves to the next combination of field values.
    ///
    /// The first call sets every field to its first value. Each later call advances the last
    /// declared field, carrying into earlier fields when it wraps. Returns `false` once every
    /// combination has been produced; the template is then rewound, so calling again starts
    /// the cycle over.
    pub fn next(&mut self) -> bool {
        if self.tag_order.is_empty() {
            return false;
        }

        if !self.primed {
            for tag in &self.tag_order {
                if let Some(record) = self.records.get_mut(tag) {
                    record.step();
                }
            }
            self.primed = true;
            return true;
        }

        for tag in self.tag_order.iter().rev() {
            let Some(record) = self.records.get_mut(tag) else {
                continue;
            };

            match record.step() {
                Step::Advanced => {
                    trace!("{} advanced", tag);
                    return true;
                }
                Step::Wrapped => {
                    // Back to the first value, then carry.
                    record.step();
                    trace!("{} wrapped, carrying", tag);
                }
                Step::ContextCopy => trace!("{} moved to a context copy, carrying", tag),
            }
        }

        debug!("completed all combinations of {:?}", self.tag_order);
        for tag in &self.tag_order {
            if let Some(record) = self.records.get_mut(tag) {
                record.rewind();
            }
        }
        self.primed = false;
        false
    }
}
