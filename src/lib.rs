//! Parser and cross-product enumerator for compact cryptographic test vector templates.
//!
//! A template block declares, per tag, a fixed value or a list of alternatives:
//!
//! ```
//! use vectmpl::{Tag, Template, TemplateReader};
//!
//! let text = "VEC 1\nKEY 00010203\nPTX 0A0B,0C0D\nEND\n";
//! let mut reader = TemplateReader::new(text.as_bytes());
//! let mut template = Template::new();
//!
//! assert_eq!(reader.read_block(&mut template).unwrap(), Some(1));
//!
//! let mut plaintexts = vec![];
//! while template.next() {
//!     let ptx = template.record_mut(Tag::Ptx).unwrap().get_value().1.to_vec();
//!     plaintexts.push(ptx);
//! }
//! assert_eq!(plaintexts, vec![vec![0x0a, 0x0b], vec![0x0c, 0x0d]]);
//! ```

pub mod err;
pub mod utils;

mod field_record;
mod tag;
mod template;
mod template_reader;
mod vector;

pub use crate::field_record::{FieldRecord, MAX_LEN, Params, Status, Step};
pub use crate::tag::{TAG_COUNT, Tag};
pub use crate::template::Template;
pub use crate::template_reader::{ReaderSettings, TemplateReader};
pub use crate::vector::VectorSet;

#[cfg(test)]
use std::sync::Once;

#[cfg(test)]
static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
#[cfg(test)]
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}
