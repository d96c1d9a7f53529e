//! One tag's definition text, parsed lazily into a cycle of alternative values.
//!
//! A definition is a comma separated list of alternatives:
//!
//! | Alternative   | Values                                                         |
//! |---------------|----------------------------------------------------------------|
//! | `0a0b 0c`     | the literal bytes, whitespace between digit pairs is ignored   |
//! | `#16`         | 16 bytes `00 01 02 ..`                                          |
//! | `#0-32:8`     | the same pattern for lengths 0, 8, 16, 24 and 32               |
//! | `?16`, `?1-4` | random bytes of each length                                     |
//! | `@`           | bytes supplied by the caller, see [`FieldRecord::get_value_from`] |
//!
//! Range lengths above [`MAX_LEN`] are malformed.
//!
//! The record walks the list one value per [`FieldRecord::step`]. `pos` marks the alternative
//! being produced, `next_pos` the start of the one after it. Running off the end rewinds both
//! to zero, which the template treats as a carry.

use crate::utils::block_rndfill;

use hex::FromHex;
use log::{trace, warn};

/// Longest value a `#` or `?` range may produce.
pub const MAX_LEN: usize = 1 << 20;

/// Outcome of parsing the alternative under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The value comes from the definition text.
    Parsed,
    /// The value must be supplied by the caller.
    ContextCopy,
    /// No alternative left, the value is empty.
    Exhausted,
}

/// Outcome of advancing a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A new value was produced from the definition text.
    Advanced,
    /// The cursor moved onto a context-copy alternative.
    ContextCopy,
    /// The cycle ended and the record was rewound to its initial state.
    Wrapped,
}

/// Numbers derived while parsing the current alternative.
///
/// For literals `lo == hi == len` and `step == 1`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Params {
    /// Values produced since the start of the cycle.
    pub count: usize,
    /// Position of the current alternative in the list.
    pub index: usize,
    /// Length of the current value.
    pub len: usize,
    /// Shortest length of the current range.
    pub lo: usize,
    /// Longest length of the current range, inclusive.
    pub hi: usize,
    /// Length increment between values of the current range.
    pub step: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fill {
    Sequence,
    Random,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Alternative {
    Literal(Vec<u8>),
    Lengths {
        fill: Fill,
        lo: usize,
        hi: usize,
        step: usize,
    },
    Context,
}

/// Definition text and enumeration state for a single tag.
#[derive(Debug, Default, Clone)]
pub struct FieldRecord {
    text: String,
    pos: usize,
    next_pos: usize,
    current: Option<Alternative>,
    params: Params,
    status: Option<Status>,
    value: Vec<u8>,
    materialized: bool,
    started: bool,
}

impl FieldRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends definition text. Nothing is parsed until a value is requested.
    ///
    /// Text from separate calls is joined by a space, so a hex literal may continue over
    /// several template lines.
    pub fn add_to_record(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(text);
    }

    /// Drops the accumulated text and rewinds the cursor.
    pub fn reset(&mut self) {
        self.text = String::new();
        self.rewind();
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn next_pos(&self) -> usize {
        self.next_pos
    }

    pub fn params(&self) -> Params {
        self.params
    }

    /// Returns the current value without advancing.
    ///
    /// On a record that was never advanced this parses the first alternative. An empty or
    /// malformed definition reports [`Status::Exhausted`] with a zero-length value. A
    /// context-copy alternative reports [`Status::ContextCopy`] and a zero-length value, use
    /// [`FieldRecord::get_value_from`] to supply its bytes.
    pub fn get_value(&mut self) -> (Status, &[u8]) {
        let status = self.materialize();
        (status, &self.value)
    }

    /// Like [`FieldRecord::get_value`], but a context-copy alternative takes `context` as its
    /// value, byte for byte.
    pub fn get_value_from(&mut self, context: &[u8]) -> &[u8] {
        if self.materialize() == Status::ContextCopy {
            self.value.clear();
            self.value.extend_from_slice(context);
            self.params.len = context.len();
        }
        &self.value
    }

    /// Advances to the next value and reports whether it is a new value from the text.
    ///
    /// Returns `false` both when the cycle wrapped and when the new alternative is a
    /// context copy; use [`FieldRecord::step`] to tell them apart.
    pub fn next(&mut self) -> bool {
        self.step() == Step::Advanced
    }

    /// Advances to the next value.
    ///
    /// The first call on a fresh or rewound record produces the first alternative. Once the
    /// alternatives run out the record rewinds to its initial state and returns
    /// [`Step::Wrapped`].
    pub fn step(&mut self) -> Step {
        let status = if !self.started {
            self.started = true;
            self.load_current()
        } else if self.advance_range() {
            Status::Parsed
        } else {
            self.pos = self.next_pos;
            self.current = None;
            self.status = None;
            self.params.index += 1;
            self.materialized = false;
            self.load_current()
        };

        match status {
            Status::Exhausted => {
                trace!("definition `{}` wrapped after {} values", self.text, self.params.count);
                self.rewind();
                Step::Wrapped
            }
            Status::ContextCopy => {
                self.params.count += 1;
                Step::ContextCopy
            }
            Status::Parsed => {
                self.params.count += 1;
                Step::Advanced
            }
        }
    }

    /// Returns the cursor to its initial state, keeping the text.
    pub fn rewind(&mut self) {
        self.pos = 0;
        self.next_pos = 0;
        self.current = None;
        self.params = Params::default();
        self.status = None;
        self.value.clear();
        self.materialized = false;
        self.started = false;
    }

    /// Steps the length of a range alternative, if it has lengths left.
    fn advance_range(&mut self) -> bool {
        let (hi, step) = match &self.current {
            Some(Alternative::Lengths { hi, step, .. }) => (*hi, *step),
            _ => return false,
        };

        match self.params.len.checked_add(step) {
            Some(len) if len <= hi => {
                self.params.len = len;
                self.materialized = false;
                trace!("range at {} stepped to length {}", self.pos, len);
                true
            }
            _ => false,
        }
    }

    /// Parses the alternative at `pos` unless it is already loaded.
    fn load_current(&mut self) -> Status {
        if let Some(status) = self.status {
            return status;
        }

        let rest = self.text.get(self.pos..).unwrap_or_default();
        let (alternative_text, next_pos, last) = match rest.find(',') {
            Some(i) => (&rest[..i], self.pos + i + 1, false),
            None => (rest, self.text.len(), true),
        };

        let status = if last && alternative_text.trim().is_empty() {
            Status::Exhausted
        } else {
            match parse_alternative(alternative_text) {
                Ok(alternative) => {
                    self.params = derive_params(&alternative, self.params.count, self.params.index);
                    let status = match alternative {
                        Alternative::Context => Status::ContextCopy,
                        _ => Status::Parsed,
                    };
                    self.current = Some(alternative);
                    self.next_pos = next_pos;
                    status
                }
                Err(reason) => {
                    warn!(
                        "malformed alternative `{}` at offset {} ({}), treating the definition as exhausted",
                        alternative_text.trim(),
                        self.pos,
                        reason
                    );
                    Status::Exhausted
                }
            }
        };

        trace!("parsed alternative at {}, next at {}: {:?}", self.pos, self.next_pos, status);
        self.status = Some(status);
        status
    }

    fn materialize(&mut self) -> Status {
        let status = self.load_current();
        if self.materialized {
            return status;
        }

        self.value.clear();
        match &self.current {
            Some(Alternative::Literal(bytes)) => self.value.extend_from_slice(bytes),
            Some(Alternative::Lengths { fill, .. }) => {
                let len = self.params.len;
                match fill {
                    Fill::Sequence => self.value.extend((0..len).map(|i| i as u8)),
                    Fill::Random => {
                        self.value.resize(len, 0);
                        block_rndfill(&mut self.value);
                    }
                }
            }
            Some(Alternative::Context) | None => {}
        }

        self.materialized = true;
        status
    }
}

fn derive_params(alternative: &Alternative, count: usize, index: usize) -> Params {
    let (lo, hi, step) = match alternative {
        Alternative::Literal(bytes) => (bytes.len(), bytes.len(), 1),
        Alternative::Lengths { lo, hi, step, .. } => (*lo, *hi, *step),
        Alternative::Context => (0, 0, 1),
    };

    Params {
        count,
        index,
        len: lo,
        lo,
        hi,
        step,
    }
}

fn parse_alternative(text: &str) -> Result<Alternative, &'static str> {
    let text = text.trim();

    if let Some(rest) = text.strip_prefix('@') {
        return if rest.trim().is_empty() {
            Ok(Alternative::Context)
        } else {
            Err("unexpected text after `@`")
        };
    }

    if let Some(rest) = text.strip_prefix('#') {
        let (lo, hi, step) = parse_range(rest)?;
        return Ok(Alternative::Lengths {
            fill: Fill::Sequence,
            lo,
            hi,
            step,
        });
    }

    if let Some(rest) = text.strip_prefix('?') {
        let (lo, hi, step) = parse_range(rest)?;
        return Ok(Alternative::Lengths {
            fill: Fill::Random,
            lo,
            hi,
            step,
        });
    }

    let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err("odd number of hex digits");
    }
    Vec::from_hex(digits)
        .map(Alternative::Literal)
        .map_err(|_| "invalid hex digit")
}

/// Parses `lo`, `lo-hi` or `lo-hi:step`.
fn parse_range(text: &str) -> Result<(usize, usize, usize), &'static str> {
    fn number(text: &str) -> Result<usize, &'static str> {
        text.trim().parse().map_err(|_| "invalid decimal length")
    }

    let (bounds, step) = match text.split_once(':') {
        Some((bounds, step)) => (bounds, number(step)?),
        None => (text, 1),
    };
    let (lo, hi) = match bounds.split_once('-') {
        Some((lo, hi)) => (number(lo)?, number(hi)?),
        None => {
            let len = number(bounds)?;
            (len, len)
        }
    };

    if step == 0 {
        return Err("range step must not be zero");
    }
    if hi < lo {
        return Err("range upper bound is below its lower bound");
    }
    if hi > MAX_LEN {
        return Err("range length exceeds limit");
    }
    Ok((lo, hi, step))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(text: &str) -> FieldRecord {
        let mut record = FieldRecord::new();
        record.add_to_record(text);
        record
    }

    /// Steps through one full cycle, collecting every value.
    fn cycle(record: &mut FieldRecord) -> Vec<Vec<u8>> {
        let mut values = Vec::new();
        while record.next() {
            values.push(record.get_value().1.to_vec());
        }
        values
    }

    #[test]
    fn test_literal_alternatives_in_order() {
        let mut r = record("0A0B,0C0D,0e0f");

        assert!(r.next());
        assert_eq!(r.get_value(), (Status::Parsed, &[0x0a, 0x0b][..]));
        assert!(r.next());
        assert_eq!(r.get_value().1, &[0x0c, 0x0d]);
        assert!(r.next());
        assert_eq!(r.get_value().1, &[0x0e, 0x0f]);

        // k + 1-th call wraps and rewinds.
        assert!(!r.next());
        assert_eq!(r.pos(), 0);
        assert_eq!(r.next_pos(), 0);
        assert_eq!(r.params(), Params::default());

        // And the next cycle starts over.
        assert!(r.next());
        assert_eq!(r.get_value().1, &[0x0a, 0x0b]);
    }

    #[test]
    fn test_next_pos_points_at_following_alternative() {
        let mut r = record("00,11");
        assert!(r.next());
        assert_eq!(r.pos(), 0);
        assert_eq!(r.next_pos(), 3);
        assert!(r.next());
        assert_eq!(r.pos(), 3);
        assert_eq!(r.next_pos(), 5);
    }

    #[test]
    fn test_empty_record_is_exhausted_immediately() {
        let mut r = FieldRecord::new();
        assert!(r.is_empty());
        assert_eq!(r.get_value(), (Status::Exhausted, &[][..]));
        assert_eq!(r.step(), Step::Wrapped);
        assert_eq!(r.get_value(), (Status::Exhausted, &[][..]));
    }

    #[test]
    fn test_whitespace_only_text_is_empty() {
        let r = record("   \t ");
        assert!(r.is_empty());
    }

    #[test]
    fn test_get_value_before_next_is_first_alternative() {
        let mut r = record("01,02");
        assert_eq!(r.get_value(), (Status::Parsed, &[0x01][..]));
        assert_eq!(r.get_value(), (Status::Parsed, &[0x01][..]));

        // The first advance yields the value already read, not the one after it.
        assert!(r.next());
        assert_eq!(r.get_value().1, &[0x01]);
        assert!(r.next());
        assert_eq!(r.get_value().1, &[0x02]);
        assert!(!r.next());
    }

    #[test]
    fn test_whitespace_is_skipped() {
        let mut r = record("  00 01\t02 ,  0304  ");
        assert_eq!(cycle(&mut r), vec![vec![0, 1, 2], vec![3, 4]]);
    }

    #[test]
    fn test_appended_lines_continue_literal() {
        let mut r = record("0001");
        r.add_to_record("0203\n");
        assert_eq!(r.text(), "0001 0203");
        assert_eq!(cycle(&mut r), vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn test_sequence_lengths() {
        let mut r = record("#0-4:2");
        assert_eq!(cycle(&mut r), vec![vec![], vec![0, 1], vec![0, 1, 2, 3]]);
    }

    #[test]
    fn test_pure_length_directive() {
        let mut r = record("#0");
        assert!(r.next());
        assert_eq!(r.get_value(), (Status::Parsed, &[][..]));
        assert!(!r.next());

        let mut r = record("#3");
        assert_eq!(r.get_value(), (Status::Parsed, &[0, 1, 2][..]));
    }

    #[test]
    fn test_sequence_wraps_past_255() {
        let mut r = record("#257");
        let (_, value) = r.get_value();
        assert_eq!(value.len(), 257);
        assert_eq!(value[255], 0xff);
        assert_eq!(value[256], 0x00);
    }

    #[test]
    fn test_params_follow_range() {
        let mut r = record("0a0b,#4-8:4");
        assert!(r.next());
        assert_eq!(
            r.params(),
            Params {
                count: 1,
                index: 0,
                len: 2,
                lo: 2,
                hi: 2,
                step: 1
            }
        );

        assert!(r.next());
        assert_eq!(
            r.params(),
            Params {
                count: 2,
                index: 1,
                len: 4,
                lo: 4,
                hi: 8,
                step: 4
            }
        );

        assert!(r.next());
        assert_eq!(r.params().len, 8);
        assert_eq!(r.params().count, 3);
        assert!(!r.next());
    }

    #[test]
    fn test_random_value_is_stable_until_advanced() {
        let mut r = record("?16,?0");
        assert!(r.next());
        let first = r.get_value().1.to_vec();
        assert_eq!(first.len(), 16);
        assert_eq!(r.get_value().1, &first[..]);

        assert!(r.next());
        assert_eq!(r.get_value(), (Status::Parsed, &[][..]));
    }

    #[test]
    fn test_context_copy_takes_external_bytes() {
        let mut r = record("@");
        let context = [0xde, 0xad, 0xbe, 0xef, 0x00];

        assert_eq!(r.step(), Step::ContextCopy);
        assert_eq!(r.get_value(), (Status::ContextCopy, &[][..]));
        assert_eq!(r.get_value_from(&context), &context[..]);
        assert_eq!(r.params().len, 5);

        // A different context replaces the previous copy.
        assert_eq!(r.get_value_from(&context[..2]), &context[..2]);
        assert_eq!(r.step(), Step::Wrapped);
    }

    #[test]
    fn test_context_copy_ignores_context_for_parsed_values() {
        let mut r = record("0102");
        assert_eq!(r.get_value_from(&[0xff; 4]), &[0x01, 0x02]);
    }

    #[test]
    fn test_context_copy_is_not_an_advance() {
        let mut r = record("00,@");
        assert!(r.next());
        assert!(!r.next());
        assert_eq!(r.get_value().0, Status::ContextCopy);
        assert_eq!(r.step(), Step::Wrapped);
    }

    #[test]
    fn test_malformed_literal_is_exhausted() {
        let mut r = record("0A0");
        assert_eq!(r.get_value(), (Status::Exhausted, &[][..]));
        assert!(!r.next());

        let mut r = record("zz");
        assert!(!r.next());
    }

    #[test]
    fn test_malformed_later_alternative_ends_cycle() {
        let mut r = record("0a,#4-2,0b");
        assert_eq!(cycle(&mut r), vec![vec![0x0a]]);

        let mut r = record("0a,#1:0");
        assert_eq!(cycle(&mut r), vec![vec![0x0a]]);

        let mut r = record("0a,@x");
        assert_eq!(cycle(&mut r), vec![vec![0x0a]]);
    }

    #[test]
    fn test_oversized_lengths_are_exhausted() {
        let mut r = record("#18446744073709551615");
        assert_eq!(r.get_value(), (Status::Exhausted, &[][..]));
        assert!(!r.next());

        let mut r = record("?18446744073709551615");
        assert_eq!(r.get_value(), (Status::Exhausted, &[][..]));

        let mut r = record("0a,#1-100000000000");
        assert_eq!(cycle(&mut r), vec![vec![0x0a]]);
    }

    #[test]
    fn test_longest_allowed_length() {
        let mut r = record(&format!("#{}", MAX_LEN));
        let (status, value) = r.get_value();
        assert_eq!(status, Status::Parsed);
        assert_eq!(value.len(), MAX_LEN);
    }

    #[test]
    fn test_empty_alternative_between_delimiters() {
        let mut r = record("01,,02,");
        assert_eq!(cycle(&mut r), vec![vec![0x01], vec![], vec![0x02]]);
    }

    #[test]
    fn test_reset_drops_text() {
        let mut r = record("0102");
        assert!(r.next());
        r.reset();
        assert!(r.is_empty());
        assert_eq!(r.text(), "");
        assert_eq!(r.get_value(), (Status::Exhausted, &[][..]));
    }
}
