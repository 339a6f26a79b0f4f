//! State-machine tokenizer for `<item ... />` address records.
//!
//! The tokenizer consumes segments produced by a
//! [`SegmentReader`](crate::segment_reader::SegmentReader) split on `>` and
//! recognizes a small grammar:
//!
//! ```text
//! ... <root> ... <item name="value" name="value" ... /> ... <item ... /> ...
//! ```
//!
//! Nothing before `<root>` is interpreted. Each record is built in a private
//! [`HouseRecord`] and handed to a [`RecordSink`] when its `/>` is seen. A
//! malformed record is counted in the [`RecoveryContext`], discarded, and
//! scanning resumes at the next `<item`.
//!
//! Each step of the machine is the function [`transition`]: it looks at the
//! current [`State`], consumes input from a [`Scan`] and returns the next state
//! together with one [`Effect`] for the [`Tokenizer`] to apply. Only the
//! tokenizer mutates the in-progress record.
//!
//! # Example
//!
//! ```
//! use addrstat::record::HouseRecord;
//! use addrstat::tokenizer::Tokenizer;
//!
//! let mut records: Vec<HouseRecord> = Vec::new();
//! let mut tokenizer = Tokenizer::new();
//! tokenizer.feed(b"<root>", &mut records)?;
//! tokenizer.feed(b"\n<item city=\"A\" street=\"B\" house=\"1\" floor=\"2\" />", &mut records)?;
//! tokenizer.finish(&mut records)?;
//!
//! assert_eq!(records, vec![HouseRecord::new("A", "B", "1", 2)]);
//! assert_eq!(tokenizer.broken(), 0);
//! # Ok::<(), addrstat::AddrStatError>(())
//! ```

use crate::error::Result;
use crate::record::{Attribute, HouseRecord};
use crate::recovery::{Malformation, RecoveryContext};
use crate::segment_reader::SegmentReader;
use memchr::memmem;
use std::io::Read;

/// Byte that terminates every segment fed to the tokenizer.
pub const SEGMENT_DELIMITER: u8 = b'>';

/// Marker that must precede the first record.
pub const ROOT_OPEN: &[u8] = b"<root>";

/// Opening of one record.
pub const ITEM_OPEN: &[u8] = b"<item";

/// Closing of one record.
pub const ITEM_CLOSE: &[u8] = b"/>";

/// Destination for records the tokenizer has finished scanning.
///
/// Records arrive in stream order. Incomplete records are delivered too; the
/// sink decides what to do with them.
pub trait RecordSink {
    /// Accept one closed (or end-of-stream flushed) record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be delivered; this halts the parse.
    fn accept(&mut self, record: HouseRecord) -> Result<()>;
}

impl RecordSink for Vec<HouseRecord> {
    fn accept(&mut self, record: HouseRecord) -> Result<()> {
        self.push(record);
        Ok(())
    }
}

/// Tokenizer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// Looking for `<root>`.
    #[default]
    WaitRoot,
    /// Looking for the next `<item`.
    WaitItem,
    /// Inside a record, expecting an attribute or `/>`.
    WaitName,
}

/// A validated attribute value ready to be stored in the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    /// Non-empty city name
    City(String),
    /// Non-empty street name
    Street(String),
    /// Non-empty house number
    House(String),
    /// Positive floor count
    Floor(u16),
}

/// Side effect requested by one [`transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Nothing to apply.
    None,
    /// Store a value in the in-progress record.
    Assign(Assignment),
    /// Hand the in-progress record to the sink and clear it.
    Commit,
    /// Count the in-progress record as broken and clear it.
    Reject(Malformation),
}

/// Result of one [`transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// State to continue in.
    pub next: State,
    /// Effect to apply before continuing.
    pub effect: Effect,
    /// Whether the current segment is done and the next one is needed.
    pub needs_input: bool,
}

impl Transition {
    fn go(next: State, effect: Effect) -> Self {
        Transition {
            next,
            effect,
            needs_input: false,
        }
    }

    fn wait(next: State) -> Self {
        Transition {
            next,
            effect: Effect::None,
            needs_input: true,
        }
    }

    fn reject(malformation: Malformation) -> Self {
        Transition::go(State::WaitItem, Effect::Reject(malformation))
    }
}

fn is_space(byte: u8) -> bool {
    byte == b' ' || byte == b'\t'
}

/// Cursor over the unconsumed part of one segment.
#[derive(Debug, Clone)]
pub struct Scan<'a> {
    rest: &'a [u8],
}

impl<'a> Scan<'a> {
    /// Start scanning `segment`, trimming spaces and tabs at both ends.
    #[must_use]
    pub fn new(segment: &'a [u8]) -> Self {
        let start = segment.iter().position(|&b| !is_space(b)).unwrap_or(segment.len());
        let end = segment.iter().rposition(|&b| !is_space(b)).map_or(start, |i| i + 1);
        Scan {
            rest: &segment[start..end],
        }
    }

    /// Unconsumed bytes.
    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        self.rest
    }

    /// Whether everything has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    /// Find `marker` and consume everything up to and including it.
    fn skip_past(&mut self, marker: &[u8]) -> bool {
        match memmem::find(self.rest, marker) {
            Some(index) => {
                self.rest = &self.rest[index + marker.len()..];
                true
            },
            None => false,
        }
    }

    /// Consume leading spaces and tabs; reports whether there were any.
    fn trim_left_space(&mut self) -> bool {
        let skipped = self.rest.iter().take_while(|&&b| is_space(b)).count();
        self.rest = &self.rest[skipped..];
        skipped > 0
    }

    /// Consume `/>` if it is next.
    fn take_close(&mut self) -> bool {
        if self.rest.starts_with(ITEM_CLOSE) {
            self.rest = &self.rest[ITEM_CLOSE.len()..];
            true
        } else {
            false
        }
    }

    /// Consume `name=` and return `name`; the name must be non-empty.
    fn extract_name(&mut self) -> Option<&'a [u8]> {
        let rest = self.rest;
        match memchr::memchr(b'=', rest) {
            Some(index) if index > 0 => {
                self.rest = &rest[index + 1..];
                Some(&rest[..index])
            },
            _ => None,
        }
    }

    /// Consume `"value"` and return `value`.
    fn extract_quoted(&mut self) -> Option<&'a [u8]> {
        let rest = self.rest;
        let body = rest.strip_prefix(b"\"")?;
        let end = memchr::memchr(b'"', body)?;
        self.rest = &body[end + 1..];
        Some(&body[..end])
    }
}

fn parse_floor(value: &[u8]) -> Option<u16> {
    if value.is_empty() || !value.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(value)
        .ok()?
        .parse::<u16>()
        .ok()
        .filter(|&floor| floor > 0)
}

fn text(value: &[u8]) -> String {
    String::from_utf8_lossy(value).into_owned()
}

/// Validate the value of a recognized attribute.
fn assign(attribute: Attribute, value: &[u8], record: &HouseRecord) -> Transition {
    let assignment = match attribute {
        Attribute::Floor => match parse_floor(value) {
            Some(floor) => Assignment::Floor(floor),
            None => return Transition::reject(Malformation::InvalidFloor(text(value))),
        },
        _ if value.is_empty() => return Transition::reject(Malformation::EmptyValue(attribute)),
        Attribute::City => Assignment::City(text(value)),
        Attribute::Street => Assignment::Street(text(value)),
        Attribute::House => {
            if !record.is_assigned(Attribute::Street) {
                return Transition::reject(Malformation::HouseBeforeStreet);
            }
            Assignment::House(text(value))
        },
    };
    Transition::go(State::WaitName, Effect::Assign(assignment))
}

/// Advance the machine by one step.
///
/// `record` is the in-progress record, read only to detect duplicates and
/// ordering violations; changes to it are requested through the returned
/// [`Effect`].
pub fn transition(state: State, scan: &mut Scan<'_>, record: &HouseRecord) -> Transition {
    match state {
        State::WaitRoot => {
            if scan.skip_past(ROOT_OPEN) {
                Transition::go(State::WaitItem, Effect::None)
            } else {
                Transition::wait(State::WaitRoot)
            }
        },
        State::WaitItem => {
            if !scan.skip_past(ITEM_OPEN) {
                Transition::wait(State::WaitItem)
            } else if scan.trim_left_space() {
                Transition::go(State::WaitName, Effect::None)
            } else if scan.is_empty() {
                Transition::wait(State::WaitItem)
            } else {
                Transition::reject(Malformation::MissingSeparator)
            }
        },
        State::WaitName => {
            scan.trim_left_space();
            if scan.take_close() {
                return Transition::go(State::WaitItem, Effect::Commit);
            }
            if scan.is_empty() {
                return Transition::wait(State::WaitName);
            }
            let Some(name) = scan.extract_name() else {
                return Transition::reject(Malformation::MissingEquals);
            };
            match Attribute::from_name(name) {
                Some(attribute) if record.is_assigned(attribute) => {
                    Transition::reject(Malformation::DuplicateAttribute(attribute))
                },
                Some(attribute) => match scan.extract_quoted() {
                    Some(value) => assign(attribute, value, record),
                    None => {
                        Transition::reject(Malformation::UnquotedValue(attribute.to_string()))
                    },
                },
                None => match scan.extract_quoted() {
                    Some(_) => Transition::go(State::WaitName, Effect::None),
                    None => Transition::reject(Malformation::UnquotedValue(text(name))),
                },
            }
        },
    }
}

/// Streaming record tokenizer.
///
/// Owns the in-progress record and the broken-record tally; feed it segments
/// in stream order and call [`finish`](Self::finish) once at end of input.
#[derive(Debug, Default)]
pub struct Tokenizer {
    state: State,
    record: HouseRecord,
    recovery: RecoveryContext,
    committed: u64,
}

impl Tokenizer {
    /// Create a tokenizer waiting for `<root>`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    /// Records rejected so far.
    #[must_use]
    pub fn broken(&self) -> u64 {
        self.recovery.broken()
    }

    /// Records handed to the sink so far (complete or not).
    #[must_use]
    pub fn committed(&self) -> u64 {
        self.committed
    }

    /// Malformation tally.
    #[must_use]
    pub fn recovery(&self) -> &RecoveryContext {
        &self.recovery
    }

    /// Consume the tokenizer, returning the malformation tally.
    #[must_use]
    pub fn into_recovery(self) -> RecoveryContext {
        self.recovery
    }

    /// Scan one segment, delivering every record closed inside it.
    ///
    /// # Errors
    ///
    /// Returns an error only if the sink fails.
    pub fn feed<S: RecordSink + ?Sized>(&mut self, segment: &[u8], sink: &mut S) -> Result<()> {
        let mut scan = Scan::new(segment);
        loop {
            let Transition {
                next,
                effect,
                needs_input,
            } = transition(self.state, &mut scan, &self.record);
            self.state = next;

            match effect {
                Effect::None => {},
                Effect::Assign(assignment) => self.apply(assignment),
                Effect::Commit => self.commit(sink)?,
                Effect::Reject(malformation) => {
                    self.recovery.record(&malformation, segment);
                    self.record.reset();
                },
            }

            if needs_input {
                return Ok(());
            }
        }
    }

    /// Flush a record left open at end of input.
    ///
    /// A record that was opened but never closed is delivered exactly once so
    /// the sink can classify it; calling this again has no effect.
    ///
    /// # Errors
    ///
    /// Returns an error only if the sink fails.
    pub fn finish<S: RecordSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        if self.state == State::WaitName {
            self.state = State::WaitItem;
            self.commit(sink)?;
        }
        Ok(())
    }

    fn commit<S: RecordSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        self.committed += 1;
        sink.accept(self.record.take())
    }

    fn apply(&mut self, assignment: Assignment) {
        match assignment {
            Assignment::City(city) => self.record.city = Some(city),
            Assignment::Street(street) => self.record.street = Some(street),
            Assignment::House(house) => self.record.house = Some(house),
            Assignment::Floor(floor) => self.record.floor = Some(floor),
        }
    }
}

/// Run a tokenizer over every segment of `reader`, delivering records to `sink`.
///
/// Returns the malformation tally once the source is exhausted.
///
/// # Errors
///
/// Returns an error if the reader fails (I/O or buffer overflow) or the sink
/// rejects a record. No tally is returned in that case.
pub fn tokenize<R: Read, S: RecordSink + ?Sized>(
    reader: &mut SegmentReader<R>,
    sink: &mut S,
) -> Result<RecoveryContext> {
    let mut tokenizer = Tokenizer::new();
    while let Some(segment) = reader.read_segment(SEGMENT_DELIMITER)? {
        tokenizer.feed(segment, sink)?;
    }
    tokenizer.finish(sink)?;
    log::debug!(
        "tokenized {} segments: {} records, {} broken",
        reader.segments_read(),
        tokenizer.committed(),
        tokenizer.broken()
    );
    Ok(tokenizer.into_recovery())
}
