#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # addrstat: streaming address statistics
//!
//! Reads a line-oriented stream of self-closing address records and reports
//! how many valid and broken records it saw, how often each address occurs and
//! how the first-seen addresses of every city split by floor count.
//!
//! ## Quick Start
//!
//! ```no_run
//! use addrstat::{aggregate_file, PipelineConfig, Report};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let stats = aggregate_file("address.xml", &PipelineConfig::default())?;
//! print!("{}", Report::from(&stats));
//! # Ok(())
//! # }
//! ```
//!
//! ## Input
//!
//! ```text
//! <?xml version="1.0" encoding="utf-8"?>
//! <root>
//! <item city="Барнаул" street="Дальняя улица" house="56" floor="2" />
//! </root>
//! ```
//!
//! Only flat `<item ... />` records after `<root>` are recognized. Nested
//! elements, comments and entities are not.
//!
//! ## Modules
//!
//! - [`segment_reader`] — Fixed-buffer extraction of `>`-terminated segments
//! - [`tokenizer`] — Record state machine with local error recovery
//! - [`record`] — In-progress records and address keys
//! - [`recovery`] — Malformation taxonomy and broken-record tally
//! - [`statistics`] — Counts, floor histograms and merge
//! - [`report`] — Text and JSON rendering of final statistics
//! - [`pipeline`] — Sequential and sharded pipelines, configuration
//! - [`error`] — Error types and result type

pub mod error;
pub mod pipeline;
pub mod record;
pub mod recovery;
pub mod report;
pub mod segment_reader;
pub mod statistics;
pub mod tokenizer;

pub use error::{AddrStatError, Result};
pub use pipeline::{aggregate, aggregate_file, aggregate_sharded, PipelineConfig};
pub use record::{AddressKey, Attribute, HouseRecord};
pub use recovery::{Malformation, MalformationKind, RecoveryContext};
pub use report::Report;
pub use segment_reader::SegmentReader;
pub use statistics::{FloorHistogram, Statistics};
pub use tokenizer::{tokenize, RecordSink, Tokenizer};
