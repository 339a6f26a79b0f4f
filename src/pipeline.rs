//! Sequential and sharded aggregation pipelines.
//!
//! Both variants wire the same stages: a [`SegmentReader`] over the byte
//! source, a [`Tokenizer`](crate::tokenizer::Tokenizer) and [`Statistics`].
//!
//! Design of the sharded variant:
//! - **Producer:** the calling thread reads segments and tokenizes records
//! - **Workers:** `workers` threads, each owning a private [`Statistics`]
//! - **Routing:** records are hashed on (city, street, house), so every
//!   occurrence of one address reaches the same worker in stream order and
//!   first-wins floor accounting stays exact
//! - **Backpressure:** one bounded channel per worker; a full channel blocks
//!   the producer
//! - **Reduce:** after the producer finishes, workers are joined and their
//!   partials combined with [`Statistics::merge_all`]
//!
//! # Example
//!
//! ```
//! use addrstat::{aggregate, PipelineConfig};
//! use std::io::Cursor;
//!
//! let input = "<root>\n<item city=\"A\" street=\"B\" house=\"1\" floor=\"2\" />\n</root>\n";
//! let config = PipelineConfig::default().with_workers(2);
//! let stats = aggregate(Cursor::new(input), &config)?;
//! assert_eq!(stats.items_seen(), 1);
//! # Ok::<(), addrstat::AddrStatError>(())
//! ```

use crate::error::{AddrStatError, Result};
use crate::record::HouseRecord;
use crate::segment_reader::{SegmentReader, DEFAULT_READ_SIZE};
use crate::statistics::Statistics;
use crate::tokenizer::{tokenize, RecordSink};
use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::Read;
use std::path::Path;
use std::thread;

/// Configuration for the aggregation pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Refill chunk for the segment reader (bytes); the buffer holds twice this
    pub read_size: usize,
    /// Statistics workers; 1 runs everything on the calling thread
    pub workers: usize,
    /// Per-worker channel capacity (records)
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            read_size: DEFAULT_READ_SIZE,
            workers: 1,
            channel_capacity: 1024,
        }
    }
}

impl PipelineConfig {
    /// Set the reader refill chunk.
    #[must_use]
    pub fn with_read_size(mut self, read_size: usize) -> Self {
        self.read_size = read_size;
        self
    }

    /// Set the number of statistics workers.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the per-worker channel capacity.
    #[must_use]
    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity;
        self
    }

    /// Check that the configuration can run.
    ///
    /// # Errors
    ///
    /// Returns [`AddrStatError::InvalidConfig`] if `workers` or
    /// `channel_capacity` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(AddrStatError::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(AddrStatError::InvalidConfig(
                "channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Aggregate every record in `source`.
///
/// Runs on the calling thread when `config.workers == 1`, otherwise uses
/// [`aggregate_sharded`].
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the source fails, or a
/// segment overflows the reader buffer.
pub fn aggregate<R: Read>(source: R, config: &PipelineConfig) -> Result<Statistics> {
    config.validate()?;
    if config.workers == 1 {
        aggregate_sequential(source, config)
    } else {
        aggregate_sharded(source, config)
    }
}

/// Open `path` and aggregate its records.
///
/// # Errors
///
/// Returns [`AddrStatError::SourceRead`] if the file cannot be opened, plus
/// everything [`aggregate`] can return.
pub fn aggregate_file<P: AsRef<Path>>(path: P, config: &PipelineConfig) -> Result<Statistics> {
    let path = path.as_ref();
    log::debug!("aggregating {}", path.display());
    let file = File::open(path)?;
    aggregate(file, config)
}

fn aggregate_sequential<R: Read>(source: R, config: &PipelineConfig) -> Result<Statistics> {
    let mut reader = SegmentReader::new(source, config.read_size);
    let mut stats = Statistics::new();
    let recovery = tokenize(&mut reader, &mut stats)?;
    stats.add_broken(recovery.broken());
    Ok(stats)
}

/// Routes each record to the worker that owns its address.
struct ShardRouter {
    senders: Vec<Sender<HouseRecord>>,
}

impl RecordSink for ShardRouter {
    fn accept(&mut self, record: HouseRecord) -> Result<()> {
        let shard = shard_for(&record, self.senders.len());
        // Blocks while the worker's channel is full
        self.senders[shard]
            .send(record)
            .map_err(|_| AddrStatError::ChannelSend)
    }
}

/// Worker index for a record; identical addresses always map to the same one.
#[allow(clippy::cast_possible_truncation)]
fn shard_for(record: &HouseRecord, shards: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    record.city.hash(&mut hasher);
    record.street.hash(&mut hasher);
    record.house.hash(&mut hasher);
    (hasher.finish() as usize) % shards
}

fn worker_task(receiver: &Receiver<HouseRecord>) -> Statistics {
    let mut stats = Statistics::new();
    for record in receiver {
        stats.add(record);
    }
    stats
}

/// Aggregate with one producer and `config.workers` statistics threads.
///
/// The result equals the sequential result for the same input.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the source fails, a
/// segment overflows the reader buffer, or a worker panics. Workers are always
/// joined before returning.
pub fn aggregate_sharded<R: Read>(source: R, config: &PipelineConfig) -> Result<Statistics> {
    config.validate()?;
    log::debug!(
        "starting sharded pipeline: {} workers, channel capacity {}",
        config.workers,
        config.channel_capacity
    );

    let mut senders = Vec::with_capacity(config.workers);
    let mut handles = Vec::with_capacity(config.workers);
    for _ in 0..config.workers {
        let (sender, receiver) = bounded(config.channel_capacity);
        senders.push(sender);
        handles.push(thread::spawn(move || worker_task(&receiver)));
    }

    let mut router = ShardRouter { senders };
    let mut reader = SegmentReader::new(source, config.read_size);
    let produced = tokenize(&mut reader, &mut router);
    // Closing the channels lets the workers drain and exit
    drop(router);

    let mut partials = Vec::with_capacity(handles.len());
    let mut panicked = None;
    for (worker, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(stats) => partials.push(stats),
            Err(_) => {
                panicked.get_or_insert(AddrStatError::WorkerPanicked { worker });
            },
        }
    }
    if let Some(err) = panicked {
        return Err(err);
    }
    let recovery = produced?;

    let mut stats = Statistics::merge_all(partials);
    stats.add_broken(recovery.broken());
    log::debug!(
        "sharded pipeline finished: {} items, {} broken, {} unique addresses",
        stats.items_seen(),
        stats.broken_seen(),
        stats.unique_addresses()
    );
    Ok(stats)
}
