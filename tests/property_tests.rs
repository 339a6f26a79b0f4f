//! Property-based tests using proptest
//!
//! These tests check the pipeline laws over generated streams: results do
//! not depend on the reader's buffer size or on sharding, and partial
//! statistics merge associatively and commutatively.

mod common;

use addrstat::{
    aggregate_sharded, AddrStatError, AddressKey, PipelineConfig, SegmentReader, Statistics,
};
use common::{render, stats_for, Row};
use proptest::prelude::*;
use std::collections::HashSet;
use std::io::Cursor;

// =============================================================================
// Strategies
// =============================================================================

fn row() -> impl Strategy<Value = Row> {
    (
        prop::sample::select(vec!["A", "B", "Бийск"]),
        "[a-c]{1,4}",
        "[1-9][0-9]{0,2}",
        1u16..=9,
    )
        .prop_map(|(city, street, house, floor)| Row {
            city: city.to_string(),
            street,
            house,
            floor,
        })
}

fn rows() -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec(row(), 0..40)
}

fn delimiter_free(max: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>().prop_filter("no delimiter", |b| *b != b'>'), 0..=max)
}

/// A stream of delimited segments of at most 32 bytes (delimiter included)
/// followed by a delimiter-free tail of at most 32 bytes, so everything fits
/// a buffer of 32 bytes exactly at the edge.
fn stream() -> impl Strategy<Value = Vec<u8>> {
    (prop::collection::vec(delimiter_free(31), 0..20), delimiter_free(32)).prop_map(
        |(parts, tail)| {
            let mut input = Vec::new();
            for part in parts {
                input.extend_from_slice(&part);
                input.push(b'>');
            }
            input.extend_from_slice(&tail);
            input
        },
    )
}

fn split_all(input: &[u8], read_size: usize) -> Vec<Vec<u8>> {
    let mut reader = SegmentReader::new(Cursor::new(input.to_vec()), read_size);
    let mut segments = Vec::new();
    while let Some(segment) = reader.read_segment(b'>').expect("segment fits the buffer") {
        segments.push(segment.to_vec());
    }
    segments
}

// =============================================================================
// Segment reader
// =============================================================================

proptest! {
    /// Segments are the input split after each delimiter, for any read size
    #[test]
    fn test_segments_independent_of_read_size(input in stream(), read_size in 16usize..100) {
        let expected: Vec<Vec<u8>> = input
            .split_inclusive(|b| *b == b'>')
            .map(<[u8]>::to_vec)
            .collect();

        let segments = split_all(&input, read_size);
        prop_assert_eq!(&segments, &expected);
        prop_assert_eq!(segments.concat(), input);
    }

    /// A final segment exactly as long as the buffer is returned, one byte
    /// longer overflows
    #[test]
    fn test_final_segment_at_buffer_capacity(
        head in prop::collection::vec(delimiter_free(15), 0..5),
        read_size in 16usize..100,
    ) {
        let mut input = Vec::new();
        for part in &head {
            input.extend_from_slice(part);
            input.push(b'>');
        }
        let body = input.len();
        input.extend(std::iter::repeat(b'x').take(2 * read_size));

        let segments = split_all(&input, read_size);
        prop_assert_eq!(segments.len(), head.len() + 1);
        prop_assert_eq!(segments.last().map(Vec::len), Some(2 * read_size));
        prop_assert_eq!(segments.concat().len(), body + 2 * read_size);

        input.push(b'x');
        let mut reader = SegmentReader::new(Cursor::new(input), read_size);
        let mut outcome = reader.read_segment(b'>').map(|s| s.map(<[u8]>::len));
        while let Ok(Some(_)) = outcome {
            outcome = reader.read_segment(b'>').map(|s| s.map(<[u8]>::len));
        }
        let is_overflow = matches!(outcome, Err(AddrStatError::BufferOverflow { .. }));
        prop_assert!(is_overflow);
    }
}

// =============================================================================
// Aggregation
// =============================================================================

proptest! {
    /// Statistics do not depend on how the stream is chunked
    #[test]
    fn test_statistics_independent_of_read_size(rows in rows(), read_size in 64usize..512) {
        let input = render(&rows);
        let baseline = stats_for(&input, &PipelineConfig::default());
        let chunked = stats_for(&input, &PipelineConfig::default().with_read_size(read_size));
        prop_assert_eq!(chunked, baseline);
    }

    /// Sharded aggregation equals sequential aggregation
    #[test]
    fn test_sharded_equals_sequential(
        rows in rows(),
        workers in 2usize..6,
        channel_capacity in 1usize..8,
    ) {
        let input = render(&rows);
        let sequential = stats_for(&input, &PipelineConfig::default());
        let config = PipelineConfig::default()
            .with_workers(workers)
            .with_channel_capacity(channel_capacity);
        let sharded = aggregate_sharded(Cursor::new(input.into_bytes()), &config).unwrap();
        prop_assert!(sharded.is_consistent());
        prop_assert_eq!(sharded, sequential);
    }

    /// Every well-formed record is counted and each address once per sighting
    #[test]
    fn test_every_record_counted(rows in rows()) {
        let stats = stats_for(&render(&rows), &PipelineConfig::default());
        prop_assert_eq!(stats.items_seen(), rows.len() as u64);
        prop_assert_eq!(stats.broken_seen(), 0);

        let distinct: HashSet<AddressKey> = rows
            .iter()
            .map(|r| AddressKey::new(&r.city, &r.street, &r.house))
            .collect();
        prop_assert_eq!(stats.unique_addresses(), distinct.len());

        let credited: u64 = stats.cities().map(|(_, floors)| floors.total()).sum();
        prop_assert_eq!(credited, distinct.len() as u64);
        prop_assert!(stats.is_consistent());
    }

    /// Distinct addresses each appear exactly once
    #[test]
    fn test_distinct_rows_counted_once(count in 0usize..50) {
        let rows: Vec<Row> = (0..count)
            .map(|i| Row {
                city: "A".to_string(),
                street: "s".to_string(),
                house: (i + 1).to_string(),
                floor: 2,
            })
            .collect();
        let stats = stats_for(&render(&rows), &PipelineConfig::default());
        prop_assert_eq!(stats.items_seen(), count as u64);
        prop_assert_eq!(stats.duplicates().count(), 0);
        prop_assert!(stats.addresses().all(|(_, n)| n == 1));
    }
}

// =============================================================================
// Merge laws
// =============================================================================

fn partial(rows: &[Row], broken: u64) -> Statistics {
    let mut stats = stats_for(&render(rows), &PipelineConfig::default());
    stats.add_broken(broken);
    stats
}

proptest! {
    /// merge(a, b) == merge(b, a)
    #[test]
    fn test_merge_commutative(a in rows(), b in rows(), x in 0u64..5, y in 0u64..5) {
        let (a, b) = (partial(&a, x), partial(&b, y));

        let mut ab = a.clone();
        ab.merge(b.clone());
        let mut ba = b;
        ba.merge(a);
        prop_assert_eq!(ab, ba);
    }

    /// merge(merge(a, b), c) == merge(a, merge(b, c))
    #[test]
    fn test_merge_associative(a in rows(), b in rows(), c in rows()) {
        let (a, b, c) = (partial(&a, 1), partial(&b, 0), partial(&c, 2));

        let mut left = a.clone();
        left.merge(b.clone());
        left.merge(c.clone());

        let mut bc = b;
        bc.merge(c);
        let mut right = a;
        right.merge(bc);
        prop_assert_eq!(left, right);
    }

    /// Empty statistics are the merge identity
    #[test]
    fn test_merge_identity(a in rows()) {
        let a = partial(&a, 3);

        let mut left = Statistics::new();
        left.merge(a.clone());
        prop_assert_eq!(&left, &a);

        let mut right = a.clone();
        right.merge(Statistics::new());
        prop_assert_eq!(right, a);
    }
}
