//! Aggregate statistics over address records.
//!
//! [`Statistics`] counts complete records, deduplicates them by [`AddressKey`]
//! and keeps a per-city [`FloorHistogram`]. The histogram follows a first-wins
//! policy: only the first sighting of an address is credited, so later
//! duplicates never move it even when they declare a different floor.
//!
//! Partial statistics built on separate shards combine with
//! [`Statistics::merge`], which is commutative and associative with
//! [`Statistics::default`] as identity.
//!
//! # Examples
//!
//! ```
//! use addrstat::record::{AddressKey, HouseRecord};
//! use addrstat::statistics::Statistics;
//!
//! let mut stats = Statistics::new();
//! stats.add(HouseRecord::new("Братск", "Большая Октябрьская улица", "66", 7));
//! stats.add(HouseRecord::new("Братск", "Большая Октябрьская улица", "66", 2));
//!
//! assert_eq!(stats.items_seen(), 2);
//! let key = AddressKey::new("Братск", "Большая Октябрьская улица", "66");
//! assert_eq!(stats.address_count(&key), 2);
//! assert_eq!(stats.floors("Братск").unwrap().counts(), &[0, 0, 0, 0, 0, 1]);
//! ```

use crate::error::Result;
use crate::record::{AddressKey, HouseRecord};
use crate::tokenizer::RecordSink;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Number of histogram buckets: floors 1 to 5, then one overflow bucket.
pub const FLOOR_BUCKETS: usize = 6;

/// Lowest floor count that lands in the overflow bucket.
const OVERFLOW_FLOOR: u16 = 6;

/// Per-city count of first-seen addresses by floor.
///
/// Bucket `i` (0..=4) counts floor `i + 1`; bucket 5 counts floors above 5.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorHistogram([u64; FLOOR_BUCKETS]);

impl FloorHistogram {
    /// Bucket index for a floor count. Floor 0 is treated as floor 1.
    #[must_use]
    pub fn bucket(floor: u16) -> usize {
        usize::from(floor.clamp(1, OVERFLOW_FLOOR)) - 1
    }

    /// Count one address with `floor` floors.
    pub fn credit(&mut self, floor: u16) {
        self.0[Self::bucket(floor)] += 1;
    }

    /// All bucket counts.
    #[must_use]
    pub fn counts(&self) -> &[u64; FLOOR_BUCKETS] {
        &self.0
    }

    /// Addresses with more than five floors.
    #[must_use]
    pub fn overflow(&self) -> u64 {
        self.0[FLOOR_BUCKETS - 1]
    }

    /// Sum over all buckets.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    /// Elementwise sum.
    pub fn merge(&mut self, other: &FloorHistogram) {
        for (mine, theirs) in self.0.iter_mut().zip(other.0.iter()) {
            *mine += theirs;
        }
    }
}

impl From<[u64; FLOOR_BUCKETS]> for FloorHistogram {
    fn from(counts: [u64; FLOOR_BUCKETS]) -> Self {
        FloorHistogram(counts)
    }
}

/// Running aggregate over address records.
///
/// Addresses and cities are kept in first-seen order for reporting.
/// Equality ignores that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    items_seen: u64,
    broken_seen: u64,
    address_counts: IndexMap<AddressKey, u64>,
    floor_histogram: IndexMap<String, FloorHistogram>,
}

impl Statistics {
    /// Create empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify and count one record.
    ///
    /// Complete records increment the item count and the address count; the
    /// first sighting of an address also credits its city's histogram.
    /// Incomplete records are ignored and are not counted as broken.
    ///
    /// Returns `true` if the record was complete.
    pub fn add(&mut self, record: HouseRecord) -> bool {
        let Some((key, floor)) = record.into_address() else {
            return false;
        };
        self.items_seen += 1;
        if let Some(count) = self.address_counts.get_mut(&key) {
            *count += 1;
        } else {
            self.floor_histogram
                .entry(key.city.clone())
                .or_default()
                .credit(floor);
            self.address_counts.insert(key, 1);
        }
        true
    }

    /// Add records rejected during tokenization.
    pub fn add_broken(&mut self, broken: u64) {
        self.broken_seen += broken;
    }

    /// Fold `other` into `self`.
    ///
    /// Counters are summed, address counts are summed per key and histograms
    /// are summed per city.
    pub fn merge(&mut self, other: Statistics) {
        self.items_seen += other.items_seen;
        self.broken_seen += other.broken_seen;
        for (key, count) in other.address_counts {
            *self.address_counts.entry(key).or_default() += count;
        }
        for (city, floors) in other.floor_histogram {
            self.floor_histogram.entry(city).or_default().merge(&floors);
        }
    }

    /// Reduce any number of partial statistics into one.
    pub fn merge_all<I: IntoIterator<Item = Statistics>>(partials: I) -> Statistics {
        partials.into_iter().fold(Statistics::new(), |mut acc, part| {
            acc.merge(part);
            acc
        })
    }

    /// Complete records seen, duplicates included.
    #[must_use]
    pub fn items_seen(&self) -> u64 {
        self.items_seen
    }

    /// Records rejected as malformed.
    #[must_use]
    pub fn broken_seen(&self) -> u64 {
        self.broken_seen
    }

    /// Number of distinct addresses.
    #[must_use]
    pub fn unique_addresses(&self) -> usize {
        self.address_counts.len()
    }

    /// Occurrences of `key`; zero if never seen.
    #[must_use]
    pub fn address_count(&self, key: &AddressKey) -> u64 {
        self.address_counts.get(key).copied().unwrap_or(0)
    }

    /// Every address with its occurrence count, in first-seen order.
    pub fn addresses(&self) -> impl Iterator<Item = (&AddressKey, u64)> {
        self.address_counts.iter().map(|(key, count)| (key, *count))
    }

    /// Addresses seen more than once.
    pub fn duplicates(&self) -> impl Iterator<Item = (&AddressKey, u64)> {
        self.addresses().filter(|(_, count)| *count > 1)
    }

    /// Histogram for one city.
    #[must_use]
    pub fn floors(&self, city: &str) -> Option<&FloorHistogram> {
        self.floor_histogram.get(city)
    }

    /// Every city with its histogram, in first-seen order.
    pub fn cities(&self) -> impl Iterator<Item = (&str, &FloorHistogram)> {
        self.floor_histogram
            .iter()
            .map(|(city, floors)| (city.as_str(), floors))
    }

    /// Check the aggregate invariants.
    ///
    /// Item count equals the sum of address counts, and each city's histogram
    /// total equals the number of distinct addresses in that city.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let counted: u64 = self.address_counts.values().sum();
        if counted != self.items_seen {
            return false;
        }
        let mut per_city: IndexMap<&str, u64> = IndexMap::new();
        for key in self.address_counts.keys() {
            *per_city.entry(key.city.as_str()).or_default() += 1;
        }
        per_city.len() == self.floor_histogram.len()
            && per_city.iter().all(|(city, addresses)| {
                self.floor_histogram
                    .get(*city)
                    .is_some_and(|floors| floors.total() == *addresses)
            })
    }
}

impl RecordSink for Statistics {
    fn accept(&mut self, record: HouseRecord) -> Result<()> {
        self.add(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(records: &[(&str, &str, &str, u16)]) -> Statistics {
        let mut stats = Statistics::new();
        for (city, street, house, floor) in records {
            stats.add(HouseRecord::new(city, street, house, *floor));
        }
        stats
    }

    #[test]
    fn test_bucket_mapping() {
        assert_eq!(FloorHistogram::bucket(1), 0);
        assert_eq!(FloorHistogram::bucket(5), 4);
        assert_eq!(FloorHistogram::bucket(6), 5);
        assert_eq!(FloorHistogram::bucket(u16::MAX), 5);
    }

    #[test]
    fn test_distinct_records() {
        let stats = sample(&[("A", "s", "1", 1), ("A", "s", "2", 3), ("B", "t", "1", 9)]);
        assert_eq!(stats.items_seen(), 3);
        assert_eq!(stats.unique_addresses(), 3);
        assert!(stats.addresses().all(|(_, count)| count == 1));
        assert_eq!(stats.floors("A").unwrap().counts(), &[1, 0, 1, 0, 0, 0]);
        assert_eq!(stats.floors("B").unwrap().overflow(), 1);
        assert_eq!(stats.duplicates().count(), 0);
        assert!(stats.is_consistent());
    }

    #[test]
    fn test_first_sighting_wins_floor() {
        let stats = sample(&[("A", "s", "1", 2), ("A", "s", "1", 4)]);
        assert_eq!(stats.items_seen(), 2);
        assert_eq!(stats.address_count(&AddressKey::new("A", "s", "1")), 2);
        assert_eq!(stats.floors("A").unwrap().counts(), &[0, 1, 0, 0, 0, 0]);
        assert_eq!(stats.duplicates().count(), 1);
        assert!(stats.is_consistent());
    }

    #[test]
    fn test_incomplete_records_are_ignored() {
        let mut stats = Statistics::new();
        assert!(!stats.add(HouseRecord::default()));
        assert!(!stats.add(HouseRecord {
            street: Some("s".to_string()),
            house: Some("6".to_string()),
            floor: Some(3),
            ..HouseRecord::default()
        }));
        assert_eq!(stats, Statistics::new());
        assert_eq!(stats.broken_seen(), 0);
    }

    #[test]
    fn test_merge_sums_everything() {
        let mut left = sample(&[("A", "s", "1", 2), ("A", "s", "2", 6)]);
        left.add_broken(1);
        let mut right = sample(&[("A", "s", "1", 2), ("B", "t", "1", 1)]);
        right.add_broken(2);

        left.merge(right);
        assert_eq!(left.items_seen(), 4);
        assert_eq!(left.broken_seen(), 3);
        assert_eq!(left.address_count(&AddressKey::new("A", "s", "1")), 2);
        assert_eq!(left.floors("A").unwrap().counts(), &[0, 2, 0, 0, 0, 1]);
        assert_eq!(left.floors("B").unwrap().counts(), &[1, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_merge_with_empty_is_identity() {
        let stats = sample(&[("A", "s", "1", 2), ("B", "t", "1", 7)]);
        let mut merged = stats.clone();
        merged.merge(Statistics::new());
        assert_eq!(merged, stats);

        let from_empty = Statistics::merge_all([Statistics::new(), stats.clone()]);
        assert_eq!(from_empty, stats);
    }

    #[test]
    fn test_equality_ignores_order() {
        let forward = sample(&[("A", "s", "1", 2), ("B", "t", "1", 7)]);
        let backward = sample(&[("B", "t", "1", 7), ("A", "s", "1", 2)]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_inconsistent_statistics_detected() {
        let mut stats = sample(&[("A", "s", "1", 2)]);
        stats.floor_histogram.entry("A".to_string()).or_default().credit(3);
        assert!(!stats.is_consistent());
    }
}
