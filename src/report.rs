//! Final report rendering.
//!
//! A [`Report`] is a read-only snapshot of finished [`Statistics`]: totals, the
//! per-city floor breakdown and every address seen more than once. It renders
//! as plain text through [`std::fmt::Display`] and as JSON through `serde_json`.
//!
//! # Examples
//!
//! ```
//! use addrstat::record::HouseRecord;
//! use addrstat::report::Report;
//! use addrstat::statistics::Statistics;
//!
//! let mut stats = Statistics::new();
//! stats.add(HouseRecord::new("Абакан", "Речная улица", "3", 2));
//! stats.add(HouseRecord::new("Абакан", "Речная улица", "3", 2));
//!
//! let report = Report::from(&stats);
//! assert_eq!(report.unique_addresses, 1);
//! assert!(report.to_string().contains("Duplicate:  Абакан, Речная улица, 3"));
//! ```

use crate::error::Result;
use crate::record::AddressKey;
use crate::statistics::{FloorHistogram, Statistics, FLOOR_BUCKETS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Floor breakdown for one city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityFloors {
    /// City name
    pub city: String,
    /// First-seen addresses by floor
    pub floors: FloorHistogram,
}

/// An address seen more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duplicate {
    /// The repeated address
    pub address: AddressKey,
    /// How many times it occurred
    pub count: u64,
}

/// Summary of a finished parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Distinct addresses
    pub unique_addresses: usize,
    /// Complete records, duplicates included
    pub items_seen: u64,
    /// Records rejected as malformed
    pub broken_seen: u64,
    /// Per-city floor histograms, in first-seen order
    pub cities: Vec<CityFloors>,
    /// Addresses with more than one occurrence, in first-seen order
    pub duplicates: Vec<Duplicate>,
}

impl Report {
    /// Serialize the report as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize the report as indented JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl From<&Statistics> for Report {
    fn from(stats: &Statistics) -> Self {
        Report {
            unique_addresses: stats.unique_addresses(),
            items_seen: stats.items_seen(),
            broken_seen: stats.broken_seen(),
            cities: stats
                .cities()
                .map(|(city, floors)| CityFloors {
                    city: city.to_string(),
                    floors: *floors,
                })
                .collect(),
            duplicates: stats
                .duplicates()
                .map(|(address, count)| Duplicate {
                    address: address.clone(),
                    count,
                })
                .collect(),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total items:  {:12}", self.unique_addresses)?;
        writeln!(f)?;
        for CityFloors { city, floors } in &self.cities {
            write!(f, "{city}: houses - ")?;
            for (index, count) in floors.counts()[..FLOOR_BUCKETS - 1].iter().enumerate() {
                if index > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{count} with {} floors", index + 1)?;
            }
            if floors.overflow() > 0 {
                write!(f, ", {} with floors > {}", floors.overflow(), FLOOR_BUCKETS - 1)?;
            }
            writeln!(f)?;
        }
        writeln!(f)?;
        writeln!(f, "Total read items:    {:12}", self.items_seen)?;
        writeln!(f, "Broken read items:   {:12}", self.broken_seen)?;
        for Duplicate { address, .. } in &self.duplicates {
            writeln!(f, "Duplicate:  {address}")?;
        }
        Ok(())
    }
}
