//! Address record structures.
//!
//! A [`HouseRecord`] is the scratch state the tokenizer fills while scanning one
//! `<item ... />` element. Once a record is judged complete its identity is
//! captured as an [`AddressKey`], which is what statistics deduplicate on.
//!
//! # Examples
//!
//! ```
//! use addrstat::record::{AddressKey, HouseRecord};
//!
//! let record = HouseRecord::new("Барнаул", "Дальняя улица", "56", 2);
//! assert!(record.is_complete());
//!
//! let (key, floor) = record.into_address().unwrap();
//! assert_eq!(key, AddressKey::new("Барнаул", "Дальняя улица", "56"));
//! assert_eq!(floor, 2);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute names the tokenizer assigns into a [`HouseRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    /// `city="..."`
    City,
    /// `street="..."`
    Street,
    /// `house="..."`
    House,
    /// `floor="..."`
    Floor,
}

impl Attribute {
    /// Look up a recognized attribute by its name; unknown names yield `None`.
    #[must_use]
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"city" => Some(Attribute::City),
            b"street" => Some(Attribute::Street),
            b"house" => Some(Attribute::House),
            b"floor" => Some(Attribute::Floor),
            _ => None,
        }
    }

    /// The attribute name as written in the markup.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Attribute::City => "city",
            Attribute::Street => "street",
            Attribute::House => "house",
            Attribute::Floor => "floor",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An address record under construction.
///
/// Every field is optional until assigned. The tokenizer never assigns an
/// empty string or a zero floor, but records built by hand may carry them;
/// [`is_complete`](Self::is_complete) treats those as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseRecord {
    /// City name
    pub city: Option<String>,
    /// Street name
    pub street: Option<String>,
    /// House number (free text, e.g. `"12a"`)
    pub house: Option<String>,
    /// Number of floors
    pub floor: Option<u16>,
}

impl HouseRecord {
    /// Create a fully populated record.
    #[must_use]
    pub fn new(city: &str, street: &str, house: &str, floor: u16) -> Self {
        HouseRecord {
            city: Some(city.to_string()),
            street: Some(street.to_string()),
            house: Some(house.to_string()),
            floor: Some(floor),
        }
    }

    /// Whether `attribute` already holds a value in this record.
    #[must_use]
    pub fn is_assigned(&self, attribute: Attribute) -> bool {
        match attribute {
            Attribute::City => self.city.is_some(),
            Attribute::Street => self.street.is_some(),
            Attribute::House => self.house.is_some(),
            Attribute::Floor => self.floor.is_some(),
        }
    }

    /// Whether no field has been assigned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.city.is_none() && self.street.is_none() && self.house.is_none() && self.floor.is_none()
    }

    /// Complete means: city, street and house are non-empty and floor is positive.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        non_empty(self.city.as_deref())
            && non_empty(self.street.as_deref())
            && non_empty(self.house.as_deref())
            && self.floor.is_some_and(|floor| floor > 0)
    }

    /// Clear every field.
    pub fn reset(&mut self) {
        *self = HouseRecord::default();
    }

    /// Move the current contents out, leaving the record cleared.
    pub fn take(&mut self) -> HouseRecord {
        std::mem::take(self)
    }

    /// Split a complete record into its identity and floor count.
    ///
    /// Returns `None` for incomplete records.
    #[must_use]
    pub fn into_address(self) -> Option<(AddressKey, u16)> {
        if !self.is_complete() {
            return None;
        }
        match self {
            HouseRecord {
                city: Some(city),
                street: Some(street),
                house: Some(house),
                floor: Some(floor),
            } => Some((AddressKey { city, street, house }, floor)),
            _ => None,
        }
    }
}

fn non_empty(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

/// Identity of an address: equality is structural over all three parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AddressKey {
    /// City name
    pub city: String,
    /// Street name
    pub street: String,
    /// House number
    pub house: String,
}

impl AddressKey {
    /// Create an address key from string slices.
    #[must_use]
    pub fn new(city: &str, street: &str, house: &str) -> Self {
        AddressKey {
            city: city.to_string(),
            street: street.to_string(),
            house: house.to_string(),
        }
    }
}

impl fmt::Display for AddressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.city, self.street, self.house)
    }
}
