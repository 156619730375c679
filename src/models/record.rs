//! Reference records returned by the datastore collaborator.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Flag value marking the authoritative row among import duplicates.
pub const PRIMARY_FLAG: &str = "P";

/// Even/odd side of a street that an address range belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "E", alias = "even")]
    Even,
    #[serde(rename = "O", alias = "odd")]
    Odd,
}

impl Side {
    /// Side a house number falls on by its parity.
    pub fn of(number: i64) -> Self {
        if number.rem_euclid(2) == 0 {
            Side::Even
        } else {
            Side::Odd
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Even => write!(f, "E"),
            Side::Odd => write!(f, "O"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "e" | "even" => Ok(Side::Even),
            "o" | "odd" => Ok(Side::Odd),
            other => Err(format!("unknown range side '{}'", other)),
        }
    }
}

/// Postal-area record keyed by zip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Place {
    pub zip: String,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Phonetic key of `city`
    pub city_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paflag: Option<String>,
}

impl Place {
    pub fn is_primary(&self) -> bool {
        self.paflag.as_deref() == Some(PRIMARY_FLAG)
    }
}

/// Street centerline (feature) keyed by its TLID.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub tlid: i64,
    pub name: String,
    /// Phonetic key of `name`
    pub name_key: String,
    pub zip: String,
    /// Packed little-endian polyline, see [`crate::geometry::decode`]
    pub geometry: Vec<u8>,
}

/// One contiguous run of house numbers on one side of a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressRange {
    pub tlid: i64,
    pub side: Side,
    pub fromhn: i64,
    pub tohn: i64,
    pub zip: String,
}

impl AddressRange {
    /// Whether `number` lies within `fromhn..=tohn` as stored.
    pub fn brackets(&self, number: i64) -> bool {
        self.fromhn <= number && number <= self.tohn
    }

    /// Whether `number` falls on this range's side and within its bounds.
    pub fn serves(&self, number: i64) -> bool {
        self.side == Side::of(number) && self.brackets(number)
    }
}

/// Per-segment attributes from the edge table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub tlid: i64,
    pub paflag: String,
    /// MAF/TIGER feature class code, e.g. "S1400"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtfcc: Option<String>,
}

impl EdgeRecord {
    pub fn is_primary(&self) -> bool {
        self.paflag == PRIMARY_FLAG
    }
}

/// Segment joined with one of its address ranges, as returned by the name lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRange {
    pub segment: Segment,
    pub range: AddressRange,
}

/// Segment joined with its primary edge record.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimarySegment {
    pub segment: Segment,
    pub edge: EdgeRecord,
}
