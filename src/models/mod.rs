//! Core data models for address matching.

pub mod candidate;
pub mod query;
pub mod record;

pub use candidate::{Candidate, CandidateKey, MatchRow};
pub use query::{HouseNumber, Query};
pub use record::{
    AddressRange, EdgeRecord, Place, PrimarySegment, Segment, SegmentRange, Side, PRIMARY_FLAG,
};
