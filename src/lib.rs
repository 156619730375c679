//! Addrpoint - street address interpolation geocoder
//!
//! Matches house number / street / city / zip queries against street segments
//! and address ranges, and places the best matches along their segment.
//! Shared by the query server and the batch binary.

pub mod config;
pub mod error;
pub mod geometry;
pub mod matching;
pub mod models;
pub mod phonetic;
pub mod store;

pub use error::GeocodeError;
pub use matching::Geocoder;
pub use models::{Candidate, Query};
