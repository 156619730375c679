//! Candidate scoring, selection and interpolation.

pub mod join;
mod pipeline;
pub mod range;
pub mod score;
mod select;

pub use pipeline::Geocoder;
pub use select::select_best;
