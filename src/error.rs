//! Error type shared by the matching pipeline and the datastore adapters.

use thiserror::Error;

/// Failures surfaced by [`crate::matching::Geocoder::geocode`].
///
/// A query that simply matches nothing is not an error; it yields an empty
/// result list.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// The query is missing a required field or carries a non-numeric house number.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A packed geometry buffer whose length is not a multiple of 8 bytes.
    #[error("malformed geometry: {len} bytes is not a whole number of coordinate pairs")]
    MalformedGeometry { len: usize },

    /// Interpolation requested inside a polyline with fewer than two points.
    #[error("degenerate geometry: cannot interpolate along {points} point(s)")]
    DegenerateGeometry { points: usize },

    /// The datastore collaborator failed. No retry happens at this layer.
    #[error("retrieval failed: {0}")]
    RetrievalFailure(String),
}

impl GeocodeError {
    pub fn retrieval(err: impl std::fmt::Display) -> Self {
        GeocodeError::RetrievalFailure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GeocodeError>;
