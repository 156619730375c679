//! Packed street geometries and interpolation along them.

mod codec;
mod path;

pub use codec::{decode, encode};
pub use path::point_at;
