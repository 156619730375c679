use geo::Coord;

use crate::error::{GeocodeError, Result};

/// Fixed-point scale of the packed coordinates (micro-degrees).
const SCALE: f64 = 1_000_000.0;

/// Bytes per `(lon, lat)` pair.
const PAIR_LEN: usize = 8;

/// Decode a packed polyline into `(lon, lat)` coordinates.
///
/// The buffer is a run of little-endian 32-bit values, each a two's-complement
/// micro-degree, consumed pairwise as longitude then latitude.
pub fn decode(bytes: &[u8]) -> Result<Vec<Coord<f64>>> {
    if bytes.len() % PAIR_LEN != 0 {
        return Err(GeocodeError::MalformedGeometry { len: bytes.len() });
    }

    Ok(bytes
        .chunks_exact(PAIR_LEN)
        .map(|pair| {
            let lon = i32::from_le_bytes([pair[0], pair[1], pair[2], pair[3]]);
            let lat = i32::from_le_bytes([pair[4], pair[5], pair[6], pair[7]]);
            Coord {
                x: f64::from(lon) / SCALE,
                y: f64::from(lat) / SCALE,
            }
        })
        .collect())
}

/// Pack coordinates into the format read by [`decode`], rounding to the
/// nearest micro-degree.
pub fn encode(points: &[Coord<f64>]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(points.len() * PAIR_LEN);
    for point in points {
        bytes.extend_from_slice(&((point.x * SCALE).round() as i32).to_le_bytes());
        bytes.extend_from_slice(&((point.y * SCALE).round() as i32).to_le_bytes());
    }
    bytes
}
