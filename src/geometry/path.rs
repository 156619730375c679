use geo::Coord;

use crate::error::{GeocodeError, Result};

/// Planar length of one polyline segment.
///
/// The longitude delta is scaled by the cosine of the mean latitude of the
/// two endpoints (local equirectangular approximation).
fn segment_length(a: Coord<f64>, b: Coord<f64>) -> (f64, f64) {
    let scale = ((a.y + b.y) / 2.0).to_radians().cos();
    let dx = (b.x - a.x) * scale;
    let dy = b.y - a.y;
    ((dx * dx + dy * dy).sqrt(), scale)
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Point at `fraction` of the way along `points`, measured by planar length.
///
/// Exactly `0.0` and `1.0` return the first and last point untouched.
/// Interpolated coordinates are rounded to 6 decimal places.
pub fn point_at(points: &[Coord<f64>], fraction: f64) -> Result<Coord<f64>> {
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(GeocodeError::DegenerateGeometry { points: 0 }),
    };

    if fraction == 0.0 {
        return Ok(first);
    }
    if fraction == 1.0 {
        return Ok(last);
    }
    if points.len() < 2 {
        return Err(GeocodeError::DegenerateGeometry {
            points: points.len(),
        });
    }

    let lengths: Vec<(f64, f64)> = points
        .windows(2)
        .map(|pair| segment_length(pair[0], pair[1]))
        .collect();
    let total: f64 = lengths.iter().map(|(len, _)| len).sum();

    let mut target = total * fraction.clamp(0.0, 1.0);
    for (pair, (len, scale)) in points.windows(2).zip(lengths) {
        if target < len {
            let (a, b) = (pair[0], pair[1]);
            let t = target / len;
            // dx was scaled for length; undo the scale to get back to degrees
            let dx = (b.x - a.x) * scale;
            return Ok(Coord {
                x: round6(a.x + dx * t / scale),
                y: round6(a.y + (b.y - a.y) * t),
            });
        }
        target -= len;
    }

    Ok(last)
}
