//! Position of a house number within the cumulative span of one street side.

use crate::models::{AddressRange, Side};

/// Ranges of one segment on `side`, ordered by `fromhn`.
pub fn side_ranges<'a>(ranges: &'a [AddressRange], side: Side) -> Vec<&'a AddressRange> {
    let mut matching: Vec<&AddressRange> = ranges.iter().filter(|r| r.side == side).collect();
    matching.sort_by_key(|r| r.fromhn);
    matching
}

/// Fraction in [0, 1] of the side's total range span that precedes `number`.
///
/// Ranges starting above `number` contribute their full length; the range
/// containing `number` contributes the part below it. A reversed range is
/// read with its bounds swapped. A zero total span yields `0.0`.
pub fn fraction(number: i64, ranges: &[&AddressRange]) -> f64 {
    let mut total = 0i64;
    let mut interval = 0i64;

    for range in ranges {
        let (low, high) = if range.fromhn <= range.tohn {
            (range.fromhn, range.tohn)
        } else {
            (range.tohn, range.fromhn)
        };
        total += high - low;
        if low > number {
            interval += high - low;
        } else if number <= high {
            interval += number - low;
        }
    }

    if total == 0 {
        return 0.0;
    }
    (interval as f64 / total as f64).clamp(0.0, 1.0)
}
