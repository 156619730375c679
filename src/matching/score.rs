//! Field-by-field similarity between a query and a match row.

use once_cell::sync::Lazy;
use regex::Regex;
use strsim::levenshtein;

use crate::models::{MatchRow, Query};

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("valid regex"));

/// Lowercase and strip every non-word character, whitespace included.
pub fn normalize(value: &str) -> String {
    NON_WORD.replace_all(&value.to_lowercase(), "").into_owned()
}

/// Similarity of two field values in [0, 1].
///
/// Identical after normalization scores 1.0, otherwise one minus the
/// Levenshtein distance relative to the longer value.
pub fn field_similarity(a: &str, b: &str) -> f64 {
    let (a, b) = (normalize(a), normalize(b));
    if a == b {
        return 1.0;
    }
    let longest = a.chars().count().max(b.chars().count());
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

/// Score `row` against `query`, whose house number is `number`.
///
/// Every non-empty query field counts toward the denominator, `number`
/// included, even though the number is only ever compared through the parity
/// bonus. Fields the row has no value for add nothing to the numerator.
pub fn score(query: &Query, row: &MatchRow, number: i64) -> f64 {
    let fields = query.field_count();
    if fields == 0 {
        return 0.0;
    }

    let comparable = [
        (query.zip(), Some(row.zip.as_str())),
        (query.city(), row.city.as_deref()),
        (query.name(), Some(row.name.as_str())),
    ];

    let mut total: f64 = comparable
        .iter()
        .filter_map(|(wanted, have)| Some(field_similarity((*wanted)?, (*have)?)))
        .sum();

    if row.fromhn.rem_euclid(2) == number.rem_euclid(2) {
        total += 1.0;
    }

    total / fields as f64
}
