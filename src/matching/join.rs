//! Value-keyed joins between match rows and reference records.
//!
//! All joins are left joins with fan-out: a row produces one output row per
//! matching record, and a row with no match passes through unchanged.

use std::hash::Hash;

use hashbrown::{HashMap, HashSet};

use crate::models::{AddressRange, MatchRow, Place, PrimarySegment};

/// Join places onto rows by zip, place attributes winning.
pub fn join_places(rows: Vec<MatchRow>, places: &[Place]) -> Vec<MatchRow> {
    let mut by_zip: HashMap<&str, Vec<&Place>> = HashMap::new();
    for place in places {
        by_zip.entry(place.zip.as_str()).or_default().push(place);
    }

    rows.into_iter()
        .flat_map(|row| match by_zip.get(row.zip.as_str()) {
            Some(matches) => matches.iter().map(|p| row.with_place(p)).collect(),
            None => vec![row],
        })
        .collect()
}

/// Join primary segment/edge rows onto match rows by TLID.
pub fn join_primary_segments(rows: Vec<MatchRow>, primaries: &[PrimarySegment]) -> Vec<MatchRow> {
    let mut by_tlid: HashMap<i64, Vec<&PrimarySegment>> = HashMap::new();
    for primary in primaries {
        by_tlid.entry(primary.segment.tlid).or_default().push(primary);
    }

    rows.into_iter()
        .flat_map(|row| match by_tlid.get(&row.tlid) {
            Some(matches) => matches.iter().map(|p| row.with_primary(p)).collect(),
            None => vec![row],
        })
        .collect()
}

/// Group address ranges by TLID.
pub fn group_ranges(ranges: Vec<AddressRange>) -> HashMap<i64, Vec<AddressRange>> {
    let mut grouped: HashMap<i64, Vec<AddressRange>> = HashMap::new();
    for range in ranges {
        grouped.entry(range.tlid).or_default().push(range);
    }
    grouped
}

/// Distinct values in first-seen order.
pub fn distinct<T: Clone + Eq + Hash>(values: impl IntoIterator<Item = T>) -> Vec<T> {
    distinct_by(values, T::clone)
}

/// Values with distinct `key`s in first-seen order.
pub fn distinct_by<T, K, F>(values: impl IntoIterator<Item = T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    values.into_iter().filter(|v| seen.insert(key(v))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EdgeRecord, Segment, SegmentRange, Side};

    fn segment(tlid: i64, zip: &str) -> Segment {
        Segment {
            tlid,
            name: "Elm St".to_string(),
            name_key: "ELMST".to_string(),
            zip: zip.to_string(),
            geometry: Vec::new(),
        }
    }

    fn row(tlid: i64, zip: &str) -> MatchRow {
        MatchRow::from(SegmentRange {
            segment: segment(tlid, zip),
            range: AddressRange {
                tlid,
                side: Side::Even,
                fromhn: 2,
                tohn: 20,
                zip: zip.to_string(),
            },
        })
    }

    fn place(zip: &str, city: &str) -> Place {
        Place {
            zip: zip.to_string(),
            city: city.to_string(),
            state: Some("MA".to_string()),
            city_key: String::new(),
            paflag: None,
        }
    }

    #[test]
    fn test_join_places_fans_out() {
        let rows = vec![row(1, "02139"), row(2, "02140")];
        let places = vec![place("02139", "Cambridge"), place("02139", "Cambridgeport")];
        let joined = join_places(rows, &places);

        assert_eq!(joined.len(), 3);
        assert_eq!(joined[0].city.as_deref(), Some("Cambridge"));
        assert_eq!(joined[1].city.as_deref(), Some("Cambridgeport"));
        // unmatched zip passes through
        assert_eq!(joined[2].tlid, 2);
        assert!(joined[2].city.is_none());
    }

    #[test]
    fn test_join_primary_segments_by_tlid() {
        let mut primary_segment = segment(1, "02139");
        primary_segment.name = "Elm Street".to_string();
        let primaries = vec![PrimarySegment {
            segment: primary_segment,
            edge: EdgeRecord {
                tlid: 1,
                paflag: "P".to_string(),
                mtfcc: Some("S1400".to_string()),
            },
        }];

        let joined = join_primary_segments(vec![row(1, "02139"), row(9, "02139")], &primaries);
        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0].name, "Elm Street");
        assert_eq!(joined[0].mtfcc.as_deref(), Some("S1400"));
        assert_eq!(joined[1].name, "Elm St");
    }

    #[test]
    fn test_group_ranges() {
        let ranges = vec![
            AddressRange {
                tlid: 1,
                side: Side::Even,
                fromhn: 2,
                tohn: 8,
                zip: "1".to_string(),
            },
            AddressRange {
                tlid: 2,
                side: Side::Odd,
                fromhn: 1,
                tohn: 9,
                zip: "1".to_string(),
            },
            AddressRange {
                tlid: 1,
                side: Side::Odd,
                fromhn: 1,
                tohn: 7,
                zip: "1".to_string(),
            },
        ];
        let grouped = group_ranges(ranges);
        assert_eq!(grouped[&1].len(), 2);
        assert_eq!(grouped[&2].len(), 1);
    }

    #[test]
    fn test_distinct_keeps_first_seen_order() {
        assert_eq!(distinct(vec![3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }

    #[test]
    fn test_distinct_by_key() {
        let words = vec!["Elm", "elm", "Oak", "ELM", "oak"];
        assert_eq!(distinct_by(words, |w| w.to_lowercase()), vec!["Elm", "Oak"]);
    }
}
