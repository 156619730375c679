use std::path::PathBuf;
use std::sync::Arc;

use addrpoint::config::MatchingConfig;
use addrpoint::geometry;
use addrpoint::models::{AddressRange, Segment, Side};
use addrpoint::phonetic::{self, DEFAULT_KEY_LEN};
use addrpoint::store::MemoryStore;
use addrpoint::{Geocoder, Query};
use geo::Coord;

fn main_street(stored_name: &str) -> Geocoder {
    let store = MemoryStore::new()
        .with_segment(Segment {
            tlid: 1,
            name: stored_name.to_string(),
            // stored key matches the query's
            name_key: phonetic::encode("Main Street", DEFAULT_KEY_LEN),
            zip: "02139".to_string(),
            geometry: geometry::encode(&[
                Coord { x: -71.10, y: 42.36 },
                Coord { x: -71.12, y: 42.38 },
            ]),
        })
        .with_range(AddressRange {
            tlid: 1,
            side: Side::Even,
            fromhn: 100,
            tohn: 200,
            zip: "02139".to_string(),
        });
    Geocoder::new(Arc::new(store), MatchingConfig::default())
}

fn sample_data_keyed(phonetic_len: usize) -> Geocoder {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data");
    let store = MemoryStore::load_from_dir(dir, phonetic_len).unwrap();
    Geocoder::new(
        Arc::new(store),
        MatchingConfig {
            phonetic_len,
            ..Default::default()
        },
    )
}

fn sample_data() -> Geocoder {
    sample_data_keyed(DEFAULT_KEY_LEN)
}

#[tokio::test]
async fn test_single_segment_midpoint() {
    let query = Query::new("Main Street", 150).with_zip("02139");
    let results = main_street("Main Street").geocode(&query).await.unwrap();

    assert_eq!(results.len(), 1);
    let hit = &results[0];
    assert_eq!(hit.score, 1.0);
    assert_eq!(hit.number, 150);
    assert_eq!(hit.zip, "02139");
    assert!((hit.lon - -71.11).abs() < 1e-6);
    assert!((hit.lat - 42.37).abs() < 1e-6);
}

#[tokio::test]
async fn test_abbreviated_stored_name_scores_below_one() {
    let query = Query::new("Main Street", 150).with_zip("02139");
    let results = main_street("Main St").geocode(&query).await.unwrap();

    assert_eq!(results.len(), 1);
    assert!((results[0].score - 2.6 / 3.0).abs() < 1e-12);
    assert_eq!(results[0].name, "Main St");
}

#[tokio::test]
async fn test_number_as_text() {
    let query = Query::new("Main Street", "150").with_zip("02139");
    let results = main_street("Main Street").geocode(&query).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].number, 150);
}

#[tokio::test]
async fn test_range_start_returns_first_vertex() {
    let query = Query::new("Main Street", 100);
    let results = main_street("Main Street").geocode(&query).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].lon, -71.10);
    assert_eq!(results[0].lat, 42.36);
}

#[tokio::test]
async fn test_sample_data_zip_match_uses_primary_place() {
    let query = Query::new("Main Street", 150).with_zip("02139");
    let results = sample_data().geocode(&query).await.unwrap();

    assert_eq!(results.len(), 1);
    let hit = &results[0];
    assert_eq!(hit.score, 1.0);
    assert_eq!(hit.city.as_deref(), Some("Cambridge"));
    assert_eq!(hit.state.as_deref(), Some("MA"));
    assert_eq!(hit.feature_class.as_deref(), Some("S1400"));
    assert!((hit.lon - -71.11).abs() < 1e-6);
}

#[tokio::test]
async fn test_sample_data_numeric_street_by_city() {
    let query = Query::new("5th St", 20).with_city("Cambridge");
    let results = sample_data().geocode(&query).await.unwrap();

    assert_eq!(results.len(), 1);
    let hit = &results[0];
    assert_eq!(hit.name, "5th Street");
    assert_eq!(hit.zip, "02142");
    assert!(hit.score < 1.0);
    assert!(hit.lat > 42.3660 && hit.lat < 42.3690);
}

#[tokio::test]
async fn test_sample_data_falls_back_without_zip() {
    let query = Query::new("Cambridge Street", 60).with_zip("99999");
    let results = sample_data().geocode(&query).await.unwrap();

    // wrong zip scores zero, name and parity carry the even-side range
    assert_eq!(results.len(), 1);
    let hit = &results[0];
    assert_eq!(hit.zip, "02114");
    assert_eq!(hit.city.as_deref(), Some("Boston"));
    assert_eq!(hit.feature_class.as_deref(), Some("S1200"));
    assert!((hit.score - 2.0 / 3.0).abs() < 1e-12);
}

#[tokio::test]
async fn test_sample_data_unknown_street() {
    let query = Query::new("Quahog Boulevard", 12).with_zip("02139");
    let results = sample_data().geocode(&query).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_number_on_the_other_side_only_is_no_match() {
    let store = MemoryStore::new()
        .with_segment(Segment {
            tlid: 1,
            name: "Main Street".to_string(),
            name_key: phonetic::encode("Main Street", DEFAULT_KEY_LEN),
            zip: "02139".to_string(),
            geometry: geometry::encode(&[
                Coord { x: -71.10, y: 42.36 },
                Coord { x: -71.12, y: 42.38 },
            ]),
        })
        .with_range(AddressRange {
            tlid: 1,
            side: Side::Even,
            fromhn: 100,
            tohn: 148,
            zip: "02139".to_string(),
        })
        .with_range(AddressRange {
            tlid: 1,
            side: Side::Odd,
            fromhn: 101,
            tohn: 199,
            zip: "02139".to_string(),
        });
    let geocoder = Geocoder::new(Arc::new(store), MatchingConfig::default());

    // 150 lies inside 101..199, but that range holds odd numbers
    let query = Query::new("Main Street", 150).with_zip("02139");
    assert!(geocoder.geocode(&query).await.unwrap().is_empty());

    let results = geocoder
        .geocode(&Query::new("Main Street", 151).with_zip("02139"))
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].number, 151);
}

#[tokio::test]
async fn test_sample_data_matches_at_any_key_length() {
    let query = Query::new("Main Street", 150).with_zip("02139");
    for phonetic_len in [3, 4, 5, 6, 8] {
        let results = sample_data_keyed(phonetic_len)
            .geocode(&query)
            .await
            .unwrap();
        assert_eq!(results.len(), 1, "key length {}", phonetic_len);
        assert_eq!(results[0].score, 1.0);
    }
}
