//! In-memory datastore, optionally loaded from a directory of CSV tables.
//!
//! Expected files (all optional, headers required):
//! - `places.csv`:   `zip,city,state,city_key,paflag`
//! - `features.csv`: `tlid,name,name_key,zip,geometry`
//! - `ranges.csv`:   `tlid,side,fromhn,tohn,zip`
//! - `edges.csv`:    `tlid,paflag,mtfcc`
//!
//! `geometry` is a `lon lat,lon lat,...` list. Empty `city_key`/`name_key`
//! columns are filled in with [`crate::phonetic::encode`] at the configured
//! key length, which must match the one queries are keyed with.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use csv::ReaderBuilder;
use geo::Coord;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{info, warn};

use super::Datastore;
use crate::error::Result;
use crate::geometry;
use crate::models::{AddressRange, EdgeRecord, Place, PrimarySegment, Segment, SegmentRange};
use crate::phonetic;

#[derive(Debug, Deserialize)]
struct PlaceRow {
    zip: String,
    city: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    city_key: Option<String>,
    #[serde(default)]
    paflag: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeatureRow {
    tlid: i64,
    name: String,
    #[serde(default)]
    name_key: Option<String>,
    zip: String,
    geometry: String,
}

/// Reference tables held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    places: Vec<Place>,
    segments: Vec<Segment>,
    ranges: Vec<AddressRange>,
    edges: Vec<EdgeRecord>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse a `lon lat,lon lat,...` coordinate list.
pub fn parse_coords(text: &str) -> AnyResult<Vec<Coord<f64>>> {
    text.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let mut parts = pair.split_whitespace();
            let (Some(lon), Some(lat), None) = (parts.next(), parts.next(), parts.next()) else {
                anyhow::bail!("expected 'lon lat', got '{}'", pair);
            };
            Ok(Coord {
                x: lon.parse::<f64>().with_context(|| format!("bad longitude '{}'", lon))?,
                y: lat.parse::<f64>().with_context(|| format!("bad latitude '{}'", lat))?,
            })
        })
        .collect()
}

fn read_table<T: DeserializeOwned>(path: &Path) -> AnyResult<Vec<T>> {
    if !path.exists() {
        warn!("Table not found: {}", path.display());
        return Ok(Vec::new());
    }
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut rows = Vec::new();
    for (line, record) in reader.deserialize().enumerate() {
        let row: T = record
            .with_context(|| format!("Bad row {} in {}", line + 1, path.display()))?;
        rows.push(row);
    }
    Ok(rows)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_place(mut self, place: Place) -> Self {
        self.places.push(place);
        self
    }

    pub fn with_segment(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn with_range(mut self, range: AddressRange) -> Self {
        self.ranges.push(range);
        self
    }

    pub fn with_edge(mut self, edge: EdgeRecord) -> Self {
        self.edges.push(edge);
        self
    }

    /// Load the CSV tables in `dir`, computing missing keys `key_len` long.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P, key_len: usize) -> AnyResult<Self> {
        let dir = dir.as_ref();
        info!("Loading reference tables from {}", dir.display());

        let places = read_table::<PlaceRow>(&dir.join("places.csv"))?
            .into_iter()
            .map(|row| Place {
                city_key: non_blank(row.city_key)
                    .unwrap_or_else(|| phonetic::encode(&row.city, key_len)),
                zip: row.zip,
                city: row.city,
                state: non_blank(row.state),
                paflag: non_blank(row.paflag),
            })
            .collect::<Vec<_>>();

        let segments = read_table::<FeatureRow>(&dir.join("features.csv"))?
            .into_iter()
            .map(|row| {
                let points = parse_coords(&row.geometry)
                    .with_context(|| format!("Bad geometry for tlid {}", row.tlid))?;
                if points.is_empty() {
                    anyhow::bail!("Empty geometry for tlid {}", row.tlid);
                }
                Ok(Segment {
                    name_key: non_blank(row.name_key)
                        .unwrap_or_else(|| phonetic::encode(&row.name, key_len)),
                    tlid: row.tlid,
                    name: row.name,
                    zip: row.zip,
                    geometry: geometry::encode(&points),
                })
            })
            .collect::<AnyResult<Vec<_>>>()?;

        let ranges = read_table::<AddressRange>(&dir.join("ranges.csv"))?;
        let edges = read_table::<EdgeRecord>(&dir.join("edges.csv"))?;

        info!(
            "Loaded {} places, {} features, {} ranges, {} edges",
            places.len(),
            segments.len(),
            ranges.len(),
            edges.len()
        );

        Ok(Self {
            places,
            segments,
            ranges,
            edges,
        })
    }

    fn joined_ranges<'a>(
        &'a self,
        segments: impl Iterator<Item = &'a Segment>,
        number: i64,
    ) -> Vec<SegmentRange> {
        segments
            .flat_map(|segment| {
                self.ranges
                    .iter()
                    .filter(move |r| {
                        r.tlid == segment.tlid && r.zip == segment.zip && r.serves(number)
                    })
                    .map(move |range| SegmentRange {
                        segment: segment.clone(),
                        range: range.clone(),
                    })
            })
            .collect()
    }
}

#[async_trait]
impl Datastore for MemoryStore {
    async fn places_by_zip(&self, zip: &str) -> Result<Vec<Place>> {
        Ok(self.places.iter().filter(|p| p.zip == zip).cloned().collect())
    }

    async fn places_by_city_key(&self, city_key: &str) -> Result<Vec<Place>> {
        Ok(self
            .places
            .iter()
            .filter(|p| p.city_key == city_key)
            .cloned()
            .collect())
    }

    async fn candidates_by_name_zips_number(
        &self,
        name_key: &str,
        zips: &[String],
        number: i64,
    ) -> Result<Vec<SegmentRange>> {
        let segments = self
            .segments
            .iter()
            .filter(|s| s.name_key == name_key && zips.contains(&s.zip));
        Ok(self.joined_ranges(segments, number))
    }

    async fn candidates_by_name_number(
        &self,
        name_key: &str,
        number: i64,
    ) -> Result<Vec<SegmentRange>> {
        let segments = self.segments.iter().filter(|s| s.name_key == name_key);
        Ok(self.joined_ranges(segments, number))
    }

    async fn primary_segments(&self, tlids: &[i64]) -> Result<Vec<PrimarySegment>> {
        let mut rows = Vec::new();
        for segment in self.segments.iter().filter(|s| tlids.contains(&s.tlid)) {
            if let Some(edge) = self
                .edges
                .iter()
                .find(|e| e.tlid == segment.tlid && e.is_primary())
            {
                rows.push(PrimarySegment {
                    segment: segment.clone(),
                    edge: edge.clone(),
                });
            }
        }
        Ok(rows)
    }

    async fn all_ranges(&self, tlids: &[i64]) -> Result<Vec<AddressRange>> {
        Ok(self
            .ranges
            .iter()
            .filter(|r| tlids.contains(&r.tlid))
            .cloned()
            .collect())
    }

    async fn primary_places(&self, zips: &[String]) -> Result<Vec<Place>> {
        Ok(self
            .places
            .iter()
            .filter(|p| p.is_primary() && zips.contains(&p.zip))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Side;
    use crate::phonetic::DEFAULT_KEY_LEN;
    use std::io::Write;

    fn write(dir: &Path, name: &str, content: &str) {
        let mut file = File::create(dir.join(name)).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_parse_coords() {
        let coords = parse_coords("-71.10 42.36, -71.12 42.38").unwrap();
        assert_eq!(coords.len(), 2);
        assert_eq!(coords[1], Coord { x: -71.12, y: 42.38 });
        assert!(parse_coords("-71.10").is_err());
        assert!(parse_coords("a b").is_err());
    }

    #[tokio::test]
    async fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "places.csv",
            "zip,city,state,city_key,paflag\n02139,Cambridge,MA,,P\n",
        );
        write(
            dir.path(),
            "features.csv",
            "tlid,name,name_key,zip,geometry\n7,Main Street,,02139,\"-71.10 42.36,-71.12 42.38\"\n",
        );
        write(
            dir.path(),
            "ranges.csv",
            "tlid,side,fromhn,tohn,zip\n7,E,100,200,02139\n7,O,101,199,02139\n",
        );
        write(dir.path(), "edges.csv", "tlid,paflag,mtfcc\n7,P,S1400\n");

        let store = MemoryStore::load_from_dir(dir.path(), DEFAULT_KEY_LEN).unwrap();
        let key = phonetic::encode("Main Street", DEFAULT_KEY_LEN);

        let places = store
            .places_by_city_key(&phonetic::encode("Cambridge", DEFAULT_KEY_LEN))
            .await
            .unwrap();
        assert_eq!(places.len(), 1);

        let rows = store
            .candidates_by_name_zips_number(&key, &["02139".to_string()], 150)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].range.side, Side::Even);
        assert_eq!(geometry::decode(&rows[0].segment.geometry).unwrap().len(), 2);

        let primaries = store.primary_segments(&[7]).await.unwrap();
        assert_eq!(primaries[0].edge.mtfcc.as_deref(), Some("S1400"));
    }

    #[tokio::test]
    async fn test_load_keys_names_at_configured_length() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "features.csv",
            "tlid,name,name_key,zip,geometry\n7,Main Street,,02139,\"-71.10 42.36,-71.12 42.38\"\n",
        );
        write(dir.path(), "ranges.csv", "tlid,side,fromhn,tohn,zip\n7,E,100,200,02139\n");

        let store = MemoryStore::load_from_dir(dir.path(), 3).unwrap();
        assert_eq!(store.segments[0].name_key, phonetic::encode("Main Street", 3));

        let rows = store
            .candidates_by_name_number(&phonetic::encode("Main Street", 3), 150)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_ignores_ranges_on_the_other_side() {
        let store = MemoryStore::new()
            .with_segment(Segment {
                tlid: 7,
                name: "Main Street".to_string(),
                name_key: "MNSTR".to_string(),
                zip: "02139".to_string(),
                geometry: Vec::new(),
            })
            .with_range(AddressRange {
                tlid: 7,
                side: Side::Odd,
                fromhn: 101,
                tohn: 199,
                zip: "02139".to_string(),
            });

        let even = store
            .candidates_by_name_zips_number("MNSTR", &["02139".to_string()], 150)
            .await
            .unwrap();
        assert!(even.is_empty());
        let odd = store.candidates_by_name_number("MNSTR", 151).await.unwrap();
        assert_eq!(odd.len(), 1);
    }

    #[test]
    fn test_missing_tables_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::load_from_dir(dir.path(), DEFAULT_KEY_LEN).unwrap();
        assert!(store.places.is_empty());
        assert!(store.segments.is_empty());
    }

    #[test]
    fn test_bad_geometry_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "features.csv",
            "tlid,name,name_key,zip,geometry\n7,Main Street,,02139,nowhere\n",
        );
        assert!(MemoryStore::load_from_dir(dir.path(), DEFAULT_KEY_LEN).is_err());
    }
}
