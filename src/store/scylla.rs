use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::response::query_result::QueryResult;
use std::sync::Arc;
use tracing::{info, warn};

use super::Datastore;
use crate::error::{GeocodeError, Result};
use crate::models::{AddressRange, EdgeRecord, Place, PrimarySegment, Segment, SegmentRange, Side};

type PlaceRow = (String, String, Option<String>, Option<String>, Option<String>);
type FeatureRow = (i64, String, String, String, Vec<u8>);
type RangeRow = (i64, String, i64, i64, String);

/// `?, ?, ?` for an IN clause of `n` values.
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn place_from_row((zip, city, state, city_key, paflag): PlaceRow) -> Place {
    Place {
        zip,
        city,
        state,
        city_key: city_key.unwrap_or_default(),
        paflag,
    }
}

fn segment_from_row((tlid, name, name_key, zip, geometry): FeatureRow) -> Segment {
    Segment {
        tlid,
        name,
        name_key,
        zip,
        geometry,
    }
}

/// ScyllaDB-backed reference dataset.
#[derive(Clone)]
pub struct ScyllaStore {
    session: Arc<Session>,
    keyspace: String,
}

impl ScyllaStore {
    pub async fn new(uri: &str, keyspace: &str) -> AnyResult<Self> {
        info!("Connecting to ScyllaDB at {}...", uri);
        let session: Session = SessionBuilder::new()
            .known_node(uri)
            .build()
            .await
            .context("Failed to connect to ScyllaDB")?;

        let store = Self {
            session: Arc::new(session),
            keyspace: keyspace.to_string(),
        };

        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> AnyResult<()> {
        let ks = &self.keyspace;
        let statements = [
            format!(
                "CREATE KEYSPACE IF NOT EXISTS {ks}
                 WITH REPLICATION = {{
                    'class' : 'SimpleStrategy',
                    'replication_factor' : 1
                 }}"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {ks}.places (
                    zip text, city text, state text, city_key text, paflag text,
                    PRIMARY KEY (zip, city)
                )"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {ks}.places_by_city_key (
                    city_key text, zip text, city text, state text, paflag text,
                    PRIMARY KEY (city_key, zip, city)
                )"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {ks}.features (
                    tlid bigint PRIMARY KEY,
                    name text, name_key text, zip text, geometry blob
                )"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {ks}.features_by_name_key (
                    name_key text, zip text, tlid bigint, name text, geometry blob,
                    PRIMARY KEY (name_key, zip, tlid)
                )"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {ks}.ranges (
                    tlid bigint, side text, fromhn bigint, tohn bigint, zip text,
                    PRIMARY KEY (tlid, side, fromhn, tohn, zip)
                )"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {ks}.edges (
                    tlid bigint, paflag text, mtfcc text,
                    PRIMARY KEY (tlid, paflag)
                )"
            ),
        ];

        for statement in statements {
            self.session.query_unpaged(statement, &[]).await?;
        }

        Ok(())
    }

    async fn select_places(
        &self,
        table: &str,
        column: &str,
        values: &[String],
    ) -> AnyResult<Vec<Place>> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT zip, city, state, city_key, paflag FROM {}.{} WHERE {} IN ({})",
            self.keyspace,
            table,
            column,
            placeholders(values.len())
        );
        let result: QueryResult = self.session.query_unpaged(query, values).await?;

        let mut places = Vec::new();
        if let Ok(rows_result) = result.into_rows_result() {
            for row in rows_result.rows::<PlaceRow>()? {
                places.push(place_from_row(row?));
            }
        }
        Ok(places)
    }

    async fn select_features(
        &self,
        name_key: &str,
        zips: Option<&[String]>,
    ) -> AnyResult<Vec<Segment>> {
        let mut values = vec![name_key.to_string()];
        let query = match zips {
            Some(zips) => {
                values.extend(zips.iter().cloned());
                format!(
                    "SELECT tlid, name, name_key, zip, geometry FROM {}.features_by_name_key
                     WHERE name_key = ? AND zip IN ({})",
                    self.keyspace,
                    placeholders(zips.len())
                )
            }
            None => format!(
                "SELECT tlid, name, name_key, zip, geometry FROM {}.features_by_name_key
                 WHERE name_key = ?",
                self.keyspace
            ),
        };
        let result = self.session.query_unpaged(query, values).await?;

        let mut segments = Vec::new();
        if let Ok(rows_result) = result.into_rows_result() {
            for row in rows_result.rows::<FeatureRow>()? {
                segments.push(segment_from_row(row?));
            }
        }
        Ok(segments)
    }

    async fn select_ranges(&self, tlids: &[i64]) -> AnyResult<Vec<AddressRange>> {
        if tlids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT tlid, side, fromhn, tohn, zip FROM {}.ranges WHERE tlid IN ({})",
            self.keyspace,
            placeholders(tlids.len())
        );
        let result = self.session.query_unpaged(query, tlids).await?;

        let mut ranges = Vec::new();
        if let Ok(rows_result) = result.into_rows_result() {
            for row in rows_result.rows::<RangeRow>()? {
                let (tlid, side, fromhn, tohn, zip) = row?;
                match side.parse::<Side>() {
                    Ok(side) => ranges.push(AddressRange {
                        tlid,
                        side,
                        fromhn,
                        tohn,
                        zip,
                    }),
                    Err(e) => warn!("Skipping range on tlid {}: {}", tlid, e),
                }
            }
        }
        Ok(ranges)
    }

    async fn select_primary_segments(&self, tlids: &[i64]) -> AnyResult<Vec<PrimarySegment>> {
        if tlids.is_empty() {
            return Ok(Vec::new());
        }
        let edge_query = format!(
            "SELECT tlid, paflag, mtfcc FROM {}.edges WHERE tlid IN ({})",
            self.keyspace,
            placeholders(tlids.len())
        );
        let result = self.session.query_unpaged(edge_query, tlids).await?;

        let mut edges = hashbrown::HashMap::new();
        if let Ok(rows_result) = result.into_rows_result() {
            for row in rows_result.rows::<(i64, String, Option<String>)>()? {
                let (tlid, paflag, mtfcc) = row?;
                let edge = EdgeRecord { tlid, paflag, mtfcc };
                if edge.is_primary() {
                    edges.entry(tlid).or_insert(edge);
                }
            }
        }
        if edges.is_empty() {
            return Ok(Vec::new());
        }

        let primary_tlids: Vec<i64> = edges.keys().copied().collect();
        let feature_query = format!(
            "SELECT tlid, name, name_key, zip, geometry FROM {}.features WHERE tlid IN ({})",
            self.keyspace,
            placeholders(primary_tlids.len())
        );
        let result = self
            .session
            .query_unpaged(feature_query, primary_tlids)
            .await?;

        let mut rows = Vec::new();
        if let Ok(rows_result) = result.into_rows_result() {
            for row in rows_result.rows::<FeatureRow>()? {
                let segment = segment_from_row(row?);
                if let Some(edge) = edges.get(&segment.tlid) {
                    rows.push(PrimarySegment {
                        edge: edge.clone(),
                        segment,
                    });
                }
            }
        }
        Ok(rows)
    }

    async fn joined_candidates(
        &self,
        name_key: &str,
        zips: Option<&[String]>,
        number: i64,
    ) -> AnyResult<Vec<SegmentRange>> {
        let segments = self.select_features(name_key, zips).await?;
        let tlids: Vec<i64> = segments.iter().map(|s| s.tlid).collect();
        let ranges = self.select_ranges(&tlids).await?;

        let mut rows = Vec::new();
        for segment in &segments {
            for range in ranges
                .iter()
                .filter(|r| {
                    r.tlid == segment.tlid && r.zip == segment.zip && r.serves(number)
                })
            {
                rows.push(SegmentRange {
                    segment: segment.clone(),
                    range: range.clone(),
                });
            }
        }
        Ok(rows)
    }
}

#[async_trait]
impl Datastore for ScyllaStore {
    async fn places_by_zip(&self, zip: &str) -> Result<Vec<Place>> {
        self.select_places("places", "zip", &[zip.to_string()])
            .await
            .map_err(GeocodeError::retrieval)
    }

    async fn places_by_city_key(&self, city_key: &str) -> Result<Vec<Place>> {
        self.select_places("places_by_city_key", "city_key", &[city_key.to_string()])
            .await
            .map_err(GeocodeError::retrieval)
    }

    async fn candidates_by_name_zips_number(
        &self,
        name_key: &str,
        zips: &[String],
        number: i64,
    ) -> Result<Vec<SegmentRange>> {
        if zips.is_empty() {
            return Ok(Vec::new());
        }
        self.joined_candidates(name_key, Some(zips), number)
            .await
            .map_err(GeocodeError::retrieval)
    }

    async fn candidates_by_name_number(
        &self,
        name_key: &str,
        number: i64,
    ) -> Result<Vec<SegmentRange>> {
        self.joined_candidates(name_key, None, number)
            .await
            .map_err(GeocodeError::retrieval)
    }

    async fn primary_segments(&self, tlids: &[i64]) -> Result<Vec<PrimarySegment>> {
        self.select_primary_segments(tlids)
            .await
            .map_err(GeocodeError::retrieval)
    }

    async fn all_ranges(&self, tlids: &[i64]) -> Result<Vec<AddressRange>> {
        self.select_ranges(tlids)
            .await
            .map_err(GeocodeError::retrieval)
    }

    async fn primary_places(&self, zips: &[String]) -> Result<Vec<Place>> {
        let places = self
            .select_places("places", "zip", zips)
            .await
            .map_err(GeocodeError::retrieval)?;
        Ok(places.into_iter().filter(Place::is_primary).collect())
    }
}
