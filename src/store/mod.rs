//! Datastore collaborator contract and the layered retrieval built on it.

pub mod memory;
pub mod scylla;

use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::{StoreBackend, StoreConfig};
use crate::error::Result;
use crate::matching::join::distinct;
use crate::models::{AddressRange, Place, PrimarySegment, SegmentRange};

pub use memory::MemoryStore;
pub use scylla::ScyllaStore;

/// Read-only queries against the reference dataset.
#[async_trait]
pub trait Datastore: Send + Sync {
    async fn places_by_zip(&self, zip: &str) -> Result<Vec<Place>>;

    async fn places_by_city_key(&self, city_key: &str) -> Result<Vec<Place>>;

    /// Segments named `name_key` in one of `zips`, joined with each range of
    /// the same tlid and zip on `number`'s side that brackets it.
    async fn candidates_by_name_zips_number(
        &self,
        name_key: &str,
        zips: &[String],
        number: i64,
    ) -> Result<Vec<SegmentRange>>;

    /// Same as [`Datastore::candidates_by_name_zips_number`] without the zip filter.
    async fn candidates_by_name_number(
        &self,
        name_key: &str,
        number: i64,
    ) -> Result<Vec<SegmentRange>>;

    async fn primary_segments(&self, tlids: &[i64]) -> Result<Vec<PrimarySegment>>;

    async fn all_ranges(&self, tlids: &[i64]) -> Result<Vec<AddressRange>>;

    async fn primary_places(&self, zips: &[String]) -> Result<Vec<Place>>;
}

/// Open the configured datastore backend.
///
/// `key_len` is the phonetic key length queries are encoded with. The CSV
/// backend keys names it loads without one at that length; the Scylla
/// backend serves whatever keys were stored.
pub async fn connect(config: &StoreConfig, key_len: usize) -> AnyResult<Arc<dyn Datastore>> {
    match config.backend {
        StoreBackend::Csv => {
            let store = MemoryStore::load_from_dir(&config.data_dir, key_len)?;
            Ok(Arc::new(store))
        }
        StoreBackend::Scylla => {
            let store = ScyllaStore::new(&config.scylla_url, &config.keyspace).await?;
            Ok(Arc::new(store))
        }
    }
}

/// Layered candidate retrieval over a [`Datastore`].
///
/// Enforces the primary-flag filters and deduplication regardless of how
/// strictly the backend applies them.
pub struct Retriever<'a> {
    store: &'a dyn Datastore,
}

impl<'a> Retriever<'a> {
    pub fn new(store: &'a dyn Datastore) -> Self {
        Self { store }
    }

    /// Union of places matching the zip and the city key, zip matches first.
    /// A place found by both lookups appears once.
    pub async fn places(&self, zip: Option<&str>, city_key: Option<&str>) -> Result<Vec<Place>> {
        let by_zip = async {
            match zip {
                Some(zip) => self.store.places_by_zip(zip).await,
                None => Ok(Vec::new()),
            }
        };
        let by_city = async {
            match city_key {
                Some(key) => self.store.places_by_city_key(key).await,
                None => Ok(Vec::new()),
            }
        };
        let (by_zip, by_city) = futures::future::try_join(by_zip, by_city).await?;
        debug!(
            "Places: {} by zip, {} by city key",
            by_zip.len(),
            by_city.len()
        );
        Ok(distinct(by_zip.into_iter().chain(by_city)))
    }

    /// Name lookup restricted to `zips`, falling back to the unrestricted
    /// lookup when that finds nothing.
    pub async fn candidates(
        &self,
        name_key: &str,
        zips: &[String],
        number: i64,
    ) -> Result<Vec<SegmentRange>> {
        let rows = if zips.is_empty() {
            Vec::new()
        } else {
            self.store
                .candidates_by_name_zips_number(name_key, zips, number)
                .await?
        };
        if !rows.is_empty() {
            debug!("{} candidates for '{}' in {:?}", rows.len(), name_key, zips);
            return Ok(rows);
        }

        info!(
            "No candidates for '{}' #{} within {} zip(s), retrying without zip filter",
            name_key,
            number,
            zips.len()
        );
        let rows = self
            .store
            .candidates_by_name_number(name_key, number)
            .await?;
        debug!("{} fallback candidates for '{}'", rows.len(), name_key);
        Ok(rows)
    }

    /// Primary segment/edge rows, one per TLID.
    pub async fn primary_segments(&self, tlids: &[i64]) -> Result<Vec<PrimarySegment>> {
        if tlids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self.store.primary_segments(tlids).await?;
        let fetched = rows.len();
        let mut seen = hashbrown::HashSet::new();
        let rows: Vec<PrimarySegment> = rows
            .into_iter()
            .filter(|p| p.edge.is_primary() && seen.insert(p.segment.tlid))
            .collect();
        debug!("{} primary segments ({} before dedup)", rows.len(), fetched);
        Ok(rows)
    }

    pub async fn all_ranges(&self, tlids: &[i64]) -> Result<Vec<AddressRange>> {
        if tlids.is_empty() {
            return Ok(Vec::new());
        }
        let ranges = self.store.all_ranges(tlids).await?;
        debug!("{} ranges for {} segment(s)", ranges.len(), tlids.len());
        Ok(ranges)
    }

    pub async fn primary_places(&self, zips: &[String]) -> Result<Vec<Place>> {
        if zips.is_empty() {
            return Ok(Vec::new());
        }
        let places: Vec<Place> = self
            .store
            .primary_places(zips)
            .await?
            .into_iter()
            .filter(Place::is_primary)
            .collect();
        debug!("{} primary places", places.len());
        Ok(places)
    }

    /// Distinct zips of `places`, first-seen order.
    pub fn zips_of(places: &[Place]) -> Vec<String> {
        distinct(places.iter().map(|p| p.zip.clone()))
    }
}
