//! The geocode operation: retrieve, merge, score, select, interpolate, finalize.

use std::sync::Arc;
use std::time::Instant;

use hashbrown::HashMap;
use rayon::prelude::*;
use tracing::{debug, warn};

use super::join::{distinct, distinct_by, group_ranges, join_places, join_primary_segments};
use super::range::{fraction, side_ranges};
use super::score::score;
use super::select::select_best;
use crate::config::MatchingConfig;
use crate::error::Result;
use crate::geometry;
use crate::models::{AddressRange, Candidate, MatchRow, Query};
use crate::phonetic;
use crate::store::{Datastore, Retriever};

/// Address geocoder over a datastore collaborator.
#[derive(Clone)]
pub struct Geocoder {
    store: Arc<dyn Datastore>,
    settings: MatchingConfig,
}

/// Interpolated `(lon, lat)` of `number` along the row's segment.
fn locate(
    row: &MatchRow,
    ranges: &HashMap<i64, Vec<AddressRange>>,
    number: i64,
) -> Result<(f64, f64)> {
    let segment_ranges = ranges.get(&row.tlid).map(Vec::as_slice).unwrap_or(&[]);
    let side = side_ranges(segment_ranges, row.side);
    let fraction = fraction(number, &side);

    let points = geometry::decode(&row.geometry).inspect_err(|e| {
        warn!("Segment {}: {}", row.tlid, e);
    })?;
    let point = geometry::point_at(&points, fraction)?;
    Ok((point.x, point.y))
}

impl Geocoder {
    pub fn new(store: Arc<dyn Datastore>, settings: MatchingConfig) -> Self {
        Self { store, settings }
    }

    /// Map `f` over rows, fanning out over rayon for large inputs. Output order
    /// always matches input order.
    fn map_rows<T, F>(&self, rows: &[MatchRow], f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&MatchRow) -> T + Sync + Send,
    {
        if rows.len() >= self.settings.parallel_threshold {
            rows.par_iter().map(f).collect()
        } else {
            rows.iter().map(f).collect()
        }
    }

    /// Geocode `query` into its best-scoring candidates.
    ///
    /// A query that matches nothing returns an empty vector. A malformed or
    /// degenerate geometry on any selected segment fails the whole call.
    pub async fn geocode(&self, query: &Query) -> Result<Vec<Candidate>> {
        let started = Instant::now();
        let (name, number) = query.validate()?;
        let key_len = self.settings.phonetic_len;
        let name_key = phonetic::encode(name, key_len);
        let city_key = query
            .city()
            .map(|city| phonetic::encode(city, key_len))
            .filter(|key| !key.is_empty());
        let retriever = Retriever::new(self.store.as_ref());

        let places = retriever.places(query.zip(), city_key.as_deref()).await?;
        let zips = Retriever::zips_of(&places);

        let found = retriever.candidates(&name_key, &zips, number).await?;
        if found.is_empty() {
            debug!("No match for '{}' #{}", name, number);
            return Ok(Vec::new());
        }

        let rows = join_places(found.into_iter().map(MatchRow::from).collect(), &places);

        let scores = self.map_rows(&rows, |row| score(query, row, number));
        let scored: Vec<MatchRow> = rows
            .into_iter()
            .zip(scores)
            .map(|(row, score)| MatchRow { score, ..row })
            .collect();
        let considered = scored.len();
        let best = select_best(scored);
        debug!(
            "Kept {} of {} candidates at score {:.4}",
            best.len(),
            considered,
            best.first().map(|r| r.score).unwrap_or_default()
        );

        let tlids = distinct(best.iter().map(|r| r.tlid));
        let primaries = retriever.primary_segments(&tlids).await?;
        let rows = join_primary_segments(best, &primaries);
        let ranges = group_ranges(retriever.all_ranges(&tlids).await?);

        let points = self
            .map_rows(&rows, |row| locate(row, &ranges, number))
            .into_iter()
            .collect::<Result<Vec<_>>>()?;
        let located: Vec<MatchRow> = rows
            .into_iter()
            .zip(points)
            .map(|(row, (lon, lat))| MatchRow {
                lon: Some(lon),
                lat: Some(lat),
                number: Some(number),
                ..row
            })
            .collect();

        let zips = distinct(located.iter().map(|r| r.zip.clone()));
        let primary_places = retriever.primary_places(&zips).await?;
        // place fan-out can leave rows that differ only in stripped fields
        let results = distinct_by(
            join_places(located, &primary_places)
                .into_iter()
                .filter_map(Candidate::from_row),
            Candidate::key,
        );

        debug!(
            "Geocoded '{}' #{} into {} result(s) in {:?}",
            name,
            number,
            results.len(),
            started.elapsed()
        );
        Ok(results)
    }
}
