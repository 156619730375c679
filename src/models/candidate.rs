//! Working match rows and the public geocoding result.

use serde::{Deserialize, Serialize};

use super::record::{EdgeRecord, Place, PrimarySegment, SegmentRange, Side};

/// A candidate as it moves through the pipeline.
///
/// Carries the segment/range bookkeeping needed for interpolation. Joins
/// produce new rows instead of mutating existing ones.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRow {
    pub tlid: i64,
    pub name: String,
    pub name_key: String,
    pub zip: String,
    pub geometry: Vec<u8>,
    pub side: Side,
    pub fromhn: i64,
    pub tohn: i64,
    pub city: Option<String>,
    pub state: Option<String>,
    pub city_key: Option<String>,
    pub paflag: Option<String>,
    pub mtfcc: Option<String>,
    pub score: f64,
    pub number: Option<i64>,
    pub lon: Option<f64>,
    pub lat: Option<f64>,
}

impl From<SegmentRange> for MatchRow {
    fn from(row: SegmentRange) -> Self {
        let SegmentRange { segment, range } = row;
        Self {
            tlid: segment.tlid,
            name: segment.name,
            name_key: segment.name_key,
            zip: segment.zip,
            geometry: segment.geometry,
            side: range.side,
            fromhn: range.fromhn,
            tohn: range.tohn,
            city: None,
            state: None,
            city_key: None,
            paflag: None,
            mtfcc: None,
            score: 0.0,
            number: None,
            lon: None,
            lat: None,
        }
    }
}

impl MatchRow {
    /// Copy of this row with place attributes laid over it.
    pub fn with_place(&self, place: &Place) -> Self {
        Self {
            zip: place.zip.clone(),
            city: Some(place.city.clone()),
            state: place.state.clone().or_else(|| self.state.clone()),
            city_key: Some(place.city_key.clone()),
            paflag: place.paflag.clone(),
            ..self.clone()
        }
    }

    /// Copy of this row with primary segment and edge attributes laid over it.
    pub fn with_primary(&self, primary: &PrimarySegment) -> Self {
        let PrimarySegment { segment, edge } = primary;
        let EdgeRecord { paflag, mtfcc, .. } = edge;
        Self {
            name: segment.name.clone(),
            name_key: segment.name_key.clone(),
            geometry: segment.geometry.clone(),
            paflag: Some(paflag.clone()),
            mtfcc: mtfcc.clone().or_else(|| self.mtfcc.clone()),
            ..self.clone()
        }
    }
}

/// Geocoded result returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub zip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Street name
    pub name: String,
    pub lon: f64,
    pub lat: f64,
    pub number: i64,
    /// Similarity to the query in [0, 1]
    pub score: f64,
    /// Feature class of the matched segment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_class: Option<String>,
}

/// Hashable identity of a [`Candidate`]: every field, floats by bit pattern.
pub type CandidateKey = (
    String,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    i64,
    [u64; 3],
);

impl Candidate {
    pub fn key(&self) -> CandidateKey {
        (
            self.zip.clone(),
            self.city.clone(),
            self.state.clone(),
            self.name.clone(),
            self.feature_class.clone(),
            self.number,
            [self.lon.to_bits(), self.lat.to_bits(), self.score.to_bits()],
        )
    }

    /// Strip bookkeeping from an interpolated row. `None` if the row was never
    /// positioned.
    pub fn from_row(row: MatchRow) -> Option<Self> {
        Some(Self {
            lon: row.lon?,
            lat: row.lat?,
            number: row.number?,
            zip: row.zip,
            city: row.city,
            state: row.state,
            name: row.name,
            score: row.score,
            feature_class: row.mtfcc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::{AddressRange, Segment};

    fn sample_row() -> MatchRow {
        MatchRow::from(SegmentRange {
            segment: Segment {
                tlid: 7,
                name: "Main St".to_string(),
                name_key: "MNST".to_string(),
                zip: "02139".to_string(),
                geometry: vec![0; 16],
            },
            range: AddressRange {
                tlid: 7,
                side: Side::Even,
                fromhn: 100,
                tohn: 200,
                zip: "02139".to_string(),
            },
        })
    }

    #[test]
    fn test_with_place_overrides_city() {
        let place = Place {
            zip: "02139".to_string(),
            city: "Cambridge".to_string(),
            state: Some("MA".to_string()),
            city_key: "KMBRJ".to_string(),
            paflag: Some("P".to_string()),
        };
        let row = sample_row().with_place(&place);
        assert_eq!(row.city.as_deref(), Some("Cambridge"));
        assert_eq!(row.state.as_deref(), Some("MA"));
        assert_eq!(row.tlid, 7);
    }

    #[test]
    fn test_key_separates_any_differing_field() {
        let mut row = sample_row();
        row.lon = Some(-71.1);
        row.lat = Some(42.3);
        row.number = Some(150);
        let a = Candidate::from_row(row).unwrap();
        let b = Candidate {
            lat: 42.300001,
            ..a.clone()
        };
        assert_eq!(a.key(), a.clone().key());
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_unpositioned_row_is_not_a_candidate() {
        assert!(Candidate::from_row(sample_row()).is_none());

        let mut row = sample_row();
        row.lon = Some(-71.1);
        row.lat = Some(42.3);
        row.number = Some(150);
        let candidate = Candidate::from_row(row).unwrap();
        assert_eq!(candidate.number, 150);
        assert_eq!(candidate.name, "Main St");
    }
}
