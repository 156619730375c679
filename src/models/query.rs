//! Geocoding query input.

use serde::{Deserialize, Serialize};

use crate::error::{GeocodeError, Result};

/// House number as it arrives from callers: JSON integer or free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HouseNumber {
    Int(i64),
    Text(String),
}

impl HouseNumber {
    fn is_blank(&self) -> bool {
        matches!(self, HouseNumber::Text(s) if s.trim().is_empty())
    }

    /// Parse into an integer, failing fast on anything non-numeric.
    pub fn value(&self) -> Result<i64> {
        match self {
            HouseNumber::Int(n) => Ok(*n),
            HouseNumber::Text(s) => s.trim().parse::<i64>().map_err(|_| {
                GeocodeError::InvalidQuery(format!("house number '{}' is not an integer", s))
            }),
        }
    }
}

impl From<i64> for HouseNumber {
    fn from(n: i64) -> Self {
        HouseNumber::Int(n)
    }
}

impl From<i32> for HouseNumber {
    fn from(n: i32) -> Self {
        HouseNumber::Int(i64::from(n))
    }
}

impl From<&str> for HouseNumber {
    fn from(s: &str) -> Self {
        HouseNumber::Text(s.to_string())
    }
}

/// Free-form address query. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Street name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<HouseNumber>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Query {
    pub fn new(name: &str, number: impl Into<HouseNumber>) -> Self {
        Self {
            name: Some(name.to_string()),
            number: Some(number.into()),
            ..Default::default()
        }
    }

    pub fn with_zip(mut self, zip: &str) -> Self {
        self.zip = Some(zip.to_string());
        self
    }

    pub fn with_city(mut self, city: &str) -> Self {
        self.city = Some(city.to_string());
        self
    }

    pub fn zip(&self) -> Option<&str> {
        non_empty(&self.zip)
    }

    pub fn city(&self) -> Option<&str> {
        non_empty(&self.city)
    }

    pub fn name(&self) -> Option<&str> {
        non_empty(&self.name)
    }

    fn has_number(&self) -> bool {
        self.number.as_ref().is_some_and(|n| !n.is_blank())
    }

    /// Number of non-empty fields, `number` included.
    pub fn field_count(&self) -> usize {
        [
            self.zip().is_some(),
            self.city().is_some(),
            self.name().is_some(),
            self.has_number(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }

    /// Check the query is matchable and return `(street name, house number)`.
    pub fn validate(&self) -> Result<(&str, i64)> {
        let name = self
            .name()
            .ok_or_else(|| GeocodeError::InvalidQuery("street name is required".to_string()))?;
        let number = match &self.number {
            Some(n) if !n.is_blank() => n.value()?,
            _ => {
                return Err(GeocodeError::InvalidQuery(
                    "house number is required".to_string(),
                ))
            }
        };
        Ok((name, number))
    }
}
