//! Source records and registry entities.

use crate::geo::Coordinates;
use serde::{Deserialize, Serialize};

/// One row of the municipality dataset. The upstream file stores latitude
/// in `x` and longitude in `y`.
#[derive(Debug, Clone, Deserialize)]
pub struct MunicipalityRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default, alias = "x")]
    pub latitude: Option<f64>,
    #[serde(default, alias = "y")]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub taxi_services: Vec<serde_json::Value>,
    #[serde(default)]
    pub service_count: Option<usize>,
}

impl HubRecord {
    pub fn services(&self) -> usize {
        self.service_count.unwrap_or(self.taxi_services.len())
    }
}

/// The hub file wraps its records in a `cities` array.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct HubFile {
    #[serde(default)]
    pub cities: Vec<HubRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Municipality {
    pub slug: String,
    pub name: String,
    pub district: Option<String>,
    pub region: Option<String>,
    pub coords: Coordinates,
    /// The plain name slug was shared with another municipality.
    pub disambiguated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityHub {
    pub slug: String,
    pub name: String,
    pub district: Option<String>,
    pub coords: Option<Coordinates>,
    pub services: usize,
}

impl CityHub {
    /// Hubs without services or coordinates never become candidates.
    pub fn is_eligible(&self) -> bool {
        self.services > 0 && self.coords.is_some_and(|c| c.is_valid())
    }
}

/// The name and district used to build a place-identity query for a slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub slug: String,
    pub name: String,
    pub district: Option<String>,
}
