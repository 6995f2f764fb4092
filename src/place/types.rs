//! Core types for the place-identity subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A provider-issued canonical reference to a real-world place, cached by slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceIdentity {
    pub place_id: String,
    /// Canonical name as returned by the provider.
    pub name: String,
    #[serde(default)]
    pub address: String,
    /// The text query that produced this identity.
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
}

/// One text-search hit. Only the first hit of a search is ever used.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceCandidate {
    pub place_id: String,
    pub name: String,
    pub address: String,
}

impl PlaceCandidate {
    pub fn into_identity(self, query: &str) -> PlaceIdentity {
        PlaceIdentity {
            place_id: self.place_id,
            name: self.name,
            address: self.address,
            query: Some(query.to_string()),
            resolved_at: Some(Utc::now()),
        }
    }
}

/// How the text-search query is phrased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFormat {
    pub country: String,
    pub district_label: String,
}

impl Default for QueryFormat {
    fn default() -> Self {
        Self {
            country: "Slovensko".into(),
            district_label: "okres".into(),
        }
    }
}

impl QueryFormat {
    /// `"<name>, <label> <district>, <country>"` when the district is known
    /// and differs from the name, else `"<name>, <country>"`.
    pub fn query(&self, name: &str, district: Option<&str>) -> String {
        let name = name.trim();
        match district.map(str::trim).filter(|d| !d.is_empty()) {
            Some(d) if !d.eq_ignore_ascii_case(name) && d != name => {
                format!("{}, {} {}, {}", name, self.district_label, d, self.country)
            }
            _ => format!("{}, {}", name, self.country),
        }
    }
}
