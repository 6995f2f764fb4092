//! Geocoding providers: the text-search seam and its Google Places client.

use super::types::PlaceCandidate;
use crate::error::ProviderError;
use crate::http;
use serde::Deserialize;
use std::time::Duration;

/// Free-text place search. `Ok(vec![])` means the provider answered with no
/// match; `Err` is reserved for transport and protocol failures.
pub trait Geocoder {
    fn text_search(&self, query: &str) -> Result<Vec<PlaceCandidate>, ProviderError>;
}

// ─── Google Places text search ──────────────────────────────────

#[derive(Deserialize, Debug)]
struct TextSearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<TextSearchResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize, Debug)]
struct TextSearchResult {
    place_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    formatted_address: String,
}

pub struct GooglePlacesGeocoder {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    language: String,
}

impl GooglePlacesGeocoder {
    pub fn new(base_url: &str, api_key: &str, language: &str, timeout: Duration) -> Self {
        Self {
            agent: http::agent(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            language: language.to_string(),
        }
    }
}

impl Geocoder for GooglePlacesGeocoder {
    fn text_search(&self, query: &str) -> Result<Vec<PlaceCandidate>, ProviderError> {
        let url = format!("{}/place/textsearch/json", self.base_url);
        let response: TextSearchResponse = self
            .agent
            .get(&url)
            .query("query", query)
            .query("language", &self.language)
            .query("key", &self.api_key)
            .call()?
            .into_json()
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        match response.status.as_str() {
            "OK" => Ok(response
                .results
                .into_iter()
                .map(|r| PlaceCandidate {
                    place_id: r.place_id,
                    name: r.name,
                    address: r.formatted_address,
                })
                .collect()),
            "OVER_QUERY_LIMIT" => Err(ProviderError::RateLimited),
            "REQUEST_DENIED" => Err(ProviderError::Rejected(
                response.error_message.unwrap_or_else(|| "REQUEST_DENIED".into()),
            )),
            "UNKNOWN_ERROR" => Err(ProviderError::Network(
                response.error_message.unwrap_or_else(|| "UNKNOWN_ERROR".into()),
            )),
            other => {
                tracing::debug!(
                    status = other,
                    message = response.error_message.as_deref().unwrap_or(""),
                    query,
                    "text search returned no usable result"
                );
                Ok(Vec::new())
            }
        }
    }
}
