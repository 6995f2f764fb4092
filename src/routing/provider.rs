//! Routing providers: Google Distance Matrix and OSRM.

use crate::error::ProviderError;
use crate::geo::{meters_to_km, seconds_to_minutes, Coordinates};
use crate::http;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// One end of a route request.
#[derive(Debug, Clone, PartialEq)]
pub enum Waypoint {
    /// Raw coordinates: cheap to obtain, coarser.
    Coordinates(Coordinates),
    /// A resolved place identifier: authoritative.
    Place(String),
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coordinates(c) => write!(f, "{},{}", c.lat, c.lon),
            Self::Place(id) => write!(f, "place_id:{}", id),
        }
    }
}

/// A driving route as reported by the provider, in provider units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawRoute {
    pub meters: f64,
    pub seconds: f64,
}

impl RawRoute {
    pub fn distance_km(&self) -> f64 {
        meters_to_km(self.meters)
    }

    pub fn duration_min(&self) -> u32 {
        seconds_to_minutes(self.seconds)
    }
}

/// Driving distance between two waypoints. `Ok(None)` means the provider
/// answered but found no route (a non-OK element status); the caller
/// estimates instead.
pub trait RouteProvider {
    fn route(&self, from: &Waypoint, to: &Waypoint) -> Result<Option<RawRoute>, ProviderError>;
}

// ─── Google Distance Matrix ─────────────────────────────────────

#[derive(Deserialize, Debug)]
struct MatrixResponse {
    status: String,
    #[serde(default)]
    rows: Vec<MatrixRow>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize, Debug)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Deserialize, Debug)]
struct MatrixElement {
    status: String,
    #[serde(default)]
    distance: Option<MatrixValue>,
    #[serde(default)]
    duration: Option<MatrixValue>,
}

#[derive(Deserialize, Debug)]
struct MatrixValue {
    value: f64,
}

pub struct GoogleDistanceMatrix {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    language: String,
}

impl GoogleDistanceMatrix {
    pub fn new(base_url: &str, api_key: &str, language: &str, timeout: Duration) -> Self {
        Self {
            agent: http::agent(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            language: language.to_string(),
        }
    }
}

impl RouteProvider for GoogleDistanceMatrix {
    fn route(&self, from: &Waypoint, to: &Waypoint) -> Result<Option<RawRoute>, ProviderError> {
        let url = format!("{}/distancematrix/json", self.base_url);
        let response: MatrixResponse = self
            .agent
            .get(&url)
            .query("origins", &from.to_string())
            .query("destinations", &to.to_string())
            .query("mode", "driving")
            .query("language", &self.language)
            .query("key", &self.api_key)
            .call()?
            .into_json()
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        match response.status.as_str() {
            "OK" => {}
            "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => return Err(ProviderError::RateLimited),
            "UNKNOWN_ERROR" => {
                return Err(ProviderError::Network(
                    response.error_message.unwrap_or_else(|| "UNKNOWN_ERROR".into()),
                ))
            }
            // REQUEST_DENIED, INVALID_REQUEST, MAX_ELEMENTS_EXCEEDED...: the whole
            // request was refused, which says nothing about the route.
            other => {
                return Err(ProviderError::Rejected(format!(
                    "{}: {}",
                    other,
                    response.error_message.unwrap_or_default()
                )))
            }
        }

        // The top-level OK says nothing about the element itself.
        let Some(element) = response.rows.into_iter().next().and_then(|r| r.elements.into_iter().next())
        else {
            return Err(ProviderError::InvalidResponse("empty distance matrix".into()));
        };

        if element.status != "OK" {
            tracing::debug!(%from, %to, status = %element.status, "no route between waypoints");
            return Ok(None);
        }

        match (element.distance, element.duration) {
            (Some(distance), Some(duration)) => Ok(Some(RawRoute {
                meters: distance.value,
                seconds: duration.value,
            })),
            _ => Err(ProviderError::InvalidResponse(
                "OK element without distance or duration".into(),
            )),
        }
    }
}

// ─── OSRM ───────────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize, Debug)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
}

/// OSRM routing; coordinates only.
pub struct OsrmRouter {
    agent: ureq::Agent,
    base_url: String,
}

impl OsrmRouter {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            agent: http::agent(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl RouteProvider for OsrmRouter {
    fn route(&self, from: &Waypoint, to: &Waypoint) -> Result<Option<RawRoute>, ProviderError> {
        let (Waypoint::Coordinates(a), Waypoint::Coordinates(b)) = (from, to) else {
            return Err(ProviderError::Unsupported(
                "OSRM routes between coordinates only".into(),
            ));
        };
        let url = format!(
            "{}/route/v1/driving/{},{};{},{}",
            self.base_url, a.lon, a.lat, b.lon, b.lat
        );

        let response = match self.agent.get(&url).query("overview", "false").call() {
            Ok(response) => response,
            // OSRM answers 400 with a JSON body for "NoRoute"/"NoSegment".
            Err(ureq::Error::Status(400, response)) => response,
            Err(e) => return Err(e.into()),
        };
        let body: OsrmResponse = response
            .into_json()
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        if body.code != "Ok" {
            tracing::debug!(%from, %to, code = %body.code, "no route between waypoints");
            return Ok(None);
        }
        Ok(body.routes.into_iter().next().map(|r| RawRoute {
            meters: r.distance,
            seconds: r.duration,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waypoint_formatting() {
        assert_eq!(Waypoint::Coordinates(Coordinates::new(48.5, 19.1)).to_string(), "48.5,19.1");
        assert_eq!(Waypoint::Place("ChIJ123".into()).to_string(), "place_id:ChIJ123");
    }

    #[test]
    fn test_raw_route_rounding() {
        let route = RawRoute { meters: 12_649.0, seconds: 1_030.0 };
        assert_eq!(route.distance_km(), 12.6);
        assert_eq!(route.duration_min(), 17);
    }

    #[test]
    fn test_osrm_rejects_place_waypoints() {
        let router = OsrmRouter::new("http://127.0.0.1:9", Duration::from_secs(1));
        let err = router
            .route(&Waypoint::Place("a".into()), &Waypoint::Place("b".into()))
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unsupported(_)));
    }
}
