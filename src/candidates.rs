//! Candidate selection: the `k` nearest eligible hubs by air distance.
//!
//! `k` is deliberately generous (default 10) because road distance can
//! reorder hubs relative to air distance, e.g. across a mountain pass.

use crate::geo::haversine_km;
use crate::registry::{CityHub, Municipality};
use std::cmp::Ordering;

pub const DEFAULT_CANDIDATES: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<'a> {
    pub hub: &'a CityHub,
    /// Unrounded great-circle distance in km.
    pub air_km: f64,
}

/// Rank eligible hubs by air distance from the municipality, nearest first.
///
/// Pure: no I/O, no logging. Ties are broken by hub slug so the ranking is
/// stable regardless of input order.
pub fn nearest<'a>(municipality: &Municipality, hubs: &'a [CityHub], k: usize) -> Vec<Candidate<'a>> {
    let mut ranked: Vec<Candidate<'a>> = hubs
        .iter()
        .filter(|hub| hub.is_eligible())
        .filter_map(|hub| {
            hub.coords.map(|coords| Candidate {
                hub,
                air_km: haversine_km(municipality.coords, coords),
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.air_km
            .partial_cmp(&b.air_km)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.hub.slug.cmp(&b.hub.slug))
    });
    ranked.truncate(k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinates;

    fn hub(slug: &str, lat: f64, lon: f64, services: usize) -> CityHub {
        CityHub {
            slug: slug.into(),
            name: slug.into(),
            district: None,
            coords: Some(Coordinates::new(lat, lon)),
            services,
        }
    }

    fn hostice() -> Municipality {
        Municipality {
            slug: "hostice-zvolen".into(),
            name: "Hostice".into(),
            district: Some("Zvolen".into()),
            region: None,
            coords: Coordinates::new(48.60, 19.10),
            disambiguated: true,
        }
    }

    #[test]
    fn test_sorted_ascending_and_truncated() {
        let hubs = vec![
            hub("kosice", 48.7164, 21.2611, 3),
            hub("zvolen", 48.5744, 19.1236, 5),
            hub("banska-bystrica", 48.7360, 19.1461, 9),
        ];
        let out = nearest(&hostice(), &hubs, 2);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].hub.slug, "zvolen");
        assert_eq!(out[1].hub.slug, "banska-bystrica");
        assert!(out[0].air_km <= out[1].air_km);
    }

    #[test]
    fn test_excludes_hubs_without_services_or_coords() {
        let mut no_coords = hub("detva", 48.56, 19.42, 2);
        no_coords.coords = None;
        let hubs = vec![hub("zvolen", 48.5744, 19.1236, 0), no_coords, hub("kosice", 48.7164, 21.2611, 1)];
        let out = nearest(&hostice(), &hubs, DEFAULT_CANDIDATES);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].hub.slug, "kosice");
    }

    #[test]
    fn test_fewer_hubs_than_k() {
        let hubs = vec![hub("zvolen", 48.5744, 19.1236, 1)];
        assert_eq!(nearest(&hostice(), &hubs, 10).len(), 1);
        assert!(nearest(&hostice(), &[], 10).is_empty());
    }

    #[test]
    fn test_tie_broken_by_slug() {
        let hubs = vec![hub("b-hub", 48.7, 19.1, 1), hub("a-hub", 48.7, 19.1, 1)];
        let out = nearest(&hostice(), &hubs, 2);
        assert_eq!(out[0].hub.slug, "a-hub");
    }
}
