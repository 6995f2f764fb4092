//! Place registry: the fixed universe of municipalities and service hubs.
//!
//! Loads both source datasets, drops unusable rows with a warning, and
//! assigns every entity a unique slug via the two-pass scheme in [`slug`].

pub mod slug;
pub mod types;

pub use slug::{assign_slugs, slugify, SlugAssignment, SlugInput};
pub use types::{CityHub, Endpoint, HubRecord, Municipality, MunicipalityRecord};

use crate::error::Result;
use crate::geo::Coordinates;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use types::HubFile;

#[derive(Debug, Clone, Default)]
pub struct PlaceRegistry {
    municipalities: Vec<Municipality>,
    hubs: Vec<CityHub>,
    municipality_index: HashMap<String, usize>,
    hub_index: HashMap<String, usize>,
}

impl PlaceRegistry {
    /// Read both source files and build the registry.
    pub fn load(municipalities_path: &Path, hubs_path: &Path) -> Result<Self> {
        let municipalities: Vec<MunicipalityRecord> =
            serde_json::from_str(&fs::read_to_string(municipalities_path)?)?;
        let hubs: HubFile = serde_json::from_str(&fs::read_to_string(hubs_path)?)?;
        Ok(Self::from_records(municipalities, hubs.cities))
    }

    pub fn from_records(municipalities: Vec<MunicipalityRecord>, hubs: Vec<HubRecord>) -> Self {
        let municipalities = build_municipalities(municipalities);
        let hubs = build_hubs(hubs);

        let municipality_index = municipalities
            .iter()
            .enumerate()
            .map(|(i, m)| (m.slug.clone(), i))
            .collect();
        let hub_index = hubs.iter().enumerate().map(|(i, h)| (h.slug.clone(), i)).collect();

        tracing::info!(
            municipalities = municipalities.len(),
            hubs = hubs.len(),
            eligible_hubs = hubs.iter().filter(|h| h.is_eligible()).count(),
            "place registry loaded"
        );

        Self {
            municipalities,
            hubs,
            municipality_index,
            hub_index,
        }
    }

    pub fn municipalities(&self) -> &[Municipality] {
        &self.municipalities
    }

    pub fn hubs(&self) -> &[CityHub] {
        &self.hubs
    }

    pub fn municipality(&self, slug: &str) -> Option<&Municipality> {
        self.municipality_index.get(slug).map(|&i| &self.municipalities[i])
    }

    pub fn hub(&self, slug: &str) -> Option<&CityHub> {
        self.hub_index.get(slug).map(|&i| &self.hubs[i])
    }

    /// Query endpoint for a slug. Hubs are searched by name alone and take
    /// precedence over a municipality with the same slug; municipalities
    /// carry their district.
    pub fn endpoint(&self, slug: &str) -> Option<Endpoint> {
        if let Some(h) = self.hub(slug) {
            return Some(Endpoint {
                slug: h.slug.clone(),
                name: h.name.clone(),
                district: None,
            });
        }
        self.municipality(slug).map(|m| Endpoint {
            slug: m.slug.clone(),
            name: m.name.clone(),
            district: m.district.clone(),
        })
    }

    /// True when the municipality's plain name slug is shared with another record.
    pub fn is_ambiguous(&self, slug: &str) -> bool {
        self.municipality(slug).is_some_and(|m| m.disambiguated)
    }
}

fn usable_name(name: Option<&String>) -> Option<&str> {
    name.map(|n| n.trim())
        .filter(|n| !n.is_empty() && !slugify(n).is_empty())
}

fn build_municipalities(records: Vec<MunicipalityRecord>) -> Vec<Municipality> {
    let mut kept = Vec::with_capacity(records.len());
    for (row, record) in records.into_iter().enumerate() {
        if usable_name(record.name.as_ref()).is_none() {
            tracing::warn!(row, "dropping municipality without a usable name");
            continue;
        }
        let coords = match (record.latitude, record.longitude) {
            (Some(lat), Some(lon)) if Coordinates::new(lat, lon).is_valid() => {
                Coordinates::new(lat, lon)
            }
            _ => {
                tracing::warn!(row, name = ?record.name, "dropping municipality without valid coordinates");
                continue;
            }
        };
        kept.push((record, coords));
    }

    let inputs: Vec<SlugInput<'_>> = kept
        .iter()
        .map(|(record, _)| SlugInput {
            name: record.name.as_deref().unwrap_or_default().trim(),
            base: None,
            district: record.district.as_deref(),
        })
        .collect();
    let slugs = assign_slugs(&inputs);

    kept.into_iter()
        .zip(slugs)
        .map(|((record, coords), assignment)| Municipality {
            slug: assignment.slug,
            name: record.name.unwrap_or_default().trim().to_string(),
            district: record.district.filter(|d| !d.trim().is_empty()),
            region: record.region,
            coords,
            disambiguated: assignment.disambiguated,
        })
        .collect()
}

fn build_hubs(records: Vec<HubRecord>) -> Vec<CityHub> {
    let kept: Vec<HubRecord> = records
        .into_iter()
        .enumerate()
        .filter_map(|(row, record)| {
            if usable_name(record.name.as_ref()).is_none() {
                tracing::warn!(row, "dropping hub without a usable name");
                None
            } else {
                Some(record)
            }
        })
        .collect();

    let inputs: Vec<SlugInput<'_>> = kept
        .iter()
        .map(|record| SlugInput {
            name: record.name.as_deref().unwrap_or_default().trim(),
            base: record.slug.as_deref(),
            district: record.district.as_deref(),
        })
        .collect();
    let slugs = assign_slugs(&inputs);

    kept.into_iter()
        .zip(slugs)
        .map(|(record, assignment)| {
            let services = record.services();
            let coords = match (record.latitude, record.longitude) {
                (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
                _ => None,
            };
            CityHub {
                slug: assignment.slug,
                name: record.name.unwrap_or_default().trim().to_string(),
                district: record.district,
                coords,
                services,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn muni(name: Option<&str>, district: &str, lat: f64, lon: f64) -> MunicipalityRecord {
        MunicipalityRecord {
            name: name.map(Into::into),
            district: Some(district.into()),
            region: Some("Banskobystrický kraj".into()),
            latitude: Some(lat),
            longitude: Some(lon),
        }
    }

    #[test]
    fn test_drops_nameless_and_coordless_records() {
        let mut no_coords = muni(Some("Dúbravy"), "Detva", 0.0, 0.0);
        no_coords.latitude = None;
        let registry = PlaceRegistry::from_records(
            vec![
                muni(Some("Hostice"), "Zvolen", 48.5, 19.1),
                muni(None, "Zvolen", 48.5, 19.1),
                muni(Some("   "), "Zvolen", 48.5, 19.1),
                no_coords,
            ],
            vec![],
        );
        assert_eq!(registry.municipalities().len(), 1);
        assert_eq!(registry.municipalities()[0].slug, "hostice");
    }

    #[test]
    fn test_hostice_scenario() {
        let registry = PlaceRegistry::from_records(
            vec![
                muni(Some("Hostice"), "Zvolen", 48.55, 19.15),
                muni(Some("Hostice"), "Košice", 48.70, 21.20),
                muni(Some("Zvolen"), "Zvolen", 48.57, 19.12),
            ],
            vec![],
        );
        let slugs: Vec<_> = registry.municipalities().iter().map(|m| m.slug.as_str()).collect();
        assert_eq!(slugs, vec!["hostice-zvolen", "hostice-kosice", "zvolen"]);
        assert!(registry.is_ambiguous("hostice-kosice"));
        assert!(!registry.is_ambiguous("zvolen"));

        let endpoint = registry.endpoint("hostice-kosice").unwrap();
        assert_eq!(endpoint.name, "Hostice");
        assert_eq!(endpoint.district.as_deref(), Some("Košice"));
    }

    #[test]
    fn test_hubs_use_given_slug_and_service_count() {
        let registry = PlaceRegistry::from_records(
            vec![],
            vec![
                HubRecord {
                    name: Some("Banská Bystrica".into()),
                    slug: Some("banska-bystrica".into()),
                    district: None,
                    latitude: Some(48.736),
                    longitude: Some(19.1461),
                    taxi_services: vec![serde_json::json!({"name": "Taxi BB"})],
                    service_count: None,
                },
                HubRecord {
                    name: Some("Detva".into()),
                    slug: None,
                    district: None,
                    latitude: None,
                    longitude: None,
                    taxi_services: vec![],
                    service_count: Some(2),
                },
            ],
        );
        let bb = registry.hub("banska-bystrica").unwrap();
        assert_eq!(bb.services, 1);
        assert!(bb.is_eligible());

        let detva = registry.hub("detva").unwrap();
        assert_eq!(detva.services, 2);
        assert!(!detva.is_eligible());
        assert_eq!(registry.endpoint("detva").unwrap().district, None);
    }

    #[test]
    fn test_hub_endpoint_wins_over_municipality_slug() {
        let registry = PlaceRegistry::from_records(
            vec![muni(Some("Zvolen"), "Zvolen", 48.57, 19.12)],
            vec![HubRecord {
                name: Some("Zvolen".into()),
                slug: Some("zvolen".into()),
                district: None,
                latitude: Some(48.5744),
                longitude: Some(19.1236),
                taxi_services: vec![],
                service_count: Some(3),
            }],
        );
        assert!(registry.municipality("zvolen").is_some());
        let endpoint = registry.endpoint("zvolen").unwrap();
        assert_eq!(endpoint.name, "Zvolen");
        assert_eq!(endpoint.district, None);
    }

    #[test]
    fn test_load_from_files() {
        let dir = TempDir::new().unwrap();
        let munis = dir.path().join("obce.json");
        let hubs = dir.path().join("cities.json");
        fs::write(
            &munis,
            r#"[
                {"name": "Hostice", "district": "Zvolen", "region": "BB", "x": 48.55, "y": 19.15},
                {"name": "Hostice", "district": "Košice", "region": "KE", "x": 48.70, "y": 21.20},
                {"district": "Nitra", "x": 48.3, "y": 18.1}
            ]"#,
        )
        .unwrap();
        fs::write(
            &hubs,
            r#"{"cities": [
                {"name": "Zvolen", "slug": "zvolen", "latitude": 48.5744, "longitude": 19.1236,
                 "taxiServices": [{"name": "A"}], "extra": true}
            ]}"#,
        )
        .unwrap();

        let registry = PlaceRegistry::load(&munis, &hubs).unwrap();
        let slugs: HashSet<_> = registry.municipalities().iter().map(|m| m.slug.clone()).collect();
        assert_eq!(slugs.len(), 2);
        assert!(slugs.contains("hostice-zvolen"));
        assert_eq!(registry.hubs().len(), 1);
    }
}
