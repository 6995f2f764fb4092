//! Place-identity resolver: query building, cache short-circuit, and the
//! explicit re-resolution used by verification.
//!
//! Flow:  cache → throttled text search → first hit cached under the slug.
//! Qualifying the query with the district is what keeps two same-named
//! municipalities from resolving to the same place.

use super::cache::PlaceCache;
use super::provider::Geocoder;
use super::types::{PlaceIdentity, QueryFormat};
use crate::error::{PipelineError, Result};
use crate::routing::RateLimiter;
use std::rc::Rc;

/// Outcome of an explicit re-resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Refresh {
    /// The provider confirmed the cached identifier (or nothing was cached).
    Unchanged(PlaceIdentity),
    /// The provider returned a different identifier; the cache entry was replaced.
    Replaced {
        previous: PlaceIdentity,
        current: PlaceIdentity,
    },
    /// The provider found nothing; the cache was left untouched.
    Unresolved,
}

pub struct PlaceResolver {
    geocoder: Box<dyn Geocoder>,
    cache: PlaceCache,
    limiter: Rc<RateLimiter>,
    format: QueryFormat,
}

impl PlaceResolver {
    pub fn new(
        geocoder: Box<dyn Geocoder>,
        cache: PlaceCache,
        limiter: Rc<RateLimiter>,
        format: QueryFormat,
    ) -> Self {
        Self {
            geocoder,
            cache,
            limiter,
            format,
        }
    }

    pub fn query_for(&self, name: &str, district: Option<&str>) -> String {
        self.format.query(name, district)
    }

    pub fn cached(&self, slug: &str) -> Option<&PlaceIdentity> {
        self.cache.get(slug)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Resolve a place, cache-first. `Ok(None)` means the provider had no
    /// answer and the caller should estimate; `Err` is a transient failure.
    pub fn resolve(
        &mut self,
        name: &str,
        district: Option<&str>,
        slug: &str,
    ) -> Result<Option<PlaceIdentity>> {
        if let Some(hit) = self.cache.get(slug) {
            tracing::debug!(slug, place_id = %hit.place_id, "place cache hit");
            return Ok(Some(hit.clone()));
        }

        let Some(found) = self.search(name, district)? else {
            return Ok(None);
        };
        self.cache.insert_new(slug, found.clone())?;
        Ok(Some(found))
    }

    /// Query the provider regardless of the cache and overwrite the entry if
    /// the identifier changed. Only the verification pass calls this.
    pub fn re_resolve(&mut self, name: &str, district: Option<&str>, slug: &str) -> Result<Refresh> {
        let Some(found) = self.search(name, district)? else {
            return Ok(Refresh::Unresolved);
        };

        match self.cache.get(slug).cloned() {
            Some(previous) if previous.place_id == found.place_id => Ok(Refresh::Unchanged(previous)),
            Some(previous) => {
                tracing::info!(
                    slug,
                    from = %previous.name,
                    to = %found.name,
                    query = found.query.as_deref().unwrap_or(""),
                    "place identity replaced"
                );
                self.cache.replace(slug, found.clone())?;
                Ok(Refresh::Replaced {
                    previous,
                    current: found,
                })
            }
            None => {
                self.cache.insert_new(slug, found.clone())?;
                Ok(Refresh::Unchanged(found))
            }
        }
    }

    fn search(&self, name: &str, district: Option<&str>) -> Result<Option<PlaceIdentity>> {
        let query = self.format.query(name, district);
        self.limiter.acquire();
        let candidates = self
            .geocoder
            .text_search(&query)
            .map_err(PipelineError::Provider)?;

        match candidates.into_iter().next() {
            Some(first) => {
                tracing::debug!(%query, place_id = %first.place_id, "place resolved");
                Ok(Some(first.into_identity(&query)))
            }
            None => {
                tracing::warn!(%query, "no place found");
                Ok(None)
            }
        }
    }
}

impl Refresh {
    pub fn identity(&self) -> Option<&PlaceIdentity> {
        match self {
            Self::Unchanged(identity) => Some(identity),
            Self::Replaced { current, .. } => Some(current),
            Self::Unresolved => None,
        }
    }
}
