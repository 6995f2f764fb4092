//! Place-identity subsystem.
//!
//! Maps a (name, district) pair to a provider-issued place identifier,
//! with a persistent slug-keyed cache in front of the provider.

pub mod cache;
pub mod provider;
pub mod resolver;
pub mod types;

pub use cache::{PlaceCache, PLACE_CACHE_FILE};
pub use provider::{Geocoder, GooglePlacesGeocoder};
pub use resolver::{PlaceResolver, Refresh};
pub use types::{PlaceCandidate, PlaceIdentity, QueryFormat};
