//! Road distance resolution.
//!
//! ```text
//! Waypoint ──► RateLimiter ──► RouteProvider (Google / OSRM)
//!                                  │ no route / unusable
//!                                  ▼
//!                              Estimator (air × factor)
//! ```

pub mod estimate;
pub mod limiter;
pub mod provider;
pub mod resolver;

pub use estimate::Estimator;
pub use limiter::{Clock, RateLimiter, SystemClock};
pub use provider::{GoogleDistanceMatrix, OsrmRouter, RawRoute, RouteProvider, Waypoint};
pub use resolver::{DistanceResolver, RoadDistance};
