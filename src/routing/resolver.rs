//! Distance resolver: throttled routing calls with the estimator as fallback.

use super::estimate::Estimator;
use super::limiter::RateLimiter;
use super::provider::{RouteProvider, Waypoint};
use crate::error::{PipelineError, Result};
use crate::pair::{Measurement, Provenance};
use std::rc::Rc;

/// A routed distance in stored units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadDistance {
    pub distance_km: f64,
    pub duration_min: u32,
}

impl From<RoadDistance> for Measurement {
    fn from(road: RoadDistance) -> Self {
        Measurement {
            road_km: road.distance_km,
            minutes: road.duration_min,
            provenance: Provenance::Resolved,
        }
    }
}

pub struct DistanceResolver {
    router: Box<dyn RouteProvider>,
    limiter: Rc<RateLimiter>,
    estimator: Estimator,
}

impl DistanceResolver {
    pub fn new(router: Box<dyn RouteProvider>, limiter: Rc<RateLimiter>, estimator: Estimator) -> Self {
        Self {
            router,
            limiter,
            estimator,
        }
    }

    /// One routing call. `Ok(None)` when the provider found no route;
    /// never retries.
    pub fn road_distance(&self, from: &Waypoint, to: &Waypoint) -> Result<Option<RoadDistance>> {
        self.limiter.acquire();
        let route = self.router.route(from, to).map_err(PipelineError::Provider)?;
        Ok(route.map(|r| RoadDistance {
            distance_km: r.distance_km(),
            duration_min: r.duration_min(),
        }))
    }

    /// Route between two waypoints, or estimate from `air_km` when either
    /// endpoint is missing or the provider found no route. Provider errors,
    /// including a rejected request, come back as `Err` so the pair stays
    /// pending.
    pub fn measure(
        &self,
        from: Option<&Waypoint>,
        to: Option<&Waypoint>,
        air_km: f64,
    ) -> Result<Measurement> {
        let (Some(from), Some(to)) = (from, to) else {
            tracing::warn!(air_km, "endpoint unresolved, estimating");
            return Ok(self.estimator.estimate(air_km));
        };

        match self.road_distance(from, to) {
            Ok(Some(road)) => Ok(road.into()),
            Ok(None) => {
                tracing::warn!(%from, %to, air_km, "no route, estimating");
                Ok(self.estimator.estimate(air_km))
            }
            Err(e) => Err(e),
        }
    }

    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{StubAnswer, StubRouter};
    use super::*;
    use crate::error::ProviderError;
    use crate::geo::Coordinates;
    use crate::routing::provider::RawRoute;

    fn resolver(stub: &StubRouter) -> (DistanceResolver, Rc<RateLimiter>) {
        let limiter = Rc::new(RateLimiter::unlimited());
        (
            DistanceResolver::new(Box::new(stub.clone()), limiter.clone(), Estimator::default()),
            limiter,
        )
    }

    fn coords(lat: f64, lon: f64) -> Waypoint {
        Waypoint::Coordinates(Coordinates::new(lat, lon))
    }

    #[test]
    fn test_routed_distance_is_rounded() {
        let stub = StubRouter::answering(StubAnswer::Route {
            meters: 12_649.0,
            seconds: 1_030.0,
        });
        let (resolver, limiter) = resolver(&stub);
        let road = resolver
            .road_distance(&coords(48.5, 19.1), &coords(48.6, 19.2))
            .unwrap()
            .unwrap();
        assert_eq!(road.distance_km, 12.6);
        assert_eq!(road.duration_min, 17);
        assert_eq!(limiter.calls(), 1);
    }

    #[test]
    fn test_no_route_falls_back_to_estimate() {
        let stub = StubRouter::answering(StubAnswer::NoRoute);
        let (resolver, _) = resolver(&stub);
        let m = resolver
            .measure(Some(&coords(48.5, 19.1)), Some(&coords(48.6, 19.2)), 9.8)
            .unwrap();
        assert_eq!(m.provenance, Provenance::EstimatedFallback);
        assert_eq!(m.road_km, 19.6);
    }

    #[test]
    fn test_missing_endpoint_skips_the_provider() {
        let stub = StubRouter::default();
        let (resolver, limiter) = resolver(&stub);
        let place = Waypoint::Place("ID-A".into());
        let m = resolver.measure(Some(&place), None, 4.0).unwrap();
        assert_eq!(m.provenance, Provenance::EstimatedFallback);
        assert_eq!(stub.calls(), 0);
        assert_eq!(limiter.calls(), 0);
    }

    #[test]
    fn test_transient_failure_propagates() {
        let stub = StubRouter::answering(StubAnswer::Transient);
        let (resolver, _) = resolver(&stub);
        let err = resolver
            .measure(Some(&coords(48.5, 19.1)), Some(&coords(48.6, 19.2)), 3.0)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Provider(ref e) if e.is_transient()));
    }

    struct Unsupported;

    impl RouteProvider for Unsupported {
        fn route(&self, _: &Waypoint, _: &Waypoint) -> std::result::Result<Option<RawRoute>, ProviderError> {
            Err(ProviderError::Unsupported("place waypoints".into()))
        }
    }

    #[test]
    fn test_unsupported_waypoint_is_an_error() {
        let resolver = DistanceResolver::new(
            Box::new(Unsupported),
            Rc::new(RateLimiter::unlimited()),
            Estimator::default(),
        );
        let place = Waypoint::Place("ID".into());
        let err = resolver.measure(Some(&place), Some(&place), 2.0).unwrap_err();
        assert!(matches!(err, PipelineError::Provider(ProviderError::Unsupported(_))));
    }

    #[test]
    fn test_rejected_request_is_not_estimated() {
        let stub = StubRouter::answering(StubAnswer::Rejected);
        let (resolver, limiter) = resolver(&stub);
        let err = resolver
            .measure(Some(&coords(48.5, 19.1)), Some(&coords(48.6, 19.2)), 3.0)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Provider(ProviderError::Rejected(_))));
        assert_eq!(limiter.calls(), 1);
    }
}
