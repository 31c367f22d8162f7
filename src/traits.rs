//! Seams between the pipeline and the routing service.
//!
//! The pipeline only sees [`RouteSource`]. The retrying fetcher implements it
//! on top of a [`RouteTransport`], which performs exactly one request per
//! call. Tests plug scripted transports in at either level.

use crate::error::FetchError;
use crate::route::FetchResult;

/// Performs a single routing request through an ordered list of waypoints.
///
/// Waypoints are `(lon, lat)`. Implementations must not retry; retry policy
/// belongs to the caller.
pub trait RouteTransport {
    fn route(&self, waypoints: &[(f64, f64)]) -> Result<FetchResult, FetchError>;
}

/// Resolves a three-point route to a road path, or `None` when the service
/// cannot provide one.
pub trait RouteSource {
    fn fetch(
        &self,
        source: (f64, f64),
        via: (f64, f64),
        destination: (f64, f64),
    ) -> Option<FetchResult>;
}
