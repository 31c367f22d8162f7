//! Route enrichment tasks and fetched route paths.

use serde::{Deserialize, Serialize};

use crate::polyline::Polyline;

/// Waypoint label used in route ids when a route has no intermediate city.
pub const DIRECT: &str = "direct";

/// Default number of decimals coordinates are rounded to for route ids
/// (one decimal ≈ 11 km).
pub const DEFAULT_PRECISION: u32 = 1;

/// One source → waypoint → destination triple that needs a road path.
///
/// Coordinates are `(lon, lat)`. The id is derived from the rounded
/// coordinates and the waypoint name, so the same route built twice (or in
/// two different runs) lands on the same cache key.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteTask {
    id: String,
    source: (f64, f64),
    via: Option<(f64, f64)>,
    via_name: Option<String>,
    destination: (f64, f64),
    weight: u64,
    years: Vec<String>,
}

impl RouteTask {
    pub fn new(
        source: (f64, f64),
        via_name: Option<&str>,
        via: Option<(f64, f64)>,
        destination: (f64, f64),
        precision: u32,
    ) -> Self {
        Self {
            id: route_id(source, destination, via_name, precision),
            source,
            via,
            via_name: via_name.map(str::to_string),
            destination,
            weight: 0,
            years: Vec::new(),
        }
    }

    /// Sets the ranking weight (flow count) used for top-N selection.
    pub fn with_weight(mut self, weight: u64) -> Self {
        self.weight = weight;
        self
    }

    /// Sets the store years this route appears under.
    pub fn with_years(mut self, years: Vec<String>) -> Self {
        self.years = years;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> (f64, f64) {
        self.source
    }

    pub fn via(&self) -> Option<(f64, f64)> {
        self.via
    }

    pub fn via_name(&self) -> Option<&str> {
        self.via_name.as_deref()
    }

    pub fn destination(&self) -> (f64, f64) {
        self.destination
    }

    pub fn weight(&self) -> u64 {
        self.weight
    }

    pub fn years(&self) -> &[String] {
        &self.years
    }
}

/// A road path returned by the routing service.
///
/// The same shape is persisted in the route cache, normally after the path
/// has been simplified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    pub path: Polyline,
    pub distance_km: f64,
    pub duration_hours: f64,
}

/// Persisted form of a [`FetchResult`].
pub type CacheEntry = FetchResult;

impl FetchResult {
    /// Returns a copy with the path reduced by Douglas–Peucker.
    pub fn simplified(&self, epsilon: f64) -> FetchResult {
        FetchResult {
            path: self.path.simplify(epsilon),
            distance_km: self.distance_km,
            duration_hours: self.duration_hours,
        }
    }
}

/// Builds the route id `r_{src_lon}_{src_lat}_{dst_lon}_{dst_lat}_{via}`.
///
/// Coordinates are rounded to `precision` decimals and printed in shortest
/// form with at least one fractional digit, so `36.0` stays `36.0`.
pub fn route_id(
    source: (f64, f64),
    destination: (f64, f64),
    via_name: Option<&str>,
    precision: u32,
) -> String {
    format!(
        "r_{}_{}_{}_{}_{}",
        format_rounded(source.0, precision),
        format_rounded(source.1, precision),
        format_rounded(destination.0, precision),
        format_rounded(destination.1, precision),
        via_name.unwrap_or(DIRECT),
    )
}

fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

fn format_rounded(value: f64, precision: u32) -> String {
    let rounded = round_to(value, precision);
    let mut text = rounded.to_string();
    if rounded.is_finite() && !text.contains('.') {
        text.push_str(".0");
    }
    text
}
