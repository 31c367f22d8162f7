//! OSRM HTTP adapter for three-point route geometries.

use std::time::Duration;

use serde::Deserialize;

use crate::error::FetchError;
use crate::polyline::Polyline;
use crate::route::FetchResult;
use crate::traits::RouteTransport;

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://router.project-osrm.org".to_string(),
            profile: "driving".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OsrmConfig {
        &self.config
    }

    fn route_url(&self, waypoints: &[(f64, f64)]) -> String {
        let coords = waypoints
            .iter()
            .map(|(lon, lat)| format!("{:.6},{:.6}", lon, lat))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/route/v1/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            coords
        )
    }
}

impl RouteTransport for OsrmClient {
    fn route(&self, waypoints: &[(f64, f64)]) -> Result<FetchResult, FetchError> {
        let response = self
            .client
            .get(self.route_url(waypoints))
            .query(&[("overview", "full"), ("geometries", "geojson")])
            .send()
            .map_err(classify)?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.json::<OsrmRouteResponse>().map_err(classify)?;
        body.into_fetch_result()
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if let Some(status) = err.status() {
        FetchError::Status(status.as_u16())
    } else if err.is_decode() {
        FetchError::Decode(err.to_string())
    } else {
        FetchError::Transport(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: Option<String>,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    /// Meters.
    distance: f64,
    /// Seconds.
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<(f64, f64)>,
}

impl OsrmRouteResponse {
    fn into_fetch_result(self) -> Result<FetchResult, FetchError> {
        let Some(route) = self.routes.into_iter().next() else {
            let reason = self
                .message
                .or(self.code)
                .unwrap_or_else(|| "empty routes".to_string());
            return Err(FetchError::NoRoute(reason));
        };

        Ok(FetchResult {
            path: Polyline::new(route.geometry.coordinates),
            distance_km: route.distance / 1000.0,
            duration_hours: route.duration / 3600.0,
        })
    }
}
