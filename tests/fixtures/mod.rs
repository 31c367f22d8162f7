//! Test fixtures for route-enricher.
//!
//! Provides:
//! - Real West African city coordinates
//! - A builder for hierarchical route stores
//! - A scripted OSRM stand-in that records every request

#![allow(dead_code)]

pub mod west_africa_cities;

use std::cell::RefCell;
use std::path::Path;
use std::time::Duration;

use route_enricher::error::FetchError;
use route_enricher::fetcher::{RetryPolicy, RouteFetcher};
use route_enricher::pipeline::{CancellationFlag, Pipeline, PipelineOptions, StoragePaths};
use route_enricher::polyline::Polyline;
use route_enricher::route::{DEFAULT_PRECISION, FetchResult, route_id};
use route_enricher::store::{Endpoint, RecordStore, RouteRecord, ViaCity};
use route_enricher::traits::RouteTransport;

pub use west_africa_cities::*;

/// Points generated per leg of a mocked road path.
const POINTS_PER_LEG: usize = 40;

// ============================================================================
// Route stores
// ============================================================================

/// A record from `source` to `destination`, optionally through `via`.
pub fn record(source: City, via: Option<City>, destination: City, flow: u64) -> RouteRecord {
    let endpoint = |city: City| Endpoint {
        name: Some(city.name.to_string()),
        coordinates: city.coords(),
        extra: Default::default(),
    };
    RouteRecord {
        source: endpoint(source),
        destination: endpoint(destination),
        via_city: Some(ViaCity {
            name: via.map(|city| city.name.to_string()),
            coordinates: via.map(|city| (Some(city.lon), Some(city.lat))),
            extra: Default::default(),
        }),
        flow: Some(flow),
        path: None,
        distance_km: None,
        duration_hours: None,
        extra: Default::default(),
    }
}

/// The store key upstream would give this record.
pub fn key_of(record: &RouteRecord) -> String {
    record.route_id(DEFAULT_PRECISION)
}

/// Builds a store from `(year, record)` pairs keyed by their route ids.
pub fn store_of(records: Vec<(&str, RouteRecord)>) -> RecordStore {
    let mut store = RecordStore::new();
    for (year, record) in records {
        let key = key_of(&record);
        store.insert(year, key, record);
    }
    store
}

/// Id of the route `source → via → destination` at default precision.
pub fn id_of(source: City, via: Option<City>, destination: City) -> String {
    route_id(
        source.coords(),
        destination.coords(),
        via.map(|city| city.name),
        DEFAULT_PRECISION,
    )
}

// ============================================================================
// Routing service
// ============================================================================

/// OSRM stand-in. Answers every request with a wiggly road through the
/// three waypoints unless the waypoint is scripted to time out.
#[derive(Default)]
pub struct MockOsrm {
    timing_out: Vec<(f64, f64)>,
    cancel_after: Option<(usize, CancellationFlag)>,
    panic_at: Option<usize>,
    calls: RefCell<Vec<Vec<(f64, f64)>>>,
}

impl MockOsrm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request through `via` times out.
    pub fn timing_out_at(mut self, via: City) -> Self {
        self.timing_out.push(via.coords());
        self
    }

    /// Raises `flag` while serving the `n`th request.
    pub fn cancel_after(mut self, n: usize, flag: &CancellationFlag) -> Self {
        self.cancel_after = Some((n, flag.clone()));
        self
    }

    /// Panics while serving the `n`th request.
    pub fn panic_at(mut self, n: usize) -> Self {
        self.panic_at = Some(n);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// Requests whose waypoint was `via`.
    pub fn calls_through(&self, via: City) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|waypoints| waypoints.get(1) == Some(&via.coords()))
            .count()
    }
}

impl RouteTransport for MockOsrm {
    fn route(&self, waypoints: &[(f64, f64)]) -> Result<FetchResult, FetchError> {
        self.calls.borrow_mut().push(waypoints.to_vec());
        if let Some((n, flag)) = &self.cancel_after {
            if self.call_count() == *n {
                flag.cancel();
            }
        }

        if self.panic_at == Some(self.call_count()) {
            panic!("routing service crashed");
        }

        if waypoints.get(1).is_some_and(|via| self.timing_out.contains(via)) {
            return Err(FetchError::Timeout);
        }
        Ok(road_through(waypoints))
    }
}

/// A road that zigzags gently between consecutive waypoints.
pub fn road_through(waypoints: &[(f64, f64)]) -> FetchResult {
    let mut points = Vec::new();
    for leg in waypoints.windows(2) {
        let (from, to) = (leg[0], leg[1]);
        for step in 0..POINTS_PER_LEG {
            let t = step as f64 / POINTS_PER_LEG as f64;
            let wiggle = if step % 2 == 0 { 0.0 } else { 0.0004 };
            points.push((
                from.0 + (to.0 - from.0) * t + wiggle,
                from.1 + (to.1 - from.1) * t,
            ));
        }
    }
    if let Some(&last) = waypoints.last() {
        points.push(last);
    }

    FetchResult {
        path: Polyline::new(points),
        distance_km: 100.0 * waypoints.len() as f64,
        duration_hours: 2.0 * waypoints.len() as f64,
    }
}

// ============================================================================
// Pipelines
// ============================================================================

/// Options that keep tests fast and quiet.
pub fn quiet_options() -> PipelineOptions {
    PipelineOptions {
        request_interval: Duration::ZERO,
        show_progress: false,
        ..PipelineOptions::default()
    }
}

/// Artifacts inside `dir`.
pub fn paths_in(dir: &Path) -> StoragePaths {
    StoragePaths::for_store(&dir.join("food_flows_by_year.json"))
}

pub fn open_pipeline(
    paths: &StoragePaths,
    osrm: MockOsrm,
    options: PipelineOptions,
) -> Pipeline<RouteFetcher<MockOsrm>> {
    let fetcher = RouteFetcher::new(
        osrm,
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
        },
    );
    Pipeline::open(fetcher, paths, options).expect("valid options")
}
