//! Hierarchical `year → route_id → route record` store.
//!
//! The store is produced by the aggregation step upstream and handed to the
//! pipeline as a JSON document. Only the fields the pipeline needs are typed;
//! everything else in a record is carried through untouched. The pipeline
//! patches `path`, `distance_km` and `duration_hours` on existing records and
//! never adds or removes routes.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cache::RouteCache;
use crate::error::StorageError;
use crate::polyline::Polyline;
use crate::route::{CacheEntry, RouteTask, route_id};
use crate::storage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `(lon, lat)`.
    pub coordinates: (f64, f64),
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Intermediate city a route passes through.
///
/// Upstream writes `{"name": null, "coordinates": null}` for direct routes
/// and `[null, null]` coordinates for cities it could not locate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViaCity {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub coordinates: Option<(Option<f64>, Option<f64>)>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ViaCity {
    /// The waypoint as `(lon, lat)` when both coordinates are known.
    pub fn point(&self) -> Option<(f64, f64)> {
        match self.coordinates {
            Some((Some(lon), Some(lat))) => Some((lon, lat)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub source: Endpoint,
    pub destination: Endpoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via_city: Option<ViaCity>,
    /// Number of flows aggregated into this record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Polyline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_hours: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RouteRecord {
    pub fn via_name(&self) -> Option<&str> {
        self.via_city.as_ref().and_then(|via| via.name.as_deref())
    }

    pub fn via_point(&self) -> Option<(f64, f64)> {
        self.via_city.as_ref().and_then(ViaCity::point)
    }

    /// Re-derives the route id from the record's coordinates and waypoint.
    pub fn route_id(&self, precision: u32) -> String {
        route_id(
            self.source.coordinates,
            self.destination.coordinates,
            self.via_name(),
            precision,
        )
    }

    pub fn has_path(&self) -> bool {
        self.path.as_ref().is_some_and(|path| !path.is_empty())
    }

    pub fn apply(&mut self, entry: &CacheEntry) {
        self.path = Some(entry.path.clone());
        self.distance_km = Some(entry.distance_km);
        self.duration_hours = Some(entry.duration_hours);
    }

    /// The record's own path as a cache entry, if it has one.
    pub fn cached_form(&self) -> Option<CacheEntry> {
        if !self.has_path() {
            return None;
        }
        Some(CacheEntry {
            path: self.path.clone().unwrap_or_default(),
            distance_km: self.distance_km.unwrap_or(0.0),
            duration_hours: self.duration_hours.unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordStore {
    years: BTreeMap<String, BTreeMap<String, RouteRecord>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a store document. Unlike the cache, a missing store is an error.
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        storage::read_json(path)?.ok_or_else(|| StorageError::Read {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, "record store not found"),
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        storage::write_json(path, self)
    }

    /// Adds a record. Used by whoever builds the store; the pipeline itself
    /// only patches existing records.
    pub fn insert(&mut self, year: impl Into<String>, key: impl Into<String>, record: RouteRecord) {
        self.years
            .entry(year.into())
            .or_default()
            .insert(key.into(), record);
    }

    pub fn get(&self, year: &str, key: &str) -> Option<&RouteRecord> {
        self.years.get(year).and_then(|routes| routes.get(key))
    }

    pub fn years(&self) -> impl Iterator<Item = &str> {
        self.years.keys().map(String::as_str)
    }

    /// All records as `(year, key, record)`, years ascending.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &RouteRecord)> {
        self.years.iter().flat_map(|(year, routes)| {
            routes
                .iter()
                .map(move |(key, record)| (year.as_str(), key.as_str(), record))
        })
    }

    pub fn route_count(&self) -> usize {
        self.years.values().map(BTreeMap::len).sum()
    }

    pub fn routes_with_paths(&self) -> usize {
        self.iter().filter(|(_, _, record)| record.has_path()).count()
    }

    /// Flattens the store into one task per distinct route id.
    ///
    /// Records that share an id across years collapse into a single task whose
    /// weight is the summed `flow` and whose years list every year it appears
    /// in. Tasks come out in order of first appearance.
    pub fn tasks(&self, precision: u32) -> Vec<RouteTask> {
        struct Pending {
            task: RouteTask,
            weight: u64,
            years: Vec<String>,
        }

        let mut index: HashMap<String, usize> = HashMap::new();
        let mut pending: Vec<Pending> = Vec::new();

        for (year, _, record) in self.iter() {
            let id = record.route_id(precision);
            let weight = record.flow.unwrap_or(0);

            if let Some(&slot) = index.get(&id) {
                let entry = &mut pending[slot];
                entry.weight += weight;
                if !entry.years.iter().any(|y| y == year) {
                    entry.years.push(year.to_string());
                }
                continue;
            }

            index.insert(id, pending.len());
            pending.push(Pending {
                task: RouteTask::new(
                    record.source.coordinates,
                    record.via_name(),
                    record.via_point(),
                    record.destination.coordinates,
                    precision,
                ),
                weight,
                years: vec![year.to_string()],
            });
        }

        pending
            .into_iter()
            .map(|p| p.task.with_weight(p.weight).with_years(p.years))
            .collect()
    }

    /// Paths the store already carries, keyed by route id. The first record
    /// seen for an id wins.
    pub fn existing_paths(&self, precision: u32) -> Vec<(String, CacheEntry)> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut found = Vec::new();
        for (_, _, record) in self.iter() {
            let Some(entry) = record.cached_form() else {
                continue;
            };
            let id = record.route_id(precision);
            if seen.insert(id.clone()) {
                found.push((id, entry));
            }
        }
        found
    }

    /// Patches one existing record. Returns `false` if it does not exist.
    pub fn apply(&mut self, year: &str, key: &str, entry: &CacheEntry) -> bool {
        match self.years.get_mut(year).and_then(|routes| routes.get_mut(key)) {
            Some(record) => {
                record.apply(entry);
                true
            }
            None => false,
        }
    }

    /// Patches the task's record in every year it appears in.
    pub fn apply_task(&mut self, task: &RouteTask, entry: &CacheEntry) -> usize {
        task.years()
            .iter()
            .filter(|year| self.apply(year, task.id(), entry))
            .count()
    }

    /// Patches every record whose re-derived route id has a cache entry.
    /// Returns the number of records patched.
    pub fn merge_cache(&mut self, cache: &RouteCache, precision: u32) -> usize {
        let mut patched = 0;
        for routes in self.years.values_mut() {
            for record in routes.values_mut() {
                if let Some(entry) = cache.get(&record.route_id(precision)) {
                    record.apply(entry);
                    patched += 1;
                }
            }
        }
        patched
    }
}
