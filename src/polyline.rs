//! Polyline representation for route geometries.
//!
//! Points are stored in GeoJSON order, `(longitude, latitude)`, which is what
//! OSRM returns with `geometries=geojson` and what the record store persists.
//! On the wire a polyline is a bare array of `[lon, lat]` pairs.

use serde::{Deserialize, Serialize};

use crate::simplify::simplify;

/// A polyline representing a route geometry as decoded coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polyline {
    points: Vec<(f64, f64)>,
}

impl Polyline {
    /// Creates a new Polyline from `(lon, lat)` points.
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    /// Returns a reference to the coordinate points.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Consumes the polyline and returns the owned coordinate points.
    pub fn into_points(self) -> Vec<(f64, f64)> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Douglas–Peucker reduction of this polyline within `epsilon` degrees.
    pub fn simplify(&self, epsilon: f64) -> Polyline {
        Polyline::new(simplify(&self.points, epsilon))
    }
}

impl From<Vec<(f64, f64)>> for Polyline {
    fn from(points: Vec<(f64, f64)>) -> Self {
        Self::new(points)
    }
}
