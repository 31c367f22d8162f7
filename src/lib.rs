//! route-enricher core
//!
//! Resumable enrichment of aggregated route records with road geometry from
//! an OSRM routing service. Fetched paths are simplified, cached on disk and
//! written back into the record store; runs can be interrupted and resumed.

pub mod cache;
pub mod error;
pub mod fetcher;
pub mod osrm;
pub mod pipeline;
pub mod polyline;
pub mod progress;
pub mod report;
pub mod route;
pub mod simplify;
pub mod storage;
pub mod store;
pub mod traits;
