//! Listing pipeline for a government surplus and auction directory.
//!
//! Raw listings come in from every registered source, get an asset type
//! from the keyword classifier, and are served as lifecycle-sliced,
//! visitor-filtered views grouped by country and sub-region.

pub mod catalog;
pub mod circuit_breaker;
pub mod classifier;
pub mod config;
pub mod filter;
pub mod grouping;
pub mod metrics;
pub mod models;
pub mod refresher;
pub mod sources;
pub mod view_cache;
