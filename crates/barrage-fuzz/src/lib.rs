//! # barrage-fuzz
//!
//! The anomaly engine: collects valid leaf values from template
//! submissions, drives the external byte-mutation tool over them,
//! carries the static catalogue of hostile payloads, and injects
//! anomalies at every position of a submission tree.

pub mod catalogue;
pub mod collector;
pub mod injector;
pub mod mutator;

pub use collector::{collect_values, ValueBuckets};
pub use injector::{derive, AnomalyMap};
pub use mutator::{FuzzSets, Mutator};
