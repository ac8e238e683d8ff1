//! # barrage-engine
//!
//! The response classifier and the scenario pipeline driver that
//! composes collection, mutation, injection, probing, heartbeats,
//! classification, and archival into one run.

pub mod classify;
pub mod pipeline;

pub use classify::Classifier;
pub use pipeline::Pipeline;
