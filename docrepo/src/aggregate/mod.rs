//! Aggregation pipelines.
//!
//! A [Pipeline] is an ordered list of stages (match, sort, group, project,
//! skip, limit). [Group] stages bucket documents by a key and fold each
//! bucket with [Accumulator]s.

mod pipeline;

pub use pipeline::*;
