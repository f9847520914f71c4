//! The multi-resolution code graph.
//!
//! `LazyGraph` owns every node and the file index for the life of the
//! process. Files are parsed on first access; parse output is persisted to
//! the content-addressed cache and hydrated back on later runs.

pub mod lazy;
pub mod queries;
pub mod resolver;
pub mod traversal;

pub use lazy::{GraphStats, LazyGraph};
pub use resolver::ImportResolver;
pub use traversal::{TraversalEngine, TraversalOptions};
