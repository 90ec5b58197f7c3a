//! Read-only structural analysis for the persisted on-disk layouts of a
//! graph-based approximate-nearest-neighbor index.
//!
//! Three binary formats are recognized: the count-prefixed raw graph stream,
//! the sector-aligned disk index (with or without a leading marker pair),
//! and the unified single-file container embedding a raw-graph region. For
//! each, the crate computes degree/connectivity statistics in one streaming
//! pass with bounded memory, and produces bounded adjacency previews
//! (forward, and derived reverse over a small id window).
//!
//! All operations are synchronous, open one read-only file handle, and hold
//! at most one sector- or node-sized scratch buffer. Nothing here mutates a
//! file.

#![warn(missing_docs)]

pub mod error;
pub mod format;
pub mod raw;
pub mod report;
pub mod sample;
pub mod sector;
pub mod stats;

pub use error::{Result, SondaError};
pub use format::{
    ContainerMeta, DiskIndexMeta, ElementType, FormatProbe, IndexFormat, RawGraphHeader,
};
pub use raw::{
    sample_from_raw_graph, small_graph_from_raw_graph, stats_from_raw_graph, RawGraphScanner,
};
pub use sample::{AdjacencySample, NodeSample, SmallGraph, SmallGraphBuilder};
pub use sector::{
    sample_from_disk_index, small_graph_from_disk_index, stats_from_disk_index, SectorIndexScanner,
};
pub use stats::{
    DegreeAccumulator, GraphStats, NodeTotals, StatsOptions, DEFAULT_WEAK_THRESHOLD,
};
