//! Sequential reader for the count-prefixed adjacency-list byte stream.
//!
//! The raw graph stores no node count: records are numbered implicitly and
//! the scan ends when cumulative consumed bytes reach the header's declared
//! size. Every record therefore has to account exactly
//! `4 + 4 * neighbor_count` bytes, whether or not the caller keeps any of
//! the neighbor ids.

use std::convert::TryInto;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::format::{RawGraphHeader, RAW_GRAPH_HEADER_LEN};
use crate::sample::{AdjacencySample, NodeSample, SmallGraph, SmallGraphBuilder};
use crate::stats::{DegreeAccumulator, GraphStats, NodeTotals, StatsOptions};

/// How much of each record's neighbor list a scan keeps.
#[derive(Debug, Clone, Copy)]
enum Keep {
    /// Seek over the whole list; stats only.
    None,
    /// Copy the first `cap` ids (`cap == 0` copies all of them).
    Capped(usize),
}

/// One forward pass over a raw graph region at a caller-supplied offset
/// (0 for standalone files, or the discovered container offset).
pub struct RawGraphScanner {
    file: File,
    header: RawGraphHeader,
    consumed: u64,
}

impl RawGraphScanner {
    /// Opens `path` and positions the scan just past the header at `offset`.
    /// A short header read is fatal.
    pub fn open(path: &Path, offset: u64) -> Result<Self> {
        let mut file = File::open(path)?;
        let header = RawGraphHeader::read_at(&mut file, offset)?;
        Ok(Self {
            file,
            header,
            consumed: RAW_GRAPH_HEADER_LEN,
        })
    }

    /// The header this scan was opened with.
    pub fn header(&self) -> &RawGraphHeader {
        &self.header
    }

    /// Advances over the next record, filling `neighbors` according to
    /// `keep`, and returns its true degree. Returns `None` once the declared
    /// byte count is consumed, or when the file ends early (truncation is
    /// tolerated, not escalated).
    fn next_record(&mut self, keep: Keep, neighbors: &mut Vec<u32>) -> Result<Option<u32>> {
        neighbors.clear();
        if self.consumed == self.header.expected_len {
            return Ok(None);
        }

        let mut count_buf = [0u8; 4];
        match self.file.read_exact(&mut count_buf) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
                debug!(
                    consumed = self.consumed,
                    expected = self.header.expected_len,
                    "raw graph ended before its declared size"
                );
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        }
        let degree = u32::from_le_bytes(count_buf);

        let total = degree as usize;
        let take = match keep {
            Keep::None => 0,
            Keep::Capped(0) => total,
            Keep::Capped(cap) => total.min(cap),
        };
        if take > 0 {
            let mut buf = vec![0u8; take * 4];
            match self.file.read_exact(&mut buf) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
                Err(err) => return Err(err.into()),
            }
            neighbors.extend(
                buf.chunks_exact(4)
                    .map(|chunk| u32::from_le_bytes(chunk.try_into().expect("chunk is 4 bytes"))),
            );
        }

        let skipped = (total - take) as u64 * 4;
        if skipped > 0 {
            self.file.seek(SeekFrom::Current(skipped as i64))?;
        }
        self.consumed += 4 + 4 * u64::from(degree);
        Ok(Some(degree))
    }
}

/// Computes full-region degree statistics for a raw graph starting at
/// `offset`. Truncated regions yield fewer nodes, never an error.
pub fn stats_from_raw_graph(path: &Path, offset: u64, opts: &StatsOptions) -> Result<GraphStats> {
    let mut scanner = RawGraphScanner::open(path, offset)?;
    let mut acc = DegreeAccumulator::new(opts.weak_threshold);
    let mut scratch = Vec::new();
    while let Some(degree) = scanner.next_record(Keep::None, &mut scratch)? {
        acc.record(degree);
    }

    let frozen = scanner.header().frozen_count;
    let entry_point = scanner.header().entry_point;
    let nodes = acc.nodes_seen();
    Ok(acc.finish(NodeTotals {
        total_nodes: nodes,
        active_nodes: nodes.saturating_sub(frozen),
        frozen_nodes: frozen,
        entry_point,
    }))
}

/// Samples the first `num_nodes` nodes, keeping at most `max_neighbors` ids
/// per node (`0` keeps every neighbor). Reports fewer nodes when the region
/// is truncated or smaller than requested.
pub fn sample_from_raw_graph(
    path: &Path,
    offset: u64,
    num_nodes: usize,
    max_neighbors: usize,
) -> Result<AdjacencySample> {
    let mut scanner = RawGraphScanner::open(path, offset)?;
    let entry_point = scanner.header().entry_point;
    let mut nodes = Vec::new();
    let mut preview = Vec::new();
    while nodes.len() < num_nodes {
        match scanner.next_record(Keep::Capped(max_neighbors), &mut preview)? {
            Some(degree) => {
                let id = nodes.len() as u64;
                nodes.push(NodeSample {
                    id,
                    degree: u64::from(degree),
                    neighbors: std::mem::take(&mut preview),
                });
            }
            None => break,
        }
    }
    Ok(AdjacencySample {
        entry_point,
        requested: num_nodes,
        nodes,
    })
}

/// Extracts forward plus derived reverse adjacency for the first `num_nodes`
/// nodes. Both sides shrink consistently if the region ends early.
pub fn small_graph_from_raw_graph(path: &Path, offset: u64, num_nodes: usize) -> Result<SmallGraph> {
    let mut scanner = RawGraphScanner::open(path, offset)?;
    let mut builder = SmallGraphBuilder::new(num_nodes, scanner.header().entry_point);
    let mut neighbors = Vec::new();
    while !builder.is_full() {
        match scanner.next_record(Keep::Capped(0), &mut neighbors)? {
            Some(_) => builder.push_node(std::mem::take(&mut neighbors)),
            None => break,
        }
    }
    Ok(builder.finish())
}
