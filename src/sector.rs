//! Strided reader for the sector-aligned on-disk index.
//!
//! The data region is an array of 4096-byte sectors, each holding up to
//! `nodes_per_sector` fixed-stride node records. Sectors are fetched whole
//! into one reusable scratch buffer; partial sectors are never read, and
//! every in-sector access is bounds-checked before it happens.

use std::convert::TryInto;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::warn;

use crate::error::{Result, SondaError};
use crate::format::{DiskIndexMeta, ElementType, DISK_INDEX_DATA_OFFSET, SECTOR_LEN};
use crate::sample::{AdjacencySample, NodeSample, SmallGraph, SmallGraphBuilder};
use crate::stats::{DegreeAccumulator, GraphStats, NodeTotals, StatsOptions};

/// Whole-sector random-access reader over a validated disk index.
pub struct SectorIndexScanner {
    file: File,
    meta: DiskIndexMeta,
    sector: Vec<u8>,
}

impl SectorIndexScanner {
    /// Opens `path`, detects the metadata sub-variant, and validates the
    /// node stride for the declared element type.
    pub fn open(path: &Path, element: ElementType) -> Result<Self> {
        let mut file = File::open(path)?;
        let meta = DiskIndexMeta::detect(&mut file, element)?;
        Ok(Self {
            file,
            meta,
            sector: vec![0u8; SECTOR_LEN],
        })
    }

    /// The validated metadata this scan was opened with.
    pub fn meta(&self) -> &DiskIndexMeta {
        &self.meta
    }

    /// Loads data sector `sec` into the scratch buffer. Returns `false` when
    /// the file ends before a whole sector is available.
    fn load_sector(&mut self, sec: u64) -> Result<bool> {
        let offset = DISK_INDEX_DATA_OFFSET + sec * SECTOR_LEN as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        match self.file.read_exact(&mut self.sector) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Degree of slot `j` in the loaded sector plus the byte offset of its
    /// neighbor run, or `None` when the count field would overflow the
    /// sector. The stride is constant, so an overflowing slot means every
    /// later slot overflows too.
    fn slot_degree(&self, j: u64) -> Option<(u32, usize)> {
        let node_off = (j * self.meta.max_node_len) as usize;
        let count_off = node_off + self.meta.coord_len();
        if count_off + 4 > SECTOR_LEN {
            return None;
        }
        let degree = u32::from_le_bytes(
            self.sector[count_off..count_off + 4]
                .try_into()
                .expect("slice is 4 bytes"),
        );
        Some((degree, count_off + 4))
    }

    /// Copies up to `take` neighbor ids starting at `ids_off`, reduced
    /// further if the run would cross the sector boundary.
    fn slot_neighbors(&self, ids_off: usize, take: usize) -> Vec<u32> {
        let available = (SECTOR_LEN - ids_off) / 4;
        let take = take.min(available);
        self.sector[ids_off..ids_off + take * 4]
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes(chunk.try_into().expect("chunk is 4 bytes")))
            .collect()
    }
}

fn meta_totals(meta: &DiskIndexMeta) -> NodeTotals {
    NodeTotals {
        total_nodes: meta.node_count,
        active_nodes: meta.node_count,
        frozen_nodes: 0,
        entry_point: meta.entry_point as u32,
    }
}

/// Computes degree statistics for a disk index. When `nodes_per_sector` is
/// zero (nodes spanning multiple sectors), the edge walk is skipped and the
/// result carries valid node/entry metadata with zeroed degree fields.
pub fn stats_from_disk_index(
    path: &Path,
    element: ElementType,
    opts: &StatsOptions,
) -> Result<GraphStats> {
    let mut scanner = SectorIndexScanner::open(path, element)?;
    let meta = scanner.meta().clone();
    let mut acc = DegreeAccumulator::new(opts.weak_threshold);

    if meta.nodes_per_sector == 0 {
        warn!(
            node_count = meta.node_count,
            max_node_len = meta.max_node_len,
            "multi-sector node records; reporting metadata-only stats"
        );
        return Ok(acc.finish(meta_totals(&meta)));
    }

    for sec in 0..meta.total_sectors() {
        if !scanner.load_sector(sec)? {
            break;
        }
        for j in 0..meta.nodes_per_sector {
            let node_id = sec * meta.nodes_per_sector + j;
            if node_id >= meta.node_count {
                break;
            }
            let Some((degree, _)) = scanner.slot_degree(j) else {
                break;
            };
            acc.record(degree);
        }
    }
    Ok(acc.finish(meta_totals(&meta)))
}

/// Samples the first `num_nodes` nodes of a disk index, keeping at most
/// `max_neighbors` ids per node (`0` keeps every id that fits the sector).
pub fn sample_from_disk_index(
    path: &Path,
    element: ElementType,
    num_nodes: usize,
    max_neighbors: usize,
) -> Result<AdjacencySample> {
    let mut scanner = SectorIndexScanner::open(path, element)?;
    let meta = scanner.meta().clone();
    if meta.nodes_per_sector == 0 {
        return Err(SondaError::Unsupported(
            "multi-sector node records cannot be sampled",
        ));
    }

    let mut nodes = Vec::new();
    for sec in 0..meta.total_sectors() {
        if nodes.len() >= num_nodes {
            break;
        }
        if !scanner.load_sector(sec)? {
            break;
        }
        for j in 0..meta.nodes_per_sector {
            if nodes.len() >= num_nodes {
                break;
            }
            let node_id = sec * meta.nodes_per_sector + j;
            if node_id >= meta.node_count {
                break;
            }
            let Some((degree, ids_off)) = scanner.slot_degree(j) else {
                break;
            };
            let take = if max_neighbors == 0 {
                degree as usize
            } else {
                (degree as usize).min(max_neighbors)
            };
            let neighbors = scanner.slot_neighbors(ids_off, take);
            nodes.push(NodeSample {
                id: node_id,
                degree: u64::from(degree),
                neighbors,
            });
        }
    }
    Ok(AdjacencySample {
        entry_point: meta.entry_point as u32,
        requested: num_nodes,
        nodes,
    })
}

/// Extracts forward plus derived reverse adjacency for the first `num_nodes`
/// nodes of a disk index. The window is clamped to the declared node count.
pub fn small_graph_from_disk_index(
    path: &Path,
    element: ElementType,
    num_nodes: usize,
) -> Result<SmallGraph> {
    let mut scanner = SectorIndexScanner::open(path, element)?;
    let meta = scanner.meta().clone();
    if meta.nodes_per_sector == 0 {
        return Err(SondaError::Unsupported(
            "multi-sector node records cannot be sampled",
        ));
    }

    let window = num_nodes.min(meta.node_count as usize);
    let mut builder = SmallGraphBuilder::new(window, meta.entry_point as u32);
    for sec in 0..meta.total_sectors() {
        if builder.is_full() {
            break;
        }
        if !scanner.load_sector(sec)? {
            break;
        }
        for j in 0..meta.nodes_per_sector {
            if builder.is_full() {
                break;
            }
            let node_id = sec * meta.nodes_per_sector + j;
            if node_id >= meta.node_count {
                break;
            }
            let Some((degree, ids_off)) = scanner.slot_degree(j) else {
                break;
            };
            let neighbors = scanner.slot_neighbors(ids_off, degree as usize);
            builder.push_node(neighbors);
        }
    }
    Ok(builder.finish())
}
