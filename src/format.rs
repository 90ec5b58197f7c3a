//! Layout detection for the three persisted index formats.
//!
//! None of the formats carries a self-describing tag, so detection is driven
//! by caller intent plus validation heuristics: the raw graph is identified by
//! its 24-byte size-prefixed header, the unified container by a fixed
//! metadata-size field, and the sector index by probing two mutually
//! exclusive header candidates (with and without a leading marker pair).

use std::convert::TryInto;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use serde::Serialize;

use crate::error::{Result, SondaError};

/// Fixed on-disk unit of layout and I/O granularity for sector indexes.
pub const SECTOR_LEN: usize = 4096;
/// Byte offset where the first data sector of a disk index begins, regardless
/// of which metadata sub-variant the file uses.
pub const DISK_INDEX_DATA_OFFSET: u64 = 4096;
/// Size of the raw-graph header preceding the adjacency stream.
pub const RAW_GRAPH_HEADER_LEN: u64 = 24;

const CONTAINER_MAGIC: u64 = 4096;
const MARKER_MIN_ROWS: i32 = 5;

/// Element type of the coordinate block inside a disk-index node record.
///
/// The bytes do not encode this; the caller has to declare it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ElementType {
    /// 32-bit float coordinates.
    F32,
    /// Unsigned 8-bit coordinates.
    U8,
    /// Signed 8-bit coordinates.
    I8,
}

impl ElementType {
    /// Byte width of one coordinate element.
    pub fn size(self) -> usize {
        match self {
            ElementType::F32 => 4,
            ElementType::U8 | ElementType::I8 => 1,
        }
    }
}

/// Header of a raw graph region: declared byte size, degree hint, entry
/// point, and frozen-node count. Node count is derived by the scan, never
/// stored.
#[derive(Debug, Clone, Serialize)]
pub struct RawGraphHeader {
    /// Total bytes the region claims to span, header included. The scan
    /// terminates when cumulative consumed bytes reach this value.
    pub expected_len: u64,
    /// Builder's maximum out-degree hint; carried but not trusted.
    pub max_degree_hint: u32,
    /// Traversal-start node id.
    pub entry_point: u32,
    /// Header-declared count of frozen nodes excluded from active totals.
    pub frozen_count: u64,
}

impl RawGraphHeader {
    /// Reads the 24-byte header at `offset`. A short read is fatal.
    pub fn read_at(file: &mut File, offset: u64) -> Result<Self> {
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = [0u8; RAW_GRAPH_HEADER_LEN as usize];
        file.read_exact(&mut buf)?;
        Ok(Self {
            expected_len: u64::from_le_bytes(buf[0..8].try_into().expect("slice is 8 bytes")),
            max_degree_hint: u32::from_le_bytes(buf[8..12].try_into().expect("slice is 4 bytes")),
            entry_point: u32::from_le_bytes(buf[12..16].try_into().expect("slice is 4 bytes")),
            frozen_count: u64::from_le_bytes(buf[16..24].try_into().expect("slice is 8 bytes")),
        })
    }
}

/// Structural parameters of a sector-aligned disk index.
#[derive(Debug, Clone, Serialize)]
pub struct DiskIndexMeta {
    /// Number of node records in the data region.
    pub node_count: u64,
    /// Coordinate dimensionality of each record.
    pub dims: u64,
    /// Traversal-start node id (medoid).
    pub entry_point: u64,
    /// Fixed stride of one node record inside a sector, in bytes.
    pub max_node_len: u64,
    /// Node records per 4096-byte sector; zero means each node spans
    /// multiple sectors.
    pub nodes_per_sector: u64,
    /// Caller-declared coordinate element type.
    pub element: ElementType,
    /// Whether the metadata was prefixed by the 8-byte marker pair.
    pub has_marker: bool,
}

/// Leading tag pair written by builders that wrap their metadata in a generic
/// matrix header. Present iff `rows >= 5`.
#[derive(Debug, Clone, Copy)]
struct MarkerPair {
    rows: i32,
    _cols: i32,
}

impl MarkerPair {
    fn read(file: &mut File) -> Result<Self> {
        let mut buf = [0u8; 8];
        file.read_exact(&mut buf)?;
        Ok(Self {
            rows: i32::from_le_bytes(buf[0..4].try_into().expect("slice is 4 bytes")),
            _cols: i32::from_le_bytes(buf[4..8].try_into().expect("slice is 4 bytes")),
        })
    }
}

/// The five 64-bit metadata fields shared by both sector-index sub-variants.
#[derive(Debug, Clone, Copy)]
struct MetaFields {
    node_count: u64,
    dims: u64,
    entry_point: u64,
    max_node_len: u64,
    nodes_per_sector: u64,
}

impl MetaFields {
    fn read(file: &mut File) -> Result<Self> {
        let mut buf = [0u8; 40];
        file.read_exact(&mut buf)?;
        let field = |i: usize| {
            u64::from_le_bytes(buf[i * 8..i * 8 + 8].try_into().expect("slice is 8 bytes"))
        };
        Ok(Self {
            node_count: field(0),
            dims: field(1),
            entry_point: field(2),
            max_node_len: field(3),
            nodes_per_sector: field(4),
        })
    }
}

impl DiskIndexMeta {
    /// Probes the two metadata sub-variants: first the marker-prefixed one,
    /// and if the marker does not qualify, a seek back to byte 0 and a
    /// reinterpretation as the five bare fields. Commits only after stride
    /// validation.
    pub fn detect(file: &mut File, element: ElementType) -> Result<Self> {
        file.seek(SeekFrom::Start(0))?;
        let marker = MarkerPair::read(file)?;
        let (fields, has_marker) = if marker.rows >= MARKER_MIN_ROWS {
            (MetaFields::read(file)?, true)
        } else {
            file.seek(SeekFrom::Start(0))?;
            (MetaFields::read(file)?, false)
        };
        let meta = Self {
            node_count: fields.node_count,
            dims: fields.dims,
            entry_point: fields.entry_point,
            max_node_len: fields.max_node_len,
            nodes_per_sector: fields.nodes_per_sector,
            element,
            has_marker,
        };
        meta.validate()?;
        Ok(meta)
    }

    /// The node stride must fit the coordinate block plus the neighbor-count
    /// field, and can never exceed one sector.
    pub fn validate(&self) -> Result<()> {
        let coord_len = self
            .dims
            .checked_mul(self.element.size() as u64)
            .ok_or_else(|| SondaError::corruption("coordinate block length overflows u64"))?;
        let min_len = coord_len + 4;
        if self.max_node_len < min_len {
            return Err(SondaError::corruption(format!(
                "max_node_length {} below coordinates plus neighbor count ({min_len})",
                self.max_node_len
            )));
        }
        if self.max_node_len > SECTOR_LEN as u64 {
            return Err(SondaError::corruption(format!(
                "max_node_length {} exceeds sector size {SECTOR_LEN}",
                self.max_node_len
            )));
        }
        Ok(())
    }

    /// Byte length of the coordinate block preceding the neighbor count.
    pub fn coord_len(&self) -> usize {
        (self.dims * self.element.size() as u64) as usize
    }

    /// Sectors needed to hold all node records; zero for the multi-sector
    /// node variant, which this reader does not walk.
    pub fn total_sectors(&self) -> u64 {
        if self.nodes_per_sector == 0 {
            0
        } else {
            self.node_count.div_ceil(self.nodes_per_sector)
        }
    }
}

/// Metadata of the unified single-file container. The first field doubles as
/// the format magic.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerMeta {
    /// Size of the container's metadata block; must equal 4096.
    pub metadata_len: u64,
    /// Byte offset of the embedded raw-graph region.
    pub graph_offset: u64,
    /// Remaining metadata words, carried for diagnostics only.
    pub reserved: [u64; 3],
}

impl ContainerMeta {
    /// Reads the 40-byte container prelude and validates the magic and the
    /// graph-offset ordering; anything else rejects the file.
    pub fn detect(file: &mut File) -> Result<Self> {
        file.seek(SeekFrom::Start(0))?;
        let mut buf = [0u8; 40];
        file.read_exact(&mut buf)?;
        let field = |i: usize| {
            u64::from_le_bytes(buf[i * 8..i * 8 + 8].try_into().expect("slice is 8 bytes"))
        };
        let metadata_len = field(0);
        let graph_offset = field(1);
        if metadata_len != CONTAINER_MAGIC {
            return Err(SondaError::corruption(format!(
                "not a unified container: leading field {metadata_len} != {CONTAINER_MAGIC}"
            )));
        }
        if graph_offset <= metadata_len {
            return Err(SondaError::corruption(format!(
                "not a unified container: graph offset {graph_offset} inside metadata block"
            )));
        }
        Ok(Self {
            metadata_len,
            graph_offset,
            reserved: [field(2), field(3), field(4)],
        })
    }
}

/// Which layout to probe a file for.
#[derive(Debug, Clone, Copy)]
pub enum FormatProbe {
    /// Raw adjacency stream with its header at the given byte offset.
    RawGraph {
        /// Byte offset of the 24-byte header.
        offset: u64,
    },
    /// Sector-aligned disk index with the declared element type.
    DiskIndex {
        /// Coordinate element type; not inferable from the bytes.
        element: ElementType,
    },
    /// Unified single-file container.
    Container,
}

/// Closed union over the recognized layout variants, resolved exactly once
/// per file. Downstream code dispatches on this instead of re-inspecting
/// bytes.
#[derive(Debug, Clone)]
pub enum IndexFormat {
    /// Count-prefixed adjacency stream.
    RawGraph(RawGraphHeader),
    /// Sector-aligned disk index (either metadata sub-variant).
    DiskIndex(DiskIndexMeta),
    /// Unified container embedding a raw-graph region.
    Container(ContainerMeta),
}

impl IndexFormat {
    /// Validates `path` against the probed layout and extracts its header
    /// metadata. Fails closed on any inconsistency.
    pub fn detect(path: &Path, probe: FormatProbe) -> Result<Self> {
        let mut file = File::open(path)?;
        match probe {
            FormatProbe::RawGraph { offset } => Ok(IndexFormat::RawGraph(
                RawGraphHeader::read_at(&mut file, offset)?,
            )),
            FormatProbe::DiskIndex { element } => Ok(IndexFormat::DiskIndex(
                DiskIndexMeta::detect(&mut file, element)?,
            )),
            FormatProbe::Container => Ok(IndexFormat::Container(ContainerMeta::detect(&mut file)?)),
        }
    }
}
