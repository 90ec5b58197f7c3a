#![allow(missing_docs)]

use std::fs;
use std::path::Path;

use sonda::{
    format::ElementType,
    sector::{sample_from_disk_index, small_graph_from_disk_index, stats_from_disk_index},
    stats::StatsOptions,
    SondaError,
};
use tempfile::tempdir;

const SECTOR_LEN: usize = 4096;

struct IndexLayout<'a> {
    marker: bool,
    dims: u64,
    element: ElementType,
    entry_point: u64,
    max_node_len: u64,
    nodes_per_sector: u64,
    adjacency: &'a [Vec<u32>],
}

fn encode_disk_index(layout: &IndexLayout<'_>) -> Vec<u8> {
    let node_count = layout.adjacency.len() as u64;
    let mut bytes = Vec::new();
    if layout.marker {
        bytes.extend_from_slice(&5i32.to_le_bytes());
        bytes.extend_from_slice(&1i32.to_le_bytes());
    }
    for value in [
        node_count,
        layout.dims,
        layout.entry_point,
        layout.max_node_len,
        layout.nodes_per_sector,
    ] {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes.resize(SECTOR_LEN, 0);

    if layout.nodes_per_sector == 0 {
        return bytes;
    }
    let coord_len = (layout.dims as usize) * layout.element.size();
    let sectors = node_count.div_ceil(layout.nodes_per_sector);
    for sec in 0..sectors {
        let mut sector = vec![0u8; SECTOR_LEN];
        for j in 0..layout.nodes_per_sector {
            let id = sec * layout.nodes_per_sector + j;
            if id >= node_count {
                break;
            }
            let off = (j * layout.max_node_len) as usize;
            let neighbors = &layout.adjacency[id as usize];
            let count_off = off + coord_len;
            sector[count_off..count_off + 4]
                .copy_from_slice(&(neighbors.len() as u32).to_le_bytes());
            for (i, &n) in neighbors.iter().enumerate() {
                let at = count_off + 4 + i * 4;
                sector[at..at + 4].copy_from_slice(&n.to_le_bytes());
            }
        }
        bytes.extend_from_slice(&sector);
    }
    bytes
}

fn write_disk_index(path: &Path, layout: &IndexLayout<'_>) {
    fs::write(path, encode_disk_index(layout)).expect("write disk index");
}

#[test]
fn sector_math_walks_the_trailing_partial_sector() {
    // nodes_per_sector = 16, node_count = 3 * 16 + 1 = 49: four sectors, the
    // last holding exactly one valid slot.
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("index.disk");
    let adjacency: Vec<Vec<u32>> = (0..49).map(|id| vec![(id + 1) % 49]).collect();
    write_disk_index(
        &path,
        &IndexLayout {
            marker: true,
            dims: 2,
            element: ElementType::F32,
            entry_point: 5,
            max_node_len: 32,
            nodes_per_sector: 16,
            adjacency: &adjacency,
        },
    );

    let stats =
        stats_from_disk_index(&path, ElementType::F32, &StatsOptions::default()).expect("stats");
    assert_eq!(stats.total_nodes, 49);
    assert_eq!(stats.active_nodes, 49);
    assert_eq!(stats.total_edges, 49);
    assert_eq!(stats.degree_min, 1);
    assert_eq!(stats.degree_max, 1);
    assert_eq!(stats.weak_count, 49);
    assert_eq!(stats.entry_point, 5);

    // sampling past the end confirms the last sector contributes one node
    let sample = sample_from_disk_index(&path, ElementType::F32, 100, 0).expect("sample");
    assert_eq!(sample.nodes.len(), 49);
    assert_eq!(sample.nodes.last().expect("last node").id, 48);
}

#[test]
fn marker_and_bare_variants_agree() {
    let dir = tempdir().expect("tempdir");
    let adjacency = vec![vec![1, 2], vec![2], vec![0]];
    // node_count = 3 keeps the leading i32 below the marker cutoff, so the
    // bare variant is detectable at all
    let bare = IndexLayout {
        marker: false,
        dims: 4,
        element: ElementType::U8,
        entry_point: 1,
        max_node_len: 24,
        nodes_per_sector: 2,
        adjacency: &adjacency,
    };
    let marked = IndexLayout { marker: true, ..bare };

    let bare_path = dir.path().join("bare.disk");
    let marked_path = dir.path().join("marked.disk");
    write_disk_index(&bare_path, &bare);
    write_disk_index(&marked_path, &marked);

    let opts = StatsOptions::default();
    let bare_stats = stats_from_disk_index(&bare_path, ElementType::U8, &opts).expect("bare");
    let marked_stats =
        stats_from_disk_index(&marked_path, ElementType::U8, &opts).expect("marked");
    assert_eq!(bare_stats, marked_stats);
    assert_eq!(bare_stats.total_nodes, 3);
    assert_eq!(bare_stats.total_edges, 4);
}

#[test]
fn multi_sector_nodes_degrade_to_metadata_only_stats() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("index.disk");
    write_disk_index(
        &path,
        &IndexLayout {
            marker: true,
            dims: 128,
            element: ElementType::F32,
            entry_point: 3,
            max_node_len: 4096,
            nodes_per_sector: 0,
            adjacency: &vec![vec![]; 10],
        },
    );

    let stats =
        stats_from_disk_index(&path, ElementType::F32, &StatsOptions::default()).expect("stats");
    assert_eq!(stats.total_nodes, 10);
    assert_eq!(stats.entry_point, 3);
    assert_eq!(stats.total_edges, 0);
    assert_eq!(stats.degree_min, 0);
    assert_eq!(stats.degree_max, 0);
    assert_eq!(stats.degree_avg, 0.0);
}

#[test]
fn multi_sector_nodes_cannot_be_sampled() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("index.disk");
    write_disk_index(
        &path,
        &IndexLayout {
            marker: true,
            dims: 128,
            element: ElementType::F32,
            entry_point: 0,
            max_node_len: 4096,
            nodes_per_sector: 0,
            adjacency: &vec![vec![]; 4],
        },
    );

    let err = sample_from_disk_index(&path, ElementType::F32, 4, 0).unwrap_err();
    assert!(matches!(err, SondaError::Unsupported(_)));
    let err = small_graph_from_disk_index(&path, ElementType::F32, 4).unwrap_err();
    assert!(matches!(err, SondaError::Unsupported(_)));
}

#[test]
fn element_type_changes_the_neighbor_count_offset() {
    // same dims, different element width: the count field moves
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("index.disk");
    let adjacency = vec![vec![9, 8, 7]];
    write_disk_index(
        &path,
        &IndexLayout {
            marker: true,
            dims: 8,
            element: ElementType::I8,
            entry_point: 0,
            max_node_len: 64,
            nodes_per_sector: 4,
            adjacency: &adjacency,
        },
    );

    let sample = sample_from_disk_index(&path, ElementType::I8, 1, 0).expect("sample");
    assert_eq!(sample.nodes[0].neighbors, vec![9, 8, 7]);
}

#[test]
fn sampling_caps_neighbors_per_node() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("index.disk");
    let adjacency = vec![vec![1, 2, 3, 4, 5], vec![0]];
    write_disk_index(
        &path,
        &IndexLayout {
            marker: true,
            dims: 2,
            element: ElementType::F32,
            entry_point: 0,
            max_node_len: 64,
            nodes_per_sector: 8,
            adjacency: &adjacency,
        },
    );

    let sample = sample_from_disk_index(&path, ElementType::F32, 2, 2).expect("sample");
    assert_eq!(sample.nodes[0].degree, 5);
    assert_eq!(sample.nodes[0].neighbors, vec![1, 2]);
}

#[test]
fn small_graph_reverse_adjacency_from_sectors() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("index.disk");
    let adjacency = vec![vec![1, 2], vec![2], vec![], vec![0]];
    write_disk_index(
        &path,
        &IndexLayout {
            marker: true,
            dims: 2,
            element: ElementType::F32,
            entry_point: 0,
            max_node_len: 32,
            nodes_per_sector: 2,
            adjacency: &adjacency,
        },
    );

    let graph = small_graph_from_disk_index(&path, ElementType::F32, 4).expect("small graph");
    assert_eq!(graph.len(), 4);
    assert_eq!(graph.referenced_by[0], vec![3]);
    assert_eq!(graph.referenced_by[1], vec![0]);
    assert_eq!(graph.referenced_by[2], vec![0, 1]);
    assert!(graph.referenced_by[3].is_empty());
}

#[test]
fn neighbor_run_is_clamped_at_the_sector_boundary() {
    // hand-build a sector whose only slot declares more neighbors than the
    // remaining sector bytes can hold
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("index.disk");

    let dims = 2u64;
    let coord_len = 8usize; // 2 * f32
    let max_node_len = 4080u64;
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&5i32.to_le_bytes());
    bytes.extend_from_slice(&1i32.to_le_bytes());
    for value in [1u64, dims, 0, max_node_len, 1] {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes.resize(SECTOR_LEN, 0);

    let mut sector = vec![0u8; SECTOR_LEN];
    let count_off = coord_len;
    sector[count_off..count_off + 4].copy_from_slice(&2000u32.to_le_bytes());
    let available = (SECTOR_LEN - (count_off + 4)) / 4;
    for i in 0..available {
        let at = count_off + 4 + i * 4;
        sector[at..at + 4].copy_from_slice(&(i as u32).to_le_bytes());
    }
    bytes.extend_from_slice(&sector);
    fs::write(&path, bytes).expect("write disk index");

    let graph = small_graph_from_disk_index(&path, ElementType::F32, 1).expect("small graph");
    assert_eq!(graph.out_neighbors[0].len(), available);

    let sample = sample_from_disk_index(&path, ElementType::F32, 1, 0).expect("sample");
    assert_eq!(sample.nodes[0].degree, 2000);
    assert_eq!(sample.nodes[0].neighbors.len(), available);
}

#[test]
fn truncated_data_region_stops_cleanly() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("index.disk");
    let adjacency: Vec<Vec<u32>> = (0..8).map(|_| vec![1]).collect();
    let bytes = encode_disk_index(&IndexLayout {
        marker: true,
        dims: 2,
        element: ElementType::F32,
        entry_point: 0,
        max_node_len: 32,
        nodes_per_sector: 4,
        adjacency: &adjacency,
    });
    // drop the second data sector entirely
    fs::write(&path, &bytes[..SECTOR_LEN * 2]).expect("write truncated index");

    let stats =
        stats_from_disk_index(&path, ElementType::F32, &StatsOptions::default()).expect("stats");
    // header still claims 8 nodes; only the first sector's 4 were walkable
    assert_eq!(stats.total_nodes, 8);
    assert_eq!(stats.total_edges, 4);
}
