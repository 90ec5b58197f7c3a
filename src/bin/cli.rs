//! Binary entry point for the sonda index inspector.
#![forbid(unsafe_code)]

use std::error::Error;
use std::fs::File;
use std::path::PathBuf;

use clap::{ArgGroup, Parser, ValueEnum};
use sonda::{
    format::{ContainerMeta, ElementType},
    raw::{sample_from_raw_graph, small_graph_from_raw_graph, stats_from_raw_graph},
    report,
    sector::{sample_from_disk_index, small_graph_from_disk_index, stats_from_disk_index},
    stats::{StatsOptions, DEFAULT_WEAK_THRESHOLD},
};
use tracing_subscriber::EnvFilter;

// Plausibility bounds for files claimed to be raw graphs; numbers past these
// almost always mean the file is a *_disk.index handed to the wrong flag.
const MAX_REASONABLE_DEGREE: u64 = 10_000_000;
const MAX_REASONABLE_NODES: u64 = 500_000_000;

#[derive(Parser, Debug)]
#[command(
    name = "sonda",
    version,
    about = "Structural inspector for on-disk ANN graph indexes",
    disable_help_subcommand = true,
    group(
        ArgGroup::new("source")
            .required(true)
            .args(["graph_file", "index_file", "disk_index"])
    )
)]
struct Cli {
    #[arg(
        long,
        value_name = "PATH",
        help = "Raw graph file (adjacency stream with its header at offset 0)"
    )]
    graph_file: Option<PathBuf>,

    #[arg(
        long,
        value_name = "PATH",
        help = "Single-file unified index embedding a raw-graph region"
    )]
    index_file: Option<PathBuf>,

    #[arg(
        long,
        value_name = "PATH",
        requires = "data_type",
        help = "Sector-aligned SSD index (*_disk.index); requires --data-type"
    )]
    disk_index: Option<PathBuf>,

    #[arg(
        long,
        value_enum,
        help = "Coordinate element type for --disk-index (float, uint8, or int8)"
    )]
    data_type: Option<DataTypeArg>,

    #[arg(
        long,
        value_name = "N",
        default_value_t = 0,
        help = "Print neighbor lists for the first N nodes (0 = off)"
    )]
    adjacency_sample: usize,

    #[arg(
        long,
        value_name = "M",
        default_value_t = 20,
        help = "Cap neighbors per node in adjacency output (0 = uncapped)"
    )]
    max_neighbors: usize,

    #[arg(
        long,
        value_name = "N",
        default_value_t = 0,
        help = "Print first N nodes with out-neighbors and referenced_by (0 = off)"
    )]
    small_graph: usize,

    #[arg(
        long,
        value_name = "T",
        default_value_t = DEFAULT_WEAK_THRESHOLD,
        help = "Out-degree below which a node counts as weak"
    )]
    weak_threshold: u32,

    #[arg(
        long,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum DataTypeArg {
    Float,
    Uint8,
    Int8,
}

impl From<DataTypeArg> for ElementType {
    fn from(value: DataTypeArg) -> Self {
        match value {
            DataTypeArg::Float => ElementType::F32,
            DataTypeArg::Uint8 => ElementType::U8,
            DataTypeArg::Int8 => ElementType::I8,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// The single input file with its layout resolved by the mode flags.
enum Source {
    Raw { path: PathBuf, offset: u64 },
    Disk { path: PathBuf, element: ElementType },
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let opts = StatsOptions {
        weak_threshold: cli.weak_threshold,
    };
    let source = resolve_source(&cli)?;

    let stats = match &source {
        Source::Raw { path, offset } => stats_from_raw_graph(path, *offset, &opts)?,
        Source::Disk { path, element } => stats_from_disk_index(path, *element, &opts)?,
    };
    if stats.total_nodes == 0 {
        return Err("no nodes read (empty graph)".into());
    }
    if let Source::Raw { offset: 0, .. } = source {
        if stats.degree_max > MAX_REASONABLE_DEGREE || stats.total_nodes > MAX_REASONABLE_NODES {
            return Err(
                "file does not look like a raw graph; use --disk-index for *_disk.index files"
                    .into(),
            );
        }
    }
    emit(cli.format, &stats, || {
        println!("{}", report::summary_line(&stats, cli.weak_threshold));
    })?;

    if cli.adjacency_sample > 0 {
        let sample = match &source {
            Source::Raw { path, offset } => {
                sample_from_raw_graph(path, *offset, cli.adjacency_sample, cli.max_neighbors)?
            }
            Source::Disk { path, element } => {
                sample_from_disk_index(path, *element, cli.adjacency_sample, cli.max_neighbors)?
            }
        };
        emit(cli.format, &sample, || {
            println!();
            print!("{}", report::adjacency_listing(&sample));
        })?;
    }

    if cli.small_graph > 0 {
        let graph = match &source {
            Source::Raw { path, offset } => {
                small_graph_from_raw_graph(path, *offset, cli.small_graph)?
            }
            Source::Disk { path, element } => {
                small_graph_from_disk_index(path, *element, cli.small_graph)?
            }
        };
        emit(cli.format, &graph, || {
            println!();
            print!("{}", report::small_graph_listing(&graph, cli.max_neighbors));
        })?;
    }

    Ok(())
}

fn resolve_source(cli: &Cli) -> Result<Source, Box<dyn Error>> {
    if let Some(path) = &cli.graph_file {
        return Ok(Source::Raw {
            path: path.clone(),
            offset: 0,
        });
    }
    if let Some(path) = &cli.index_file {
        let mut file = File::open(path)?;
        let meta = ContainerMeta::detect(&mut file)?;
        return Ok(Source::Raw {
            path: path.clone(),
            offset: meta.graph_offset,
        });
    }
    let path = cli
        .disk_index
        .clone()
        .ok_or("provide one of --graph-file, --index-file, or --disk-index")?;
    let data_type = cli
        .data_type
        .ok_or("--disk-index requires --data-type (float, uint8, or int8)")?;
    Ok(Source::Disk {
        path,
        element: data_type.into(),
    })
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: serde::Serialize,
    F: FnOnce(),
{
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}
