//! Command line driver: wave function collapse on JSON graph files.
//!
//! Reads the example graph, the shape graphs and the graph to color,
//! tries the collapse up to `-n` times with a reset after every dead
//! end, and writes the colored graph on the first success. Colors and
//! edge types are strings; nodes without a color and edges without a
//! type are `null`.

use std::error::Error;
use std::process::ExitCode;

use clap::Parser;
use petgraph::graph::Graph;
use petgraph::{Directed, EdgeType, Undirected};
use tracing::{info, warn};

use graphwfc::file_io::GraphReadWriter;
use graphwfc::pattern::require_colored;
use graphwfc::{Outcome, WfcOptions, WfcState};

/// One graph file as the driver reads it: optional string colors on
/// nodes, optional string types on edges.
type FileGraph<Ty> = Graph<Option<String>, Option<String>, Ty>;

#[derive(Parser, Debug)]
#[command(
    name = "graphwfc",
    about = "Colors a graph with wave function collapse, from JSON graph files"
)]
struct Args {
    /// The colored example graph.
    #[arg(long, default_value = "GI.json")]
    example: String,

    /// A shape graph describing the pattern areas; may be given
    /// several times.
    #[arg(long = "shape", required = true)]
    shapes: Vec<String>,

    /// The graph to color (read as an input file).
    #[arg(long, default_value = "GO.json")]
    graph: String,

    /// How often to try before giving up.
    #[arg(short = 'n', long, default_value_t = 10)]
    attempts: u32,

    /// Treat all graphs as directed.
    #[arg(long)]
    directed: bool,

    /// Seed for the random source; random when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Where to write the colored graph.
    #[arg(short, long, default_value = "out.json")]
    output: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let args = Args::parse();
    let result = if args.directed {
        drive::<Directed>(&args)
    } else {
        drive::<Undirected>(&args)
    };
    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            eprintln!("no attempt succeeded, giving up");
            ExitCode::FAILURE
        }
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn drive<Ty: EdgeType>(args: &Args) -> Result<bool, Box<dyn Error>> {
    let example_file: Box<FileGraph<Ty>> =
        GraphReadWriter::deserialize_graph_from_file(&args.example)?;
    let example = require_colored(&example_file)?;

    let mut shapes = Vec::with_capacity(args.shapes.len());
    for path in &args.shapes {
        let shape: Box<FileGraph<Ty>> = GraphReadWriter::deserialize_graph_from_file(path)?;
        shapes.push(shape.map(|_, _| (), |_, edge| edge.clone()));
    }

    let output: Box<FileGraph<Ty>> = GraphReadWriter::deserialize_graph_from_file(&args.graph)?;

    let seed = args.seed.unwrap_or_else(rand::random);
    info!(seed, "building collapse state");
    let mut state = WfcState::with_options(
        &output,
        &example,
        &shapes,
        WfcOptions {
            seed,
            ..WfcOptions::default()
        },
    )?;

    for attempt in 1..=args.attempts {
        match state.run(-1) {
            Outcome::Done => {
                info!(attempt, iterations = state.iteration_count(), "success");
                state.graph().serialize_graph_to_file(&args.output)?;
                return Ok(true);
            }
            Outcome::Failed(location) => {
                warn!(attempt, %location, "ran into a dead end");
                state.reset()?;
            }
            // unbounded budget, so the loop only ends through the
            // arms above
            Outcome::Paused => break,
        }
    }
    Ok(false)
}
