//! Command implementations and argument parsing for the filtro CLI.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use filtro_core::{
    DEFAULT_SEED, Edge, EngineBuilder, EngineError, LoadedAdjacency, LoadedEdges, MatchingRun,
    RunSummary, adjacency_from_edges, format_matched_pair, format_mst_edge, format_weighted_pair,
    read_adjacency, read_edges,
};
use thiserror::Error;
use tracing::{Span, field, info, instrument};

const DEFAULT_PARTITIONS: usize = 10;
const DEFAULT_MAX_ROUNDS: usize = 20;
const DEFAULT_ATTEMPTS: usize = 3;
const DEFAULT_EDGE_THRESHOLD: u64 = 1_000_000;
const DEFAULT_MEMORY_THRESHOLD: u64 = 1_000_000;

/// Name of the file written inside the output directory.
pub const FINAL_OUTPUT: &str = "final";

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(
    name = "filtro",
    about = "Run round-based graph reductions over edge and adjacency lists."
)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Minimum spanning forest, filtering until the edge threshold is met.
    Mst(MstArgs),
    /// Connected components by hash-to-min propagation to a fixed point.
    Components(ComponentsArgs),
    /// Maximal matching, sampling until the surviving edges fit in memory.
    Matching(MatchingArgs),
    /// Approximate weighted matching in a single weight-bucketed pass.
    WeightedMatching(RunArgs),
    /// Randomised greedy maximal matching in a single pass.
    GreedyMatching(RunArgs),
}

impl Command {
    /// Subcommand name as typed on the command line.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Mst(_) => "mst",
            Self::Components(_) => "components",
            Self::Matching(_) => "matching",
            Self::WeightedMatching(_) => "weighted-matching",
            Self::GreedyMatching(_) => "greedy-matching",
        }
    }
}

/// Input, output and engine options shared by every command.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Input file.
    pub input: PathBuf,

    /// Output directory; the result is written to `<output>/final`.
    pub output: PathBuf,

    /// Number of partitions each round groups records into.
    #[arg(long, default_value_t = DEFAULT_PARTITIONS)]
    pub partitions: usize,

    /// Maximum number of rounds before the run gives up.
    #[arg(long = "max-rounds", default_value_t = DEFAULT_MAX_ROUNDS)]
    pub max_rounds: usize,

    /// Base seed for sampling and randomised matching.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Attempts per reduction task before the round fails.
    #[arg(long, default_value_t = DEFAULT_ATTEMPTS)]
    pub attempts: usize,
}

impl RunArgs {
    fn builder(&self) -> EngineBuilder {
        EngineBuilder::new()
            .with_partitions(self.partitions)
            .with_max_rounds(self.max_rounds)
            .with_seed(self.seed)
            .with_attempts(self.attempts)
    }
}

/// Options accepted by the `mst` command.
#[derive(Debug, Args, Clone)]
pub struct MstArgs {
    /// Shared options.
    #[command(flatten)]
    pub run: RunArgs,

    /// Edge count at or below which the remaining edges are merged.
    #[arg(long, default_value_t = DEFAULT_EDGE_THRESHOLD)]
    pub threshold: u64,
}

/// Options accepted by the `components` command.
#[derive(Debug, Args, Clone)]
pub struct ComponentsArgs {
    /// Shared options.
    #[command(flatten)]
    pub run: RunArgs,

    /// Read the input as an edge list instead of an adjacency list.
    #[arg(long = "edge-list")]
    pub edge_list: bool,
}

/// Options accepted by the `matching` command.
#[derive(Debug, Args, Clone)]
pub struct MatchingArgs {
    /// Shared options.
    #[command(flatten)]
    pub run: RunArgs,

    /// Surviving edge count that a single task can match sequentially.
    #[arg(long = "memory-threshold", default_value_t = DEFAULT_MEMORY_THRESHOLD)]
    pub memory_threshold: u64,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The input file could not be opened or read.
    #[error("failed to read `{path}`: {source}")]
    Read {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// The output directory or file could not be written.
    #[error("failed to write `{path}`: {source}")]
    Write {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// Engine configuration or execution failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Summarises the outcome of executing a CLI command.
#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    /// Subcommand that ran.
    pub command: &'static str,
    /// File the result was written to.
    pub output: PathBuf,
    /// Number of lines written to [`ExecutionSummary::output`].
    pub records: usize,
    /// Total weight of the written edges, for edge-valued results.
    pub total_weight: Option<f64>,
    /// Round reports and counters collected by the engine.
    pub summary: RunSummary,
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when reading the input, running the engine or
/// writing the output fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use filtro_cli::cli::{Cli, Command, MstArgs, RunArgs, run_cli};
/// # use tempfile::TempDir;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let dir = TempDir::new()?;
/// let input = dir.path().join("edges.txt");
/// std::fs::write(&input, "1 2 1\n2 3 2\n1 3 5\n")?;
/// let cli = Cli {
///     command: Command::Mst(MstArgs {
///         run: RunArgs {
///             input,
///             output: dir.path().join("out"),
///             partitions: 2,
///             max_rounds: 5,
///             seed: 1,
///             attempts: 1,
///         },
///         threshold: 10,
///     }),
/// };
/// let summary = run_cli(cli)?;
/// assert_eq!(summary.records, 2);
/// assert_eq!(summary.total_weight, Some(3.0));
/// # Ok(())
/// # }
/// ```
#[instrument(name = "cli.run", err, skip(cli), fields(command = field::Empty))]
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    let command = cli.command.name();
    Span::current().record("command", field::display(command));
    let summary = match cli.command {
        Command::Mst(args) => run_mst(args)?,
        Command::Components(args) => run_components(args)?,
        Command::Matching(args) => run_matching(args)?,
        Command::WeightedMatching(args) => run_weighted_matching(args)?,
        Command::GreedyMatching(args) => run_greedy_matching(args)?,
    };
    info!(
        command,
        records = summary.records,
        rounds = summary.summary.rounds(),
        output = %summary.output.display(),
        "command completed"
    );
    Ok(summary)
}

#[instrument(
    name = "cli.mst",
    err,
    skip(args),
    fields(input = %args.run.input.display(), threshold = args.threshold),
)]
pub(super) fn run_mst(args: MstArgs) -> Result<ExecutionSummary, CliError> {
    let engine = args.run.builder().with_edge_threshold(args.threshold).build()?;
    let loaded = load_edges(&args.run.input)?;
    let mut run = engine.minimum_spanning_forest(&loaded.records)?;
    run.summary.add_malformed(loaded.malformed as u64);
    let total_weight = run.total_weight();
    let lines = run.edges.iter().map(format_mst_edge);
    let (output, records) = write_final(&args.run.output, lines)?;
    Ok(ExecutionSummary {
        command: "mst",
        output,
        records,
        total_weight: Some(total_weight),
        summary: run.summary,
    })
}

#[instrument(
    name = "cli.components",
    err,
    skip(args),
    fields(input = %args.run.input.display(), edge_list = args.edge_list),
)]
pub(super) fn run_components(args: ComponentsArgs) -> Result<ExecutionSummary, CliError> {
    let engine = args.run.builder().build()?;
    let loaded = if args.edge_list {
        let edges = load_edges(&args.run.input)?;
        LoadedAdjacency {
            records: adjacency_from_edges(&edges.records),
            malformed: edges.malformed,
        }
    } else {
        load_adjacency(&args.run.input)?
    };
    let mut run = engine.connected_components(&loaded.records)?;
    run.summary.add_malformed(loaded.malformed as u64);
    let lines = run.components.iter().map(|component| component.to_line());
    let (output, records) = write_final(&args.run.output, lines)?;
    Ok(ExecutionSummary {
        command: "components",
        output,
        records,
        total_weight: None,
        summary: run.summary,
    })
}

#[instrument(
    name = "cli.matching",
    err,
    skip(args),
    fields(input = %args.run.input.display(), memory_threshold = args.memory_threshold),
)]
pub(super) fn run_matching(args: MatchingArgs) -> Result<ExecutionSummary, CliError> {
    let engine = args
        .run
        .builder()
        .with_memory_threshold(args.memory_threshold)
        .build()?;
    let loaded = load_edges(&args.run.input)?;
    let run = engine.maximal_matching(&loaded.records)?;
    finish_matching("matching", &args.run, &loaded, run, format_matched_pair)
}

#[instrument(
    name = "cli.weighted_matching",
    err,
    skip(args),
    fields(input = %args.input.display())
)]
pub(super) fn run_weighted_matching(args: RunArgs) -> Result<ExecutionSummary, CliError> {
    let engine = args.builder().build()?;
    let loaded = load_edges(&args.input)?;
    let run = engine.weighted_matching(&loaded.records)?;
    finish_matching("weighted-matching", &args, &loaded, run, format_weighted_pair)
}

#[instrument(
    name = "cli.greedy_matching",
    err,
    skip(args),
    fields(input = %args.input.display())
)]
pub(super) fn run_greedy_matching(args: RunArgs) -> Result<ExecutionSummary, CliError> {
    let engine = args.builder().build()?;
    let loaded = load_edges(&args.input)?;
    let run = engine.greedy_matching(&loaded.records)?;
    finish_matching("greedy-matching", &args, &loaded, run, format_matched_pair)
}

fn finish_matching(
    command: &'static str,
    args: &RunArgs,
    loaded: &LoadedEdges,
    mut run: MatchingRun,
    format: fn(&Edge) -> String,
) -> Result<ExecutionSummary, CliError> {
    run.summary.add_malformed(loaded.malformed as u64);
    let total_weight = run.total_weight();
    let (output, records) = write_final(&args.output, run.pairs.iter().map(format))?;
    Ok(ExecutionSummary {
        command,
        output,
        records,
        total_weight: Some(total_weight),
        summary: run.summary,
    })
}

fn open_reader(path: &Path) -> Result<BufReader<File>, CliError> {
    let file = File::open(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

pub(super) fn load_edges(path: &Path) -> Result<LoadedEdges, CliError> {
    read_edges(open_reader(path)?).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

pub(super) fn load_adjacency(path: &Path) -> Result<LoadedAdjacency, CliError> {
    read_adjacency(open_reader(path)?).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes one line per item to `<dir>/final`, creating `dir` if needed.
pub(super) fn write_final(
    dir: &Path,
    lines: impl IntoIterator<Item = String>,
) -> Result<(PathBuf, usize), CliError> {
    let path = dir.join(FINAL_OUTPUT);
    let write_error = |source: io::Error| CliError::Write {
        path: path.clone(),
        source,
    };
    fs::create_dir_all(dir).map_err(write_error)?;
    let file = File::create(&path).map_err(write_error)?;
    let mut writer = BufWriter::new(file);
    let mut count = 0;
    for line in lines {
        writeln!(writer, "{line}").map_err(write_error)?;
        count += 1;
    }
    writer.flush().map_err(write_error)?;
    Ok((path, count))
}

/// Renders `summary` to `writer` in a human-readable text format.
///
/// Per-stage reports follow the totals as
/// `round<TAB>stage<TAB>input<TAB>output<TAB>elapsed_ms` lines.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    let run = &summary.summary;
    writeln!(writer, "command: {}", summary.command)?;
    writeln!(writer, "policy: {}", run.policy())?;
    writeln!(writer, "output: {}", summary.output.display())?;
    writeln!(writer, "records: {}", summary.records)?;
    if let Some(weight) = summary.total_weight {
        writeln!(writer, "total weight: {weight}")?;
    }
    writeln!(writer, "rounds: {}", run.rounds())?;
    if let Some(round) = run.converged_at() {
        writeln!(writer, "converged at: {round}")?;
    }
    writeln!(writer, "malformed: {}", run.malformed())?;
    writeln!(writer, "elapsed ms: {}", run.elapsed().as_millis())?;
    if let Some(average) = run.average_round_time() {
        writeln!(writer, "average round ms: {}", average.as_millis())?;
    }
    for report in run.reports() {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            report.round(),
            report.stage(),
            report.input_records(),
            report.output_records(),
            report.elapsed().as_millis()
        )?;
    }
    Ok(())
}
