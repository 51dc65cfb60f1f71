//! Unit tests for the CLI commands and their file handling.

use super::commands::{load_edges, run_mst, write_final};
use super::{
    Cli, CliError, Command, ComponentsArgs, ExecutionSummary, FINAL_OUTPUT, MatchingArgs,
    MstArgs, RunArgs, render_summary, run_cli,
};

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;
use filtro_core::{EngineError, Policy};
use filtro_test_support::tracing::RecordingLayer;
use rstest::{fixture, rstest};
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const FOUR_VERTEX_GRAPH: &str = "1 2 1\n2 3 2\n3 4 1\n1 4 4\n2 4 3\n";

#[fixture]
fn dir() -> TempDir {
    match TempDir::new() {
        Ok(dir) => dir,
        Err(err) => panic!("failed to create temp dir: {err}"),
    }
}

fn write_input(dir: &TempDir, name: &str, contents: &str) -> io::Result<PathBuf> {
    let path = dir.path().join(name);
    fs::write(&path, contents)?;
    Ok(path)
}

fn run_args(input: PathBuf, output: &Path) -> RunArgs {
    RunArgs {
        input,
        output: output.to_path_buf(),
        partitions: 3,
        max_rounds: 20,
        seed: 11,
        attempts: 1,
    }
}

fn read_final(summary: &ExecutionSummary) -> io::Result<String> {
    fs::read_to_string(&summary.output)
}

fn run_cli_expecting_error(cli: Cli, panic_msg: &str) -> CliError {
    match run_cli(cli) {
        Ok(_) => panic!("{panic_msg}"),
        Err(err) => err,
    }
}

#[rstest]
fn mst_writes_the_spanning_forest(dir: TempDir) -> TestResult {
    let input = write_input(&dir, "edges.txt", FOUR_VERTEX_GRAPH)?;
    let out = dir.path().join("out");
    let summary = run_cli(Cli {
        command: Command::Mst(MstArgs {
            run: run_args(input, &out),
            threshold: 100,
        }),
    })?;

    assert_eq!(summary.output, out.join(FINAL_OUTPUT));
    assert_eq!(read_final(&summary)?, "1\t2 1\n3\t4 1\n2\t3 2\n");
    assert_eq!(summary.records, 3);
    assert_eq!(summary.total_weight, Some(4.0));
    assert_eq!(summary.summary.policy(), Policy::Threshold);
    Ok(())
}

#[rstest]
fn malformed_lines_are_counted_not_fatal(dir: TempDir) -> TestResult {
    let input = write_input(
        &dir,
        "edges.txt",
        "# header\n\n1 2 1\n1 2 heavy\n2 3 4 5\n2 3 2\n",
    )?;
    let summary = run_mst(MstArgs {
        run: run_args(input, &dir.path().join("out")),
        threshold: 100,
    })?;
    assert_eq!(summary.summary.malformed(), 2);
    assert_eq!(summary.records, 2);
    Ok(())
}

#[rstest]
#[case::adjacency(false, "1\t2\n2\t1,3\n3\t2\n7\t8\n8\t7\n", "1\t2,3\n7\t8\n")]
#[case::edge_list(true, "1 2\n2 3\n3 4\n4 5\n", "1\t2,3,4,5\n")]
fn components_write_one_line_per_component(
    dir: TempDir,
    #[case] edge_list: bool,
    #[case] contents: &str,
    #[case] expected: &str,
) -> TestResult {
    let input = write_input(&dir, "graph.txt", contents)?;
    let summary = run_cli(Cli {
        command: Command::Components(ComponentsArgs {
            run: run_args(input, &dir.path().join("out")),
            edge_list,
        }),
    })?;
    assert_eq!(read_final(&summary)?, expected);
    assert!(summary.summary.converged_at().is_some());
    assert_eq!(summary.total_weight, None);
    Ok(())
}

#[rstest]
fn matching_writes_disjoint_pairs(dir: TempDir) -> TestResult {
    let edges: String = (1..40).map(|v| format!("{v},{}\n", v + 1)).collect();
    let input = write_input(&dir, "path.txt", &edges)?;
    let mut run = run_args(input, &dir.path().join("out"));
    run.max_rounds = 100;
    let summary = run_cli(Cli {
        command: Command::Matching(MatchingArgs {
            run,
            memory_threshold: 5,
        }),
    })?;

    let text = read_final(&summary)?;
    let mut seen = HashSet::new();
    for line in text.lines() {
        let (u, v) = line.split_once(',').expect("pairs are comma separated");
        assert!(seen.insert(u.to_owned()), "{u} matched twice");
        assert!(seen.insert(v.to_owned()), "{v} matched twice");
    }
    assert_eq!(text.lines().count(), summary.records);
    assert_eq!(summary.summary.policy(), Policy::SamplingThreshold);
    Ok(())
}

#[rstest]
fn weighted_matching_skips_non_positive_weights(dir: TempDir) -> TestResult {
    let input = write_input(&dir, "weighted.txt", "1 2 0\n3 4 2\n4 5 3\n")?;
    let summary = run_cli(Cli {
        command: Command::WeightedMatching(run_args(input, &dir.path().join("out"))),
    })?;
    assert_eq!(read_final(&summary)?, "3\t4\t2\n");
    assert_eq!(summary.summary.malformed(), 1);
    Ok(())
}

#[rstest]
fn greedy_matching_is_reproducible(dir: TempDir) -> TestResult {
    let input = write_input(&dir, "edges.txt", FOUR_VERTEX_GRAPH)?;
    let first = run_cli(Cli {
        command: Command::GreedyMatching(run_args(input.clone(), &dir.path().join("a"))),
    })?;
    let second = run_cli(Cli {
        command: Command::GreedyMatching(run_args(input, &dir.path().join("b"))),
    })?;
    assert_eq!(read_final(&first)?, read_final(&second)?);
    assert!(first.records >= 1);
    Ok(())
}

#[rstest]
fn zero_partitions_are_rejected(dir: TempDir) -> TestResult {
    let input = write_input(&dir, "edges.txt", FOUR_VERTEX_GRAPH)?;
    let mut run = run_args(input, &dir.path().join("out"));
    run.partitions = 0;
    let err = run_cli_expecting_error(
        Cli {
            command: Command::GreedyMatching(run),
        },
        "zero partitions must fail",
    );
    assert!(matches!(
        err,
        CliError::Engine(EngineError::InvalidPartitions { got: 0 })
    ));
    Ok(())
}

#[rstest]
fn unmet_threshold_surfaces_non_convergence(dir: TempDir) -> TestResult {
    let input = write_input(&dir, "edges.txt", FOUR_VERTEX_GRAPH)?;
    let mut run = run_args(input, &dir.path().join("out"));
    run.max_rounds = 2;
    let err = run_cli_expecting_error(
        Cli {
            command: Command::Mst(MstArgs { run, threshold: 0 }),
        },
        "a zero threshold cannot be met",
    );
    assert!(matches!(
        err,
        CliError::Engine(EngineError::NonConvergence {
            policy: Policy::Threshold,
            rounds: 2,
        })
    ));
    assert!(!dir.path().join("out").join(FINAL_OUTPUT).exists());
    Ok(())
}

#[rstest]
fn missing_input_is_a_read_error(dir: TempDir) {
    let path = dir.path().join("absent.txt");
    let err = match load_edges(&path) {
        Ok(_) => panic!("missing file must fail"),
        Err(err) => err,
    };
    match err {
        CliError::Read { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[rstest]
fn output_into_a_file_path_is_a_write_error(dir: TempDir) -> TestResult {
    let blocker = write_input(&dir, "blocker", "")?;
    let err = match write_final(&blocker, vec!["1,2".to_owned()]) {
        Ok(_) => panic!("a file cannot hold the output directory"),
        Err(err) => err,
    };
    assert!(matches!(err, CliError::Write { .. }));
    Ok(())
}

#[rstest]
fn render_summary_reports_totals_and_stages(dir: TempDir) -> TestResult {
    let input = write_input(&dir, "edges.txt", FOUR_VERTEX_GRAPH)?;
    let summary = run_mst(MstArgs {
        run: run_args(input, &dir.path().join("out")),
        threshold: 100,
    })?;
    let mut buffer = Vec::new();
    render_summary(&summary, &mut buffer)?;
    let text = String::from_utf8(buffer)?;
    assert!(text.contains("command: mst"));
    assert!(text.contains("policy: threshold"));
    assert!(text.contains("records: 3"));
    assert!(text.contains("total weight: 4"));
    assert!(text.contains("rounds: 1"));
    assert!(text.contains("malformed: 0"));
    assert!(text.contains("1\tmst.local\t5\t"));
    assert!(text.contains("1\tmst.merge\t"));
    Ok(())
}

#[rstest]
fn run_cli_records_the_command_span(dir: TempDir) -> TestResult {
    let (layer, _guard) = RecordingLayer::install();
    let input = write_input(&dir, "edges.txt", FOUR_VERTEX_GRAPH)?;
    run_cli(Cli {
        command: Command::WeightedMatching(run_args(input, &dir.path().join("out"))),
    })?;

    let spans = layer.spans_named("cli.run");
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].fields.get("command").map(String::as_str), Some("weighted-matching"));
    assert_eq!(layer.events_with_message("command completed").len(), 1);
    Ok(())
}

#[rstest]
#[case::weighted(&["filtro", "weighted-matching", "in", "out", "--seed", "7"], true)]
#[case::mst_threshold(&["filtro", "mst", "in", "out", "--threshold", "3"], true)]
#[case::components_edge_list(&["filtro", "components", "in", "out", "--edge-list"], true)]
#[case::missing_output(&["filtro", "mst", "in"], false)]
#[case::threshold_is_mst_only(&["filtro", "matching", "in", "out", "--threshold", "3"], false)]
#[case::negative_partitions(
    &["filtro", "greedy-matching", "in", "out", "--partitions", "-1"],
    false
)]
fn clap_accepts_documented_flags(#[case] args: &[&str], #[case] accepted: bool) {
    assert_eq!(Cli::try_parse_from(args).is_ok(), accepted);
}
