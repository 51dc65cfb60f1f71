//! Command-line interface orchestration for filtro.
//!
//! Each command reads an edge or adjacency list, runs one engine policy and
//! writes the result to `<output>/final`.

mod commands;

pub use commands::{
    Cli, CliError, Command, ComponentsArgs, ExecutionSummary, FINAL_OUTPUT, MatchingArgs, MstArgs,
    RunArgs, render_summary, run_cli,
};

#[cfg(test)]
mod tests;
