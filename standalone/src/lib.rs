//! Runs a MapReduce application inside a single process.
//!
//! The map phase runs every record in parallel and pushes the emitted
//! pairs into an in-memory grouping. Once every record is mapped, the
//! grouping is checked for completeness and each key group is handed to
//! the reduce function exactly once. Results are written to an output sink.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod engine;
pub mod input;
pub mod shuffle;
pub mod sink;

/// Default number of reduce partitions.
pub const DEFAULT_REDUCERS: u32 = 11;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a job to completion on this machine
    Submit {
        /// Glob spec for the input files
        #[arg(short, long)]
        input: String,

        /// Name of the workload
        #[arg(short, long, default_value = "wc")]
        workload: String,

        /// Output directory
        #[arg(short, long)]
        output: String,

        /// Number of reduce partitions (output files).
        #[arg(short = 'r', long, default_value_t = DEFAULT_REDUCERS)]
        reducers: u32,

        /// Worker threads. Defaults to one per core.
        #[arg(short, long)]
        threads: Option<usize>,

        /// Write a JSON summary of the run to this path.
        #[arg(long)]
        report: Option<PathBuf>,

        /// Auxiliary arguments to pass to the MapReduce application.
        #[clap(value_parser, last = true)]
        args: Vec<String>,
    },
}

/// A job description, resolved from the command line.
#[derive(Clone, Debug)]
pub struct Job {
    pub input: String,
    pub workload: String,
    pub output: String,
    pub args: Vec<String>,
    pub reducers: u32,
    pub threads: Option<usize>,
}

impl Job {
    /// A job with default parallelism and no auxiliary arguments.
    pub fn new(input: impl Into<String>, workload: impl Into<String>, output: impl Into<String>) -> Self {
        Job {
            input: input.into(),
            workload: workload.into(),
            output: output.into(),
            args: Vec::new(),
            reducers: DEFAULT_REDUCERS,
            threads: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_submit_with_defaults() {
        let args = Args::try_parse_from(["mrl-standalone", "submit", "-i", "in/*", "-o", "out"]).unwrap();
        let Commands::Submit {
            input,
            workload,
            output,
            reducers,
            threads,
            report,
            args,
        } = args.command;
        assert_eq!(input, "in/*");
        assert_eq!(workload, "wc");
        assert_eq!(output, "out");
        assert_eq!(reducers, DEFAULT_REDUCERS);
        assert!(threads.is_none());
        assert!(report.is_none());
        assert!(args.is_empty());
    }

    #[test]
    fn parses_trailing_aux_args() {
        let args = Args::try_parse_from([
            "mrl-standalone", "submit", "-i", "in", "-o", "out", "-r", "2", "-t", "4", "--", "--term", "fox",
        ])
        .unwrap();
        let Commands::Submit { reducers, threads, args, .. } = args.command;
        assert_eq!(reducers, 2);
        assert_eq!(threads, Some(4));
        assert_eq!(args, ["--term", "fox"]);
    }
}
