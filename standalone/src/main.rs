use std::fs::File;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use standalone::engine::run_job;
use standalone::{Args, Commands, Job};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let Commands::Submit {
        input,
        workload,
        output,
        reducers,
        threads,
        report,
        args,
    } = Args::parse().command;

    let job = Job {
        input,
        workload,
        output,
        args,
        reducers,
        threads,
    };

    let job_report = run_job(&job)?;

    for failure in &job_report.failed_records {
        warn!("record {} skipped: {}", failure.record, failure.error);
    }
    for failure in &job_report.failed_keys {
        warn!("key `{}` has no result: {}", failure.key, failure.error);
    }
    info!(
        "wrote {} results for {} records to {}",
        job_report.results.len(),
        job_report.records,
        job.output
    );

    if let Some(path) = report {
        let file = File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, &job_report.summary())?;
    }

    Ok(())
}
