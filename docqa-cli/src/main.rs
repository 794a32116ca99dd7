use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use docqa_cli::{Cli, EditorLineSource, SessionOutcome, build_pipeline, run_session};

// One thread of control: loading, embedding, and answering run in sequence.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    docqa_telemetry::init_telemetry(&cli.telemetry_config())?;

    let pipeline = build_pipeline(cli.rag_config()?)?;
    let mut source = EditorLineSource::new()?;
    let mut out = std::io::stdout();

    match run_session(&pipeline, &mut source, &mut out, cli.console_options()).await? {
        SessionOutcome::Completed => Ok(ExitCode::SUCCESS),
        SessionOutcome::Halted => Ok(ExitCode::FAILURE),
    }
}
