//! CLI front end for the `statemap` library: ingests a trace file and
//! writes each emitted record to stdout as newline-delimited JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use statemap::{IngestConfig, Record, Statemap};

#[derive(Parser)]
#[command(name = "statemap", about = "Coalesce an entity state trace into a bounded set of rectangles")]
struct Cli {
    /// Path to a trace file: a metadata blob followed by concatenated
    /// JSON data blobs.
    trace: PathBuf,

    #[command(flatten)]
    config: IngestConfig,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut statemap = Statemap::create(cli.config);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let result = statemap.ingest(&cli.trace, |record: Record| {
        if let Err(e) = serde_json::to_writer(&mut out, &record) {
            tracing::error!(error = %e, "failed to write record");
            return;
        }
        use std::io::Write;
        let _ = out.write_all(b"\n");
    });

    match result {
        Ok(ncoalesced) => {
            let counters = statemap.counters();
            tracing::info!(
                ncoalesced,
                nevents = counters.nevents,
                nelisions = counters.nelisions,
                "ingest complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("statemap: {e}");
            ExitCode::FAILURE
        }
    }
}
