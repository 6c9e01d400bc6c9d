use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ingest_client::{CancellationToken, Event, IngestClient, IngestClientConfig};

mod input;
mod observability;

use observability::LogFormat;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the client configuration file
    #[arg(long, env = "INGEST_CONFIG_FILE")]
    config_file: PathBuf,

    /// Sets the log format used for all logs.
    #[arg(long)]
    #[arg(value_enum)]
    #[clap(default_value_t = LogFormat::default())]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a JSON array of events in one request (`-` reads stdin)
    Batch { file: PathBuf },
    /// Submit a single event
    One { table: String, data: String },
    /// Submit a raw JSON payload to a table (`-` reads stdin)
    Table { table: String, file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    observability::setup_logs(args.log_format)?;

    let client = IngestClientConfig::load(&args.config_file)
        .and_then(IngestClientConfig::into_client)
        .with_context(|| {
            format!(
                "Failed to create client from `{}`",
                args.config_file.display()
            )
        })?;
    tracing::debug!(?client, "Created ingest client");

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Received Ctrl-C, cancelling request");
            ctrl_c_cancel.cancel();
        }
    });

    run(&client, args.command, &cancel).await
}

async fn run(
    client: &IngestClient,
    command: Command,
    cancel: &CancellationToken,
) -> anyhow::Result<ExitCode> {
    match command {
        Command::Batch { file } => {
            let events = input::parse_events(&input::read_input(&file)?)?;
            let errors = client
                .submit_batch(&events, cancel)
                .await
                .context("Batch submission failed")?;
            for (index, message) in &errors {
                tracing::error!(index, table_name = events[*index].table_name(), %message, "Event rejected");
            }
            tracing::info!(
                submitted = events.len(),
                rejected = errors.len(),
                "Batch submitted"
            );
            if errors.is_empty() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Command::One { table, data } => {
            let event = Event::new(table, input::parse_payload(&data)?)?;
            client
                .submit_one(&event, cancel)
                .await
                .context("Event submission failed")?;
            tracing::info!(table_name = event.table_name(), "Event submitted");
            Ok(ExitCode::SUCCESS)
        }
        Command::Table { table, file } => {
            let payload = input::parse_payload(&input::read_input(&file)?)?;
            client
                .submit_to_table(&table, &payload, cancel)
                .await
                .with_context(|| format!("Submission to `{table}` failed"))?;
            tracing::info!(table_name = %table, "Payload submitted");
            Ok(ExitCode::SUCCESS)
        }
    }
}
