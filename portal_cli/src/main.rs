use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use portal_proto::{classify_feed_line, decode_update_json, encode_change_set_json, FeedLine};
use tracing::{debug, info, warn};

mod client;

use client::{PushOutcome, StatusClient};

#[derive(Parser, Debug)]
#[command(author, version, about = "Portal status command-line client", long_about = None)]
struct Cli {
    /// Base URL of the portal server.
    #[arg(long, default_value = "http://127.0.0.1:5050")]
    endpoint: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the rendered portal status.
    Status {
        /// Use the legacy list-of-resonators format.
        #[arg(long)]
        legacy: bool,
    },
    /// Print the controlling faction.
    Faction,
    /// Print the portal health.
    Health,
    /// Print the portal level.
    Level,
    /// Print the server's update counters.
    Metrics,
    /// Send one update. Prefix with `@` to read the payload from a file.
    Push { payload: String },
    /// Send every update line of a feed file, honoring `delay` hints.
    Replay {
        file: PathBuf,
        /// Milliseconds to wait between updates.
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let client = StatusClient::new(&cli.endpoint);

    match cli.command {
        Command::Status { legacy } => println!("{}", client.status(legacy).await?),
        Command::Faction => println!("{}", client.get_text("/status/faction").await?),
        Command::Health => println!("{}", client.get_text("/status/health").await?),
        Command::Level => println!("{}", client.get_text("/status/level").await?),
        Command::Metrics => println!("{}", client.get_text("/status/metrics").await?),
        Command::Push { payload } => {
            let payload = read_payload(&payload).await?;
            let update = decode_update_json(&payload).wrap_err("update payload is not valid JSON")?;
            report(client.push(&update).await?)?;
        }
        Command::Replay { file, interval_ms } => {
            replay(&client, &file, Duration::from_millis(interval_ms)).await?;
        }
    }
    Ok(())
}

async fn read_payload(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .wrap_err_with(|| format!("reading payload from {path}")),
        None => Ok(arg.to_string()),
    }
}

fn report(outcome: PushOutcome) -> Result<()> {
    match outcome {
        PushOutcome::Changed(changes) => {
            println!("{}", encode_change_set_json(&changes).wrap_err("encoding change set")?);
        }
        PushOutcome::Unchanged => println!("no change"),
        PushOutcome::Rejected { status, reason } => {
            return Err(eyre!("update rejected ({status}): {reason}"));
        }
    }
    Ok(())
}

async fn replay(client: &StatusClient, file: &Path, interval: Duration) -> Result<()> {
    let contents = tokio::fs::read_to_string(file)
        .await
        .wrap_err_with(|| format!("reading feed {}", file.display()))?;

    let mut sent = 0usize;
    for (index, line) in contents.lines().enumerate() {
        let line_number = index + 1;
        let payload = match classify_feed_line(line) {
            FeedLine::Blank | FeedLine::Comment => continue,
            FeedLine::Update(payload) => payload,
        };
        let update = match decode_update_json(payload) {
            Ok(update) => update,
            Err(err) => {
                warn!(line_number, error = %err, "replay.line_skipped");
                continue;
            }
        };

        match client.push(&update).await? {
            PushOutcome::Changed(changes) => {
                info!(
                    line_number,
                    resonators = changes.resonators.len(),
                    level = ?changes.level,
                    "replay.changed"
                );
            }
            PushOutcome::Unchanged => debug!(line_number, "replay.unchanged"),
            PushOutcome::Rejected { status, reason } => {
                warn!(line_number, %status, %reason, "replay.rejected");
            }
        }
        sent += 1;

        let pause = interval + update.delay_hint();
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    println!("replayed {sent} updates from {}", file.display());
    Ok(())
}
