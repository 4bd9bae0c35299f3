//! triad: offline scoring, artifact maintenance and daemon control.

use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use serde_json::json;

use triad::artifact::{ChecksumTable, ModelManifest, compute_digest};
use triad::{ArtifactSource, ModelRegistry};

/// Triad CLI
#[derive(Parser)]
#[command(name = "triad")]
#[command(version = triad::long_version())]
#[command(about = "Triad risk scoring tools")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score one input against the active model, without a daemon
    Score {
        /// Input text (or omit to read from stdin)
        #[arg(long)]
        text: Option<String>,
        #[arg(long, env = "MODEL_DIR", default_value = "model_artifacts")]
        artifacts: PathBuf,
        #[arg(long, default_value_t = 0.0)]
        price: f64,
        #[arg(long, default_value_t = 0)]
        units: i64,
        #[arg(long, default_value = "direct")]
        channel: String,
    },

    /// Load the active model and print its metadata
    Inspect {
        #[arg(long, env = "MODEL_DIR", default_value = "model_artifacts")]
        artifacts: PathBuf,
    },

    /// Compute digests of every artifact the manifest references
    Checksums {
        #[arg(long, env = "MODEL_DIR", default_value = "model_artifacts")]
        artifacts: PathBuf,
        /// Replace the checksum table with the computed digests
        #[arg(long)]
        write: bool,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Check daemon health and readiness
    Health {
        #[arg(short, long, env = "TRIADD_URL", default_value = "http://127.0.0.1:8080")]
        address: String,
    },

    /// Show the daemon's active model
    Model {
        #[arg(short, long, env = "TRIADD_URL", default_value = "http://127.0.0.1:8080")]
        address: String,
    },

    /// Ask the daemon to reload its manifest
    Reload {
        #[arg(short, long, env = "TRIADD_URL", default_value = "http://127.0.0.1:8080")]
        address: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Score {
            text,
            artifacts,
            price,
            units,
            channel,
        } => {
            let text = resolve_text(text, "score")?;
            let registry = ModelRegistry::new(artifacts);
            let snapshot = registry.load()?;
            let result = triad::score(&text, price, units, &channel, &snapshot.rules)?;
            let out = json!({
                "model_version": snapshot.version,
                "artifact_checksum_sha256": snapshot.checksum,
                "score": result.score,
                "label": result.label,
                "reasons": result.reasons,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }

        Command::Inspect { artifacts } => {
            let registry = ModelRegistry::new(artifacts);
            registry.load()?;
            let info = registry.get_model_info()?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Command::Checksums {
            artifacts,
            write,
            yes,
        } => checksums(&artifacts, write, yes)?,

        Command::Health { address } => {
            let client = reqwest::Client::new();
            let health = get_json(&client, &format!("{address}/healthz")).await?;
            let ready = client.get(format!("{address}/readyz")).send().await?;
            println!("health: {}", health["status"].as_str().unwrap_or("unknown"));
            println!(
                "ready:  {}",
                if ready.status().is_success() { "yes" } else { "no" }
            );
        }

        Command::Model { address } => {
            let client = reqwest::Client::new();
            let info = get_json(&client, &format!("{address}/model")).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Command::Reload { address } => {
            let client = reqwest::Client::new();
            let response = client.post(format!("{address}/model/reload")).send().await?;
            let status = response.status();
            let body: serde_json::Value = response.json().await?;
            if !status.is_success() {
                return Err(format!("reload failed ({status}): {body}").into());
            }
            println!(
                "reloaded: {}",
                body["model_version"].as_str().unwrap_or("unknown")
            );
        }
    }

    Ok(())
}

/// Recompute artifact digests and optionally rewrite the checksum table.
fn checksums(artifacts: &Path, write: bool, yes: bool) -> Result<(), Box<dyn std::error::Error>> {
    let source = ArtifactSource::new(artifacts);
    let manifest = ModelManifest::from_file(&source.manifest_path())?;
    let checksums_path = source.checksums_path();
    let existing = if checksums_path.exists() {
        ChecksumTable::from_file(&checksums_path)?
    } else {
        ChecksumTable::new()
    };

    let mut table = ChecksumTable::new();
    for (version, file) in manifest.versions() {
        let digest = compute_digest(&artifacts.join(file))?;
        let status = match existing.expected(file) {
            None => "unrecorded",
            Some(expected) if expected.eq_ignore_ascii_case(&digest) => "ok",
            Some(_) => "MISMATCH",
        };
        println!("{version:<12} {file:<24} {digest}  {status}");
        table.insert(file, digest);
    }

    if !write {
        return Ok(());
    }
    if table == existing {
        println!("{} is up to date", checksums_path.display());
        return Ok(());
    }
    let confirmed = yes
        || Confirm::new()
            .with_prompt(format!("Overwrite {}?", checksums_path.display()))
            .default(false)
            .interact()?;
    if confirmed {
        table.save(&checksums_path)?;
        println!("wrote {} entries to {}", table.len(), checksums_path.display());
    }
    Ok(())
}

async fn get_json(
    client: &reqwest::Client,
    url: &str,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let response = client.get(url).send().await?;
    let status = response.status();
    let body: serde_json::Value = response.json().await?;
    if !status.is_success() {
        return Err(format!("{url} returned {status}: {body}").into());
    }
    Ok(body)
}

/// Resolve text input from an optional CLI argument and/or stdin.
///
/// - arg only → arg
/// - stdin only → stdin
/// - both → `"{arg}\n\n{stdin}"`
/// - neither → error
fn resolve_text(arg: Option<String>, command: &str) -> Result<String, Box<dyn std::error::Error>> {
    let stdin_text = if io::stdin().is_terminal() {
        None
    } else {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Some(buf.trim().to_string()).filter(|s| !s.is_empty())
    };

    match (arg, stdin_text) {
        (Some(a), Some(s)) => Ok(format!("{a}\n\n{s}")),
        (Some(a), None) => Ok(a),
        (None, Some(s)) => Ok(s),
        (None, None) => {
            Err(format!("{command}: no input provided (pass text as argument or via stdin)").into())
        }
    }
}
