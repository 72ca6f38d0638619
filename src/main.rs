use anyhow::Context;
use clap::Parser;
use serde_json::Value;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use sysrules::{Engine, EngineConfig, JsonAccessor};

#[derive(Parser)]
#[command(name = "sysrules")]
#[command(about = "Evaluate detection rules against JSON events read from stdin", long_about = None)]
struct Cli {
    /// Rule files or directories, loaded in order
    #[arg(short, long, num_args = 1..)]
    rules: Vec<PathBuf>,

    /// YAML engine configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print alerts as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    config.rules_files.extend(cli.rules);
    config.json_output |= cli.json;
    if config.rules_files.is_empty() {
        anyhow::bail!("No rule files given; pass --rules or set rules_files in the config");
    }

    let engine = Engine::new(config).await?;
    let registry = engine.registry();
    eprintln!(
        "Loaded {} rules ({} active, {} failed declarations)",
        registry.len(),
        registry.active_len(),
        engine.load_errors().len()
    );

    let json_output = engine.config().json_output;
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for (line_no, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: Value = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Skipping line {}: {}", line_no + 1, e);
                continue;
            }
        };

        for alert in engine.process_event(&JsonAccessor, &event) {
            let time = chrono::Utc::now().to_rfc3339();
            if json_output {
                let record = serde_json::json!({
                    "time": time,
                    "rule": alert.rule,
                    "priority": alert.priority,
                    "output": alert.output,
                });
                writeln!(stdout, "{}", serde_json::to_string(&record)?)?;
            } else {
                writeln!(stdout, "{} {}: {}", time, alert.priority, alert.output)?;
            }
        }
    }

    Ok(())
}
