//! Rebus binary.
//!
//! Drives the dispatch core over stdin/stdout: one JSON interaction per input
//! line, one JSON platform call per output line. `{"reload": true}` reloads
//! the handlers. Logs go to stderr unless the config names another sink.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

use rebus::core::Interaction;
use rebus::framework::{LinkedSource, SourceSet};
use rebus::puzzle::{InMemoryPuzzleStore, PuzzleStore, setup_source};
use rebus::runtime::config::LogOutput;
use rebus::runtime::{ConfigLoader, Rebus, shutdown_signal};
use rebus::stdio::StdioPlatform;

#[derive(Parser, Debug)]
#[command(name = "rebus")]
#[command(about = "Daily emoji puzzle bot, driven by JSON lines on stdio")]
struct Args {
    /// Configuration file to load instead of `rebus.toml`
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Configuration profile (overrides REBUS_PROFILE)
    #[arg(short, long, value_name = "NAME")]
    profile: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Control {
    reload: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Inbound {
    Control(Control),
    Interaction(Box<Interaction>),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new().with_current_dir();
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    if let Some(profile) = args.profile {
        loader = loader.profile(profile);
    }
    let mut config = loader.load().context("failed to load configuration")?;
    // stdout carries the platform output
    if config.logging.output == LogOutput::Stdout {
        config.logging.output = LogOutput::Stderr;
    }

    let store: Arc<dyn PuzzleStore> = Arc::new(InMemoryPuzzleStore::new());
    let source = SourceSet::new()
        .with(LinkedSource::new())
        .with(setup_source(config.bot.dev_scope_ids.clone()));
    let (platform, mut out) = StdioPlatform::new();
    let puzzle = config.puzzle;

    let rebus = Rebus::builder()
        .config(config)
        .platform(Arc::new(platform))
        .source(Arc::new(source))
        .service::<dyn PuzzleStore>(Arc::clone(&store))
        .service(Arc::new(puzzle))
        .build()
        .context("failed to boot")?;

    rebus.on_shutdown(move || async move { store.close().await });

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = out.recv().await {
            let written = async {
                stdout.write_all(line.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await
            };
            if let Err(e) = written.await {
                error!(error = %e, "Failed to write output");
                break;
            }
        }
    });

    rebus
        .run_until(async {
            tokio::select! {
                _ = read_input(&rebus) => {}
                _ = shutdown_signal() => {}
            }
        })
        .await;

    drop(rebus);
    writer.await.context("output writer panicked")?;
    Ok(())
}

async fn read_input(rebus: &Rebus) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("Input closed, shutting down");
                return;
            }
            Err(e) => {
                error!(error = %e, "Failed to read input");
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Inbound>(&line) {
            Ok(Inbound::Control(Control { reload: true })) => {
                let report = rebus.reload().await;
                info!(?report, "Operator reload finished");
            }
            Ok(Inbound::Control(_)) => {}
            Ok(Inbound::Interaction(interaction)) => {
                drop(rebus.handle(*interaction));
            }
            Err(e) => warn!(error = %e, "Ignoring malformed input line"),
        }
    }
}
