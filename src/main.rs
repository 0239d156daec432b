use anyhow::{Context, Result};
use companion::kernel::scheduler::tick_scheduler;
use companion::kernel::time::LocalClock;
use companion::kernel::wire::{parse_line, Inbound};
use companion::{CompanionConfig, Reactor, SideEffect};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Live host: JSON lines in on stdin, side effects out on stdout.
/// Logs go to stderr so stdout stays machine-readable.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = load_config()?;
    tracing::info!("Companion kernel booting (tick {}ms)", config.tick.interval_ms);

    let mut reactor = Reactor::new(config).context("invalid companion config")?;

    let (event_tx, event_rx) = mpsc::channel(256);
    let (effect_tx, mut effect_rx) = mpsc::channel::<SideEffect>(64);
    let (scheduler, gate) = tick_scheduler();
    let cancel = CancellationToken::new();

    // Ctrl+C
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received");
            shutdown.cancel();
        }
    });

    // Inbound: stdin -> kernel queue. Pause/resume never enter the queue.
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(&line) {
                Ok(Inbound::Event(event)) => {
                    if event_tx.send(event).await.is_err() {
                        break;
                    }
                }
                Ok(Inbound::Pause) => scheduler.pause(),
                Ok(Inbound::Resume) => scheduler.resume(),
                Err(e) => tracing::warn!("Dropping inbound line: {}", e),
            }
        }
        tracing::info!("Input stream closed");
    });

    // Outbound: side effects -> stdout
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(effect) = effect_rx.recv().await {
            match serde_json::to_string(&effect) {
                Ok(json) => {
                    let line = format!("{json}\n");
                    if let Err(e) = write_line(&mut stdout, line.as_bytes()).await {
                        tracing::warn!("Stdout closed: {}", e);
                        break;
                    }
                }
                Err(e) => tracing::warn!("Failed to encode side effect: {}", e),
            }
        }
    });

    reactor.run(event_rx, effect_tx, gate, LocalClock, cancel).await;
    writer.await.context("stdout writer task failed")?;

    let snap = reactor.telemetry().snapshot();
    tracing::info!(
        "Session: {} automatic / {} forced emissions, {} transitions ({} older events rotated out)",
        snap.emission_stats.automatic,
        snap.emission_stats.forced,
        snap.transitions,
        reactor.telemetry().overwritten()
    );
    Ok(())
}

async fn write_line<W: AsyncWrite + Unpin>(out: &mut W, line: &[u8]) -> std::io::Result<()> {
    out.write_all(line).await?;
    out.flush().await
}

fn load_config() -> Result<CompanionConfig> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("COMPANION_CONFIG").ok());

    match path {
        Some(path) => CompanionConfig::from_path(&path)
            .with_context(|| format!("failed to load config {path}")),
        None => {
            tracing::info!("No config given; using defaults");
            Ok(CompanionConfig::default())
        }
    }
}
