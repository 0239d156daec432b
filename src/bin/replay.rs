use std::fs::File;
use std::io::{BufRead, BufReader};

use anyhow::{bail, Context, Result};
use companion::kernel::event::Event;
use companion::kernel::time::WallTime;
use companion::kernel::wire::{parse_line, Inbound};
use companion::{CompanionConfig, Reactor};
use tracing_subscriber::EnvFilter;

/// Deterministic replay of a recorded JSON-lines session.
///
/// Virtual time follows sample timestamps: every sample closes one tick, and
/// interactions/triggers seen since the previous sample are applied first, in
/// file order.
///
/// Usage: companion-replay <session.jsonl> [config.json]
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(session) = args.next() else {
        bail!("usage: companion-replay <session.jsonl> [config.json]");
    };
    let config = match args.next() {
        Some(path) => CompanionConfig::from_path(&path).with_context(|| format!("failed to load config {path}"))?,
        None => CompanionConfig::default(),
    };

    let file = File::open(&session).with_context(|| format!("failed to open {session}"))?;
    let mut reactor = Reactor::new(config)?;

    let mut pending: Vec<Event> = Vec::new();
    let mut now: Option<WallTime> = None;
    let mut paused = false;

    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", lineno + 1))?;
        if line.trim().is_empty() {
            continue;
        }

        let inbound = match parse_line(&line) {
            Ok(inbound) => inbound,
            Err(e) => {
                tracing::warn!("line {}: {}", lineno + 1, e);
                continue;
            }
        };

        match inbound {
            Inbound::Pause => paused = true,
            Inbound::Resume => paused = false,
            Inbound::Event(event) => {
                let tick_at = match &event {
                    Event::Sample(sample) => Some(sample.ts),
                    _ => None,
                };
                pending.push(event);

                if let Some(ts) = tick_at {
                    // Virtual time never runs backwards; the aggregator drops stale samples itself.
                    let t = now.map_or(ts, |prev| prev.max(ts));
                    now = Some(t);
                    if !paused {
                        emit(&mut reactor, t, std::mem::take(&mut pending))?;
                    }
                }
            }
        }
    }

    if let Some(t) = now {
        if !pending.is_empty() {
            emit(&mut reactor, t, pending)?;
        }
    }

    let snap = reactor.telemetry().snapshot();
    eprintln!(
        "replayed {} ticks: {} automatic, {} forced, {} transitions, suppressed cooldown={} cap={} chat={}",
        reactor.tick().frame,
        snap.emission_stats.automatic,
        snap.emission_stats.forced,
        snap.transitions,
        snap.suppression_stats.cooldown,
        snap.suppression_stats.daily_cap,
        snap.suppression_stats.chat_open,
    );
    Ok(())
}

fn emit(reactor: &mut Reactor, now: WallTime, events: Vec<Event>) -> Result<()> {
    for effect in reactor.tick_step(now, events) {
        println!("{}", serde_json::to_string(&effect)?);
    }
    Ok(())
}
