use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::{interval, Duration, MissedTickBehavior}; // Only for the loop driver
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::action::ActionCommand;
use super::aggregator::{AggregateSignal, Rejected, RollingAggregator};
use super::classifier::{classify, CompanionState};
use super::event::Event;
use super::policy::{Decision, PolicyEngine};
use super::scheduler::TickGate;
use super::telemetry::event::{DropReason, InteractionLabel, TelemetryEvent};
use super::telemetry::recorder::TelemetryRecorder;
use super::time::{is_night, Clock, Tick, WallTime};
use crate::config::CompanionConfig;
use crate::error::ConfigError;

/// What the driver hands to the action sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SideEffect {
    Action(ActionCommand),
    StateChanged { from: CompanionState, to: CompanionState },
}

/// Owns the whole decision loop: aggregator, classifier config and the
/// policy engine with its private state. One instance per process; nothing
/// else mutates it.
pub struct Reactor {
    config: CompanionConfig,
    aggregator: RollingAggregator,
    policy: PolicyEngine,
    telemetry: TelemetryRecorder,
    tick: Tick,
    state: CompanionState,
    last_signal: AggregateSignal,
}

impl Reactor {
    pub fn new(config: CompanionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            aggregator: RollingAggregator::new(&config.sensing),
            policy: PolicyEngine::new(config.policy.clone()),
            telemetry: TelemetryRecorder::new(),
            tick: Tick::new(),
            state: CompanionState::default(),
            last_signal: AggregateSignal::default(),
            config,
        })
    }

    pub fn config(&self) -> &CompanionConfig {
        &self.config
    }

    // Read-only views. Every mutation goes through `tick_step`.

    pub fn aggregator(&self) -> &RollingAggregator {
        &self.aggregator
    }

    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    pub fn telemetry(&self) -> &TelemetryRecorder {
        &self.telemetry
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn state(&self) -> CompanionState {
        self.state
    }

    pub fn last_signal(&self) -> &AggregateSignal {
        &self.last_signal
    }

    /// Pure tick step: applies queued events in arrival order, then senses,
    /// classifies and decides once. Returns side effects for the driver.
    /// MUST NOT await I/O or timers.
    pub fn tick_step(&mut self, now: WallTime, events: Vec<Event>) -> Vec<SideEffect> {
        self.tick = self.tick.next();
        let mut effects = Vec::new();

        // === 1. DAY ===
        if self.policy.roll_day(now) {
            info!("Local day rolled over at tick {}", self.tick.frame);
            self.telemetry.record(TelemetryEvent::DayRollover { tick: self.tick });
        }

        // === 2. APPLY (arrival order, no coalescing) ===
        let night = is_night(now, self.config.sensing.night_start_hour, self.config.sensing.night_end_hour);
        for event in events {
            match event {
                Event::Sample(sample) => {
                    if let Err(rejected) = self.aggregator.ingest(&sample) {
                        let reason = match rejected {
                            Rejected::Malformed(err) => {
                                warn!("Dropping malformed sample: {}", err);
                                DropReason::MalformedSample
                            }
                            Rejected::OutOfOrder => DropReason::OutOfOrderSample,
                        };
                        self.telemetry.record(TelemetryEvent::InputDropped { reason });
                    }
                }
                Event::Interaction(interaction) => {
                    let applied = self.policy.handle_interaction(&interaction);
                    debug!("Interaction {} applied={}", interaction.kind.label(), applied);
                    self.telemetry.record(TelemetryEvent::Interaction {
                        kind: InteractionLabel::from(&interaction.kind),
                        applied,
                    });
                }
                Event::Trigger(trigger) => {
                    let command = self.policy.force(&trigger, now, night);
                    info!("Manual {} emitted", command.action.label());
                    self.telemetry.record(TelemetryEvent::ActionEmitted {
                        action: command.action,
                        forced: true,
                        tick: self.tick,
                    });
                    effects.push(SideEffect::Action(command));
                }
            }
        }

        // === 3. SENSE ===
        let signal = self.aggregator.snapshot(now);
        self.last_signal = signal;

        // === 4. CLASSIFY ===
        let state = classify(&signal, &self.config.classifier);
        if state != self.state {
            info!("State {:?} -> {:?} (switches={}, social={}, idle={:.0}s)",
                self.state, state, signal.switch_rate_2m, signal.social_hits_3m, signal.idle_sec);
            self.telemetry.record(TelemetryEvent::StateTransition {
                from: self.state,
                to: state,
                tick: self.tick,
            });
            effects.push(SideEffect::StateChanged { from: self.state, to: state });
            self.state = state;
        }

        // === 5. DECIDE ===
        match self.policy.evaluate(state, now, signal.is_night) {
            Decision::Emit(command) => {
                info!("Emitting {} (daily {})", command.action.label(), self.policy.state().daily_count);
                self.telemetry.record(TelemetryEvent::ActionEmitted {
                    action: command.action,
                    forced: false,
                    tick: self.tick,
                });
                effects.push(SideEffect::Action(command));
            }
            Decision::Suppressed { action, reason } => {
                debug!("{} suppressed: {:?}", action.label(), reason);
                self.telemetry.record(TelemetryEvent::ActionSuppressed { action, reason });
            }
            Decision::Steady => {}
        }

        effects
    }

    /// Async driver loop. Events from every source share `inbox`, so ticks
    /// and interactions are serialized. Returns on cancellation, when the
    /// sink goes away, or once the inbox is closed and drained.
    pub async fn run<C: Clock>(
        &mut self,
        mut inbox: mpsc::Receiver<Event>,
        outbox: mpsc::Sender<SideEffect>,
        mut gate: TickGate,
        clock: C,
        cancel: CancellationToken,
    ) {
        info!("Reactor started. Tick: {}ms", self.config.tick.interval_ms);

        let mut cadence = interval(Duration::from_millis(self.config.tick.interval_ms));
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut gate_alive = true;

        loop {
            let running = gate.is_running();

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Reactor shutting down at tick {}", self.tick.frame);
                    break;
                }
                alive = gate.changed(), if gate_alive => {
                    if !alive {
                        // Controller dropped; keep the last requested mode.
                        gate_alive = false;
                    } else if gate.is_running() {
                        info!("Tick scheduler resumed");
                        cadence.reset();
                    } else {
                        info!("Tick scheduler paused");
                    }
                }
                _ = cadence.tick(), if running => {
                    // Drain everything that arrived since the last tick
                    let mut events = Vec::new();
                    let mut closed = false;
                    loop {
                        match inbox.try_recv() {
                            Ok(event) => events.push(event),
                            Err(TryRecvError::Empty) => break,
                            Err(TryRecvError::Disconnected) => {
                                closed = true;
                                break;
                            }
                        }
                    }

                    let effects = self.tick_step(clock.now(), events);
                    for effect in effects {
                        if outbox.send(effect).await.is_err() {
                            warn!("Action sink closed; stopping reactor");
                            return;
                        }
                    }

                    if closed {
                        info!("Inbox closed; reactor stopping after final tick");
                        break;
                    }
                }
            }
        }
    }
}
