use std::time::Duration;

use chrono::NaiveDate;
use companion::kernel::action::Action;
use companion::kernel::event::{Event, ManualTrigger};
use companion::kernel::scheduler::tick_scheduler;
use companion::kernel::time::{FixedClock, WallTime};
use companion::{CompanionConfig, Reactor, SideEffect};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

fn noon() -> WallTime {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap().and_hms_opt(12, 0, 0).unwrap()
}

fn fast_reactor() -> Reactor {
    let mut config = CompanionConfig::default();
    config.tick.interval_ms = 10;
    Reactor::new(config).unwrap()
}

#[tokio::test]
async fn test_trigger_flows_to_outbox() {
    let mut reactor = fast_reactor();
    let (tx, inbox) = mpsc::channel(16);
    let (outbox, mut out_rx) = mpsc::channel(16);
    let (_handle, gate) = tick_scheduler();
    let cancel = CancellationToken::new();

    let task = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            reactor.run(inbox, outbox, gate, FixedClock(noon()), cancel).await;
            reactor
        }
    });

    tx.send(Event::Trigger(ManualTrigger::new(Action::Approach))).await.unwrap();

    let effect = timeout(Duration::from_secs(1), out_rx.recv())
        .await
        .expect("effect within a few ticks")
        .expect("outbox open");
    match effect {
        SideEffect::Action(cmd) => {
            assert_eq!(cmd.action, Action::Approach);
            assert!(cmd.forced);
            assert_eq!(cmd.ts, noon());
        }
        other => panic!("unexpected effect {:?}", other),
    }

    cancel.cancel();
    let reactor = timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
    assert!(reactor.tick().frame >= 1);
    assert_eq!(reactor.policy().state().daily_count, 1);
}

#[tokio::test]
async fn test_paused_scheduler_holds_events_until_resume() {
    let mut reactor = fast_reactor();
    let (tx, inbox) = mpsc::channel(16);
    let (outbox, mut out_rx) = mpsc::channel(16);
    let (handle, gate) = tick_scheduler();
    let cancel = CancellationToken::new();

    handle.pause();
    assert!(!handle.is_running());

    let task = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            reactor.run(inbox, outbox, gate, FixedClock(noon()), cancel).await;
            reactor
        }
    });

    tx.send(Event::Trigger(ManualTrigger::new(Action::Retreat))).await.unwrap();
    assert!(
        timeout(Duration::from_millis(100), out_rx.recv()).await.is_err(),
        "No tick while paused"
    );

    handle.resume();
    let effect = timeout(Duration::from_secs(1), out_rx.recv()).await.unwrap().unwrap();
    assert!(matches!(effect, SideEffect::Action(cmd) if cmd.action == Action::Retreat));

    cancel.cancel();
    let reactor = timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
    // Pausing never touched policy state
    assert_eq!(reactor.policy().state().daily_count, 1);
}

#[tokio::test]
async fn test_closed_inbox_stops_after_final_tick() {
    let mut reactor = fast_reactor();
    let (tx, inbox) = mpsc::channel(16);
    let (outbox, mut out_rx) = mpsc::channel(16);
    let (_handle, gate) = tick_scheduler();

    tx.send(Event::Trigger(ManualTrigger::new(Action::InviteChat))).await.unwrap();
    drop(tx);

    let task = tokio::spawn(async move {
        reactor.run(inbox, outbox, gate, FixedClock(noon()), CancellationToken::new()).await;
        reactor
    });

    let reactor = timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
    // Buffered events are still applied before stopping
    let effect = out_rx.recv().await.unwrap();
    assert!(matches!(effect, SideEffect::Action(cmd) if cmd.action == Action::InviteChat));
    assert_eq!(reactor.tick().frame, 1);
}

#[tokio::test]
async fn test_cancellation_stops_idle_loop() {
    let mut reactor = fast_reactor();
    let (_tx, inbox) = mpsc::channel::<Event>(16);
    let (outbox, _out_rx) = mpsc::channel(16);
    let (_handle, gate) = tick_scheduler();
    let cancel = CancellationToken::new();

    let task = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            reactor.run(inbox, outbox, gate, FixedClock(noon()), cancel).await;
        }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    timeout(Duration::from_secs(1), task).await.expect("run returns on cancel").unwrap();
}

#[tokio::test]
async fn test_dropped_sink_stops_loop() {
    let mut reactor = fast_reactor();
    let (tx, inbox) = mpsc::channel(16);
    let (outbox, out_rx) = mpsc::channel(16);
    let (_handle, gate) = tick_scheduler();
    drop(out_rx);

    let task = tokio::spawn(async move {
        reactor.run(inbox, outbox, gate, FixedClock(noon()), CancellationToken::new()).await;
    });

    tx.send(Event::Trigger(ManualTrigger::new(Action::Approach))).await.unwrap();
    timeout(Duration::from_secs(1), task).await.expect("run returns when sink is gone").unwrap();
}
