use chrono::{Duration, NaiveDate};
use companion::kernel::action::{Action, ActionCommand};
use companion::kernel::classifier::CompanionState;
use companion::kernel::event::{Event, InteractionKind, Sample, UserInteraction};
use companion::kernel::time::WallTime;
use companion::{CompanionConfig, Reactor, SideEffect};

fn at(secs: i64) -> WallTime {
    NaiveDate::from_ymd_opt(2026, 10, 18)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
        + Duration::seconds(secs)
}

fn actions(effects: &[SideEffect]) -> Vec<ActionCommand> {
    effects
        .iter()
        .filter_map(|e| match e {
            SideEffect::Action(cmd) => Some(cmd.clone()),
            _ => None,
        })
        .collect()
}

fn sample(secs: i64, app: &str, idle: f64) -> Event {
    Event::Sample(Sample::new(at(secs), app, idle))
}

fn interact(secs: i64, kind: InteractionKind) -> Event {
    Event::Interaction(UserInteraction::new(at(secs), kind))
}

#[test]
fn test_scenario_a_idle_user_gets_one_approach() {
    let mut config = CompanionConfig::default();
    config.classifier.idle_threshold_secs = 60.0;
    let mut reactor = Reactor::new(config).unwrap();

    let mut emitted = Vec::new();
    for i in 0..=120 {
        let effects = reactor.tick_step(at(i), vec![sample(i, "editor", i as f64)]);
        for cmd in actions(&effects) {
            emitted.push((i, cmd));
        }
    }

    assert_eq!(emitted.len(), 1, "Exactly one command: {:?}", emitted);
    let (tick_at, cmd) = &emitted[0];
    assert_eq!(cmd.action, Action::Approach);
    assert_eq!(*tick_at, 61, "First tick with idle above threshold");
    assert_eq!(reactor.state(), CompanionState::Idle);
}

#[test]
fn test_scenario_b_app_thrashing_triggers_one_retreat() {
    let mut reactor = Reactor::new(CompanionConfig::default()).unwrap();

    // 10 switches within 90 seconds
    let mut emitted = Vec::new();
    for k in 0..=10 {
        let t = k * 9;
        let app = if k % 2 == 0 { "editor" } else { "terminal" };
        let effects = reactor.tick_step(at(t), vec![sample(t, app, 0.0)]);
        emitted.extend(actions(&effects));
    }

    assert_eq!(reactor.last_signal().switch_rate_2m, 10);
    assert_eq!(reactor.state(), CompanionState::Fragmented);
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].action, Action::Retreat);
    assert_eq!(emitted[0].ts, at(54), "Sixth switch crosses the threshold of 5");
}

#[test]
fn test_scenario_b_recent_retreat_blocks_new_one() {
    let mut reactor = Reactor::new(CompanionConfig::default()).unwrap();

    // A retreat shortly before the thrashing starts
    let effects = reactor.tick_step(
        at(0),
        vec![Event::Trigger(companion::kernel::event::ManualTrigger::new(Action::Retreat))],
    );
    assert_eq!(actions(&effects).len(), 1);

    let mut emitted = Vec::new();
    for k in 1..=11 {
        let t = k * 9;
        let app = if k % 2 == 0 { "editor" } else { "terminal" };
        emitted.extend(actions(&reactor.tick_step(at(t), vec![sample(t, app, 0.0)])));
    }

    assert_eq!(reactor.state(), CompanionState::Fragmented);
    assert!(emitted.is_empty(), "Retreat is still cooling down");
}

#[test]
fn test_scenario_c_ignored_invites_back_off() {
    let mut config = CompanionConfig::default();
    config.policy.actions.invite_chat.cooldown_secs = 60;
    config.policy.backoff_factor = 2.0;
    config.policy.backoff_cap = 8.0;
    config.policy.daily_max = 100;
    let mut reactor = Reactor::new(config).unwrap();

    let mut invites: Vec<i64> = Vec::new();
    let mut pending: Vec<Event> = Vec::new();

    for i in 0..=600 {
        let app = if i % 2 == 0 { "WeChat" } else { "editor" };
        let mut events = std::mem::take(&mut pending);
        events.push(sample(i, app, 0.0));

        for cmd in actions(&reactor.tick_step(at(i), events)) {
            if cmd.action == Action::InviteChat {
                invites.push(i);
                if invites.len() == 1 {
                    // User ignores the bubble three times before the next tick
                    for _ in 0..3 {
                        pending.push(interact(i, InteractionKind::IgnoredAction { action: Action::InviteChat }));
                    }
                }
            }
        }
    }

    assert_eq!(reactor.policy().state().ignore_streak, 3);
    assert_eq!(invites.len(), 2, "invites at {:?}", invites);
    // cooldown * backoff(3) = 60s * 8
    assert_eq!(invites[1] - invites[0], 480);
}

#[test]
fn test_scenario_d_open_chat_suppresses_until_closed() {
    let mut config = CompanionConfig::default();
    config.classifier.idle_threshold_secs = 60.0;
    let mut reactor = Reactor::new(config).unwrap();

    let mut emitted = Vec::new();
    let effects = reactor.tick_step(
        at(0),
        vec![interact(0, InteractionKind::OpenChat), sample(0, "editor", 0.0)],
    );
    emitted.extend(actions(&effects));

    for i in 1..=120 {
        emitted.extend(actions(&reactor.tick_step(at(i), vec![sample(i, "editor", i as f64)])));
    }
    assert_eq!(reactor.state(), CompanionState::Idle);
    assert!(emitted.is_empty(), "Nothing while chat is open");

    let effects = reactor.tick_step(
        at(121),
        vec![interact(121, InteractionKind::CloseChat), sample(121, "editor", 121.0)],
    );
    let after = actions(&effects);
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].action, Action::Approach);
}

#[test]
fn test_ignore_is_seen_before_same_tick_decision() {
    let mut config = CompanionConfig::default();
    config.classifier.idle_threshold_secs = 10.0;
    config.policy.actions.approach.cooldown_secs = 30;
    let mut reactor = Reactor::new(config).unwrap();

    // Approach at t=11
    let mut first = None;
    for i in 0..=11 {
        if let Some(cmd) = actions(&reactor.tick_step(at(i), vec![sample(i, "editor", i as f64)])).pop() {
            first = Some(i);
            assert_eq!(cmd.action, Action::Approach);
        }
    }
    assert_eq!(first, Some(11));

    // Ignore arrives in the same batch as the sample at t=41 (base cooldown elapsed)
    let effects = reactor.tick_step(
        at(41),
        vec![
            interact(40, InteractionKind::IgnoredAction { action: Action::Approach }),
            sample(41, "editor", 41.0),
        ],
    );
    assert!(actions(&effects).is_empty(), "Backoff applies before the decision");
}
