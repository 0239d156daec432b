//! Inbound JSON message shapes from the host transport, one object per line.
//! Outbound lines are `SideEffect`s serialized as-is.
//!
//! Inbound shapes keep every field optional so a missing field surfaces as a
//! typed `InputError` instead of a generic parse failure.

use serde::Deserialize;

use super::action::{Action, Expression};
use super::event::{Event, InteractionKind, ManualTrigger, Sample, UserInteraction};
use super::time::WallTime;
use crate::error::{InputError, MessageError};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    Sample(RawSample),
    Interaction(RawInteraction),
    Trigger(RawTrigger),
    /// Stop the tick scheduler. Queued events wait; policy state is untouched.
    Pause,
    Resume,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSample {
    pub ts: Option<WallTime>,
    pub active_app: Option<String>,
    pub active_title: Option<String>,
    pub idle_sec: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionTag {
    ClickPet,
    OpenChat,
    CloseChat,
    IgnoredAction,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInteraction {
    pub kind: Option<InteractionTag>,
    pub ts: Option<WallTime>,
    pub action: Option<Action>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTrigger {
    pub action: Option<Action>,
    pub expression: Option<Expression>,
}

/// A validated inbound message.
#[derive(Debug, Clone)]
pub enum Inbound {
    Event(Event),
    Pause,
    Resume,
}

impl TryFrom<RawSample> for Sample {
    type Error = InputError;

    fn try_from(raw: RawSample) -> Result<Self, Self::Error> {
        let sample = Sample {
            ts: raw.ts.ok_or(InputError::MissingField("ts"))?,
            active_app: raw.active_app.ok_or(InputError::MissingField("activeApp"))?,
            active_title: raw.active_title,
            idle_sec: raw.idle_sec.ok_or(InputError::MissingField("idleSec"))?,
        };
        sample.validate()?;
        Ok(sample)
    }
}

impl TryFrom<RawInteraction> for UserInteraction {
    type Error = InputError;

    fn try_from(raw: RawInteraction) -> Result<Self, Self::Error> {
        let ts = raw.ts.ok_or(InputError::MissingField("ts"))?;
        let kind = match raw.kind.ok_or(InputError::MissingField("kind"))? {
            InteractionTag::ClickPet => InteractionKind::ClickPet,
            InteractionTag::OpenChat => InteractionKind::OpenChat,
            InteractionTag::CloseChat => InteractionKind::CloseChat,
            InteractionTag::IgnoredAction => InteractionKind::IgnoredAction {
                action: raw.action.ok_or(InputError::MissingField("action"))?,
            },
        };
        Ok(UserInteraction { ts, kind })
    }
}

impl TryFrom<RawTrigger> for ManualTrigger {
    type Error = InputError;

    fn try_from(raw: RawTrigger) -> Result<Self, Self::Error> {
        Ok(ManualTrigger {
            action: raw.action.ok_or(InputError::MissingField("action"))?,
            expression: raw.expression,
        })
    }
}

impl TryFrom<InboundMessage> for Inbound {
    type Error = InputError;

    fn try_from(message: InboundMessage) -> Result<Self, Self::Error> {
        Ok(match message {
            InboundMessage::Sample(raw) => Inbound::Event(Event::Sample(raw.try_into()?)),
            InboundMessage::Interaction(raw) => Inbound::Event(Event::Interaction(raw.try_into()?)),
            InboundMessage::Trigger(raw) => Inbound::Event(Event::Trigger(raw.try_into()?)),
            InboundMessage::Pause => Inbound::Pause,
            InboundMessage::Resume => Inbound::Resume,
        })
    }
}

/// Parses and validates one transport line.
pub fn parse_line(line: &str) -> Result<Inbound, MessageError> {
    let message: InboundMessage = serde_json::from_str(line)?;
    Ok(message.try_into()?)
}
