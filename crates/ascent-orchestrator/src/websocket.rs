//! WebSocket event types and broadcasting for real-time session observation.
//!
//! Every significant moment of an attempt (start, gate check, gating verdict,
//! hint grant, mastery apply, progression decision) is broadcast to connected
//! WebSocket clients as the session progresses.
//!
//! # Event Types
//!
//! - `connected` - Sent when a client connects
//! - `attempt_started` - A learner opened a new attempt
//! - `gate_checked` - A thinking-gate submission was validated
//! - `gating_decided` - A code submission received its gating verdict
//! - `hint_granted` - A hint level was charged against the budget
//! - `mastery_applied` - An attempt score was folded into a skill state
//! - `progression_decided` - The next-problem action was chosen
//! - `attempt_finished` - An attempt reached a terminal state

use axum::extract::ws::{Message, WebSocket};
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use ascent_engine::{
    Attempt, AttemptState, GatingAction, HintLevel, Pattern, ProgressionAction,
};

// ============================================================================
// Event Payloads
// ============================================================================

/// Payload for the `connected` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedPayload {
    /// When the client connected.
    pub timestamp: DateTime<Utc>,
}

/// Payload for the `attempt_started` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptStartedPayload {
    /// The new attempt's id.
    pub attempt_id: String,
    /// The learner opening it.
    pub user: String,
    /// The problem being attempted.
    pub problem_id: String,
    /// The problem's pattern.
    pub pattern: Pattern,
    /// The problem's rung.
    pub rung: u8,
}

/// Payload for the `gate_checked` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateCheckedPayload {
    /// The attempt the gate belongs to.
    pub attempt_id: String,
    /// Whether the gate passed.
    pub passed: bool,
    /// Number of soft warnings surfaced.
    pub warnings: usize,
}

/// Payload for the `gating_decided` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatingDecidedPayload {
    /// The attempt the submission belongs to.
    pub attempt_id: String,
    /// The gating verdict.
    pub action: GatingAction,
    /// Why the verdict was reached.
    pub reason: String,
}

/// Payload for the `hint_granted` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintGrantedPayload {
    /// The attempt the hint belongs to.
    pub attempt_id: String,
    /// The granted level.
    pub level: HintLevel,
    /// Budget points remaining afterwards.
    pub remaining: u8,
}

/// Payload for the `mastery_applied` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryAppliedPayload {
    /// The learner whose skill moved.
    pub user: String,
    /// The practiced pattern.
    pub pattern: Pattern,
    /// The practiced rung.
    pub rung: u8,
    /// The skill score after the apply.
    pub score: f64,
    /// `false` when the attempt id had already been applied.
    pub was_applied: bool,
}

/// Payload for the `progression_decided` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionDecidedPayload {
    /// The learner being routed.
    pub user: String,
    /// The practiced pattern.
    pub pattern: Pattern,
    /// The practiced rung.
    pub rung: u8,
    /// The chosen next-problem action.
    pub action: ProgressionAction,
}

/// Payload for the `attempt_finished` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptFinishedPayload {
    /// The finished attempt's id.
    pub attempt_id: String,
    /// The terminal state it reached.
    pub state: AttemptState,
}

// ============================================================================
// Event Enum
// ============================================================================

/// WebSocket event types for session observation.
///
/// All events serialize as JSON objects with "event" and "payload" fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Sent when a client connects.
    Connected(ConnectedPayload),
    /// A learner opened a new attempt.
    AttemptStarted(AttemptStartedPayload),
    /// A thinking-gate submission was validated.
    GateChecked(GateCheckedPayload),
    /// A code submission received its gating verdict.
    GatingDecided(GatingDecidedPayload),
    /// A hint level was charged against the budget.
    HintGranted(HintGrantedPayload),
    /// An attempt score was folded into a skill state.
    MasteryApplied(MasteryAppliedPayload),
    /// The next-problem action was chosen.
    ProgressionDecided(ProgressionDecidedPayload),
    /// An attempt reached a terminal state.
    AttemptFinished(AttemptFinishedPayload),
}

impl SessionEvent {
    /// Creates a `Connected` event stamped now.
    #[must_use]
    pub fn connected() -> Self {
        Self::Connected(ConnectedPayload {
            timestamp: Utc::now(),
        })
    }

    /// Creates an `AttemptStarted` event from an attempt.
    #[must_use]
    pub fn attempt_started(attempt: &Attempt) -> Self {
        Self::AttemptStarted(AttemptStartedPayload {
            attempt_id: attempt.id.clone(),
            user: attempt.user.clone(),
            problem_id: attempt.problem_id.clone(),
            pattern: attempt.pattern,
            rung: attempt.rung,
        })
    }

    /// Creates a `GateChecked` event.
    #[must_use]
    pub fn gate_checked(attempt_id: impl Into<String>, passed: bool, warnings: usize) -> Self {
        Self::GateChecked(GateCheckedPayload {
            attempt_id: attempt_id.into(),
            passed,
            warnings,
        })
    }

    /// Creates a `GatingDecided` event.
    #[must_use]
    pub fn gating_decided(
        attempt_id: impl Into<String>,
        action: GatingAction,
        reason: impl Into<String>,
    ) -> Self {
        Self::GatingDecided(GatingDecidedPayload {
            attempt_id: attempt_id.into(),
            action,
            reason: reason.into(),
        })
    }

    /// Creates a `HintGranted` event.
    #[must_use]
    pub fn hint_granted(attempt_id: impl Into<String>, level: HintLevel, remaining: u8) -> Self {
        Self::HintGranted(HintGrantedPayload {
            attempt_id: attempt_id.into(),
            level,
            remaining,
        })
    }

    /// Creates a `MasteryApplied` event.
    #[must_use]
    pub fn mastery_applied(
        user: impl Into<String>,
        pattern: Pattern,
        rung: u8,
        score: f64,
        was_applied: bool,
    ) -> Self {
        Self::MasteryApplied(MasteryAppliedPayload {
            user: user.into(),
            pattern,
            rung,
            score,
            was_applied,
        })
    }

    /// Creates a `ProgressionDecided` event.
    #[must_use]
    pub fn progression_decided(
        user: impl Into<String>,
        pattern: Pattern,
        rung: u8,
        action: ProgressionAction,
    ) -> Self {
        Self::ProgressionDecided(ProgressionDecidedPayload {
            user: user.into(),
            pattern,
            rung,
            action,
        })
    }

    /// Creates an `AttemptFinished` event.
    #[must_use]
    pub fn attempt_finished(attempt_id: impl Into<String>, state: AttemptState) -> Self {
        Self::AttemptFinished(AttemptFinishedPayload {
            attempt_id: attempt_id.into(),
            state,
        })
    }

    /// Returns the event name as a string.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::AttemptStarted(_) => "attempt_started",
            Self::GateChecked(_) => "gate_checked",
            Self::GatingDecided(_) => "gating_decided",
            Self::HintGranted(_) => "hint_granted",
            Self::MasteryApplied(_) => "mastery_applied",
            Self::ProgressionDecided(_) => "progression_decided",
            Self::AttemptFinished(_) => "attempt_finished",
        }
    }
}

// ============================================================================
// Event Broadcaster
// ============================================================================

/// Broadcasts session events to all connected WebSocket clients.
///
/// Uses a tokio broadcast channel for pub-sub event distribution.
/// Events are not persisted for disconnected clients.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBroadcaster {
    /// Creates a new `EventBroadcaster` with the specified buffer capacity.
    ///
    /// The buffer determines how many events can be queued per subscriber
    /// before old events are dropped.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new subscriber for receiving events.
    ///
    /// Each subscriber maintains its own buffer. If a subscriber falls
    /// behind, it will receive a `Lagged` error and miss some events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Broadcasts an event to all connected subscribers.
    ///
    /// Returns the number of active receivers that will receive the event.
    /// A return value of 0 means no clients are currently connected.
    pub fn send(&self, event: SessionEvent) -> usize {
        // send() returns Err only if there are no receivers, which is fine
        self.sender.send(event).unwrap_or(0)
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

// ============================================================================
// WebSocket Handler
// ============================================================================

/// Handles a single WebSocket connection.
///
/// - Sends a `connected` event immediately
/// - Subscribes to the event broadcaster
/// - Forwards all events to the client until it disconnects
pub async fn handle_socket(socket: WebSocket, broadcaster: EventBroadcaster) {
    let (mut sender, mut receiver) = socket.split();

    let connected = SessionEvent::connected();
    let Ok(connected_json) = serde_json::to_string(&connected) else {
        warn!("Failed to serialize connected event");
        return;
    };
    if sender.send(Message::Text(connected_json)).await.is_err() {
        debug!("Client disconnected before receiving connected event");
        return;
    }

    info!("WebSocket client connected");

    let mut event_receiver = broadcaster.subscribe();

    loop {
        tokio::select! {
            event = event_receiver.recv() => {
                match event {
                    Ok(event) => {
                        let Ok(json) = serde_json::to_string(&event) else {
                            warn!(event = event.event_name(), "Failed to serialize event");
                            continue;
                        };
                        if sender.send(Message::Text(json)).await.is_err() {
                            debug!("Client disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "WebSocket client lagged behind event stream");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                        debug!("WebSocket client closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}
