//! Client session state machine.
//!
//! DESIGN
//! ======
//! The session owns the only [`ConnectionSlot`], the [`MessageStore`], and an
//! optional side-payload deadline. Everything runs on the caller's task:
//! `submit` and friends are synchronous, and [`ClientSession::next_update`]
//! is the single suspension point, waiting on whichever comes first of the
//! next wire event or the deadline.
//!
//! LIFECYCLE
//! =========
//! 1. `submit` / `start_conversation` → close old stream, open new, `Streaming`
//! 2. `Content` → append to responder message
//! 3. `Done` → overwrite with final text, close, `Done`, maybe schedule side payload
//! 4. `Error` / malformed / transport loss → close, `Failed`, fallback text
//! 5. `teardown` → close, drop deadline, no further updates

use std::time::Duration;

use frames::Frame;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::messages::MessageStore;
use crate::net::connection::{ConnectionSlot, Connector, TransportError, WireEvent};

/// Question sent when a conversation opens without user input.
pub const GREETING_QUESTION: &str = "Give a mystical greeting and ask what aspect of their destiny they wish to explore: love, career, or spiritual growth";

pub const MSG_ERROR_FALLBACK: &str = "The spirits are disturbed... I cannot see clearly at this moment.";
pub const MSG_MALFORMED: &str = "The spirits are confused...";
pub const MSG_TRANSPORT_LOST: &str = "The connection to the spirit realm was lost...";

/// Delay between the final text and the side-payload message.
pub const DEFAULT_SIDE_PAYLOAD_DELAY: Duration = Duration::from_secs(1);

// =============================================================================
// TYPES
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StreamState {
    #[default]
    Idle,
    Streaming,
    Done,
    Failed,
}

/// What changed as the result of one [`ClientSession::next_update`] step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionUpdate {
    /// The message at `index` was edited in place.
    MessageChanged { index: usize },
    /// A new message was appended at `index`.
    MessageAppended { index: usize },
    /// The stream terminated; the trailing responder message holds its final text.
    StateChanged { state: StreamState },
}

#[derive(Debug)]
struct PendingSidePayload {
    at: Instant,
    text: String,
}

enum Step {
    Wire(WireEvent),
    SidePayloadDue,
}

// =============================================================================
// SESSION
// =============================================================================

pub struct ClientSession<C> {
    connector: C,
    slot: ConnectionSlot,
    messages: MessageStore,
    state: StreamState,
    pending: Option<PendingSidePayload>,
    side_payload_delay: Duration,
    torn_down: bool,
}

impl<C: Connector> ClientSession<C> {
    #[must_use]
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            slot: ConnectionSlot::default(),
            messages: MessageStore::new(),
            state: StreamState::Idle,
            pending: None,
            side_payload_delay: DEFAULT_SIDE_PAYLOAD_DELAY,
            torn_down: false,
        }
    }

    #[must_use]
    pub fn with_side_payload_delay(mut self, delay: Duration) -> Self {
        self.side_payload_delay = delay;
        self
    }

    #[must_use]
    pub fn connector(&self) -> &C {
        &self.connector
    }

    #[must_use]
    pub fn messages(&self) -> &MessageStore {
        &self.messages
    }

    #[must_use]
    pub fn state(&self) -> StreamState {
        self.state
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.slot.is_open()
    }

    /// True while `next_update` still has something to wait for.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.torn_down && (self.slot.is_open() || self.pending.is_some())
    }

    /// Start a fresh conversation with the greeting question.
    pub fn start_conversation(&mut self) {
        if self.torn_down {
            return;
        }
        self.messages.clear();
        self.messages.push_responder("");
        self.open_stream(GREETING_QUESTION);
    }

    /// Ask a question. Blank input is ignored and returns `false`.
    pub fn submit(&mut self, question: &str) -> bool {
        let question = question.trim();
        if question.is_empty() || self.torn_down {
            return false;
        }
        self.messages.push_user(question);
        self.messages.push_responder("");
        self.open_stream(question);
        true
    }

    /// Drop any open stream and pending side payload, back to `Idle`.
    pub fn reset(&mut self) {
        self.pending = None;
        self.slot.close();
        self.state = StreamState::Idle;
    }

    /// Close everything for good. Later calls to `next_update` return `None`.
    pub fn teardown(&mut self) {
        self.pending = None;
        self.slot.close();
        self.torn_down = true;
        debug!("session: torn down");
    }

    /// Wait for the next wire event or side-payload deadline and apply it.
    ///
    /// Returns `None` when there is nothing left to wait for.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        loop {
            if !self.is_active() {
                return None;
            }
            let connected = self.slot.is_open();
            let deadline = self.pending.as_ref().map(|p| p.at);

            let step = tokio::select! {
                event = self.slot.next_event(), if connected => Step::Wire(event),
                () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    Step::SidePayloadDue
                }
            };

            let update = match step {
                Step::Wire(event) => self.apply(event),
                Step::SidePayloadDue => self.deliver_side_payload(),
            };
            if update.is_some() {
                return update;
            }
        }
    }

    fn open_stream(&mut self, question: &str) {
        self.pending = None;
        // Close before opening so two streams never overlap.
        self.slot.close();
        let handle = self.connector.open(question);
        self.slot.replace(handle);
        self.state = StreamState::Streaming;
        info!(question, "session: stream opened");
    }

    fn apply(&mut self, event: WireEvent) -> Option<SessionUpdate> {
        if self.state != StreamState::Streaming {
            warn!(?event, state = ?self.state, "session: dropping event after termination");
            return None;
        }

        match event {
            WireEvent::Frame(Frame::Content { text }) => {
                let index = self.messages.append_to_responder(&text)?;
                Some(SessionUpdate::MessageChanged { index })
            }
            WireEvent::Frame(frame @ Frame::Done { .. }) => Some(self.finish(&frame)),
            WireEvent::Frame(Frame::Error { message }) => {
                warn!(%message, "session: error frame");
                let text = if message.is_empty() { MSG_ERROR_FALLBACK.to_owned() } else { message };
                Some(self.fail(text))
            }
            WireEvent::Malformed(e) => {
                warn!(error = %e, "session: malformed frame");
                Some(self.fail(MSG_MALFORMED.to_owned()))
            }
            WireEvent::TransportLost(e) => {
                warn!(error = %e, "session: transport lost");
                Some(self.fail(MSG_TRANSPORT_LOST.to_owned()))
            }
            WireEvent::Closed => {
                warn!(error = %TransportError::Ended, "session: transport lost");
                Some(self.fail(MSG_TRANSPORT_LOST.to_owned()))
            }
        }
    }

    fn finish(&mut self, frame: &Frame) -> SessionUpdate {
        if let Frame::Done { final_text, .. } = frame {
            self.messages.set_responder(final_text.as_str());
        }
        self.slot.close();
        self.state = StreamState::Done;

        if let Some(numbers) = frame.lucky_numbers() {
            self.pending = Some(PendingSidePayload {
                at: Instant::now() + self.side_payload_delay,
                text: lucky_numbers_message(&numbers),
            });
        }
        info!(messages = self.messages.len(), "session: stream done");
        SessionUpdate::StateChanged { state: StreamState::Done }
    }

    fn fail(&mut self, text: String) -> SessionUpdate {
        self.messages.set_responder(text);
        self.slot.close();
        self.state = StreamState::Failed;
        SessionUpdate::StateChanged { state: StreamState::Failed }
    }

    fn deliver_side_payload(&mut self) -> Option<SessionUpdate> {
        let pending = self.pending.take()?;
        let index = self.messages.push_responder(pending.text);
        Some(SessionUpdate::MessageAppended { index })
    }
}

/// Render lucky numbers as the follow-up responder message.
#[must_use]
pub fn lucky_numbers_message(numbers: &[i64]) -> String {
    let list = numbers.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
    format!("Your lucky numbers for this reading are: {list}")
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
