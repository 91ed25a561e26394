use super::*;
use crate::net::connection::{CloseWatch, ConnectionHandle};
use crate::state::messages::Role;
use frames::{CodecError, SidePayload};
use std::sync::Mutex;
use tokio::sync::mpsc;

// =============================================================
// Scripted connector
// =============================================================

struct OpenedStream {
    question: String,
    tx: mpsc::Sender<WireEvent>,
    watch: CloseWatch,
}

/// Connector whose streams are fed by the test. Records how many earlier
/// streams were still open each time a new one was opened.
#[derive(Default)]
struct ScriptedConnector {
    opened: Mutex<Vec<OpenedStream>>,
    overlaps: Mutex<usize>,
}

impl Connector for ScriptedConnector {
    fn open(&self, question: &str) -> ConnectionHandle {
        let mut opened = self.opened.lock().expect("connector mutex");
        let still_open = opened.iter().filter(|s| !s.watch.is_closed()).count();
        *self.overlaps.lock().expect("connector mutex") += still_open;

        let (tx, rx) = mpsc::channel(16);
        let watch = CloseWatch::default();
        opened.push(OpenedStream { question: question.to_owned(), tx, watch: watch.clone() });
        ConnectionHandle::new(rx, watch)
    }
}

impl ScriptedConnector {
    /// Queue an event on stream `n`. Returns `false` if that stream is closed.
    fn send(&self, n: usize, event: WireEvent) -> bool {
        let tx = self.opened.lock().expect("connector mutex")[n].tx.clone();
        tx.try_send(event).is_ok()
    }

    fn send_frames(&self, n: usize, frames: Vec<Frame>) {
        for frame in frames {
            assert!(self.send(n, WireEvent::Frame(frame)), "stream {n} should be open");
        }
    }

    fn drop_sender(&self, n: usize) {
        let (dead, _) = mpsc::channel(1);
        self.opened.lock().expect("connector mutex")[n].tx = dead;
    }

    fn is_closed(&self, n: usize) -> bool {
        self.opened.lock().expect("connector mutex")[n].watch.is_closed()
    }

    fn open_count(&self) -> usize {
        self.opened.lock().expect("connector mutex").len()
    }

    fn question(&self, n: usize) -> String {
        self.opened.lock().expect("connector mutex")[n].question.clone()
    }

    fn overlaps(&self) -> usize {
        *self.overlaps.lock().expect("connector mutex")
    }
}

fn session() -> ClientSession<ScriptedConnector> {
    ClientSession::new(ScriptedConnector::default())
}

fn lucky(numbers: &[i64]) -> SidePayload {
    let mut payload = SidePayload::new();
    payload.insert(frames::FIELD_LUCKY_NUMBERS.to_owned(), serde_json::json!(numbers));
    payload
}

fn last_content(session: &ClientSession<ScriptedConnector>) -> String {
    session.messages().last().map(|m| m.content.clone()).unwrap_or_default()
}

// =============================================================
// submit / start_conversation
// =============================================================

#[tokio::test]
async fn submit_ignores_blank_input() {
    let mut session = session();
    assert!(!session.submit("   "));
    assert!(!session.submit(""));
    assert_eq!(session.connector().open_count(), 0);
    assert!(session.messages().is_empty());
    assert_eq!(session.state(), StreamState::Idle);
}

#[tokio::test]
async fn submit_appends_user_and_empty_responder() {
    let mut session = session();
    assert!(session.submit("  Will I travel?  "));

    let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
    assert_eq!(roles, [Role::User, Role::Responder]);
    assert_eq!(session.messages().get(0).map(|m| m.content.as_str()), Some("Will I travel?"));
    assert_eq!(session.connector().question(0), "Will I travel?");
    assert_eq!(session.state(), StreamState::Streaming);
    assert!(session.is_connected());
}

#[tokio::test]
async fn start_conversation_sends_greeting_without_user_message() {
    let mut session = session();
    session.submit("old question");
    session.start_conversation();

    assert_eq!(session.messages().len(), 1);
    assert_eq!(session.messages().last().map(|m| m.role), Some(Role::Responder));
    assert_eq!(session.connector().question(1), GREETING_QUESTION);
    assert!(session.connector().is_closed(0));
}

// =============================================================
// Frame handling
// =============================================================

#[tokio::test]
async fn done_text_replaces_accumulated_content() {
    let mut session = session();
    session.submit("q");
    session.connector().send_frames(
        0,
        vec![Frame::content("Greet"), Frame::content("ings"), Frame::done("Greetings, traveler.", SidePayload::new())],
    );

    assert_eq!(session.next_update().await, Some(SessionUpdate::MessageChanged { index: 1 }));
    assert_eq!(last_content(&session), "Greet");
    assert_eq!(session.next_update().await, Some(SessionUpdate::MessageChanged { index: 1 }));
    assert_eq!(last_content(&session), "Greetings");
    assert_eq!(session.next_update().await, Some(SessionUpdate::StateChanged { state: StreamState::Done }));
    assert_eq!(last_content(&session), "Greetings, traveler.");
}

#[tokio::test]
async fn done_closes_connection_and_ignores_trailing_frames() {
    let mut session = session();
    session.submit("q");
    session.connector().send_frames(0, vec![Frame::done("final", SidePayload::new()), Frame::content(" extra")]);

    assert_eq!(session.next_update().await, Some(SessionUpdate::StateChanged { state: StreamState::Done }));
    assert!(session.connector().is_closed(0));
    assert!(!session.is_connected());
    assert_eq!(session.next_update().await, None);
    assert_eq!(last_content(&session), "final");
}

#[tokio::test]
async fn rate_limit_error_frame_fails_with_its_message() {
    let mut session = session();
    session.start_conversation();
    session.connector().send_frames(0, vec![Frame::error("Rate limit exceeded")]);

    assert_eq!(session.next_update().await, Some(SessionUpdate::StateChanged { state: StreamState::Failed }));
    assert_eq!(last_content(&session), "Rate limit exceeded");
    assert_eq!(session.state(), StreamState::Failed);
    assert!(session.connector().is_closed(0));
    assert_eq!(session.messages().len(), 1);
}

#[tokio::test]
async fn empty_error_message_uses_fallback_text() {
    let mut session = session();
    session.submit("q");
    session.connector().send_frames(0, vec![Frame::content("partial"), Frame::error("")]);

    session.next_update().await;
    session.next_update().await;
    assert_eq!(last_content(&session), MSG_ERROR_FALLBACK);
}

#[tokio::test]
async fn malformed_frame_fails_with_fixed_text() {
    let mut session = session();
    session.submit("q");
    session.connector().send(0, WireEvent::Malformed(CodecError::MalformedFrame("bad json".into())));

    assert_eq!(session.next_update().await, Some(SessionUpdate::StateChanged { state: StreamState::Failed }));
    assert_eq!(last_content(&session), MSG_MALFORMED);
    assert!(session.connector().is_closed(0));
}

#[tokio::test]
async fn transport_loss_fails_with_fixed_text() {
    let mut session = session();
    session.submit("q");
    session.connector().send(0, WireEvent::TransportLost(TransportError::Status(502)));

    session.next_update().await;
    assert_eq!(session.state(), StreamState::Failed);
    assert_eq!(last_content(&session), MSG_TRANSPORT_LOST);
}

#[tokio::test]
async fn stream_ending_without_terminal_frame_is_transport_loss() {
    let mut session = session();
    session.submit("q");
    session.connector().send_frames(0, vec![Frame::content("half a")]);
    session.connector().send(0, WireEvent::Closed);

    session.next_update().await;
    session.next_update().await;
    assert_eq!(session.state(), StreamState::Failed);
    assert_eq!(last_content(&session), MSG_TRANSPORT_LOST);
}

#[tokio::test]
async fn vanished_feeder_is_transport_loss() {
    let mut session = session();
    session.submit("q");
    session.connector().drop_sender(0);

    session.next_update().await;
    assert_eq!(session.state(), StreamState::Failed);
    assert!(!last_content(&session).is_empty());
}

// =============================================================
// At most one open stream
// =============================================================

#[tokio::test]
async fn rapid_resubmission_never_overlaps_streams() {
    let mut session = session();
    for q in ["one", "two", "three", "four"] {
        session.submit(q);
    }
    session.start_conversation();
    session.submit("five");

    let connector = session.connector();
    assert_eq!(connector.open_count(), 6);
    assert_eq!(connector.overlaps(), 0);
    assert!((0..5).all(|n| connector.is_closed(n)));
    assert!(!connector.is_closed(5));
}

#[tokio::test]
async fn frames_from_replaced_stream_are_never_applied() {
    let mut session = session();
    session.submit("first");
    session.submit("second");

    assert!(!session.connector().send(0, WireEvent::Frame(Frame::content("stale"))));
    session.connector().send_frames(1, vec![Frame::content("fresh")]);

    assert_eq!(session.next_update().await, Some(SessionUpdate::MessageChanged { index: 3 }));
    assert_eq!(last_content(&session), "fresh");
    assert_eq!(session.messages().get(1).map(|m| m.content.as_str()), Some(""));
}

// =============================================================
// Side payload
// =============================================================

#[tokio::test(start_paused = true)]
async fn greeting_then_lucky_numbers_after_delay() {
    let mut session = session();
    session.start_conversation();
    session.connector().send_frames(
        0,
        vec![
            Frame::content("Greetings,"),
            Frame::content(" traveler."),
            Frame::done("Greetings, traveler.", lucky(&[3, 14, 27, 8, 91])),
        ],
    );

    for _ in 0..3 {
        session.next_update().await;
    }
    assert_eq!(session.state(), StreamState::Done);
    assert_eq!(last_content(&session), "Greetings, traveler.");
    assert!(session.is_active());

    let before = Instant::now();
    assert_eq!(session.next_update().await, Some(SessionUpdate::MessageAppended { index: 1 }));
    assert!(before.elapsed() >= DEFAULT_SIDE_PAYLOAD_DELAY);
    assert_eq!(last_content(&session), "Your lucky numbers for this reading are: 3, 14, 27, 8, 91");
    assert_eq!(session.messages().last().map(|m| m.role), Some(Role::Responder));

    assert_eq!(session.next_update().await, None);
}

#[tokio::test(start_paused = true)]
async fn side_payload_delay_is_configurable() {
    let mut session = session().with_side_payload_delay(Duration::from_millis(250));
    session.submit("q");
    session.connector().send_frames(0, vec![Frame::done("x", lucky(&[1]))]);
    session.next_update().await;

    let before = Instant::now();
    session.next_update().await;
    let elapsed = before.elapsed();
    assert!(elapsed >= Duration::from_millis(250));
    assert!(elapsed < DEFAULT_SIDE_PAYLOAD_DELAY);
}

#[tokio::test(start_paused = true)]
async fn resubmit_cancels_pending_side_payload() {
    let mut session = session();
    session.submit("first");
    session.connector().send_frames(0, vec![Frame::done("one", lucky(&[7]))]);
    session.next_update().await;

    session.submit("second");
    session.connector().send_frames(1, vec![Frame::done("two", SidePayload::new())]);
    session.next_update().await;
    tokio::time::advance(Duration::from_secs(5)).await;

    assert_eq!(session.next_update().await, None);
    assert!(session.messages().iter().all(|m| !m.content.starts_with("Your lucky numbers")));
}

#[tokio::test(start_paused = true)]
async fn teardown_cancels_pending_side_payload() {
    let mut session = session();
    session.submit("q");
    session.connector().send_frames(0, vec![Frame::done("x", lucky(&[1, 2]))]);
    session.next_update().await;

    session.teardown();
    assert!(!session.is_active());
    assert_eq!(session.next_update().await, None);
    assert_eq!(session.messages().len(), 2);
}

#[tokio::test]
async fn done_without_lucky_numbers_schedules_nothing() {
    let mut session = session();
    session.submit("q");
    session.connector().send_frames(0, vec![Frame::done("x", SidePayload::new())]);
    session.next_update().await;
    assert!(!session.is_active());
}

// =============================================================
// reset / teardown
// =============================================================

#[tokio::test]
async fn reset_closes_stream_and_returns_to_idle() {
    let mut session = session();
    session.submit("q");
    session.reset();

    assert_eq!(session.state(), StreamState::Idle);
    assert!(session.connector().is_closed(0));
    assert_eq!(session.next_update().await, None);
    assert!(session.submit("again"));
}

#[tokio::test]
async fn teardown_closes_stream_and_blocks_new_work() {
    let mut session = session();
    session.submit("q");
    session.connector().send_frames(0, vec![Frame::content("never seen")]);
    session.teardown();

    assert!(session.connector().is_closed(0));
    assert_eq!(session.next_update().await, None);
    assert!(!session.submit("later"));
    assert_eq!(last_content(&session), "");
}

#[test]
fn lucky_numbers_message_joins_with_commas() {
    assert_eq!(lucky_numbers_message(&[3, 14, 27, 8, 91]), "Your lucky numbers for this reading are: 3, 14, 27, 8, 91");
    assert_eq!(lucky_numbers_message(&[42]), "Your lucky numbers for this reading are: 42");
}
