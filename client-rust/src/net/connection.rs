//! Connection handle and slot.
//!
//! DESIGN
//! ======
//! A connection is a channel of [`WireEvent`]s fed by a reader task. The
//! handle owns both ends that matter to the session: the receiver and the
//! task. Closing drops the receiver, aborts the task, and flips a shared
//! [`CloseWatch`] so the reader can stop before its next send.
//!
//! [`ConnectionSlot`] holds at most one handle. Storing a new handle always
//! closes the previous one first, so two open streams can never coexist.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use frames::{CodecError, Frame};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Events buffered between a reader task and the session.
pub const EVENT_CHANNEL_CAPACITY: usize = 32;

// =============================================================================
// EVENTS
// =============================================================================

/// Transport-level failures reported by a connector.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("response body failed: {0}")]
    Body(reqwest::Error),
    #[error("stream ended before a terminal frame")]
    Ended,
}

/// What a connection delivers to the session, in arrival order.
#[derive(Debug)]
pub enum WireEvent {
    Frame(Frame),
    Malformed(CodecError),
    TransportLost(TransportError),
    /// The body ended cleanly. Only meaningful if no terminal frame came first.
    Closed,
}

// =============================================================================
// CLOSE WATCH
// =============================================================================

/// Shared flag observing whether a handle has been closed.
#[derive(Clone, Debug, Default)]
pub struct CloseWatch(Arc<AtomicBool>);

impl CloseWatch {
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn mark_closed(&self) {
        self.0.store(true, Ordering::Release);
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// One open stream: the event receiver plus the task that feeds it.
#[derive(Debug)]
pub struct ConnectionHandle {
    events: Option<mpsc::Receiver<WireEvent>>,
    task: Option<JoinHandle<()>>,
    watch: CloseWatch,
}

impl ConnectionHandle {
    /// Wrap a receiver whose sender is driven elsewhere.
    #[must_use]
    pub fn new(events: mpsc::Receiver<WireEvent>, watch: CloseWatch) -> Self {
        Self { events: Some(events), task: None, watch }
    }

    /// Spawn `reader` on the runtime and return a handle to its events.
    pub fn spawn<F, Fut>(reader: F) -> Self
    where
        F: FnOnce(mpsc::Sender<WireEvent>, CloseWatch) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let watch = CloseWatch::default();
        let task = tokio::spawn(reader(tx, watch.clone()));
        Self { events: Some(rx), task: Some(task), watch }
    }

    #[must_use]
    pub fn watch(&self) -> CloseWatch {
        self.watch.clone()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.watch.is_closed()
    }

    /// Next event, or `None` once the handle is closed or the feeder is gone.
    pub async fn next_event(&mut self) -> Option<WireEvent> {
        match self.events.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// Idempotent. After this returns no further event is observable.
    pub fn close(&mut self) {
        if self.watch.is_closed() {
            return;
        }
        self.watch.mark_closed();
        self.events = None;
        if let Some(task) = self.task.take() {
            task.abort();
        }
        debug!("connection: closed");
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// SLOT
// =============================================================================

/// Owned, swappable home for the single open connection.
#[derive(Debug, Default)]
pub struct ConnectionSlot {
    current: Option<ConnectionHandle>,
}

impl ConnectionSlot {
    /// Close whatever is stored, then store `handle`.
    pub fn replace(&mut self, handle: ConnectionHandle) {
        self.close();
        self.current = Some(handle);
    }

    pub fn close(&mut self) {
        if let Some(mut handle) = self.current.take() {
            handle.close();
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.current.as_ref().is_some_and(|h| !h.is_closed())
    }

    /// Next event from the stored handle. A vanished feeder reads as `Closed`.
    pub async fn next_event(&mut self) -> WireEvent {
        match self.current.as_mut() {
            Some(handle) => handle.next_event().await.unwrap_or(WireEvent::Closed),
            None => WireEvent::Closed,
        }
    }
}

// =============================================================================
// CONNECTOR
// =============================================================================

/// Opens a stream for one question.
///
/// `open` is synchronous: the returned handle is live immediately and any
/// network work happens on the handle's own task.
pub trait Connector {
    fn open(&self, question: &str) -> ConnectionHandle;
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod tests;
