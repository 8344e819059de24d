//! Per-session transport: the SSE outbound channel, the ordered inbound queue
//! and the worker task that drains it.

use axum::response::sse::Event;
use chrono::{DateTime, Utc};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::{SessionError, ShutdownIssue};
use crate::protocol::{ProtocolServer, ToolContext};
use crate::session::SessionRegistry;
use crate::types::jsonrpc::JsonRpcMessage;

/// Depth of the inbound queue. A full queue back-pressures the POST.
const INBOUND_CAPACITY: usize = 32;

/// Depth of the outbound SSE channel.
const OUTBOUND_CAPACITY: usize = 64;

/// One frame on the SSE stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// First frame: where to POST messages for this session.
    Endpoint(String),
    /// A serialized JSON-RPC response.
    Message(String),
}

impl SseFrame {
    pub fn event_name(&self) -> &'static str {
        match self {
            SseFrame::Endpoint(_) => "endpoint",
            SseFrame::Message(_) => "message",
        }
    }

    pub fn data(&self) -> &str {
        match self {
            SseFrame::Endpoint(data) | SseFrame::Message(data) => data,
        }
    }

    pub fn into_event(self) -> Event {
        Event::default().event(self.event_name()).data(self.data())
    }
}

/// Receiving halves handed out by [`SessionTransport::new`].
pub(crate) struct SessionChannels {
    pub frames: mpsc::Receiver<SseFrame>,
    pub inbox: mpsc::Receiver<JsonRpcMessage>,
}

/// The bidirectional channel for one session.
pub struct SessionTransport {
    id: String,
    created_at: DateTime<Utc>,
    opened: Instant,
    /// Milliseconds after `opened` of the last inbound message.
    last_activity_ms: AtomicU64,
    outbound: mpsc::Sender<SseFrame>,
    inbound: mpsc::Sender<JsonRpcMessage>,
    cancel: CancellationToken,
    closed: AtomicBool,
    registry: Weak<dyn SessionRegistry>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SessionTransport {
    /// Build a transport whose cancellation follows `parent`.
    pub(crate) fn new(
        id: impl Into<String>,
        registry: &Arc<dyn SessionRegistry>,
        parent: &CancellationToken,
    ) -> (Arc<Self>, SessionChannels) {
        let (outbound, frames) = mpsc::channel(OUTBOUND_CAPACITY);
        let (inbound, inbox) = mpsc::channel(INBOUND_CAPACITY);

        let transport = Arc::new(Self {
            id: id.into(),
            created_at: Utc::now(),
            opened: Instant::now(),
            last_activity_ms: AtomicU64::new(0),
            outbound,
            inbound,
            cancel: parent.child_token(),
            closed: AtomicBool::new(false),
            registry: Arc::downgrade(registry),
            worker: Mutex::new(None),
        });

        (transport, SessionChannels { frames, inbox })
    }

    /// A transport with no server behind it.
    #[cfg(test)]
    pub(crate) fn detached(
        id: &str,
        registry: &Arc<dyn SessionRegistry>,
    ) -> (Arc<Self>, SessionChannels) {
        Self::new(id, registry, &CancellationToken::new())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Token cancelled when this session closes.
    pub fn closed_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn touch(&self) {
        let now = self.opened.elapsed().as_millis() as u64;
        self.last_activity_ms.fetch_max(now, Ordering::Relaxed);
    }

    pub fn idle_duration(&self) -> Duration {
        let last = Duration::from_millis(self.last_activity_ms.load(Ordering::Relaxed));
        self.opened.elapsed().saturating_sub(last)
    }

    /// Queue the endpoint frame. Only called once, on an empty channel.
    pub(crate) fn announce(&self, endpoint: String) {
        if self.outbound.try_send(SseFrame::Endpoint(endpoint)).is_err() {
            tracing::warn!(session_id = %self.id, "Failed to queue endpoint event");
        }
    }

    /// Enqueue a decoded message for the worker.
    pub(crate) async fn enqueue(&self, message: JsonRpcMessage) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::UnknownSession(self.id.clone()));
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SessionError::UnknownSession(self.id.clone())),
            sent = self.inbound.send(message) => {
                sent.map_err(|_| SessionError::UnknownSession(self.id.clone()))
            }
        }
    }

    /// Spawn the worker that feeds queued messages to `protocol` in order.
    pub(crate) fn spawn_worker(
        self: &Arc<Self>,
        protocol: Arc<ProtocolServer>,
        inbox: mpsc::Receiver<JsonRpcMessage>,
    ) {
        let span = tracing::info_span!("mcp.session.worker", mcp.session_id = %self.id);
        let handle = tokio::spawn(
            run_worker(
                self.id.clone(),
                self.outbound.clone(),
                self.cancel.clone(),
                protocol,
                inbox,
            )
            .instrument(span),
        );
        *self.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Close the session: cancel the stream, drop queued messages and
    /// unregister. Returns false if it was already closed.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.cancel.cancel();

        if let Some(registry) = self.registry.upgrade() {
            let ours = registry
                .get(&self.id)
                .is_some_and(|s| std::ptr::eq(Arc::as_ptr(s.transport()), self));
            if ours {
                registry.unregister(&self.id);
            }
        }

        tracing::info!(session_id = %self.id, "Session closed");
        true
    }

    /// Close, then wait up to `grace` for the worker to finish.
    pub async fn shutdown(&self, grace: Duration) -> Result<(), ShutdownIssue> {
        self.close();

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut handle) = handle else {
            return Ok(());
        };

        match tokio::time::timeout(grace, &mut handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) if e.is_panic() => Err(ShutdownIssue::WorkerPanicked {
                session_id: self.id.clone(),
            }),
            Ok(Err(_)) => Ok(()),
            Err(_) => {
                handle.abort();
                Err(ShutdownIssue::WorkerTimedOut {
                    session_id: self.id.clone(),
                    grace_ms: grace.as_millis() as u64,
                })
            }
        }
    }
}

impl std::fmt::Debug for SessionTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTransport")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

async fn run_worker(
    session_id: String,
    outbound: mpsc::Sender<SseFrame>,
    cancel: CancellationToken,
    protocol: Arc<ProtocolServer>,
    mut inbox: mpsc::Receiver<JsonRpcMessage>,
) {
    loop {
        let message = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = inbox.recv() => match next {
                Some(message) => message,
                None => break,
            },
        };

        // not raced against cancel: an in-flight handler runs to completion
        let ctx = ToolContext::new(session_id.clone(), cancel.clone());
        let Some(response) = protocol.handle_message(&message, ctx).await else {
            continue;
        };

        let payload = match serde_json::to_string(&response) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response");
                continue;
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Session closed, response discarded");
                break;
            }
            sent = outbound.send(SseFrame::Message(payload)) => {
                if sent.is_err() {
                    tracing::debug!("SSE stream gone, worker exiting");
                    break;
                }
            }
        }
    }
    tracing::debug!("Session worker finished");
}

/// Closes its transport when dropped.
struct CloseGuard(Arc<SessionTransport>);

impl Drop for CloseGuard {
    fn drop(&mut self) {
        if self.0.close() {
            tracing::info!(session_id = %self.0.id, "SSE client disconnected");
        }
    }
}

/// The outbound half of an open session.
///
/// Dropping it closes the session, which is how a client disconnect
/// propagates from the HTTP layer.
pub struct SessionStream {
    guard: CloseGuard,
    frames: mpsc::Receiver<SseFrame>,
}

impl SessionStream {
    pub(crate) fn new(transport: Arc<SessionTransport>, frames: mpsc::Receiver<SseFrame>) -> Self {
        Self {
            guard: CloseGuard(transport),
            frames,
        }
    }

    pub fn id(&self) -> &str {
        self.guard.0.id()
    }

    pub fn transport(&self) -> &Arc<SessionTransport> {
        &self.guard.0
    }

    /// Next frame, or `None` once the session is closed.
    pub async fn recv(&mut self) -> Option<SseFrame> {
        tokio::select! {
            biased;
            frame = self.frames.recv() => frame,
            _ = self.guard.0.cancel.cancelled() => None,
        }
    }

    /// Convert into SSE events, ending when the session closes.
    pub fn into_events(self) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
        let SessionStream { guard, frames } = self;
        let closed = guard.0.cancel.clone().cancelled_owned();

        ReceiverStream::new(frames)
            .take_until(closed)
            .map(move |frame| {
                let _guard = &guard;
                Ok(frame.into_event())
            })
    }
}
