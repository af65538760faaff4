//! Cancellable subscriber for the room score stream.
//!
//! [`EventStreamClient::subscribe`] spawns one background task per
//! subscription. The task opens the stream, feeds every chunk through its own
//! [`FrameDecoder`], parses each completed frame as JSON and calls the handler
//! once per message, strictly in arrival order. The next chunk is not read
//! until the handler has returned.
//!
//! Failures never reach the caller as errors: a rejected open, a transport
//! failure or a clean end all finish the task and are visible only through
//! logs and [`SubscriptionHandle::finished`]. Cancellation is reported as
//! [`SubscriptionEnd::Cancelled`] and logged at debug level only.
//!
//! # Example
//!
//! ```rust,ignore
//! let client = EventStreamClient::new(Arc::new(api));
//! let handle = client.subscribe(StreamEndpoint::game_scores(42), |payload| {
//!     println!("score update: {payload}");
//! });
//! // …
//! handle.cancel();
//! ```

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::frame::{decode_frame, FrameDecoder};
use crate::transport::{OpenError, StreamEndpoint, StreamOpener};

/// How a subscription finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEnd {
    /// The server closed the stream.
    Completed,
    /// The subscription was cancelled by its owner.
    Cancelled,
    /// The open request returned a non-success status; no message was delivered.
    Rejected {
        /// HTTP status code.
        status: u16,
    },
    /// The connection failed.
    Failed(String),
}

impl SubscriptionEnd {
    /// Returns `true` for outcomes that indicate a problem (rejection or failure).
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::Failed(_))
    }
}

impl fmt::Display for SubscriptionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("stream completed"),
            Self::Cancelled => f.write_str("stream cancelled"),
            Self::Rejected { status } => write!(f, "stream rejected with status {status}"),
            Self::Failed(reason) => write!(f, "stream failed: {reason}"),
        }
    }
}

/// Opens score-stream subscriptions through a shared [`StreamOpener`].
///
/// Subscriptions share nothing but the opener: each owns its decode buffer
/// and cancellation signal, so concurrent subscriptions never interfere.
#[derive(Clone)]
pub struct EventStreamClient {
    opener: Arc<dyn StreamOpener>,
}

impl EventStreamClient {
    /// Create a client that opens streams through `opener`.
    pub fn new(opener: Arc<dyn StreamOpener>) -> Self {
        Self { opener }
    }

    /// Subscribe to `endpoint`, invoking `on_message` once per complete message.
    ///
    /// Must be called from within a Tokio runtime. The returned handle cancels
    /// the subscription when [`cancel`](SubscriptionHandle::cancel) is called
    /// or when it is dropped.
    #[must_use = "dropping the handle cancels the subscription"]
    pub fn subscribe<F>(&self, endpoint: StreamEndpoint, on_message: F) -> SubscriptionHandle
    where
        F: FnMut(serde_json::Value) + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        debug!(endpoint = %endpoint, "subscribing to event stream");
        let task = tokio::spawn(subscription_loop(
            Arc::clone(&self.opener),
            endpoint.clone(),
            on_message,
            cancel_rx,
        ));
        SubscriptionHandle {
            endpoint,
            cancel_tx,
            task: Some(task),
            outcome: None,
        }
    }
}

impl fmt::Debug for EventStreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStreamClient").finish_non_exhaustive()
    }
}

/// Owner of one running subscription.
pub struct SubscriptionHandle {
    endpoint: StreamEndpoint,
    cancel_tx: watch::Sender<bool>,
    task: Option<JoinHandle<SubscriptionEnd>>,
    outcome: Option<SubscriptionEnd>,
}

impl SubscriptionHandle {
    /// Abort the subscription. Any in-flight read is abandoned immediately.
    ///
    /// Idempotent, and harmless after the stream has already ended.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    /// Returns `true` once the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// The endpoint this subscription reads from.
    pub fn endpoint(&self) -> &StreamEndpoint {
        &self.endpoint
    }

    /// Wait for the subscription to end and return how it ended.
    ///
    /// May be called repeatedly; later calls return the cached outcome.
    ///
    /// # Cancel Safety
    ///
    /// Cancel-safe: the task stays owned by the handle until it has finished,
    /// so this can be a `tokio::select!` branch.
    pub async fn finished(&mut self) -> SubscriptionEnd {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        let outcome = match self.task.as_mut() {
            Some(task) => match task.await {
                Ok(end) => end,
                Err(join_err) if join_err.is_cancelled() => SubscriptionEnd::Cancelled,
                Err(join_err) => {
                    error!(endpoint = %self.endpoint, "subscription task failed: {join_err}");
                    SubscriptionEnd::Failed(join_err.to_string())
                }
            },
            None => SubscriptionEnd::Cancelled,
        };
        self.task = None;
        self.outcome = Some(outcome.clone());
        outcome
    }

    /// Cancel and wait until the task has stopped.
    ///
    /// Returns the outcome; if the stream had already ended on its own, that
    /// earlier outcome is returned instead of `Cancelled`.
    pub async fn close(&mut self) -> SubscriptionEnd {
        self.cancel();
        self.finished().await
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("endpoint", &self.endpoint)
            .field("cancelled", &*self.cancel_tx.borrow())
            .field("finished", &self.is_finished())
            .finish()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel_tx.send_replace(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Subscription loop ───────────────────────────────────────────────

/// Resolves once cancellation was requested or the handle is gone.
async fn cancelled(cancel_rx: &mut watch::Receiver<bool>) {
    // An error means the sender (the handle) was dropped, which also cancels.
    let _ = cancel_rx.wait_for(|cancelled| *cancelled).await;
}

async fn subscription_loop<F>(
    opener: Arc<dyn StreamOpener>,
    endpoint: StreamEndpoint,
    mut on_message: F,
    mut cancel_rx: watch::Receiver<bool>,
) -> SubscriptionEnd
where
    F: FnMut(serde_json::Value) + Send + 'static,
{
    let opened = tokio::select! {
        biased;
        _ = cancelled(&mut cancel_rx) => {
            debug!(endpoint = %endpoint, "subscription cancelled before open");
            return SubscriptionEnd::Cancelled;
        }
        result = opener.open(&endpoint) => result,
    };

    let mut source = match opened {
        Ok(source) => source,
        Err(OpenError::Rejected { status }) => {
            error!(endpoint = %endpoint, status, "event stream connection rejected");
            return SubscriptionEnd::Rejected { status };
        }
        Err(OpenError::Failed(e)) => {
            error!(endpoint = %endpoint, "event stream connection failed: {e}");
            return SubscriptionEnd::Failed(e.to_string());
        }
    };
    info!(endpoint = %endpoint, "event stream opened");

    let mut decoder = FrameDecoder::new();
    let mut delivered: u64 = 0;

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancelled(&mut cancel_rx) => {
                debug!(endpoint = %endpoint, delivered, "subscription cancelled");
                return SubscriptionEnd::Cancelled;
            }
            chunk = source.next_chunk() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                for frame in decoder.push(&bytes) {
                    if *cancel_rx.borrow() {
                        debug!(endpoint = %endpoint, delivered, "subscription cancelled mid-batch");
                        return SubscriptionEnd::Cancelled;
                    }
                    match decode_frame(&frame) {
                        Some(Ok(payload)) => {
                            delivered += 1;
                            on_message(payload);
                        }
                        Some(Err(e)) => {
                            warn!(endpoint = %endpoint, "failed to parse event stream JSON: {e}; raw: {frame}");
                        }
                        None => {
                            debug!(endpoint = %endpoint, "skipping frame without data field");
                        }
                    }
                }
            }
            Some(Err(e)) => {
                error!(endpoint = %endpoint, "event stream error: {e}");
                return SubscriptionEnd::Failed(e.to_string());
            }
            None => {
                if decoder.buffered_len() > 0 {
                    debug!(
                        endpoint = %endpoint,
                        bytes = decoder.buffered_len(),
                        "discarding unterminated frame at end of stream"
                    );
                }
                debug!(endpoint = %endpoint, delivered, "event stream closed by server");
                return SubscriptionEnd::Completed;
            }
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::error::OceanSaverError;
    use crate::transport::ChunkSource;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    type Script = Vec<Option<Result<Vec<u8>, OceanSaverError>>>;

    /// Replays scripted chunks, then hangs until cancelled.
    struct ScriptedSource {
        chunks: VecDeque<Option<Result<Vec<u8>, OceanSaverError>>>,
    }

    #[async_trait]
    impl ChunkSource for ScriptedSource {
        async fn next_chunk(&mut self) -> Option<Result<Vec<u8>, OceanSaverError>> {
            match self.chunks.pop_front() {
                Some(item) => item,
                None => std::future::pending().await,
            }
        }
    }

    struct ScriptedOpener {
        script: StdMutex<Option<Script>>,
        status: Option<u16>,
    }

    impl ScriptedOpener {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script: StdMutex::new(Some(script)),
                status: None,
            })
        }

        fn rejecting(status: u16) -> Arc<Self> {
            Arc::new(Self {
                script: StdMutex::new(None),
                status: Some(status),
            })
        }
    }

    #[async_trait]
    impl StreamOpener for ScriptedOpener {
        async fn open(
            &self,
            _endpoint: &StreamEndpoint,
        ) -> Result<Box<dyn ChunkSource>, OpenError> {
            if let Some(status) = self.status {
                return Err(OpenError::Rejected { status });
            }
            let chunks = self.script.lock().unwrap().take().unwrap_or_default();
            Ok(Box::new(ScriptedSource {
                chunks: chunks.into(),
            }))
        }
    }

    fn collect() -> (
        Arc<StdMutex<Vec<serde_json::Value>>>,
        impl FnMut(serde_json::Value) + Send + 'static,
    ) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |v| sink.lock().unwrap().push(v))
    }

    #[tokio::test]
    async fn delivers_frames_then_completes() {
        let opener = ScriptedOpener::new(vec![
            Some(Ok(b"data: {\"n\":1}\n\ndata: {\"n\"".to_vec())),
            Some(Ok(b":2}\n\n".to_vec())),
            None,
        ]);
        let (seen, handler) = collect();
        let mut handle = EventStreamClient::new(opener).subscribe(StreamEndpoint::game_scores(1), handler);

        assert_eq!(handle.finished().await, SubscriptionEnd::Completed);
        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![serde_json::json!({"n":1}), serde_json::json!({"n":2})]);
    }

    #[tokio::test]
    async fn rejected_open_never_calls_handler() {
        let (seen, handler) = collect();
        let mut handle = EventStreamClient::new(ScriptedOpener::rejecting(403))
            .subscribe(StreamEndpoint::game_scores(1), handler);

        assert_eq!(handle.finished().await, SubscriptionEnd::Rejected { status: 403 });
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transport_error_ends_subscription() {
        let opener = ScriptedOpener::new(vec![Some(Err(OceanSaverError::Transport(
            "reset".into(),
        )))]);
        let (_seen, handler) = collect();
        let mut handle = EventStreamClient::new(opener).subscribe(StreamEndpoint::game_scores(1), handler);

        let end = handle.finished().await;
        assert!(matches!(&end, SubscriptionEnd::Failed(reason) if reason.contains("reset")));
        assert!(end.is_error());
    }

    #[tokio::test]
    async fn cancel_is_idempotent_and_reported() {
        let opener = ScriptedOpener::new(vec![]);
        let (seen, handler) = collect();
        let mut handle = EventStreamClient::new(opener).subscribe(StreamEndpoint::game_scores(1), handler);

        handle.cancel();
        handle.cancel();
        assert_eq!(handle.finished().await, SubscriptionEnd::Cancelled);
        handle.cancel();
        assert_eq!(handle.close().await, SubscriptionEnd::Cancelled);
        assert!(handle.is_finished());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancel_after_natural_end_keeps_outcome() {
        let opener = ScriptedOpener::new(vec![None]);
        let (_seen, handler) = collect();
        let mut handle = EventStreamClient::new(opener).subscribe(StreamEndpoint::game_scores(1), handler);

        assert_eq!(handle.finished().await, SubscriptionEnd::Completed);
        handle.cancel();
        assert_eq!(handle.close().await, SubscriptionEnd::Completed);
    }

    #[tokio::test]
    async fn debug_impl_for_handle() {
        let (_seen, handler) = collect();
        let handle = EventStreamClient::new(ScriptedOpener::new(vec![]))
            .subscribe(StreamEndpoint::game_scores(7), handler);
        let debug_str = format!("{handle:?}");
        assert!(debug_str.contains("/games/7/subscribe"));
    }
}
