//! gRPC service implementation for chat fan-out.
//!
//! This module defines [`ChatService`], the concrete implementation of the
//! [`Chat`] gRPC service defined in the protobuf specification. It exposes a
//! unary submission endpoint and a long-lived streaming endpoint through
//! which every submitted note is fanned out, in append order, to all
//! currently-connected subscribers.
//!
//! ## Responsibilities
//!
//! - Validate incoming notes and append them to the shared [`MessageLog`].
//! - Spawn one dispatcher task per open subscription via
//!   [`run_subscription`].
//! - Track live subscriptions for graceful shutdown and telemetry.

use crate::server::{
    config::ServerConfig,
    log::MessageLog,
    streaming::dispatcher::run_subscription,
    telemetry::{
        decrement_subscribers_inflight, increment_errors, increment_notes_delivered,
        increment_notes_received, increment_requests, increment_subscribers_inflight,
        record_subscription_duration,
    },
};
use core::pin::Pin;
use core::time::Duration;
use fancast_tonic_core::{
    Error,
    proto::{Note, SendAck, SubscribeRequest, chat_server::Chat},
};
use futures::TryStreamExt;
use portable_atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::{
    sync::mpsc,
    time::{sleep, timeout},
};
use tokio_stream::{Stream, wrappers::ReceiverStream};
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};

/// Chat fan-out gRPC service.
///
/// Implements the [`Chat`] service defined in the protobuf schema. All
/// state is held behind `Arc`s so the service can be cheaply cloned into
/// the tonic router; the [`MessageLog`] is the single source of truth that
/// every handler reads from or appends to.
#[derive(Clone)]
pub struct ChatService {
    config: ServerConfig,
    log: Arc<MessageLog>,
    shutdown_token: CancellationToken,
    live_subscriptions: Arc<AtomicUsize>,
}

impl ChatService {
    /// Creates a new `ChatService` with an empty message log.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            log: Arc::new(MessageLog::new()),
            shutdown_token: CancellationToken::new(),
            live_subscriptions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Initiates a graceful shutdown.
    ///
    /// Cancelling the shutdown token refuses new calls and wakes every idle
    /// dispatcher, which ends its stream with an `Unavailable` status. The
    /// call then blocks until all live subscriptions have wound down, up to
    /// `drain_timeout_secs`.
    pub async fn shutdown(&self) -> Result<(), Error> {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Refusing new calls and ending {} live subscriptions",
            self.live_subscriptions.load(Ordering::Acquire)
        );
        self.shutdown_token.cancel();

        let drain_result = timeout(
            Duration::from_secs(self.config.drain_timeout_secs),
            async {
                while self.live_subscriptions.load(Ordering::Acquire) > 0 {
                    sleep(Duration::from_millis(100)).await;
                }
            },
        )
        .await;

        match drain_result {
            Ok(()) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("All subscriptions drained successfully");
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "Graceful drain timed out ({} subscriptions still live)",
                    self.live_subscriptions.load(Ordering::Acquire)
                );
            }
        }

        Ok(())
    }
}

fn validate_note(note: &Note) -> Result<(), Status> {
    if note.sender.is_empty() {
        return Err(Error::MalformedNote {
            reason: "sender must be non-empty".to_string(),
        }
        .into());
    }
    if note.content.is_empty() {
        return Err(Error::MalformedNote {
            reason: "content must be non-empty".to_string(),
        }
        .into());
    }
    Ok(())
}

#[tonic::async_trait]
impl Chat for ChatService {
    type SubscribeStream = Pin<Box<dyn Stream<Item = Result<Note, Status>> + Send>>;

    /// Appends one note to the shared log and acknowledges.
    ///
    /// Notes missing a sender or content are rejected with
    /// `InvalidArgument` before the log is touched. Acceptance order is the
    /// log's append order; concurrent submissions are serialized by the log
    /// itself.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(sender = %req.get_ref().sender)))]
    async fn send_note(&self, req: Request<Note>) -> Result<Response<SendAck>, Status> {
        if self.shutdown_token.is_cancelled() {
            increment_errors();
            return Err(Error::ServiceShutdown.into());
        }

        let note = req.into_inner();
        if let Err(status) = validate_note(&note) {
            increment_errors();
            return Err(status);
        }

        let _seq = self.log.append(note);
        increment_notes_received();

        Ok(Response::new(SendAck {}))
    }

    /// Opens a long-lived subscription stream.
    ///
    /// The delivery cursor is snapshotted at the current end of the log
    /// before the stream is handed back, so the subscriber receives exactly
    /// the notes appended after this call, in order, and none from before
    /// it. The stream only ends when the client hangs up or the service
    /// shuts down.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    async fn subscribe(
        &self,
        _req: Request<SubscribeRequest>,
    ) -> Result<Response<Self::SubscribeStream>, Status> {
        if self.shutdown_token.is_cancelled() {
            increment_errors();
            return Err(Error::ServiceShutdown.into());
        }

        let start = std::time::Instant::now();
        increment_requests();
        increment_subscribers_inflight();
        self.live_subscriptions.fetch_add(1, Ordering::AcqRel);

        // Snapshot before handing back the stream: the subscriber sees
        // every note appended after this point and none before it.
        let cursor = self.log.len();
        let (resp_tx, resp_rx) = mpsc::channel(self.config.stream_buffer_size);

        let log = Arc::clone(&self.log);
        let shutdown = self.shutdown_token.clone();
        let live_subscriptions = Arc::clone(&self.live_subscriptions);

        let fut = async move {
            // Kept aside so a dispatcher failure can still be surfaced on
            // the stream.
            let err_tx = resp_tx.clone();
            match run_subscription(log, cursor, resp_tx, shutdown).await {
                Ok(()) => {
                    record_subscription_duration(start.elapsed().as_millis() as f64);
                }
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Subscription aborted: {}", e);
                    let _ = err_tx.try_send(Err(e.into()));
                }
            }
            live_subscriptions.fetch_sub(1, Ordering::AcqRel);
            decrement_subscribers_inflight();
        };
        #[cfg(feature = "tracing")]
        let fut = {
            use tracing::Instrument;
            let span = tracing::info_span!("subscription");
            let fut = fut.instrument(span);
            fut
        };

        tokio::spawn(fut);

        let stream = ReceiverStream::new(resp_rx)
            .inspect_ok(|_note| {
                increment_notes_delivered();
            })
            .inspect_err(move |_e| {
                increment_errors();
            });

        Ok(Response::new(Box::pin(stream)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    const RECV_TIMEOUT: Duration = Duration::from_secs(1);

    fn test_service() -> ChatService {
        ChatService::new(ServerConfig {
            stream_buffer_size: 8,
            drain_timeout_secs: 1,
            server_addr: "127.0.0.1:0".to_string(),
            uds: false,
        })
    }

    fn note(sender: &str, content: &str) -> Note {
        Note {
            sender: sender.to_string(),
            content: content.to_string(),
        }
    }

    async fn next_note(stream: &mut <ChatService as Chat>::SubscribeStream) -> Note {
        timeout(RECV_TIMEOUT, stream.next())
            .await
            .expect("timed out waiting for a note")
            .expect("stream ended unexpectedly")
            .expect("stream yielded an error status")
    }

    #[tokio::test]
    async fn subscriber_receives_sends_in_order() {
        let service = test_service();

        let mut stream = service
            .subscribe(Request::new(SubscribeRequest {}))
            .await
            .unwrap()
            .into_inner();

        service
            .send_note(Request::new(note("A", "hi")))
            .await
            .unwrap();
        service
            .send_note(Request::new(note("B", "yo")))
            .await
            .unwrap();

        assert_eq!(next_note(&mut stream).await, note("A", "hi"));
        assert_eq!(next_note(&mut stream).await, note("B", "yo"));
    }

    #[tokio::test]
    async fn late_subscriber_never_sees_backlog() {
        let service = test_service();

        service
            .send_note(Request::new(note("A", "hi")))
            .await
            .unwrap();

        let mut stream = service
            .subscribe(Request::new(SubscribeRequest {}))
            .await
            .unwrap()
            .into_inner();

        service
            .send_note(Request::new(note("B", "yo")))
            .await
            .unwrap();

        // The first delivered note is the post-connect one.
        assert_eq!(next_note(&mut stream).await, note("B", "yo"));
    }

    #[tokio::test]
    async fn malformed_notes_are_rejected_without_growing_the_log() {
        let service = test_service();

        let status = service
            .send_note(Request::new(note("", "hi")))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let status = service
            .send_note(Request::new(note("A", "")))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        assert!(service.log.is_empty());
    }

    #[tokio::test]
    async fn dropped_subscriber_does_not_affect_the_submit_path() {
        let service = test_service();

        let gone = service
            .subscribe(Request::new(SubscribeRequest {}))
            .await
            .unwrap()
            .into_inner();
        let mut live = service
            .subscribe(Request::new(SubscribeRequest {}))
            .await
            .unwrap()
            .into_inner();

        drop(gone);

        service
            .send_note(Request::new(note("A", "still here")))
            .await
            .unwrap();

        assert_eq!(next_note(&mut live).await, note("A", "still here"));
    }

    #[tokio::test]
    async fn shutdown_refuses_new_calls_and_ends_streams() {
        let service = test_service();

        let mut stream = service
            .subscribe(Request::new(SubscribeRequest {}))
            .await
            .unwrap()
            .into_inner();

        service.shutdown().await.unwrap();

        // The idle subscription is ended with an Unavailable status.
        let item = timeout(RECV_TIMEOUT, stream.next())
            .await
            .expect("timed out waiting for shutdown status")
            .expect("stream ended without a status");
        assert_eq!(item.unwrap_err().code(), tonic::Code::Unavailable);
        assert!(timeout(RECV_TIMEOUT, stream.next()).await.unwrap().is_none());

        // New calls are refused.
        let status = service
            .send_note(Request::new(note("A", "hi")))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::Unavailable);

        let status = service
            .subscribe(Request::new(SubscribeRequest {}))
            .await
            .err()
            .unwrap();
        assert_eq!(status.code(), tonic::Code::Unavailable);
    }
}
