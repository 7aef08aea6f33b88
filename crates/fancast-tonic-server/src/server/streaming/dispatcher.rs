//! The per-subscription dispatcher loop.

use crate::server::log::MessageLog;
use fancast_tonic_core::{Error, Result, proto::Note, types::SeqNo};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tonic::Status;

/// Drives one open subscription until the client disconnects or the service
/// shuts down.
///
/// The loop alternates between two states:
///
/// - **Catching up**: while `cursor` is behind the log, read `at(cursor)`,
///   forward it to the client channel, and advance. Delivery order is log
///   order because a single task walks the cursor sequentially.
/// - **Idle**: once caught up, park on the log's growth signal. The wait is
///   also broken by the client hanging up (`resp_tx.closed()`) or by
///   service shutdown, so an idle dispatcher never outlives its connection.
///
/// A closed client channel is treated as a normal disconnect and returns
/// `Ok(())`; it is never reported as a failure. The only error this
/// function can produce is [`Error::OutOfRange`] from a log read, which
/// indicates a dispatcher bug and aborts just this subscription.
///
/// # Arguments
///
/// - `log`: The shared append-only message log.
/// - `cursor`: First sequence number to deliver. `Subscribe` passes the log
///   length observed at call time, so no backlog is replayed.
/// - `resp_tx`: Bounded channel feeding the client's gRPC stream. A slow
///   client backpressures only its own dispatcher here.
/// - `shutdown`: Service-wide token; cancelling it ends the subscription
///   with a best-effort `Unavailable` status.
pub async fn run_subscription(
    log: Arc<MessageLog>,
    mut cursor: SeqNo,
    resp_tx: mpsc::Sender<core::result::Result<Note, Status>>,
    shutdown: CancellationToken,
) -> Result<()> {
    let mut growth = log.watch_len();

    loop {
        while cursor < log.len() {
            let note = log.at(cursor)?;
            if resp_tx.send(Ok(note)).await.is_err() {
                // Client went away mid-delivery.
                return Ok(());
            }
            cursor += 1;
        }

        tokio::select! {
            changed = growth.changed() => {
                if changed.is_err() {
                    // The log was dropped out from under us; only possible
                    // during teardown.
                    return Err(Error::ChannelError {
                        context: "log growth watch closed".to_string(),
                    });
                }
            }
            () = resp_tx.closed() => return Ok(()),
            () = shutdown.cancelled() => {
                // Let the client know the stream ended because of shutdown,
                // if it is still listening.
                let _ = resp_tx.try_send(Err(Error::ServiceShutdown.into()));
                return Ok(());
            }
        }
    }
}
