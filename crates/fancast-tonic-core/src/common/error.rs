//! Error types for the chat fan-out service.
//!
//! This module defines the central `Error` enum, which captures all
//! recoverable and reportable error cases within the fan-out system. It
//! implements `From<Error>` for `tonic::Status` to enable seamless gRPC error
//! propagation to clients with appropriate status codes and messages.
//!
//! ## Error Cases
//! - `ChannelError`: An internal communication failure between tasks.
//! - `OutOfRange`: A log read past the current end. Dispatchers only read
//!   positions they know exist, so this indicates a logic bug, not a client
//!   mistake.
//! - `MalformedNote`: A submitted note was missing required fields.
//! - `SubscriptionCancelled`: The client tore down the call mid-flight.
//! - `ServiceShutdown`: A request arrived while the service was shutting
//!   down.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the chat fan-out service.
#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    /// Internal channel send/receive failure (e.g., closed or full channel).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// A log read addressed a sequence number that does not exist yet.
    #[error("Sequence {seq} is out of range (log length {len})")]
    OutOfRange { seq: u64, len: u64 },

    /// The submitted note was missing required fields.
    #[error("Malformed note: {reason}")]
    MalformedNote { reason: String },

    /// The client aborted the call.
    #[error("Subscription cancelled by client")]
    SubscriptionCancelled,

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::ChannelError { context } => {
                Status::internal(format!("Channel error: {}", context))
            }
            Error::OutOfRange { seq, len } => Status::internal(format!(
                "Log read out of range: sequence {} with length {}",
                seq, len
            )),
            Error::MalformedNote { reason } => Status::invalid_argument(reason),
            Error::SubscriptionCancelled => Status::cancelled("Subscription was cancelled"),
            Error::ServiceShutdown => Status::unavailable("Service is shutting down"),
        }
    }
}
