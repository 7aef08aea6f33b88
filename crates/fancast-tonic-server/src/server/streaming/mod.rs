//! Per-subscription stream dispatch.
//!
//! Each open `Subscribe` call gets its own dispatcher task that walks the
//! shared [`MessageLog`](crate::server::log::MessageLog) from the position
//! observed at subscription time and forwards every later entry to the
//! client, in log order, for the life of the connection.
//!
//! ## Structure
//!
//! - [`dispatcher`] - the dispatcher loop ([`run_subscription`]).
//!
//! [`run_subscription`]: dispatcher::run_subscription

pub mod dispatcher;
