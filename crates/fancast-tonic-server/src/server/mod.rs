//! Server internals: configuration, the shared message log, per-stream
//! dispatch, the gRPC service implementation, and telemetry.

pub mod config;
pub mod log;
pub mod service;
pub mod streaming;
pub mod telemetry;
