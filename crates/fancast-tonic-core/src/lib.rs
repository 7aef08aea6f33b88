#![doc = include_str!("../README.md")]

mod common;
pub use common::*;

/// Generated protobuf and gRPC bindings for the `fancast` package.
pub mod proto {
    include!(concat!(env!("OUT_DIR"), "/fancast.rs"));

    /// Encoded file descriptor set for the `fancast` package, used to
    /// register gRPC reflection on the server.
    pub const FILE_DESCRIPTOR_SET: &[u8] =
        include_bytes!(concat!(env!("OUT_DIR"), "/fancast_descriptor.bin"));
}
