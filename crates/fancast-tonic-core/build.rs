//! Builds the gRPC client and server code for the `fancast.proto` definition
//! using `tonic-prost-build`.
//!
//! The build also emits a file descriptor set (`fancast_descriptor.bin`) into
//! `OUT_DIR` so the server binary can register gRPC reflection.
//!
//! Generated code is accessible in Rust via:
//!
//! ```rust,ignore
//! pub mod proto {
//!     include!(concat!(env!("OUT_DIR"), "/fancast.rs"));
//! }
//! ```
use std::env;
use std::path::PathBuf;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("fancast_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/fancast.proto"], &["proto"])
        .unwrap();
}
