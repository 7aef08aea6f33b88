use anyhow::bail;
use clap::Parser;

/// Runtime configuration for the `fancast-tonic-server` binary.
///
/// These settings control buffering, listener placement, and shutdown
/// behavior of the chat fan-out service. All values are parsed from CLI
/// arguments or environment variables, with reasonable defaults suitable
/// for production.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fancast-tonic-server",
    version,
    about = "A gRPC service that fans out chat messages to live subscribers"
)]
pub struct CliArgs {
    /// Capacity of the per-subscription response buffer.
    ///
    /// Each open subscription gets its own bounded channel between the
    /// dispatcher task and the gRPC stream. A slow client fills its own
    /// buffer and backpressures only its own dispatcher; the shared log and
    /// other subscribers are unaffected.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 32)]
    pub stream_buffer_size: usize,

    /// Seconds graceful shutdown waits for live subscriptions to wind down
    /// before the process exits anyway.
    ///
    /// Environment variable: `DRAIN_TIMEOUT_SECS`
    #[arg(long, env = "DRAIN_TIMEOUT_SECS", default_value_t = 3)]
    pub drain_timeout_secs: u64,

    /// Address to listen on (TCP or Unix socket path; use --uds for Unix socket).
    ///
    /// Example: "0.0.0.0:50051" or "/tmp/fancast-uds.sock"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:50051"))]
    pub server_addr: String,

    /// Listen on a Unix socket instead of TCP. If set, `SERVER_ADDR` must be a file path.
    #[arg(short, long, default_value_t = false)]
    pub uds: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub stream_buffer_size: usize,
    pub drain_timeout_secs: u64,
    pub server_addr: String,
    pub uds: bool,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        Ok(Self {
            stream_buffer_size: args.stream_buffer_size,
            drain_timeout_secs: args.drain_timeout_secs,
            server_addr: args.server_addr,
            uds: args.uds,
        })
    }
}
