//! Entry point for the `simsock` demo binary.
//!
//! `simsock host` binds a port and prints every test payload it receives,
//! `simsock client` connects to a host and keeps sending the payload. Both
//! reconnect on their own when the peer disappears.

use crate::error::AppError;
use clap::{Args, Parser, Subcommand};
use log::info;
use simsock_core::{Endpoint, EndpointConfig, Transport};
use simsock_demo::DemoLimits;
use simsock_demo::listen::Listener;
use simsock_demo::payload::TestPayload;
use simsock_demo::transmit::Transmitter;
use std::time::Duration;

mod error;

#[derive(Debug, Parser, Default)]
#[clap(ignore_errors = true)]
struct PreCli {
    /// Optional `.env` file path for loading environment variables.
    #[clap(short, long, value_name = "ENV_FILE")]
    env_file: Option<String>,
}

#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,

    /// Optional `.env` file path for loading environment variables.
    #[clap(short, long, value_name = "ENV_FILE", global = true)]
    env_file: Option<String>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Bind a local port and receive test payloads.
    Host {
        /// Local port to bind.
        #[clap(
            short = 'p',
            long,
            value_name = "PORT",
            env = "SIMSOCK_PORT",
            default_value = "9000"
        )]
        port: u16,
    },
    /// Connect to a host and send test payloads.
    Client {
        /// Host name or IPv4 address to connect to.
        #[clap(short = 's', long, value_name = "HOST", env = "SIMSOCK_HOST")]
        host: String,

        /// Remote port to connect to.
        #[clap(
            short = 'p',
            long,
            value_name = "PORT",
            env = "SIMSOCK_PORT",
            default_value = "9000"
        )]
        port: u16,
    },
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Transport protocol, tcp or udp.
    #[clap(
        short = 't',
        long,
        value_name = "TRANSPORT",
        env = "SIMSOCK_TRANSPORT",
        default_value = "tcp",
        global = true
    )]
    transport: Transport,

    /// Retry interval in milliseconds between reconnect attempts.
    #[clap(
        long,
        value_name = "RETRY_INTERVAL_MS",
        env = "SIMSOCK_RETRY_INTERVAL_MS",
        default_value = "1000",
        global = true
    )]
    retry_interval_ms: u64,

    /// Maximum reconnect attempts per transfer; unbounded when omitted.
    #[clap(long, value_name = "MAX_RETRIES", env = "SIMSOCK_MAX_RETRIES", global = true)]
    max_retries: Option<usize>,

    /// Read/write timeout in milliseconds; none when omitted.
    #[clap(long, value_name = "IO_TIMEOUT_MS", env = "SIMSOCK_IO_TIMEOUT_MS", global = true)]
    io_timeout_ms: Option<u64>,

    /// Number of payload rounds; runs forever when omitted.
    #[clap(short = 'n', long, value_name = "ITERATIONS", env = "SIMSOCK_ITERATIONS", global = true)]
    iterations: Option<usize>,

    /// Pause in seconds between payload rounds.
    #[clap(
        long,
        value_name = "PAUSE",
        env = "SIMSOCK_PAUSE",
        default_value = "2",
        global = true
    )]
    pause: u64,

    /// Log level.
    #[clap(
        short = 'l',
        long,
        value_name = "LOG_LEVEL",
        env = "SIMSOCK_LOG_LEVEL",
        default_value = "info",
        global = true
    )]
    log_level: String,
}

impl CommonArgs {
    fn endpoint_config(&self) -> EndpointConfig {
        EndpointConfig {
            retry_interval_ms: self.retry_interval_ms,
            max_retries: self.max_retries,
            io_timeout_ms: self.io_timeout_ms,
            ..EndpointConfig::default()
        }
    }

    fn limits(&self) -> DemoLimits {
        DemoLimits {
            iterations: self.iterations,
            pause: Duration::from_secs(self.pause),
        }
    }
}

fn main() -> Result<(), AppError> {
    // the env file has to be loaded before clap reads the SIMSOCK_* variables
    let pre = PreCli::try_parse().unwrap_or_default();
    if let Some(env_file) = pre.env_file {
        dotenvy::from_filename(env_file)?;
    } else {
        dotenvy::dotenv().ok();
    }

    let cli = Cli::parse();

    let filters = format!(
        "simsock={0},simsock_core={0},simsock_demo={0}",
        cli.common.log_level
    );
    env_logger::Builder::new().parse_filters(&filters).init();

    let config = cli.common.endpoint_config();
    let limits = cli.common.limits();
    let transport = cli.common.transport;

    match cli.mode {
        Mode::Host { port } => {
            let endpoint = Endpoint::host(port, transport, config)?;
            info!("Starting {endpoint}");
            let mut listener = Listener::new(endpoint, limits);
            let received = listener.receive_payloads(|_| {});
            info!("Received {received} payloads");
        }
        Mode::Client { host, port } => {
            let endpoint = Endpoint::client(&host, port, transport, config)?;
            info!("Starting {endpoint}");
            let mut transmitter = Transmitter::new(endpoint, TestPayload::default(), limits);
            let delivered = transmitter.transmit_payloads();
            info!("Sent {delivered} payloads");
        }
    }
    Ok(())
}
