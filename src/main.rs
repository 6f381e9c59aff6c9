//! IMULink - A Sensor-Device Command & Telemetry Protocol Engine
//!
//! This is the main entry point for the IMULink daemon. It loads the
//! persisted configuration, binds the UDP command endpoint, and starts
//! the discovery broadcaster.

use imulink::commands::{CommandHandler, DeviceControl, DeviceState};
use imulink::session::{
    run_udp_endpoint, Announcer, Session, SessionStats, ANNOUNCEMENT_INTERVAL, ANNOUNCEMENT_PORT,
};
use imulink::settings::{ConfigStore, JsonFileStore, SettingsRegistry};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Daemon configuration
struct Config {
    /// UDP port the command endpoint listens on
    port: u16,
    /// Live configuration file
    config_path: String,
    /// Factory default configuration file
    defaults_path: String,
    /// Whether to broadcast discovery announcements
    announce: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: imulink::DEFAULT_COMMAND_PORT,
            config_path: "config.json".to_string(),
            defaults_path: "default_config.json".to_string(),
            announce: true,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--port" | "-p" => {
                    if i + 1 < args.len() {
                        config.port = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid port number");
                            std::process::exit(1);
                        });
                        i += 2;
                    } else {
                        eprintln!("Error: --port requires a value");
                        std::process::exit(1);
                    }
                }
                "--config" | "-c" => {
                    if i + 1 < args.len() {
                        config.config_path = args[i + 1].clone();
                        i += 2;
                    } else {
                        eprintln!("Error: --config requires a value");
                        std::process::exit(1);
                    }
                }
                "--defaults" => {
                    if i + 1 < args.len() {
                        config.defaults_path = args[i + 1].clone();
                        i += 2;
                    } else {
                        eprintln!("Error: --defaults requires a value");
                        std::process::exit(1);
                    }
                }
                "--no-announce" => {
                    config.announce = false;
                    i += 1;
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("IMULink version {}", imulink::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }
}

fn print_help() {
    println!(
        r#"
IMULink - A Sensor-Device Command & Telemetry Protocol Engine

USAGE:
    imulink [OPTIONS]

OPTIONS:
    -p, --port <PORT>        UDP command port (default: 9000)
    -c, --config <FILE>      Configuration file (default: config.json)
        --defaults <FILE>    Default configuration file (default: default_config.json)
        --no-announce        Disable the discovery broadcast
    -v, --version            Print version information
        --help               Print this help message

EXAMPLES:
    imulink                          # Listen on 0.0.0.0:9000
    imulink --port 9100              # Listen on port 9100
    imulink --config /data/cfg.json  # Use a specific configuration file

TALKING TO THE DEVICE:
    Commands are single-pair JSON objects, one per datagram or line:
    $ echo '{{"ping":null}}' | nc -u -w1 localhost 9000
    {{"ping":{{"interface":"UDP","deviceName":"IMULink","serialNumber":"Unknown"}}}}
    $ echo '{{"ahrsGain":0.8}}' | nc -u -w1 localhost 9000
    {{"ahrsGain":0.8000}}
"#
    );
}

fn print_banner(config: &Config) {
    println!(
        r#"
        ███ ███    ███ ██    ██ ██      ██ ███    ██ ██   ██
         ██ ████  ████ ██    ██ ██      ██ ████   ██ ██  ██
         ██ ██ ████ ██ ██    ██ ██      ██ ██ ██  ██ █████
         ██ ██  ██  ██ ██    ██ ██      ██ ██  ██ ██ ██  ██
        ███ ██      ██  ██████  ███████ ██ ██   ████ ██   ██

IMULink v{} - Sensor-Device Command & Telemetry Protocol Engine
──────────────────────────────────────────────────────────────
Command endpoint on UDP port {}
Ready for commands.

Use Ctrl+C to shutdown gracefully.
"#,
        imulink::VERSION,
        config.port
    );
}

/// Device control for a hosted deployment: there is no hardware to
/// drive, so every action is logged and otherwise ignored.
struct LoggedDeviceControl;

impl DeviceControl for LoggedDeviceControl {
    fn reset(&mut self) {
        info!("device control: reset");
    }
    fn shutdown(&mut self) {
        info!("device control: shutdown");
    }
    fn bootloader(&mut self) {
        info!("device control: bootloader");
    }
    fn factory(&mut self) {
        info!("device control: factory");
    }
    fn erase(&mut self) {
        info!("device control: erase");
    }
    fn format(&mut self) {
        info!("device control: format");
    }
    fn self_test(&mut self) {
        info!("device control: self test");
    }
    fn strobe(&mut self) {
        info!("device control: strobe");
    }
    fn colour(&mut self, colour: &str) {
        info!(colour, "device control: colour");
    }
    fn heading(&mut self, degrees: f32) {
        info!(degrees, "device control: heading");
    }
    fn accessory(&mut self, payload: &str) {
        info!(payload, "device control: accessory");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Set up logging
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // Print the banner
    print_banner(&config);

    // Build the registry from defaults, then overlay the persisted
    // configuration if one exists.
    let store = JsonFileStore::new(&config.config_path, &config.defaults_path);
    let mut registry = SettingsRegistry::with_defaults();
    match store.load() {
        Ok(doc) => {
            let applied = registry.apply_document(&doc);
            info!(applied, path = config.config_path.as_str(), "configuration loaded");
        }
        Err(e) => {
            warn!(error = %e, "no persisted configuration, using defaults");
        }
    }

    let handler = CommandHandler::new(
        DeviceState::new(registry),
        Box::new(LoggedDeviceControl),
        Box::new(store),
    )
    .with_interface("UDP");

    let stats = Arc::new(SessionStats::new());
    let session = Session::new(handler, Arc::clone(&stats));

    // Bind the command endpoint
    let socket = UdpSocket::bind(("0.0.0.0", config.port)).await?;
    info!(port = config.port, "command endpoint bound");

    // Start the discovery broadcaster
    let (announce_tx, _announcer) = if config.announce {
        let (tx, rx) = watch::channel(session.announcement());
        let broadcast = UdpSocket::bind("0.0.0.0:0").await?;
        broadcast.set_broadcast(true)?;
        let target = SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), ANNOUNCEMENT_PORT);
        let announcer = Announcer::start(broadcast, target, rx, ANNOUNCEMENT_INTERVAL);
        (Some(tx), Some(announcer))
    } else {
        (None, None)
    };

    // Set up graceful shutdown
    let shutdown = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received, stopping...");
    };

    // Main command loop
    tokio::select! {
        result = run_udp_endpoint(socket, session, announce_tx) => {
            if let Err(e) = result {
                warn!(error = %e, "command endpoint stopped");
            }
        }
        _ = shutdown => {}
    }

    info!(
        commands = stats.commands_processed.load(std::sync::atomic::Ordering::Relaxed),
        "shutdown complete"
    );
    Ok(())
}
