//! Server configuration.

use clap::Parser;
use std::time::Duration;

use livesub_core::resource::DEFAULT_URI_PREFIX;
use livesub_core::{BroadcasterConfig, DEFAULT_SCAN_INTERVAL_SECS};

/// Default address to bind to.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default interval between simulated resource updates in seconds.
pub const DEFAULT_SIMULATE_INTERVAL_SECS: u64 = 5;

/// Default per-session notification buffer.
pub const DEFAULT_NOTIFICATION_BUFFER: usize = 64;

/// livesub server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    /// Interval between broadcast scans.
    pub scan_interval: Duration,

    /// Interval between simulated updates of every resource. None disables the simulator.
    pub simulate_interval: Option<Duration>,

    /// Notifications buffered per session before delivery starts failing.
    pub notification_buffer: usize,

    /// URI prefix of resources created on first read.
    pub uri_prefix: String,
}

impl ServerConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            scan_interval: Duration::from_secs(DEFAULT_SCAN_INTERVAL_SECS),
            simulate_interval: Some(Duration::from_secs(DEFAULT_SIMULATE_INTERVAL_SECS)),
            notification_buffer: DEFAULT_NOTIFICATION_BUFFER,
            uri_prefix: DEFAULT_URI_PREFIX.to_string(),
        }
    }

    /// Set the bind address.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the broadcast scan interval.
    pub fn with_scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }

    /// Set the simulated update interval.
    pub fn with_simulate_interval(mut self, interval: Duration) -> Self {
        self.simulate_interval = Some(interval);
        self
    }

    /// Disable simulated updates.
    pub fn without_simulation(mut self) -> Self {
        self.simulate_interval = None;
        self
    }

    /// Set the per-session notification buffer.
    pub fn with_notification_buffer(mut self, buffer: usize) -> Self {
        self.notification_buffer = buffer.max(1);
        self
    }

    /// Set the URI prefix of auto-created resources.
    pub fn with_uri_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.uri_prefix = prefix.into();
        self
    }

    /// Broadcaster settings derived from this configuration.
    pub fn broadcaster(&self) -> BroadcasterConfig {
        BroadcasterConfig::new().with_interval(self.scan_interval)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Command-line arguments for the server.
#[derive(Parser, Debug)]
#[command(name = "livesub-server")]
#[command(version, about = "Live resource subscription server", long_about = None)]
pub struct Args {
    /// Address to bind to.
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Seconds between broadcast scans.
    #[arg(long, default_value_t = DEFAULT_SCAN_INTERVAL_SECS)]
    pub scan_interval_secs: u64,

    /// Seconds between simulated resource updates. Set to 0 to disable.
    #[arg(long, default_value_t = DEFAULT_SIMULATE_INTERVAL_SECS)]
    pub simulate_interval_secs: u64,

    /// Notifications buffered per session.
    #[arg(long, default_value_t = DEFAULT_NOTIFICATION_BUFFER)]
    pub notification_buffer: usize,

    /// URI prefix of resources created on first read.
    #[arg(long, default_value = DEFAULT_URI_PREFIX)]
    pub uri_prefix: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Convert command-line arguments to server configuration.
    pub fn into_config(self) -> ServerConfig {
        let simulate_interval = if self.simulate_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.simulate_interval_secs))
        };

        ServerConfig {
            host: self.host,
            port: self.port,
            scan_interval: Duration::from_secs(self.scan_interval_secs.max(1)),
            simulate_interval,
            notification_buffer: self.notification_buffer.max(1),
            uri_prefix: self.uri_prefix,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr(), "127.0.0.1:3000");
        assert_eq!(config.scan_interval, Duration::from_secs(5));
        assert_eq!(config.simulate_interval, Some(Duration::from_secs(5)));
        assert_eq!(config.uri_prefix, "test://resource/");
    }

    #[test]
    fn test_config_builder() {
        let config = ServerConfig::new()
            .with_host("0.0.0.0")
            .with_port(8080)
            .with_scan_interval(Duration::from_millis(250))
            .without_simulation()
            .with_notification_buffer(0)
            .with_uri_prefix("live://");

        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
        assert_eq!(config.broadcaster().interval, Duration::from_millis(250));
        assert!(config.simulate_interval.is_none());
        assert_eq!(config.notification_buffer, 1);
        assert_eq!(config.uri_prefix, "live://");
    }

    #[test]
    fn test_args_into_config() {
        let args = Args::parse_from([
            "livesub-server",
            "--port",
            "4000",
            "--simulate-interval-secs",
            "0",
            "--scan-interval-secs",
            "2",
        ]);
        let config = args.into_config();

        assert_eq!(config.port, 4000);
        assert!(config.simulate_interval.is_none());
        assert_eq!(config.scan_interval, Duration::from_secs(2));
        assert_eq!(config.notification_buffer, DEFAULT_NOTIFICATION_BUFFER);
    }
}
