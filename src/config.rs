//! Configuration module for linecmd.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::Parser;
use serde::Deserialize;
use std::net::{Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use thiserror::Error;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "linecmd")]
#[command(author = "linecmd authors")]
#[command(version = "0.1.0")]
#[command(about = "A line-oriented TCP command dispatcher", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host of the process to join. If empty, go into listen mode.
    #[arg(long)]
    pub connect: Option<String>,

    /// Address to bind to in listen mode (e.g., 0.0.0.0:61000)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Port to listen on and to dial
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port shared by the listener and the client
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Client-related configuration
#[derive(Debug, Deserialize, Default)]
pub struct ClientConfig {
    /// Host to dial; when set, the process runs as a client
    pub connect: Option<String>,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    61000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Which side of the protocol this process runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Listen for connections on `listen`.
    Server { listen: String },
    /// Dial `peer` and run the demonstration exchange.
    Client { peer: String },
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    /// Merge CLI args with the TOML file they point at, if any.
    /// CLI arguments take precedence over TOML file values.
    pub fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|source| ConfigError::FileRead {
                    path: config_path.clone(),
                    source,
                })?;
            toml::from_str(&contents).map_err(|source| ConfigError::TomlParse {
                path: config_path.clone(),
                source,
            })?
        } else {
            TomlConfig::default()
        };

        let port = cli.port.unwrap_or(toml_config.server.port);

        let connect = cli
            .connect
            .or(toml_config.client.connect)
            .filter(|host| !host.trim().is_empty());

        let mode = match connect {
            Some(host) => Mode::Client {
                peer: peer_addr(host.trim(), port),
            },
            None => Mode::Server {
                listen: cli
                    .listen
                    .unwrap_or_else(|| join_host_port(&toml_config.server.host, port)),
            },
        };

        let log_level = cli.log_level.unwrap_or(toml_config.logging.level);
        if log_level.trim().is_empty() {
            return Err(ConfigError::Invalid("log level must not be empty".to_string()));
        }

        Ok(Config { mode, log_level })
    }
}

/// Resolve the address to dial.
///
/// `host` is used as-is when it already names a port; otherwise `port` is
/// appended.
pub fn peer_addr(host: &str, port: u16) -> String {
    if host.parse::<SocketAddr>().is_ok() {
        return host.to_string();
    }

    if let Some((name, maybe_port)) = host.rsplit_once(':') {
        if !name.contains(':') && maybe_port.parse::<u16>().is_ok() {
            return host.to_string();
        }
    }

    join_host_port(host, port)
}

fn join_host_port(host: &str, port: u16) -> String {
    if host.parse::<Ipv6Addr>().is_ok() {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", .path.display())]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Config {
        let argv = std::iter::once("linecmd").chain(args.iter().copied());
        let cli = CliArgs::try_parse_from(argv).unwrap();
        Config::from_args(cli).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 61000);
        assert_eq!(config.client.connect, None);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            host = "127.0.0.1"
            port = 7000

            [client]
            connect = "example.com"

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.client.connect.as_deref(), Some("example.com"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_no_flags_is_server_mode() {
        let config = parse(&[]);
        assert_eq!(
            config.mode,
            Mode::Server {
                listen: "0.0.0.0:61000".to_string()
            }
        );
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_connect_flag_is_client_mode() {
        let config = parse(&["--connect", "10.0.0.5"]);
        assert_eq!(
            config.mode,
            Mode::Client {
                peer: "10.0.0.5:61000".to_string()
            }
        );
    }

    #[test]
    fn test_empty_connect_is_server_mode() {
        let config = parse(&["--connect", ""]);
        assert!(matches!(config.mode, Mode::Server { .. }));
    }

    #[test]
    fn test_port_applies_to_both_modes() {
        let server = parse(&["-p", "9000"]);
        assert_eq!(
            server.mode,
            Mode::Server {
                listen: "0.0.0.0:9000".to_string()
            }
        );

        let client = parse(&["--connect", "localhost", "--port", "9000"]);
        assert_eq!(
            client.mode,
            Mode::Client {
                peer: "localhost:9000".to_string()
            }
        );
    }

    #[test]
    fn test_listen_overrides_host_and_port() {
        let config = parse(&["-l", "127.0.0.1:0", "-p", "9000"]);
        assert_eq!(
            config.mode,
            Mode::Server {
                listen: "127.0.0.1:0".to_string()
            }
        );
    }

    #[test]
    fn test_peer_addr() {
        assert_eq!(peer_addr("localhost", 61000), "localhost:61000");
        assert_eq!(peer_addr("localhost:7000", 61000), "localhost:7000");
        assert_eq!(peer_addr("192.168.1.2", 61000), "192.168.1.2:61000");
        assert_eq!(peer_addr("192.168.1.2:80", 61000), "192.168.1.2:80");
        assert_eq!(peer_addr("::1", 61000), "[::1]:61000");
        assert_eq!(peer_addr("[::1]:5000", 61000), "[::1]:5000");
    }

    #[test]
    fn test_file_with_cli_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [server]
            host = "127.0.0.1"
            port = 7000

            [logging]
            level = "warn"
            "#
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let from_file = parse(&["-c", path]);
        assert_eq!(
            from_file.mode,
            Mode::Server {
                listen: "127.0.0.1:7000".to_string()
            }
        );
        assert_eq!(from_file.log_level, "warn");

        let overridden = parse(&["-c", path, "-p", "7001", "--log-level", "trace"]);
        assert_eq!(
            overridden.mode,
            Mode::Server {
                listen: "127.0.0.1:7001".to_string()
            }
        );
        assert_eq!(overridden.log_level, "trace");
    }

    #[test]
    fn test_client_mode_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[client]\nconnect = \"peer.local\"").unwrap();
        let path = file.path().to_str().unwrap();

        let config = parse(&["-c", path]);
        assert_eq!(
            config.mode,
            Mode::Client {
                peer: "peer.local:61000".to_string()
            }
        );
    }

    #[test]
    fn test_missing_file() {
        let cli = CliArgs::try_parse_from(["linecmd", "-c", "/nonexistent/linecmd.toml"]).unwrap();
        let err = Config::from_args(cli).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = \"not a number\"").unwrap();
        let path = file.path().to_str().unwrap();

        let cli = CliArgs::try_parse_from(["linecmd", "-c", path]).unwrap();
        let err = Config::from_args(cli).unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse { .. }));
    }

    #[test]
    fn test_empty_log_level_rejected() {
        let cli = CliArgs::try_parse_from(["linecmd", "--log-level", " "]).unwrap();
        let err = Config::from_args(cli).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
