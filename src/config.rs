//! Command-line configuration for the server and client binaries.
//!
//! Arguments are parsed by hand. Parsing never exits the process; the
//! binaries decide what to do with [`ConfigAction::Help`],
//! [`ConfigAction::Version`] and errors.

use crate::protocol::ProtocolLimits;
use crate::{DEFAULT_HOST, DEFAULT_PORT};
use std::str::FromStr;
use thiserror::Error;

/// Errors from parsing command-line flags.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} requires a value")]
    MissingValue(String),

    #[error("invalid value '{value}' for {flag}")]
    InvalidValue { flag: String, value: String },

    #[error("unknown argument: {0}")]
    UnknownArgument(String),
}

/// What the binary should do after parsing its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction<T> {
    Run(T),
    Help,
    Version,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Decoding limits for client requests
    pub limits: ProtocolLimits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            limits: ProtocolLimits::default(),
        }
    }
}

impl ServerConfig {
    /// Parses server flags. `args` excludes the program name.
    pub fn from_args<I>(args: I) -> Result<ConfigAction<Self>, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--host" | "-h" => config.host = take_value(&arg, &mut args)?,
                "--port" | "-p" => config.port = parse_value(&arg, &mut args)?,
                "--max-depth" => config.limits.max_depth = parse_positive(&arg, &mut args)?,
                "--max-elements" => {
                    config.limits.max_array_elements = parse_positive(&arg, &mut args)?
                }
                "--max-bulk" => config.limits.max_bulk_len = parse_positive(&arg, &mut args)?,
                "--max-line" => config.limits.max_line_len = parse_positive(&arg, &mut args)?,
                "--help" => return Ok(ConfigAction::Help),
                "--version" | "-v" => return Ok(ConfigAction::Version),
                _ => return Err(ConfigError::UnknownArgument(arg)),
            }
        }

        Ok(ConfigAction::Run(config))
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ClientConfig {
    /// Parses client flags. `args` excludes the program name.
    pub fn from_args<I>(args: I) -> Result<ConfigAction<Self>, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--host" | "-h" => config.host = take_value(&arg, &mut args)?,
                "--port" | "-p" => config.port = parse_value(&arg, &mut args)?,
                "--help" => return Ok(ConfigAction::Help),
                "--version" | "-v" => return Ok(ConfigAction::Version),
                _ => return Err(ConfigError::UnknownArgument(arg)),
            }
        }

        Ok(ConfigAction::Run(config))
    }

    /// Returns the server address as a string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn take_value(
    flag: &str,
    args: &mut impl Iterator<Item = String>,
) -> Result<String, ConfigError> {
    args.next()
        .ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
}

fn parse_value<T: FromStr>(
    flag: &str,
    args: &mut impl Iterator<Item = String>,
) -> Result<T, ConfigError> {
    let value = take_value(flag, args)?;
    value.parse().map_err(|_| ConfigError::InvalidValue {
        flag: flag.to_string(),
        value,
    })
}

fn parse_positive(
    flag: &str,
    args: &mut impl Iterator<Item = String>,
) -> Result<usize, ConfigError> {
    match parse_value(flag, args)? {
        0 => Err(ConfigError::InvalidValue {
            flag: flag.to_string(),
            value: "0".to_string(),
        }),
        n => Ok(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_server_defaults() {
        let action = ServerConfig::from_args(args(&[])).unwrap();
        let ConfigAction::Run(config) = action else {
            panic!("expected Run, got {:?}", action);
        };
        assert_eq!(config.bind_address(), "localhost:6379");
        assert_eq!(config.limits, ProtocolLimits::default());
    }

    #[test]
    fn test_server_flags() {
        let action = ServerConfig::from_args(args(&[
            "-h",
            "0.0.0.0",
            "--port",
            "7000",
            "--max-depth",
            "8",
            "--max-elements",
            "100",
            "--max-bulk",
            "4096",
            "--max-line",
            "512",
        ]))
        .unwrap();

        let ConfigAction::Run(config) = action else {
            panic!("expected Run, got {:?}", action);
        };
        assert_eq!(config.bind_address(), "0.0.0.0:7000");
        assert_eq!(config.limits.max_depth, 8);
        assert_eq!(config.limits.max_array_elements, 100);
        assert_eq!(config.limits.max_bulk_len, 4096);
        assert_eq!(config.limits.max_line_len, 512);
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(
            ServerConfig::from_args(args(&["--help"])),
            Ok(ConfigAction::Help)
        );
        assert_eq!(
            ServerConfig::from_args(args(&["-v"])),
            Ok(ConfigAction::Version)
        );
        assert_eq!(
            ClientConfig::from_args(args(&["-p", "1", "--help"])),
            Ok(ConfigAction::Help)
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            ServerConfig::from_args(args(&["--port"])),
            Err(ConfigError::MissingValue("--port".into()))
        );
        assert_eq!(
            ServerConfig::from_args(args(&["-p", "99999"])),
            Err(ConfigError::InvalidValue {
                flag: "-p".into(),
                value: "99999".into()
            })
        );
        assert_eq!(
            ServerConfig::from_args(args(&["--max-depth", "0"])),
            Err(ConfigError::InvalidValue {
                flag: "--max-depth".into(),
                value: "0".into()
            })
        );
        assert_eq!(
            ClientConfig::from_args(args(&["--max-depth", "3"])),
            Err(ConfigError::UnknownArgument("--max-depth".into()))
        );
    }

    #[test]
    fn test_client_config() {
        assert_eq!(
            ClientConfig::from_args(args(&["--host", "db", "-p", "6380"])),
            Ok(ConfigAction::Run(ClientConfig {
                host: "db".into(),
                port: 6380,
            }))
        );
        assert_eq!(ClientConfig::default().server_address(), "localhost:6379");
    }
}
