use std::{
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::error::Error;

/// Where the HTTP server listens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// The IP address to bind to.
    pub address: String,

    /// The port to bind to.
    /// Zero lets the operating system pick one.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 11111,
        }
    }
}

impl ServerConfig {
    /// The address and port as a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, Error> {
        let ip = self
            .address
            .parse::<IpAddr>()
            .map_err(|e| Error::BadConfig(format!("Server address `{}`: {e}", self.address)))?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// The serial link to the box.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SerialConfig {
    /// Likely "/dev/ttyUSBx" or "COMx".
    pub path: String,

    /// The baud rate.
    pub baud: u32,

    /// How long to wait for a reply line, unless the caller asks otherwise.
    pub read_timeout_ms: u64,

    /// How long putting a command on the wire may take.
    pub write_timeout_ms: u64,

    /// Talk to a simulated box which acknowledges everything instead of a serial port.
    pub mock: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: "/dev/ttyUSB0".into(),
            baud: 9600,
            read_timeout_ms: 1000,
            write_timeout_ms: 1000,
            mock: false,
        }
    }
}

impl SerialConfig {
    /// See [`SerialConfig::read_timeout_ms`].
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// See [`SerialConfig::write_timeout_ms`].
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

/// Local network service announcement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Whether to advertise at all.
    pub enabled: bool,

    /// The service instance name.
    pub name: String,

    /// Put in the advertised TXT record.
    pub manufacturer: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: "PPBA Alpaca".into(),
            manufacturer: "PPBA".into(),
        }
    }
}

/// Log output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of "trace", "debug", "info", "warn", "error".
    pub level: String,

    /// If set, a daily rolling log file is written to this directory.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            directory: None,
        }
    }
}

impl LoggingConfig {
    /// The configured level.
    pub fn level(&self) -> Result<Level, Error> {
        self.level
            .parse::<Level>()
            .map_err(|e| Error::BadConfig(format!("Log level `{}`: {e}", self.level)))
    }
}

/// The configuration used for running the gateway.
///
/// Any field may be left out of a config file, the default is used instead.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// See [`ServerConfig`].
    pub server: ServerConfig,

    /// See [`SerialConfig`].
    pub serial: SerialConfig,

    /// The relay channel exposed as a switch.
    pub device_number: u32,

    /// More relay channels on the same box, each exposed as its own switch.
    pub additional_device_numbers: Vec<u32>,

    /// See [`DiscoveryConfig`].
    pub discovery: DiscoveryConfig,

    /// See [`LoggingConfig`].
    pub logging: LoggingConfig,
}

impl Config {
    fn ron() -> ron::Options {
        ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
            .with_default_extension(ron::extensions::Extensions::UNWRAP_NEWTYPES)
    }

    /// Deserialize a .ron file's contents.
    pub fn deserialize(input: &str) -> Result<Self, Error> {
        Self::ron()
            .from_str::<Config>(input)
            .map_err(|e| Error::BadConfig(format!("Not a valid config: {e}")))
    }

    /// An example configuration with some fields filled in.
    pub fn example() -> Self {
        Self {
            serial: SerialConfig {
                path: "COM3".into(),
                ..Default::default()
            },
            device_number: 1,
            additional_device_numbers: vec![2, 3, 4],
            logging: LoggingConfig {
                level: "debug".into(),
                directory: Some("logs".into()),
            },
            ..Default::default()
        }
    }

    /// Serialize the configuration in a "pretty" (i.e. non-compact) fashion.
    pub fn serialize_pretty(&self) -> Result<String, Error> {
        Self::ron()
            .to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| Error::BadConfig(e.to_string()))
    }

    /// Setup a new configuration from a RON file.
    pub fn new_from_path<P: AsRef<Path>>(p: P) -> Result<Self, Error> {
        let path = p.as_ref();
        let s = std::fs::read_to_string(path)
            .map_err(|e| Error::BadConfig(format!("Could not read {path:?}: {e}")))?;

        Self::deserialize(&s)
    }

    /// All relay channels to expose, in configured order.
    pub fn device_numbers(&self) -> Vec<u32> {
        std::iter::once(self.device_number)
            .chain(self.additional_device_numbers.iter().copied())
            .collect()
    }

    fn check_duplicate_devices(&self) -> Result<(), Error> {
        let duplicates = self.device_numbers().into_iter().duplicates().collect::<Vec<_>>();

        if duplicates.is_empty() {
            Ok(())
        } else {
            Err(Error::BadConfig(format!(
                "Each relay channel can only be exposed once. Duplicates: {duplicates:?}"
            )))
        }
    }

    fn check_serial(&self) -> Result<(), Error> {
        if self.serial.baud == 0 {
            return Err(Error::BadConfig("The baud rate must be above zero".into()));
        }

        if self.serial.read_timeout_ms == 0 || self.serial.write_timeout_ms == 0 {
            return Err(Error::BadConfig(format!(
                "Serial timeouts must be above zero, got read: {} ms, write: {} ms",
                self.serial.read_timeout_ms, self.serial.write_timeout_ms
            )));
        }

        Ok(())
    }

    /// Check the configuration for problems we would otherwise only find at runtime.
    pub fn validate(&self) -> Result<(), Error> {
        self.server.socket_addr()?;
        self.logging.level()?;
        self.check_serial()?;
        self.check_duplicate_devices()?;

        Ok(())
    }
}
