//! Transport boundary: typed connection parameters and the factory that turns
//! them into an open duplex byte stream.

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "linux")]
use linux::is_port_open;

#[cfg(not(target_os = "linux"))]
fn is_port_open(_port_name: &str) -> bool {
    false
}

use std::{collections::HashMap, fmt::Display, io, str::FromStr};

use async_trait::async_trait;
use log::debug;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tokio_serial::SerialPortBuilderExt;

pub use tokio_serial::{DataBits, Parity, StopBits};

use crate::error::ConfigurationError;

pub const DEFAULT_BAUD_RATE: u32 = 9600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    Serial,
    Socket,
}

impl Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionType::Serial => f.write_str("serial"),
            ConnectionType::Socket => f.write_str("socket"),
        }
    }
}

impl FromStr for ConnectionType {
    type Err = ConfigurationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "serial" => Ok(ConnectionType::Serial),
            "socket" => Ok(ConnectionType::Socket),
            _ => Err(ConfigurationError::UnsupportedConnection(input.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    /// Open the port even if another process holds it.
    pub force: bool,
}

impl SerialConfig {
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            force: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketConfig {
    pub host: String,
    pub port: u16,
}

impl SocketConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    Serial(SerialConfig),
    Socket(SocketConfig),
}

impl TransportConfig {
    pub fn connection_type(&self) -> ConnectionType {
        match self {
            TransportConfig::Serial(_) => ConnectionType::Serial,
            TransportConfig::Socket(_) => ConnectionType::Socket,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match self {
            TransportConfig::Serial(c) => {
                if c.port.trim().is_empty() {
                    return Err(ConfigurationError::MissingParameter("port"));
                }
                if c.baud_rate == 0 {
                    return Err(ConfigurationError::InvalidParameter {
                        name: "baudrate",
                        value: c.baud_rate.to_string(),
                    });
                }
            }
            TransportConfig::Socket(c) => {
                if c.host.trim().is_empty() {
                    return Err(ConfigurationError::MissingParameter("host"));
                }
                if c.port == 0 {
                    return Err(ConfigurationError::InvalidParameter {
                        name: "port",
                        value: c.port.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Builds a config from a connection type name and keyword parameters.
    ///
    /// Serial accepts `port` (or `url`), `baudrate`, `bytesize`, `parity`
    /// (`N`, `E`, `O`), `stopbits` (`1`, `2`) and `force`. Socket accepts
    /// `host` and `port`. Unknown keys are rejected.
    pub fn from_params(
        connection_type: &str,
        params: &HashMap<String, String>,
    ) -> Result<Self, ConfigurationError> {
        let config = match connection_type.parse::<ConnectionType>()? {
            ConnectionType::Serial => {
                let mut config = SerialConfig::new(String::new(), DEFAULT_BAUD_RATE);
                let mut port = None;
                for (key, value) in params {
                    match key.as_str() {
                        "port" | "url" => port = Some(value.clone()),
                        "baudrate" => config.baud_rate = parse_param("baudrate", value)?,
                        "bytesize" => config.data_bits = parse_data_bits(value)?,
                        "parity" => config.parity = parse_parity(value)?,
                        "stopbits" => config.stop_bits = parse_stop_bits(value)?,
                        "force" => config.force = parse_param("force", value)?,
                        _ => return Err(ConfigurationError::UnknownParameter(key.clone())),
                    }
                }
                config.port = port.ok_or(ConfigurationError::MissingParameter("port"))?;
                TransportConfig::Serial(config)
            }
            ConnectionType::Socket => {
                let mut host = None;
                let mut port = None;
                for (key, value) in params {
                    match key.as_str() {
                        "host" => host = Some(value.clone()),
                        "port" => port = Some(parse_param::<u16>("port", value)?),
                        _ => return Err(ConfigurationError::UnknownParameter(key.clone())),
                    }
                }
                TransportConfig::Socket(SocketConfig {
                    host: host.ok_or(ConfigurationError::MissingParameter("host"))?,
                    port: port.ok_or(ConfigurationError::MissingParameter("port"))?,
                })
            }
        };
        config.validate()?;
        Ok(config)
    }
}

impl Display for TransportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportConfig::Serial(c) => write!(
                f,
                "Serial connection port={}, baud_rate={}, data_bits={:?}, parity={:?}, stop_bits={:?}",
                c.port, c.baud_rate, c.data_bits, c.parity, c.stop_bits
            ),
            TransportConfig::Socket(c) => {
                write!(f, "Socket connection host={}, port={}", c.host, c.port)
            }
        }
    }
}

fn parse_param<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigurationError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigurationError::InvalidParameter {
            name,
            value: value.to_string(),
        })
}

fn parse_data_bits(value: &str) -> Result<DataBits, ConfigurationError> {
    match parse_param::<u8>("bytesize", value)? {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        _ => Err(ConfigurationError::InvalidParameter {
            name: "bytesize",
            value: value.to_string(),
        }),
    }
}

fn parse_parity(value: &str) -> Result<Parity, ConfigurationError> {
    match value.trim() {
        "N" | "n" => Ok(Parity::None),
        "E" | "e" => Ok(Parity::Even),
        "O" | "o" => Ok(Parity::Odd),
        _ => Err(ConfigurationError::InvalidParameter {
            name: "parity",
            value: value.to_string(),
        }),
    }
}

fn parse_stop_bits(value: &str) -> Result<StopBits, ConfigurationError> {
    match value.trim() {
        "1" => Ok(StopBits::One),
        "2" => Ok(StopBits::Two),
        _ => Err(ConfigurationError::InvalidParameter {
            name: "stopbits",
            value: value.to_string(),
        }),
    }
}

/// Duplex byte stream carrying frames.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn open(&self, config: &TransportConfig) -> io::Result<Box<dyn Transport>>;
}

/// Opens real serial ports and TCP sockets.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTransportFactory;

#[async_trait]
impl TransportFactory for SystemTransportFactory {
    async fn open(&self, config: &TransportConfig) -> io::Result<Box<dyn Transport>> {
        match config {
            TransportConfig::Serial(c) => {
                let c = c.clone();
                let port = run_blocking(move || open_serial(&c)).await?;
                Ok(Box::new(port))
            }
            TransportConfig::Socket(c) => {
                let stream = TcpStream::connect((c.host.as_str(), c.port)).await?;
                stream.set_nodelay(true)?;
                debug!("open_socket OK: {}:{}", c.host, c.port);
                Ok(Box::new(stream))
            }
        }
    }
}

/// Runs `f` on the blocking pool so the caller's timeout can abandon it.
async fn run_blocking<T, F>(f: F) -> io::Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?
}

fn open_serial(config: &SerialConfig) -> io::Result<tokio_serial::SerialStream> {
    if !config.force && is_port_open(&config.port) {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("{:?} busy", config.port),
        ));
    }

    let port = tokio_serial::new(&config.port, config.baud_rate)
        .data_bits(config.data_bits)
        .parity(config.parity)
        .stop_bits(config.stop_bits)
        .open_native_async()?;

    debug!("open_port OK: {} @ {} baud", &config.port, config.baud_rate);
    Ok(port)
}
