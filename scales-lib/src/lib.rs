//! Client for electronic weighing scales.
//!
//! A [`ScalesDriver`] pairs a protocol [`Codec`](protocol::Codec) with a
//! [`Connector`] that manages the serial or TCP transport:
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use scales_lib::port::{SerialConfig, TransportConfig};
//! use scales_lib::protocol::ProtocolKind;
//! use scales_lib::ScalesDriver;
//!
//! # async fn run() -> scales_lib::Result<()> {
//! let mut scales = ScalesDriver::new(
//!     "Bench scales",
//!     ProtocolKind::CasType6,
//!     TransportConfig::Serial(SerialConfig::new("/dev/ttyUSB0", 9600)),
//!     Duration::from_secs(1),
//! )?;
//! let weight = scales.get_weight(ScalesDriver::UNIT_KG).await?;
//! println!("{}", weight);
//! # Ok(())
//! # }
//! ```

pub mod connector;
pub mod driver;
pub mod error;
pub mod port;
pub mod protocol;
pub mod units;

pub use connector::{ConnectionState, Connector};
pub use driver::ScalesDriver;
pub use error::{ConfigurationError, ConnectorError, ProtocolError, Result, ScalesError};
pub use units::{LoadState, Unit, Weight};
