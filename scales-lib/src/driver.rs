//! Protocol-agnostic scales facade.

use std::{collections::HashMap, fmt::Display, sync::Arc, time::Duration};

use log::debug;

use crate::connector::Connector;
use crate::error::{ConfigurationError, ProtocolError, Result};
use crate::port::{TransportConfig, TransportFactory};
use crate::protocol::{make_codec, Codec, Command, ProtocolKind, Response, UnitSelection};
use crate::units::{Unit, Weight};

/// Binds one protocol codec to one connector.
///
/// Methods take `&mut self`, so a driver serves one request at a time. Wrap
/// it in a `tokio::sync::Mutex` to share it between tasks.
///
/// Connector failures are returned unchanged and are worth retrying: the
/// connection is reopened on the next call. Protocol failures leave the
/// connection open.
pub struct ScalesDriver {
    name: String,
    connector: Connector,
    codec: Box<dyn Codec>,
}

impl ScalesDriver {
    pub const UNIT_GR: Unit = Unit::Gram;
    pub const UNIT_KG: Unit = Unit::Kilogram;
    pub const UNIT_LB: Unit = Unit::Pound;
    pub const UNIT_OZ: Unit = Unit::Ounce;

    pub fn new(
        name: impl Into<String>,
        protocol: ProtocolKind,
        config: TransportConfig,
        transfer_timeout: Duration,
    ) -> Result<Self, ConfigurationError> {
        let connector = Connector::new(config, transfer_timeout)?;
        Ok(Self::from_parts(name, make_codec(protocol), connector))
    }

    pub fn with_factory(
        name: impl Into<String>,
        protocol: ProtocolKind,
        config: TransportConfig,
        transfer_timeout: Duration,
        factory: Arc<dyn TransportFactory>,
    ) -> Result<Self, ConfigurationError> {
        let connector = Connector::with_factory(config, transfer_timeout, factory)?;
        Ok(Self::from_parts(name, make_codec(protocol), connector))
    }

    /// Builds a driver from a connection type name, a timeout in seconds and
    /// the transport keyword parameters (see [`TransportConfig::from_params`]).
    pub fn from_params(
        name: impl Into<String>,
        protocol: ProtocolKind,
        connection_type: &str,
        transfer_timeout: f64,
        params: &HashMap<String, String>,
    ) -> Result<Self, ConfigurationError> {
        let config = TransportConfig::from_params(connection_type, params)?;
        let timeout = Duration::try_from_secs_f64(transfer_timeout)
            .map_err(|_| ConfigurationError::InvalidTimeout(transfer_timeout.to_string()))?;
        Self::new(name, protocol, config, timeout)
    }

    /// Pairs a connector with any codec, including ones defined outside this
    /// crate.
    pub fn from_parts(
        name: impl Into<String>,
        codec: Box<dyn Codec>,
        connector: Connector,
    ) -> Self {
        Self {
            name: name.into(),
            connector,
            codec,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    /// Reads the current weight converted to `unit`.
    pub async fn get_weight(&mut self, unit: Unit) -> Result<Weight> {
        debug!("{}: get_weight {}", self.name, unit);
        let requested = match self.codec.unit_selection() {
            UnitSelection::Protocol => Some(unit),
            UnitSelection::Conversion => None,
        };

        match self.execute(Command::GetWeight, requested).await? {
            Response::Weight(weight) => Ok(weight.to_unit(unit)),
            Response::Info(_) => {
                Err(ProtocolError::UnexpectedResponse(Command::GetWeight).into())
            }
        }
    }

    /// Returns a one-line description of the device. Protocols without an
    /// info command report the driver name.
    pub async fn get_info(&mut self) -> Result<String> {
        if !self.codec.supports(Command::Info) {
            return Ok(self.name.clone());
        }

        debug!("{}: get_info", self.name);
        match self.execute(Command::Info, None).await? {
            Response::Info(info) => Ok(format!("{}. {}", capitalize(&self.name), info)),
            Response::Weight(_) => Err(ProtocolError::UnexpectedResponse(Command::Info).into()),
        }
    }

    pub async fn close(&mut self) {
        self.connector.close().await
    }

    async fn execute(&mut self, command: Command, unit: Option<Unit>) -> Result<Response> {
        let request = self.codec.build_request(command, unit)?;

        if let Some(handshake) = self.codec.handshake(command) {
            self.connector.write(handshake.request).await?;
            let reply = self.connector.read(handshake.reply.len()).await?;
            handshake.check(&reply)?;
        }

        self.connector.write(&request.frame).await?;
        let frame = self.connector.read(request.response_len).await?;
        Ok(self.codec.parse_response(command, &frame)?)
    }
}

impl Display for ScalesDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
