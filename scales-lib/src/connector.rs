//! Transport-agnostic connection manager.
//!
//! The connector opens its transport lazily on the first `read`/`write` and
//! drops it on any failure, so the next call starts from a fresh connection.
//! Each call gets one open attempt and one I/O attempt, bounded by the
//! transfer timeout measured from call entry.
//!
//! A connector serves one request at a time: both I/O methods take
//! `&mut self`. Share it between tasks by wrapping the owner in a mutex.

use std::{fmt::Display, io, sync::Arc, time::Duration};

use log::{debug, info, warn};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    time::{error::Elapsed, timeout},
};

use crate::error::{ConfigurationError, ConnectorError, Operation};
use crate::port::{SystemTransportFactory, Transport, TransportConfig, TransportFactory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Open,
}

pub struct Connector {
    config: TransportConfig,
    timeout: Duration,
    factory: Arc<dyn TransportFactory>,
    stream: Option<Box<dyn Transport>>,
}

impl Connector {
    pub fn new(config: TransportConfig, timeout: Duration) -> Result<Self, ConfigurationError> {
        Self::with_factory(config, timeout, Arc::new(SystemTransportFactory))
    }

    pub fn with_factory(
        config: TransportConfig,
        timeout: Duration,
        factory: Arc<dyn TransportFactory>,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        if timeout.is_zero() {
            return Err(ConfigurationError::InvalidTimeout(format!("{:?}", timeout)));
        }

        Ok(Self {
            config,
            timeout,
            factory,
            stream: None,
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn state(&self) -> ConnectionState {
        match self.stream {
            Some(_) => ConnectionState::Open,
            None => ConnectionState::Closed,
        }
    }

    /// Sends `data`, opening the transport first if needed.
    pub async fn write(&mut self, data: &[u8]) -> Result<(), ConnectorError> {
        debug!("send {:02X?}", data);
        let res = timeout(self.timeout, self.try_write(data)).await;
        self.settle(Operation::Write, res)
    }

    /// Receives exactly `len` bytes, opening the transport first if needed.
    pub async fn read(&mut self, len: usize) -> Result<Vec<u8>, ConnectorError> {
        let res = timeout(self.timeout, self.try_read(len)).await;
        let data = self.settle(Operation::Read, res)?;
        debug!("recv {:02X?}", &data);
        Ok(data)
    }

    /// Gracefully shuts the transport down. Does nothing when closed.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            match timeout(self.timeout, stream.shutdown()).await {
                Ok(Ok(())) => (),
                Ok(Err(err)) => debug!("shutdown failed: {}", err),
                Err(_) => debug!("shutdown timeout"),
            }
            info!("{}: closed", self.config);
        }
    }

    async fn ensure_open(&mut self) -> io::Result<&mut Box<dyn Transport>> {
        let stream = match self.stream.take() {
            Some(stream) => stream,
            None => {
                let stream = self.factory.open(&self.config).await?;
                info!("{}: opened", self.config);
                stream
            }
        };
        Ok(self.stream.insert(stream))
    }

    async fn try_write(&mut self, data: &[u8]) -> io::Result<()> {
        let stream = self.ensure_open().await?;
        stream.write_all(data).await?;
        stream.flush().await
    }

    async fn try_read(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let stream = self.ensure_open().await?;
        let mut buf = vec![0u8; len];
        stream.read_exact(&mut buf).await?;
        Ok(buf)
    }

    fn settle<T>(
        &mut self,
        operation: Operation,
        res: Result<io::Result<T>, Elapsed>,
    ) -> Result<T, ConnectorError> {
        let err = match res {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => ConnectorError::Transport(err),
            Err(_) => ConnectorError::Timeout {
                operation,
                timeout: self.timeout,
            },
        };

        // Dropping the stream releases the port or socket immediately.
        if self.stream.take().is_some() {
            warn!("{}: connection dropped ({})", self.config, err);
        }
        Err(err)
    }
}

impl Display for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.config.fmt(f)
    }
}
