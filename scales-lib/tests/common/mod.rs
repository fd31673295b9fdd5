use std::{
    collections::VecDeque,
    io,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use scales_lib::port::{SocketConfig, Transport, TransportConfig, TransportFactory};

/// One step of a scripted scale session.
#[derive(Debug, Clone)]
pub enum Step {
    /// Read these bytes from the host. A mismatch is recorded and the
    /// connection dropped.
    Expect(Vec<u8>),
    /// Send these bytes to the host.
    Reply(Vec<u8>),
    /// Drop the connection.
    Hangup,
    /// Keep the connection open and never answer.
    Stall,
}

/// Every `open` starts a fake scale running the next scripted session.
#[derive(Default)]
pub struct FakeScales {
    sessions: Mutex<VecDeque<Vec<Step>>>,
    opens: AtomicUsize,
    mismatches: Arc<Mutex<Vec<String>>>,
}

impl FakeScales {
    pub fn new(sessions: Vec<Vec<Step>>) -> Arc<Self> {
        Arc::new(Self {
            sessions: Mutex::new(sessions.into()),
            opens: AtomicUsize::new(0),
            mismatches: Arc::default(),
        })
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Requests that did not match the script, as "expected ..., got ...".
    pub fn mismatches(&self) -> Vec<String> {
        self.mismatches.lock().unwrap().clone()
    }

    pub fn assert_scripts_followed(&self) {
        let mismatches = self.mismatches();
        assert!(mismatches.is_empty(), "unexpected requests: {:?}", mismatches);
    }
}

#[async_trait]
impl TransportFactory for FakeScales {
    async fn open(&self, _config: &TransportConfig) -> io::Result<Box<dyn Transport>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let script = self
            .sessions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::ConnectionRefused, "no session left"))?;

        let (client, server) = tokio::io::duplex(256);
        tokio::spawn(run_session(server, script, self.mismatches.clone()));
        Ok(Box::new(client))
    }
}

async fn run_session(
    mut stream: DuplexStream,
    script: Vec<Step>,
    mismatches: Arc<Mutex<Vec<String>>>,
) {
    for step in script {
        match step {
            Step::Expect(expected) => {
                let mut buf = vec![0u8; expected.len()];
                if stream.read_exact(&mut buf).await.is_err() {
                    return;
                }
                if buf != expected {
                    mismatches
                        .lock()
                        .unwrap()
                        .push(format!("expected {:02X?}, got {:02X?}", expected, buf));
                    return;
                }
            }
            Step::Reply(data) => {
                if stream.write_all(&data).await.is_err() {
                    return;
                }
            }
            Step::Hangup => return,
            Step::Stall => std::future::pending::<()>().await,
        }
    }

    // Hold the line until the host closes it.
    let mut sink = Vec::new();
    let _ = stream.read_to_end(&mut sink).await;
}

pub fn socket_config() -> TransportConfig {
    TransportConfig::Socket(SocketConfig::new("10.1.20.30", 9000))
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-4,
        "{} is not close to {}",
        actual,
        expected
    );
}
