use std::collections::HashMap;

use clap::{Parser, Subcommand};

use scales_lib::port::ConnectionType;
use scales_lib::protocol::ProtocolKind;
use scales_lib::Unit;

#[derive(Parser, Debug)]
#[clap(name = "scales-tool", version, about = "Weighing scales test tool")]
pub struct Cli {
    #[clap(short, long, default_value = "cas", help = "Scales protocol (cas, massak)")]
    pub protocol: ProtocolKind,

    #[clap(
        short,
        long,
        default_value = "serial",
        help = "Connection type (serial, socket)"
    )]
    pub connection: ConnectionType,

    #[clap(long, default_value = "/dev/ttyUSB0", help = "Serial port")]
    pub port: String,

    #[clap(short, long, default_value_t = 9600, help = "Serial baud rate")]
    pub baudrate: u32,

    #[clap(long, default_value_t = 8, help = "Serial data bits (5, 6, 7, 8)")]
    pub bytesize: u8,

    #[clap(long, default_value = "N", help = "Serial parity (N, E, O)")]
    pub parity: String,

    #[clap(long, default_value = "1", help = "Serial stop bits (1, 2)")]
    pub stopbits: String,

    #[clap(long, help = "Open the serial port even if it is busy")]
    pub force: bool,

    #[clap(long, help = "Scales host for socket connection")]
    pub host: Option<String>,

    #[clap(long, help = "Scales TCP port for socket connection")]
    pub tcp_port: Option<u16>,

    #[clap(short, long, default_value_t = 1.0, help = "Transfer timeout, seconds")]
    pub timeout: f64,

    #[clap(short, long, default_value = "Scales", help = "Scales name")]
    pub name: String,

    #[clap(long, help = "JSON output")]
    pub json: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[clap(about = "Read the weight")]
    Weight {
        #[clap(short, long, default_value = "kg", help = "Measure unit (g, kg, lb, oz)")]
        unit: Unit,
        #[clap(long, default_value_t = 1, help = "Number of readings, 0 polls forever")]
        count: usize,
        #[clap(long, default_value_t = 1000, help = "Polling interval, ms")]
        interval: u64,
    },
    #[clap(about = "Show scales info")]
    Info,
    #[clap(about = "Generate bash completion script")]
    Completions,
}

impl Cli {
    /// Connection keyword parameters for the selected connection type.
    pub fn connection_params(&self) -> HashMap<String, String> {
        let mut params = HashMap::new();
        match self.connection {
            ConnectionType::Serial => {
                params.insert("port".to_string(), self.port.clone());
                params.insert("baudrate".to_string(), self.baudrate.to_string());
                params.insert("bytesize".to_string(), self.bytesize.to_string());
                params.insert("parity".to_string(), self.parity.clone());
                params.insert("stopbits".to_string(), self.stopbits.clone());
                params.insert("force".to_string(), self.force.to_string());
            }
            ConnectionType::Socket => {
                if let Some(host) = &self.host {
                    params.insert("host".to_string(), host.clone());
                }
                if let Some(port) = self.tcp_port {
                    params.insert("port".to_string(), port.to_string());
                }
            }
        }
        params
    }
}
