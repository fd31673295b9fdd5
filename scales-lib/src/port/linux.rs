use std::fs;

use glob::glob;
use log::warn;

/// Scans `/proc/*/fd` for a descriptor pointing at `port_name`.
pub fn is_port_open(port_name: &str) -> bool {
    let entries = match glob("/proc/[0-9]*/fd/*") {
        Ok(entries) => entries,
        Err(err) => {
            warn!("fd scan skipped: {}", err);
            return false;
        }
    };

    entries
        .filter_map(|p| p.ok())
        .filter_map(|path| fs::read_link(path).ok())
        .any(|link| link.to_str() == Some(port_name))
}
