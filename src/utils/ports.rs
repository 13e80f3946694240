use anyhow::{anyhow, Result};
use serde::Serialize;
use serialport::{SerialPortInfo, SerialPortType};
use std::collections::HashSet;

/// A serial port offered for selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortEntry {
    pub path: String,
    pub port_type: String,
}

/// Return the available serial ports, USB adapters first.
pub fn list_ports() -> Result<Vec<PortEntry>> {
    let raw_ports =
        serialport::available_ports().map_err(|err| anyhow!("Failed to list ports: {err}"))?;
    let ports = sort_and_dedup_ports(raw_ports)
        .into_iter()
        .map(|p| PortEntry {
            port_type: describe(&p.port_type),
            path: p.port_name,
        })
        .collect::<Vec<_>>();
    log::debug!("List of ports: {ports:?}");
    Ok(ports)
}

fn describe(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(info) => format!("usb {:04x}:{:04x}", info.vid, info.pid),
        SerialPortType::PciPort => "pci".to_string(),
        SerialPortType::BluetoothPort => "bluetooth".to_string(),
        SerialPortType::Unknown => "unknown".to_string(),
    }
}

pub(crate) fn sort_and_dedup_ports(raw_ports: Vec<SerialPortInfo>) -> Vec<SerialPortInfo> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut ports: Vec<SerialPortInfo> = raw_ports
        .into_iter()
        .filter(|p| seen.insert(p.port_name.to_lowercase()))
        .collect();

    // USB/ACM adapters first, then built-in UARTs
    fn priority(p: &SerialPortInfo) -> i32 {
        let n = p.port_name.to_lowercase();
        if matches!(p.port_type, SerialPortType::UsbPort(_)) || n.contains("usb") {
            0
        } else if n.contains("acm") {
            1
        } else if n.contains("ttys") || n.contains("serial") || n.starts_with("com") {
            2
        } else {
            10
        }
    }

    ports.sort_by(|a, b| {
        priority(a)
            .cmp(&priority(b))
            .then_with(|| a.port_name.cmp(&b.port_name))
    });
    ports
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(name: &str) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type: SerialPortType::Unknown,
        }
    }

    #[test]
    fn test_priority_and_dedup() {
        let input = vec![
            make("/dev/ttyS1"),
            make("/dev/ttyUSB0"),
            make("/dev/ttyACM0"),
            make("/dev/ttyS0"),
            make("/dev/ttyUSB0"),
        ];
        let names: Vec<_> = sort_and_dedup_ports(input)
            .into_iter()
            .map(|p| p.port_name)
            .collect();
        assert_eq!(
            names,
            vec!["/dev/ttyUSB0", "/dev/ttyACM0", "/dev/ttyS0", "/dev/ttyS1"]
        );
    }
}
