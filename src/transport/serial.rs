//! System serial port backend.

use std::io::{self, Read, Write};

use serialport::{ErrorKind, SerialPort};

use crate::config::{self, SerialSettings};

use super::link::{OpenFailure, PortOpener, SerialLink};

/// Opens real serial ports through the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPorts;

impl PortOpener for SystemPorts {
    type Link = Box<dyn SerialPort>;

    fn open(&self, settings: &SerialSettings) -> Result<Self::Link, OpenFailure> {
        serialport::new(settings.port.as_str(), settings.baud_rate)
            .data_bits(data_bits(settings.data_bits))
            .parity(parity(settings.parity))
            .stop_bits(stop_bits(settings.stop_bits))
            .timeout(settings.timeout())
            .open()
            .map_err(classify)
    }

    fn available_ports(&self) -> Vec<String> {
        match serialport::available_ports() {
            Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "port enumeration failed");
                Vec::new()
            }
        }
    }
}

impl SerialLink for Box<dyn SerialPort> {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        Write::write_all(self, bytes)?;
        self.flush()
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn pending(&mut self) -> io::Result<usize> {
        self.bytes_to_read()
            .map(|n| n as usize)
            .map_err(|e| io::Error::other(e.to_string()))
    }
}

fn classify(error: serialport::Error) -> OpenFailure {
    match error.kind() {
        ErrorKind::NoDevice | ErrorKind::Io(io::ErrorKind::NotFound) => OpenFailure::NotFound,
        ErrorKind::Io(io::ErrorKind::PermissionDenied) => OpenFailure::Busy(error.to_string()),
        _ if error.to_string().to_ascii_lowercase().contains("busy") => {
            OpenFailure::Busy(error.to_string())
        }
        _ => OpenFailure::Other(error.to_string()),
    }
}

fn data_bits(bits: config::DataBits) -> serialport::DataBits {
    match bits.value() {
        5 => serialport::DataBits::Five,
        6 => serialport::DataBits::Six,
        7 => serialport::DataBits::Seven,
        _ => serialport::DataBits::Eight,
    }
}

fn parity(parity: config::Parity) -> serialport::Parity {
    match parity {
        config::Parity::None => serialport::Parity::None,
        config::Parity::Odd => serialport::Parity::Odd,
        config::Parity::Even => serialport::Parity::Even,
    }
}

fn stop_bits(bits: config::StopBits) -> serialport::StopBits {
    match bits {
        config::StopBits::One => serialport::StopBits::One,
        config::StopBits::Two => serialport::StopBits::Two,
    }
}
