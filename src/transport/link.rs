//! Port backend traits.

use std::io;

use crate::config::SerialSettings;

/// Why a port could not be opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenFailure {
    /// Port exists but is held by another process or access was denied.
    Busy(String),
    /// Port does not exist.
    NotFound,
    /// Any other failure.
    Other(String),
}

/// An open byte link to the controller.
pub trait SerialLink: Send {
    /// Write all bytes.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read whatever is available into `buf`, waiting at most the configured
    /// read timeout. A timeout returns `Ok(0)`.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Bytes already received and waiting to be read.
    fn pending(&mut self) -> io::Result<usize> {
        Ok(0)
    }
}

/// Opens links to the configured port.
pub trait PortOpener: Send + Sync + 'static {
    /// Link type produced by this opener.
    type Link: SerialLink + 'static;

    /// Open the port with the given settings.
    fn open(&self, settings: &SerialSettings) -> Result<Self::Link, OpenFailure>;

    /// Names of the ports currently visible on the system.
    fn available_ports(&self) -> Vec<String>;
}
