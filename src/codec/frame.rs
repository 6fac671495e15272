//! Wire frame and reply buffers, plus the values decoded from replies.

use core::fmt;

use heapless::Vec;

use crate::error::CodecError;

/// Capacity of a single command frame in bytes.
pub const FRAME_CAPACITY: usize = 128;

/// Maximum number of reply bytes read after a frame.
pub const REPLY_CAPACITY: usize = 100;

/// One complete wire-format command unit.
///
/// Text frames are written through [`fmt::Write`]; a write past
/// [`FRAME_CAPACITY`] fails instead of growing the buffer.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Frame(Vec<u8, FRAME_CAPACITY>);

impl Frame {
    /// Create an empty frame.
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Create a frame from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        Vec::from_slice(bytes)
            .map(Self)
            .map_err(|_| CodecError::FrameOverflow {
                capacity: FRAME_CAPACITY,
            })
    }

    /// Raw bytes to put on the wire.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Frame content as text, if it is valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        core::str::from_utf8(&self.0).ok()
    }

    /// Number of bytes in the frame.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the frame holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Write for Frame {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.extend_from_slice(s.as_bytes()).map_err(|_| fmt::Error)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => write!(f, "Frame({text:?})"),
            None => write!(f, "Frame({:02x?})", self.as_bytes()),
        }
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Raw bytes received after a frame, bounded by [`REPLY_CAPACITY`].
///
/// An empty reply is normal: the controller does not acknowledge every frame.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Reply(Vec<u8, REPLY_CAPACITY>);

impl Reply {
    /// Create an empty reply.
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Build a reply from bytes, keeping at most [`REPLY_CAPACITY`] of them.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let take = bytes.len().min(REPLY_CAPACITY);
        let mut inner = Vec::new();
        // cannot fail, `take` fits
        let _ = inner.extend_from_slice(&bytes[..take]);
        Self(inner)
    }

    /// Append bytes, returning how many fit.
    pub fn extend(&mut self, bytes: &[u8]) -> usize {
        let take = bytes.len().min(self.remaining());
        let _ = self.0.extend_from_slice(&bytes[..take]);
        take
    }

    /// Free space left in the buffer.
    #[inline]
    pub fn remaining(&self) -> usize {
        REPLY_CAPACITY - self.0.len()
    }

    /// Received bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Check if nothing was received.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reply decoded as text, replacing invalid sequences.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reply({:?})", self.text())
    }
}

impl AsRef<[u8]> for Reply {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Cartesian position reported by the controller, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Position {
    /// Create a new position.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The position's origin.
    pub const fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X{:.1} Y{:.1} Z{:.1}", self.x, self.y, self.z)
    }
}

/// Emergency stop state as reported by the controller.
///
/// `Unknown` must never be treated as `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstopState {
    /// Acknowledged, E-stop released.
    Normal,
    /// E-stop pressed.
    Active,
    /// No recognizable answer.
    Unknown,
}

impl EstopState {
    /// True only for a confirmed released E-stop.
    #[inline]
    pub fn is_normal(self) -> bool {
        matches!(self, EstopState::Normal)
    }
}

impl fmt::Display for EstopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EstopState::Normal => "normal",
            EstopState::Active => "active",
            EstopState::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
