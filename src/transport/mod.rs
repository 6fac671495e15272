//! Serial transport.
//!
//! Owns the lifetime of the single connection to the controller. Access is
//! two-level:
//!
//! - [`Transport::claim`] reserves the device for one [`Activity`] (a run, a
//!   step-debug session, the order queue, a jog session or a status probe).
//!   A second claim fails with [`TransportError::Busy`] instead of waiting.
//! - [`Session::open`] opens the port for one scoped operation. The returned
//!   [`Connection`] closes the port when dropped, on every exit path.
//!
//! All waiting goes through the [`DelayNs`] provider given at construction,
//! so the same code runs against [`StdDelay`] on hardware and
//! [`sim::SimClock`] in tests.

mod clock;
mod link;
mod retry;
#[cfg(feature = "serial")]
mod serial;
pub mod sim;

use core::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use embedded_hal::delay::DelayNs;
use parking_lot::Mutex;

use crate::codec::{Frame, Reply, REPLY_CAPACITY};
use crate::config::{ProtocolTiming, RobotConfig, SerialSettings};
use crate::error::{Error, Result, TransportError};

pub use clock::{delay_secs, StdDelay};
pub use link::{OpenFailure, PortOpener, SerialLink};
pub use retry::backoff_ms;
#[cfg(feature = "serial")]
pub use serial::SystemPorts;

/// Activity holding the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activity {
    /// Run-to-completion program execution.
    Run,
    /// Step-by-step debug execution.
    StepDebug,
    /// Order queue processing.
    Queue,
    /// Continuous jog or go-home.
    Jog,
    /// One-off E-stop or position query.
    Probe,
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Activity::Run => "program run",
            Activity::StepDebug => "step debug",
            Activity::Queue => "order queue",
            Activity::Jog => "jog",
            Activity::Probe => "status probe",
        };
        f.write_str(name)
    }
}

struct Inner<O> {
    opener: O,
    settings: SerialSettings,
    timing: ProtocolTiming,
    holder: Mutex<Option<Activity>>,
    link_open: Arc<AtomicBool>,
}

/// Shared handle to the controller's serial port.
///
/// Clones refer to the same port and the same activity claim.
pub struct Transport<O: PortOpener, D> {
    inner: Arc<Inner<O>>,
    delay: D,
}

impl<O: PortOpener, D: Clone> Clone for Transport<O, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            delay: self.delay.clone(),
        }
    }
}

impl<O, D> Transport<O, D>
where
    O: PortOpener,
    D: DelayNs + Clone + Send + 'static,
{
    /// Create a transport from the robot configuration.
    pub fn new(opener: O, config: &RobotConfig, delay: D) -> Self {
        Self::with_settings(opener, config.serial.clone(), config.timing, delay)
    }

    /// Create a transport from explicit settings.
    pub fn with_settings(opener: O, settings: SerialSettings, timing: ProtocolTiming, delay: D) -> Self {
        Self {
            inner: Arc::new(Inner {
                opener,
                settings,
                timing,
                holder: Mutex::new(None),
                link_open: Arc::new(AtomicBool::new(false)),
            }),
            delay,
        }
    }

    /// Serial settings in use.
    pub fn settings(&self) -> &SerialSettings {
        &self.inner.settings
    }

    /// Protocol timing in use.
    pub fn timing(&self) -> &ProtocolTiming {
        &self.inner.timing
    }

    /// The port backend.
    pub fn opener(&self) -> &O {
        &self.inner.opener
    }

    /// A copy of the delay provider.
    pub fn delay(&self) -> D {
        self.delay.clone()
    }

    /// Activity currently holding the device, if any.
    pub fn holder(&self) -> Option<Activity> {
        *self.inner.holder.lock()
    }

    /// Ports currently visible on the system.
    pub fn available_ports(&self) -> Vec<String> {
        self.inner.opener.available_ports()
    }

    /// Reserve the device for an activity.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Busy`] naming the current holder if another
    /// activity already holds the device.
    pub fn claim(&self, activity: Activity) -> Result<Session<O, D>> {
        let mut holder = self.inner.holder.lock();
        if let Some(current) = *holder {
            tracing::warn!(%activity, holder = %current, "device busy");
            return Err(Error::Transport(TransportError::Busy { holder: current }));
        }
        *holder = Some(activity);
        tracing::debug!(%activity, "device claimed");

        Ok(Session {
            inner: Arc::clone(&self.inner),
            delay: self.delay.clone(),
            activity,
        })
    }
}

/// Exclusive claim on the device for one activity.
///
/// Dropping the session releases the claim.
pub struct Session<O: PortOpener, D> {
    inner: Arc<Inner<O>>,
    delay: D,
    activity: Activity,
}

impl<O, D> Session<O, D>
where
    O: PortOpener,
    D: DelayNs + Clone + Send + 'static,
{
    /// The activity holding this claim.
    pub fn activity(&self) -> Activity {
        self.activity
    }

    /// Protocol timing in use.
    pub fn timing(&self) -> &ProtocolTiming {
        &self.inner.timing
    }

    /// Delay provider for waits outside a connection.
    pub fn delay(&mut self) -> &mut D {
        &mut self.delay
    }

    /// Open the port.
    ///
    /// Retries while the port is busy, up to the configured bound.
    ///
    /// # Errors
    ///
    /// - [`TransportError::AlreadyOpen`] if a connection is still open
    /// - [`TransportError::PortUnavailable`] once retries are exhausted
    /// - [`TransportError::PortNotFound`] with the visible ports listed
    pub fn open(&mut self) -> Result<Connection<O::Link, D>> {
        let flag = &self.inner.link_open;
        if flag.swap(true, Ordering::SeqCst) {
            return Err(Error::Transport(TransportError::AlreadyOpen));
        }

        match retry::open_with_retry(
            &self.inner.opener,
            &self.inner.settings,
            &self.inner.timing,
            &mut self.delay,
        ) {
            Ok(link) => Ok(Connection {
                link,
                delay: self.delay.clone(),
                timing: self.inner.timing,
                link_open: Arc::clone(flag),
            }),
            Err(e) => {
                flag.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }
}

impl<O: PortOpener, D> Drop for Session<O, D> {
    fn drop(&mut self) {
        *self.inner.holder.lock() = None;
        tracing::debug!(activity = %self.activity, "device released");
    }
}

/// An open port. Closed when dropped.
pub struct Connection<L: SerialLink, D> {
    link: L,
    delay: D,
    timing: ProtocolTiming,
    link_open: Arc<AtomicBool>,
}

impl<L, D> Connection<L, D>
where
    L: SerialLink,
    D: DelayNs,
{
    /// Protocol timing in use.
    pub fn timing(&self) -> &ProtocolTiming {
        &self.timing
    }

    /// Write a frame without waiting for a reply.
    pub fn write(&mut self, frame: &Frame) -> Result<()> {
        tracing::debug!(?frame, "send");
        self.link
            .write_all(frame.as_bytes())
            .map_err(|e| Error::Transport(e.into()))
    }

    /// Write a frame, wait the standard settle interval and read the reply.
    ///
    /// An empty reply is not an error.
    pub fn write_and_wait(&mut self, frame: &Frame) -> Result<Reply> {
        let settle = self.timing.settle_ms;
        self.write_and_wait_for(frame, settle)
    }

    /// Write a frame, wait `settle_ms` and read the reply.
    pub fn write_and_wait_for(&mut self, frame: &Frame, settle_ms: u32) -> Result<Reply> {
        self.write(frame)?;
        self.delay.delay_ms(settle_ms);
        let reply = self.read_reply()?;
        tracing::debug!(?reply, "receive");
        Ok(reply)
    }

    /// Write a frame, wait `settle_ms` and collect only bytes already received.
    ///
    /// Never blocks on the read timeout; a silent controller yields an empty
    /// reply.
    pub fn write_and_drain(&mut self, frame: &Frame, settle_ms: u32) -> Result<Reply> {
        self.write(frame)?;
        self.delay.delay_ms(settle_ms);
        if self.pending()? == 0 {
            return Ok(Reply::new());
        }
        let reply = self.read_reply()?;
        tracing::trace!(?reply, "drained");
        Ok(reply)
    }

    /// Read up to [`REPLY_CAPACITY`] bytes, bounded by the read timeout.
    pub fn read_reply(&mut self) -> Result<Reply> {
        let mut reply = Reply::new();
        let mut buf = [0u8; REPLY_CAPACITY];

        let n = self.read_chunk(&mut buf)?;
        reply.extend(&buf[..n]);

        while reply.remaining() > 0 && self.pending()? > 0 {
            let room = reply.remaining();
            let n = self.read_chunk(&mut buf[..room])?;
            if n == 0 {
                break;
            }
            reply.extend(&buf[..n]);
        }
        Ok(reply)
    }

    /// Wait for a number of seconds.
    pub fn pause(&mut self, seconds: f64) {
        delay_secs(&mut self.delay, seconds);
    }

    /// Wait for a number of milliseconds.
    pub fn pause_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    /// Close the port.
    pub fn close(self) {}

    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.link
            .read_available(buf)
            .map_err(|e| Error::Transport(e.into()))
    }

    fn pending(&mut self) -> Result<usize> {
        self.link.pending().map_err(|e| Error::Transport(e.into()))
    }
}

impl<L: SerialLink, D> Drop for Connection<L, D> {
    fn drop(&mut self) {
        self.link_open.store(false, Ordering::SeqCst);
        tracing::info!("port closed");
    }
}

#[cfg(test)]
mod tests {
    use super::sim::{SimArm, SimClock};
    use super::*;
    use crate::codec::build_query_estop;

    fn transport(arm: &SimArm, clock: &SimClock) -> Transport<SimArm, SimClock> {
        Transport::new(arm.clone(), &RobotConfig::default(), clock.clone())
    }

    #[test]
    fn test_claim_is_exclusive() {
        let arm = SimArm::new();
        let transport = transport(&arm, &SimClock::new());

        let session = transport.claim(Activity::Queue).unwrap();
        assert_eq!(transport.holder(), Some(Activity::Queue));

        let err = transport.claim(Activity::Jog).err().unwrap();
        assert_eq!(
            err,
            Error::Transport(TransportError::Busy {
                holder: Activity::Queue
            })
        );

        drop(session);
        assert_eq!(transport.holder(), None);
        assert!(transport.claim(Activity::Jog).is_ok());
    }

    #[test]
    fn test_connection_closes_on_drop() {
        let arm = SimArm::new();
        let transport = transport(&arm, &SimClock::new());
        let mut session = transport.claim(Activity::Probe).unwrap();

        let conn = session.open().unwrap();
        assert_eq!(arm.links_open(), 1);
        assert!(matches!(
            session.open().err().unwrap(),
            Error::Transport(TransportError::AlreadyOpen)
        ));

        conn.close();
        assert_eq!(arm.links_open(), 0);
        assert!(session.open().is_ok());
    }

    #[test]
    fn test_write_and_wait_settles() {
        let arm = SimArm::new();
        let clock = SimClock::new();
        let transport = transport(&arm, &clock);
        let mut session = transport.claim(Activity::Probe).unwrap();
        let mut conn = session.open().unwrap();

        let reply = conn.write_and_wait(&build_query_estop()).unwrap();
        assert_eq!(reply.text(), "ok\r\n");
        assert_eq!(clock.elapsed().as_millis(), 500);
    }

    #[test]
    fn test_busy_open_retried() {
        let arm = SimArm::new();
        let clock = SimClock::new();
        arm.fail_busy_opens(2);
        let transport = transport(&arm, &clock);
        let mut session = transport.claim(Activity::Run).unwrap();

        assert!(session.open().is_ok());
        assert_eq!(arm.open_attempts(), 3);
        // 10 ms then 20 ms of backoff
        assert_eq!(clock.elapsed().as_millis(), 30);
    }

    #[test]
    fn test_busy_open_exhausted() {
        let arm = SimArm::new();
        arm.fail_busy_opens(5);
        let transport = transport(&arm, &SimClock::new());
        let mut session = transport.claim(Activity::Run).unwrap();

        match session.open().err().unwrap() {
            Error::Transport(TransportError::PortUnavailable { port, attempts, .. }) => {
                assert_eq!(port, "COM3");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(arm.open_attempts(), 3);
        // a failed open leaves the session able to retry
        arm.fail_busy_opens(0);
        assert!(session.open().is_ok());
    }

    #[test]
    fn test_not_found_lists_ports() {
        let arm = SimArm::new();
        arm.set_missing(true);
        arm.set_available_ports(vec!["COM4".into(), "COM7".into()]);
        let transport = transport(&arm, &SimClock::new());
        let mut session = transport.claim(Activity::Run).unwrap();

        assert_eq!(
            session.open().err().unwrap(),
            Error::Transport(TransportError::PortNotFound {
                port: "COM3".into(),
                available: vec!["COM4".into(), "COM7".into()],
            })
        );
        assert_eq!(arm.open_attempts(), 1);
    }
}
