//! Bounded retry for opening a contended port.

use embedded_hal::delay::DelayNs;

use crate::config::{ProtocolTiming, SerialSettings};
use crate::error::{Error, Result, TransportError};

use super::link::{OpenFailure, PortOpener};

/// Backoff before retry `attempt` (1-based): `base * 2^(attempt - 1)`.
pub fn backoff_ms(base_ms: u32, attempt: u32) -> u32 {
    if attempt == 0 {
        return 0;
    }
    let shift = (attempt - 1).min(16);
    base_ms.saturating_mul(1 << shift)
}

/// Open the configured port, retrying while it is busy.
///
/// Not-found and other failures are not retried.
pub(crate) fn open_with_retry<O, D>(
    opener: &O,
    settings: &SerialSettings,
    timing: &ProtocolTiming,
    delay: &mut D,
) -> Result<O::Link>
where
    O: PortOpener,
    D: DelayNs,
{
    let attempts = timing.open_retries.max(1);
    let mut last_reason = String::new();

    for attempt in 1..=attempts {
        match opener.open(settings) {
            Ok(link) => {
                tracing::info!(port = %settings.port, attempt, "port opened");
                return Ok(link);
            }
            Err(OpenFailure::Busy(reason)) => {
                tracing::warn!(port = %settings.port, attempt, attempts, %reason, "port busy");
                last_reason = reason;
                if attempt < attempts {
                    delay.delay_ms(backoff_ms(timing.retry_backoff_ms, attempt));
                }
            }
            Err(OpenFailure::NotFound) => {
                let available = opener.available_ports();
                tracing::warn!(port = %settings.port, ?available, "port not found");
                return Err(Error::Transport(TransportError::PortNotFound {
                    port: settings.port.clone(),
                    available,
                }));
            }
            Err(OpenFailure::Other(reason)) => {
                return Err(Error::Transport(TransportError::Io(reason)));
            }
        }
    }

    Err(Error::Transport(TransportError::PortUnavailable {
        port: settings.port.clone(),
        attempts,
        reason: last_reason,
    }))
}
