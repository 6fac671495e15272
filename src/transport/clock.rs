//! Thread-sleeping delay provider.

use std::thread;
use std::time::Duration;

use embedded_hal::delay::DelayNs;

/// [`DelayNs`] implementation that sleeps the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_us(&mut self, us: u32) {
        thread::sleep(Duration::from_micros(u64::from(us)));
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// Sleep for a number of seconds through a [`DelayNs`] provider.
///
/// Negative and non-finite values do not wait.
pub fn delay_secs<D: DelayNs>(delay: &mut D, seconds: f64) {
    if !(seconds.is_finite() && seconds > 0.0) {
        return;
    }
    let total_us = (seconds * 1_000_000.0).round();
    let mut remaining = if total_us >= u64::MAX as f64 {
        u64::MAX
    } else {
        total_us as u64
    };
    while remaining > 0 {
        let chunk = remaining.min(u64::from(u32::MAX));
        delay.delay_us(chunk as u32);
        remaining -= chunk;
    }
}
