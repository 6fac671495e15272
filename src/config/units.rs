//! Unit types for physical quantities.
//!
//! Keeps millimeters, feedrates and percentages apart in configuration so a
//! workspace limit can never be passed where a feedrate is expected.

use core::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Linear position or distance in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Millimeters(pub f64);

impl Millimeters {
    /// Create a new Millimeters value.
    #[inline]
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl Add for Millimeters {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Millimeters {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

/// Feedrate in millimeters per minute.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MmPerMin(pub f64);

impl MmPerMin {
    /// Create a new MmPerMin value.
    #[inline]
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Seconds needed to travel `distance` at this feedrate.
    ///
    /// Returns `None` for a zero, negative or non-finite feedrate.
    pub fn travel_seconds(self, distance: Millimeters) -> Option<f64> {
        if self.0.is_finite() && self.0 > 0.0 {
            Some(distance.0 / self.0 * 60.0)
        } else {
            None
        }
    }
}

impl Mul<f64> for MmPerMin {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

/// Percentage value (100.0 = unity).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percent(pub f64);

impl Percent {
    /// Create a new Percent value.
    #[inline]
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Convert to a multiplier (50% -> 0.5).
    #[inline]
    pub fn as_multiplier(self) -> f64 {
        self.0 / 100.0
    }
}

/// Extension trait for creating unit types from f64.
pub trait UnitExt {
    /// Interpret as millimeters.
    fn mm(self) -> Millimeters;
    /// Interpret as millimeters per minute.
    fn mm_per_min(self) -> MmPerMin;
    /// Interpret as a percentage.
    fn percent(self) -> Percent;
}

impl UnitExt for f64 {
    #[inline]
    fn mm(self) -> Millimeters {
        Millimeters(self)
    }

    #[inline]
    fn mm_per_min(self) -> MmPerMin {
        MmPerMin(self)
    }

    #[inline]
    fn percent(self) -> Percent {
        Percent(self)
    }
}
