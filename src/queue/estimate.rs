//! Execution time estimates for progress display.
//!
//! These are approximations from feedrates and delays, not predictions of
//! real device timing.

use crate::config::{Millimeters, MmPerMin, QueueSettings};
use crate::program::{Program, Step};

/// Estimates program duration from step delays and feedrates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeEstimator {
    assumed_distance: Millimeters,
    default_step_seconds: f64,
}

impl Default for TimeEstimator {
    fn default() -> Self {
        Self::new(&QueueSettings::default())
    }
}

impl TimeEstimator {
    /// Create an estimator from the queue settings.
    pub fn new(settings: &QueueSettings) -> Self {
        Self {
            assumed_distance: settings.assumed_move_distance,
            default_step_seconds: settings.default_step_seconds,
        }
    }

    /// Seconds for one step: its delay plus the assumed move at its feedrate,
    /// or the default per-step time without a usable feedrate.
    pub fn estimate_step(&self, step: &Step) -> f64 {
        let travel = MmPerMin(step.feedrate)
            .travel_seconds(self.assumed_distance)
            .unwrap_or(self.default_step_seconds);
        step.delay + travel
    }

    /// Seconds for one run of a program.
    pub fn estimate_time(&self, program: &Program) -> f64 {
        program.iter().map(|s| self.estimate_step(s)).sum()
    }
}

/// Seconds for one run of a program with the default settings.
pub fn estimate_time(program: &Program) -> f64 {
    TimeEstimator::default().estimate_time(program)
}

/// Format seconds as `"Xm Ys"`.
pub fn format_time(seconds: f64) -> String {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{}m {}s", whole / 60, whole % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::StepBuilder;

    #[test]
    fn test_estimate_formula() {
        // 100 mm at 200 mm/min = 30 s, plus 0.5 s delay
        let step = StepBuilder::linear().x(1.0).feedrate(200.0).delay(0.5).build();
        assert!((TimeEstimator::default().estimate_step(&step) - 30.5).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_default_for_zero_feedrate() {
        let step = StepBuilder::linear().feedrate(0.0).delay(1.0).build();
        assert!((TimeEstimator::default().estimate_step(&step) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_program() {
        let program = Program::with_steps(
            "p",
            vec![
                StepBuilder::linear().feedrate(100.0).delay(0.0).build(),
                StepBuilder::linear().feedrate(-5.0).delay(1.5).build(),
            ],
        );
        // 60 s + (1.5 s + 2 s)
        assert!((estimate_time(&program) - 63.5).abs() < 1e-9);
        assert_eq!(estimate_time(&Program::new("empty")), 0.0);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0m 0s");
        assert_eq!(format_time(63.5), "1m 3s");
        assert_eq!(format_time(3600.0), "60m 0s");
        assert_eq!(format_time(-4.0), "0m 0s");
        assert_eq!(format_time(f64::NAN), "0m 0s");
    }
}
