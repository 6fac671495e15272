//! Builders for programmatic step and program creation.

use crate::error::{Error, ProgramError, Result};

use super::sequence::Program;
use super::step::{default_delay, default_feedrate, MoveCommand, Step};

/// Builder for creating steps.
#[derive(Debug, Clone)]
pub struct StepBuilder {
    cmd: MoveCommand,
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    feedrate: f64,
    delay: f64,
    gripper_angle: Option<f64>,
}

impl Default for StepBuilder {
    fn default() -> Self {
        Self::new(MoveCommand::LinearMove)
    }
}

impl StepBuilder {
    /// Create a new step builder for the given command.
    pub fn new(cmd: MoveCommand) -> Self {
        Self {
            cmd,
            x: None,
            y: None,
            z: None,
            feedrate: default_feedrate(),
            delay: default_delay(),
            gripper_angle: None,
        }
    }

    /// Start a linear move (`G01`) step.
    pub fn linear() -> Self {
        Self::new(MoveCommand::LinearMove)
    }

    /// Start a rapid move (`G00`) step.
    pub fn rapid() -> Self {
        Self::new(MoveCommand::RapidMove)
    }

    /// Set the X target in millimeters.
    pub fn x(mut self, x: f64) -> Self {
        self.x = Some(x);
        self
    }

    /// Set the Y target in millimeters.
    pub fn y(mut self, y: f64) -> Self {
        self.y = Some(y);
        self
    }

    /// Set the Z target in millimeters.
    pub fn z(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }

    /// Set all three targets.
    pub fn xyz(self, x: f64, y: f64, z: f64) -> Self {
        self.x(x).y(y).z(z)
    }

    /// Set the feedrate in mm/min.
    pub fn feedrate(mut self, feedrate: f64) -> Self {
        self.feedrate = feedrate;
        self
    }

    /// Set the delay after the step in seconds.
    pub fn delay(mut self, seconds: f64) -> Self {
        self.delay = seconds;
        self
    }

    /// Set the gripper servo angle in degrees.
    pub fn gripper(mut self, angle: f64) -> Self {
        self.gripper_angle = Some(angle);
        self
    }

    /// Build the step without validation.
    pub fn build(self) -> Step {
        Step {
            cmd: self.cmd,
            x: self.x,
            y: self.y,
            z: self.z,
            feedrate: self.feedrate,
            delay: self.delay,
            gripper_angle: self.gripper_angle,
        }
    }

    /// Build the step, rejecting values the controller cannot execute.
    ///
    /// # Errors
    ///
    /// Returns an error for a non-positive feedrate, a negative delay or a
    /// non-finite coordinate or angle.
    pub fn try_build(self) -> Result<Step> {
        if !(self.feedrate.is_finite() && self.feedrate > 0.0) {
            return Err(invalid("feedrate must be a positive number"));
        }
        if !(self.delay.is_finite() && self.delay >= 0.0) {
            return Err(invalid("delay must be a non-negative number"));
        }
        if [self.x, self.y, self.z, self.gripper_angle]
            .into_iter()
            .flatten()
            .any(|v| !v.is_finite())
        {
            return Err(invalid("coordinates and gripper angle must be finite"));
        }
        Ok(self.build())
    }
}

fn invalid(reason: &'static str) -> Error {
    Error::Program(ProgramError::InvalidStep(reason))
}

/// Builder for creating programs step by step.
#[derive(Debug, Clone)]
pub struct ProgramBuilder {
    name: String,
    steps: Vec<Step>,
}

impl ProgramBuilder {
    /// Create a new program builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append a linear move.
    pub fn move_to(self, x: f64, y: f64, z: f64, feedrate: f64) -> Self {
        self.step(StepBuilder::linear().xyz(x, y, z).feedrate(feedrate).build())
    }

    /// Append a pure wait.
    pub fn wait(self, seconds: f64) -> Self {
        self.step(Step::wait(seconds))
    }

    /// Append a gripper-only step.
    pub fn gripper(self, angle: f64) -> Self {
        self.step(StepBuilder::linear().gripper(angle).build())
    }

    /// Build the program.
    pub fn build(self) -> Program {
        Program::with_steps(self.name, self.steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_builder_defaults() {
        let step = StepBuilder::linear().x(5.0).build();
        assert_eq!(step.cmd, MoveCommand::LinearMove);
        assert_eq!(step.feedrate, 20.0);
        assert_eq!(step.delay, 0.5);
        assert_eq!(step.y, None);
    }

    #[test]
    fn test_try_build_validation() {
        assert!(StepBuilder::rapid().x(1.0).try_build().is_ok());
        assert!(StepBuilder::linear().feedrate(0.0).try_build().is_err());
        assert!(StepBuilder::linear().delay(-1.0).try_build().is_err());
        assert!(StepBuilder::linear().z(f64::INFINITY).try_build().is_err());
    }

    #[test]
    fn test_program_builder() {
        let program = ProgramBuilder::new("pour")
            .gripper(90.0)
            .move_to(10.0, 20.0, 30.0, 200.0)
            .wait(2.0)
            .build();

        assert_eq!(program.name, "pour");
        assert_eq!(program.len(), 3);
        assert!(program.get(2).unwrap().is_pure_wait());
    }
}
