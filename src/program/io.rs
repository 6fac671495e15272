//! Program persistence as JSON.

use std::fs;
use std::path::Path;

use crate::error::{Error, ProgramError, Result};

use super::sequence::Program;

/// Decode a program from JSON bytes.
///
/// Absent optional fields (and explicit `null`) load as absent, never as zero.
pub fn load(bytes: &[u8]) -> Result<Program> {
    serde_json::from_slice(bytes).map_err(|e| Error::Program(ProgramError::Parse(e.to_string())))
}

/// Encode a program as pretty-printed JSON bytes.
///
/// Absent optional fields are omitted. A NaN or infinite value is refused
/// rather than written as `null`, which would load back as absent.
pub fn save(program: &Program) -> Result<Vec<u8>> {
    check_finite(program)?;
    serde_json::to_vec_pretty(program).map_err(|e| Error::Program(ProgramError::Parse(e.to_string())))
}

fn check_finite(program: &Program) -> Result<()> {
    for (index, step) in program.iter().enumerate() {
        let fields = [
            ("x", step.x),
            ("y", step.y),
            ("z", step.z),
            ("f", Some(step.feedrate)),
            ("delay", Some(step.delay)),
            ("do0", step.gripper_angle),
        ];
        if let Some((field, _)) = fields
            .into_iter()
            .find(|(_, value)| value.is_some_and(|v| !v.is_finite()))
        {
            return Err(Error::Program(ProgramError::NonFiniteField { index, field }));
        }
    }
    Ok(())
}

/// Load a program from a JSON file.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Program> {
    let bytes = fs::read(path.as_ref()).map_err(|e| Error::Program(ProgramError::Io(e.to_string())))?;
    let program = load(&bytes)?;
    tracing::debug!(name = %program.name, steps = program.len(), path = %path.as_ref().display(), "loaded program");
    Ok(program)
}

/// Save a program to a JSON file.
pub fn save_file<P: AsRef<Path>>(program: &Program, path: P) -> Result<()> {
    let bytes = save(program)?;
    fs::write(path.as_ref(), bytes).map_err(|e| Error::Program(ProgramError::Io(e.to_string())))?;
    tracing::debug!(name = %program.name, path = %path.as_ref().display(), "saved program");
    Ok(())
}
