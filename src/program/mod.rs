//! Motion model: steps, programs and their persistence.
//!
//! Programs are plain owned data. Anything that executes a program takes its
//! own copy, so an editor can keep mutating the original meanwhile.

mod builder;
pub mod io;
mod library;
mod sequence;
mod step;

pub use builder::{ProgramBuilder, StepBuilder};
pub use io::{load, load_file, save, save_file};
pub use library::ProgramLibrary;
pub use sequence::{Program, DEFAULT_PROGRAM_NAME};
pub use step::{MoveCommand, Step};
