//! Unit test harness for zkbot-motion.
//!
//! This module organizes unit tests for each component of the library.

mod codec_properties;
mod config_parsing;
mod config_validation;
mod program_editing;
