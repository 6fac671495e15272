//! Program library for named program lookup and recipe composition.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::RobotConfig;
use crate::error::{Error, ProgramError, Result};

use super::io;
use super::sequence::Program;

/// Registry of named programs.
///
/// Names may contain `/` to group programs (`common/pick_cup`), matching the
/// relative path of the file they were loaded from.
#[derive(Debug, Clone, Default)]
pub struct ProgramLibrary {
    programs: BTreeMap<String, Program>,
}

impl ProgramLibrary {
    /// Create a new empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a program under a name, returning the one it replaced.
    pub fn register(&mut self, name: impl Into<String>, program: Program) -> Option<Program> {
        self.programs.insert(name.into(), program)
    }

    /// Get a program by name.
    pub fn get(&self, name: &str) -> Option<&Program> {
        self.programs.get(name)
    }

    /// Get a program by name, or an error listing the available names.
    pub fn get_or_error(&self, name: &str) -> Result<&Program> {
        self.get(name).ok_or_else(|| {
            Error::Program(ProgramError::UnknownProgram {
                name: name.to_string(),
                available: self.names().map(str::to_string).collect(),
            })
        })
    }

    /// Check if a program exists.
    pub fn contains(&self, name: &str) -> bool {
        self.programs.contains_key(name)
    }

    /// Remove a program by name.
    pub fn remove(&mut self, name: &str) -> Option<Program> {
        self.programs.remove(name)
    }

    /// Get the number of registered programs.
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Check if the library is empty.
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Get an iterator over program names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.programs.keys().map(String::as_str)
    }

    /// Get an iterator over programs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Program)> {
        self.programs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Clear all programs.
    pub fn clear(&mut self) {
        self.programs.clear();
    }

    /// Build the order program for a flavor from its recipe.
    ///
    /// The recipe lists program names in execution order; their steps are
    /// concatenated into a new program named `drink_<flavor>`.
    pub fn compose(&self, config: &RobotConfig, flavor: &str) -> Result<Program> {
        let recipe = config
            .recipe(flavor)
            .ok_or_else(|| Error::Program(ProgramError::UnknownRecipe(flavor.to_string())))?;

        let parts = recipe
            .iter()
            .map(|name| self.get_or_error(name))
            .collect::<Result<Vec<_>>>()?;

        Ok(Program::concat(format!("drink_{flavor}"), parts))
    }

    /// Load every `*.json` program under `dir`, one directory level deep.
    ///
    /// Each program is registered under its path relative to `dir` without
    /// the extension, e.g. `juices/orange`.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let mut library = Self::new();
        library.load_from(dir.as_ref(), None)?;
        tracing::info!(count = library.len(), dir = %dir.as_ref().display(), "loaded program library");
        Ok(library)
    }

    fn load_from(&mut self, dir: &Path, prefix: Option<&str>) -> Result<()> {
        let entries = fs::read_dir(dir).map_err(|e| Error::Program(ProgramError::Io(e.to_string())))?;

        for entry in entries {
            let path = entry
                .map_err(|e| Error::Program(ProgramError::Io(e.to_string())))?
                .path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let name = match prefix {
                Some(prefix) => format!("{prefix}/{stem}"),
                None => stem.to_string(),
            };

            if path.is_dir() {
                if prefix.is_none() {
                    self.load_from(&path, Some(&name))?;
                }
            } else if path.extension().is_some_and(|ext| ext == "json") {
                let program = io::load_file(&path)?;
                self.register(name, program);
            }
        }
        Ok(())
    }
}

impl FromIterator<(String, Program)> for ProgramLibrary {
    fn from_iter<I: IntoIterator<Item = (String, Program)>>(iter: I) -> Self {
        Self {
            programs: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::program::Step;

    fn library() -> ProgramLibrary {
        let mut lib = ProgramLibrary::new();
        lib.register("origin", Program::with_steps("origin", vec![Step::wait(0.1)]));
        lib.register(
            "common/pick_cup",
            Program::with_steps("pick_cup", vec![Step::wait(0.2), Step::wait(0.3)]),
        );
        lib.register("juices/orange", Program::with_steps("orange", vec![Step::wait(0.4)]));
        lib
    }

    #[test]
    fn test_get_or_error_lists_names() {
        let lib = library();
        assert!(lib.get_or_error("origin").is_ok());

        let err = lib.get_or_error("juices/apple").unwrap_err();
        match err {
            Error::Program(ProgramError::UnknownProgram { name, available }) => {
                assert_eq!(name, "juices/apple");
                assert_eq!(available.len(), 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_compose_recipe() {
        let config = parse_config(
            r#"
[recipes]
Orange = ["origin", "common/pick_cup", "juices/orange"]
Broken = ["origin", "juices/missing"]
"#,
        )
        .unwrap();
        let lib = library();

        let program = lib.compose(&config, "Orange").unwrap();
        assert_eq!(program.name, "drink_Orange");
        let delays: Vec<f64> = program.iter().map(|s| s.delay).collect();
        assert_eq!(delays, vec![0.1, 0.2, 0.3, 0.4]);

        assert!(matches!(
            lib.compose(&config, "Broken"),
            Err(Error::Program(ProgramError::UnknownProgram { .. }))
        ));
        assert!(matches!(
            lib.compose(&config, "Mango"),
            Err(Error::Program(ProgramError::UnknownRecipe(_)))
        ));
    }

    #[test]
    fn test_load_dir() {
        let dir = std::env::temp_dir().join(format!("zkbot-lib-{}", std::process::id()));
        let juices = dir.join("juices");
        fs::create_dir_all(&juices).unwrap();
        io::save_file(&Program::new("origin"), dir.join("origin.json")).unwrap();
        io::save_file(&Program::new("orange"), juices.join("orange.json")).unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let lib = ProgramLibrary::load_dir(&dir).unwrap();
        let names: Vec<&str> = lib.names().collect();
        assert_eq!(names, vec!["juices/orange", "origin"]);

        fs::remove_dir_all(&dir).unwrap();
    }
}
