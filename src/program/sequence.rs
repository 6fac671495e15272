//! Named ordered sequence of steps and its editing operations.
//!
//! Every editing operation checks its indices before touching the sequence,
//! so a rejected edit leaves the program exactly as it was.

use serde::{Deserialize, Serialize};

use crate::error::{Error, ProgramError, Result};

use super::step::Step;

/// Name given to programs loaded without one.
pub const DEFAULT_PROGRAM_NAME: &str = "unnamed";

fn default_name() -> String {
    DEFAULT_PROGRAM_NAME.to_string()
}

/// Named ordered sequence of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Program name.
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default)]
    steps: Vec<Step>,
}

impl Default for Program {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM_NAME)
    }
}

impl Program {
    /// Create an empty program.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Create a program from existing steps.
    pub fn with_steps(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    /// Compose several programs into one, in order.
    pub fn concat<'a>(name: impl Into<String>, parts: impl IntoIterator<Item = &'a Program>) -> Self {
        let steps = parts
            .into_iter()
            .flat_map(|p| p.steps.iter().cloned())
            .collect();
        Self::with_steps(name, steps)
    }

    /// Steps in execution order.
    #[inline]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Number of steps.
    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the program has no steps.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Get a step by index.
    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Iterate over the steps.
    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }

    /// Append a step at the end.
    pub fn push(&mut self, step: Step) -> usize {
        self.steps.push(step);
        self.steps.len() - 1
    }

    /// Insert a step before `index`; `index == len` appends.
    pub fn insert(&mut self, index: usize, step: Step) -> Result<()> {
        if index > self.steps.len() {
            return Err(self.out_of_range(index));
        }
        self.steps.insert(index, step);
        Ok(())
    }

    /// Remove and return the step at `index`.
    pub fn delete(&mut self, index: usize) -> Result<Step> {
        self.check(index)?;
        Ok(self.steps.remove(index))
    }

    /// Move the step at `from` so that it ends up at index `to`.
    pub fn move_step(&mut self, from: usize, to: usize) -> Result<()> {
        self.check(from)?;
        self.check(to)?;
        let step = self.steps.remove(from);
        self.steps.insert(to, step);
        Ok(())
    }

    /// Swap the step at `index` with its predecessor.
    ///
    /// Returns the step's new index; a step already at the top stays put.
    pub fn move_up(&mut self, index: usize) -> Result<usize> {
        self.check(index)?;
        if index == 0 {
            return Ok(0);
        }
        self.steps.swap(index, index - 1);
        Ok(index - 1)
    }

    /// Swap the step at `index` with its successor.
    ///
    /// Returns the step's new index; a step already at the bottom stays put.
    pub fn move_down(&mut self, index: usize) -> Result<usize> {
        self.check(index)?;
        if index + 1 == self.steps.len() {
            return Ok(index);
        }
        self.steps.swap(index, index + 1);
        Ok(index + 1)
    }

    /// Insert a copy of the step at `index` right after it.
    ///
    /// Returns the index of the copy.
    pub fn duplicate(&mut self, index: usize) -> Result<usize> {
        self.check(index)?;
        let copy = self.steps[index].clone();
        self.steps.insert(index + 1, copy);
        Ok(index + 1)
    }

    /// Replace the step at `index`, returning the old one.
    pub fn replace(&mut self, index: usize, step: Step) -> Result<Step> {
        self.check(index)?;
        Ok(core::mem::replace(&mut self.steps[index], step))
    }

    /// Paste a step after the selected one, or at the end without a selection.
    ///
    /// Returns the index the step was pasted at.
    pub fn paste(&mut self, after: Option<usize>, step: Step) -> Result<usize> {
        let index = match after {
            Some(selected) => {
                self.check(selected)?;
                selected + 1
            }
            None => self.steps.len(),
        };
        self.steps.insert(index, step);
        Ok(index)
    }

    /// Remove all steps.
    pub fn clear(&mut self) {
        self.steps.clear();
    }

    fn check(&self, index: usize) -> Result<()> {
        if index < self.steps.len() {
            Ok(())
        } else {
            Err(self.out_of_range(index))
        }
    }

    fn out_of_range(&self, index: usize) -> Error {
        Error::Program(ProgramError::IndexOutOfRange {
            index,
            len: self.steps.len(),
        })
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Step;
    type IntoIter = core::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
