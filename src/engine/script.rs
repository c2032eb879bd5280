//! Command Scripts
//!
//! A script is compiled by appending commands in order and then frozen
//! before it is handed to the executor. Nothing can reorder or remove a
//! command once appended.

use std::fmt;

/// Statement separator understood by the engine's `-exec` flag
pub const SEPARATOR: char = ';';

/// Append-only builder for an engine script
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandScript {
    commands: Vec<String>,
}

impl CommandScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: impl Into<String>) {
        self.commands.push(command.into());
    }

    pub fn extend<I, S>(&mut self, commands: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands.extend(commands.into_iter().map(Into::into));
    }

    /// Append every command of another builder after this one's
    pub fn append(&mut self, other: CommandScript) {
        self.commands.extend(other.commands);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Freeze the script for execution
    pub fn finish(self) -> Script {
        Script {
            commands: self.commands,
        }
    }
}

/// An immutable, ordered script ready for a single batch invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    commands: Vec<String>,
}

impl Script {
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Single-argument form passed to `-exec`
    pub fn joined(&self) -> String {
        self.commands.join(&SEPARATOR.to_string())
    }

    /// One command per line, written beside the log for diagnostics
    pub fn listing(&self) -> String {
        self.commands.join("\n")
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}
