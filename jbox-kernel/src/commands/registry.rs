//! Command registry for looking up tools by name.

use super::JboxCommand;
use super::runner::{self, RunError};
use std::collections::HashMap;
use std::io::BufRead;

use super::array::{ArrayCommand, UnarrayCommand};
use super::cat::CatCommand;
use super::diff::DiffCommand;
use super::grep::GrepCommand;
use super::join::JoinCommand;
use super::keys::KeysCommand;
use super::last::LastCommand;
use super::ls::LsCommand;
use super::paste::PasteCommand;
use super::prtprn::PrtprnCommand;
use super::ps::PsCommand;
use super::sort::SortCommand;
use super::split::SplitCommand;
use super::uniq::UniqCommand;

/// Registry of all available tools.
pub struct CommandRegistry {
    commands: HashMap<&'static str, Box<dyn JboxCommand>>,
}

impl CommandRegistry {
    /// Create a new registry with every built-in tool registered.
    pub fn new() -> Self {
        let mut registry = Self {
            commands: HashMap::new(),
        };

        // Structural transforms
        registry.register(KeysCommand);
        registry.register(ArrayCommand);
        registry.register(UnarrayCommand);
        registry.register(PrtprnCommand);
        registry.register(GrepCommand);

        // Collections
        registry.register(SortCommand);
        registry.register(UniqCommand);
        registry.register(JoinCommand);

        // Files
        registry.register(CatCommand);
        registry.register(PasteCommand);
        registry.register(DiffCommand);
        registry.register(SplitCommand);
        registry.register(LsCommand);

        // System
        registry.register(PsCommand);
        registry.register(LastCommand);

        registry
    }

    /// Register a tool.
    pub fn register<C: JboxCommand + 'static>(&mut self, command: C) {
        self.commands.insert(command.name(), Box::new(command));
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn JboxCommand> {
        self.commands.get(name).map(|c| c.as_ref())
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// All tool names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Run the tool `name` over `tokens`, reading `stdin` if it needs to.
    pub fn run(
        &self,
        name: &str,
        tokens: &[String],
        stdin: &mut dyn BufRead,
    ) -> Result<String, RunError> {
        let command = self
            .get(name)
            .ok_or_else(|| RunError::UnknownCommand(name.to_string()))?;
        runner::run(command, tokens, stdin)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
