//! Composite commands
//!
//! A [`CompositeCommand`] owns an ordered list of commands and behaves like a
//! single command: executing it runs the list in order and stops at the
//! first failure. Composites nest to any depth. Sub-commands are owned
//! values, so a composite can never contain itself.

use super::{Command, Delay, Outcome};
use crate::error::CommandError;
use tracing::{debug, info, instrument, warn};

const DESCRIPTION: &str = "A composite command which contains multiple commands but acts like a \
single command that executes all contained commands sequentially.";

/// An ordered sequence of commands executed with short-circuit failure.
#[derive(Default)]
pub struct CompositeCommand {
    commands: Vec<Box<dyn Command>>,
    delay: Delay,
    outcome: Option<Outcome>,
}

impl CompositeCommand {
    /// Create an empty composite with no delay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a delay.
    pub fn with_delay(mut self, delay: impl Into<Delay>) -> Self {
        self.delay = delay.into();
        self
    }

    /// Append a command, builder style.
    pub fn then(mut self, command: impl Command + 'static) -> Self {
        self.commands.push(Box::new(command));
        self
    }

    /// Insert `command` at `index`, or append when `index` is `None`.
    ///
    /// # Errors
    /// [`CommandError::IndexOutOfRange`] if `index` is past the end.
    pub fn add_command(
        &mut self,
        command: Box<dyn Command>,
        index: Option<usize>,
    ) -> Result<(), CommandError> {
        match index {
            None => self.commands.push(command),
            Some(index) if index <= self.commands.len() => self.commands.insert(index, command),
            Some(index) => {
                return Err(CommandError::IndexOutOfRange {
                    index,
                    len: self.commands.len(),
                })
            }
        }
        Ok(())
    }

    /// Remove and return the command at `index`, or the last one when
    /// `index` is `None`.
    ///
    /// # Errors
    /// [`CommandError::IndexOutOfRange`] if the list is empty or `index` is
    /// past the end.
    pub fn remove_command(&mut self, index: Option<usize>) -> Result<Box<dyn Command>, CommandError> {
        let len = self.commands.len();
        let index = match index {
            Some(index) => index,
            None => len.checked_sub(1).ok_or(CommandError::IndexOutOfRange { index: 0, len })?,
        };
        if index >= len {
            return Err(CommandError::IndexOutOfRange { index, len });
        }
        Ok(self.commands.remove(index))
    }

    /// Number of direct sub-commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether there are no sub-commands.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Direct sub-commands in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Command> {
        self.commands.iter().map(|command| command.as_ref())
    }
}

impl Command for CompositeCommand {
    /// Run each sub-command in order, mirroring its outcome, and stop after
    /// the first one that does not succeed. A sub-command that recorded no
    /// outcome stops the sequence and leaves this outcome unset too. An empty
    /// composite leaves its outcome as is.
    #[instrument(level = "debug", skip(self), fields(commands = self.commands.len()))]
    fn execute(&mut self) {
        for (position, command) in self.commands.iter_mut().enumerate() {
            debug!(position, command = %command.name(), "executing sub-command");
            command.execute();
            self.outcome = command.outcome().cloned();
            if command.was_successful() != Some(true) {
                warn!(position, command = %command.name(), "sub-command failed, stopping");
                return;
            }
        }
        info!("composite command completed");
    }

    fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    fn name(&self) -> String {
        let mut name = "CompositeCommand:".to_string();
        for command in &self.commands {
            name.push_str(&format!(" {};", command.name()));
        }
        name
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    fn delay(&self) -> &Delay {
        &self.delay
    }
}
