use std::{collections::HashMap, sync::Mutex};

use crate::error::CertError;

use super::{CommandOutput, CommandRunner, CommandSpec};

/// A command runner for tests: records every command and answers with canned outputs.
///
/// Commands are matched by key: the command line for `/bin/sh -c` commands, the program
/// otherwise. Commands without a canned output succeed with empty output.
#[derive(Debug, Default)]
pub struct MockRunner {
    responses: Mutex<HashMap<String, CommandOutput>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every command matching `key` with `output`
    pub fn respond(self, key: impl Into<String>, output: CommandOutput) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(key.into(), output);
        }
        self
    }

    /// Every command run so far, in order
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// How many commands matching `key` have been run
    pub fn calls_to(&self, key: &str) -> usize {
        self.calls()
            .iter()
            .filter(|command| command_key(command) == key)
            .count()
    }
}

fn command_key(command: &CommandSpec) -> &str {
    match command.args.as_slice() {
        [flag, line] if command.program == "/bin/sh" && flag == "-c" => line,
        _ => &command.program,
    }
}

impl CommandRunner for MockRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, CertError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(command.clone());
        }

        let response = self
            .responses
            .lock()
            .ok()
            .and_then(|responses| responses.get(command_key(command)).cloned());

        Ok(response.unwrap_or_else(|| CommandOutput::ok("")))
    }
}
