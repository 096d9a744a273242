//! Reading the operator's branch choice.

use anyhow::Context;
use dialoguer::Input;
use dialoguer::theme::ColorfulTheme;
use std::io::{BufRead, IsTerminal};

/// Source of the raw menu input. Validation happens in
/// [`crate::branch::parse_selection`], not here.
pub trait SelectionPrompt {
    /// Reads one line for a menu of `count` entries.
    fn read_selection(&mut self, count: usize) -> anyhow::Result<String>;
}

/// Prompts on the terminal, or reads a plain line when stdin is piped.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl SelectionPrompt for TerminalPrompt {
    fn read_selection(&mut self, count: usize) -> anyhow::Result<String> {
        let message = format!("Select a branch [0-{}]", count.saturating_sub(1));

        if std::io::stdin().is_terminal() {
            return Input::<String>::with_theme(&ColorfulTheme::default())
                .with_prompt(message)
                .allow_empty(true)
                .interact_text()
                .context("Failed to read branch selection");
        }

        eprintln!("{}:", message);
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read branch selection from stdin")?;
        Ok(line)
    }
}

/// Answers with input supplied up front (e.g. `--select`).
#[derive(Debug, Clone, Default)]
pub struct PresetPrompt {
    answer: String,
    asked: usize,
}

impl PresetPrompt {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            asked: 0,
        }
    }

    pub fn times_asked(&self) -> usize {
        self.asked
    }
}

impl SelectionPrompt for PresetPrompt {
    fn read_selection(&mut self, _count: usize) -> anyhow::Result<String> {
        self.asked += 1;
        Ok(self.answer.clone())
    }
}
