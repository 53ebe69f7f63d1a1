//! Terminal abstraction used by the parameter collector.

use std::collections::VecDeque;

use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, MultiSelect, Password, Select};

use crate::error::{NhnError, Result};

pub trait Prompter {
    fn input(&mut self, message: &str, default: Option<&str>) -> Result<String>;
    fn password(&mut self, message: &str) -> Result<String>;
    fn select(&mut self, message: &str, items: &[String], default: usize) -> Result<usize>;
    fn multi_select(&mut self, message: &str, items: &[String], checked: &[bool]) -> Result<Vec<usize>>;
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool>;
    /// Show a rejected answer before asking again.
    fn report_error(&mut self, message: &str);
}

/// Prompts on the attached terminal.
pub struct DialoguerPrompter {
    theme: ColorfulTheme,
}

impl Default for DialoguerPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Prompter for DialoguerPrompter {
    fn input(&mut self, message: &str, default: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(message)
            .allow_empty(true);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        Ok(input.interact_text()?)
    }

    fn password(&mut self, message: &str) -> Result<String> {
        Ok(Password::with_theme(&self.theme)
            .with_prompt(message)
            .allow_empty_password(true)
            .interact()?)
    }

    fn select(&mut self, message: &str, items: &[String], default: usize) -> Result<usize> {
        Ok(Select::with_theme(&self.theme)
            .with_prompt(message)
            .items(items)
            .default(default)
            .interact()?)
    }

    fn multi_select(&mut self, message: &str, items: &[String], checked: &[bool]) -> Result<Vec<usize>> {
        Ok(MultiSelect::with_theme(&self.theme)
            .with_prompt(message)
            .items(items)
            .defaults(checked)
            .interact()?)
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        Ok(Confirm::with_theme(&self.theme)
            .with_prompt(message)
            .default(default)
            .interact()?)
    }

    fn report_error(&mut self, message: &str) {
        eprintln!("{} {}", style("✘").red(), style(message).red());
    }
}

/// One canned answer for [`ScriptedPrompter`].
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Text(String),
    Index(usize),
    Indices(Vec<usize>),
    Bool(bool),
}

/// Replays canned answers in order. Used by tests and scripted callers.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<Answer>,
    /// Messages of every prompt shown, in order.
    pub asked: Vec<String>,
    /// Errors passed to `report_error`.
    pub errors: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next(&mut self, message: &str) -> Result<Answer> {
        self.asked.push(message.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| NhnError::Prompt(format!("no answer scripted for '{}'", message)))
    }

    fn mismatch(message: &str, answer: Answer) -> NhnError {
        NhnError::Prompt(format!("unexpected answer {:?} for '{}'", answer, message))
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&mut self, message: &str, default: Option<&str>) -> Result<String> {
        match self.next(message)? {
            Answer::Text(s) if s.is_empty() => Ok(default.unwrap_or_default().to_string()),
            Answer::Text(s) => Ok(s),
            other => Err(Self::mismatch(message, other)),
        }
    }

    fn password(&mut self, message: &str) -> Result<String> {
        match self.next(message)? {
            Answer::Text(s) => Ok(s),
            other => Err(Self::mismatch(message, other)),
        }
    }

    fn select(&mut self, message: &str, items: &[String], _default: usize) -> Result<usize> {
        match self.next(message)? {
            Answer::Index(i) if i < items.len() => Ok(i),
            other => Err(Self::mismatch(message, other)),
        }
    }

    fn multi_select(&mut self, message: &str, items: &[String], _checked: &[bool]) -> Result<Vec<usize>> {
        match self.next(message)? {
            Answer::Indices(indices) if indices.iter().all(|i| *i < items.len()) => Ok(indices),
            other => Err(Self::mismatch(message, other)),
        }
    }

    fn confirm(&mut self, message: &str, _default: bool) -> Result<bool> {
        match self.next(message)? {
            Answer::Bool(b) => Ok(b),
            other => Err(Self::mismatch(message, other)),
        }
    }

    fn report_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}
