//! Selection protocol.
//!
//! Every operator choice goes through [`Selector`]: an interactive prompt,
//! command-line flags, or fixed test answers all look the same to the
//! orchestrator, which validates whatever index comes back.

use hvr_core::error::{HvrError, Result};
use std::collections::VecDeque;

/// One candidate: `key` identifies it, `label` is what an operator reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionItem {
    pub key: String,
    pub label: String,
}

impl SelectionItem {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

pub trait Selector {
    /// Pick one of `items` (never empty); returns its index
    fn choose(&mut self, prompt: &str, items: &[SelectionItem]) -> Result<usize>;

    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// Reject an index the selector made up
pub fn checked_index(index: usize, items: &[SelectionItem]) -> Result<usize> {
    if index < items.len() {
        Ok(index)
    } else {
        Err(HvrError::input(format!(
            "selection {} is out of range (1-{})",
            index + 1,
            items.len()
        )))
    }
}

/// A pre-decided answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Index(usize),
    /// Match an item's key exactly
    Key(String),
}

impl Choice {
    /// Index of the item this answer names
    pub fn resolve(&self, items: &[SelectionItem]) -> Result<usize> {
        match self {
            Choice::Index(index) => checked_index(*index, items),
            Choice::Key(key) => items
                .iter()
                .position(|item| &item.key == key)
                .ok_or_else(|| HvrError::input(format!("'{}' is not one of the choices", key))),
        }
    }
}

/// Answers prompts from a queue; used for flags and tests
#[derive(Debug, Clone, Default)]
pub struct FixedSelector {
    choices: VecDeque<Choice>,
    confirmations: VecDeque<bool>,
    pub prompts: Vec<String>,
}

impl FixedSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_choose(mut self, choice: Choice) -> Self {
        self.choices.push_back(choice);
        self
    }

    pub fn then_confirm(mut self, answer: bool) -> Self {
        self.confirmations.push_back(answer);
        self
    }
}

impl Selector for FixedSelector {
    fn choose(&mut self, prompt: &str, items: &[SelectionItem]) -> Result<usize> {
        self.prompts.push(prompt.to_string());
        match self.choices.pop_front() {
            Some(choice) => choice.resolve(items),
            None => Err(HvrError::input(format!("no answer given for: {}", prompt))),
        }
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        self.prompts.push(prompt.to_string());
        Ok(self.confirmations.pop_front().unwrap_or(false))
    }
}
