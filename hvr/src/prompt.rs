// Interactive prompts on the operator's terminal

use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password, Select};
use hvr_core::error::{HvrError, Result};
use hvr_restore::{checked_index, Choice, SelectionItem, Selector};
use std::collections::VecDeque;
use std::env;
use tracing::debug;

pub const PASSWORD_ENV: &str = "HVR_STORAGE_PASSWORD";

fn prompt_error(e: dialoguer::Error) -> HvrError {
    HvrError::input(format!("Failed to read selection: {}", e))
}

/// Answers selection prompts with arrow-key menus
#[derive(Default)]
pub struct DialoguerSelector {
    theme: ColorfulTheme,
}

impl DialoguerSelector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Selector for DialoguerSelector {
    fn choose(&mut self, prompt: &str, items: &[SelectionItem]) -> Result<usize> {
        let labels: Vec<&str> = items.iter().map(|item| item.label.as_str()).collect();
        let index = Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(&labels)
            .default(0)
            .interact()
            .map_err(prompt_error)?;
        checked_index(index, items)
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(prompt_error)
    }
}

/// `HVR_STORAGE_PASSWORD`, or a hidden prompt
pub fn storage_password(prompt: &str) -> Result<String> {
    if let Ok(password) = env::var(PASSWORD_ENV) {
        if !password.is_empty() {
            return Ok(password);
        }
    }
    Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(|e| HvrError::input(format!("Failed to read storage password: {}", e)))
}

/// Free-text storage volume name, pre-filled with `default` when known
pub fn volume_name(prompt: &str, default: Option<&str>) -> Result<String> {
    let theme = ColorfulTheme::default();
    let mut input = Input::<String>::with_theme(&theme).with_prompt(prompt);
    if let Some(default) = default {
        input = input.default(default.to_string());
    }
    let volume = input
        .interact_text()
        .map_err(|e| HvrError::input(format!("Failed to read volume name: {}", e)))?;
    Ok(volume.trim().to_string())
}

/// Answers from command-line flags where given, interactive prompts for the rest.
///
/// Presets are consumed in prompt order; `None` means ask.
pub struct PresetSelector {
    presets: VecDeque<Option<Choice>>,
    interactive: DialoguerSelector,
}

impl PresetSelector {
    pub fn new(presets: impl IntoIterator<Item = Option<Choice>>) -> Self {
        Self {
            presets: presets.into_iter().collect(),
            interactive: DialoguerSelector::new(),
        }
    }
}

impl Selector for PresetSelector {
    fn choose(&mut self, prompt: &str, items: &[SelectionItem]) -> Result<usize> {
        match self.presets.pop_front().flatten() {
            Some(choice) => {
                let index = choice.resolve(items)?;
                debug!(prompt = %prompt, choice = %items[index].key, "answered from flags");
                Ok(index)
            }
            None => self.interactive.choose(prompt, items),
        }
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        self.interactive.confirm(prompt)
    }
}
