//! Interactive questions, behind a trait so handlers can be tested with
//! scripted answers.

use anyhow::Result;
use dialoguer::Confirm;
use dialoguer::Input;
use dialoguer::MultiSelect;
use dialoguer::Password;
use dialoguer::Select;
#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
pub trait Prompter {
    fn confirm(&self, message: &str, default: bool) -> Result<bool>;

    /// Free text; may be empty.
    fn input(&self, message: &str) -> Result<String>;

    /// Hidden input, for tokens.
    fn password(&self, message: &str) -> Result<String>;

    /// Pick one item. `None` if the user cancelled (Esc/q).
    fn select(&self, message: &str, items: &[String]) -> Result<Option<usize>>;

    /// Pick any number of items, returned as indices.
    fn multi_select(&self, message: &str, items: &[String]) -> Result<Vec<usize>>;
}

/// Prompts on the controlling terminal.
#[derive(Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        Ok(Confirm::new()
            .with_prompt(message)
            .default(default)
            .interact()?)
    }

    fn input(&self, message: &str) -> Result<String> {
        Ok(Input::<String>::new()
            .with_prompt(message)
            .allow_empty(true)
            .interact_text()?)
    }

    fn password(&self, message: &str) -> Result<String> {
        Ok(Password::new().with_prompt(message).interact()?)
    }

    fn select(&self, message: &str, items: &[String]) -> Result<Option<usize>> {
        Ok(Select::new()
            .with_prompt(message)
            .items(items)
            .default(0)
            .interact_opt()?)
    }

    fn multi_select(&self, message: &str, items: &[String]) -> Result<Vec<usize>> {
        Ok(MultiSelect::new()
            .with_prompt(message)
            .items(items)
            .interact()?)
    }
}
