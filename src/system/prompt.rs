//! Yes/no confirmation for optional steps

use std::rc::Rc;

use inquire::{Confirm, InquireError};

use crate::error::{Result, StackupError};

/// Asks the operator to confirm an optional step
pub trait Prompter {
    fn confirm(&self, question: &str, default: bool) -> Result<bool>;
}

/// Interactive prompt on the terminal
///
/// Without a terminal on stdin the default answer is used.
pub struct InquirePrompter;

impl Prompter for InquirePrompter {
    fn confirm(&self, question: &str, default: bool) -> Result<bool> {
        match Confirm::new(question)
            .with_default(default)
            .with_help_message("Press Enter for the default, 'y' or 'n' to choose")
            .prompt()
        {
            Ok(answer) => Ok(answer),
            Err(InquireError::NotTTY) => {
                tracing::info!(question, default, "no terminal, using default answer");
                Ok(default)
            }
            Err(InquireError::OperationCanceled) => Ok(false),
            Err(e) => Err(StackupError::IoError {
                message: format!("Failed to read confirmation: {e}"),
            }),
        }
    }
}

/// Answers yes to everything (`--yes`)
pub struct AssumeYes;

impl Prompter for AssumeYes {
    fn confirm(&self, _question: &str, _default: bool) -> Result<bool> {
        Ok(true)
    }
}

/// Takes each step's default answer (`--defaults`)
pub struct AcceptDefaults;

impl Prompter for AcceptDefaults {
    fn confirm(&self, question: &str, default: bool) -> Result<bool> {
        tracing::debug!(question, default, "accepting default answer");
        Ok(default)
    }
}

/// How optional steps are confirmed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnswerMode {
    /// Ask on the terminal
    #[default]
    Interactive,
    AssumeYes,
    Defaults,
}

impl AnswerMode {
    pub fn prompter(self) -> Rc<dyn Prompter> {
        match self {
            AnswerMode::Interactive => Rc::new(InquirePrompter),
            AnswerMode::AssumeYes => Rc::new(AssumeYes),
            AnswerMode::Defaults => Rc::new(AcceptDefaults),
        }
    }
}
