//! Confirmation gate for destructive operations.
//!
//! The required interaction depends only on the [`SafetyTier`]; deciding it is
//! pure ([`confirmation_for`]) and carrying it out goes through a [`Prompter`].

use std::fmt;
use std::io;

use anyhow::Result;
use tracing::debug;

use crate::prompt::Prompter;
use crate::ui;

/// How destructive an operation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SafetyTier {
    /// Reversible without loss.
    Low,
    /// Changes local history or removes a local ref.
    Medium,
    /// Discards local commits or working tree changes.
    High,
    /// Rewrites state shared with other people.
    Extreme,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Proceed,
    YesNo {
        question: String,
    },
    Warning {
        consequence: String,
        question: String,
    },
    /// The user must type `target` exactly.
    TypeTarget {
        consequence: String,
        target: String,
    },
}

impl fmt::Display for SafetyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Extreme => "extreme",
        };
        write!(f, "{name}")
    }
}

/// The interaction required before running an operation of `tier`.
///
/// `question` is the yes/no question; `target` is what the user must type
/// for [`SafetyTier::Extreme`].
pub fn confirmation_for(tier: SafetyTier, question: &str, target: &str) -> Confirmation {
    match tier {
        SafetyTier::Low => Confirmation::Proceed,
        SafetyTier::Medium => Confirmation::YesNo {
            question: question.to_string(),
        },
        SafetyTier::High => Confirmation::Warning {
            consequence: "This discards commits and uncommitted changes in your working tree."
                .to_string(),
            question: question.to_string(),
        },
        SafetyTier::Extreme => Confirmation::TypeTarget {
            consequence: format!(
                "This rewrites '{target}' on the remote. Anyone who fetched it will have diverging history."
            ),
            target: target.to_string(),
        },
    }
}

/// Ask for confirmation. Returns whether the operation may proceed.
pub fn confirm(
    prompter: &impl Prompter,
    tier: SafetyTier,
    question: &str,
    target: &str,
    stdout: &mut impl io::Write,
) -> Result<bool> {
    let approved = match confirmation_for(tier, question, target) {
        Confirmation::Proceed => true,
        Confirmation::YesNo { question } => prompter.confirm(&question, false)?,
        Confirmation::Warning {
            consequence,
            question,
        } => {
            ui::warning(stdout, consequence)?;
            prompter.confirm(&question, false)?
        }
        Confirmation::TypeTarget {
            consequence,
            target,
        } => {
            ui::warning(stdout, consequence)?;
            let typed = prompter.input(&format!("Type '{target}' to confirm"))?;
            typed == target
        }
    };

    debug!(%tier, approved, "Confirmation");
    Ok(approved)
}
