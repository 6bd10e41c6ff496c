//! User decision gates
//!
//! Every point where the run waits for the user goes through
//! [`DecisionProvider::confirm`]. The console implementation asks with
//! `inquire`; `--yes` answers every gate with yes, and tests script the
//! answers.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

use inquire::Confirm;
use tracing::debug;

use crate::domain::{BuildVersion, FeatureUpdate};
use crate::error::Result;

/// A point in the run that needs the user's consent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Look for updates on the server
    Search,
    /// Download the packages of a build
    Download { build: BuildVersion },
    /// Install the downloaded packages
    Install { build: BuildVersion },
    /// Install the Enablement Package to the given feature update
    EnablementPackage { target: FeatureUpdate },
    /// Delete the downloaded packages that were installed
    Cleanup,
    /// Restart now
    Reboot,
}

impl Gate {
    /// Question shown to the user
    pub fn question(&self) -> String {
        match self {
            Gate::Search => "Search for updates?".to_string(),
            Gate::Download { build } => format!("Download update {build}?"),
            Gate::Install { build } => format!("Install update {build}?"),
            Gate::EnablementPackage { target } => {
                format!("Install the Enablement Package to upgrade to {target}?")
            }
            Gate::Cleanup => "Delete the installed update files?".to_string(),
            Gate::Reboot => "Restart now to finish the installation?".to_string(),
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Gate::Search => "search",
            Gate::Download { .. } => "download",
            Gate::Install { .. } => "install",
            Gate::EnablementPackage { .. } => "enablement-package",
            Gate::Cleanup => "cleanup",
            Gate::Reboot => "reboot",
        };
        f.write_str(name)
    }
}

/// Answers decision gates
pub trait DecisionProvider {
    fn confirm(&self, gate: Gate) -> Result<bool>;
}

/// Asks on the console
#[derive(Debug, Default, Clone, Copy)]
pub struct InteractiveDecisions;

impl DecisionProvider for InteractiveDecisions {
    fn confirm(&self, gate: Gate) -> Result<bool> {
        let answer = Confirm::new(&gate.question())
            .with_default(false)
            .with_help_message("Type 'y' to continue, or press Enter to stop")
            .prompt()?;
        debug!(%gate, answer, "gate answered");
        Ok(answer)
    }
}

/// Answers yes to every gate (`--yes`)
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl DecisionProvider for AssumeYes {
    fn confirm(&self, gate: Gate) -> Result<bool> {
        debug!(%gate, "gate accepted automatically");
        Ok(true)
    }
}

/// Answers from a script; records every gate asked
#[derive(Debug, Default)]
pub struct ScriptedDecisions {
    answers: Mutex<VecDeque<(Gate, bool)>>,
    default: bool,
    asked: Mutex<Vec<Gate>>,
}

impl ScriptedDecisions {
    /// Answer every gate with `default` unless scripted otherwise
    pub fn answering(default: bool) -> Self {
        Self {
            default,
            ..Self::default()
        }
    }

    /// Answer gates matching `gate`'s kind with `answer`, once each call
    #[must_use]
    pub fn with(self, gate: Gate, answer: bool) -> Self {
        if let Ok(mut answers) = self.answers.lock() {
            answers.push_back((gate, answer));
        }
        self
    }

    /// Gates asked so far, in order
    pub fn asked(&self) -> Vec<Gate> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn was_asked(&self, predicate: impl Fn(&Gate) -> bool) -> bool {
        self.asked().iter().any(predicate)
    }
}

impl DecisionProvider for ScriptedDecisions {
    fn confirm(&self, gate: Gate) -> Result<bool> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(gate);
        }
        let mut answers = match self.answers.lock() {
            Ok(answers) => answers,
            Err(poisoned) => poisoned.into_inner(),
        };
        let scripted = answers
            .iter()
            .position(|(g, _)| std::mem::discriminant(g) == std::mem::discriminant(&gate));
        Ok(match scripted {
            Some(index) => answers.remove(index).map_or(self.default, |(_, a)| a),
            None => self.default,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_questions_name_build_and_target() {
        let build = BuildVersion::new(26100, 1742);
        assert!(Gate::Download { build }.question().contains("26100.1742"));
        assert!(
            Gate::EnablementPackage {
                target: FeatureUpdate::V25H2
            }
            .question()
            .contains("25H2")
        );
    }

    #[test]
    fn test_assume_yes() {
        assert!(AssumeYes.confirm(Gate::Reboot).unwrap());
    }

    #[test]
    fn test_scripted_answers_by_gate_kind() {
        let decisions = ScriptedDecisions::answering(true).with(Gate::Cleanup, false);

        assert!(decisions.confirm(Gate::Search).unwrap());
        assert!(!decisions.confirm(Gate::Cleanup).unwrap());
        assert!(decisions.confirm(Gate::Cleanup).unwrap());
        assert_eq!(decisions.asked().len(), 3);
        assert!(decisions.was_asked(|g| matches!(g, Gate::Search)));
        assert!(!decisions.was_asked(|g| matches!(g, Gate::Reboot)));
    }
}
