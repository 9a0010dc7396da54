//! Submission status state machine.
//!
//! One authoritative transition table. Every component that flips a status
//! (store implementations, engine) must go through [`SubmissionStatus::can_become`];
//! no call site hand-rolls its own rule.
//!
//! Allowed transitions:
//!
//! | from        | to          | trigger                                  |
//! |-------------|-------------|------------------------------------------|
//! | Received    | Received    | re-link after a new reconcile attempt    |
//! | Received    | CheckFailed | mismatching candidate                    |
//! | Received    | Deployed    | successful publish of a linked pair      |
//! | CheckFailed | Received    | later candidate matched; errors cleared  |
//! | CheckFailed | CheckFailed | repeated mismatch                        |
//!
//! Deployed is terminal. CheckFailed never goes straight to Deployed:
//! linking resets to Received first.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubmissionStatus {
    Received,
    CheckFailed,
    Deployed,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Received => "RECEIVED",
            SubmissionStatus::CheckFailed => "CHECK_FAILED",
            SubmissionStatus::Deployed => "DEPLOYED",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "RECEIVED" => Ok(SubmissionStatus::Received),
            "CHECK_FAILED" => Ok(SubmissionStatus::CheckFailed),
            "DEPLOYED" => Ok(SubmissionStatus::Deployed),
            other => Err(anyhow::anyhow!("invalid submission status: {}", other)),
        }
    }

    /// Whether the transition `self -> to` is legal.
    pub fn can_become(&self, to: SubmissionStatus) -> bool {
        use SubmissionStatus::*;
        matches!(
            (self, to),
            (Received, Received)
                | (Received, CheckFailed)
                | (Received, Deployed)
                | (CheckFailed, Received)
                | (CheckFailed, CheckFailed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        *self == SubmissionStatus::Deployed
    }
}
