//! Repair state machine.
//!
//! ```text
//! AwaitingResponse --ResponseReceived--> Extracting
//! Extracting --CodeMissing--> CodeAbsent
//! Extracting --StaticIssues--> StaticInvalid
//! Extracting --StaticClean--> StaticValid
//! StaticValid --EntryPointMissing--> EntryMissing
//! StaticValid --EntryPointFound--> Testing
//! Testing --TestsPassed--> Passed
//! Testing --TestsFailed--> RuntimeFailed
//! {CodeAbsent, StaticInvalid, EntryMissing, RuntimeFailed} --Continue--> Reprompting | Exhausted
//! Reprompting --ResponseReceived--> Extracting
//! ```
//!
//! `Continue` leads to `Reprompting` only while the attempt ordinal is within
//! the reprompt budget, so every path reaches `Passed` or `Exhausted` after at
//! most `max_reprompts + 1` attempts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FixloopError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepairState {
    AwaitingResponse,
    Extracting,
    CodeAbsent,
    StaticInvalid,
    StaticValid,
    EntryMissing,
    Testing,
    Passed,
    RuntimeFailed,
    Reprompting,
    Exhausted,
}

impl RepairState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Exhausted)
    }

    /// States that end an attempt with a problem to report.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::CodeAbsent | Self::StaticInvalid | Self::EntryMissing | Self::RuntimeFailed
        )
    }
}

impl fmt::Display for RepairState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepairEvent {
    ResponseReceived,
    CodeMissing,
    StaticIssues,
    StaticClean,
    EntryPointMissing,
    EntryPointFound,
    TestsPassed,
    TestsFailed,
    Continue,
}

impl fmt::Display for RepairEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Where the loop stands against its reprompt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptBudget {
    /// Current attempt ordinal, 1-based.
    pub attempt: u32,
    pub max_reprompts: u32,
}

impl AttemptBudget {
    pub fn new(attempt: u32, max_reprompts: u32) -> Self {
        Self {
            attempt,
            max_reprompts,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_reprompts.saturating_add(1)
    }

    pub fn can_reprompt(&self) -> bool {
        self.attempt <= self.max_reprompts
    }
}

/// Pure transition function.
pub fn transition(
    state: RepairState,
    event: RepairEvent,
    budget: AttemptBudget,
) -> Result<RepairState> {
    use RepairEvent as E;
    use RepairState as S;

    let next = match (state, event) {
        (S::AwaitingResponse | S::Reprompting, E::ResponseReceived) => S::Extracting,
        (S::Extracting, E::CodeMissing) => S::CodeAbsent,
        (S::Extracting, E::StaticIssues) => S::StaticInvalid,
        (S::Extracting, E::StaticClean) => S::StaticValid,
        (S::StaticValid, E::EntryPointMissing) => S::EntryMissing,
        (S::StaticValid, E::EntryPointFound) => S::Testing,
        (S::Testing, E::TestsPassed) => S::Passed,
        (S::Testing, E::TestsFailed) => S::RuntimeFailed,
        (s, E::Continue) if s.is_failure() => {
            if budget.can_reprompt() {
                S::Reprompting
            } else {
                S::Exhausted
            }
        }
        (state, event) => {
            return Err(FixloopError::InvalidTransition {
                state: state.to_string(),
                event: event.to_string(),
            })
        }
    };
    Ok(next)
}
