use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FunnelError;

/// Number of lenders the lender-count screen counts up to.
pub const LENDERS_FOUND: u32 = 12;

/// The eight quiz screens, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizStep {
    ZipEntry,
    Searching,
    LendersFound,
    PropertyValue,
    MortgageBalance,
    CreditTier,
    FinalLoading,
    GoalChoice,
}

impl QuizStep {
    pub const ALL: [QuizStep; 8] = [
        QuizStep::ZipEntry,
        QuizStep::Searching,
        QuizStep::LendersFound,
        QuizStep::PropertyValue,
        QuizStep::MortgageBalance,
        QuizStep::CreditTier,
        QuizStep::FinalLoading,
        QuizStep::GoalChoice,
    ];

    /// 1-based screen number.
    pub fn number(self) -> u8 {
        match self {
            QuizStep::ZipEntry => 1,
            QuizStep::Searching => 2,
            QuizStep::LendersFound => 3,
            QuizStep::PropertyValue => 4,
            QuizStep::MortgageBalance => 5,
            QuizStep::CreditTier => 6,
            QuizStep::FinalLoading => 7,
            QuizStep::GoalChoice => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            QuizStep::ZipEntry => "zip_entry",
            QuizStep::Searching => "searching",
            QuizStep::LendersFound => "lenders_found",
            QuizStep::PropertyValue => "property_value",
            QuizStep::MortgageBalance => "mortgage_balance",
            QuizStep::CreditTier => "credit_tier",
            QuizStep::FinalLoading => "final_loading",
            QuizStep::GoalChoice => "goal_choice",
        }
    }

    /// Target of the back button. Animation screens and the first screen have none.
    pub fn previous(self) -> Option<QuizStep> {
        match self {
            QuizStep::PropertyValue => Some(QuizStep::ZipEntry),
            QuizStep::MortgageBalance => Some(QuizStep::PropertyValue),
            QuizStep::CreditTier => Some(QuizStep::MortgageBalance),
            QuizStep::GoalChoice => Some(QuizStep::CreditTier),
            QuizStep::ZipEntry
            | QuizStep::Searching
            | QuizStep::LendersFound
            | QuizStep::FinalLoading => None,
        }
    }

    pub fn next(self) -> Option<QuizStep> {
        QuizStep::try_from(self.number() + 1).ok()
    }

    pub fn progress_percent(self) -> u8 {
        match self {
            QuizStep::ZipEntry => 0,
            QuizStep::Searching => 12,
            QuizStep::LendersFound => 25,
            QuizStep::PropertyValue => 40,
            QuizStep::MortgageBalance => 55,
            QuizStep::CreditTier => 70,
            QuizStep::FinalLoading => 85,
            QuizStep::GoalChoice => 100,
        }
    }
}

impl TryFrom<u8> for QuizStep {
    type Error = FunnelError;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        QuizStep::ALL
            .into_iter()
            .find(|step| step.number() == number)
            .ok_or(FunnelError::InvalidStep(number))
    }
}

/// Where a session is: on one of the quiz screens, behind the results loading
/// overlay, or on the unlocked results page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "step", rename_all = "snake_case")]
pub enum Stage {
    Quiz(QuizStep),
    Unlocking,
    Results,
}

impl Stage {
    pub fn step(self) -> Option<QuizStep> {
        match self {
            Stage::Quiz(step) => Some(step),
            Stage::Unlocking | Stage::Results => None,
        }
    }

    /// Stage reached when the current one auto-advances or its choice is confirmed.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Quiz(QuizStep::GoalChoice) => Some(Stage::Unlocking),
            Stage::Quiz(step) => step.next().map(Stage::Quiz),
            Stage::Unlocking => Some(Stage::Results),
            Stage::Results => None,
        }
    }

    pub fn previous(self) -> Option<QuizStep> {
        self.step().and_then(QuizStep::previous)
    }

    pub fn can_go_back(self) -> bool {
        self.previous().is_some()
    }

    pub fn progress_percent(self) -> u8 {
        self.step().map_or(100, QuizStep::progress_percent)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Quiz(step) => write!(f, "step {} ({})", step.number(), step.name()),
            Stage::Unlocking => f.write_str("unlocking"),
            Stage::Results => f.write_str("results"),
        }
    }
}
