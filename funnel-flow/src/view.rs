use serde::Serialize;

use crate::{
    answers::{CreditTier, Goal},
    estimator::{COUNT_UP_DURATION, COUNT_UP_FRAMES, count_up_frames, format_usd},
    machine::QuizState,
    pacing::CHECKLIST_LEN,
    slider::SliderFeedback,
    step::{LENDERS_FOUND, QuizStep, Stage},
};

/// Lender cards on the results page. Each one shows the same estimate.
pub const LENDER_CARDS: [&str; 3] = ["quicken", "unlock", "hometap"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Checklist {
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountUp {
    pub frame_interval_ms: u64,
    pub frames: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashDisplay {
    pub amount: u64,
    pub formatted: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count_up: Option<CountUp>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LenderCard {
    pub lender: &'static str,
    pub cash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsView {
    /// True while the loading overlay still hides the results.
    pub loading: bool,
    pub lender_cards: Vec<LenderCard>,
}

/// Everything the presentation layer needs to draw the current screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizView {
    pub stage: Stage,
    pub step: Option<u8>,
    pub progress_percent: u8,
    pub can_go_back: bool,
    pub zip_code: String,
    pub zip_submit_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checklist: Option<Checklist>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lenders_found: Option<u32>,
    pub property_value: Option<u64>,
    pub mortgage_balance: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slider: Option<SliderFeedback>,
    pub credit: Option<CreditTier>,
    pub goal: Option<Goal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash: Option<CashDisplay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<ResultsView>,
}

impl QuizView {
    pub fn from_state(state: &QuizState) -> Self {
        let answers = &state.answers;
        let step = state.stage.step();

        let checklist = match step {
            Some(QuizStep::Searching | QuizStep::FinalLoading) => Some(Checklist {
                completed: state.checklist,
                total: CHECKLIST_LEN,
            }),
            _ => None,
        };

        let cash = state.calculated_cash().map(|amount| CashDisplay {
            amount,
            formatted: format_usd(amount),
            count_up: (step == Some(QuizStep::GoalChoice)).then(|| CountUp {
                frame_interval_ms: COUNT_UP_DURATION.as_millis() as u64 / COUNT_UP_FRAMES,
                frames: count_up_frames(amount),
            }),
        });

        let results = match state.stage {
            Stage::Unlocking | Stage::Results => {
                let formatted = format_usd(state.calculated_cash().unwrap_or_default());
                Some(ResultsView {
                    loading: state.stage == Stage::Unlocking,
                    lender_cards: LENDER_CARDS
                        .into_iter()
                        .map(|lender| LenderCard {
                            lender,
                            cash: formatted.clone(),
                        })
                        .collect(),
                })
            }
            Stage::Quiz(_) => None,
        };

        Self {
            stage: state.stage,
            step: step.map(QuizStep::number),
            progress_percent: state.stage.progress_percent(),
            can_go_back: state.stage.can_go_back(),
            zip_code: answers.zip_code.as_str().to_string(),
            zip_submit_enabled: answers.zip_code.is_complete(),
            checklist,
            lenders_found: (step == Some(QuizStep::LendersFound)).then_some(LENDERS_FOUND),
            property_value: answers.property_value.map(|value| value.amount()),
            mortgage_balance: answers.mortgage_balance.map(|balance| balance.amount()),
            slider: (step == Some(QuizStep::MortgageBalance))
                .then(|| SliderFeedback::for_balance(state.slider)),
            credit: answers.credit,
            goal: answers.goal,
            cash,
            results,
        }
    }
}
