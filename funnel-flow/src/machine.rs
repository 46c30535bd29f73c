//! Quiz state and its pure transition function.
//!
//! `transition` never sleeps, renders or touches storage. It returns the next
//! state together with the effects the caller has to carry out: render the new
//! view, and schedule timer events for the auto-advancing screens.
//!
//! Timer events carry the `epoch` they were scheduled in. The epoch moves on
//! every stage change and on reset, so a timer that outlived its screen (the
//! user went back, or the session was reset) is ignored instead of pushing the
//! quiz forward.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    answers::{Answers, CreditTier, Goal, MortgageBalance, PropertyValue, ZipCode},
    error::{FunnelError, Result},
    pacing::{CHECKLIST_LEN, Pacing, millis},
    step::{QuizStep, Stage},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerKind {
    /// Move to the next stage.
    Advance,
    /// Mark a checklist item on an animation screen as complete.
    Tick { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuizEvent {
    ZipInput {
        raw: String,
    },
    SubmitZip,
    SelectPropertyValue {
        value: PropertyValue,
    },
    SliderMoved {
        balance: MortgageBalance,
    },
    /// Confirms the mortgage balance. Falls back to the slider position when
    /// no balance is given.
    SubmitMortgage {
        #[serde(default)]
        balance: Option<MortgageBalance>,
    },
    SelectCredit {
        tier: CreditTier,
    },
    SelectGoal {
        goal: Goal,
    },
    GoBack,
    Timer {
        epoch: u64,
        kind: TimerKind,
    },
}

impl QuizEvent {
    pub fn name(&self) -> &'static str {
        match self {
            QuizEvent::ZipInput { .. } => "zip_input",
            QuizEvent::SubmitZip => "submit_zip",
            QuizEvent::SelectPropertyValue { .. } => "select_property_value",
            QuizEvent::SliderMoved { .. } => "slider_moved",
            QuizEvent::SubmitMortgage { .. } => "submit_mortgage",
            QuizEvent::SelectCredit { .. } => "select_credit",
            QuizEvent::SelectGoal { .. } => "select_goal",
            QuizEvent::GoBack => "go_back",
            QuizEvent::Timer { .. } => "timer",
        }
    }

    pub fn is_timer(&self) -> bool {
        matches!(self, QuizEvent::Timer { .. })
    }
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Show the view of the new state.
    Render,
    /// Deliver `event` back to the machine after `delay`.
    Schedule { delay: Duration, event: QuizEvent },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    /// The event was valid but had nothing to do (stale timer, no back target,
    /// incomplete zip submit). State and effects are untouched.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub state: QuizState,
    pub outcome: Outcome,
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizState {
    pub stage: Stage,
    pub answers: Answers,
    /// Live mortgage slider position, before it is submitted.
    pub slider: MortgageBalance,
    /// Completed checklist items on the current animation screen.
    pub checklist: usize,
    pub epoch: u64,
}

impl Default for QuizState {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizState {
    pub fn new() -> Self {
        Self {
            stage: Stage::Quiz(QuizStep::ZipEntry),
            answers: Answers::default(),
            slider: MortgageBalance::default(),
            checklist: 0,
            epoch: 0,
        }
    }

    /// A fresh quiz whose epoch is past every timer scheduled so far.
    pub fn reset(&self) -> Self {
        Self {
            epoch: self.epoch + 1,
            ..Self::new()
        }
    }

    pub fn calculated_cash(&self) -> Option<u64> {
        self.answers.calculated_cash()
    }

    fn enter(&mut self, stage: Stage, pacing: &Pacing, effects: &mut Vec<Effect>) {
        self.stage = stage;
        self.epoch += 1;
        self.checklist = 0;

        if let Stage::Quiz(QuizStep::MortgageBalance) = stage {
            if let Some(balance) = self.answers.mortgage_balance {
                self.slider = balance;
            }
        }

        match stage {
            Stage::Quiz(QuizStep::Searching) => {
                self.schedule_ticks(pacing.search_ticks_ms, effects);
                self.schedule(pacing.search_done_ms, TimerKind::Advance, effects);
            }
            Stage::Quiz(QuizStep::LendersFound) => {
                self.schedule(pacing.lenders_reveal_ms, TimerKind::Advance, effects);
            }
            Stage::Quiz(QuizStep::FinalLoading) => {
                self.schedule_ticks(pacing.loading_ticks_ms, effects);
                self.schedule(pacing.loading_done_ms, TimerKind::Advance, effects);
            }
            Stage::Unlocking => {
                self.schedule(pacing.results_loading_ms, TimerKind::Advance, effects);
            }
            _ => {}
        }
    }

    fn schedule(&self, delay_ms: u64, kind: TimerKind, effects: &mut Vec<Effect>) {
        effects.push(Effect::Schedule {
            delay: millis(delay_ms),
            event: QuizEvent::Timer {
                epoch: self.epoch,
                kind,
            },
        });
    }

    fn schedule_ticks(&self, ticks_ms: [u64; CHECKLIST_LEN], effects: &mut Vec<Effect>) {
        for (index, delay_ms) in ticks_ms.into_iter().enumerate() {
            self.schedule(delay_ms, TimerKind::Tick { index }, effects);
        }
    }

    fn on_timer(&mut self, kind: TimerKind, pacing: &Pacing, effects: &mut Vec<Effect>) -> Outcome {
        match kind {
            TimerKind::Advance => match self.stage.next() {
                Some(next) => {
                    self.enter(next, pacing, effects);
                    Outcome::Applied
                }
                None => Outcome::Ignored,
            },
            TimerKind::Tick { index } => {
                let has_checklist = matches!(
                    self.stage,
                    Stage::Quiz(QuizStep::Searching | QuizStep::FinalLoading)
                );
                if has_checklist && index < CHECKLIST_LEN {
                    self.checklist = self.checklist.max(index + 1);
                    Outcome::Applied
                } else {
                    Outcome::Ignored
                }
            }
        }
    }
}

/// Apply `event` to `state`.
///
/// A user event that the current screen does not offer is an error and leaves
/// the caller's state as it was.
pub fn transition(state: &QuizState, event: &QuizEvent, pacing: &Pacing) -> Result<Transition> {
    let mut next = state.clone();
    let mut effects = Vec::new();

    let outcome = match (state.stage, event) {
        (_, QuizEvent::Timer { epoch, kind }) => {
            if *epoch == state.epoch {
                next.on_timer(*kind, pacing, &mut effects)
            } else {
                Outcome::Ignored
            }
        }
        (stage, QuizEvent::GoBack) => match stage.previous() {
            Some(step) => {
                next.enter(Stage::Quiz(step), pacing, &mut effects);
                Outcome::Applied
            }
            None => Outcome::Ignored,
        },
        (Stage::Quiz(QuizStep::ZipEntry), QuizEvent::ZipInput { raw }) => {
            next.answers.zip_code = ZipCode::sanitize(raw);
            Outcome::Applied
        }
        (Stage::Quiz(QuizStep::ZipEntry), QuizEvent::SubmitZip) => {
            if state.answers.zip_code.is_complete() {
                next.enter(Stage::Quiz(QuizStep::Searching), pacing, &mut effects);
                Outcome::Applied
            } else {
                Outcome::Ignored
            }
        }
        (Stage::Quiz(QuizStep::PropertyValue), QuizEvent::SelectPropertyValue { value }) => {
            next.answers.property_value = Some(*value);
            next.schedule(pacing.option_select_ms, TimerKind::Advance, &mut effects);
            Outcome::Applied
        }
        (Stage::Quiz(QuizStep::MortgageBalance), QuizEvent::SliderMoved { balance }) => {
            next.slider = *balance;
            Outcome::Applied
        }
        (Stage::Quiz(QuizStep::MortgageBalance), QuizEvent::SubmitMortgage { balance }) => {
            let balance = balance.unwrap_or(state.slider);
            next.slider = balance;
            next.answers.mortgage_balance = Some(balance);
            next.enter(Stage::Quiz(QuizStep::CreditTier), pacing, &mut effects);
            Outcome::Applied
        }
        (Stage::Quiz(QuizStep::CreditTier), QuizEvent::SelectCredit { tier }) => {
            next.answers.credit = Some(*tier);
            next.schedule(pacing.option_select_ms, TimerKind::Advance, &mut effects);
            Outcome::Applied
        }
        (Stage::Quiz(QuizStep::GoalChoice), QuizEvent::SelectGoal { goal }) => {
            next.answers.goal = Some(*goal);
            next.schedule(pacing.goal_select_ms, TimerKind::Advance, &mut effects);
            Outcome::Applied
        }
        (stage, event) => {
            return Err(FunnelError::EventNotAllowed {
                event: event.name(),
                stage,
            });
        }
    };

    match outcome {
        Outcome::Applied => effects.insert(0, Effect::Render),
        Outcome::Ignored => {
            next = state.clone();
            effects.clear();
        }
    }

    Ok(Transition {
        state: next,
        outcome,
        effects,
    })
}
