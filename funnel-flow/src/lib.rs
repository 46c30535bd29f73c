pub mod answers;
pub mod error;
pub mod estimator;
pub mod machine;
pub mod pacing;
pub mod render;
pub mod runner;
pub mod scheduler;
pub mod slider;
pub mod step;
pub mod storage;
pub mod view;

// Re-export commonly used types
pub use answers::{Answers, CreditTier, Goal, MortgageBalance, PropertyValue, ZipCode};
pub use error::{FunnelError, Result};
pub use estimator::{MAX_CASH, estimate, format_usd};
pub use machine::{Effect, Outcome, QuizEvent, QuizState, TimerKind, Transition, transition};
pub use pacing::Pacing;
pub use render::{RecordingRenderer, Renderer, TracingRenderer};
pub use runner::{Dispatched, FunnelRunner};
pub use scheduler::{FiredEvent, Scheduler};
pub use step::{QuizStep, Stage};
pub use storage::{InMemorySessionStorage, Session, SessionStorage};
pub use view::QuizView;
