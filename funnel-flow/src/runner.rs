//! FunnelRunner – loads a session, applies **one** event, persists the result and carries out
//! the effects the transition asked for.
//!
//! The runner is the only place where the pure [`transition`] meets the outside world:
//! * the new state is saved through the [`SessionStorage`],
//! * the new view goes to the [`Renderer`],
//! * timer events are handed to the [`Scheduler`] and come back through [`FunnelRunner::drive`].
//!
//! Events for one session are applied one at a time, whether they come from a request or from
//! a timer, so the quiz behaves like the single-threaded page it replaces.
//!
//! ## Wiring
//! ```rust,no_run
//! use std::sync::Arc;
//! use funnel_flow::{FunnelRunner, InMemorySessionStorage, Pacing, TracingRenderer};
//!
//! # async fn wire() -> funnel_flow::Result<()> {
//! let (runner, timers) = FunnelRunner::new(
//!     Arc::new(InMemorySessionStorage::new()),
//!     Arc::new(TracingRenderer),
//!     Pacing::default(),
//! );
//! runner.spawn_timer_loop(timers);
//! let (session_id, first_screen) = runner.start().await?;
//! # Ok(())
//! # }
//! ```

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::{
    sync::{Mutex, OwnedMutexGuard, mpsc},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    error::{FunnelError, Result},
    machine::{Effect, Outcome, QuizEvent, transition},
    pacing::Pacing,
    render::Renderer,
    scheduler::{FiredEvent, Scheduler},
    storage::{Session, SessionStorage},
    view::QuizView,
};

/// What a dispatched event did.
#[derive(Debug, Clone, Serialize)]
pub struct Dispatched {
    pub outcome: Outcome,
    pub view: QuizView,
}

#[derive(Clone)]
pub struct FunnelRunner {
    storage: Arc<dyn SessionStorage>,
    renderer: Arc<dyn Renderer>,
    scheduler: Scheduler,
    pacing: Arc<Pacing>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl FunnelRunner {
    /// Create a runner together with the receiving end of its timers. Feed the receiver to
    /// [`FunnelRunner::drive`] (or [`FunnelRunner::spawn_timer_loop`]) or the auto-advancing
    /// screens never move on.
    pub fn new(
        storage: Arc<dyn SessionStorage>,
        renderer: Arc<dyn Renderer>,
        pacing: Pacing,
    ) -> (Self, mpsc::UnboundedReceiver<FiredEvent>) {
        let (scheduler, timers) = Scheduler::new();
        let runner = Self {
            storage,
            renderer,
            scheduler,
            pacing: Arc::new(pacing),
            locks: Arc::new(DashMap::new()),
        };
        (runner, timers)
    }

    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    /// Timers still pending for `session_id`.
    pub fn pending_timers(&self, session_id: &str) -> usize {
        self.scheduler.pending(session_id)
    }

    /// Open a new session on the zip code screen.
    pub async fn start(&self) -> Result<(String, QuizView)> {
        let session = Session::generate();
        let session_id = session.id.clone();
        let view = QuizView::from_state(&session.state);
        self.storage.save(session).await?;

        info!(session_id = %session_id, "Started funnel session");
        self.render(&session_id, &view).await;
        Ok((session_id, view))
    }

    pub async fn view(&self, session_id: &str) -> Result<QuizView> {
        let session = self.load(session_id).await?;
        Ok(QuizView::from_state(&session.state))
    }

    /// Apply one event to the session and carry out its effects.
    pub async fn dispatch(&self, session_id: &str, event: QuizEvent) -> Result<Dispatched> {
        let (_guard, mut session) = self.lock_session(session_id).await?;
        let from = session.state.stage;
        let step = match transition(&session.state, &event, &self.pacing) {
            Ok(step) => step,
            Err(e) => {
                warn!(
                    session_id = %session_id,
                    event = event.name(),
                    stage = %from,
                    error = %e,
                    "Rejected event"
                );
                return Err(e);
            }
        };

        if step.outcome == Outcome::Ignored {
            debug!(
                session_id = %session_id,
                event = event.name(),
                stage = %from,
                "Event had no effect"
            );
            return Ok(Dispatched {
                outcome: Outcome::Ignored,
                view: QuizView::from_state(&session.state),
            });
        }

        session.state = step.state;
        session.touch();
        let view = QuizView::from_state(&session.state);
        self.storage.save(session).await?;

        if from != view.stage {
            info!(
                session_id = %session_id,
                event = event.name(),
                from = %from,
                to = %view.stage,
                "Stage changed"
            );
        } else {
            debug!(session_id = %session_id, event = event.name(), stage = %from, "Applied event");
        }

        self.apply_effects(session_id, &view, step.effects).await;
        Ok(Dispatched {
            outcome: Outcome::Applied,
            view,
        })
    }

    /// Drop pending timers and start the quiz over in the same session.
    pub async fn reset(&self, session_id: &str) -> Result<QuizView> {
        let (_guard, mut session) = self.lock_session(session_id).await?;
        let cancelled = self.scheduler.cancel(session_id);
        session.state = session.state.reset();
        session.touch();
        let view = QuizView::from_state(&session.state);
        self.storage.save(session).await?;

        info!(session_id = %session_id, cancelled_timers = cancelled, "Reset funnel session");
        self.render(session_id, &view).await;
        Ok(view)
    }

    /// Drop pending timers and forget the session.
    pub async fn end(&self, session_id: &str) -> Result<()> {
        {
            let (_guard, _) = self.lock_session(session_id).await?;
            let cancelled = self.scheduler.cancel(session_id);
            self.storage.delete(session_id).await?;
            info!(session_id = %session_id, cancelled_timers = cancelled, "Ended funnel session");
        }
        self.locks.remove(session_id);
        Ok(())
    }

    /// Dispatch fired timer events until every sender is gone.
    pub async fn drive(&self, mut timers: mpsc::UnboundedReceiver<FiredEvent>) {
        while let Some(FiredEvent { session_id, event }) = timers.recv().await {
            match self.dispatch(&session_id, event).await {
                Ok(_) => {}
                Err(FunnelError::SessionNotFound(_)) => {
                    debug!(session_id = %session_id, "Timer fired for a closed session");
                }
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "Timer event failed");
                }
            }
        }
        debug!("Timer loop finished");
    }

    pub fn spawn_timer_loop(&self, timers: mpsc::UnboundedReceiver<FiredEvent>) -> JoinHandle<()> {
        let runner = self.clone();
        tokio::spawn(async move { runner.drive(timers).await })
    }

    async fn load(&self, session_id: &str) -> Result<Session> {
        self.storage
            .get(session_id)
            .await?
            .ok_or_else(|| FunnelError::SessionNotFound(session_id.to_string()))
    }

    /// Take the session's lock and load it. The lock entry is only kept for
    /// sessions that exist.
    async fn lock_session(&self, session_id: &str) -> Result<(OwnedMutexGuard<()>, Session)> {
        let lock = self
            .locks
            .entry(session_id.to_string())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;
        match self.load(session_id).await {
            Ok(session) => Ok((guard, session)),
            Err(e) => {
                drop(guard);
                self.locks
                    .remove_if(session_id, |_, lock| Arc::strong_count(lock) == 1);
                Err(e)
            }
        }
    }

    async fn apply_effects(&self, session_id: &str, view: &QuizView, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Render => self.render(session_id, view).await,
                Effect::Schedule { delay, event } => {
                    self.scheduler.schedule(session_id, delay, event);
                }
            }
        }
    }

    async fn render(&self, session_id: &str, view: &QuizView) {
        if let Err(e) = self.renderer.render(session_id, view).await {
            warn!(session_id = %session_id, error = %e, "Failed to render screen");
        }
    }
}
