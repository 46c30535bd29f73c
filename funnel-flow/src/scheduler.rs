//! Fire-once delayed events on the tokio runtime.
//!
//! Each scheduled job sleeps for its delay and then hands `(session_id, event)`
//! to the receiver returned by [`Scheduler::new`]. Jobs are tracked per session
//! so a reset or a closed session can drop everything still pending.

use dashmap::DashMap;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::{sync::mpsc, task::AbortHandle};
use tracing::{debug, warn};

use crate::machine::QuizEvent;

/// A scheduled event whose delay has elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredEvent {
    pub session_id: String,
    pub event: QuizEvent,
}

pub type JobId = u64;

#[derive(Clone)]
pub struct Scheduler {
    jobs: Arc<DashMap<String, HashMap<JobId, AbortHandle>>>,
    next_job_id: Arc<AtomicU64>,
    tx: mpsc::UnboundedSender<FiredEvent>,
}

impl Scheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FiredEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            jobs: Arc::new(DashMap::new()),
            next_job_id: Arc::new(AtomicU64::new(1)),
            tx,
        };
        (scheduler, rx)
    }

    /// Deliver `event` for `session_id` after `delay`. Must be called from
    /// within a tokio runtime.
    pub fn schedule(&self, session_id: &str, delay: Duration, event: QuizEvent) -> JobId {
        let job_id = self.next_job_id.fetch_add(1, Ordering::Relaxed);
        let fired = FiredEvent {
            session_id: session_id.to_string(),
            event,
        };

        // Hold the session's entry while spawning so the job cannot finish and
        // deregister before it has been registered.
        let mut session_jobs = self.jobs.entry(session_id.to_string()).or_default();
        let jobs = self.jobs.clone();
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            forget(&jobs, &fired.session_id, job_id);
            let session_id = fired.session_id.clone();
            if tx.send(fired).is_err() {
                warn!(session_id = %session_id, job_id, "Timer receiver dropped, event lost");
            }
        });
        session_jobs.insert(job_id, handle.abort_handle());
        drop(session_jobs);

        debug!(
            session_id = %session_id,
            job_id,
            delay_ms = delay.as_millis() as u64,
            "Scheduled timer"
        );
        job_id
    }

    /// Abort every pending job of `session_id`. Returns how many were aborted.
    pub fn cancel(&self, session_id: &str) -> usize {
        let Some((_, jobs)) = self.jobs.remove(session_id) else {
            return 0;
        };
        let count = jobs.len();
        for handle in jobs.into_values() {
            handle.abort();
        }
        if count > 0 {
            debug!(session_id = %session_id, cancelled = count, "Cancelled pending timers");
        }
        count
    }

    pub fn pending(&self, session_id: &str) -> usize {
        self.jobs.get(session_id).map_or(0, |jobs| jobs.len())
    }
}

fn forget(jobs: &DashMap<String, HashMap<JobId, AbortHandle>>, session_id: &str, job_id: JobId) {
    if let Some(mut session_jobs) = jobs.get_mut(session_id) {
        session_jobs.remove(&job_id);
    }
    jobs.remove_if(session_id, |_, session_jobs| session_jobs.is_empty());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_in_delay_order() {
        let (scheduler, mut rx) = Scheduler::new();
        scheduler.schedule("s1", Duration::from_millis(300), QuizEvent::SubmitZip);
        scheduler.schedule("s1", Duration::from_millis(100), QuizEvent::GoBack);
        assert_eq!(scheduler.pending("s1"), 2);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.event, QuizEvent::GoBack);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.event, QuizEvent::SubmitZip);
        assert_eq!(second.session_id, "s1");
        assert_eq!(scheduler.pending("s1"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_only_that_session() {
        let (scheduler, mut rx) = Scheduler::new();
        scheduler.schedule("a", Duration::from_secs(1), QuizEvent::SubmitZip);
        scheduler.schedule("a", Duration::from_secs(2), QuizEvent::SubmitZip);
        scheduler.schedule("b", Duration::from_secs(3), QuizEvent::GoBack);

        assert_eq!(scheduler.cancel("a"), 2);
        assert_eq!(scheduler.pending("a"), 0);
        assert_eq!(scheduler.cancel("a"), 0);

        let fired = rx.recv().await.unwrap();
        assert_eq!(fired.session_id, "b");
        assert_eq!(fired.event, QuizEvent::GoBack);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }
}
