use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

use crate::{error::Result, view::QuizView};

/// Presentation side of the funnel. Called after every applied transition,
/// including the ones triggered by timers.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, session_id: &str, view: &QuizView) -> Result<()>;
}

/// Logs each rendered screen.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRenderer;

#[async_trait]
impl Renderer for TracingRenderer {
    async fn render(&self, session_id: &str, view: &QuizView) -> Result<()> {
        info!(
            session_id = %session_id,
            stage = %view.stage,
            progress = view.progress_percent,
            cash = ?view.cash.as_ref().map(|cash| cash.amount),
            "Rendered screen"
        );
        Ok(())
    }
}

/// Keeps every rendered view per session.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    views: Arc<DashMap<String, Vec<QuizView>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn views(&self, session_id: &str) -> Vec<QuizView> {
        self.views
            .get(session_id)
            .map(|views| views.clone())
            .unwrap_or_default()
    }

    pub fn last(&self, session_id: &str) -> Option<QuizView> {
        self.views
            .get(session_id)
            .and_then(|views| views.last().cloned())
    }
}

#[async_trait]
impl Renderer for RecordingRenderer {
    async fn render(&self, session_id: &str, view: &QuizView) -> Result<()> {
        self.views
            .entry(session_id.to_string())
            .or_default()
            .push(view.clone());
        Ok(())
    }
}
