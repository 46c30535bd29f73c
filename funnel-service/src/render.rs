use async_trait::async_trait;
use funnel_flow::{QuizView, Renderer, Result};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub struct RenderedView {
    pub session_id: String,
    pub view: QuizView,
}

/// Fans every rendered view out to the connected WebSocket clients.
#[derive(Clone)]
pub struct BroadcastRenderer {
    tx: broadcast::Sender<RenderedView>,
}

impl BroadcastRenderer {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RenderedView> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl Renderer for BroadcastRenderer {
    async fn render(&self, session_id: &str, view: &QuizView) -> Result<()> {
        let rendered = RenderedView {
            session_id: session_id.to_string(),
            view: view.clone(),
        };
        match self.tx.send(rendered) {
            Ok(receivers) => debug!(session_id = %session_id, stage = %view.stage, receivers, "Pushed view"),
            Err(_) => debug!(session_id = %session_id, stage = %view.stage, "No view subscribers"),
        }
        Ok(())
    }
}
