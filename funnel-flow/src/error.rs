use thiserror::Error;

use crate::step::Stage;

#[derive(Error, Debug)]
pub enum FunnelError {
    #[error("Event `{event}` is not allowed at {stage}")]
    EventNotAllowed { event: &'static str, stage: Stage },

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid quiz step: {0}")]
    InvalidStep(u8),

    #[error("Unknown property value bucket: {0}")]
    UnknownPropertyValue(u64),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, FunnelError>;
