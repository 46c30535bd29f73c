use anyhow::{Context, Result, bail};
use funnel_flow::Pacing;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON logging for production
    Json,
    /// Human-readable logging for development
    Pretty,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: String,
    pub log_format: LogFormat,
    pub pacing: Pacing,
}

impl ServiceConfig {
    /// Read `FUNNEL_BIND_ADDR`, `LOG_FORMAT`, `FUNNEL_PACING_FILE` and `FUNNEL_PACING_SCALE`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = lookup("FUNNEL_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        };

        let mut pacing = match lookup("FUNNEL_PACING_FILE") {
            Some(path) => Pacing::from_yaml_file(&path)
                .with_context(|| format!("Failed to load pacing from {path}"))?,
            None => Pacing::default(),
        };

        if let Some(raw) = lookup("FUNNEL_PACING_SCALE") {
            let factor: f64 = match raw.trim().parse() {
                Ok(factor) => factor,
                Err(_) => bail!("FUNNEL_PACING_SCALE must be a number, got {raw:?}"),
            };
            pacing = pacing.scaled(factor)?;
        }

        Ok(Self {
            bind_addr,
            log_format,
            pacing,
        })
    }
}
