//! Delays of the scripted screen choreography.
//!
//! None of these affect the answers or the estimate; they only decide when the
//! auto-advancing screens move on. All values are in milliseconds so a pacing
//! file stays readable:
//!
//! ```yaml
//! search_ticks_ms: [500, 1000, 1500]
//! search_done_ms: 1750
//! goal_select_ms: 0
//! ```
//!
//! Fields left out of the file keep their defaults.

use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

use crate::error::{FunnelError, Result};

/// Items on the search and final-loading checklists.
pub const CHECKLIST_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    /// When each "searching lenders" checklist item completes.
    pub search_ticks_ms: [u64; CHECKLIST_LEN],
    /// When the search screen hands over to the lender count.
    pub search_done_ms: u64,
    /// How long the lender count stays up before the property value screen.
    pub lenders_reveal_ms: u64,
    /// Pause between picking an option and the next screen.
    pub option_select_ms: u64,
    pub loading_ticks_ms: [u64; CHECKLIST_LEN],
    pub loading_done_ms: u64,
    pub goal_select_ms: u64,
    /// Results loading overlay.
    pub results_loading_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            search_ticks_ms: [1000, 2000, 3000],
            search_done_ms: 3500,
            lenders_reveal_ms: 2500,
            option_select_ms: 400,
            loading_ticks_ms: [800, 1600, 2400],
            loading_done_ms: 3000,
            goal_select_ms: 600,
            results_loading_ms: 2000,
        }
    }
}

impl Pacing {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| FunnelError::ConfigError(e.to_string()))
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            FunnelError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Every delay multiplied by `factor`. Useful to speed demos up.
    pub fn scaled(&self, factor: f64) -> Result<Self> {
        if !factor.is_finite() || factor < 0.0 {
            return Err(FunnelError::ConfigError(format!(
                "pacing scale must be a non-negative number, got {factor}"
            )));
        }
        let scale = |ms: u64| (ms as f64 * factor).round() as u64;
        Ok(Self {
            search_ticks_ms: self.search_ticks_ms.map(scale),
            search_done_ms: scale(self.search_done_ms),
            lenders_reveal_ms: scale(self.lenders_reveal_ms),
            option_select_ms: scale(self.option_select_ms),
            loading_ticks_ms: self.loading_ticks_ms.map(scale),
            loading_done_ms: scale(self.loading_done_ms),
            goal_select_ms: scale(self.goal_select_ms),
            results_loading_ms: scale(self.results_loading_ms),
        })
    }

    /// Pacing with every delay at zero.
    pub fn instant() -> Self {
        Self {
            search_ticks_ms: [0; CHECKLIST_LEN],
            search_done_ms: 0,
            lenders_reveal_ms: 0,
            option_select_ms: 0,
            loading_ticks_ms: [0; CHECKLIST_LEN],
            loading_done_ms: 0,
            goal_select_ms: 0,
            results_loading_ms: 0,
        }
    }
}

pub(crate) fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
