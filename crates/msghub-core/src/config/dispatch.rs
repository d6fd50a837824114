//! Worker pool configuration.

use serde::{Deserialize, Serialize};

/// Job dispatcher worker counts and journal location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Workers accepting only high-priority jobs.
    #[serde(default = "default_high")]
    pub high_priority_count: u16,
    /// Workers accepting normal- and high-priority jobs.
    #[serde(default = "default_normal")]
    pub normal_priority_count: u16,
    /// Workers accepting only low-priority jobs.
    #[serde(default = "default_low")]
    pub low_priority_count: u16,
    /// Directory for crash-recovery job journals. Empty disables journaling.
    #[serde(default)]
    pub journal_root: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            high_priority_count: default_high(),
            normal_priority_count: default_normal(),
            low_priority_count: default_low(),
            journal_root: String::new(),
        }
    }
}

fn default_high() -> u16 {
    3
}

fn default_normal() -> u16 {
    3
}

fn default_low() -> u16 {
    5
}
