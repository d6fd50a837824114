//! Job priority levels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Priority level of a dispatched job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPriority {
    /// Pre-empts everything else; used by the broadcast polling loop.
    High,
    /// Default for parse and execute jobs.
    Normal,
    /// Background work such as persistence; must not pre-empt fan-out.
    Low,
    /// Jobs of unbounded duration; served only by dedicated workers.
    LongTerm,
}

impl JobPriority {
    /// All priorities, most urgent first. Workers scan their accepted set in
    /// this order when picking the next job.
    pub const DESCENDING: [JobPriority; 4] = [
        JobPriority::High,
        JobPriority::Normal,
        JobPriority::Low,
        JobPriority::LongTerm,
    ];

    /// Stable index into per-priority storage.
    pub fn index(&self) -> usize {
        match self {
            Self::High => 0,
            Self::Normal => 1,
            Self::Low => 2,
            Self::LongTerm => 3,
        }
    }

    /// Numeric urgency (higher = more urgent).
    pub fn numeric_priority(&self) -> u8 {
        match self {
            Self::High => 4,
            Self::Normal => 3,
            Self::Low => 2,
            Self::LongTerm => 1,
        }
    }

    /// Return the priority as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
            Self::LongTerm => "long_term",
        }
    }
}

impl fmt::Display for JobPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descending_order_matches_urgency() {
        let ranks: Vec<u8> = JobPriority::DESCENDING
            .iter()
            .map(|p| p.numeric_priority())
            .collect();
        let mut sorted = ranks.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(ranks, sorted);
    }
}
