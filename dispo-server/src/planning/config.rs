//! Planning configuration.

/// Tunable constants for strategy assignment and delay propagation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanningConfig {
    /// Minimum dwell at a stop with a direction reversal (minutes).
    pub reversal_dwell_mins: i64,

    /// Minimum dwell when the locomotive runs round the train (minutes).
    pub loco_cycle_dwell_mins: i64,

    /// Minimum dwell for a locomotive change (minutes).
    pub loco_change_dwell_mins: i64,

    /// Minimum dwell at a split point (minutes).
    pub split_dwell_mins: i64,

    /// How long a split-off train waits after the parent departs (minutes).
    pub split_wait_mins: i64,

    /// Two coupling trains must arrive at least this far apart (minutes).
    pub coupling_window_mins: i64,

    /// Maximum 1-minute nudges applied to separate coupling arrivals.
    pub coupling_nudge_cap: u32,

    /// Failed resolution cycles before a link is declared permanently missing.
    /// `None` retries every cycle forever, since trains may appear late.
    pub link_retry_cap: Option<u32>,

    /// Maximum linked-train propagations triggered from one top-level train.
    pub max_linked_propagations: usize,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            reversal_dwell_mins: 2,
            loco_cycle_dwell_mins: 2,
            loco_change_dwell_mins: 5,
            split_dwell_mins: 1,
            split_wait_mins: 2,
            coupling_window_mins: 2,
            coupling_nudge_cap: 30,
            link_retry_cap: None,
            max_linked_propagations: 256,
        }
    }
}
