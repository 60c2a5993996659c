//! Validated snapshot data as delivered to the planning layer.
//!
//! The feed layer converts raw frames into these types. Planning never
//! sees unparsed strings for times, ids or flags.

use super::{SimTime, StopFlags, TrainId};

/// One schedule line of a train as reported by the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineReport {
    /// Track the train is currently routed to at this stop.
    pub track: String,
    /// Track in the timetable. Identifies the stop location.
    pub planned_track: String,
    /// Planned arrival, absent for some origin lines.
    pub arrival: Option<SimTime>,
    /// Planned departure, absent for some terminus lines.
    pub departure: Option<SimTime>,
    pub flags: StopFlags,
    pub note: Option<String>,
}

impl LineReport {
    /// A line with matching current and planned track and no flags.
    pub fn new(planned_track: impl Into<String>) -> Self {
        let planned_track = planned_track.into();
        Self {
            track: planned_track.clone(),
            planned_track,
            arrival: None,
            departure: None,
            flags: StopFlags::default(),
            note: None,
        }
    }
}

/// Where a train comes from or goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminus {
    /// A boundary point outside the modelled layout (entry/exit).
    OffLayout(String),
    /// A platform inside the layout; the train starts or ends there.
    Platform(String),
}

impl Terminus {
    /// The location label without its kind.
    pub fn label(&self) -> &str {
        match self {
            Terminus::OffLayout(s) | Terminus::Platform(s) => s,
        }
    }
}

/// Snapshot of one train.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainReport {
    pub id: TrainId,
    pub name: String,
    pub origin: Option<Terminus>,
    pub destination: Option<Terminus>,
    /// Whether the train is currently inside the layout.
    pub visible: bool,
    /// Whether the train is standing at a platform.
    pub at_platform: bool,
    pub track: Option<String>,
    /// Planned track of the train's next (or current) stop.
    pub planned_track: Option<String>,
    /// Current delay in minutes.
    pub delay: i64,
    pub user_text: Option<String>,
    /// Remaining schedule. The simulator drops lines once passed.
    pub lines: Vec<LineReport>,
}

impl TrainReport {
    /// An invisible train with no schedule.
    pub fn new(id: TrainId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            origin: None,
            destination: None,
            visible: false,
            at_platform: false,
            track: None,
            planned_track: None,
            delay: 0,
            user_text: None,
            lines: Vec::new(),
        }
    }
}

/// Kind of a simulator event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Entry,
    Exit,
    Arrival,
    Departure,
    RedSignal,
    GreenSignal,
}

/// A simulator event for one train.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainEvent {
    pub kind: EventKind,
    pub train: TrainId,
    /// Simulation time at which the event happened.
    pub time: Option<SimTime>,
    /// Delay reported with the event, in minutes.
    pub delay: i64,
    pub planned_track: Option<String>,
    pub at_platform: bool,
}

/// One converted feed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub sim_time: SimTime,
    pub trains: Vec<TrainReport>,
    pub events: Vec<TrainEvent>,
}
