//! Schedule stops.
//!
//! A `ScheduleStop` is one scheduled visit of a train to a location, or a
//! synthetic entry/exit point where the train crosses the layout boundary.
//! Unlike the simulator's schedule lines, stops are never dropped once the
//! train has passed them.

use crate::domain::{LineReport, SimTime, StopFlags, TrainId};

use super::correction::Correction;

/// Position of a stop: the owning train and the index in its stop sequence.
///
/// Stop sequences never change order once built, so a `StopRef` stays valid
/// for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StopRef {
    pub train: TrainId,
    pub index: usize,
}

impl StopRef {
    pub fn new(train: TrainId, index: usize) -> Self {
        Self { train, index }
    }
}

impl std::fmt::Display for StopRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.train, self.index)
    }
}

/// Identity of a stop, captured when it is first created.
///
/// Stable even if the stop's track assignment changes later.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StopKey {
    pub train: TrainId,
    pub planned_arrival: Option<SimTime>,
    pub planned_departure: Option<SimTime>,
    pub location: String,
}

/// Whether a stop is a real schedule line or a boundary crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopKind {
    Scheduled,
    Entry,
    Exit,
}

/// Resolution state of a link to another train.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// The target train has not appeared yet.
    Unresolved,
    /// The target train is known.
    Resolved,
    /// Gave up waiting for the target train.
    PermanentlyMissing,
}

/// Link from a stop to another train.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopLink {
    pub target: TrainId,
    pub status: LinkStatus,
    /// Resolution cycles in which the target was not found.
    pub failed_attempts: u32,
}

impl StopLink {
    /// A new, unresolved link. Self references are not links.
    fn to(owner: TrainId, target: Option<TrainId>) -> Option<Self> {
        target.filter(|t| *t != owner).map(|target| Self {
            target,
            status: LinkStatus::Unresolved,
            failed_attempts: 0,
        })
    }

    /// The target train, if resolved.
    pub fn resolved(&self) -> Option<TrainId> {
        (self.status == LinkStatus::Resolved).then_some(self.target)
    }
}

/// One stop in a train's persisted schedule.
#[derive(Debug, Clone)]
pub struct ScheduleStop {
    key: StopKey,
    pub kind: StopKind,
    /// Planned track; identifies the location.
    pub location: String,
    /// Track currently assigned, may differ after a track change.
    pub track: String,
    pub planned_arrival: Option<SimTime>,
    pub planned_departure: Option<SimTime>,
    /// Minimum dwell in minutes.
    pub min_dwell: i64,
    /// Arrival delay in minutes. `None` until first computed.
    pub arrival_delay: Option<i64>,
    /// Departure delay in minutes. `None` until first computed.
    pub departure_delay: Option<i64>,
    /// The train has arrived; `arrival_delay` is an observed value.
    pub arrived: bool,
    /// The train has departed; both delays are observed values.
    pub passed: bool,
    pub flags: StopFlags,
    pub note: Option<String>,
    /// Departure delay the train is held at a signal with. A lower bound
    /// for the departure delay whatever the strategy.
    pub signal_hold: Option<i64>,
    /// Strategy derived from schedule semantics.
    pub automatic: Correction,
    /// Strategy set by the dispatcher, applied after `automatic`.
    pub dispatcher: Correction,
    pub replacement: Option<StopLink>,
    pub coupling: Option<StopLink>,
    pub split_off: Option<StopLink>,
}

impl ScheduleStop {
    /// Build a stop from a snapshot schedule line.
    pub fn from_line(train: TrainId, line: &LineReport) -> Self {
        let mut stop = Self::bare(
            train,
            StopKind::Scheduled,
            &line.planned_track,
            line.arrival,
            line.departure,
        );
        stop.track = line.track.clone();
        stop.flags = line.flags.clone();
        stop.note = line.note.clone();
        stop.replacement = StopLink::to(train, line.flags.replacement);
        stop.coupling = StopLink::to(train, line.flags.coupling);
        stop.split_off = StopLink::to(train, line.flags.split_off);
        stop
    }

    /// Build a synthetic entry or exit stop at the layout boundary.
    pub fn boundary(train: TrainId, kind: StopKind, location: &str, time: Option<SimTime>) -> Self {
        Self::bare(train, kind, location, time, time)
    }

    fn bare(
        train: TrainId,
        kind: StopKind,
        location: &str,
        planned_arrival: Option<SimTime>,
        planned_departure: Option<SimTime>,
    ) -> Self {
        Self {
            key: StopKey {
                train,
                planned_arrival,
                planned_departure,
                location: location.to_string(),
            },
            kind,
            location: location.to_string(),
            track: location.to_string(),
            planned_arrival,
            planned_departure,
            min_dwell: 0,
            arrival_delay: None,
            departure_delay: None,
            arrived: false,
            passed: false,
            flags: StopFlags::default(),
            note: None,
            signal_hold: None,
            automatic: Correction::None,
            dispatcher: Correction::None,
            replacement: None,
            coupling: None,
            split_off: None,
        }
    }

    /// The identity this stop was created with.
    pub fn key(&self) -> &StopKey {
        &self.key
    }

    pub fn is_entry(&self) -> bool {
        self.kind == StopKind::Entry
    }

    pub fn is_exit(&self) -> bool {
        self.kind == StopKind::Exit
    }

    pub fn is_through_pass(&self) -> bool {
        self.flags.through_pass
    }

    /// Entries, exits and through-passes have no dwell.
    pub fn is_dwell_exempt(&self) -> bool {
        self.is_entry() || self.is_exit() || self.is_through_pass()
    }

    /// Minimum dwell honoured by the schedule rule.
    pub fn effective_min_dwell(&self) -> i64 {
        if self.is_dwell_exempt() {
            0
        } else {
            self.min_dwell.max(0)
        }
    }

    /// Planned times in minutes, resolved across midnight relative to the
    /// arrival. A missing departure becomes arrival plus minimum dwell, a
    /// missing arrival becomes the departure. `None` if neither is known.
    pub fn planned_minutes(&self) -> Option<(i64, i64)> {
        match (self.planned_arrival, self.planned_departure) {
            (Some(arr), Some(dep)) => {
                let arr = arr.minutes();
                Some((arr, dep.minutes_relative_to(arr)))
            }
            (Some(arr), None) => {
                let arr = arr.minutes();
                Some((arr, arr + self.effective_min_dwell()))
            }
            (None, Some(dep)) => {
                let dep = dep.minutes();
                Some((dep, dep))
            }
            (None, None) => None,
        }
    }

    /// Planned arrival plus arrival delay.
    pub fn estimated_arrival(&self) -> Option<SimTime> {
        let arr = self.planned_arrival.or(self.planned_departure)?;
        Some(arr.add_minutes(self.arrival_delay?))
    }

    /// Planned departure plus departure delay.
    pub fn estimated_departure(&self) -> Option<SimTime> {
        let dep = self.planned_departure.or(self.planned_arrival)?;
        Some(dep.add_minutes(self.departure_delay?))
    }

    /// The resolved replacement train, if any.
    pub fn replacement_train(&self) -> Option<TrainId> {
        self.replacement.as_ref().and_then(StopLink::resolved)
    }

    /// The resolved coupling partner, if any.
    pub fn coupling_train(&self) -> Option<TrainId> {
        self.coupling.as_ref().and_then(StopLink::resolved)
    }

    /// The resolved split-off train, if any.
    pub fn split_off_train(&self) -> Option<TrainId> {
        self.split_off.as_ref().and_then(StopLink::resolved)
    }

    /// All links of this stop.
    pub fn links(&self) -> impl Iterator<Item = &StopLink> {
        [&self.replacement, &self.coupling, &self.split_off]
            .into_iter()
            .flatten()
    }

    /// All links of this stop, mutably.
    pub fn links_mut(&mut self) -> impl Iterator<Item = &mut StopLink> {
        [
            &mut self.replacement,
            &mut self.coupling,
            &mut self.split_off,
        ]
        .into_iter()
        .flatten()
    }
}
