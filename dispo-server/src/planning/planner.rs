//! The planning orchestrator.
//!
//! `Planning` owns every train record of the session. Each feed frame is
//! merged into the records, links between trains are resolved, automatic
//! corrections are assigned and delays are recomputed from scratch for
//! every train. Between frames the model can be read and dispatcher
//! overrides can be set.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info, warn};

use crate::domain::{EventKind, Frame, SimTime, TrainEvent, TrainId, TrainReport};

use super::assign::assign_strategies;
use super::config::PlanningConfig;
use super::correction::Correction;
use super::error::PlanningError;
use super::estimate::{ObservedTravelTimes, TravelTimeEstimator};
use super::propagate::Propagator;
use super::resolve::resolve_links;
use super::stop::{ScheduleStop, StopRef};
use super::train::TrainRecord;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Dispatcher override command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideCommand {
    FixedDelay(i64),
    WaitForArrival { origin: StopRef, extra_wait: i64 },
    WaitForDeparture { origin: StopRef, extra_wait: i64 },
}

impl OverrideCommand {
    fn origin(&self) -> Option<StopRef> {
        match self {
            OverrideCommand::FixedDelay(_) => None,
            OverrideCommand::WaitForArrival { origin, .. }
            | OverrideCommand::WaitForDeparture { origin, .. } => Some(*origin),
        }
    }
}

impl From<OverrideCommand> for Correction {
    fn from(command: OverrideCommand) -> Self {
        match command {
            OverrideCommand::FixedDelay(delay) => Correction::FixedDelay(delay),
            OverrideCommand::WaitForArrival { origin, extra_wait } => {
                Correction::WaitForArrival { origin, extra_wait }
            }
            OverrideCommand::WaitForDeparture { origin, extra_wait } => {
                Correction::WaitForDeparture { origin, extra_wait }
            }
        }
    }
}

/// Persistent, corrected schedule model of all trains.
#[derive(Debug, Clone, Default)]
pub struct Planning {
    config: PlanningConfig,
    trains: BTreeMap<TrainId, TrainRecord>,
    travel_times: ObservedTravelTimes,
    clock: Option<SimTime>,
}

impl Planning {
    pub fn new(config: PlanningConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &PlanningConfig {
        &self.config
    }

    /// Simulation time of the last ingested frame.
    pub fn clock(&self) -> Option<SimTime> {
        self.clock
    }

    pub fn train(&self, id: TrainId) -> Option<&TrainRecord> {
        self.trains.get(&id)
    }

    /// All trains, ordered by id.
    pub fn trains(&self) -> impl Iterator<Item = &TrainRecord> {
        self.trains.values()
    }

    pub fn stop(&self, at: StopRef) -> Option<&ScheduleStop> {
        self.trains.get(&at.train)?.stops.get(at.index)
    }

    pub fn len(&self) -> usize {
        self.trains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trains.is_empty()
    }

    /// Travel times observed from arrival events so far.
    pub fn travel_times(&self) -> &ObservedTravelTimes {
        &self.travel_times
    }

    /// Process one feed frame.
    ///
    /// Merges the train list, applies the frame's events in order, backfills
    /// entry and exit times from observed travel times and recomputes all
    /// delays.
    pub fn ingest(&mut self, frame: &Frame) {
        self.clock = Some(frame.sim_time);
        self.merge_trains(&frame.trains);
        self.resolve_links();
        self.assign_strategies();
        for event in &frame.events {
            self.apply_event(event);
        }
        backfill(&mut self.trains, &self.travel_times);
        self.recompute();
        debug!(clock = %frame.sim_time, trains = self.trains.len(), "frame ingested");
    }

    /// Merge a train list snapshot and recompute all delays.
    pub fn merge_snapshot(&mut self, reports: &[TrainReport]) {
        self.merge_trains(reports);
        self.resolve_links();
        self.assign_strategies();
        self.recompute();
    }

    fn merge_trains(&mut self, reports: &[TrainReport]) {
        let mut absent: HashSet<TrainId> = self.trains.keys().copied().collect();

        for report in reports {
            absent.remove(&report.id);
            match self.trains.entry(report.id) {
                Entry::Occupied(mut entry) => entry.get_mut().update(report),
                Entry::Vacant(entry) => {
                    debug!(train = %report.id, name = %report.name, "new train");
                    entry.insert(TrainRecord::from_report(report));
                }
            }
        }

        for id in absent {
            if let Some(train) = self.trains.get_mut(&id) {
                if train.visible {
                    info!(train = %id, name = %train.name, "train withdrawn");
                }
                train.withdraw();
            }
        }
    }

    /// Resolve replacement, coupling and split links to known trains.
    pub fn resolve_links(&mut self) {
        resolve_links(&mut self.trains, &self.config);
    }

    /// Assign automatic corrections where not done yet.
    pub fn assign_strategies(&mut self) {
        assign_strategies(&mut self.trains, &self.config);
    }

    /// Recompute the delays of every train.
    ///
    /// Trains without a parent are the entry points; their corrections
    /// propagate into linked trains. Trains not reached that way (only
    /// possible with cyclic links) are propagated on their own afterwards.
    pub fn recompute(&mut self) {
        let ids: Vec<TrainId> = self.trains.keys().copied().collect();
        let roots: Vec<TrainId> = self
            .trains
            .values()
            .filter(|t| t.parent.is_none())
            .map(|t| t.id)
            .collect();

        let mut propagator = Propagator::new(&mut self.trains, &self.config).with_clock(self.clock);
        for id in roots {
            propagator.run(id, None, None);
        }
        for id in ids {
            if !propagator.touched(id) {
                debug!(train = %id, "not reached from any root train");
                propagator.run(id, None, None);
            }
        }
    }

    /// Propagate delays along one train from `start` (default: its
    /// position) up to, not including, `end` (default: the end of its
    /// schedule).
    pub fn propagate(&mut self, train: TrainId, start: Option<usize>, end: Option<usize>) {
        Propagator::new(&mut self.trains, &self.config)
            .with_clock(self.clock)
            .run(train, start, end);
    }

    /// Apply a simulator event to the model.
    ///
    /// Events that refer to a stop the train has already left are stale and
    /// ignored.
    pub fn apply_event(&mut self, event: &TrainEvent) {
        let Some(train) = self.trains.get_mut(&event.train) else {
            warn!(train = %event.train, kind = ?event.kind, "event for unknown train");
            return;
        };

        let target = event.planned_track.as_deref().and_then(|p| train.find_stop(p));
        let current = train.position;
        if !target.is_some_and(|index| index >= current) || current >= train.stops.len() {
            debug!(train = %event.train, kind = ?event.kind, "ignoring stale event");
            return;
        }
        debug!(train = %event.train, kind = ?event.kind, delay = event.delay, "event");

        match event.kind {
            EventKind::Entry => {
                if let Some(entry) = train.stops.first_mut().filter(|s| s.is_entry()) {
                    let delay = match (event.time, entry.planned_departure) {
                        (Some(time), Some(planned)) => delay_between(planned, time),
                        _ => event.delay,
                    };
                    entry.arrival_delay = Some(delay);
                    entry.departure_delay = Some(delay);
                    entry.arrived = true;
                    entry.passed = true;
                }
            }
            EventKind::Exit => {
                if let Some(exit) = train.stops.last_mut().filter(|s| s.is_exit()) {
                    exit.arrival_delay = Some(event.delay);
                    exit.departure_delay = Some(event.delay);
                    exit.arrived = true;
                    exit.passed = true;
                    train.departed = true;
                }
            }
            EventKind::Arrival => {
                let stop = &mut train.stops[current];
                let delay = match (event.time, stop.planned_arrival.or(stop.planned_departure)) {
                    (Some(time), Some(planned)) => delay_between(planned, time),
                    _ => event.delay,
                };
                stop.arrival_delay = Some(delay);
                stop.arrived = true;
                if stop.is_through_pass() {
                    stop.departure_delay = Some(delay);
                    stop.passed = true;
                }

                if let (Some(time), Some(previous)) = (event.time, current.checked_sub(1)) {
                    let from = &train.stops[previous];
                    if let Some(departed) = from.estimated_departure().filter(|_| from.passed) {
                        let seconds = (time.seconds() - departed.seconds()).rem_euclid(SECONDS_PER_DAY);
                        let to = &train.stops[current];
                        self.travel_times
                            .record(&train.category, &from.location, &to.location, seconds);
                    }
                }

                for stop in &mut train.stops[..current] {
                    stop.arrived = true;
                    stop.passed = true;
                }
            }
            EventKind::Departure => {
                let stop = &mut train.stops[current];
                if event.at_platform {
                    stop.signal_hold = (event.delay > 0).then_some(event.delay);
                    if stop.signal_hold.is_some() {
                        debug!(stop = %StopRef::new(event.train, current), delay = event.delay, "held at signal");
                    }
                } else {
                    stop.dispatcher = Correction::None;
                    stop.signal_hold = None;
                    stop.departure_delay = Some(event.delay);
                    stop.arrived = true;
                    stop.passed = true;
                }
            }
            EventKind::RedSignal | EventKind::GreenSignal => {
                train.delay = event.delay;
                if let Some(index) = target {
                    train.stops[index].arrival_delay = Some(event.delay);
                }
            }
        }
    }

    /// Re-estimate the planned times of entry and exit stops.
    pub fn backfill_boundary_times(&mut self, estimator: &dyn TravelTimeEstimator) {
        backfill(&mut self.trains, estimator);
    }

    /// Set a dispatcher override on a stop.
    ///
    /// Overrides on later stops of the same train are cleared. Takes effect
    /// on the next recomputation.
    pub fn set_override(&mut self, at: StopRef, command: OverrideCommand) -> Result<(), PlanningError> {
        self.check_stop(at)?;
        if let Some(origin) = command.origin() {
            if origin == at {
                return Err(PlanningError::SelfReference(at));
            }
            if self.stop(origin).is_none() {
                return Err(PlanningError::UnknownOrigin(origin));
            }
        }

        let train = self.trains.get_mut(&at.train).ok_or(PlanningError::UnknownTrain(at.train))?;
        let correction = Correction::from(command);
        info!(stop = %at, %correction, "override set");
        train.stops[at.index].dispatcher = correction;
        for stop in &mut train.stops[at.index + 1..] {
            stop.dispatcher = Correction::None;
        }
        Ok(())
    }

    /// Remove the dispatcher override of a stop. Later overrides are kept.
    pub fn clear_override(&mut self, at: StopRef) -> Result<(), PlanningError> {
        self.check_stop(at)?;
        if let Some(train) = self.trains.get_mut(&at.train) {
            info!(stop = %at, "override cleared");
            train.stops[at.index].dispatcher = Correction::None;
        }
        Ok(())
    }

    fn check_stop(&self, at: StopRef) -> Result<(), PlanningError> {
        let train = self.trains.get(&at.train).ok_or(PlanningError::UnknownTrain(at.train))?;
        if at.index >= train.stops.len() {
            return Err(PlanningError::StopOutOfRange {
                train: at.train,
                index: at.index,
            });
        }
        Ok(())
    }
}

/// Minutes from `planned` to `actual`, resolved across midnight.
fn delay_between(planned: SimTime, actual: SimTime) -> i64 {
    let planned = planned.minutes();
    actual.minutes_relative_to(planned) - planned
}

/// Planned entry time: next stop minus travel time. Planned exit time:
/// previous stop plus travel time. Stops already passed keep their times.
fn backfill(trains: &mut BTreeMap<TrainId, TrainRecord>, estimator: &dyn TravelTimeEstimator) {
    for train in trains.values_mut() {
        let TrainRecord { id, category, stops, .. } = train;

        if let [entry, next, ..] = stops.as_mut_slice() {
            if entry.is_entry() && !entry.passed {
                let reference = next.planned_arrival.or(next.planned_departure);
                let estimate = estimator.estimate(category.as_str(), &entry.location, &next.location);
                if let (Some(reference), Some(seconds)) = (reference, estimate) {
                    let time = shift_rounded(reference, -seconds);
                    debug!(train = %id, location = %entry.location, %time, "entry time estimated");
                    entry.planned_arrival = Some(time);
                    entry.planned_departure = Some(time);
                }
            }
        }

        if let [.., previous, exit] = stops.as_mut_slice() {
            if exit.is_exit() && !exit.passed {
                let reference = previous.planned_departure.or(previous.planned_arrival);
                let estimate = estimator.estimate(category.as_str(), &previous.location, &exit.location);
                if let (Some(reference), Some(seconds)) = (reference, estimate) {
                    let time = shift_rounded(reference, seconds);
                    debug!(train = %id, location = %exit.location, %time, "exit time estimated");
                    exit.planned_arrival = Some(time);
                    exit.planned_departure = Some(time);
                }
            }
        }
    }
}

/// Shift by `seconds` and round to the nearest minute.
fn shift_rounded(time: SimTime, seconds: i64) -> SimTime {
    SimTime::from_minutes((time.seconds() + seconds + 30).div_euclid(60))
}
