//! Delay propagation along a train's stops and across linked trains.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, trace, warn};

use crate::domain::{SimTime, TrainId};

use super::config::PlanningConfig;
use super::correction::{PropagationContext, Resolution, enforce_dwell_floor};
use super::stop::{ScheduleStop, StopRef};
use super::train::TrainRecord;

/// One propagation pass over the train collection.
///
/// Trains currently being propagated are kept in `in_progress`; a linked
/// train that is already on the stack is skipped, so cyclic links cannot
/// recurse forever. Each top-level run may additionally trigger at most
/// `max_linked_propagations` linked propagations.
pub(super) struct Propagator<'a> {
    trains: &'a mut BTreeMap<TrainId, TrainRecord>,
    config: &'a PlanningConfig,
    in_progress: HashSet<TrainId>,
    budget: usize,
    touched: HashSet<TrainId>,
    clock: Option<SimTime>,
}

impl<'a> Propagator<'a> {
    pub fn new(trains: &'a mut BTreeMap<TrainId, TrainRecord>, config: &'a PlanningConfig) -> Self {
        Self {
            trains,
            config,
            in_progress: HashSet::new(),
            budget: config.max_linked_propagations,
            touched: HashSet::new(),
            clock: None,
        }
    }

    /// Entry stops not yet reached are never estimated before `clock`.
    pub fn with_clock(mut self, clock: Option<SimTime>) -> Self {
        self.clock = clock;
        self
    }

    /// Propagate one top-level train and everything linked from it.
    pub fn run(&mut self, train: TrainId, start: Option<usize>, end: Option<usize>) {
        self.budget = self.config.max_linked_propagations;
        self.propagate(train, start, end);
    }

    /// Returns true if `train` was propagated during this pass.
    pub fn touched(&self, train: TrainId) -> bool {
        self.touched.contains(&train)
    }

    fn propagate(&mut self, train: TrainId, start: Option<usize>, end: Option<usize>) {
        if !self.in_progress.insert(train) {
            debug!(%train, "train already being propagated, skipping");
            return;
        }
        self.touched.insert(train);

        if let Some(record) = self.trains.get(&train) {
            let len = record.stops.len();
            let start = start.unwrap_or(record.position).min(len);
            let end = end.unwrap_or(len).min(len);
            let delay = record.delay;
            trace!(%train, start, end, delay, "propagating");
            self.walk(train, start, end, delay);
        }

        self.in_progress.remove(&train);
    }

    fn walk(&mut self, train: TrainId, start: usize, end: usize, mut delay: i64) {
        let clock = self.clock;
        for index in 0..end {
            let at = StopRef::new(train, index);
            let Some(stop) = self.stop(at) else {
                break;
            };
            let automatic = stop.automatic.clone();
            let dispatcher = stop.dispatcher.clone();

            if index < start || stop.passed {
                automatic.forward(self, at);
                continue;
            }

            if let Some(stop) = self.stop_mut(at) {
                if !stop.arrived {
                    stop.arrival_delay = Some(delay);
                }
                stop.departure_delay = stop.arrival_delay;
            }

            if let Resolution::Pending(reason) = automatic.apply(self, at) {
                trace!(stop = %at, correction = %automatic, reason, "correction pending");
            }
            let overridden = !dispatcher.is_none();
            if overridden {
                if let Resolution::Pending(reason) = dispatcher.apply(self, at) {
                    trace!(stop = %at, correction = %dispatcher, reason, "override pending");
                }
            }

            if let Some(stop) = self.stop_mut(at) {
                if !overridden && enforce_dwell_floor(stop) {
                    debug!(stop = %at, "dwell floor re-applied");
                }
                if stop.is_entry() {
                    if let Some(earliest) = clock.and_then(|now| delay_at(stop, now)) {
                        if stop.departure_delay.is_none_or(|d| d < earliest) {
                            trace!(stop = %at, delay = earliest, "entry not before the current time");
                            stop.departure_delay = Some(earliest);
                        }
                    }
                    stop.arrival_delay = stop.departure_delay;
                }
                if let Some(departure) = stop.departure_delay {
                    delay = departure;
                }
            }
        }
    }
}

impl PropagationContext for Propagator<'_> {
    fn config(&self) -> &PlanningConfig {
        self.config
    }

    fn stop(&self, at: StopRef) -> Option<&ScheduleStop> {
        self.trains.get(&at.train)?.stops.get(at.index)
    }

    fn stop_mut(&mut self, at: StopRef) -> Option<&mut ScheduleStop> {
        self.trains.get_mut(&at.train)?.stops.get_mut(at.index)
    }

    fn find_stop(&self, train: TrainId, location: &str) -> Option<usize> {
        self.trains.get(&train)?.find_stop(location)
    }

    fn set_train_delay(&mut self, train: TrainId, delay: i64) {
        if let Some(record) = self.trains.get_mut(&train) {
            record.delay = delay;
        }
    }

    fn propagate_train(&mut self, train: TrainId, end: Option<usize>) {
        if self.budget == 0 {
            warn!(%train, "linked propagation budget exhausted, skipping");
            return;
        }
        self.budget -= 1;
        self.propagate(train, None, end);
    }

    fn settle(&mut self, train: TrainId) {
        if self.touched(train) {
            return;
        }

        // a linked train starts from its parent's delay, so settle from the
        // topmost ancestor not propagated yet
        let mut root = train;
        let mut seen = HashSet::new();
        while let Some(parent) = self.trains.get(&root).and_then(|t| t.parent) {
            if !seen.insert(root) || self.touched(parent) {
                break;
            }
            root = parent;
        }

        debug!(%train, %root, "settling dependency before reading it");
        if root != train {
            self.propagate_train(root, None);
        }
        if !self.touched(train) {
            self.propagate_train(train, None);
        }
    }
}

/// Departure delay of `stop` if it departed at `now`.
fn delay_at(stop: &ScheduleStop, now: SimTime) -> Option<i64> {
    let planned = stop.planned_departure?.minutes();
    Some(now.minutes_relative_to(planned) - planned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LineReport, SimTime, StopFlags, TrainReport};
    use crate::planning::correction::Correction;
    use crate::planning::stop::LinkStatus;

    fn time(s: &str) -> SimTime {
        SimTime::parse(s).unwrap()
    }

    fn train(id: u32, lines: &[(&str, &str, &str, &str)]) -> TrainRecord {
        let mut report = TrainReport::new(TrainId(id), format!("RB {id}"));
        report.lines = lines
            .iter()
            .map(|(planned, arr, dep, flags)| {
                let mut line = LineReport::new(*planned);
                line.arrival = (!arr.is_empty()).then(|| time(arr));
                line.departure = (!dep.is_empty()).then(|| time(dep));
                line.flags = StopFlags::parse(flags);
                line
            })
            .collect();
        let mut record = TrainRecord::from_report(&report);
        for stop in &mut record.stops {
            stop.automatic = Correction::ScheduledDeparture;
            for link in stop.links_mut() {
                link.status = LinkStatus::Resolved;
            }
        }
        record
    }

    fn collection(records: Vec<TrainRecord>) -> BTreeMap<TrainId, TrainRecord> {
        records.into_iter().map(|r| (r.id, r)).collect()
    }

    #[test]
    fn delay_carried_and_absorbed() {
        let mut record = train(
            1,
            &[
                ("1", "10:00", "10:05", ""),
                ("2", "10:10", "10:12", ""),
                ("3", "10:20", "", ""),
            ],
        );
        record.delay = 10;
        record.stops[0].min_dwell = 2;
        let mut trains = collection(vec![record]);
        let config = PlanningConfig::default();

        Propagator::new(&mut trains, &config).run(TrainId(1), None, None);

        let stops = &trains[&TrainId(1)].stops;
        assert_eq!(stops[0].arrival_delay, Some(10));
        assert_eq!(stops[0].departure_delay, Some(7));
        assert_eq!(stops[1].arrival_delay, Some(7));
        assert_eq!(stops[1].departure_delay, Some(5));
        assert_eq!(stops[2].arrival_delay, Some(5));
    }

    #[test]
    fn passed_stops_keep_observed_values() {
        let mut record = train(1, &[("1", "10:00", "10:05", ""), ("2", "10:10", "10:12", "")]);
        record.stops[0].arrived = true;
        record.stops[0].passed = true;
        record.stops[0].arrival_delay = Some(1);
        record.stops[0].departure_delay = Some(3);
        record.delay = 4;
        let mut trains = collection(vec![record]);
        let config = PlanningConfig::default();

        Propagator::new(&mut trains, &config).run(TrainId(1), None, None);

        let stops = &trains[&TrainId(1)].stops;
        assert_eq!(stops[0].departure_delay, Some(3));
        assert_eq!(stops[1].arrival_delay, Some(4));
    }

    #[test]
    fn arrived_stop_keeps_arrival() {
        let mut record = train(1, &[("1", "10:00", "10:05", "")]);
        record.stops[0].arrived = true;
        record.stops[0].arrival_delay = Some(8);
        record.delay = 2;
        let mut trains = collection(vec![record]);
        let config = PlanningConfig::default();

        Propagator::new(&mut trains, &config).run(TrainId(1), None, None);

        let stop = &trains[&TrainId(1)].stops[0];
        assert_eq!(stop.arrival_delay, Some(8));
        assert_eq!(stop.departure_delay, Some(3));
    }

    #[test]
    fn override_runs_after_automatic() {
        let mut record = train(1, &[("1", "10:00", "10:05", ""), ("2", "10:10", "", "")]);
        record.stops[0].dispatcher = Correction::FixedDelay(-3);
        let mut trains = collection(vec![record]);
        let config = PlanningConfig::default();

        Propagator::new(&mut trains, &config).run(TrainId(1), None, None);

        let stops = &trains[&TrainId(1)].stops;
        assert_eq!(stops[0].departure_delay, Some(-3));
        assert_eq!(stops[1].arrival_delay, Some(-3));
    }

    #[test]
    fn entry_copies_departure_into_arrival() {
        let mut report = TrainReport::new(TrainId(1), "RE 1");
        report.origin = Some(crate::domain::Terminus::OffLayout("Nord".into()));
        let mut line = LineReport::new("1");
        line.arrival = Some(time("10:00"));
        line.departure = Some(time("10:02"));
        report.lines = vec![line];
        let mut record = TrainRecord::from_report(&report);
        record.stops[0].dispatcher = Correction::FixedDelay(6);
        record.delay = 1;
        let mut trains = collection(vec![record]);
        let config = PlanningConfig::default();

        Propagator::new(&mut trains, &config).run(TrainId(1), None, None);

        let entry = &trains[&TrainId(1)].stops[0];
        assert!(entry.is_entry());
        assert_eq!(entry.arrival_delay, Some(6));
        assert_eq!(entry.departure_delay, Some(6));
    }

    #[test]
    fn entry_not_estimated_before_clock() {
        let mut report = TrainReport::new(TrainId(1), "RE 1");
        report.origin = Some(crate::domain::Terminus::OffLayout("Nord".into()));
        let mut line = LineReport::new("1");
        line.arrival = Some(time("10:00"));
        line.departure = Some(time("10:02"));
        report.lines = vec![line];
        let mut record = TrainRecord::from_report(&report);
        for stop in &mut record.stops {
            stop.automatic = Correction::ScheduledDeparture;
        }
        let mut trains = collection(vec![record]);
        let config = PlanningConfig::default();

        Propagator::new(&mut trains, &config)
            .with_clock(Some(time("10:07")))
            .run(TrainId(1), None, None);

        let stops = &trains[&TrainId(1)].stops;
        assert_eq!(stops[0].departure_delay, Some(7));
        assert_eq!(stops[0].arrival_delay, Some(7));
        assert_eq!(stops[1].arrival_delay, Some(7));
        assert_eq!(stops[1].departure_delay, Some(5));
    }

    #[test]
    fn wait_reads_origin_from_the_same_pass() {
        let mut waiting = train(1, &[("1", "10:00", "10:06", ""), ("2", "10:10", "", "")]);
        waiting.stops[0].dispatcher = Correction::WaitForArrival {
            origin: StopRef::new(TrainId(2), 1),
            extra_wait: 1,
        };
        let mut origin = train(2, &[("4", "10:00", "10:01", ""), ("1", "10:03", "10:04", "")]);
        origin.delay = 20;
        // estimates left over from an earlier pass
        for stop in &mut origin.stops {
            stop.arrival_delay = Some(0);
            stop.departure_delay = Some(0);
        }
        let mut trains = collection(vec![waiting, origin]);
        let config = PlanningConfig::default();

        let mut propagator = Propagator::new(&mut trains, &config);
        propagator.run(TrainId(1), None, None);
        assert!(propagator.touched(TrainId(2)));

        // origin arrives 10:22 (its first stop absorbs one minute)
        let origin_stop = &trains[&TrainId(2)].stops[1];
        assert_eq!(origin_stop.estimated_arrival(), Some(time("10:22")));
        let first = &trains[&TrainId(1)].stops[0];
        assert_eq!(first.estimated_departure(), Some(time("10:23")));
    }

    #[test]
    fn end_index_is_exclusive() {
        let record = train(1, &[("1", "10:00", "10:05", ""), ("2", "10:10", "10:12", "")]);
        let mut trains = collection(vec![record]);
        let config = PlanningConfig::default();

        Propagator::new(&mut trains, &config).run(TrainId(1), None, Some(1));

        let stops = &trains[&TrainId(1)].stops;
        assert_eq!(stops[0].departure_delay, Some(0));
        assert_eq!(stops[1].arrival_delay, None);
    }

    #[test]
    fn replacement_reaches_successor() {
        let mut first = train(1, &[("1", "10:00", "", "E(2)")]);
        first.stops[0].automatic = Correction::Replacement;
        first.delay = 5;
        let mut second = train(2, &[("1", "10:06", "10:08", ""), ("4", "10:20", "", "")]);
        second.stops[0].automatic = Correction::WaitForArrival {
            origin: StopRef::new(TrainId(1), 0),
            extra_wait: 0,
        };
        let mut trains = collection(vec![first, second]);
        let config = PlanningConfig::default();

        let mut propagator = Propagator::new(&mut trains, &config);
        propagator.run(TrainId(1), None, None);
        assert!(propagator.touched(TrainId(2)));

        let second = &trains[&TrainId(2)];
        assert_eq!(second.delay, 5);
        assert_eq!(second.stops[0].arrival_delay, Some(5));
        assert_eq!(second.stops[0].departure_delay, Some(3));
        assert_eq!(second.stops[1].arrival_delay, Some(3));
    }

    #[test]
    fn cyclic_links_terminate() {
        let mut first = train(1, &[("1", "10:00", "10:05", "E(2)")]);
        first.stops[0].automatic = Correction::Replacement;
        let mut second = train(2, &[("1", "10:06", "10:08", "E(1)")]);
        second.stops[0].automatic = Correction::Replacement;
        let mut trains = collection(vec![first, second]);
        let config = PlanningConfig::default();

        let mut propagator = Propagator::new(&mut trains, &config);
        propagator.run(TrainId(1), None, None);

        assert!(propagator.touched(TrainId(1)));
        assert!(propagator.touched(TrainId(2)));
    }

    #[test]
    fn budget_limits_linked_propagations() {
        let mut first = train(1, &[("1", "10:00", "10:05", "E(2)")]);
        first.stops[0].automatic = Correction::Replacement;
        let second = train(2, &[("1", "10:06", "10:08", "")]);
        let mut trains = collection(vec![first, second]);
        let config = PlanningConfig {
            max_linked_propagations: 0,
            ..PlanningConfig::default()
        };

        let mut propagator = Propagator::new(&mut trains, &config);
        propagator.run(TrainId(1), None, None);

        assert!(!propagator.touched(TrainId(2)));
    }
}
