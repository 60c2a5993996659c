//! Persisted train records.

use tracing::debug;

use crate::domain::{Terminus, TrainId, TrainReport, train_category};

use super::stop::{ScheduleStop, StopKind};

/// Everything the planner knows about one train.
///
/// Created on the first snapshot that mentions the train and kept for the
/// whole session, even after the train has left the layout.
#[derive(Debug, Clone)]
pub struct TrainRecord {
    pub id: TrainId,
    pub name: String,
    /// Alphabetic prefix of the name, e.g. "ICE". Empty if the name has none.
    pub category: String,
    pub origin: Option<Terminus>,
    pub destination: Option<Terminus>,
    /// Ordered stops including synthetic entry and exit stops. The order
    /// never changes once built.
    pub stops: Vec<ScheduleStop>,
    /// Delay last reported by the simulator (or seeded by a parent train).
    pub delay: i64,
    /// Index of the stop the train is heading for or standing at.
    pub position: usize,
    pub track: Option<String>,
    pub planned_track: Option<String>,
    pub visible: bool,
    pub at_platform: bool,
    pub user_text: Option<String>,
    /// The train has left the layout through its exit.
    pub departed: bool,
    /// The train disappeared from the snapshot.
    pub withdrawn: bool,
    /// Train whose replacement, coupling or split flag references this one.
    pub parent: Option<TrainId>,
    pub links_resolved: bool,
    pub strategies_assigned: bool,
}

impl TrainRecord {
    /// Build a record from the first report of a train.
    ///
    /// Inserts an entry stop when the train comes from outside the layout
    /// and an exit stop when it leaves it. Trains already visible get the
    /// stops behind them marked as passed with the reported delay.
    pub fn from_report(report: &TrainReport) -> Self {
        let id = report.id;
        let mut stops = Vec::with_capacity(report.lines.len() + 2);

        let first = report.lines.first();
        if let Some(label) = off_layout(report.origin.as_ref(), first.map(|l| l.planned_track.as_str())) {
            let time = first.and_then(|l| l.arrival.or(l.departure));
            stops.push(ScheduleStop::boundary(id, StopKind::Entry, label, time));
        }

        stops.extend(report.lines.iter().map(|line| ScheduleStop::from_line(id, line)));

        let last = report.lines.last();
        if let Some(label) = off_layout(report.destination.as_ref(), last.map(|l| l.planned_track.as_str())) {
            let time = last.and_then(|l| l.departure.or(l.arrival));
            stops.push(ScheduleStop::boundary(id, StopKind::Exit, label, time));
        }

        let mut record = Self {
            id,
            name: report.name.clone(),
            category: train_category(&report.name).unwrap_or_default().to_string(),
            origin: report.origin.clone(),
            destination: report.destination.clone(),
            stops,
            delay: report.delay,
            position: 0,
            track: None,
            planned_track: None,
            visible: false,
            at_platform: false,
            user_text: None,
            departed: false,
            withdrawn: false,
            parent: None,
            links_resolved: false,
            strategies_assigned: false,
        };

        if report.visible {
            record.mark_starting_position(report);
        }
        record.update(report);
        record
    }

    /// The train was already inside the layout when first seen.
    fn mark_starting_position(&mut self, report: &TrainReport) {
        let index = self
            .position_of(report.planned_track.as_deref())
            .unwrap_or(self.stops.len().saturating_sub(1));

        for stop in &mut self.stops[..index] {
            stop.arrived = true;
            stop.passed = true;
            stop.arrival_delay = Some(report.delay);
            stop.departure_delay = Some(report.delay);
        }
        if report.at_platform {
            if let Some(stop) = self.stops.get_mut(index) {
                stop.arrived = true;
                stop.arrival_delay = Some(report.delay);
            }
        }
        self.position = index;
    }

    /// Take over the mutable fields of a newer report.
    ///
    /// Never replaces the stop sequence; stop tracks are matched by planned
    /// location. The position only moves forward.
    pub fn update(&mut self, report: &TrainReport) {
        match &report.track {
            Some(track) => {
                self.track = Some(track.clone());
                self.planned_track = report.planned_track.clone();
            }
            None => {
                let label = report.destination.as_ref().map(|d| d.label().to_string());
                self.track = label.clone();
                self.planned_track = label;
            }
        }
        self.delay = report.delay;
        self.at_platform = report.at_platform;
        self.visible = report.visible;
        self.user_text = report.user_text.clone();
        if report.visible {
            self.withdrawn = false;
        }

        for line in &report.lines {
            if let Some(index) = self.find_stop(&line.planned_track) {
                self.stops[index].track = line.track.clone();
            }
        }

        let target = match report.planned_track.as_deref() {
            Some(planned) => self.find_stop(planned),
            // no next stop: the train is on its way out
            None if report.visible => self.stops.len().checked_sub(1),
            None => None,
        };
        if let Some(index) = target {
            self.advance_to(index);
        }
    }

    /// Move the position forward to `index`, marking the stops in between
    /// as passed.
    pub fn advance_to(&mut self, index: usize) {
        if index <= self.position || index >= self.stops.len() {
            return;
        }
        debug!(train = %self.id, from = self.position, to = index, "position advanced");
        let delay = self.delay;
        for stop in &mut self.stops[self.position..index] {
            if !stop.passed {
                stop.arrived = true;
                stop.passed = true;
                stop.arrival_delay.get_or_insert(delay);
                stop.departure_delay.get_or_insert(delay);
            }
        }
        self.position = index;
    }

    /// Mark the train as gone from the layout.
    ///
    /// Visibility and tracks are cleared; stops and delays are kept.
    pub fn withdraw(&mut self) {
        if !self.visible {
            return;
        }
        self.visible = false;
        self.at_platform = false;
        self.track = None;
        self.planned_track = None;
        self.withdrawn = true;
        for stop in &mut self.stops {
            stop.passed = true;
        }
    }

    /// Index of the first stop at planned location `location`.
    pub fn find_stop(&self, location: &str) -> Option<usize> {
        self.stops.iter().position(|s| s.location == location)
    }

    fn position_of(&self, planned_track: Option<&str>) -> Option<usize> {
        planned_track.and_then(|p| self.find_stop(p))
    }

    /// Planned locations in schedule order.
    pub fn route(&self) -> impl Iterator<Item = &str> {
        self.stops.iter().map(|s| s.location.as_str())
    }
}

/// Label of an off-layout terminus that is not already a scheduled stop.
fn off_layout<'a>(terminus: Option<&'a Terminus>, adjacent: Option<&str>) -> Option<&'a str> {
    match terminus {
        Some(Terminus::OffLayout(label)) if adjacent != Some(label.as_str()) => Some(label),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LineReport, SimTime};

    fn time(s: &str) -> SimTime {
        SimTime::parse(s).unwrap()
    }

    fn line(planned: &str, arr: &str, dep: &str) -> LineReport {
        let mut line = LineReport::new(planned);
        line.arrival = Some(time(arr));
        line.departure = Some(time(dep));
        line
    }

    fn report() -> TrainReport {
        let mut report = TrainReport::new(TrainId(7), "RE 4711");
        report.origin = Some(Terminus::OffLayout("Nord".into()));
        report.destination = Some(Terminus::OffLayout("Sued".into()));
        report.lines = vec![line("1", "10:00", "10:02"), line("3", "10:10", "10:12")];
        report
    }

    #[test]
    fn boundary_stops_inserted() {
        let record = TrainRecord::from_report(&report());

        assert_eq!(record.category, "RE");
        assert_eq!(record.route().collect::<Vec<_>>(), ["Nord", "1", "3", "Sued"]);
        assert!(record.stops[0].is_entry());
        assert_eq!(record.stops[0].planned_departure, Some(time("10:00")));
        assert!(record.stops[3].is_exit());
        assert_eq!(record.stops[3].planned_arrival, Some(time("10:12")));
        assert_eq!(record.position, 0);
    }

    #[test]
    fn platform_termini_get_no_boundary_stops() {
        let mut report = report();
        report.origin = Some(Terminus::Platform("1".into()));
        report.destination = Some(Terminus::Platform("3".into()));

        let record = TrainRecord::from_report(&report);
        assert_eq!(record.route().collect::<Vec<_>>(), ["1", "3"]);
    }

    #[test]
    fn visible_train_starts_mid_route() {
        let mut report = report();
        report.visible = true;
        report.at_platform = true;
        report.delay = 4;
        report.track = Some("3".into());
        report.planned_track = Some("3".into());

        let record = TrainRecord::from_report(&report);

        assert_eq!(record.position, 2);
        assert!(record.stops[0].passed && record.stops[1].passed);
        assert_eq!(record.stops[1].departure_delay, Some(4));
        assert!(record.stops[2].arrived);
        assert!(!record.stops[2].passed);
        assert_eq!(record.stops[2].arrival_delay, Some(4));
    }

    #[test]
    fn update_keeps_stops_and_tracks_changes() {
        let mut record = TrainRecord::from_report(&report());

        let mut next = report();
        next.lines = vec![{
            let mut l = line("3", "10:10", "10:12");
            l.track = "4".into();
            l
        }];
        next.visible = true;
        next.track = Some("4".into());
        next.planned_track = Some("3".into());
        next.delay = 2;
        record.update(&next);

        assert_eq!(record.stops.len(), 4);
        assert_eq!(record.stops[2].track, "4");
        assert_eq!(record.stops[2].location, "3");
        assert_eq!(record.position, 2);
        assert!(record.stops[1].passed);
        assert_eq!(record.stops[1].departure_delay, Some(2));
    }

    #[test]
    fn position_never_moves_back() {
        let mut record = TrainRecord::from_report(&report());
        record.advance_to(2);

        let mut stale = report();
        stale.visible = true;
        stale.planned_track = Some("1".into());
        stale.track = Some("1".into());
        record.update(&stale);

        assert_eq!(record.position, 2);
    }

    #[test]
    fn leaving_train_heads_for_exit() {
        let mut record = TrainRecord::from_report(&report());

        let mut leaving = report();
        leaving.visible = true;
        record.update(&leaving);

        assert_eq!(record.position, 3);
        assert_eq!(record.track.as_deref(), Some("Sued"));
    }

    #[test]
    fn withdraw_keeps_history() {
        let mut report = report();
        report.visible = true;
        report.track = Some("1".into());
        report.planned_track = Some("1".into());
        let mut record = TrainRecord::from_report(&report);

        record.withdraw();

        assert!(record.withdrawn);
        assert!(!record.visible);
        assert_eq!(record.track, None);
        assert_eq!(record.stops.len(), 4);
        assert!(record.stops.iter().all(|s| s.passed));
    }
}
