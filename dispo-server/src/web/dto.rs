//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::{TrainId, train_number};
use crate::planning::{
    LinkStatus, OverrideCommand, ScheduleStop, StopKind, StopLink, StopRef, TrainRecord,
};

/// A train in the overview list.
#[derive(Debug, Serialize)]
pub struct TrainSummary {
    /// Simulator train id
    pub id: u32,

    /// Display name (e.g., "RE 12345")
    pub name: String,

    /// Train number parsed from the name
    pub number: Option<u32>,

    /// Delay last reported by the simulator, in minutes
    pub delay: i64,

    /// Whether the train is currently on the layout
    pub visible: bool,

    /// Whether the train disappeared from the snapshot
    pub withdrawn: bool,

    /// Index of the stop the train is heading for or standing at
    pub position: usize,
}

/// Full schedule of one train.
#[derive(Debug, Serialize)]
pub struct TrainDetail {
    pub id: u32,
    pub name: String,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub delay: i64,
    pub visible: bool,
    pub withdrawn: bool,
    pub departed: bool,
    pub position: usize,

    /// Current track, if known
    pub track: Option<String>,

    /// Train whose flag references this one
    pub parent: Option<u32>,

    /// All stops including entry and exit
    pub stops: Vec<StopView>,
}

/// One stop of a train with its computed delays.
#[derive(Debug, Serialize)]
pub struct StopView {
    pub index: usize,

    /// "scheduled", "entry" or "exit"
    pub kind: &'static str,

    pub location: String,
    pub track: String,
    pub planned_arrival: Option<String>,
    pub planned_departure: Option<String>,
    pub estimated_arrival: Option<String>,
    pub estimated_departure: Option<String>,
    pub arrival_delay: Option<i64>,
    pub departure_delay: Option<i64>,
    pub min_dwell: i64,
    pub arrived: bool,
    pub passed: bool,

    /// Raw flag string from the schedule
    pub flags: String,

    /// Automatic correction label (e.g., "Scheduled")
    pub automatic: String,

    /// Dispatcher override label, if one is set
    pub dispatcher: Option<String>,

    /// Minutes the train is held at a signal, if it is
    pub signal_hold: Option<i64>,

    pub links: Vec<LinkView>,
}

/// A link from a stop to another train.
#[derive(Debug, Serialize)]
pub struct LinkView {
    /// "replacement", "coupling" or "split"
    pub kind: &'static str,
    pub train: u32,

    /// "unresolved", "resolved" or "missing"
    pub status: &'static str,
    pub failed_attempts: u32,
}

/// Dispatcher override for one stop.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverrideRequest {
    /// Depart this many minutes late
    FixedDelay { delay: i64 },

    /// Wait for another train's arrival at one of its stops
    WaitForArrival {
        train: u32,
        index: usize,
        #[serde(default)]
        extra_wait: i64,
    },

    /// Wait for another train's departure from one of its stops
    WaitForDeparture {
        train: u32,
        index: usize,
        #[serde(default)]
        extra_wait: i64,
    },
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

// Conversion implementations

impl TrainSummary {
    pub fn from_record(train: &TrainRecord) -> Self {
        Self {
            id: train.id.0,
            name: train.name.clone(),
            number: train_number(&train.name),
            delay: train.delay,
            visible: train.visible,
            withdrawn: train.withdrawn,
            position: train.position,
        }
    }
}

impl TrainDetail {
    pub fn from_record(train: &TrainRecord) -> Self {
        Self {
            id: train.id.0,
            name: train.name.clone(),
            origin: train.origin.as_ref().map(|t| t.label().to_string()),
            destination: train.destination.as_ref().map(|t| t.label().to_string()),
            delay: train.delay,
            visible: train.visible,
            withdrawn: train.withdrawn,
            departed: train.departed,
            position: train.position,
            track: train.track.clone(),
            parent: train.parent.map(|p| p.0),
            stops: train
                .stops
                .iter()
                .enumerate()
                .map(|(index, stop)| StopView::from_stop(index, stop))
                .collect(),
        }
    }
}

impl StopView {
    pub fn from_stop(index: usize, stop: &ScheduleStop) -> Self {
        let mut links = Vec::new();
        for (kind, link) in [
            ("replacement", &stop.replacement),
            ("coupling", &stop.coupling),
            ("split", &stop.split_off),
        ] {
            if let Some(link) = link {
                links.push(LinkView::new(kind, link));
            }
        }

        Self {
            index,
            kind: match stop.kind {
                StopKind::Scheduled => "scheduled",
                StopKind::Entry => "entry",
                StopKind::Exit => "exit",
            },
            location: stop.location.clone(),
            track: stop.track.clone(),
            planned_arrival: stop.planned_arrival.map(|t| t.to_string()),
            planned_departure: stop.planned_departure.map(|t| t.to_string()),
            estimated_arrival: stop.estimated_arrival().map(|t| t.to_string()),
            estimated_departure: stop.estimated_departure().map(|t| t.to_string()),
            arrival_delay: stop.arrival_delay,
            departure_delay: stop.departure_delay,
            min_dwell: stop.min_dwell,
            arrived: stop.arrived,
            passed: stop.passed,
            flags: stop.flags.raw.clone(),
            automatic: stop.automatic.to_string(),
            dispatcher: (!stop.dispatcher.is_none()).then(|| stop.dispatcher.to_string()),
            signal_hold: stop.signal_hold,
            links,
        }
    }
}

impl LinkView {
    fn new(kind: &'static str, link: &StopLink) -> Self {
        Self {
            kind,
            train: link.target.0,
            status: match link.status {
                LinkStatus::Unresolved => "unresolved",
                LinkStatus::Resolved => "resolved",
                LinkStatus::PermanentlyMissing => "missing",
            },
            failed_attempts: link.failed_attempts,
        }
    }
}

impl From<OverrideRequest> for OverrideCommand {
    fn from(req: OverrideRequest) -> Self {
        match req {
            OverrideRequest::FixedDelay { delay } => OverrideCommand::FixedDelay(delay),
            OverrideRequest::WaitForArrival {
                train,
                index,
                extra_wait,
            } => OverrideCommand::WaitForArrival {
                origin: StopRef::new(TrainId(train), index),
                extra_wait,
            },
            OverrideRequest::WaitForDeparture {
                train,
                index,
                extra_wait,
            } => OverrideCommand::WaitForDeparture {
                origin: StopRef::new(TrainId(train), index),
                extra_wait,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_request_parses_tagged_json() {
        let req: OverrideRequest =
            serde_json::from_str(r#"{"kind":"fixed_delay","delay":4}"#).unwrap();
        assert_eq!(req, OverrideRequest::FixedDelay { delay: 4 });

        let req: OverrideRequest =
            serde_json::from_str(r#"{"kind":"wait_for_arrival","train":7,"index":2}"#).unwrap();
        assert_eq!(
            OverrideCommand::from(req),
            OverrideCommand::WaitForArrival {
                origin: StopRef::new(TrainId(7), 2),
                extra_wait: 0,
            }
        );
    }

    #[test]
    fn unknown_override_kind_is_rejected() {
        let result = serde_json::from_str::<OverrideRequest>(r#"{"kind":"teleport"}"#);
        assert!(result.is_err());
    }
}
