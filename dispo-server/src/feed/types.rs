//! Feed frame DTOs.
//!
//! These types map directly to the JSON frames produced by the simulator
//! bridge. They use `Option` and `#[serde(default)]` liberally because the
//! bridge omits fields it has no value for.

use serde::Deserialize;

/// One feed frame: a full train list plus the events since the last frame.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedFrameDto {
    /// Simulation clock when the frame was taken ("HH:MM" or "HH:MM:SS").
    pub sim_time: String,

    /// Every train the simulator currently knows about.
    #[serde(default)]
    pub trains: Vec<TrainDto>,

    /// Events that happened since the previous frame, in order.
    #[serde(default)]
    pub events: Vec<EventDto>,
}

/// A train in a feed frame.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainDto {
    /// Simulator train id.
    pub zid: u32,

    /// Display name, e.g. "RE 4711".
    pub name: String,

    /// Where the train comes from. "Gleis X" means it starts at platform X.
    pub from: Option<String>,

    /// Where the train goes to. "Gleis X" means it ends at platform X.
    pub to: Option<String>,

    /// Whether the train is inside the layout.
    #[serde(default)]
    pub visible: bool,

    /// Whether the train is standing at a platform.
    #[serde(default)]
    pub at_platform: bool,

    /// Current track.
    pub track: Option<String>,

    /// Planned track of the current or next stop.
    pub planned_track: Option<String>,

    /// Delay in minutes.
    #[serde(default)]
    pub delay: i64,

    /// Free text entered by a user.
    pub user_text: Option<String>,

    /// Remaining schedule lines.
    #[serde(default)]
    pub schedule: Vec<ScheduleLineDto>,
}

/// A schedule line of a train.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleLineDto {
    /// Track currently assigned; falls back to the planned track.
    pub track: Option<String>,

    /// Track in the timetable.
    pub planned_track: String,

    /// Planned arrival.
    pub arrival: Option<String>,

    /// Planned departure.
    pub departure: Option<String>,

    /// Flag string, e.g. "E(8123)" or "D".
    #[serde(default)]
    pub flags: String,

    /// Free-text note on the line.
    pub note: Option<String>,
}

/// Kind of event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKindDto {
    Entry,
    Exit,
    Arrival,
    Departure,
    RedSignal,
    GreenSignal,
}

/// A train event.
#[derive(Debug, Clone, Deserialize)]
pub struct EventDto {
    pub kind: EventKindDto,

    /// Simulator train id.
    pub zid: u32,

    /// Simulation time of the event.
    pub time: Option<String>,

    /// Delay at the time of the event, in minutes.
    #[serde(default)]
    pub delay: i64,

    /// Track at the time of the event.
    pub track: Option<String>,

    /// Planned track at the time of the event.
    pub planned_track: Option<String>,

    /// Whether the train stood at a platform.
    #[serde(default)]
    pub at_platform: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_minimal_frame() {
        let frame: FeedFrameDto = serde_json::from_str(r#"{"sim_time": "10:00"}"#).unwrap();
        assert_eq!(frame.sim_time, "10:00");
        assert!(frame.trains.is_empty());
        assert!(frame.events.is_empty());
    }

    #[test]
    fn deserialize_train_and_event() {
        let json = r#"{
            "sim_time": "10:00:30",
            "trains": [{
                "zid": 12,
                "name": "RE 12",
                "from": "Nord",
                "to": "Gleis 3",
                "visible": true,
                "planned_track": "1",
                "delay": 4,
                "schedule": [
                    {"planned_track": "1", "arrival": "10:02", "departure": "10:04", "flags": "E(13)"}
                ]
            }],
            "events": [
                {"kind": "red_signal", "zid": 12, "delay": 5}
            ]
        }"#;

        let frame: FeedFrameDto = serde_json::from_str(json).unwrap();
        let train = &frame.trains[0];
        assert_eq!(train.zid, 12);
        assert!(train.visible);
        assert!(!train.at_platform);
        assert_eq!(train.delay, 4);
        assert_eq!(train.schedule[0].flags, "E(13)");
        assert!(train.schedule[0].track.is_none());

        assert_eq!(frame.events[0].kind, EventKindDto::RedSignal);
        assert_eq!(frame.events[0].delay, 5);
    }
}
