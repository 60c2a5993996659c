//! Conversion from feed DTOs to domain reports.
//!
//! Trains or events that fail to convert are skipped with a warning rather
//! than failing the whole frame.

use tracing::warn;

use crate::domain::{
    EventKind, Frame, LineReport, SimTime, StopFlags, Terminus, TrainEvent, TrainId, TrainReport,
};

use super::types::{EventDto, EventKindDto, FeedFrameDto, ScheduleLineDto, TrainDto};

/// Prefix the simulator puts in front of in-layout origins/destinations.
const PLATFORM_PREFIX: &str = "Gleis ";

/// Error during DTO to domain conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// Failed to parse a time string
    #[error("invalid time: {0}")]
    InvalidTime(String),

    /// Missing required field
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Convert a whole frame.
///
/// Fails only if the frame's own clock is unreadable.
pub fn convert_frame(frame: &FeedFrameDto) -> Result<Frame, ConversionError> {
    let sim_time = parse_time(&frame.sim_time)?;

    let mut trains = Vec::with_capacity(frame.trains.len());
    for dto in &frame.trains {
        match convert_train(dto) {
            Ok(train) => trains.push(train),
            Err(e) => warn!(zid = dto.zid, error = %e, "skipping train"),
        }
    }

    let mut events = Vec::with_capacity(frame.events.len());
    for dto in &frame.events {
        match convert_event(dto) {
            Ok(event) => events.push(event),
            Err(e) => warn!(zid = dto.zid, error = %e, "skipping event"),
        }
    }

    Ok(Frame {
        sim_time,
        trains,
        events,
    })
}

/// Convert a single train.
pub fn convert_train(dto: &TrainDto) -> Result<TrainReport, ConversionError> {
    let lines = dto
        .schedule
        .iter()
        .map(convert_line)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TrainReport {
        id: TrainId(dto.zid),
        name: dto.name.clone(),
        origin: dto.from.as_deref().and_then(parse_terminus),
        destination: dto.to.as_deref().and_then(parse_terminus),
        visible: dto.visible,
        at_platform: dto.at_platform,
        track: non_empty(dto.track.as_deref()),
        planned_track: non_empty(dto.planned_track.as_deref()),
        delay: dto.delay,
        user_text: non_empty(dto.user_text.as_deref()),
        lines,
    })
}

fn convert_line(dto: &ScheduleLineDto) -> Result<LineReport, ConversionError> {
    if dto.planned_track.trim().is_empty() {
        return Err(ConversionError::MissingField("planned_track"));
    }

    Ok(LineReport {
        track: non_empty(dto.track.as_deref()).unwrap_or_else(|| dto.planned_track.clone()),
        planned_track: dto.planned_track.clone(),
        arrival: parse_optional_time(dto.arrival.as_deref())?,
        departure: parse_optional_time(dto.departure.as_deref())?,
        flags: StopFlags::parse(&dto.flags),
        note: non_empty(dto.note.as_deref()),
    })
}

/// Convert a single event.
pub fn convert_event(dto: &EventDto) -> Result<TrainEvent, ConversionError> {
    let kind = match dto.kind {
        EventKindDto::Entry => EventKind::Entry,
        EventKindDto::Exit => EventKind::Exit,
        EventKindDto::Arrival => EventKind::Arrival,
        EventKindDto::Departure => EventKind::Departure,
        EventKindDto::RedSignal => EventKind::RedSignal,
        EventKindDto::GreenSignal => EventKind::GreenSignal,
    };

    Ok(TrainEvent {
        kind,
        train: TrainId(dto.zid),
        time: parse_optional_time(dto.time.as_deref())?,
        delay: dto.delay,
        planned_track: non_empty(dto.planned_track.as_deref()),
        at_platform: dto.at_platform,
    })
}

/// Split "Gleis X" into an in-layout platform, anything else is a boundary.
fn parse_terminus(s: &str) -> Option<Terminus> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    match s.strip_prefix(PLATFORM_PREFIX) {
        Some(platform) => Some(Terminus::Platform(platform.trim().to_string())),
        None => Some(Terminus::OffLayout(s.to_string())),
    }
}

fn parse_time(s: &str) -> Result<SimTime, ConversionError> {
    SimTime::parse(s).map_err(|_| ConversionError::InvalidTime(s.to_string()))
}

fn parse_optional_time(s: Option<&str>) -> Result<Option<SimTime>, ConversionError> {
    match s.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_time(s).map(Some),
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
