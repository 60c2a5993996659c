//! Simulator feed frames.
//!
//! The simulator bridge writes one JSON frame per polling cycle: the full
//! train list plus the events since the previous frame. This module
//! deserializes frames, converts them into validated domain reports and can
//! replay recorded frames from disk.

mod convert;
mod error;
mod replay;
mod types;

pub use convert::{ConversionError, convert_event, convert_frame, convert_train};
pub use error::FeedError;
pub use replay::ReplayFeed;
pub use types::{EventDto, EventKindDto, FeedFrameDto, ScheduleLineDto, TrainDto};
