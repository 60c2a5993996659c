//! Domain types shared by the feed, planning and web layers.
//!
//! These are small validated value types. Anything that holds one can
//! trust it was parsed successfully.

mod flags;
mod report;
mod time;
mod train_id;

pub use flags::StopFlags;
pub use report::{EventKind, Frame, LineReport, Terminus, TrainEvent, TrainReport};
pub use time::{MINUTES_PER_DAY, SimTime, TimeError};
pub use train_id::{TrainId, train_category, train_number};
