//! Delay propagation and dependency resolution.
//!
//! Keeps a persistent schedule model of every train seen in the feed.
//! Unlike the feed, stops are never dropped once observed. Trains are
//! linked by replacement, coupling and split flags; delays flow along each
//! train's stops and across those links, shaped by per-stop correction
//! strategies.

mod assign;
mod config;
mod correction;
mod error;
mod estimate;
mod planner;
mod propagate;
mod resolve;
mod stop;
mod train;


pub use config::PlanningConfig;
pub use correction::{Correction, PropagationContext, Resolution};
pub use error::PlanningError;
pub use estimate::{ObservedTravelTimes, TravelTimeEstimator};
pub use planner::{OverrideCommand, Planning};
pub use stop::{LinkStatus, ScheduleStop, StopKey, StopKind, StopLink, StopRef};
pub use train::TrainRecord;
