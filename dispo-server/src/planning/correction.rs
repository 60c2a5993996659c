//! Delay correction strategies.
//!
//! Every stop carries two correction slots: an automatic one derived from
//! the schedule, and a dispatcher one set by an operator. A correction reads
//! the stop's arrival delay (and possibly a stop of another train) and
//! writes the stop's departure delay. Corrections touch other trains only by
//! asking the context to propagate them.

use std::fmt;

use tracing::{trace, warn};

use crate::domain::TrainId;

use super::config::PlanningConfig;
use super::stop::{ScheduleStop, StopRef};

/// Capabilities a correction needs from the planning model.
///
/// Passed explicitly to every `apply` call so strategies hold no reference
/// to the model themselves.
pub trait PropagationContext {
    fn config(&self) -> &PlanningConfig;

    fn stop(&self, at: StopRef) -> Option<&ScheduleStop>;

    fn stop_mut(&mut self, at: StopRef) -> Option<&mut ScheduleStop>;

    /// Index of the first stop of `train` whose planned location is `location`.
    fn find_stop(&self, train: TrainId, location: &str) -> Option<usize>;

    /// Overwrite the reported delay a train's propagation starts from.
    fn set_train_delay(&mut self, train: TrainId, delay: i64);

    /// Propagate delays along `train` from its current position, stopping
    /// before `end` (or at the end of its schedule).
    fn propagate_train(&mut self, train: TrainId, end: Option<usize>);

    /// Make sure `train` has been propagated in the current pass before its
    /// estimates are read. No-op if it already was.
    fn settle(&mut self, train: TrainId);
}

/// A delay correction strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correction {
    /// No strategy; the departure delay stays at the arrival delay.
    None,
    /// Departure delay set to a fixed value (may be negative).
    FixedDelay(i64),
    /// Depart on schedule, absorbing delay down to the minimum dwell.
    ScheduledDeparture,
    /// Do not depart before `origin` has arrived plus `extra_wait` minutes.
    WaitForArrival { origin: StopRef, extra_wait: i64 },
    /// Do not depart before `origin` has departed plus `extra_wait` minutes.
    WaitForDeparture { origin: StopRef, extra_wait: i64 },
    /// The train ends here and continues under the replacement train's number.
    Replacement,
    /// The train couples into its partner here.
    Coupling,
    /// Another train splits off here.
    Splitting,
}

/// Outcome of applying a correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved,
    /// Required input is missing; the stop was left unchanged.
    Pending(&'static str),
}

impl Correction {
    /// Compute the departure delay of the stop at `at`.
    pub fn apply<C: PropagationContext + ?Sized>(&self, ctx: &mut C, at: StopRef) -> Resolution {
        match self {
            Correction::None => Resolution::Resolved,
            Correction::FixedDelay(delay) => match ctx.stop_mut(at) {
                Some(stop) => {
                    stop.departure_delay = Some(*delay);
                    Resolution::Resolved
                }
                None => Resolution::Pending("unknown stop"),
            },
            Correction::ScheduledDeparture => apply_scheduled(ctx, at),
            Correction::WaitForArrival { origin, extra_wait } => {
                apply_wait(ctx, at, *origin, *extra_wait, WaitFor::Arrival)
            }
            Correction::WaitForDeparture { origin, extra_wait } => {
                apply_wait(ctx, at, *origin, *extra_wait, WaitFor::Departure)
            }
            Correction::Replacement => apply_replacement(ctx, at),
            Correction::Coupling => apply_coupling(ctx, at),
            Correction::Splitting => apply_splitting(ctx, at),
        }
    }

    /// Propagate linked trains from a stop that has already been passed.
    ///
    /// The stop's own values are observed and stay as they are, but trains
    /// depending on it still need their delays updated.
    pub fn forward<C: PropagationContext + ?Sized>(&self, ctx: &mut C, at: StopRef) {
        let Some(stop) = ctx.stop(at) else {
            return;
        };
        let linked = match self {
            Correction::Replacement => stop.replacement_train(),
            Correction::Coupling => stop.coupling_train(),
            Correction::Splitting => stop.split_off_train(),
            _ => None,
        };
        if let Some(train) = linked {
            ctx.propagate_train(train, None);
        }
    }

    /// Returns true for `Correction::None`.
    pub fn is_none(&self) -> bool {
        matches!(self, Correction::None)
    }
}

impl fmt::Display for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Correction::None => write!(f, "-"),
            Correction::FixedDelay(delay) => write!(f, "Fixed({delay:+})"),
            Correction::ScheduledDeparture => write!(f, "Scheduled"),
            Correction::WaitForArrival { origin, extra_wait } => {
                write!(f, "WaitArrival({origin}, {extra_wait:+})")
            }
            Correction::WaitForDeparture { origin, extra_wait } => {
                write!(f, "WaitDeparture({origin}, {extra_wait:+})")
            }
            Correction::Replacement => write!(f, "Replacement"),
            Correction::Coupling => write!(f, "Coupling"),
            Correction::Splitting => write!(f, "Splitting"),
        }
    }
}

/// Schedule rule result, all values in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Floor {
    pub planned_departure: i64,
    pub arrival: i64,
    pub departure: i64,
    /// Earliest departure allowed: minimum dwell after the arrival, and not
    /// before a signal hold is released.
    pub earliest: i64,
}

/// The schedule rule: depart at the planned time, or after the minimum
/// dwell if the train arrives too late for that.
///
/// With `require_arrival`, stops without a planned arrival are not
/// resolvable; otherwise such stops have no dwell. `None` also if the
/// arrival delay is not known yet.
pub(super) fn schedule_floor(
    stop: &ScheduleStop,
    min_dwell: i64,
    require_arrival: bool,
) -> Option<Floor> {
    let min_dwell = match stop.planned_arrival {
        Some(_) => min_dwell,
        None if require_arrival => return None,
        None => 0,
    };
    let (planned_arrival, planned_departure) = stop.planned_minutes()?;
    let arrival = planned_arrival + stop.arrival_delay?;
    let dwell = (planned_departure - arrival).max(min_dwell);
    let mut earliest = arrival + min_dwell;
    if let Some(hold) = stop.signal_hold {
        earliest = earliest.max(planned_departure + hold);
    }
    Some(Floor {
        planned_departure,
        arrival,
        departure: (arrival + dwell).max(earliest),
        earliest,
    })
}

/// Raise the departure delay so the stop keeps its minimum dwell and
/// waits out a signal hold.
///
/// Returns true if the departure delay was changed.
pub(super) fn enforce_dwell_floor(stop: &mut ScheduleStop) -> bool {
    let Some(floor) = schedule_floor(stop, stop.effective_min_dwell(), false) else {
        return false;
    };
    let earliest = floor.earliest - floor.planned_departure;
    match stop.departure_delay {
        Some(delay) if delay >= earliest => false,
        _ => {
            stop.departure_delay = Some(earliest);
            true
        }
    }
}

fn apply_scheduled<C: PropagationContext + ?Sized>(ctx: &mut C, at: StopRef) -> Resolution {
    let Some(stop) = ctx.stop_mut(at) else {
        return Resolution::Pending("unknown stop");
    };
    let Some(floor) = schedule_floor(stop, stop.effective_min_dwell(), true) else {
        trace!(stop = %at, "no planned arrival, departure delay unchanged");
        return Resolution::Pending("no planned arrival");
    };
    stop.departure_delay = Some(floor.departure - floor.planned_departure);
    Resolution::Resolved
}

#[derive(Debug, Clone, Copy)]
enum WaitFor {
    Arrival,
    Departure,
}

fn apply_wait<C: PropagationContext + ?Sized>(
    ctx: &mut C,
    at: StopRef,
    origin: StopRef,
    extra_wait: i64,
    which: WaitFor,
) -> Resolution {
    ctx.settle(origin.train);

    let Some(stop) = ctx.stop(at) else {
        return Resolution::Pending("unknown stop");
    };
    let Some(floor) = schedule_floor(stop, stop.effective_min_dwell(), false) else {
        return Resolution::Pending("no planned time");
    };

    let origin_time = ctx.stop(origin).and_then(|o| match which {
        WaitFor::Arrival => o.estimated_arrival(),
        WaitFor::Departure => o.estimated_departure(),
    });
    let Some(origin_time) = origin_time else {
        return Resolution::Pending("origin not estimated");
    };

    let ready = origin_time.minutes_relative_to(floor.arrival) + extra_wait;
    let departure = floor.departure.max(ready);

    if let Some(stop) = ctx.stop_mut(at) {
        stop.departure_delay = Some(departure - floor.planned_departure);
    }
    Resolution::Resolved
}

fn apply_replacement<C: PropagationContext + ?Sized>(ctx: &mut C, at: StopRef) -> Resolution {
    let Some(stop) = ctx.stop_mut(at) else {
        return Resolution::Pending("unknown stop");
    };
    let Some(floor) = schedule_floor(stop, stop.effective_min_dwell(), true) else {
        return Resolution::Pending("no planned arrival");
    };
    let delay = floor.departure - floor.planned_departure;
    stop.departure_delay = Some(delay);

    if let Some(successor) = stop.replacement_train() {
        ctx.set_train_delay(successor, delay);
        ctx.propagate_train(successor, None);
    }
    Resolution::Resolved
}

fn apply_coupling<C: PropagationContext + ?Sized>(ctx: &mut C, at: StopRef) -> Resolution {
    let Some(stop) = ctx.stop(at) else {
        return Resolution::Pending("unknown stop");
    };
    let Some(planned_arrival) = stop.planned_arrival.map(|t| t.minutes()) else {
        return Resolution::Pending("no planned arrival");
    };
    let partner = stop.coupling_train();
    let location = stop.location.clone();

    // the partner's arrival at the coupling point must be known first
    let partner_stop = partner
        .and_then(|train| ctx.find_stop(train, &location).map(|i| StopRef::new(train, i)));
    if let Some(partner_stop) = partner_stop {
        ctx.propagate_train(partner_stop.train, Some(partner_stop.index + 1));
    }
    let partner_arrival = partner_stop
        .and_then(|p| ctx.stop(p))
        .and_then(ScheduleStop::estimated_arrival)
        .map(|t| t.minutes_relative_to(planned_arrival));

    let window = ctx.config().coupling_window_mins;
    let cap = ctx.config().coupling_nudge_cap;

    let Some(stop) = ctx.stop_mut(at) else {
        return Resolution::Pending("unknown stop");
    };
    let Some(mut arrival_delay) = stop.arrival_delay else {
        return Resolution::Pending("arrival delay unknown");
    };

    if let Some(partner_arrival) = partner_arrival {
        let mut nudges = 0;
        while (partner_arrival - (planned_arrival + arrival_delay)).abs() < window {
            if nudges >= cap {
                warn!(stop = %at, nudges, "coupling arrivals still collide, giving up");
                break;
            }
            arrival_delay += 1;
            nudges += 1;
        }
    }
    stop.arrival_delay = Some(arrival_delay);

    let Some(floor) = schedule_floor(stop, stop.effective_min_dwell(), true) else {
        return Resolution::Pending("no planned arrival");
    };
    let departure = match partner_arrival {
        Some(partner_arrival) => floor.departure.max(partner_arrival),
        None => floor.departure,
    };
    stop.departure_delay = Some(departure - floor.planned_departure);

    // our arrival may have moved, and the partner waits for it
    if let Some(partner) = partner {
        ctx.propagate_train(partner, None);
    }
    Resolution::Resolved
}

fn apply_splitting<C: PropagationContext + ?Sized>(ctx: &mut C, at: StopRef) -> Resolution {
    let split_dwell = ctx.config().split_dwell_mins;
    let Some(stop) = ctx.stop_mut(at) else {
        return Resolution::Pending("unknown stop");
    };
    let min_dwell = stop.effective_min_dwell().max(split_dwell);
    let Some(floor) = schedule_floor(stop, min_dwell, true) else {
        return Resolution::Pending("no planned arrival");
    };
    stop.departure_delay = Some(floor.departure - floor.planned_departure);

    let arrival_delay = floor.arrival - stop.planned_arrival.map_or(0, |t| t.minutes());
    if let Some(child) = stop.split_off_train() {
        ctx.set_train_delay(child, arrival_delay);
        if let Some(first) = ctx.stop_mut(StopRef::new(child, 0)) {
            first.arrival_delay = Some(arrival_delay);
        }
        ctx.propagate_train(child, None);
    }
    Resolution::Resolved
}
