//! Automatic correction assignment from schedule flags.

use std::collections::BTreeMap;

use tracing::trace;

use crate::domain::TrainId;

use super::config::PlanningConfig;
use super::correction::Correction;
use super::stop::{LinkStatus, ScheduleStop, StopLink, StopRef};
use super::train::TrainRecord;

/// A stop of another train that receives a correction from this one.
#[derive(Debug)]
enum RemoteStop {
    First(TrainId),
    AtLocation(TrainId, String),
}

/// Assign automatic corrections to every train not fully assigned yet.
///
/// A train counts as assigned once its links are resolved and every stop
/// could be handled; until then it is revisited on every call.
pub(super) fn assign_strategies(
    trains: &mut BTreeMap<TrainId, TrainRecord>,
    config: &PlanningConfig,
) {
    let pending: Vec<TrainId> = trains
        .values()
        .filter(|t| !t.strategies_assigned)
        .map(|t| t.id)
        .collect();

    for id in pending {
        let Some(train) = trains.get_mut(&id) else {
            continue;
        };

        let mut remote = Vec::new();
        let mut complete = true;
        for (index, stop) in train.stops.iter_mut().enumerate() {
            complete &= assign_stop(stop, StopRef::new(id, index), config, &mut remote);
        }
        let links_resolved = train.links_resolved;

        for (target, correction) in remote {
            match remote_stop(trains, &target) {
                Some(stop) => stop.automatic = correction,
                None => {
                    trace!(train = %id, ?target, "linked stop not found");
                    complete = false;
                }
            }
        }

        if let Some(train) = trains.get_mut(&id) {
            train.strategies_assigned = links_resolved && complete;
        }
    }
}

/// Assign the automatic correction of one stop.
///
/// Corrections for linked trains' stops are pushed to `remote`. Returns
/// false if a link the stop depends on is not resolved yet.
fn assign_stop(
    stop: &mut ScheduleStop,
    at: StopRef,
    config: &PlanningConfig,
    remote: &mut Vec<(RemoteStop, Correction)>,
) -> bool {
    if stop.flags.reversal {
        stop.min_dwell = config.reversal_dwell_mins;
    } else if stop.flags.loco_cycle {
        stop.min_dwell = config.loco_cycle_dwell_mins;
    } else if stop.flags.loco_change {
        stop.min_dwell = config.loco_change_dwell_mins;
    }

    if stop.is_dwell_exempt() {
        if stop.automatic.is_none() {
            stop.automatic = Correction::ScheduledDeparture;
        }
        return true;
    }

    if let Some(link) = &stop.replacement {
        let ok = link_target(link, |train| {
            remote.push((
                RemoteStop::First(train),
                Correction::WaitForArrival { origin: at, extra_wait: 0 },
            ))
        });
        stop.automatic = Correction::Replacement;
        ok
    } else if let Some(link) = &stop.coupling {
        let location = stop.location.clone();
        let ok = link_target(link, |train| {
            remote.push((
                RemoteStop::AtLocation(train, location),
                Correction::WaitForArrival { origin: at, extra_wait: 0 },
            ))
        });
        stop.automatic = Correction::Coupling;
        ok
    } else if let Some(link) = &stop.split_off {
        let ok = link_target(link, |train| {
            remote.push((
                RemoteStop::First(train),
                Correction::WaitForDeparture {
                    origin: at,
                    extra_wait: config.split_wait_mins,
                },
            ))
        });
        stop.automatic = Correction::Splitting;
        stop.min_dwell = stop.min_dwell.max(config.split_dwell_mins);
        ok
    } else {
        if stop.automatic.is_none() {
            stop.automatic = Correction::ScheduledDeparture;
        }
        true
    }
}

/// Run `on_resolved` for a resolved link. Links that will never resolve
/// count as handled.
fn link_target(link: &StopLink, on_resolved: impl FnOnce(TrainId)) -> bool {
    match link.status {
        LinkStatus::Resolved => {
            on_resolved(link.target);
            true
        }
        LinkStatus::Unresolved => false,
        LinkStatus::PermanentlyMissing => true,
    }
}

fn remote_stop<'a>(
    trains: &'a mut BTreeMap<TrainId, TrainRecord>,
    target: &RemoteStop,
) -> Option<&'a mut ScheduleStop> {
    match target {
        RemoteStop::First(train) => trains.get_mut(train)?.stops.first_mut(),
        RemoteStop::AtLocation(train, location) => {
            let record = trains.get_mut(train)?;
            let index = record.find_stop(location)?;
            record.stops.get_mut(index)
        }
    }
}
