//! Resolution of replacement, coupling and split links between trains.

use std::collections::{BTreeMap, HashSet, VecDeque};

use tracing::{debug, warn};

use crate::domain::TrainId;

use super::config::PlanningConfig;
use super::stop::LinkStatus;
use super::train::TrainRecord;

/// Resolve the links of every train whose links are not resolved yet.
///
/// Works through a queue seeded with the unresolved trains; trains that
/// become link targets are queued as well so chains several trains deep are
/// handled in one call. Each train is visited at most once per call.
pub(super) fn resolve_links(trains: &mut BTreeMap<TrainId, TrainRecord>, config: &PlanningConfig) {
    let known: HashSet<TrainId> = trains.keys().copied().collect();
    let mut queue: VecDeque<TrainId> = trains
        .values()
        .filter(|t| !t.links_resolved)
        .map(|t| t.id)
        .collect();
    let mut visited = HashSet::new();

    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            continue;
        }
        let Some(train) = trains.get_mut(&id) else {
            continue;
        };
        if train.links_resolved {
            continue;
        }

        let mut complete = true;
        let mut found = Vec::new();
        for stop in &mut train.stops {
            for link in stop.links_mut() {
                if link.status != LinkStatus::Unresolved {
                    continue;
                }
                if known.contains(&link.target) {
                    link.status = LinkStatus::Resolved;
                    found.push(link.target);
                    continue;
                }

                link.failed_attempts += 1;
                match config.link_retry_cap {
                    Some(cap) if link.failed_attempts >= cap => {
                        warn!(
                            train = %id,
                            target = %link.target,
                            attempts = link.failed_attempts,
                            "linked train never appeared, giving up"
                        );
                        link.status = LinkStatus::PermanentlyMissing;
                    }
                    _ => complete = false,
                }
            }
        }
        train.links_resolved = complete;

        for target in found {
            debug!(train = %id, %target, "link resolved");
            if let Some(linked) = trains.get_mut(&target) {
                linked.parent = Some(id);
            }
            queue.push_back(target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LineReport, StopFlags, TrainReport};

    fn train(id: u32, flags: &str) -> TrainRecord {
        let mut report = TrainReport::new(TrainId(id), format!("RB {id}"));
        let mut line = LineReport::new("1");
        line.flags = StopFlags::parse(flags);
        report.lines = vec![line];
        TrainRecord::from_report(&report)
    }

    fn collection(records: Vec<TrainRecord>) -> BTreeMap<TrainId, TrainRecord> {
        records.into_iter().map(|r| (r.id, r)).collect()
    }

    #[test]
    fn chain_resolves_in_one_call() {
        let mut trains = collection(vec![train(1, "E(2)"), train(2, "E(3)"), train(3, "")]);

        resolve_links(&mut trains, &PlanningConfig::default());

        assert!(trains.values().all(|t| t.links_resolved));
        assert_eq!(trains[&TrainId(1)].parent, None);
        assert_eq!(trains[&TrainId(2)].parent, Some(TrainId(1)));
        assert_eq!(trains[&TrainId(3)].parent, Some(TrainId(2)));
        assert_eq!(trains[&TrainId(1)].stops[0].replacement_train(), Some(TrainId(2)));
    }

    #[test]
    fn forward_reference_resolves_later() {
        let mut trains = collection(vec![train(1, "K(9)")]);
        let config = PlanningConfig::default();

        resolve_links(&mut trains, &config);
        assert!(!trains[&TrainId(1)].links_resolved);
        let link = trains[&TrainId(1)].stops[0].coupling.clone().unwrap();
        assert_eq!(link.status, LinkStatus::Unresolved);
        assert_eq!(link.failed_attempts, 1);

        trains.insert(TrainId(9), train(9, ""));
        resolve_links(&mut trains, &config);

        assert!(trains[&TrainId(1)].links_resolved);
        assert_eq!(trains[&TrainId(9)].parent, Some(TrainId(1)));
    }

    #[test]
    fn retry_cap_gives_up() {
        let mut trains = collection(vec![train(1, "F(9)")]);
        let config = PlanningConfig {
            link_retry_cap: Some(2),
            ..PlanningConfig::default()
        };

        resolve_links(&mut trains, &config);
        assert!(!trains[&TrainId(1)].links_resolved);
        resolve_links(&mut trains, &config);

        let record = &trains[&TrainId(1)];
        assert!(record.links_resolved);
        let link = record.stops[0].split_off.as_ref().unwrap();
        assert_eq!(link.status, LinkStatus::PermanentlyMissing);
    }

    #[test]
    fn no_cap_retries_forever() {
        let mut trains = collection(vec![train(1, "E(9)")]);
        let config = PlanningConfig::default();

        for _ in 0..50 {
            resolve_links(&mut trains, &config);
        }

        let link = trains[&TrainId(1)].stops[0].replacement.clone().unwrap();
        assert_eq!(link.status, LinkStatus::Unresolved);
        assert_eq!(link.failed_attempts, 50);
    }

    #[test]
    fn cyclic_links_terminate() {
        let mut trains = collection(vec![train(1, "E(2)"), train(2, "E(1)")]);

        resolve_links(&mut trains, &PlanningConfig::default());

        assert_eq!(trains[&TrainId(1)].parent, Some(TrainId(2)));
        assert_eq!(trains[&TrainId(2)].parent, Some(TrainId(1)));
    }
}
