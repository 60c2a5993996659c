//! Planning error types.
//!
//! Only operator commands can fail. Feed data never does: missing or
//! inconsistent data leaves delays unknown instead.

use crate::domain::TrainId;

use super::stop::StopRef;

/// Errors from operator override commands.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanningError {
    /// No train with this id is known
    #[error("unknown train: {0}")]
    UnknownTrain(TrainId),

    /// The train has no stop at this index
    #[error("train {train} has no stop {index}")]
    StopOutOfRange { train: TrainId, index: usize },

    /// The stop to wait for does not exist
    #[error("unknown origin stop: {0}")]
    UnknownOrigin(StopRef),

    /// A stop cannot wait for itself
    #[error("stop {0} cannot wait for itself")]
    SelfReference(StopRef),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = PlanningError::UnknownTrain(TrainId(42));
        assert_eq!(err.to_string(), "unknown train: 42");

        let err = PlanningError::StopOutOfRange {
            train: TrainId(42),
            index: 9,
        };
        assert_eq!(err.to_string(), "train 42 has no stop 9");

        let err = PlanningError::SelfReference(StopRef::new(TrainId(1), 2));
        assert_eq!(err.to_string(), "stop 1#2 cannot wait for itself");
    }
}
