// Direction inference rules: position classification, consensus and sense labels
use super::error::SenseError;
use super::history::StartPoint;
use super::route::swap_description;
use super::spot::Spot;
use super::vehicle::UNKNOWN_SENSE;

/// Number of consecutive agreeing states needed before a direction is trusted.
pub const CONSENSUS_THRESHOLD: usize = 2;

/// Movement of a vehicle relative to the start of its itinerary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum PositionState {
    Approaching = -1,
    Stationary = 0,
    Receding = 1,
}

/// Compares `current` and `previous` against the fixed `reference`.
pub fn classify(current: Option<Spot>, previous: Option<Spot>, reference: &StartPoint) -> PositionState {
    let (Some(current), Some(previous), Some(reference)) = (current, previous, reference.spot()) else {
        return PositionState::Stationary;
    };

    let previous_distance = reference.distance_squared(&previous);
    let current_distance = reference.distance_squared(&current);

    if current_distance > previous_distance {
        PositionState::Receding
    } else if current_distance < previous_distance {
        PositionState::Approaching
    } else {
        PositionState::Stationary
    }
}

/// Classifies every sample of an oldest-first timeline against its predecessor.
/// The first sample has no predecessor and is always Stationary.
pub fn classify_timeline<'a>(
    timeline: impl IntoIterator<Item = &'a Spot>,
    reference: &StartPoint,
) -> Vec<PositionState> {
    let mut previous = None;
    timeline
        .into_iter()
        .map(|step| {
            let state = classify(Some(*step), previous, reference);
            previous = Some(*step);
            state
        })
        .collect()
}

/// Reduces a sequence of states to the most recent run of
/// [`CONSENSUS_THRESHOLD`] agreeing states, or Stationary if there is none.
pub fn reduce(states: &[PositionState], most_recent_last: bool) -> PositionState {
    if most_recent_last {
        reduce_newest_first(states.iter().rev().copied())
    } else {
        reduce_newest_first(states.iter().copied())
    }
}

fn reduce_newest_first(states: impl Iterator<Item = PositionState>) -> PositionState {
    let mut candidate: Option<PositionState> = None;
    let mut run = 0;

    for state in states {
        if candidate == Some(state) {
            run += 1;
            if run >= CONSENSUS_THRESHOLD {
                return state;
            }
        } else {
            candidate = Some(state);
            run = 1;
        }
    }

    PositionState::Stationary
}

/// Turns a direction signal into the sense label for a route description.
pub fn resolve_sense(description: &str, signal: PositionState) -> Result<String, SenseError> {
    match signal {
        PositionState::Receding => Ok(description.to_string()),
        PositionState::Approaching => swap_description(description),
        PositionState::Stationary => Ok(UNKNOWN_SENSE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::PositionState::{Approaching, Receding, Stationary};

    fn origin() -> StartPoint {
        StartPoint::from(Spot::new(0.0, 0.0))
    }

    #[test]
    fn test_classify_missing_inputs_is_stationary() {
        let here = Spot::new(1.0, 1.0);
        assert_eq!(classify(Some(here), None, &origin()), Stationary);
        assert_eq!(classify(None, Some(here), &origin()), Stationary);
        assert_eq!(classify(Some(here), Some(Spot::new(2.0, 2.0)), &StartPoint::default()), Stationary);

        let half = StartPoint {
            latitude: Some(0.0),
            longitude: None,
        };
        assert_eq!(classify(Some(here), Some(Spot::new(2.0, 2.0)), &half), Stationary);
    }

    #[test]
    fn test_classify_relative_to_reference() {
        let near = Spot::new(1.0, 1.0);
        let far = Spot::new(2.0, 2.0);
        assert_eq!(classify(Some(far), Some(near), &origin()), Receding);
        assert_eq!(classify(Some(near), Some(far), &origin()), Approaching);
        // same distance, different spot
        assert_eq!(classify(Some(Spot::new(-1.0, -1.0)), Some(near), &origin()), Stationary);
    }

    #[test]
    fn test_classify_timeline() {
        let timeline = [Spot::new(1.0, 0.0), Spot::new(2.0, 0.0), Spot::new(3.0, 0.0), Spot::new(1.0, 0.0)];
        assert_eq!(
            classify_timeline(&timeline, &origin()),
            vec![Stationary, Receding, Receding, Approaching]
        );
    }

    #[test]
    fn test_reduce_most_recent_first() {
        assert_eq!(reduce(&[Approaching, Approaching], false), Approaching);
        assert_eq!(reduce(&[Receding, Approaching, Approaching], false), Approaching);
        assert_eq!(reduce(&[Receding, Approaching], false), Stationary);
        assert_eq!(reduce(&[], false), Stationary);
        assert_eq!(reduce(&[Receding], false), Stationary);
    }

    #[test]
    fn test_reduce_most_recent_last() {
        // newest entries at the end: the newest run of two wins
        assert_eq!(reduce(&[Receding, Receding, Approaching, Approaching], true), Approaching);
        assert_eq!(reduce(&[Approaching, Approaching, Receding], true), Approaching);
        assert_eq!(reduce(&[Stationary, Receding, Approaching, Receding], true), Stationary);
    }

    #[test]
    fn test_reduce_stops_at_first_run() {
        assert_eq!(reduce(&[Receding, Receding, Approaching, Approaching, Approaching], false), Receding);
        assert_eq!(reduce(&[Stationary, Stationary, Receding, Receding], false), Stationary);
    }

    #[test]
    fn test_resolve_sense() {
        let description = "Downtown X Airport";
        assert_eq!(resolve_sense(description, Receding).unwrap(), description);
        assert_eq!(resolve_sense(description, Approaching).unwrap(), "Airport X Downtown");
        assert_eq!(resolve_sense(description, Stationary).unwrap(), UNKNOWN_SENSE);

        let swapped = resolve_sense(description, Approaching).unwrap();
        assert_eq!(resolve_sense(&swapped, Approaching).unwrap(), description);
    }

    #[test]
    fn test_resolve_sense_malformed() {
        assert!(matches!(
            resolve_sense("Downtown / Airport", Approaching),
            Err(SenseError::MalformedDescription { .. })
        ));
    }
}
