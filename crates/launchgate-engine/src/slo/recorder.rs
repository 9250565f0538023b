use std::collections::HashSet;
use std::sync::Arc;

use launchgate_core::records::{Gate, Vote};
use launchgate_core::traits::{Clock, SloRecorder};
use launchgate_core::types::{GateState, VoteState};

/// Stamps `requested_on`, `responded_on` and `resolved_on` as reviews progress.
pub struct DefaultSloRecorder {
    clock: Arc<dyn Clock>,
}

impl DefaultSloRecorder {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl SloRecorder for DefaultSloRecorder {
    fn record_vote(&self, gate: &mut Gate, votes: &[Vote], old_state: GateState) -> bool {
        let now = self.clock.now();
        let mut changed = false;

        // A new request, or a request after the last review was resolved,
        // restarts the clock.
        if gate.state.is_requested() && (gate.requested_on.is_none() || gate.resolved_on.is_some())
        {
            tracing::debug!(gate_id = gate.id, %old_state, "review requested");
            gate.requested_on = Some(now);
            gate.responded_on = None;
            gate.resolved_on = None;
            changed = true;
        }

        if let (Some(requested_on), None) = (gate.requested_on, gate.responded_on) {
            let requesters: HashSet<&str> = votes
                .iter()
                .filter(|v| v.state.is_request())
                .map(|v| v.set_by.as_str())
                .collect();
            let responded = votes.iter().any(|v| {
                v.set_on >= requested_on
                    && !v.state.is_request()
                    && v.state != VoteState::NoResponse
                    && !requesters.contains(v.set_by.as_str())
            });
            if responded {
                gate.responded_on = Some(now);
                changed = true;
            }
        }

        if gate.state.is_resolved() && gate.resolved_on.is_none() {
            gate.resolved_on = Some(now);
            changed = true;
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualClock;
    use chrono::Duration;
    use launchgate_core::types::GateType;

    fn vote(id: u64, voter: &str, state: VoteState, clock: &ManualClock) -> Vote {
        Vote {
            id,
            feature_id: 1,
            gate_id: 1,
            gate_type: GateType::PRIVACY_SHIP,
            state,
            set_on: clock.now(),
            set_by: voter.to_string(),
        }
    }

    #[test]
    fn request_response_resolution_are_stamped() {
        let clock = Arc::new(ManualClock::default());
        let recorder = DefaultSloRecorder::new(clock.clone());
        let mut gate = Gate::new(1, 1, GateType::PRIVACY_SHIP, clock.now());

        let mut votes = vec![vote(1, "owner@x.com", VoteState::ReviewRequested, &clock)];
        gate.state = GateState::ReviewRequested;
        assert!(recorder.record_vote(&mut gate, &votes, GateState::Preparing));
        let requested = clock.now();
        assert_eq!(gate.requested_on, Some(requested));
        assert!(gate.responded_on.is_none());

        // Re-recording with nothing new changes nothing.
        assert!(!recorder.record_vote(&mut gate, &votes, GateState::ReviewRequested));

        clock.advance(Duration::days(1));
        votes.push(vote(2, "rev@x.com", VoteState::ReviewStarted, &clock));
        gate.state = GateState::ReviewStarted;
        assert!(recorder.record_vote(&mut gate, &votes, GateState::ReviewRequested));
        assert_eq!(gate.requested_on, Some(requested));
        assert_eq!(gate.responded_on, Some(clock.now()));
        assert!(gate.resolved_on.is_none());

        clock.advance(Duration::days(1));
        votes[1] = vote(2, "rev@x.com", VoteState::Approved, &clock);
        gate.state = GateState::Approved;
        assert!(recorder.record_vote(&mut gate, &votes, GateState::ReviewStarted));
        assert_eq!(gate.resolved_on, Some(clock.now()));
    }

    #[test]
    fn requester_activity_is_not_a_response() {
        let clock = Arc::new(ManualClock::default());
        let recorder = DefaultSloRecorder::new(clock.clone());
        let mut gate = Gate::new(1, 1, GateType::PRIVACY_SHIP, clock.now());
        gate.state = GateState::ReviewRequested;
        let votes = vec![
            vote(1, "owner@x.com", VoteState::ReviewRequested, &clock),
            vote(2, "idle@x.com", VoteState::NoResponse, &clock),
        ];
        recorder.record_vote(&mut gate, &votes, GateState::Preparing);
        assert!(gate.requested_on.is_some());
        assert!(gate.responded_on.is_none());
    }

    #[test]
    fn re_request_after_resolution_restarts() {
        let clock = Arc::new(ManualClock::default());
        let recorder = DefaultSloRecorder::new(clock.clone());
        let mut gate = Gate::new(1, 1, GateType::PRIVACY_SHIP, clock.now());
        gate.requested_on = Some(clock.now());
        gate.responded_on = Some(clock.now());
        gate.resolved_on = Some(clock.now());

        clock.advance(Duration::days(3));
        gate.state = GateState::ReviewRequested;
        let votes = vec![vote(1, "owner@x.com", VoteState::ReviewRequested, &clock)];
        assert!(recorder.record_vote(&mut gate, &votes, GateState::Denied));
        assert_eq!(gate.requested_on, Some(clock.now()));
        assert!(gate.responded_on.is_none());
        assert!(gate.resolved_on.is_none());
    }

    #[test]
    fn self_certified_na_is_not_resolved() {
        let clock = Arc::new(ManualClock::default());
        let recorder = DefaultSloRecorder::new(clock.clone());
        let mut gate = Gate::new(1, 1, GateType::PRIVACY_SHIP, clock.now());
        gate.state = GateState::NaSelf;
        let votes = vec![vote(1, "owner@x.com", VoteState::NaSelf, &clock)];
        assert!(!recorder.record_vote(&mut gate, &votes, GateState::Preparing));
        assert!(gate.resolved_on.is_none());
    }
}
