#![no_main]
use libfuzzer_sys::fuzz_target;

use chrono::{DateTime, Duration, Utc};
use launchgate_core::records::Vote;
use launchgate_core::types::{ApprovalRule, GateType, VoteState};
use launchgate_engine::gates::compute_gate_state;

fuzz_target!(|data: &[u8]| {
    // Each 3-byte chunk is one vote: voter, state code, minute offset.
    let start = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap_or_default();
    let votes: Vec<Vote> = data
        .chunks_exact(3)
        .enumerate()
        .filter_map(|(i, c)| {
            let state = VoteState::try_from(i32::from(c[1] % 12)).ok()?;
            Some(Vote {
                id: i as u64,
                feature_id: 1,
                gate_id: 1,
                gate_type: GateType::API_SHIP,
                state,
                set_on: start + Duration::minutes(i64::from(c[2])),
                set_by: format!("voter{}@example.com", c[0]),
            })
        })
        .collect();

    let answered: Vec<Vote> = votes
        .iter()
        .filter(|v| v.state != VoteState::NoResponse)
        .cloned()
        .collect();
    for rule in [ApprovalRule::OneLgtm, ApprovalRule::ThreeLgtm] {
        // NO_RESPONSE votes never change the outcome.
        assert_eq!(
            compute_gate_state(&votes, rule),
            compute_gate_state(&answered, rule)
        );
    }
});
