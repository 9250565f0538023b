use launchgate_core::catalog::GateCatalog;
use launchgate_core::records::{Gate, Vote};
use launchgate_core::types::{ApprovalRule, GateState, VoteState};

/// Vote states that reflect an ongoing or reopened review. The most recent
/// one wins when no quorum has been reached.
const OPEN_REVIEW_STATES: [VoteState; 6] = [
    VoteState::NeedsWork,
    VoteState::ReviewStarted,
    VoteState::ReviewRequested,
    VoteState::Denied,
    VoteState::InternalReview,
    VoteState::NaRequested,
];

/// Compute the state a gate should have from its votes.
///
/// `votes` holds the latest vote of each voter on one gate. Priority:
/// 1. `NO_RESPONSE` votes are ignored
/// 2. A lone self-certified `NA_SELF` on a one-LGTM gate gives `NA_SELF`;
///    with a second reviewer's `NA_VERIFIED` it becomes `NA_VERIFIED`
/// 3. Quorum of `APPROVED`/`NA` gives `APPROVED`, or `NA` if any vote is `NA`
/// 4. Otherwise the most recent open-review vote decides
/// 5. A partial three-LGTM quorum counts as `REVIEW_REQUESTED`
/// 6. Otherwise `PREPARING`
///
/// Step 4 ties on `set_on` go to the earlier vote in `votes`. Callers must not
/// rely on that order.
pub fn compute_gate_state(votes: &[Vote], rule: ApprovalRule) -> GateState {
    let counted: Vec<&Vote> = votes
        .iter()
        .filter(|v| v.state != VoteState::NoResponse)
        .collect();
    let count = |state: VoteState| counted.iter().filter(|v| v.state == state).count();

    if rule == ApprovalRule::OneLgtm && count(VoteState::NaSelf) == 1 {
        if counted.len() == 1 {
            return GateState::NaSelf;
        }
        if count(VoteState::NaVerified) >= 1 {
            return GateState::NaVerified;
        }
    }

    let na_votes = count(VoteState::Na);
    let lgtms = count(VoteState::Approved) + na_votes;
    if lgtms >= rule.quorum() {
        return if na_votes > 0 {
            GateState::Na
        } else {
            GateState::Approved
        };
    }

    let latest_open = counted
        .iter()
        .filter(|v| OPEN_REVIEW_STATES.contains(&v.state))
        .fold(None::<&Vote>, |best, v| match best {
            Some(b) if b.set_on >= v.set_on => Some(b),
            _ => Some(v),
        });
    if let Some(vote) = latest_open {
        return GateState::from(vote.state);
    }

    // An API Owner can start review of an undetected intent by voting LGTM.
    if rule == ApprovalRule::ThreeLgtm && lgtms >= 1 {
        return GateState::ReviewRequested;
    }

    GateState::Preparing
}

/// Set `gate.state` from its votes. Returns true if the state changed.
pub fn update_gate_approval_state(gate: &mut Gate, votes: &[Vote], catalog: &GateCatalog) -> bool {
    let new_state = compute_gate_state(votes, catalog.rule_for(gate.gate_type));
    if new_state == gate.state {
        return false;
    }
    gate.state = new_state;
    true
}
