use std::sync::Arc;

use tracing::{info, warn};

use launchgate_core::catalog::GateCatalog;
use launchgate_core::errors::GateError;
use launchgate_core::records::{FeatureId, Gate, GateId, Vote, VoteDraft};
use launchgate_core::traits::{Clock, GateStore, SloRecorder};
use launchgate_core::types::{GateState, GateType, VoteState};

use super::aggregator::update_gate_approval_state;

/// Which gate of a feature a vote is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTarget {
    Id(GateId),
    /// The first gate of this type on the feature.
    Type(GateType),
}

/// Records votes and keeps each gate's cached state in step with them.
pub struct VoteCoordinator {
    store: Arc<dyn GateStore>,
    catalog: Arc<GateCatalog>,
    slo: Arc<dyn SloRecorder>,
    clock: Arc<dyn Clock>,
}

impl VoteCoordinator {
    pub fn new(
        store: Arc<dyn GateStore>,
        catalog: Arc<GateCatalog>,
        slo: Arc<dyn SloRecorder>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            catalog,
            slo,
            clock,
        }
    }

    /// Submit a vote given as a raw state code. Codes outside 1..=11 are
    /// rejected before anything is read or written.
    pub fn submit_vote_code(
        &self,
        feature_id: FeatureId,
        target: GateTarget,
        code: i32,
        voter: &str,
    ) -> Result<Option<GateState>, GateError> {
        let state = VoteState::try_from(code)?;
        self.submit_vote(feature_id, target, state, voter)
    }

    /// Add or update `voter`'s vote and recompute the gate.
    ///
    /// Returns the gate's state when the state or its SLO fields changed,
    /// `None` otherwise. Also `None` when the gate does not exist or when a
    /// concurrent submission by the same voter won.
    pub fn submit_vote(
        &self,
        feature_id: FeatureId,
        target: GateTarget,
        new_state: VoteState,
        voter: &str,
    ) -> Result<Option<GateState>, GateError> {
        if voter.trim().is_empty() {
            return Err(GateError::InvalidInput("voter email is empty".into()));
        }
        let Some(gate) = self.find_gate(feature_id, target)? else {
            warn!(feature_id, ?target, "gate not found for feature, cannot set vote");
            return Ok(None);
        };

        let now = self.clock.now();
        let write = self.store.upsert_vote(VoteDraft {
            feature_id,
            gate_id: gate.id,
            gate_type: gate.gate_type,
            state: new_state,
            set_on: now,
            set_by: voter.to_string(),
        })?;

        let votes = self.store.votes_for_gate(gate.id)?;
        // Two first-time submissions by one voter can both insert. The one
        // that finds an older row backs out.
        let lost_race = write.created
            && votes
                .iter()
                .any(|v| v.id != write.vote.id && v.set_by == voter && v.set_on < now);
        if lost_race {
            info!(gate_id = gate.id, voter, "duplicate vote detected, backing out");
            self.store.delete_vote(write.vote.id)?;
            return Ok(None);
        }

        // Recompute from the votes as they stand when the gate row is written,
        // not from the snapshot above.
        let mut old_state = gate.state;
        let updated = self.store.update_gate(gate.id, &mut |current: &mut Gate, votes: &[Vote]| {
            old_state = current.state;
            let state_changed = update_gate_approval_state(current, votes, &self.catalog);
            let slo_changed = self.slo.record_vote(current, votes, old_state);
            if state_changed || slo_changed {
                current.updated_on = now;
            }
            state_changed || slo_changed
        })?;
        let Some(gate) = updated else {
            return Ok(None);
        };
        info!(
            gate_id = gate.id,
            gate_type = %gate.gate_type,
            %old_state,
            new_state = %gate.state,
            "gate updated"
        );
        Ok(Some(gate.state))
    }

    /// Provision a gate for a feature. It starts out `PREPARING`.
    pub fn create_gate(
        &self,
        feature_id: FeatureId,
        gate_type: GateType,
        stage_id: Option<u64>,
    ) -> Result<Gate, GateError> {
        if !self.catalog.contains(gate_type) {
            return Err(GateError::UnknownGateType(gate_type));
        }
        let gate = self
            .store
            .create_gate(feature_id, gate_type, stage_id, self.clock.now())?;
        info!(gate_id = gate.id, feature_id, %gate_type, "gate created");
        Ok(gate)
    }

    /// Recompute stored gate states from their votes, for one feature or for
    /// all of them. Returns how many gates changed.
    pub fn reevaluate_gates(&self, feature_id: Option<FeatureId>) -> Result<usize, GateError> {
        let gates = match feature_id {
            Some(id) => self.store.gates_for_feature(id)?,
            None => self.store.all_gates()?,
        };
        let now = self.clock.now();
        let mut changed = 0;
        for gate in gates {
            let mut old_state = gate.state;
            let updated = self.store.update_gate(gate.id, &mut |current: &mut Gate, votes: &[Vote]| {
                old_state = current.state;
                let state_changed = update_gate_approval_state(current, votes, &self.catalog);
                if state_changed {
                    current.updated_on = now;
                }
                state_changed
            })?;
            if let Some(gate) = updated {
                info!(gate_id = gate.id, %old_state, new_state = %gate.state, "gate re-evaluated");
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn find_gate(&self, feature_id: FeatureId, target: GateTarget) -> Result<Option<Gate>, GateError> {
        let gate = match target {
            GateTarget::Type(gate_type) => self
                .store
                .gates_by_type(feature_id, gate_type)?
                .into_iter()
                .next(),
            GateTarget::Id(id) => self
                .store
                .get_gate(id)?
                .filter(|g| g.feature_id == feature_id),
        };
        Ok(gate)
    }
}
