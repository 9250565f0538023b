use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use launchgate_core::errors::StoreError;
use launchgate_core::records::{
    FeatureId, Gate, GateDef, GateId, OwnersFile, Vote, VoteDraft, VoteId, VoteWrite,
};
use launchgate_core::types::GateType;

/// Full contents of a store. Shared by the memory and file backends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub next_gate_id: GateId,
    #[serde(default)]
    pub next_vote_id: VoteId,
    #[serde(default)]
    pub gates: Vec<Gate>,
    #[serde(default)]
    pub votes: Vec<Vote>,
    #[serde(default)]
    pub gate_defs: Vec<GateDef>,
    #[serde(default)]
    pub owners_files: Vec<OwnersFile>,
}

impl StoreData {
    pub fn get_gate(&self, id: GateId) -> Option<Gate> {
        self.gates.iter().find(|g| g.id == id).cloned()
    }

    pub fn gates_where(&self, pred: impl Fn(&Gate) -> bool) -> Vec<Gate> {
        self.gates.iter().filter(|g| pred(g)).cloned().collect()
    }

    pub fn create_gate(
        &mut self,
        feature_id: FeatureId,
        gate_type: GateType,
        stage_id: Option<u64>,
        now: DateTime<Utc>,
    ) -> Gate {
        self.next_gate_id += 1;
        let mut gate = Gate::new(self.next_gate_id, feature_id, gate_type, now);
        gate.stage_id = stage_id;
        self.gates.push(gate.clone());
        gate
    }

    pub fn put_gate(&mut self, gate: &Gate) -> Result<(), StoreError> {
        let slot = self
            .gates
            .iter_mut()
            .find(|g| g.id == gate.id)
            .ok_or_else(|| StoreError::Missing(format!("gate {}", gate.id)))?;
        *slot = gate.clone();
        Ok(())
    }

    pub fn update_gate(
        &mut self,
        id: GateId,
        f: &mut dyn FnMut(&mut Gate, &[Vote]) -> bool,
    ) -> Option<Gate> {
        let votes = self.votes_where(|v| v.gate_id == id);
        let slot = self.gates.iter_mut().find(|g| g.id == id)?;
        let mut gate = slot.clone();
        if !f(&mut gate, &votes) {
            return None;
        }
        *slot = gate.clone();
        Some(gate)
    }

    pub fn votes_where(&self, pred: impl Fn(&Vote) -> bool) -> Vec<Vote> {
        self.votes.iter().filter(|v| pred(v)).cloned().collect()
    }

    pub fn votes_by_setter(&self, feature_id: FeatureId, gate_id: GateId, set_by: &str) -> Vec<Vote> {
        self.votes_where(|v| v.feature_id == feature_id && v.gate_id == gate_id && v.set_by == set_by)
    }

    pub fn insert_vote(&mut self, draft: VoteDraft) -> Vote {
        self.next_vote_id += 1;
        let vote = draft.into_vote(self.next_vote_id);
        self.votes.push(vote.clone());
        vote
    }

    pub fn put_vote(&mut self, vote: &Vote) -> Result<(), StoreError> {
        let slot = self
            .votes
            .iter_mut()
            .find(|v| v.id == vote.id)
            .ok_or_else(|| StoreError::Missing(format!("vote {}", vote.id)))?;
        *slot = vote.clone();
        Ok(())
    }

    pub fn delete_vote(&mut self, id: VoteId) {
        self.votes.retain(|v| v.id != id);
    }

    /// Update-or-insert with both halves applied to the same snapshot.
    pub fn upsert_vote(&mut self, draft: VoteDraft) -> VoteWrite {
        let existing = self.votes.iter_mut().find(|v| {
            v.feature_id == draft.feature_id && v.gate_id == draft.gate_id && v.set_by == draft.set_by
        });
        if let Some(vote) = existing {
            vote.state = draft.state;
            vote.set_on = draft.set_on;
            return VoteWrite {
                vote: vote.clone(),
                created: false,
            };
        }
        VoteWrite {
            vote: self.insert_vote(draft),
            created: true,
        }
    }

    pub fn get_gate_def(&self, gate_type: GateType) -> Option<GateDef> {
        self.gate_defs
            .iter()
            .find(|d| d.gate_type == gate_type)
            .cloned()
    }

    pub fn put_gate_def(&mut self, def: &GateDef) {
        self.gate_defs.retain(|d| d.gate_type != def.gate_type);
        self.gate_defs.push(def.clone());
    }

    pub fn get_owners_file(&self, url: &str) -> Option<OwnersFile> {
        self.owners_files.iter().find(|f| f.url == url).cloned()
    }

    pub fn put_owners_file(&mut self, file: &OwnersFile) {
        self.owners_files.retain(|f| f.url != file.url);
        self.owners_files.push(file.clone());
    }
}
