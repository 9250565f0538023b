use std::sync::Mutex;

use chrono::{DateTime, Utc};

use launchgate_core::errors::StoreError;
use launchgate_core::records::{
    FeatureId, Gate, GateDef, GateId, OwnersFile, Vote, VoteDraft, VoteId, VoteWrite,
};
use launchgate_core::traits::GateStore;
use launchgate_core::types::GateType;

use super::data::StoreData;

/// Process-local store. Every call runs under one mutex, so `upsert_vote`
/// is a true compare-and-swap on (gate, voter).
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: StoreData) -> Self {
        Self {
            data: Mutex::new(data),
        }
    }

    pub fn snapshot(&self) -> Result<StoreData, StoreError> {
        self.with(|d| d.clone())
    }

    fn with<R>(&self, f: impl FnOnce(&mut StoreData) -> R) -> Result<R, StoreError> {
        let mut guard = self
            .data
            .lock()
            .map_err(|_| StoreError::Io("memory store mutex poisoned".into()))?;
        Ok(f(&mut guard))
    }
}

impl GateStore for MemoryStore {
    fn get_gate(&self, id: GateId) -> Result<Option<Gate>, StoreError> {
        self.with(|d| d.get_gate(id))
    }

    fn gates_for_feature(&self, feature_id: FeatureId) -> Result<Vec<Gate>, StoreError> {
        self.with(|d| d.gates_where(|g| g.feature_id == feature_id))
    }

    fn gates_by_type(
        &self,
        feature_id: FeatureId,
        gate_type: GateType,
    ) -> Result<Vec<Gate>, StoreError> {
        self.with(|d| d.gates_where(|g| g.feature_id == feature_id && g.gate_type == gate_type))
    }

    fn all_gates(&self) -> Result<Vec<Gate>, StoreError> {
        self.with(|d| d.gates.clone())
    }

    fn create_gate(
        &self,
        feature_id: FeatureId,
        gate_type: GateType,
        stage_id: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<Gate, StoreError> {
        self.with(|d| d.create_gate(feature_id, gate_type, stage_id, now))
    }

    fn put_gate(&self, gate: &Gate) -> Result<(), StoreError> {
        self.with(|d| d.put_gate(gate))?
    }

    fn update_gate(
        &self,
        id: GateId,
        f: &mut dyn FnMut(&mut Gate, &[Vote]) -> bool,
    ) -> Result<Option<Gate>, StoreError> {
        self.with(|d| d.update_gate(id, f))
    }

    fn votes_for_gate(&self, gate_id: GateId) -> Result<Vec<Vote>, StoreError> {
        self.with(|d| d.votes_where(|v| v.gate_id == gate_id))
    }

    fn votes_by_setter(
        &self,
        feature_id: FeatureId,
        gate_id: GateId,
        set_by: &str,
    ) -> Result<Vec<Vote>, StoreError> {
        self.with(|d| d.votes_by_setter(feature_id, gate_id, set_by))
    }

    fn insert_vote(&self, draft: VoteDraft) -> Result<Vote, StoreError> {
        self.with(|d| d.insert_vote(draft))
    }

    fn put_vote(&self, vote: &Vote) -> Result<(), StoreError> {
        self.with(|d| d.put_vote(vote))?
    }

    fn delete_vote(&self, id: VoteId) -> Result<(), StoreError> {
        self.with(|d| d.delete_vote(id))
    }

    fn upsert_vote(&self, draft: VoteDraft) -> Result<VoteWrite, StoreError> {
        self.with(|d| d.upsert_vote(draft))
    }

    fn get_gate_def(&self, gate_type: GateType) -> Result<Option<GateDef>, StoreError> {
        self.with(|d| d.get_gate_def(gate_type))
    }

    fn put_gate_def(&self, def: &GateDef) -> Result<(), StoreError> {
        self.with(|d| d.put_gate_def(def))
    }

    fn get_owners_file(&self, url: &str) -> Result<Option<OwnersFile>, StoreError> {
        self.with(|d| d.get_owners_file(url))
    }

    fn put_owners_file(&self, file: &OwnersFile) -> Result<(), StoreError> {
        self.with(|d| d.put_owners_file(file))
    }
}
