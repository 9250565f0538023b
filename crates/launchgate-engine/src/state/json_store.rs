use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::warn;

use launchgate_core::errors::StoreError;
use launchgate_core::records::{
    FeatureId, Gate, GateDef, GateId, OwnersFile, Vote, VoteDraft, VoteId, VoteWrite,
};
use launchgate_core::traits::GateStore;
use launchgate_core::types::GateType;

use super::atomic::{atomic_write, AdvisoryLock};
use super::data::StoreData;

const LOCK_ATTEMPTS: u32 = 100;
const LOCK_PAUSE: Duration = Duration::from_millis(20);

/// Store kept in a single JSON document.
///
/// Every mutation follows lock → load → mutate → atomic write → unlock, so
/// concurrent processes never interleave partial writes. Reads see the last
/// completed write.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: String,
}

impl JsonFileStore {
    pub fn open(path: &str) -> Self {
        Self {
            path: path.to_string(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Read the whole store. A missing file is an empty store.
    pub fn load(&self) -> Result<StoreData, StoreError> {
        if !Path::new(&self.path).exists() {
            return Ok(StoreData::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| StoreError::Io(format!("cannot read store {}: {e}", self.path)))?;
        if content.trim().is_empty() {
            return Ok(StoreData::default());
        }
        serde_json::from_str(&content)
            .map_err(|e| StoreError::Corrupt(format!("{}: invalid store JSON: {e}", self.path)))
    }

    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut StoreData) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let lock = AdvisoryLock::acquire_with_retry(&self.path, LOCK_ATTEMPTS, LOCK_PAUSE)
            .map_err(|e| StoreError::Locked(e.to_string()))?;
        let mut data = self.load()?;
        let out = f(&mut data)?;
        let json = serde_json::to_string_pretty(&data)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        atomic_write(&self.path, json.as_bytes()).map_err(|e| StoreError::Io(format!("{e:#}")))?;
        if let Err(e) = lock.release() {
            warn!(path = %self.path, error = %format!("{e:#}"), "lock release failed after write");
        }
        Ok(out)
    }
}

impl GateStore for JsonFileStore {
    fn get_gate(&self, id: GateId) -> Result<Option<Gate>, StoreError> {
        Ok(self.load()?.get_gate(id))
    }

    fn gates_for_feature(&self, feature_id: FeatureId) -> Result<Vec<Gate>, StoreError> {
        Ok(self.load()?.gates_where(|g| g.feature_id == feature_id))
    }

    fn gates_by_type(
        &self,
        feature_id: FeatureId,
        gate_type: GateType,
    ) -> Result<Vec<Gate>, StoreError> {
        Ok(self
            .load()?
            .gates_where(|g| g.feature_id == feature_id && g.gate_type == gate_type))
    }

    fn all_gates(&self) -> Result<Vec<Gate>, StoreError> {
        Ok(self.load()?.gates)
    }

    fn create_gate(
        &self,
        feature_id: FeatureId,
        gate_type: GateType,
        stage_id: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<Gate, StoreError> {
        self.mutate(|d| Ok(d.create_gate(feature_id, gate_type, stage_id, now)))
    }

    fn put_gate(&self, gate: &Gate) -> Result<(), StoreError> {
        self.mutate(|d| d.put_gate(gate))
    }

    fn update_gate(
        &self,
        id: GateId,
        f: &mut dyn FnMut(&mut Gate, &[Vote]) -> bool,
    ) -> Result<Option<Gate>, StoreError> {
        self.mutate(|d| Ok(d.update_gate(id, f)))
    }

    fn votes_for_gate(&self, gate_id: GateId) -> Result<Vec<Vote>, StoreError> {
        Ok(self.load()?.votes_where(|v| v.gate_id == gate_id))
    }

    fn votes_by_setter(
        &self,
        feature_id: FeatureId,
        gate_id: GateId,
        set_by: &str,
    ) -> Result<Vec<Vote>, StoreError> {
        Ok(self.load()?.votes_by_setter(feature_id, gate_id, set_by))
    }

    fn insert_vote(&self, draft: VoteDraft) -> Result<Vote, StoreError> {
        self.mutate(|d| Ok(d.insert_vote(draft)))
    }

    fn put_vote(&self, vote: &Vote) -> Result<(), StoreError> {
        self.mutate(|d| d.put_vote(vote))
    }

    fn delete_vote(&self, id: VoteId) -> Result<(), StoreError> {
        self.mutate(|d| {
            d.delete_vote(id);
            Ok(())
        })
    }

    fn upsert_vote(&self, draft: VoteDraft) -> Result<VoteWrite, StoreError> {
        self.mutate(|d| Ok(d.upsert_vote(draft)))
    }

    fn get_gate_def(&self, gate_type: GateType) -> Result<Option<GateDef>, StoreError> {
        Ok(self.load()?.get_gate_def(gate_type))
    }

    fn put_gate_def(&self, def: &GateDef) -> Result<(), StoreError> {
        self.mutate(|d| {
            d.put_gate_def(def);
            Ok(())
        })
    }

    fn get_owners_file(&self, url: &str) -> Result<Option<OwnersFile>, StoreError> {
        Ok(self.load()?.get_owners_file(url))
    }

    fn put_owners_file(&self, file: &OwnersFile) -> Result<(), StoreError> {
        self.mutate(|d| {
            d.put_owners_file(file);
            Ok(())
        })
    }
}
