use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::errors::{FetchError, StoreError};
use crate::records::{
    FeatureId, Gate, GateDef, GateId, OwnersFile, Vote, VoteDraft, VoteId, VoteWrite,
};
use crate::types::{GateState, GateType};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Persistent record store for gates, votes, gate defs, and OWNERS files.
pub trait GateStore: Send + Sync {
    fn get_gate(&self, id: GateId) -> Result<Option<Gate>, StoreError>;

    fn gates_for_feature(&self, feature_id: FeatureId) -> Result<Vec<Gate>, StoreError>;

    fn gates_by_type(
        &self,
        feature_id: FeatureId,
        gate_type: GateType,
    ) -> Result<Vec<Gate>, StoreError>;

    fn all_gates(&self) -> Result<Vec<Gate>, StoreError>;

    /// Insert a new gate in the `Preparing` state and return it with its id.
    fn create_gate(
        &self,
        feature_id: FeatureId,
        gate_type: GateType,
        stage_id: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<Gate, StoreError>;

    fn put_gate(&self, gate: &Gate) -> Result<(), StoreError>;

    /// Reload gate `id` with its votes, let `f` edit it, and write it back
    /// when `f` returns true. Returns the written gate; `None` when the gate
    /// is missing or `f` left it alone.
    ///
    /// The default reads and writes in separate calls and is not atomic.
    /// Stores that serialize writes should run the whole step under one lock.
    fn update_gate(
        &self,
        id: GateId,
        f: &mut dyn FnMut(&mut Gate, &[Vote]) -> bool,
    ) -> Result<Option<Gate>, StoreError> {
        let Some(mut gate) = self.get_gate(id)? else {
            return Ok(None);
        };
        let votes = self.votes_for_gate(id)?;
        if !f(&mut gate, &votes) {
            return Ok(None);
        }
        self.put_gate(&gate)?;
        Ok(Some(gate))
    }

    fn votes_for_gate(&self, gate_id: GateId) -> Result<Vec<Vote>, StoreError>;

    fn votes_by_setter(
        &self,
        feature_id: FeatureId,
        gate_id: GateId,
        set_by: &str,
    ) -> Result<Vec<Vote>, StoreError>;

    fn insert_vote(&self, draft: VoteDraft) -> Result<Vote, StoreError>;

    fn put_vote(&self, vote: &Vote) -> Result<(), StoreError>;

    fn delete_vote(&self, id: VoteId) -> Result<(), StoreError>;

    /// Update the voter's existing row in place, or insert a new one.
    ///
    /// The default is a plain read followed by a write and is not atomic.
    /// Stores that can make the pair atomic should override it.
    fn upsert_vote(&self, draft: VoteDraft) -> Result<VoteWrite, StoreError> {
        let existing = self.votes_by_setter(draft.feature_id, draft.gate_id, &draft.set_by)?;
        if let Some(mut vote) = existing.into_iter().next() {
            vote.state = draft.state;
            vote.set_on = draft.set_on;
            self.put_vote(&vote)?;
            return Ok(VoteWrite {
                vote,
                created: false,
            });
        }
        let vote = self.insert_vote(draft)?;
        Ok(VoteWrite {
            vote,
            created: true,
        })
    }

    fn get_gate_def(&self, gate_type: GateType) -> Result<Option<GateDef>, StoreError>;

    fn put_gate_def(&self, def: &GateDef) -> Result<(), StoreError>;

    fn get_owners_file(&self, url: &str) -> Result<Option<OwnersFile>, StoreError>;

    /// Replace any stored copy for the same url.
    fn put_owners_file(&self, file: &OwnersFile) -> Result<(), StoreError>;
}

/// Key/value cache with expiry, used to memoize approver lists.
pub trait ApproverCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<String>>;
    fn set(&self, key: &str, value: Vec<String>, ttl: Duration);
    fn remove(&self, key: &str);
}

/// Response from an outbound GET.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Outbound HTTP GET for OWNERS files and rotation endpoints.
pub trait HttpFetcher: Send + Sync {
    fn get(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

/// Records SLO bookkeeping when a vote lands on a gate.
pub trait SloRecorder: Send + Sync {
    /// May update SLO fields on `gate`. Returns true if anything changed.
    fn record_vote(&self, gate: &mut Gate, votes: &[Vote], old_state: GateState) -> bool;
}

/// Site-wide permission checks.
pub trait PermissionChecker: Send + Sync {
    /// Admins may approve every gate regardless of approver lists.
    fn can_admin_site(&self, user: &str) -> bool;
}
