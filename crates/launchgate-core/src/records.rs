use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{GateState, GateType, VoteState};

pub type FeatureId = u64;
pub type GateId = u64;
pub type VoteId = u64;

/// One review checkpoint of a feature.
///
/// `state` is a cache of the value computed from the gate's votes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    pub id: GateId,
    pub feature_id: FeatureId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<u64>,
    pub gate_type: GateType,
    pub state: GateState,
    #[serde(default)]
    pub assignee_emails: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_on: Option<DateTime<Utc>>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

impl Gate {
    pub fn new(id: GateId, feature_id: FeatureId, gate_type: GateType, now: DateTime<Utc>) -> Self {
        Self {
            id,
            feature_id,
            stage_id: None,
            gate_type,
            state: GateState::Preparing,
            assignee_emails: Vec::new(),
            requested_on: None,
            responded_on: None,
            resolved_on: None,
            created_on: now,
            updated_on: now,
        }
    }
}

/// A reviewer's current stance on a gate. One live row per (gate, set_by).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub feature_id: FeatureId,
    pub gate_id: GateId,
    pub gate_type: GateType,
    pub state: VoteState,
    pub set_on: DateTime<Utc>,
    pub set_by: String,
}

/// Vote contents before the store assigns an id.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteDraft {
    pub feature_id: FeatureId,
    pub gate_id: GateId,
    pub gate_type: GateType,
    pub state: VoteState,
    pub set_on: DateTime<Utc>,
    pub set_by: String,
}

impl VoteDraft {
    pub fn into_vote(self, id: VoteId) -> Vote {
        Vote {
            id,
            feature_id: self.feature_id,
            gate_id: self.gate_id,
            gate_type: self.gate_type,
            state: self.state,
            set_on: self.set_on,
            set_by: self.set_by,
        }
    }
}

/// Outcome of writing a voter's row.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteWrite {
    pub vote: Vote,
    /// True when a new row was inserted rather than an existing one updated.
    pub created: bool,
}

/// Admin-maintained approver data for gate types whose approvers are stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateDef {
    pub gate_type: GateType,
    #[serde(default)]
    pub approvers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_url: Option<String>,
}

/// Last fetched copy of a remote OWNERS document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnersFile {
    pub url: String,
    /// Body exactly as served (base64 text for `?format=TEXT` URLs).
    pub raw_content: Vec<u8>,
    pub created_on: DateTime<Utc>,
}

impl OwnersFile {
    pub fn is_fresh(&self, now: DateTime<Utc>, freshness: Duration) -> bool {
        now - self.created_on < freshness
    }
}
