use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::GateError;

/// Numeric gate type id.
///
/// Left open so that records written for retired gate types still load.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GateType(pub u32);

impl GateType {
    pub const API_PROTOTYPE: GateType = GateType(1);
    pub const API_ORIGIN_TRIAL: GateType = GateType(2);
    pub const API_EXTEND_ORIGIN_TRIAL: GateType = GateType(3);
    pub const API_SHIP: GateType = GateType(4);
    pub const API_PLAN: GateType = GateType(5);
    pub const PRIVACY_ORIGIN_TRIAL: GateType = GateType(32);
    pub const PRIVACY_SHIP: GateType = GateType(34);
    pub const SECURITY_ORIGIN_TRIAL: GateType = GateType(42);
    pub const SECURITY_SHIP: GateType = GateType(44);
    pub const ENTERPRISE_SHIP: GateType = GateType(54);
    pub const ENTERPRISE_PLAN: GateType = GateType(55);
    pub const DEBUGGABILITY_ORIGIN_TRIAL: GateType = GateType(62);
    pub const DEBUGGABILITY_SHIP: GateType = GateType(64);
    pub const DEBUGGABILITY_PLAN: GateType = GateType(65);
    pub const TESTING_SHIP: GateType = GateType(74);
    pub const TESTING_PLAN: GateType = GateType(75);
}

impl fmt::Display for GateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// How many qualifying votes a gate needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalRule {
    OneLgtm,
    ThreeLgtm,
}

impl ApprovalRule {
    pub fn quorum(self) -> usize {
        match self {
            ApprovalRule::OneLgtm => 1,
            ApprovalRule::ThreeLgtm => 3,
        }
    }
}

impl fmt::Display for ApprovalRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalRule::OneLgtm => f.pad("One LGTM"),
            ApprovalRule::ThreeLgtm => f.pad("Three LGTMs"),
        }
    }
}

/// One reviewer's stance on a gate.
///
/// The numeric codes are the values stored by earlier versions of the
/// review tool and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteState {
    Na,
    ReviewRequested,
    ReviewStarted,
    NeedsWork,
    Approved,
    Denied,
    NoResponse,
    InternalReview,
    NaRequested,
    NaSelf,
    NaVerified,
}

impl VoteState {
    pub const ALL: [VoteState; 11] = [
        VoteState::Na,
        VoteState::ReviewRequested,
        VoteState::ReviewStarted,
        VoteState::NeedsWork,
        VoteState::Approved,
        VoteState::Denied,
        VoteState::NoResponse,
        VoteState::InternalReview,
        VoteState::NaRequested,
        VoteState::NaSelf,
        VoteState::NaVerified,
    ];

    pub fn code(self) -> i32 {
        match self {
            VoteState::Na => 1,
            VoteState::ReviewRequested => 2,
            VoteState::ReviewStarted => 3,
            VoteState::NeedsWork => 4,
            VoteState::Approved => 5,
            VoteState::Denied => 6,
            VoteState::NoResponse => 7,
            VoteState::InternalReview => 8,
            VoteState::NaRequested => 9,
            VoteState::NaSelf => 10,
            VoteState::NaVerified => 11,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VoteState::Na => "NA",
            VoteState::ReviewRequested => "REVIEW_REQUESTED",
            VoteState::ReviewStarted => "REVIEW_STARTED",
            VoteState::NeedsWork => "NEEDS_WORK",
            VoteState::Approved => "APPROVED",
            VoteState::Denied => "DENIED",
            VoteState::NoResponse => "NO_RESPONSE",
            VoteState::InternalReview => "INTERNAL_REVIEW",
            VoteState::NaRequested => "NA_REQUESTED",
            VoteState::NaSelf => "NA_SELF",
            VoteState::NaVerified => "NA_VERIFIED",
        }
    }

    /// States that a feature owner sets to ask for review.
    pub fn is_request(self) -> bool {
        matches!(self, VoteState::ReviewRequested | VoteState::NaRequested)
    }
}

impl TryFrom<i32> for VoteState {
    type Error = GateError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        VoteState::ALL
            .into_iter()
            .find(|s| s.code() == code)
            .ok_or_else(|| GateError::InvalidInput(format!("invalid vote state {code}")))
    }
}

impl FromStr for VoteState {
    type Err = GateError;

    /// Accepts a state name (any case, `-` or `_`) or its numeric code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.trim().parse::<i32>() {
            return VoteState::try_from(code);
        }
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        VoteState::ALL
            .into_iter()
            .find(|st| st.name() == wanted)
            .ok_or_else(|| GateError::InvalidInput(format!("invalid vote state '{s}'")))
    }
}

impl fmt::Display for VoteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Aggregate state of a gate: every vote state plus the initial `Preparing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateState {
    Preparing,
    Na,
    ReviewRequested,
    ReviewStarted,
    NeedsWork,
    Approved,
    Denied,
    NoResponse,
    InternalReview,
    NaRequested,
    NaSelf,
    NaVerified,
}

impl GateState {
    pub fn code(self) -> i32 {
        match self.as_vote() {
            Some(v) => v.code(),
            None => 0,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        if code == 0 {
            return Some(GateState::Preparing);
        }
        VoteState::try_from(code).ok().map(GateState::from)
    }

    pub fn as_vote(self) -> Option<VoteState> {
        let v = match self {
            GateState::Preparing => return None,
            GateState::Na => VoteState::Na,
            GateState::ReviewRequested => VoteState::ReviewRequested,
            GateState::ReviewStarted => VoteState::ReviewStarted,
            GateState::NeedsWork => VoteState::NeedsWork,
            GateState::Approved => VoteState::Approved,
            GateState::Denied => VoteState::Denied,
            GateState::NoResponse => VoteState::NoResponse,
            GateState::InternalReview => VoteState::InternalReview,
            GateState::NaRequested => VoteState::NaRequested,
            GateState::NaSelf => VoteState::NaSelf,
            GateState::NaVerified => VoteState::NaVerified,
        };
        Some(v)
    }

    /// A review request is waiting on the reviewing team.
    pub fn is_requested(self) -> bool {
        matches!(self, GateState::ReviewRequested | GateState::NaRequested)
    }

    /// The reviewing team has reached a final answer.
    pub fn is_resolved(self) -> bool {
        matches!(
            self,
            GateState::Approved | GateState::Denied | GateState::Na | GateState::NaVerified
        )
    }
}

impl From<VoteState> for GateState {
    fn from(v: VoteState) -> Self {
        match v {
            VoteState::Na => GateState::Na,
            VoteState::ReviewRequested => GateState::ReviewRequested,
            VoteState::ReviewStarted => GateState::ReviewStarted,
            VoteState::NeedsWork => GateState::NeedsWork,
            VoteState::Approved => GateState::Approved,
            VoteState::Denied => GateState::Denied,
            VoteState::NoResponse => GateState::NoResponse,
            VoteState::InternalReview => GateState::InternalReview,
            VoteState::NaRequested => GateState::NaRequested,
            VoteState::NaSelf => GateState::NaSelf,
            VoteState::NaVerified => GateState::NaVerified,
        }
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_vote() {
            Some(v) => f.pad(v.name()),
            None => f.pad("PREPARING"),
        }
    }
}
