use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{ApprovalRule, GateType};

pub const DEFAULT_SLO_LIMIT: u32 = 5;
pub const DEFAULT_SLO_RESOLVE_LIMIT: u32 = 10;

pub const API_OWNERS_URL: &str =
    "https://chromium.googlesource.com/chromium/src/+/main/third_party/blink/API_OWNERS?format=TEXT";

const ENTERPRISE_APPROVERS: &[&str] = &[
    "mhoste@google.com",
    "angelaweber@google.com",
    "davidayad@google.com",
    "omole@google.com",
    "nsamarakkody@google.com",
    "pastarmovj@google.com",
    "aaudi@google.com",
    "kimreardon@google.com",
    "elmirakalali@google.com",
];

const TESTING_APPROVERS: &[&str] = &[
    "sadapala@google.com",
    "santhoshkumarm@google.com",
    "maguschen@google.com",
    "karala@google.com",
    "aichein@google.com",
];

/// Where the approvers of a gate type come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ApproverSource {
    /// A fixed list of email addresses.
    Fixed(Vec<String>),
    /// The approver list kept on the gate type's `GateDef` record.
    Stored,
    /// A remote OWNERS document.
    OwnersFile(String),
}

impl ApproverSource {
    fn fixed(emails: &[&str]) -> Self {
        ApproverSource::Fixed(emails.iter().map(|e| e.to_string()).collect())
    }
}

/// Static definition of one gate type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateInfo {
    pub gate_type: GateType,
    pub name: String,
    pub description: String,
    pub rule: ApprovalRule,
    pub approvers: ApproverSource,
    pub team_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_email: Option<String>,
    /// Weekdays allowed before the first reviewer response.
    pub slo_initial_response: u32,
    /// Weekdays allowed before the review is resolved.
    pub slo_resolve: u32,
}

impl GateInfo {
    pub fn new(
        gate_type: GateType,
        name: &str,
        description: &str,
        rule: ApprovalRule,
        approvers: ApproverSource,
        team_name: &str,
    ) -> Self {
        Self {
            gate_type,
            name: name.to_string(),
            description: description.to_string(),
            rule,
            approvers,
            team_name: team_name.to_string(),
            escalation_email: None,
            slo_initial_response: DEFAULT_SLO_LIMIT,
            slo_resolve: DEFAULT_SLO_RESOLVE_LIMIT,
        }
    }

    pub fn with_escalation(mut self, email: &str) -> Self {
        self.escalation_email = Some(email.to_string());
        self
    }

    pub fn with_initial_response(mut self, days: u32) -> Self {
        self.slo_initial_response = days;
        self
    }
}

/// Read-only registry of supported gate types.
///
/// Built once at startup and shared; there is no global instance.
#[derive(Debug, Clone, Default)]
pub struct GateCatalog {
    gates: BTreeMap<GateType, GateInfo>,
}

impl GateCatalog {
    pub fn new(infos: Vec<GateInfo>) -> Self {
        let gates = infos.into_iter().map(|g| (g.gate_type, g)).collect();
        Self { gates }
    }

    pub fn lookup(&self, gate_type: GateType) -> Option<&GateInfo> {
        self.gates.get(&gate_type)
    }

    pub fn contains(&self, gate_type: GateType) -> bool {
        self.gates.contains_key(&gate_type)
    }

    /// Rule used for state computation. Unsupported types count as one-LGTM.
    pub fn rule_for(&self, gate_type: GateType) -> ApprovalRule {
        self.lookup(gate_type)
            .map(|g| g.rule)
            .unwrap_or(ApprovalRule::OneLgtm)
    }

    pub fn gate_types(&self) -> impl Iterator<Item = GateType> + '_ {
        self.gates.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GateInfo> {
        self.gates.values()
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// The standard Blink launch gates.
    pub fn chromium() -> Self {
        use ApprovalRule::{OneLgtm, ThreeLgtm};
        let api_owners = || ApproverSource::OwnersFile(API_OWNERS_URL.to_string());
        let privacy_rotation = "chrome-privacy-owp-rotation@google.com";
        let devtools = "devtools-dev@chromium.org";

        Self::new(vec![
            // Can be requested manually; i2p intents are FYI only.
            GateInfo::new(
                GateType::API_PROTOTYPE,
                "Intent to Prototype",
                "Not normally used.  If a review is requested, API Owners can approve.",
                OneLgtm,
                api_owners(),
                "API Owners",
            ),
            GateInfo::new(
                GateType::API_ORIGIN_TRIAL,
                "Intent to Experiment",
                "One API Owner must approve your intent",
                OneLgtm,
                api_owners(),
                "API Owners",
            ),
            GateInfo::new(
                GateType::API_EXTEND_ORIGIN_TRIAL,
                "Intent to Extend Experiment",
                "One API Owner must approve your intent",
                OneLgtm,
                api_owners(),
                "API Owners",
            ),
            GateInfo::new(
                GateType::API_SHIP,
                "Intent to Ship",
                "Three API Owners must approve your intent",
                ThreeLgtm,
                api_owners(),
                "API Owners",
            ),
            GateInfo::new(
                GateType::API_PLAN,
                "Intent to Deprecate and Remove",
                "Three API Owners must approve your intent",
                ThreeLgtm,
                api_owners(),
                "API Owners",
            ),
            GateInfo::new(
                GateType::PRIVACY_ORIGIN_TRIAL,
                "Privacy OT Review",
                "Privacy OT Review",
                OneLgtm,
                ApproverSource::Stored,
                "Privacy",
            )
            .with_escalation(privacy_rotation)
            .with_initial_response(6),
            GateInfo::new(
                GateType::PRIVACY_SHIP,
                "Privacy Ship Review",
                "Privacy Ship Review",
                OneLgtm,
                ApproverSource::Stored,
                "Privacy",
            )
            .with_escalation(privacy_rotation)
            .with_initial_response(6),
            GateInfo::new(
                GateType::SECURITY_ORIGIN_TRIAL,
                "Security OT Review",
                "Security OT Review",
                OneLgtm,
                ApproverSource::Stored,
                "WP Security",
            )
            .with_initial_response(6),
            GateInfo::new(
                GateType::SECURITY_SHIP,
                "Security Ship Review",
                "Security Ship Review",
                OneLgtm,
                ApproverSource::Stored,
                "WP Security",
            )
            .with_initial_response(6),
            GateInfo::new(
                GateType::ENTERPRISE_SHIP,
                "Enterprise Ship Review",
                "Enterprise Ship Review",
                OneLgtm,
                ApproverSource::fixed(ENTERPRISE_APPROVERS),
                "Enterprise",
            ),
            // Unused, kept so older features display correctly.
            GateInfo::new(
                GateType::ENTERPRISE_PLAN,
                "Enterprise Deprecation Plan Review",
                "Enterprise Deprecation Plan Review",
                OneLgtm,
                ApproverSource::fixed(ENTERPRISE_APPROVERS),
                "Enterprise",
            ),
            GateInfo::new(
                GateType::DEBUGGABILITY_ORIGIN_TRIAL,
                "Debuggability OT Review",
                "Debuggability OT Review",
                OneLgtm,
                ApproverSource::Stored,
                "Debuggability",
            )
            .with_escalation(devtools),
            GateInfo::new(
                GateType::DEBUGGABILITY_SHIP,
                "Debuggability Ship Review",
                "Debuggability Ship Review",
                OneLgtm,
                ApproverSource::Stored,
                "Debuggability",
            )
            .with_escalation(devtools),
            GateInfo::new(
                GateType::DEBUGGABILITY_PLAN,
                "Debuggability Deprecation Plan Review",
                "Debuggability Deprecation Plan Review",
                OneLgtm,
                ApproverSource::Stored,
                "Debuggability",
            )
            .with_escalation(devtools),
            GateInfo::new(
                GateType::TESTING_SHIP,
                "Testing Ship Review",
                "Testing Ship Review",
                OneLgtm,
                ApproverSource::fixed(TESTING_APPROVERS),
                "Testing",
            ),
            GateInfo::new(
                GateType::TESTING_PLAN,
                "Testing Deprecation Plan Review",
                "Testing Deprecation Plan Review",
                OneLgtm,
                ApproverSource::fixed(TESTING_APPROVERS),
                "Testing",
            ),
        ])
    }
}
