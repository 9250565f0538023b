use std::sync::Arc;

use serde::Deserialize;
use tracing::{error, info, warn};

use launchgate_core::catalog::{ApproverSource, GateCatalog};
use launchgate_core::config::log_excerpt;
use launchgate_core::errors::StoreError;
use launchgate_core::records::Gate;
use launchgate_core::traits::{GateStore, HttpFetcher};

/// Body served by a reviewer rotation endpoint.
#[derive(Debug, Deserialize)]
struct RotationResponse {
    #[serde(default)]
    emails: Option<Vec<String>>,
}

/// Picks reviewers for newly requested gates.
pub struct ReviewerAssigner {
    store: Arc<dyn GateStore>,
    catalog: Arc<GateCatalog>,
    fetcher: Arc<dyn HttpFetcher>,
    max_log_line: usize,
}

impl ReviewerAssigner {
    pub fn new(
        store: Arc<dyn GateStore>,
        catalog: Arc<GateCatalog>,
        fetcher: Arc<dyn HttpFetcher>,
        max_log_line: usize,
    ) -> Self {
        Self {
            store,
            catalog,
            fetcher,
            max_log_line,
        }
    }

    /// Assign reviewers to `gate` and persist it.
    ///
    /// Reuses the assignees of another gate on the same feature reviewed by
    /// the same team under the same rule. Failing that, gates with stored
    /// approvers ask their rotation endpoint for the on-call reviewer.
    /// Returns true if assignees were set. Rotation failures are logged and
    /// leave the gate untouched.
    pub fn auto_assign_reviewer(&self, gate: &mut Gate) -> Result<bool, StoreError> {
        let Some(info) = self.catalog.lookup(gate.gate_type) else {
            warn!(gate_id = gate.id, gate_type = %gate.gate_type, "unsupported gate type, not assigning");
            return Ok(false);
        };

        for other in self.store.gates_for_feature(gate.feature_id)? {
            if other.id == gate.id || other.assignee_emails.is_empty() {
                continue;
            }
            let Some(other_info) = self.catalog.lookup(other.gate_type) else {
                continue;
            };
            if other_info.team_name == info.team_name && other_info.rule == info.rule {
                info!(gate_id = gate.id, from_gate = other.id, "reusing previous assignees");
                gate.assignee_emails = other.assignee_emails;
                self.store.put_gate(gate)?;
                return Ok(true);
            }
        }

        if info.approvers != ApproverSource::Stored {
            return Ok(false);
        }
        let Some(url) = self
            .store
            .get_gate_def(gate.gate_type)?
            .and_then(|def| def.rotation_url)
            .filter(|url| !url.is_empty())
        else {
            return Ok(false);
        };

        let response = match self.fetcher.get(&url) {
            Ok(resp) => resp,
            Err(e) => {
                error!(url = %url, error = %e, "could not fetch rotation");
                return Ok(false);
            }
        };
        let body = String::from_utf8_lossy(&response.body);
        if !response.is_ok() {
            error!(
                url = %url,
                status = response.status,
                body = log_excerpt(&body, self.max_log_line),
                "could not fetch rotation"
            );
            return Ok(false);
        }
        info!(url = %url, body = log_excerpt(&body, self.max_log_line), "rotation response");

        let parsed: RotationResponse = match serde_json::from_slice(&response.body) {
            Ok(parsed) => parsed,
            Err(e) => {
                info!(url = %url, error = %e, "failed to parse rotation content");
                return Ok(false);
            }
        };
        let Some(emails) = parsed.emails else {
            return Ok(false);
        };

        gate.assignee_emails = emails;
        self.store.put_gate(gate)?;
        info!(gate_id = gate.id, assignees = ?gate.assignee_emails, "assigned from rotation");
        Ok(true)
    }
}
