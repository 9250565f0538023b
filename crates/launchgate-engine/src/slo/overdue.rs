use chrono::{DateTime, Utc};
use serde::Serialize;

use launchgate_core::catalog::GateCatalog;
use launchgate_core::errors::StoreError;
use launchgate_core::records::{FeatureId, GateId};
use launchgate_core::traits::GateStore;
use launchgate_core::types::{GateState, GateType};

use super::calendar::weekdays_between;

/// Which SLO a gate has missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SloKind {
    InitialResponse,
    Resolve,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverdueGate {
    pub gate_id: GateId,
    pub feature_id: FeatureId,
    pub gate_type: GateType,
    pub gate_name: String,
    pub team_name: String,
    pub state: GateState,
    pub kind: SloKind,
    pub requested_on: DateTime<Utc>,
    pub weekdays_elapsed: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_email: Option<String>,
}

/// Open reviews that have gone past their SLO limits as of `now`.
///
/// A gate past its resolve limit is reported once, as `Resolve`. Gates of
/// unsupported types are skipped.
pub fn overdue_gates(
    store: &dyn GateStore,
    catalog: &GateCatalog,
    now: DateTime<Utc>,
) -> Result<Vec<OverdueGate>, StoreError> {
    let mut overdue = Vec::new();
    for gate in store.all_gates()? {
        let Some(info) = catalog.lookup(gate.gate_type) else {
            continue;
        };
        let Some(requested_on) = gate.requested_on else {
            continue;
        };
        if gate.resolved_on.is_some() {
            continue;
        }

        let elapsed = weekdays_between(requested_on, now);
        let missed = if elapsed > info.slo_resolve {
            Some((SloKind::Resolve, info.slo_resolve))
        } else if gate.responded_on.is_none() && elapsed > info.slo_initial_response {
            Some((SloKind::InitialResponse, info.slo_initial_response))
        } else {
            None
        };

        if let Some((kind, limit)) = missed {
            overdue.push(OverdueGate {
                gate_id: gate.id,
                feature_id: gate.feature_id,
                gate_type: gate.gate_type,
                gate_name: info.name.clone(),
                team_name: info.team_name.clone(),
                state: gate.state,
                kind,
                requested_on,
                weekdays_elapsed: elapsed,
                limit,
                escalation_email: info.escalation_email.clone(),
            });
        }
    }
    Ok(overdue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryStore;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        // March 2024: the 4th is a Monday.
        Utc.with_ymd_and_hms(2024, 3, d, 9, 0, 0).unwrap()
    }

    fn requested_gate(store: &MemoryStore, gate_type: GateType, on: DateTime<Utc>) -> GateId {
        let mut gate = store.create_gate(1, gate_type, None, on).unwrap();
        gate.state = GateState::ReviewRequested;
        gate.requested_on = Some(on);
        store.put_gate(&gate).unwrap();
        gate.id
    }

    #[test]
    fn initial_response_limit_counts_weekdays() {
        let store = MemoryStore::new();
        let catalog = GateCatalog::chromium();
        let id = requested_gate(&store, GateType::TESTING_SHIP, day(4));

        // Five weekdays later is still within the limit.
        assert!(overdue_gates(&store, &catalog, day(11)).unwrap().is_empty());

        let report = overdue_gates(&store, &catalog, day(12)).unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].gate_id, id);
        assert_eq!(report[0].kind, SloKind::InitialResponse);
        assert_eq!(report[0].weekdays_elapsed, 6);
        assert_eq!(report[0].limit, 5);
    }

    #[test]
    fn privacy_gets_six_days_and_escalation() {
        let store = MemoryStore::new();
        let catalog = GateCatalog::chromium();
        requested_gate(&store, GateType::PRIVACY_SHIP, day(4));

        assert!(overdue_gates(&store, &catalog, day(12)).unwrap().is_empty());
        let report = overdue_gates(&store, &catalog, day(13)).unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(
            report[0].escalation_email.as_deref(),
            Some("chrome-privacy-owp-rotation@google.com")
        );
    }

    #[test]
    fn responded_gate_is_only_overdue_on_resolve() {
        let store = MemoryStore::new();
        let catalog = GateCatalog::chromium();
        let id = requested_gate(&store, GateType::TESTING_SHIP, day(4));
        let mut gate = store.get_gate(id).unwrap().unwrap();
        gate.responded_on = Some(day(5));
        store.put_gate(&gate).unwrap();

        assert!(overdue_gates(&store, &catalog, day(15)).unwrap().is_empty());
        let report = overdue_gates(&store, &catalog, day(19)).unwrap();
        assert_eq!(report[0].kind, SloKind::Resolve);
        assert_eq!(report[0].limit, 10);
    }

    #[test]
    fn resolved_and_unknown_gates_are_skipped() {
        let store = MemoryStore::new();
        let catalog = GateCatalog::chromium();
        let id = requested_gate(&store, GateType::TESTING_SHIP, day(4));
        let mut gate = store.get_gate(id).unwrap().unwrap();
        gate.resolved_on = Some(day(6));
        store.put_gate(&gate).unwrap();
        requested_gate(&store, GateType(99), day(4));

        assert!(overdue_gates(&store, &catalog, day(29)).unwrap().is_empty());
    }
}
