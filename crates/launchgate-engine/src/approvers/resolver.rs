use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use launchgate_core::catalog::{ApproverSource, GateCatalog};
use launchgate_core::config::LaunchgateConfig;
use launchgate_core::errors::{GateError, StoreError};
use launchgate_core::records::GateDef;
use launchgate_core::traits::{ApproverCache, Clock, GateStore, HttpFetcher, PermissionChecker};
use launchgate_core::types::GateType;

use super::owners::fetch_owners;

const APPROVERS_CACHE_KEY: &str = "approvers";

/// Answers who may approve which gate types.
///
/// Results are memoized per gate type for `approvers_cache_ttl`. Network
/// trouble never surfaces here: a failed OWNERS fetch falls back to the
/// last stored copy or to an empty list.
pub struct ApproverResolver {
    catalog: Arc<GateCatalog>,
    store: Arc<dyn GateStore>,
    cache: Arc<dyn ApproverCache>,
    fetcher: Arc<dyn HttpFetcher>,
    clock: Arc<dyn Clock>,
    cache_ttl: Duration,
    owners_freshness: chrono::Duration,
    max_log_line: usize,
}

impl ApproverResolver {
    pub fn new(
        catalog: Arc<GateCatalog>,
        store: Arc<dyn GateStore>,
        cache: Arc<dyn ApproverCache>,
        fetcher: Arc<dyn HttpFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let defaults = LaunchgateConfig::default();
        Self {
            catalog,
            store,
            cache,
            fetcher,
            clock,
            cache_ttl: defaults.approvers_cache_ttl(),
            owners_freshness: defaults.owners_freshness(),
            max_log_line: defaults.max_log_line,
        }
    }

    pub fn with_config(mut self, config: &LaunchgateConfig) -> Self {
        self.cache_ttl = config.approvers_cache_ttl();
        self.owners_freshness = config.owners_freshness();
        self.max_log_line = config.max_log_line;
        self
    }

    pub fn cache_key(gate_type: GateType) -> String {
        format!("{APPROVERS_CACHE_KEY}|{gate_type}")
    }

    pub fn is_valid_gate_type(&self, gate_type: GateType) -> bool {
        self.catalog.contains(gate_type)
    }

    /// Emails allowed to approve gates of `gate_type`. Unknown types have none.
    pub fn get_approvers(&self, gate_type: GateType) -> Result<Vec<String>, StoreError> {
        let Some(info) = self.catalog.lookup(gate_type) else {
            return Ok(Vec::new());
        };

        let key = Self::cache_key(gate_type);
        // An empty cached list is treated as a miss so a bad fetch is retried.
        if let Some(cached) = self.cache.get(&key).filter(|c| !c.is_empty()) {
            debug!(%gate_type, "approvers served from cache");
            return Ok(cached);
        }

        let owners = match &info.approvers {
            ApproverSource::Stored => self
                .store
                .get_gate_def(gate_type)?
                .map(|def| def.approvers)
                .unwrap_or_default(),
            ApproverSource::OwnersFile(url) => fetch_owners(
                self.store.as_ref(),
                self.fetcher.as_ref(),
                url,
                self.clock.now(),
                self.owners_freshness,
                self.max_log_line,
            )?,
            ApproverSource::Fixed(emails) => emails.clone(),
        };

        self.cache.set(&key, owners.clone(), self.cache_ttl);
        Ok(owners)
    }

    /// Gate types that `user` may approve. Site admins may approve all of them.
    pub fn fields_approvable_by(
        &self,
        user: &str,
        permissions: &dyn PermissionChecker,
    ) -> Result<BTreeSet<GateType>, StoreError> {
        if permissions.can_admin_site(user) {
            return Ok(self.catalog.gate_types().collect());
        }
        let mut approvable = BTreeSet::new();
        for gate_type in self.catalog.gate_types() {
            if self.get_approvers(gate_type)?.iter().any(|a| a == user) {
                approvable.insert(gate_type);
            }
        }
        Ok(approvable)
    }

    /// Replace the stored approvers and rotation of a gate type.
    ///
    /// Only gate types whose approvers are stored can be edited. The cached
    /// list is dropped so the next lookup sees the change.
    pub fn set_gate_def(
        &self,
        gate_type: GateType,
        approvers: Vec<String>,
        rotation_url: Option<String>,
    ) -> Result<GateDef, GateError> {
        let info = self
            .catalog
            .lookup(gate_type)
            .ok_or(GateError::UnknownGateType(gate_type))?;
        if info.approvers != ApproverSource::Stored {
            return Err(GateError::InvalidInput(format!(
                "{} approvers are not editable",
                info.name
            )));
        }

        let def = GateDef {
            gate_type,
            approvers: approvers
                .into_iter()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect(),
            rotation_url: rotation_url.filter(|u| !u.trim().is_empty()),
        };
        self.store.put_gate_def(&def)?;
        self.invalidate(gate_type);
        info!(%gate_type, approvers = def.approvers.len(), "gate def updated");
        Ok(def)
    }

    /// Drop the memoized list for `gate_type`.
    pub fn invalidate(&self, gate_type: GateType) {
        self.cache.remove(&Self::cache_key(gate_type));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use launchgate_core::catalog::{GateInfo, API_OWNERS_URL};
    use launchgate_core::types::ApprovalRule;

    use crate::approvers::{ConfigPermissions, MemoryCache};
    use crate::state::MemoryStore;
    use crate::testing::{FakeFetcher, ManualClock};

    struct Fixture {
        store: Arc<MemoryStore>,
        fetcher: Arc<FakeFetcher>,
        clock: Arc<ManualClock>,
        resolver: ApproverResolver,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(FakeFetcher::default());
        let clock = Arc::new(ManualClock::default());
        let resolver = ApproverResolver::new(
            Arc::new(GateCatalog::chromium()),
            store.clone(),
            Arc::new(MemoryCache::new(clock.clone())),
            fetcher.clone(),
            clock.clone(),
        );
        Fixture {
            store,
            fetcher,
            clock,
            resolver,
        }
    }

    fn owners_body(emails: &[&str]) -> Vec<u8> {
        STANDARD.encode(emails.join("\n")).into_bytes()
    }

    #[test]
    fn unknown_gate_type_has_no_approvers() {
        let f = fixture();
        assert!(f.resolver.get_approvers(GateType(99)).unwrap().is_empty());
        assert!(!f.resolver.is_valid_gate_type(GateType(99)));
        assert!(f.resolver.is_valid_gate_type(GateType::API_SHIP));
    }

    #[test]
    fn fixed_list_is_returned() {
        let f = fixture();
        let approvers = f.resolver.get_approvers(GateType::TESTING_SHIP).unwrap();
        assert_eq!(approvers.len(), 5);
        assert!(approvers.contains(&"karala@google.com".to_string()));
    }

    #[test]
    fn stored_approvers_come_from_gate_def() {
        let f = fixture();
        assert!(f
            .resolver
            .get_approvers(GateType::PRIVACY_SHIP)
            .unwrap()
            .is_empty());

        f.store
            .put_gate_def(&GateDef {
                gate_type: GateType::PRIVACY_SHIP,
                approvers: vec!["p@google.com".into()],
                rotation_url: None,
            })
            .unwrap();
        assert_eq!(
            f.resolver.get_approvers(GateType::PRIVACY_SHIP).unwrap(),
            vec!["p@google.com".to_string()]
        );
    }

    #[test]
    fn owners_list_is_memoized_until_ttl() {
        let f = fixture();
        f.fetcher
            .respond(API_OWNERS_URL, 200, &owners_body(&["a@chromium.org"]));

        let first = f.resolver.get_approvers(GateType::API_SHIP).unwrap();
        let second = f.resolver.get_approvers(GateType::API_SHIP).unwrap();
        assert_eq!(first, second);
        assert_eq!(f.fetcher.calls(), 1);

        // Another API gate shares the OWNERS file but has its own cache entry.
        f.resolver.get_approvers(GateType::API_PLAN).unwrap();
        assert_eq!(f.fetcher.calls(), 1);

        f.fetcher.respond(
            API_OWNERS_URL,
            200,
            &owners_body(&["a@chromium.org", "b@chromium.org"]),
        );
        f.clock.advance(chrono::Duration::minutes(61));
        let refreshed = f.resolver.get_approvers(GateType::API_SHIP).unwrap();
        assert_eq!(refreshed.len(), 2);
        assert_eq!(f.fetcher.calls(), 2);
    }

    #[test]
    fn outage_falls_back_to_last_known_owners() {
        let f = fixture();
        f.fetcher
            .respond(API_OWNERS_URL, 200, &owners_body(&["a@chromium.org"]));
        f.resolver.get_approvers(GateType::API_SHIP).unwrap();

        f.fetcher.fail(API_OWNERS_URL);
        f.clock.advance(chrono::Duration::hours(2));
        assert_eq!(
            f.resolver.get_approvers(GateType::API_SHIP).unwrap(),
            vec!["a@chromium.org".to_string()]
        );
    }

    #[test]
    fn empty_result_is_retried() {
        let f = fixture();
        assert!(f
            .resolver
            .get_approvers(GateType::API_SHIP)
            .unwrap()
            .is_empty());

        f.fetcher
            .respond(API_OWNERS_URL, 200, &owners_body(&["a@chromium.org"]));
        assert_eq!(f.resolver.get_approvers(GateType::API_SHIP).unwrap().len(), 1);
        assert_eq!(f.fetcher.calls(), 2);
    }

    #[test]
    fn invalidate_forces_reload() {
        let f = fixture();
        let def = |emails: &[&str]| GateDef {
            gate_type: GateType::SECURITY_SHIP,
            approvers: emails.iter().map(|e| e.to_string()).collect(),
            rotation_url: None,
        };
        f.store.put_gate_def(&def(&["s1@google.com"])).unwrap();
        f.resolver.get_approvers(GateType::SECURITY_SHIP).unwrap();

        f.store.put_gate_def(&def(&["s2@google.com"])).unwrap();
        assert_eq!(
            f.resolver.get_approvers(GateType::SECURITY_SHIP).unwrap(),
            vec!["s1@google.com".to_string()]
        );
        f.resolver.invalidate(GateType::SECURITY_SHIP);
        assert_eq!(
            f.resolver.get_approvers(GateType::SECURITY_SHIP).unwrap(),
            vec!["s2@google.com".to_string()]
        );
    }

    #[test]
    fn set_gate_def_replaces_cached_list() {
        let f = fixture();
        f.resolver
            .set_gate_def(GateType::PRIVACY_SHIP, vec!["old@google.com".into()], None)
            .unwrap();
        f.resolver.get_approvers(GateType::PRIVACY_SHIP).unwrap();

        let def = f
            .resolver
            .set_gate_def(
                GateType::PRIVACY_SHIP,
                vec![" new@google.com ".into(), "".into()],
                Some("https://rotation/privacy".into()),
            )
            .unwrap();
        assert_eq!(def.approvers, vec!["new@google.com".to_string()]);
        assert_eq!(
            f.resolver.get_approvers(GateType::PRIVACY_SHIP).unwrap(),
            vec!["new@google.com".to_string()]
        );
        assert_eq!(
            f.store
                .get_gate_def(GateType::PRIVACY_SHIP)
                .unwrap()
                .unwrap()
                .rotation_url
                .as_deref(),
            Some("https://rotation/privacy")
        );
    }

    #[test]
    fn set_gate_def_rejects_other_sources() {
        let f = fixture();
        assert!(matches!(
            f.resolver.set_gate_def(GateType::API_SHIP, vec![], None),
            Err(GateError::InvalidInput(_))
        ));
        assert!(matches!(
            f.resolver.set_gate_def(GateType(99), vec![], None),
            Err(GateError::UnknownGateType(_))
        ));
    }

    #[test]
    fn approvable_fields_follow_approver_lists() {
        let f = fixture();
        f.fetcher
            .respond(API_OWNERS_URL, 200, &owners_body(&["owner@chromium.org"]));
        let nobody = ConfigPermissions::default();

        let fields = f
            .resolver
            .fields_approvable_by("owner@chromium.org", &nobody)
            .unwrap();
        let expected: BTreeSet<GateType> = [
            GateType::API_PROTOTYPE,
            GateType::API_ORIGIN_TRIAL,
            GateType::API_EXTEND_ORIGIN_TRIAL,
            GateType::API_SHIP,
            GateType::API_PLAN,
        ]
        .into_iter()
        .collect();
        assert_eq!(fields, expected);

        let fields = f
            .resolver
            .fields_approvable_by("sadapala@google.com", &nobody)
            .unwrap();
        assert_eq!(
            fields,
            [GateType::TESTING_SHIP, GateType::TESTING_PLAN]
                .into_iter()
                .collect::<BTreeSet<_>>()
        );
        assert!(f
            .resolver
            .fields_approvable_by("stranger@example.com", &nobody)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn admin_may_approve_everything() {
        let f = fixture();
        let admins = ConfigPermissions::new(vec!["root@example.com".into()]);
        let fields = f
            .resolver
            .fields_approvable_by("root@example.com", &admins)
            .unwrap();
        assert_eq!(fields.len(), GateCatalog::chromium().len());
        assert_eq!(f.fetcher.calls(), 0);
    }

    #[test]
    fn custom_catalog_is_honoured() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let catalog = GateCatalog::new(vec![GateInfo::new(
            GateType(900),
            "Custom",
            "Custom review",
            ApprovalRule::OneLgtm,
            ApproverSource::Fixed(vec!["c@example.com".into()]),
            "Custom",
        )]);
        let resolver = ApproverResolver::new(
            Arc::new(catalog),
            store,
            Arc::new(MemoryCache::new(clock.clone())),
            Arc::new(FakeFetcher::default()),
            clock,
        );
        assert_eq!(
            resolver.get_approvers(GateType(900)).unwrap(),
            vec!["c@example.com".to_string()]
        );
        assert!(resolver.get_approvers(GateType::API_SHIP).unwrap().is_empty());
    }
}
