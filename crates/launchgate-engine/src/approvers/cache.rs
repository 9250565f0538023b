use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

use launchgate_core::traits::{ApproverCache, Clock};

/// In-process approver cache with per-entry expiry.
pub struct MemoryCache {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, (Vec<String>, DateTime<Utc>)>>,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl ApproverCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Vec<String>> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some((value, expires)) if *expires > now => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: Vec<String>, ttl: Duration) {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365));
        let expires = self.clock.now() + ttl;
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), (value, expires));
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualClock;

    #[test]
    fn entry_expires_after_ttl() {
        let clock = Arc::new(ManualClock::default());
        let cache = MemoryCache::new(clock.clone());
        cache.set("k", vec!["a@x.com".into()], Duration::from_secs(60));

        assert_eq!(cache.get("k"), Some(vec!["a@x.com".to_string()]));
        clock.advance(chrono::Duration::seconds(59));
        assert!(cache.get("k").is_some());
        clock.advance(chrono::Duration::seconds(1));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn remove_drops_entry() {
        let cache = MemoryCache::new(Arc::new(ManualClock::default()));
        cache.set("k", vec![], Duration::from_secs(60));
        cache.remove("k");
        assert!(cache.get("k").is_none());
    }
}
