//! Score cache
//!
//! Reports are cached per agent and expire a fixed time after they were
//! computed. Expired entries are evicted when read and swept on every store.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::engine::ScoreReport;

/// Default time a cached report stays valid, in seconds
pub const DEFAULT_CACHE_TTL_SECS: i64 = 300;

/// Storage for the last report per agent
pub trait ScoreCache: Send + Sync {
    /// Fresh cached report for an agent
    fn get(&self, agent_id: &str) -> Option<ScoreReport>;

    /// Store a report, replacing any previous one for the same agent
    fn put(&self, report: ScoreReport);

    /// Drop the report for an agent; true if one was cached
    fn invalidate(&self, agent_id: &str) -> bool;

    /// Drop every report
    fn clear(&self);
}

/// In-memory cache keyed by agent id
#[derive(Debug)]
pub struct MemoryScoreCache {
    entries: DashMap<String, ScoreReport>,
    ttl: Duration,
}

impl MemoryScoreCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Cached report as seen at `now`
    pub fn get_at(&self, agent_id: &str, now: DateTime<Utc>) -> Option<ScoreReport> {
        let expired = |report: &ScoreReport| now - report.result.computed_at >= self.ttl;

        if let Some(entry) = self.entries.get(agent_id) {
            if !expired(entry.value()) {
                return Some(entry.value().clone());
            }
        } else {
            return None;
        }

        self.entries.remove_if(agent_id, |_, report| expired(report));
        None
    }

    /// Drop every report expired at `now`; returns how many were dropped
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, report| now - report.result.computed_at < self.ttl);
        before.saturating_sub(self.entries.len())
    }

    /// Store a report after sweeping entries expired at `now`
    pub fn put_at(&self, report: ScoreReport, now: DateTime<Utc>) {
        self.purge_expired(now);
        self.entries.insert(report.agent_id.clone(), report);
    }

    /// Number of cached reports, expired or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryScoreCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_CACHE_TTL_SECS))
    }
}

impl ScoreCache for MemoryScoreCache {
    fn get(&self, agent_id: &str) -> Option<ScoreReport> {
        self.get_at(agent_id, Utc::now())
    }

    fn put(&self, report: ScoreReport) {
        self.put_at(report, Utc::now());
    }

    fn invalidate(&self, agent_id: &str) -> bool {
        self.entries.remove(agent_id).is_some()
    }

    fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repute_core::ReputationResult;
    use uuid::Uuid;

    fn report(agent: &str, computed_at: DateTime<Utc>) -> ScoreReport {
        ScoreReport {
            run_id: Uuid::new_v4(),
            agent_id: agent.to_string(),
            result: ReputationResult::unproven(vec![], computed_at),
            rejections: vec![],
            from_cache: false,
        }
    }

    #[test]
    fn test_put_and_get() {
        let cache = MemoryScoreCache::default();
        assert!(cache.get("agent-1").is_none());

        cache.put(report("agent-1", Utc::now()));
        assert_eq!(cache.get("agent-1").unwrap().agent_id, "agent-1");
        assert!(cache.get("agent-2").is_none());
    }

    #[test]
    fn test_expired_entries_evicted() {
        let cache = MemoryScoreCache::new(Duration::seconds(60));
        let computed = Utc::now();
        cache.put(report("agent-1", computed));

        assert!(cache.get_at("agent-1", computed + Duration::seconds(30)).is_some());
        assert!(cache.get_at("agent-1", computed + Duration::seconds(61)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_store_sweeps_other_expired_agents() {
        let cache = MemoryScoreCache::new(Duration::seconds(1));
        let now = Utc::now();
        let hour_ago = now - Duration::hours(1);
        for i in 0..1000 {
            cache.put_at(report(&format!("agent-{}", i), hour_ago), hour_ago);
        }
        assert_eq!(cache.len(), 1000);

        cache.put_at(report("agent-fresh", now), now);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_at("agent-fresh", now).is_some());
    }

    #[test]
    fn test_purge_expired_keeps_fresh() {
        let cache = MemoryScoreCache::new(Duration::seconds(60));
        let now = Utc::now();
        let stored = now - Duration::seconds(120);
        cache.put_at(report("agent-old", stored), stored);
        cache.put_at(report("agent-new", now - Duration::seconds(10)), stored);
        assert_eq!(cache.len(), 2);

        assert_eq!(cache.purge_expired(now), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_at("agent-new", now).is_some());
        assert_eq!(cache.purge_expired(now), 0);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = MemoryScoreCache::default();
        cache.put(report("agent-1", Utc::now()));
        cache.put(report("agent-2", Utc::now()));

        assert!(cache.invalidate("agent-1"));
        assert!(!cache.invalidate("agent-1"));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
