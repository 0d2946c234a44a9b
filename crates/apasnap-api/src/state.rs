use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use apasnap_core::{Gallery, GalleryConfig, GalleryState, LoadError, ViewOptions};

/// One client's gallery. The state lock is never held across a fetch.
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    pub gallery: RwLock<GalleryState>,
    enriching: AtomicBool,
    last_seen_ms: AtomicI64,
}

impl Session {
    pub fn new(state: GalleryState) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            gallery: RwLock::new(state),
            enriching: AtomicBool::new(false),
            last_seen_ms: AtomicI64::new(Utc::now().timestamp_millis()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Records a client request against this session.
    pub fn touch(&self) {
        self.last_seen_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    fn idle_ms(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp_millis() - self.last_seen_ms.load(Ordering::Relaxed)
    }

    /// Claims the enrichment slot. Returns false when a run is already active.
    pub fn try_start_enrichment(&self) -> bool {
        self.enriching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn finish_enrichment(&self) {
        self.enriching.store(false, Ordering::Release);
    }

    pub fn is_enriching(&self) -> bool {
        self.enriching.load(Ordering::Acquire)
    }
}

/// Process-wide load counters exposed on `/metrics`.
#[derive(Debug, Default)]
pub struct LoadStats {
    pub started: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
    pub superseded: AtomicU64,
    pub items_enriched: AtomicU64,
}

impl LoadStats {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<DashMap<Uuid, Arc<Session>>>,
    pub gallery: Arc<Gallery>,
    pub config: GalleryConfig,
    pub stats: Arc<LoadStats>,
    session_idle: Option<Duration>,
}

impl AppState {
    pub fn new(gallery: Gallery, config: GalleryConfig) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            gallery: Arc::new(gallery),
            config,
            stats: Arc::new(LoadStats::default()),
            session_idle: None,
        }
    }

    /// Sessions untouched for longer than `idle` are dropped by
    /// [`AppState::evict_idle`]. A zero duration keeps sessions until deleted.
    pub fn with_session_idle(mut self, idle: Duration) -> Self {
        self.session_idle = (!idle.is_zero()).then_some(idle);
        self
    }

    pub fn session_idle(&self) -> Option<Duration> {
        self.session_idle
    }

    /// Removes idle sessions, sparing those with enrichment in flight.
    /// Returns how many were dropped.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let Some(idle) = self.session_idle else {
            return 0;
        };
        let limit_ms = i64::try_from(idle.as_millis()).unwrap_or(i64::MAX);
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.is_enriching() || session.idle_ms(now) <= limit_ms);
        before.saturating_sub(self.sessions.len())
    }

    pub fn from_config(config: GalleryConfig) -> Result<Self, LoadError> {
        let gallery = Gallery::from_config(&config)?;
        Ok(Self::new(gallery, config))
    }

    /// Fresh gallery state carrying the configured defaults.
    pub fn new_gallery_state(&self, proxy_enabled: Option<bool>) -> GalleryState {
        GalleryState::new(proxy_enabled.unwrap_or(self.config.proxy_enabled))
            .with_view(ViewOptions::default().with_sort(self.config.default_sort))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_sessions(count: usize) -> AppState {
        let state = AppState::from_config(GalleryConfig::default())
            .unwrap()
            .with_session_idle(Duration::from_secs(3600));
        for _ in 0..count {
            let session = Arc::new(Session::new(state.new_gallery_state(None)));
            state.sessions.insert(session.id(), session);
        }
        state
    }

    #[test]
    fn recent_sessions_survive_eviction() {
        let state = state_with_sessions(2);
        assert_eq!(state.evict_idle(Utc::now() + chrono::Duration::minutes(30)), 0);
        assert_eq!(state.sessions.len(), 2);
    }

    #[test]
    fn idle_sessions_are_evicted_unless_enriching() {
        let state = state_with_sessions(2);
        let busy = state.sessions.iter().next().map(|r| Arc::clone(r.value())).unwrap();
        assert!(busy.try_start_enrichment());

        assert_eq!(state.evict_idle(Utc::now() + chrono::Duration::hours(2)), 1);
        assert!(state.sessions.contains_key(&busy.id()));
    }

    #[test]
    fn zero_idle_disables_eviction() {
        let state = state_with_sessions(1).with_session_idle(Duration::ZERO);
        assert!(state.session_idle().is_none());
        assert_eq!(state.evict_idle(Utc::now() + chrono::Duration::days(30)), 0);
    }
}
