//! Single-slot dashboard cache with a freshness window.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use groupsave_client::{DashboardSnapshot, GroupSaveClient};
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::manager::SessionManager;
use crate::store::{SessionStore, keys};

/// How [`DashboardCache::fetch`] treats a fresh snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Skip the network while the snapshot is fresh.
    #[default]
    Normal,
    /// Always hit the network (pull-to-refresh).
    Force,
}

/// Result of a [`DashboardCache::fetch`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The network was hit and the slot replaced.
    Fetched(DashboardSnapshot),
    /// The snapshot is still fresh; nothing was fetched.
    Fresh,
    /// Another fetch is running; this call was dropped.
    InFlight,
    /// The session ended or changed while the request was out; the response
    /// was thrown away.
    Discarded,
}

struct CacheInner {
    snapshot: Option<DashboardSnapshot>,
    /// Epoch milliseconds of the last successful fetch, 0 when never.
    last_fetch_ms: i64,
}

/// Read-through cache for the dashboard response.
///
/// Only the in-memory freshness instant decides whether to refetch; the
/// persisted copy is shown on cold start but always counts as stale.
#[derive(Clone)]
pub struct DashboardCache {
    inner: Arc<RwLock<CacheInner>>,
    in_flight: Arc<AtomicBool>,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    session: Option<SessionManager>,
    ttl_ms: i64,
}

impl std::fmt::Debug for DashboardCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardCache")
            .field("ttl_ms", &self.ttl_ms)
            .field("in_flight", &self.in_flight.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl DashboardCache {
    /// Create an empty cache backed by `store`.
    pub fn new(store: Arc<dyn SessionStore>, config: &SessionConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Create an empty cache with an explicit clock.
    pub fn with_clock(
        store: Arc<dyn SessionStore>,
        config: &SessionConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner {
                snapshot: None,
                last_fetch_ms: 0,
            })),
            in_flight: Arc::new(AtomicBool::new(false)),
            store,
            clock,
            session: None,
            ttl_ms: config.dashboard_ttl_ms(),
        }
    }

    /// Hand fresh profiles from the dashboard to `manager`.
    pub fn with_session(mut self, manager: SessionManager) -> Self {
        self.session = Some(manager);
        self
    }

    /// Prime the slot from storage without marking it fresh.
    pub async fn load_persisted(&self) -> Option<DashboardSnapshot> {
        let raw = match self.store.get(keys::DASHBOARD_DATA).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted dashboard");
                return None;
            }
        };
        let snapshot: DashboardSnapshot = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Persisted dashboard is not valid JSON");
                return None;
            }
        };

        let mut inner = self.inner.write().await;
        if inner.snapshot.is_none() {
            debug!(
                groups = snapshot.my_groups.len(),
                "Loaded persisted dashboard"
            );
            inner.snapshot = Some(snapshot);
        }
        inner.snapshot.clone()
    }

    /// Current snapshot, fresh or not.
    pub async fn get(&self) -> Option<DashboardSnapshot> {
        self.inner.read().await.snapshot.clone()
    }

    /// Replace the snapshot, mark it fresh and persist it.
    pub async fn put(&self, snapshot: DashboardSnapshot) {
        let now = self.clock.now_ms();
        {
            let mut inner = self.inner.write().await;
            inner.snapshot = Some(snapshot.clone());
            inner.last_fetch_ms = now;
        }

        match serde_json::to_string(&snapshot) {
            Ok(json) => {
                if let Err(e) = self.store.set(keys::DASHBOARD_DATA, &json).await {
                    warn!(error = %e, "Failed to persist dashboard");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize dashboard"),
        }
        trace!(at = now, "Dashboard cached");
    }

    /// Whether the snapshot was fetched less than the TTL ago.
    pub async fn is_fresh(&self, now_ms: i64) -> bool {
        let last = self.inner.read().await.last_fetch_ms;
        is_fresh(last, now_ms, self.ttl_ms)
    }

    /// Whether a fetch is currently running.
    pub fn is_fetching(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Fetch the dashboard unless fresh or already in flight.
    ///
    /// On failure the previous snapshot is left untouched. A 401 has already
    /// been routed to the session manager by the client before the error
    /// arrives here. A response that outlives the session it was requested
    /// under is neither cached nor persisted.
    pub async fn fetch(
        &self,
        client: &GroupSaveClient,
        mode: FetchMode,
    ) -> groupsave_client::Result<FetchOutcome> {
        if mode == FetchMode::Normal && self.is_fresh(self.clock.now_ms()).await {
            trace!("Dashboard still fresh");
            return Ok(FetchOutcome::Fresh);
        }

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            debug!("Dashboard fetch already in flight");
            return Ok(FetchOutcome::InFlight);
        };

        let ticket = self.session.as_ref().map(SessionManager::generation);

        let dashboard = match client.dashboard().get().await {
            Ok(dashboard) => dashboard,
            Err(e) => {
                if e.is_auth_error() {
                    debug!("Dashboard fetch rejected; keeping cached snapshot");
                } else {
                    warn!(error = %e, "Dashboard fetch failed; keeping cached snapshot");
                }
                return Err(e);
            }
        };

        if !self.is_current(ticket) {
            debug!("Session ended during dashboard fetch; discarding response");
            return Ok(FetchOutcome::Discarded);
        }

        if let (Some(user), Some(session)) = (dashboard.user.as_ref(), self.session.as_ref()) {
            session.update_profile(user).await;
        }
        self.put(dashboard.snapshot.clone()).await;

        // Teardown may have erased the store between the check and the write.
        if !self.is_current(ticket) {
            debug!("Session ended while caching dashboard; removing it again");
            self.clear().await;
            if let Err(e) = self.store.remove(&[keys::DASHBOARD_DATA]).await {
                warn!(error = %e, "Failed to remove stale dashboard");
            }
            return Ok(FetchOutcome::Discarded);
        }
        Ok(FetchOutcome::Fetched(dashboard.snapshot))
    }

    fn is_current(&self, ticket: Option<u64>) -> bool {
        match (self.session.as_ref(), ticket) {
            (Some(session), Some(generation)) => session.is_current(generation),
            _ => true,
        }
    }

    /// Drop the in-memory snapshot and freshness instant.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.snapshot = None;
        inner.last_fetch_ms = 0;
        debug!("Dashboard cache cleared");
    }
}

fn is_fresh(last_fetch_ms: i64, now_ms: i64, ttl_ms: i64) -> bool {
    last_fetch_ms > 0 && now_ms - last_fetch_ms < ttl_ms
}

/// Clears the in-flight flag when dropped, even if the fetch is cancelled.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::state::{ExpiryCause, SessionEvent, SessionState};
    use crate::store::MemoryStore;
    use groupsave_client::{DashboardStats, GroupSummary, LoginResponse, Profile};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const NOW: i64 = 1_700_000_000_000;

    fn snapshot(title: &str) -> DashboardSnapshot {
        DashboardSnapshot {
            top_groups: Vec::new(),
            my_groups: vec![GroupSummary {
                id: 1,
                title: title.to_string(),
                target_amount: "1000".to_string(),
                active_members: 2,
                total_members: 5,
                owner: None,
                is_active: Some(true),
                payable_amount: None,
            }],
            stats: DashboardStats::default(),
        }
    }

    fn dashboard_body() -> serde_json::Value {
        serde_json::json!({
            "suggested_groups": [],
            "user_groups": [{
                "id": 7,
                "title": "Holiday Fund",
                "target_amount": 5000,
                "active_members": 3,
                "total_members": 10
            }],
            "stats": { "total_groups": 1 },
            "user": { "name": "Ada Byron", "email": "ada@example.com" }
        })
    }

    struct Fixture {
        cache: DashboardCache,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(NOW));
        let cache =
            DashboardCache::with_clock(store.clone(), &SessionConfig::default(), clock.clone());
        Fixture {
            cache,
            store,
            clock,
        }
    }

    fn client(server: &MockServer) -> GroupSaveClient {
        GroupSaveClient::builder()
            .base_url(server.uri())
            .auth_token("tok")
            .build()
            .unwrap()
    }

    #[test]
    fn test_freshness_boundaries() {
        assert!(!is_fresh(0, NOW, 30_000));
        assert!(is_fresh(NOW, NOW, 30_000));
        assert!(is_fresh(NOW, NOW + 29_999, 30_000));
        assert!(!is_fresh(NOW, NOW + 30_000, 30_000));
    }

    #[tokio::test]
    async fn test_put_marks_fresh_and_persists() {
        let f = fixture();
        assert!(!f.cache.is_fresh(NOW).await);

        f.cache.put(snapshot("Rent")).await;
        assert!(f.cache.is_fresh(NOW).await);
        assert_eq!(f.cache.get().await, Some(snapshot("Rent")));
        assert!(
            f.store
                .peek(keys::DASHBOARD_DATA)
                .unwrap()
                .contains("\"myGroups\"")
        );

        f.clock.advance(30_000);
        assert!(!f.cache.is_fresh(f.clock.now_ms()).await);
    }

    #[tokio::test]
    async fn test_load_persisted_is_stale() {
        let f = fixture();
        f.cache.put(snapshot("Rent")).await;

        let cold = DashboardCache::with_clock(
            f.store.clone(),
            &SessionConfig::default(),
            f.clock.clone(),
        );
        assert_eq!(cold.load_persisted().await, Some(snapshot("Rent")));
        assert_eq!(cold.get().await, Some(snapshot("Rent")));
        assert!(!cold.is_fresh(NOW).await);
    }

    #[tokio::test]
    async fn test_load_persisted_ignores_garbage() {
        let store = Arc::new(MemoryStore::with_values([(keys::DASHBOARD_DATA, "{")]));
        let cache = DashboardCache::new(store, &SessionConfig::default());
        assert_eq!(cache.load_persisted().await, None);
    }

    #[tokio::test]
    async fn test_fetch_skips_network_when_fresh() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/dashboard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(dashboard_body()))
            .expect(1)
            .mount(&server)
            .await;

        let f = fixture();
        let client = client(&server);
        let first = f.cache.fetch(&client, FetchMode::Normal).await.unwrap();
        match first {
            FetchOutcome::Fetched(s) => assert_eq!(s.my_groups[0].title, "Holiday Fund"),
            other => panic!("expected fetch, got {other:?}"),
        }

        f.clock.advance(10_000);
        assert_eq!(
            f.cache.fetch(&client, FetchMode::Normal).await.unwrap(),
            FetchOutcome::Fresh
        );
    }

    #[tokio::test]
    async fn test_force_refresh_always_fetches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/dashboard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(dashboard_body()))
            .expect(2)
            .mount(&server)
            .await;

        let f = fixture();
        let client = client(&server);
        f.cache.fetch(&client, FetchMode::Normal).await.unwrap();
        assert!(matches!(
            f.cache.fetch(&client, FetchMode::Force).await.unwrap(),
            FetchOutcome::Fetched(_)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_fetch_is_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/dashboard"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(dashboard_body())
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let f = fixture();
        let client = client(&server);
        let (a, b) = tokio::join!(
            f.cache.fetch(&client, FetchMode::Force),
            f.cache.fetch(&client, FetchMode::Force)
        );
        let outcomes = [a.unwrap(), b.unwrap()];
        assert!(outcomes.contains(&FetchOutcome::InFlight));
        assert!(outcomes.iter().any(|o| matches!(o, FetchOutcome::Fetched(_))));
        assert!(!f.cache.is_fetching());
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/dashboard"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "message": "Server Error"
            })))
            .mount(&server)
            .await;

        let f = fixture();
        f.cache.put(snapshot("Rent")).await;
        let err = f
            .cache
            .fetch(&client(&server), FetchMode::Force)
            .await
            .unwrap_err();
        assert!(err.is_server_error());
        assert_eq!(f.cache.get().await, Some(snapshot("Rent")));
        assert!(!f.cache.is_fetching());
    }

    #[tokio::test]
    async fn test_unauthorized_fetch_logs_out_and_keeps_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/dashboard"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "message": "Unauthenticated."
            })))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(NOW));
        let config = SessionConfig::default();
        let manager = SessionManager::with_clock(store.clone(), config.clone(), clock.clone());
        manager
            .establish(&LoginResponse {
                token: "tok".to_string(),
                user: None,
                expires_in: Some(3600),
            })
            .await;

        let cache = DashboardCache::with_clock(store.clone(), &config, clock)
            .with_session(manager.clone());
        cache.put(snapshot("Rent")).await;

        let client = GroupSaveClient::builder()
            .base_url(server.uri())
            .session(Arc::new(manager.clone()))
            .build()
            .unwrap();

        let err = cache.fetch(&client, FetchMode::Force).await.unwrap_err();
        assert!(err.is_auth_error());
        assert_eq!(manager.state(), SessionState::Unauthenticated);
        assert_eq!(store.peek(keys::TOKEN), None);
        assert_eq!(store.peek(keys::DASHBOARD_DATA), None);
        assert_eq!(cache.get().await, Some(snapshot("Rent")));
    }

    struct SessionFixture {
        manager: SessionManager,
        cache: DashboardCache,
        store: Arc<MemoryStore>,
        server: MockServer,
    }

    async fn session_fixture(config: SessionConfig, delay: Duration) -> SessionFixture {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/dashboard"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(dashboard_body())
                    .set_delay(delay),
            )
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let manager = SessionManager::new(store.clone(), config.clone());
        let cache = DashboardCache::new(store.clone(), &config).with_session(manager.clone());
        SessionFixture {
            manager,
            cache,
            store,
            server,
        }
    }

    fn session_client(f: &SessionFixture) -> GroupSaveClient {
        GroupSaveClient::builder()
            .base_url(f.server.uri())
            .session(Arc::new(f.manager.clone()))
            .build()
            .unwrap()
    }

    fn signed_in(name: &str) -> LoginResponse {
        LoginResponse {
            token: format!("tok-{name}"),
            user: Some(Profile {
                name: Some(name.to_string()),
                email: None,
                mobile: None,
            }),
            expires_in: Some(3600),
        }
    }

    #[tokio::test]
    async fn test_sign_out_during_fetch_discards_response() {
        let f = session_fixture(SessionConfig::default(), Duration::from_millis(300)).await;
        f.manager.establish(&signed_in("Grace")).await;
        let client = session_client(&f);

        let (outcome, _) = tokio::join!(f.cache.fetch(&client, FetchMode::Force), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            f.manager.sign_out().await
        });

        assert_eq!(outcome.unwrap(), FetchOutcome::Discarded);
        assert_eq!(f.manager.state(), SessionState::Unauthenticated);
        assert_eq!(f.store.peek(keys::DASHBOARD_DATA), None);
        assert_eq!(f.store.peek(keys::USER), None);
        assert_eq!(f.cache.get().await, None);
    }

    #[tokio::test]
    async fn test_new_sign_in_during_fetch_discards_previous_response() {
        let f = session_fixture(SessionConfig::default(), Duration::from_millis(300)).await;
        f.manager.establish(&signed_in("Grace")).await;
        let client = session_client(&f);

        let (outcome, _) = tokio::join!(f.cache.fetch(&client, FetchMode::Force), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            f.manager.sign_out().await;
            f.manager.establish(&signed_in("Linus")).await
        });

        assert_eq!(outcome.unwrap(), FetchOutcome::Discarded);
        assert!(f.manager.state().is_authenticated());
        assert_eq!(f.store.peek(keys::DASHBOARD_DATA), None);
        let profile = f.manager.profile().await.unwrap();
        assert_eq!(profile.name.as_deref(), Some("Linus"));
    }

    #[tokio::test]
    async fn test_expiry_timer_during_fetch_discards_response() {
        // Arms the precise timer roughly 100ms after sign-in.
        let config = SessionConfig::default().with_expiry_margin(Duration::from_millis(3_599_900));
        let f = session_fixture(config, Duration::from_millis(400)).await;
        f.manager.start().await;
        f.manager.establish(&signed_in("Grace")).await;
        assert!(f.manager.state().is_authenticated());
        let mut events = f.manager.events();

        let outcome = f
            .cache
            .fetch(&session_client(&f), FetchMode::Force)
            .await
            .unwrap();

        assert_eq!(outcome, FetchOutcome::Discarded);
        assert_eq!(f.manager.state(), SessionState::Unauthenticated);
        assert!(matches!(
            events.try_recv(),
            Ok(SessionEvent::Expired {
                cause: ExpiryCause::Timer
            })
        ));
        assert_eq!(f.store.peek(keys::DASHBOARD_DATA), None);
        assert_eq!(f.store.peek(keys::TOKEN), None);
        f.manager.stop();
    }

    #[tokio::test]
    async fn test_fetch_forwards_profile_to_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/dashboard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(dashboard_body()))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let config = SessionConfig::default();
        let manager = SessionManager::new(store.clone(), config.clone());
        manager
            .establish(&LoginResponse {
                token: "tok".to_string(),
                user: None,
                expires_in: None,
            })
            .await;

        let cache = DashboardCache::new(store, &config).with_session(manager.clone());
        cache.fetch(&client(&server), FetchMode::Normal).await.unwrap();

        let profile = manager.profile().await.unwrap();
        assert_eq!(profile.name.as_deref(), Some("Ada Byron"));
    }

    #[tokio::test]
    async fn test_clear() {
        let f = fixture();
        f.cache.put(snapshot("Rent")).await;
        f.cache.clear().await;
        assert_eq!(f.cache.get().await, None);
        assert!(!f.cache.is_fresh(NOW).await);
    }
}
