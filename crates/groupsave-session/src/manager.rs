//! The session lifecycle state machine.
//!
//! A single [`SessionManager`] owns the session triad in the store, the
//! expiry timer and the safety-net poll. Every path that ends a session
//! funnels through one atomic claim on the state channel, so concurrent
//! triggers (timer, poll, 401, sign-out) tear down at most once.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use groupsave_client::{LoginResponse, Profile, SessionHandle};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::navigator::Navigator;
use crate::state::{ExpiryCause, SessionEvent, SessionNotice, SessionState};
use crate::store::{SessionStore, keys};

const EVENT_CAPACITY: usize = 16;
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Owner of the authenticated session.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    state: watch::Sender<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    /// Why the current `Expired` state was entered. Taken by `logout`.
    cause: Mutex<Option<ExpiryCause>>,
    navigation: Mutex<Navigation>,
    /// Cancels the running timer/poll task.
    watcher: Mutex<Option<CancellationToken>>,
    running: AtomicBool,
    /// Bumped on every sign-in and every teardown.
    generation: AtomicU64,
}

#[derive(Default)]
struct Navigation {
    navigator: Option<Arc<dyn Navigator>>,
    /// A redirect requested while no navigator was attached.
    pending: Option<Option<SessionNotice>>,
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        if let Some(token) = self.watcher.get_mut().take() {
            token.cancel();
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.state())
            .field("running", &self.is_running())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl SessionManager {
    /// Create a manager over `store` using the system clock.
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Create a manager with an explicit clock.
    pub fn with_clock(
        store: Arc<dyn SessionStore>,
        config: SessionConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(ManagerInner {
                store,
                clock,
                config,
                state,
                events,
                cause: Mutex::new(None),
                navigation: Mutex::new(Navigation::default()),
                watcher: Mutex::new(None),
                running: AtomicBool::new(false),
                generation: AtomicU64::new(0),
            }),
        }
    }

    fn from_weak(inner: &Weak<ManagerInner>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Observation
    // ─────────────────────────────────────────────────────────────────────────

    /// Current state.
    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Receive lifecycle events.
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.inner.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    /// Whether the timer and poll are armed by [`SessionManager::start`].
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Time left before the token expires, if the session has an expiry.
    pub fn remaining(&self) -> Option<Duration> {
        let expires_at = self.state().expires_at()?;
        let left = expires_at.saturating_sub(self.now()).max(0);
        Some(Duration::from_millis(left as u64))
    }

    /// Identifies the current session. Changes whenever a session is
    /// established or torn down, so work started under one session can tell
    /// whether it still belongs to the current one.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Whether the session identified by `generation` is still authenticated.
    pub fn is_current(&self, generation: u64) -> bool {
        self.state().is_authenticated() && self.generation() == generation
    }

    fn now(&self) -> i64 {
        self.inner.clock.now_ms()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Navigation
    // ─────────────────────────────────────────────────────────────────────────

    /// Attach the host navigator, delivering any redirect held while detached.
    pub fn attach_navigator(&self, navigator: Arc<dyn Navigator>) {
        let pending = {
            let mut nav = self.inner.navigation.lock();
            nav.navigator = Some(navigator.clone());
            nav.pending.take()
        };
        if let Some(notice) = pending {
            tracing::debug!("Delivering held sign-in redirect");
            deliver(navigator.as_ref(), notice);
        }
    }

    pub fn detach_navigator(&self) {
        self.inner.navigation.lock().navigator = None;
    }

    fn redirect(&self, notice: Option<SessionNotice>) {
        let navigator = {
            let mut nav = self.inner.navigation.lock();
            match nav.navigator.clone() {
                Some(navigator) => navigator,
                None => {
                    tracing::debug!("No navigator attached; holding sign-in redirect");
                    nav.pending = Some(notice);
                    return;
                }
            }
        };
        deliver(navigator.as_ref(), notice);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stored session
    // ─────────────────────────────────────────────────────────────────────────

    async fn read(&self, key: &str) -> Option<String> {
        match self.inner.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "Session store read failed; treating as absent");
                None
            }
        }
    }

    async fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.inner.store.set(key, value).await {
            tracing::warn!(key, error = %e, "Session store write failed");
        }
    }

    async fn erase(&self, names: &[&str]) {
        if let Err(e) = self.inner.store.remove(names).await {
            tracing::warn!(error = %e, "Session store cleanup failed");
        }
    }

    /// Stored bearer token.
    pub async fn token(&self) -> Option<String> {
        self.read(keys::TOKEN).await
    }

    /// Stored profile. An unparseable profile reads as absent.
    pub async fn profile(&self) -> Option<Profile> {
        let raw = self.read(keys::USER).await?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(error = %e, "Stored profile is not valid JSON");
                None
            }
        }
    }

    /// Stored expiry in epoch milliseconds. An unparseable value reads as absent.
    pub async fn stored_expiry(&self) -> Option<i64> {
        let raw = self.read(keys::TOKEN_EXPIRES_AT).await?;
        match raw.trim().parse::<i64>() {
            Ok(ms) => Some(ms),
            Err(_) => {
                tracing::warn!(value = %raw, "Stored token expiry is not a timestamp");
                None
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluate the stored session.
    ///
    /// Returns `Expired` when the stored expiry has passed; by the time this
    /// returns, teardown has already run and the state is `Unauthenticated`.
    /// Once the session has ended, this returns the current state unchanged.
    pub async fn check(&self) -> SessionState {
        self.evaluate(ExpiryCause::Check).await
    }

    async fn evaluate(&self, cause: ExpiryCause) -> SessionState {
        let current = self.state();
        if current.is_ended() {
            return current;
        }

        if self.token().await.is_none() {
            if current.is_authenticated() {
                tracing::info!("Stored token disappeared; ending session");
                self.sign_out().await;
            } else {
                self.inner.state.send_if_modified(|s| {
                    if *s == SessionState::Unknown {
                        *s = SessionState::Unauthenticated;
                        true
                    } else {
                        false
                    }
                });
            }
            return self.state();
        }

        let expires_at = self.stored_expiry().await;
        if let Some(exp) = expires_at
            && self.now() >= exp
        {
            tracing::info!(expires_at = exp, %cause, "Stored token has expired");
            self.expire_if(cause, |s| {
                matches!(s, SessionState::Unknown | SessionState::Authenticated { .. })
            })
            .await;
            return SessionState::Expired;
        }

        let next = SessionState::Authenticated { expires_at };
        self.inner.state.send_if_modified(|s| match *s {
            SessionState::Unknown | SessionState::Authenticated { .. } if *s != next => {
                *s = next;
                true
            }
            _ => false,
        });
        self.state()
    }

    /// Check the stored session and arm the expiry timer and poll.
    ///
    /// A session whose expiry falls inside the safety margin is ended
    /// immediately and `Expired` is returned.
    pub async fn start(&self) -> SessionState {
        self.inner.running.store(true, Ordering::SeqCst);
        let state = self.check().await;
        if let SessionState::Authenticated { expires_at } = state
            && self.arm(expires_at).await
        {
            return SessionState::Expired;
        }
        state
    }

    /// Cancel the timer and poll. The session itself is left as is.
    pub fn stop(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
        self.disarm();
    }

    /// Re-evaluate after the host returns to the foreground.
    pub async fn foreground_resumed(&self) -> SessionState {
        let state = self.evaluate(ExpiryCause::Foreground).await;
        if let SessionState::Authenticated { expires_at } = state
            && self.is_running()
            && self.arm(expires_at).await
        {
            return SessionState::Expired;
        }
        state
    }

    /// Record a successful sign-in.
    ///
    /// Writes token, expiry and profile in that order. A missing expiry or
    /// profile removes any stale stored value.
    pub async fn establish(&self, login: &LoginResponse) -> SessionState {
        let expires_at = login.expires_at(self.now());

        self.write(keys::TOKEN, &login.token).await;
        match expires_at {
            Some(exp) => self.write(keys::TOKEN_EXPIRES_AT, &exp.to_string()).await,
            None => self.erase(&[keys::TOKEN_EXPIRES_AT]).await,
        }
        match login.user.as_ref().map(serde_json::to_string) {
            Some(Ok(json)) => self.write(keys::USER, &json).await,
            Some(Err(e)) => tracing::warn!(error = %e, "Failed to serialize profile"),
            None => self.erase(&[keys::USER]).await,
        }

        *self.inner.cause.lock() = None;
        self.inner.navigation.lock().pending = None;
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner
            .state
            .send_replace(SessionState::Authenticated { expires_at });
        tracing::info!(expires_at, "Session established");
        let _ = self.inner.events.send(SessionEvent::SignedIn { expires_at });

        if self.is_running() && self.arm(expires_at).await {
            return SessionState::Expired;
        }
        self.state()
    }

    /// Replace the stored profile. Ignored unless authenticated.
    pub async fn update_profile(&self, profile: &Profile) -> bool {
        if !self.state().is_authenticated() {
            tracing::debug!("Ignoring profile update outside an authenticated session");
            return false;
        }
        match serde_json::to_string(profile) {
            Ok(json) => {
                self.write(keys::USER, &json).await;
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize profile");
                false
            }
        }
    }

    /// Handle a 401 from the server.
    pub async fn unauthorized(&self) -> bool {
        tracing::warn!("Server rejected the session token");
        self.expire_if(ExpiryCause::Rejected, |s| {
            matches!(s, SessionState::Unknown | SessionState::Authenticated { .. })
        })
        .await
    }

    /// Finish an ended session: clear storage and redirect to sign-in.
    ///
    /// Returns `false` when the session was already torn down, in which case
    /// nothing happens.
    pub async fn logout(&self) -> bool {
        let mut claimed = false;
        self.inner.state.send_if_modified(|s| {
            if *s == SessionState::Unauthenticated {
                false
            } else {
                *s = SessionState::Unauthenticated;
                claimed = true;
                true
            }
        });
        if !claimed {
            tracing::debug!("Session already torn down");
            return false;
        }
        self.inner.generation.fetch_add(1, Ordering::SeqCst);

        let notice = self.inner.cause.lock().take().map(ExpiryCause::notice);
        self.teardown(notice).await;
        true
    }

    /// User-initiated sign-out. Same cleanup as [`SessionManager::logout`], no notice.
    pub async fn sign_out(&self) -> bool {
        if self.state() != SessionState::Expired {
            *self.inner.cause.lock() = None;
        }
        self.logout().await
    }

    async fn expire_if(
        &self,
        cause: ExpiryCause,
        expected: impl Fn(&SessionState) -> bool,
    ) -> bool {
        let mut claimed = false;
        self.inner.state.send_if_modified(|s| {
            if expected(&*s) {
                *s = SessionState::Expired;
                *self.inner.cause.lock() = Some(cause);
                claimed = true;
                true
            } else {
                false
            }
        });
        if !claimed {
            return false;
        }

        let _ = self.inner.events.send(SessionEvent::Expired { cause });
        self.logout().await;
        true
    }

    async fn teardown(&self, notice: Option<SessionNotice>) {
        self.disarm();
        self.erase(&keys::SESSION).await;
        self.redirect(notice);
        tracing::info!(notice = ?notice, "Signed out");
        let _ = self.inner.events.send(SessionEvent::SignedOut { notice });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Timer and poll
    // ─────────────────────────────────────────────────────────────────────────

    /// Arm the lifecycle task. Returns `true` if the session was ended
    /// instead because the expiry already falls inside the margin.
    async fn arm(&self, expires_at: Option<i64>) -> bool {
        if let Some(exp) = expires_at {
            let delay = exp - self.inner.config.expiry_margin_ms() - self.now();
            if delay <= 0 {
                tracing::info!(expires_at = exp, "Token expires within the safety margin");
                return self
                    .expire_if(ExpiryCause::Timer, |s| {
                        *s == SessionState::Authenticated { expires_at }
                    })
                    .await;
            }
        }

        let token = CancellationToken::new();
        if let Some(previous) = self.inner.watcher.lock().replace(token.clone()) {
            previous.cancel();
        }
        tokio::spawn(watch_session(
            Arc::downgrade(&self.inner),
            token,
            expires_at,
        ));
        false
    }

    fn disarm(&self) {
        if let Some(token) = self.inner.watcher.lock().take() {
            token.cancel();
        }
    }

    async fn timer_fired(&self, expires_at: Option<i64>) {
        let expected = SessionState::Authenticated { expires_at };
        if self.state() != expected {
            tracing::debug!("Expiry timer fired for a superseded session");
            return;
        }
        tracing::info!(expires_at, "Session expiry timer fired");
        self.expire_if(ExpiryCause::Timer, |s| *s == expected).await;
    }

    /// Returns `true` when the watcher should stop.
    async fn poll_expiry(&self) -> bool {
        let state = self.state();
        if !state.is_authenticated() {
            return true;
        }
        match self.stored_expiry().await {
            Some(exp) if self.now() >= exp - self.inner.config.expiry_margin_ms() => {
                tracing::info!(expires_at = exp, "Expiry poll found the token expiring");
                self.expire_if(ExpiryCause::Poll, |s| *s == state).await;
                true
            }
            _ => false,
        }
    }
}

fn deliver(navigator: &dyn Navigator, notice: Option<SessionNotice>) {
    if let Some(notice) = notice {
        navigator.show_notice(notice);
    }
    navigator.reset_to_sign_in();
}

/// Runs the precise timer and the poll until one ends the session or the
/// token is cancelled. Holds only a weak reference to the manager.
async fn watch_session(
    inner: Weak<ManagerInner>,
    cancel: CancellationToken,
    expires_at: Option<i64>,
) {
    let (deadline, poll_interval) = {
        let Some(manager) = SessionManager::from_weak(&inner) else {
            return;
        };
        let deadline = expires_at.map(|exp| {
            let delay = exp - manager.inner.config.expiry_margin_ms() - manager.now();
            Instant::now() + Duration::from_millis(delay.max(0) as u64)
        });
        let interval = manager.inner.config.poll_interval.max(MIN_POLL_INTERVAL);
        (deadline, interval)
    };

    let timer = async move {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(timer);

    let mut poll = tokio::time::interval_at(Instant::now() + poll_interval, poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = &mut timer => {
                if let Some(manager) = SessionManager::from_weak(&inner) {
                    manager.timer_fired(expires_at).await;
                }
                break;
            }
            _ = poll.tick() => {
                let Some(manager) = SessionManager::from_weak(&inner) else {
                    break;
                };
                if manager.poll_expiry().await {
                    break;
                }
            }
        }
    }
    tracing::trace!("Session watcher stopped");
}

#[async_trait]
impl SessionHandle for SessionManager {
    async fn bearer_token(&self) -> Option<String> {
        self.token().await
    }

    async fn unauthorized_response(&self) {
        self.unauthorized().await;
    }
}
