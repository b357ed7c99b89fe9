//! Single source of truth for identity and the profile cache. Every
//! authorized backend call is mediated here; consumers never mutate
//! session state directly, they call the operations below and watch the
//! published snapshots.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::watch;
use tracing::instrument;

use crate::api::{ApiClient, ApiError, RegisterRequest};
use crate::models::{AppMode, Profile, ProfileDraft, User};
use crate::token_store::TokenStore;

const SESSION_ENDED: &str = "session expired, please log in again";

#[derive(Error, Debug)]
pub enum SessionError {
    /// The server rejected the credentials or the token. The session has
    /// already been collapsed to anonymous when this is returned from an
    /// authenticated operation.
    #[error("authentication rejected: {0}")]
    AuthRejected(String),
    /// The server refused the data; session state is untouched.
    #[error("{0}")]
    Validation(String),
    /// Transport-level failure; session state is untouched.
    #[error("network unavailable: {0}")]
    Network(String),
    #[error("token storage failed: {0}")]
    Storage(String),
}

impl From<ApiError> for SessionError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized => SessionError::AuthRejected(SESSION_ENDED.to_string()),
            ApiError::Rejected { detail, .. } => SessionError::Validation(detail),
            ApiError::Network(msg) | ApiError::Decode(msg) | ApiError::Url(msg) => {
                SessionError::Network(msg)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No token.
    Anonymous,
    /// Token present, user not yet confirmed against the backend.
    Authenticating,
    /// User loaded.
    Authenticated,
}

/// Immutable view of the session published to subscribers.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub user: Option<User>,
    pub profiles: Vec<Profile>,
    pub active_profile_id: Option<i64>,
    pub app_mode: AppMode,
    /// True once the initial token check has finished, whichever way it
    /// went. UIs use this to distinguish "still loading" from "logged out".
    pub resolved: bool,
}

impl SessionSnapshot {
    pub fn active_profile(&self) -> Option<&Profile> {
        let id = self.active_profile_id?;
        self.profiles.iter().find(|p| p.id == id)
    }
}

#[derive(Debug)]
struct SessionState {
    token: Option<String>,
    user: Option<User>,
    profiles: Vec<Profile>,
    active_profile_id: Option<i64>,
    app_mode: AppMode,
    resolved: bool,
    /// Bumped on every login/logout boundary. Background tasks capture it
    /// when they start and discard their result if it has moved on, so a
    /// fetch that resolves after logout cannot repopulate the session.
    generation: u64,
}

impl SessionState {
    fn snapshot(&self) -> SessionSnapshot {
        let phase = if self.token.is_none() {
            SessionPhase::Anonymous
        } else if self.user.is_none() {
            SessionPhase::Authenticating
        } else {
            SessionPhase::Authenticated
        };

        SessionSnapshot {
            phase,
            user: self.user.clone(),
            profiles: self.profiles.clone(),
            active_profile_id: self.active_profile_id,
            app_mode: self.app_mode,
            resolved: self.resolved,
        }
    }

    /// Keep the active reference pointing at a live profile: keep it if it
    /// still names an element, otherwise fall back to the first element,
    /// otherwise clear it.
    fn repair_active(&mut self) {
        let still_there = self
            .active_profile_id
            .is_some_and(|id| self.profiles.iter().any(|p| p.id == id));
        if !still_there {
            self.active_profile_id = self.profiles.first().map(|p| p.id);
        }
    }
}

pub struct SessionStore {
    api: ApiClient,
    tokens: TokenStore,
    state: Mutex<SessionState>,
    tx: watch::Sender<SessionSnapshot>,
}

impl SessionStore {
    /// Build the store, picking up a persisted token if one exists. The
    /// caller decides when the token check runs: [`SessionStore::bootstrap`]
    /// spawns it in the background, or await [`SessionStore::resolve_user`]
    /// directly for a sequential front end.
    pub fn new(api: ApiClient, tokens: TokenStore) -> Arc<Self> {
        let token = tokens.load().unwrap_or_else(|err| {
            tracing::warn!("failed to read persisted token: {err}");
            None
        });

        let state = SessionState {
            token,
            user: None,
            profiles: Vec::new(),
            active_profile_id: None,
            app_mode: AppMode::default(),
            resolved: false,
            generation: 0,
        };
        let (tx, _) = watch::channel(state.snapshot());

        Arc::new(Self {
            api,
            tokens,
            state: Mutex::new(state),
            tx,
        })
    }

    /// Kick off the initial token check without blocking the caller.
    pub fn bootstrap(self: &Arc<Self>) {
        self.spawn_resolve();
    }

    /// Subscribe to session snapshots. The receiver always holds the
    /// latest state; consumers re-render on change notifications.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.read(|s| s.snapshot())
    }

    fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        let state = self.state.lock().expect("session state lock poisoned");
        f(&state)
    }

    /// Mutate under the lock, then publish the resulting snapshot.
    fn mutate<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.state.lock().expect("session state lock poisoned");
        let result = f(&mut state);
        self.tx.send_replace(state.snapshot());
        result
    }

    fn spawn_resolve(self: &Arc<Self>) {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            store.resolve_user().await;
        });
    }

    fn spawn_fetch_profiles(self: &Arc<Self>) {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = store.fetch_profiles().await {
                tracing::debug!("background profile refresh failed: {err}");
            }
        });
    }

    /// Token plus the generation it belongs to, for handing to an async
    /// operation that must detect a login/logout happening under it.
    fn auth_token(&self) -> Option<(String, u64)> {
        self.read(|s| s.token.clone().map(|t| (t, s.generation)))
    }

    fn adopt_token(&self, token: String) {
        self.mutate(|s| {
            s.token = Some(token);
            s.user = None;
            s.profiles.clear();
            s.active_profile_id = None;
            s.resolved = false;
            s.generation += 1;
        });
    }

    /// Exchange credentials for a token. Returns as soon as the token is
    /// persisted; user and profile data load in the background, so callers
    /// must not assume they are populated yet.
    #[instrument(skip(self, password))]
    pub async fn login(self: &Arc<Self>, username: &str, password: &str) -> Result<(), SessionError> {
        let grant = self.api.login(username, password).await.map_err(|err| match err {
            ApiError::Rejected { detail, .. } => SessionError::AuthRejected(detail),
            other => other.into(),
        })?;

        self.tokens
            .save(&grant.access_token)
            .map_err(|err| SessionError::Storage(err.to_string()))?;
        self.adopt_token(grant.access_token);
        self.spawn_resolve();
        Ok(())
    }

    /// Create an account. Same token contract as [`SessionStore::login`],
    /// but failures collapse to `false` so the caller can show a generic
    /// message.
    #[instrument(skip(self, seed))]
    pub async fn register(self: &Arc<Self>, seed: &RegisterRequest) -> bool {
        let grant = match self.api.register(seed).await {
            Ok(grant) => grant,
            Err(err) => {
                tracing::warn!("registration failed: {err}");
                return false;
            }
        };

        if let Err(err) = self.tokens.save(&grant.access_token) {
            tracing::warn!("failed to persist token after registration: {err}");
            return false;
        }
        self.adopt_token(grant.access_token);
        self.spawn_resolve();
        true
    }

    /// Confirm the current token against the backend. Idempotent; with no
    /// token it only marks the initial check as finished. Fail-closed
    /// against the server: any explicit non-OK answer drops the session,
    /// because the rest of the client assumes a loaded user implies a good
    /// token. A transport failure says nothing about the token, so the
    /// session is kept and the check can be re-run.
    #[instrument(skip(self))]
    pub async fn resolve_user(self: &Arc<Self>) {
        let Some((token, generation)) = self.auth_token() else {
            self.mutate(|s| s.resolved = true);
            return;
        };

        match self.api.me(&token).await {
            Ok(user) => {
                let adopted = self.mutate(|s| {
                    if s.generation != generation {
                        return false;
                    }
                    s.user = Some(user);
                    s.resolved = true;
                    true
                });
                if adopted {
                    self.spawn_fetch_profiles();
                }
            }
            Err(err @ (ApiError::Unauthorized | ApiError::Rejected { .. })) => {
                tracing::warn!("server rejected the current-user lookup, dropping session: {err}");
                if self.read(|s| s.generation == generation) {
                    self.logout();
                }
            }
            Err(err) => {
                tracing::warn!("could not reach the server to resolve the user: {err}");
                self.mutate(|s| {
                    if s.generation == generation {
                        s.resolved = true;
                    }
                });
            }
        }
    }

    /// Refresh the profile cache. The server's list replaces the local one
    /// wholesale; there is no per-id reconciliation.
    #[instrument(skip(self))]
    pub async fn fetch_profiles(self: &Arc<Self>) -> Result<(), SessionError> {
        let Some((token, generation)) = self.auth_token() else {
            return Ok(());
        };

        match self.api.list_profiles(&token).await {
            Ok(profiles) => {
                self.mutate(|s| {
                    if s.generation != generation {
                        return;
                    }
                    s.profiles = profiles;
                    s.repair_active();
                });
                Ok(())
            }
            Err(ApiError::Unauthorized) => Err(self.collapse(generation)),
            Err(err) => {
                tracing::warn!("profile refresh failed: {err}");
                Err(err.into())
            }
        }
    }

    /// Create a profile; on success it joins the cache and becomes active.
    pub async fn add_profile(self: &Arc<Self>, draft: &ProfileDraft) -> Result<Profile, SessionError> {
        let Some((token, generation)) = self.auth_token() else {
            return Err(SessionError::AuthRejected(SESSION_ENDED.to_string()));
        };

        match self.api.create_profile(&token, draft).await {
            Ok(profile) => {
                self.mutate(|s| {
                    if s.generation != generation {
                        return;
                    }
                    s.profiles.retain(|p| p.id != profile.id);
                    s.profiles.push(profile.clone());
                    s.active_profile_id = Some(profile.id);
                });
                Ok(profile)
            }
            Err(ApiError::Unauthorized) => Err(self.collapse(generation)),
            Err(err) => Err(err.into()),
        }
    }

    /// Update a profile in place, keeping its position in the list. If the
    /// id is no longer cached locally the server result is dropped
    /// (stale-reference policy), not an error.
    pub async fn update_profile(
        self: &Arc<Self>,
        id: i64,
        draft: &ProfileDraft,
    ) -> Result<Profile, SessionError> {
        let Some((token, generation)) = self.auth_token() else {
            return Err(SessionError::AuthRejected(SESSION_ENDED.to_string()));
        };

        match self.api.update_profile(&token, id, draft).await {
            Ok(profile) => {
                self.mutate(|s| {
                    if s.generation != generation {
                        return;
                    }
                    if let Some(slot) = s.profiles.iter_mut().find(|p| p.id == id) {
                        *slot = profile.clone();
                    }
                });
                Ok(profile)
            }
            Err(ApiError::Unauthorized) => Err(self.collapse(generation)),
            Err(err) => Err(err.into()),
        }
    }

    /// Delete a profile. If it was the active one, the first remaining
    /// profile takes over (or none when the list is empty).
    pub async fn delete_profile(self: &Arc<Self>, id: i64) -> Result<(), SessionError> {
        let Some((token, generation)) = self.auth_token() else {
            return Err(SessionError::AuthRejected(SESSION_ENDED.to_string()));
        };

        match self.api.delete_profile(&token, id).await {
            Ok(()) => {
                self.mutate(|s| {
                    if s.generation != generation {
                        return;
                    }
                    s.profiles.retain(|p| p.id != id);
                    if s.active_profile_id == Some(id) {
                        s.active_profile_id = s.profiles.first().map(|p| p.id);
                    }
                });
                Ok(())
            }
            Err(ApiError::Unauthorized) => Err(self.collapse(generation)),
            Err(err) => Err(err.into()),
        }
    }

    /// Make a cached profile the active one. Purely local; unknown ids are
    /// ignored rather than raised.
    pub fn switch_profile(&self, id: i64) {
        self.mutate(|s| {
            if s.profiles.iter().any(|p| p.id == id) {
                s.active_profile_id = Some(id);
            }
        });
    }

    pub fn set_app_mode(&self, mode: AppMode) {
        self.mutate(|s| s.app_mode = mode);
    }

    /// Drop the token and all cached identity data in one step. Idempotent
    /// and callable at any time.
    pub fn logout(&self) {
        if let Err(err) = self.tokens.clear() {
            tracing::warn!("failed to clear persisted token: {err}");
        }
        self.mutate(|s| {
            s.token = None;
            s.user = None;
            s.profiles.clear();
            s.active_profile_id = None;
            s.resolved = true;
            s.generation += 1;
        });
    }

    /// The 401 side effect. Logs out only when the rejection belongs to
    /// the current session; a stale in-flight request answered 401 after a
    /// logout/relogin boundary must not tear down the fresh session.
    fn collapse(&self, generation: u64) -> SessionError {
        if self.read(|s| s.generation == generation) {
            self.logout();
        }
        SessionError::AuthRejected(SESSION_ENDED.to_string())
    }
}
