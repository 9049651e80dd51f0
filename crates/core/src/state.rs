//! Application state container
//!
//! The single source of truth consulted by routing and the flows. All
//! mutations go through the named transition methods below; observers
//! subscribe for post-transition snapshots and can never catch the
//! state mid-transition.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::Profile;
use crate::session::SessionService;
use crate::storage::{Database, PersistedState};

/// Consistent point-in-time copy of the observable state
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    pub authenticated: bool,
    pub profile_created: bool,
    pub profile: Option<Profile>,
    pub loading: bool,
}

impl StateSnapshot {
    fn logged_out() -> Self {
        Self {
            authenticated: false,
            profile_created: false,
            profile: None,
            loading: false,
        }
    }
}

type Observer = Box<dyn Fn(&StateSnapshot) + Send + Sync>;

/// Process-wide observable state
pub struct AppState {
    db: Arc<Mutex<Database>>,
    session: SessionService,
    inner: Mutex<StateSnapshot>,
    observers: Mutex<Vec<Observer>>,
}

impl AppState {
    /// Build state over an injected database.
    ///
    /// `authenticated` is re-derived through the session service, never
    /// read from the persisted flag: an expired-but-present token must
    /// not resurrect an authenticated session across a restart. The
    /// durable profile snapshot is only honored while the session holds.
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        let session = SessionService::new(db.clone());
        let authenticated = session.is_valid();

        let mut snapshot = StateSnapshot::logged_out();
        snapshot.authenticated = authenticated;

        if authenticated {
            let persisted = db.lock().unwrap().snapshots().load();
            match persisted {
                Ok(Some(persisted)) => {
                    snapshot.profile_created = persisted.profile_created;
                    snapshot.profile = persisted.profile;
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Failed to load persisted state, starting fresh"),
            }
        }

        debug!(
            authenticated = snapshot.authenticated,
            profile_created = snapshot.profile_created,
            "App state initialized"
        );

        Self {
            db,
            session,
            inner: Mutex::new(snapshot),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// The session service backing this state
    pub fn session(&self) -> &SessionService {
        &self.session
    }

    /// Register an observer, called with every post-transition snapshot
    pub fn subscribe(&self, f: impl Fn(&StateSnapshot) + Send + Sync + 'static) {
        self.observers.lock().unwrap().push(Box::new(f));
    }

    /// Current snapshot
    pub fn snapshot(&self) -> StateSnapshot {
        self.inner.lock().unwrap().clone()
    }

    /// Store a token and recompute authentication from it.
    ///
    /// Returns the recomputed validity: supplying an already-expired
    /// token stores it but leaves the session unauthenticated.
    pub fn authenticate(&self, token: &str) -> Result<bool> {
        self.db.lock().unwrap().tokens().set(token)?;
        let valid = self.session.is_valid();

        let snapshot = {
            let mut inner = self.inner.lock().unwrap();
            inner.authenticated = valid;
            inner.clone()
        };

        if valid {
            info!("Session authenticated");
        } else {
            warn!("Supplied token is already expired, session stays unauthenticated");
        }

        self.persist(&snapshot)?;
        self.notify(&snapshot);
        Ok(valid)
    }

    /// One-way flag, reset only by logout.
    ///
    /// A completion arriving after the session terminated is discarded,
    /// same as [`set_profile`](Self::set_profile): a logged-out snapshot
    /// must never carry the created flag.
    pub fn mark_profile_created(&self) -> Result<()> {
        if !self.session.is_valid() {
            warn!("Discarding profile-created flag for a terminated session");
            return Ok(());
        }

        let snapshot = {
            let mut inner = self.inner.lock().unwrap();
            inner.profile_created = true;
            inner.clone()
        };
        self.persist(&snapshot)?;
        self.notify(&snapshot);
        Ok(())
    }

    /// Replace the profile snapshot wholesale.
    ///
    /// A completion arriving after the session terminated is discarded:
    /// fetched data tied to a dead session must not mutate state.
    pub fn set_profile(&self, profile: Profile) -> Result<()> {
        if !self.session.is_valid() {
            warn!("Discarding profile fetched for a terminated session");
            return Ok(());
        }

        let snapshot = {
            let mut inner = self.inner.lock().unwrap();
            inner.profile = Some(profile);
            inner.clone()
        };
        self.persist(&snapshot)?;
        self.notify(&snapshot);
        Ok(())
    }

    /// Transient loading flag; never persisted
    pub fn set_loading(&self, loading: bool) {
        let snapshot = {
            let mut inner = self.inner.lock().unwrap();
            inner.loading = loading;
            inner.clone()
        };
        self.notify(&snapshot);
    }

    /// Clear the token and reset all derived state.
    ///
    /// Safe to call repeatedly and from any trigger point (user action,
    /// detected expiry, server 401). The four fields change together;
    /// observers only ever see the fully reset snapshot.
    pub fn logout(&self) -> Result<()> {
        self.db.lock().unwrap().tokens().clear()?;

        let snapshot = {
            let mut inner = self.inner.lock().unwrap();
            *inner = StateSnapshot::logged_out();
            inner.clone()
        };

        info!("Logged out");
        self.persist(&snapshot)?;
        self.notify(&snapshot);
        Ok(())
    }

    fn persist(&self, snapshot: &StateSnapshot) -> Result<()> {
        self.db.lock().unwrap().snapshots().save(&PersistedState {
            authenticated: snapshot.authenticated,
            profile_created: snapshot.profile_created,
            profile: snapshot.profile.clone(),
        })
    }

    fn notify(&self, snapshot: &StateSnapshot) {
        for observer in self.observers.lock().unwrap().iter() {
            observer(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use chrono::Utc;

    fn encode_token(payload: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.as_bytes());
        format!("{}.{}.signature", header, body)
    }

    fn token_with_exp(sub: &str, exp: i64) -> String {
        encode_token(&format!(r#"{{"sub":"{}","exp":{}}}"#, sub, exp))
    }

    fn fresh_state() -> AppState {
        AppState::new(Arc::new(Mutex::new(Database::open_in_memory().unwrap())))
    }

    #[test]
    fn test_initial_state_is_logged_out() {
        let state = fresh_state();
        let snap = state.snapshot();
        assert!(!snap.authenticated);
        assert!(!snap.profile_created);
        assert!(snap.profile.is_none());
        assert!(!snap.loading);
    }

    #[test]
    fn test_authenticate_with_future_exp() {
        let state = fresh_state();
        let token = token_with_exp("u1", Utc::now().timestamp() + 3600);

        assert!(state.authenticate(&token).unwrap());
        assert!(state.snapshot().authenticated);
    }

    #[test]
    fn test_authenticate_with_expired_token_stays_unauthenticated() {
        let state = fresh_state();
        let token = token_with_exp("u1", Utc::now().timestamp() - 10);

        assert!(!state.authenticate(&token).unwrap());
        assert!(!state.snapshot().authenticated);
        // The token was still stored; only the derived state refused it
        assert!(state.session().token().is_some());
    }

    #[test]
    fn test_logout_resets_everything_atomically() {
        let state = fresh_state();
        let token = encode_token(r#"{"sub":"u1"}"#);
        state.authenticate(&token).unwrap();
        state.mark_profile_created().unwrap();
        state.set_profile(Profile::new("u1")).unwrap();

        // Observers must never see logged-out state with residual profile
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        state.subscribe(move |snap| seen_clone.lock().unwrap().push(snap.clone()));

        state.logout().unwrap();

        let snap = state.snapshot();
        assert!(!snap.authenticated);
        assert!(!snap.profile_created);
        assert!(snap.profile.is_none());

        for observed in seen.lock().unwrap().iter() {
            if !observed.authenticated {
                assert!(observed.profile.is_none());
                assert!(!observed.profile_created);
            }
        }
    }

    #[test]
    fn test_logout_is_idempotent() {
        let state = fresh_state();
        let token = encode_token(r#"{"sub":"u1"}"#);
        state.authenticate(&token).unwrap();

        state.logout().unwrap();
        let first = state.snapshot();
        state.logout().unwrap();
        assert_eq!(state.snapshot(), first);
    }

    #[test]
    fn test_mark_profile_created_after_logout_is_discarded() {
        let state = fresh_state();
        let token = encode_token(r#"{"sub":"u1"}"#);
        state.authenticate(&token).unwrap();
        state.logout().unwrap();

        // Simulates a create-profile call that resolved after logout
        state.mark_profile_created().unwrap();
        let snap = state.snapshot();
        assert!(!snap.authenticated);
        assert!(!snap.profile_created);
    }

    #[test]
    fn test_set_profile_after_logout_is_discarded() {
        let state = fresh_state();
        let token = encode_token(r#"{"sub":"u1"}"#);
        state.authenticate(&token).unwrap();
        state.logout().unwrap();

        // Simulates a profile fetch that resolved after logout
        state.set_profile(Profile::new("u1")).unwrap();
        assert!(state.snapshot().profile.is_none());
    }

    #[test]
    fn test_state_survives_reload_via_revalidation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tider.db");
        let token = token_with_exp("u1", Utc::now().timestamp() + 3600);

        {
            let db = Arc::new(Mutex::new(Database::open(&path).unwrap()));
            let state = AppState::new(db);
            state.authenticate(&token).unwrap();
            state.mark_profile_created().unwrap();
            let mut profile = Profile::new("u1");
            profile.name = Some("Ada".to_string());
            state.set_profile(profile).unwrap();
            state.set_loading(true);
        }

        let db = Arc::new(Mutex::new(Database::open(&path).unwrap()));
        let state = AppState::new(db);
        let snap = state.snapshot();
        assert!(snap.authenticated);
        assert!(snap.profile_created);
        assert_eq!(
            snap.profile.and_then(|p| p.name).as_deref(),
            Some("Ada")
        );
        // Transient flag never resurrects
        assert!(!snap.loading);
    }

    #[test]
    fn test_reload_with_expired_token_starts_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tider.db");

        {
            let db = Arc::new(Mutex::new(Database::open(&path).unwrap()));
            let state = AppState::new(db.clone());
            let live = token_with_exp("u1", Utc::now().timestamp() + 3600);
            state.authenticate(&live).unwrap();
            state.mark_profile_created().unwrap();
            state.set_profile(Profile::new("u1")).unwrap();

            // Token expires while the process is away
            let stale = token_with_exp("u1", Utc::now().timestamp() - 10);
            db.lock().unwrap().tokens().set(&stale).unwrap();
        }

        let db = Arc::new(Mutex::new(Database::open(&path).unwrap()));
        let state = AppState::new(db);
        let snap = state.snapshot();
        assert!(!snap.authenticated);
        assert!(!snap.profile_created);
        assert!(snap.profile.is_none());
    }
}
