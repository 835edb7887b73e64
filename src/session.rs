// Explicit auth session state.
//
// The session is an owned, explicitly initialized context rather than
// process-wide ambient state: `open` on login or restore, `close` on
// logout. The bearer token is read from here per request.

use parking_lot::RwLock;

use crate::models::User;

#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

impl Session {
    pub fn is_host(&self) -> bool {
        self.user.role == "host"
            || self
                .user
                .host_info
                .map(|info| info.is_host)
                .unwrap_or(false)
    }

    pub fn is_admin(&self) -> bool {
        self.user.role == "admin"
    }
}

#[derive(Default)]
pub struct SessionStore {
    inner: RwLock<Option<Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Install a session, replacing any previous one.
    pub fn open(&self, session: Session) {
        tracing::debug!(user = %session.user.email, "session opened");
        *self.inner.write() = Some(session);
    }

    // Tear the session down. Idempotent.
    pub fn close(&self) {
        if self.inner.write().take().is_some() {
            tracing::debug!("session closed");
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.inner.read().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.inner.read().as_ref().map(|s| s.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read().is_some()
    }
}
