use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use serde::Deserialize;

pub const USERNAME_KEY: &str = "username";
pub const LOGGED_IN_KEY: &str = "loggedIn";
pub const GUEST: &str = "Guest";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
}

/// String key/value storage for one lifetime of session data.
pub trait SessionScope: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

#[derive(Debug, Default)]
pub struct MemoryScope {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryScope {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionScope for MemoryScope {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.write().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }
}

/// The single account accepted by the gate, from `[auth]`.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Authenticated,
    Unauthenticated,
}

/// Login stub. Not a security boundary: it only remembers who logged in.
pub struct SessionGate {
    credentials: Credentials,
    session: Arc<dyn SessionScope>,
    persistent: Arc<dyn SessionScope>,
}

impl SessionGate {
    pub fn new(
        credentials: Credentials,
        session: Arc<dyn SessionScope>,
        persistent: Arc<dyn SessionScope>,
    ) -> Self {
        Self {
            credentials,
            session,
            persistent,
        }
    }

    /// Gate with fresh in-memory scopes.
    pub fn in_memory(credentials: Credentials) -> Self {
        Self::new(
            credentials,
            Arc::new(MemoryScope::new()),
            Arc::new(MemoryScope::new()),
        )
    }

    pub fn login(&self, username: &str, password: &str, remember: bool) -> Result<(), AuthError> {
        if username != self.credentials.username || password != self.credentials.password {
            tracing::warn!(username, "login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        write_login(self.session.as_ref(), username);
        if remember {
            write_login(self.persistent.as_ref(), username);
        }
        tracing::info!(username, remember, "logged in");
        Ok(())
    }

    /// A login remembered only in the persistent scope is restored into the
    /// session scope.
    pub fn state(&self) -> AuthState {
        if is_logged_in(self.session.as_ref()) {
            return AuthState::Authenticated;
        }
        if is_logged_in(self.persistent.as_ref()) {
            let username = self.persistent.get(USERNAME_KEY).unwrap_or_default();
            write_login(self.session.as_ref(), &username);
            return AuthState::Authenticated;
        }
        AuthState::Unauthenticated
    }

    pub fn current_user(&self) -> String {
        self.session
            .get(USERNAME_KEY)
            .or_else(|| self.persistent.get(USERNAME_KEY))
            .unwrap_or_else(|| GUEST.to_string())
    }

    pub fn logout(&self) {
        for scope in [&self.session, &self.persistent] {
            scope.remove(USERNAME_KEY);
            scope.remove(LOGGED_IN_KEY);
        }
        tracing::info!("logged out");
    }
}

fn write_login(scope: &dyn SessionScope, username: &str) {
    scope.set(USERNAME_KEY, username);
    scope.set(LOGGED_IN_KEY, "true");
}

fn is_logged_in(scope: &dyn SessionScope) -> bool {
    scope.get(LOGGED_IN_KEY).as_deref() == Some("true")
}
