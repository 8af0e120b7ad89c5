//! Session authority
//!
//! In-memory store mapping opaque session tokens to an authenticated identity.
//! Sessions carry an absolute expiry fixed at creation; there is no sliding
//! renewal. Sessions are ephemeral and lost on server restart.

pub mod errors;

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

pub use errors::SessionError;

use crate::{Clock, Result};

/// Session token (UUID stored in cookie)
pub type SessionToken = String;

/// Default absolute lifetime of a session.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// An authenticated identity with its expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: Uuid,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Token → session map shared by every request handler.
///
/// Cloning is cheap; clones share the same underlying map.
#[derive(Clone, Debug)]
pub struct SessionAuthority {
    sessions: Arc<RwLock<HashMap<SessionToken, Session>>>,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl SessionAuthority {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            clock,
        }
    }

    /// Create a session for an authenticated user and return its token.
    pub async fn create_session(&self, user_id: Uuid, username: impl Into<String>) -> SessionToken {
        let token = Uuid::new_v4().to_string();
        let now = self.clock.now();
        let session = Session {
            user_id,
            username: username.into(),
            expires_at: now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        self.sessions.write().await.insert(token.clone(), session);
        token
    }

    /// Resolve a token to its session.
    ///
    /// Unknown and expired tokens are rejected the same way; an expired
    /// session is dropped on the spot.
    pub async fn validate(&self, token: &str) -> Result<Session> {
        let now = self.clock.now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                None => return Err(SessionError::Unauthenticated.into()),
                Some(session) if !session.is_expired_at(now) => return Ok(session.clone()),
                Some(_) => {}
            }
        }

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(token)
            && session.is_expired_at(now)
        {
            tracing::debug!("Session for {} expired", session.username);
            sessions.remove(token);
        }
        Err(SessionError::Unauthenticated.into())
    }

    /// Destroy a session. Returns whether the token was known.
    pub async fn destroy(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// Drop every expired session, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now));
        before - sessions.len()
    }

    /// Get the number of live sessions (expired ones not yet purged included)
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
