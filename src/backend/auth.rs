use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::watch;

use crate::error::AppError;
use crate::utils::jwt::verify_jwt;

/// An authenticated session issued by the identity provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: String,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Auth collaborator.
///
/// A missing session is a valid state (unauthenticated view), never an error.
pub trait AuthProvider: Send + Sync {
    /// The current session, or `None` when signed out or expired.
    fn current_session(&self) -> Option<Session>;

    /// Receiver that observes every session-presence transition.
    fn on_session_change(&self) -> watch::Receiver<Option<Session>>;

    fn sign_out(&self);
}

/// Session holder that verifies provider-issued JWTs locally.
pub struct JwtSessionStore {
    secret: String,
    tx: watch::Sender<Option<Session>>,
}

impl JwtSessionStore {
    pub fn new(secret: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            secret: secret.into(),
            tx,
        }
    }

    /// Verifies the access token and makes it the current session.
    pub fn sign_in_with_token(&self, token: &str) -> Result<Session, AppError> {
        let claims = verify_jwt(token, &self.secret)?;
        let expires_at = Utc
            .timestamp_opt(claims.exp as i64, 0)
            .single()
            .ok_or_else(|| AppError::AuthError("Invalid token expiry".to_string()))?;

        let session = Session {
            user_id: claims.sub,
            access_token: token.to_string(),
            expires_at,
        };

        tracing::info!(user_id = %session.user_id, "session started");
        self.tx.send_replace(Some(session.clone()));
        Ok(session)
    }
}

impl AuthProvider for JwtSessionStore {
    fn current_session(&self) -> Option<Session> {
        let session = self.tx.borrow().clone()?;
        if session.is_expired() {
            tracing::info!(user_id = %session.user_id, "session expired");
            self.tx.send_replace(None);
            return None;
        }
        Some(session)
    }

    fn on_session_change(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    fn sign_out(&self) {
        if let Some(previous) = self.tx.send_replace(None) {
            tracing::info!(user_id = %previous.user_id, "signed out");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::jwt::sign_jwt;

    #[test]
    fn test_sign_in_and_out_notifies_watchers() {
        let store = JwtSessionStore::new("secret");
        let mut rx = store.on_session_change();
        assert!(store.current_session().is_none());

        let token = sign_jwt("u1", "authenticated", "secret", 3600).unwrap();
        store.sign_in_with_token(&token).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_ref().map(|s| s.user_id.clone()), Some("u1".to_string()));
        assert_eq!(store.current_session().unwrap().user_id, "u1");

        store.sign_out();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_none());
        assert!(store.current_session().is_none());
    }

    #[test]
    fn test_bad_token_keeps_signed_out() {
        let store = JwtSessionStore::new("secret");
        assert!(store.sign_in_with_token("not-a-jwt").is_err());
        assert!(store.current_session().is_none());
    }
}
