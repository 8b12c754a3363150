use std::time::Duration;

use crate::model::config::Config;
use crate::model::user::{User, normalize_email};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("email is required")]
    EmptyEmail,
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
}

/// Local stand-in for an identity service: any well-formed email signs in,
/// and the same email always maps to the same user ID.
#[derive(Debug, Clone, Default)]
pub struct IdentityProvider {
    latency: Duration,
}

impl IdentityProvider {
    pub fn new(latency: Duration) -> Self {
        IdentityProvider { latency }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(Duration::from_millis(config.auth.login_latency_ms))
    }

    pub async fn login(&self, email: &str) -> Result<User, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AuthError::EmptyEmail);
        }
        if !is_plausible_email(&email) {
            return Err(AuthError::InvalidEmail(email));
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let user = User::for_email(&email);
        tracing::debug!(user_id = %user.id, "signed in");
        Ok(user)
    }

    pub async fn logout(&self, user: &User) {
        tracing::debug!(user_id = %user.id, "signed out");
    }
}

/// One `@` with something on both sides and no whitespace
fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn login_accepts_any_wellformed_email() {
        let idp = IdentityProvider::default();
        let user = idp.login(" Bob@Example.com ").await.unwrap();
        assert_eq!(user.email, "bob@example.com");
        assert_eq!(user.id, User::for_email("bob@example.com").id);
    }

    #[tokio::test]
    async fn login_rejects_bad_input() {
        let idp = IdentityProvider::default();
        assert_eq!(idp.login("   ").await, Err(AuthError::EmptyEmail));
        assert!(matches!(idp.login("bob").await, Err(AuthError::InvalidEmail(_))));
        assert!(matches!(idp.login("@example.com").await, Err(AuthError::InvalidEmail(_))));
        assert!(matches!(idp.login("a b@c.d").await, Err(AuthError::InvalidEmail(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn login_waits_for_latency() {
        let idp = IdentityProvider::new(Duration::from_millis(500));
        let start = tokio::time::Instant::now();
        idp.login("a@b.c").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));
    }
}
