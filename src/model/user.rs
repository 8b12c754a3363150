use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A signed-in user. The ID is stable for a given email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub logged_in_at: DateTime<Utc>,
}

impl User {
    /// Derive the user for an email address. The email is trimmed and
    /// lowercased before the ID is computed.
    pub fn for_email(email: &str) -> Self {
        let email = normalize_email(email);
        let id = Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("mailto:{}", email).as_bytes());
        User {
            id: id.to_string(),
            email,
            logged_in_at: Utc::now(),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_stable_across_case_and_whitespace() {
        let a = User::for_email("Alice@Example.com");
        let b = User::for_email("  alice@example.com ");
        assert_eq!(a.id, b.id);
        assert_eq!(b.email, "alice@example.com");
    }

    #[test]
    fn different_emails_get_different_ids() {
        assert_ne!(
            User::for_email("a@example.com").id,
            User::for_email("b@example.com").id
        );
    }
}
