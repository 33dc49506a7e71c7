use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::domain::Identity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (stable participant id)
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub exp: usize, // Expiration time (as UTC timestamp)
    pub iat: usize, // Issued at (as UTC timestamp)
}

impl Claims {
    pub fn new(identity: &Identity, email: &str, expiration_hours: i64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(expiration_hours);

        Self {
            sub: identity.key.clone(),
            email: email.to_string(),
            name: Some(identity.display_label.clone()),
            iat: now.timestamp() as usize,
            exp: exp.timestamp() as usize,
        }
    }

    /// Display name when the token carries one, else the email, else the subject.
    pub fn into_identity(self) -> Identity {
        let display_label = self
            .name
            .filter(|n| !n.trim().is_empty())
            .or_else(|| Some(self.email.clone()).filter(|e| !e.is_empty()))
            .unwrap_or_else(|| self.sub.clone());

        Identity {
            key: self.sub,
            display_label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let identity = Identity::new("uid-1", "Alice");
        let claims = Claims::new(&identity, "alice@example.com", 24);

        assert_eq!(claims.sub, "uid-1");
        assert_eq!(claims.name.as_deref(), Some("Alice"));
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn identity_falls_back_to_email_then_subject() {
        let claims = Claims {
            sub: "uid-2".to_string(),
            email: "bob@example.com".to_string(),
            name: None,
            exp: 0,
            iat: 0,
        };
        assert_eq!(claims.into_identity().display_label, "bob@example.com");

        let claims = Claims {
            sub: "uid-3".to_string(),
            email: String::new(),
            name: Some("  ".to_string()),
            exp: 0,
            iat: 0,
        };
        let identity = claims.into_identity();
        assert_eq!(identity.key, "uid-3");
        assert_eq!(identity.display_label, "uid-3");
    }
}
