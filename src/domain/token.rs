//! Session tokens.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::user::SafeUser;

/// Stored refresh token. Only the hash of the secret is ever persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    /// `None` while the token is still usable
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

/// Freshly minted credentials, handed out exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// Plaintext refresh secret; never retrievable again
    pub refresh_token: String,
}

/// Outcome of register, login and refresh
#[derive(Debug, Clone, Serialize)]
pub struct AuthResult {
    pub user: SafeUser,
    pub tokens: AuthTokens,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_token_activity() {
        let now = Utc::now();
        let mut token = RefreshToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "hash".into(),
            expires_at: now + Duration::days(7),
            revoked_at: None,
            created_at: now,
        };
        assert!(token.is_active_at(now));
        assert!(!token.is_active_at(now + Duration::days(8)));

        token.revoked_at = Some(now);
        assert!(!token.is_active_at(now));
    }
}
