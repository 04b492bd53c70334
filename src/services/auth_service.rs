//! Authentication service - Registration, login and session rotation.
//!
//! SOLID (SRP): Handles authentication concerns only.
//! DDD: Secrets are hashed through the injected `SecretHasher`, tokens are
//! signed with the injected `AuthConfig`.
//!
//! Every user has at most one active refresh token: issuing a pair revokes
//! all earlier ones, and a refresh token can be exchanged exactly once.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;
use uuid::Uuid;
use validator::Validate;

use crate::config::{AuthConfig, REFRESH_TOKEN_BYTES, TOKEN_TYPE_BEARER};
use crate::domain::{
    AuthResult, AuthTokens, CurrentUser, Password, RegisterUser, SafeUser, SecretHasher, User,
    UserRole,
};
use crate::errors::{AppError, AppResult};
use crate::infra::{TransactionContext, UnitOfWork};
use crate::with_transaction;

const INVALID_CREDENTIALS: &str = "Wrong email or password used.";
const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        CurrentUser::new(claims.sub, claims.email, UserRole::from(claims.role.as_str()))
    }
}

/// Authentication service trait for dependency injection.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create an account and sign it in
    async fn register(&self, input: RegisterUser) -> AppResult<AuthResult>;

    /// Exchange credentials for a fresh token pair
    async fn login(&self, email: String, password: String) -> AppResult<AuthResult>;

    /// Exchange a refresh token for a fresh pair; the presented token is spent
    async fn refresh(&self, refresh_token: String) -> AppResult<AuthResult>;

    /// Revoke every active refresh token of the user
    async fn logout(&self, user_id: Uuid) -> AppResult<()>;

    /// Verify an access token and extract its claims
    fn verify_token(&self, token: &str) -> AppResult<Claims>;

    /// Lifetime of issued refresh tokens, for the session-cookie boundary
    fn refresh_token_ttl(&self) -> Duration;
}

/// Concrete implementation of AuthService using Unit of Work.
pub struct Authenticator<U: UnitOfWork> {
    uow: Arc<U>,
    hasher: Arc<dyn SecretHasher>,
    config: AuthConfig,
    dummy_hash: OnceCell<String>,
}

impl<U: UnitOfWork> Authenticator<U> {
    pub fn new(uow: Arc<U>, hasher: Arc<dyn SecretHasher>, config: AuthConfig) -> Self {
        Self {
            uow,
            hasher,
            config,
            dummy_hash: OnceCell::new(),
        }
    }

    /// Hash verified against when the email is unknown, so both login
    /// failures cost one full hash verification.
    async fn dummy_hash(&self) -> AppResult<&str> {
        let hash = self
            .dummy_hash
            .get_or_try_init(|| async { self.hasher.hash("not-a-real-password") })
            .await?;
        Ok(hash.as_str())
    }

    /// Run `issue_tokens` for an existing user in its own transaction
    async fn sign_in(&self, user: User) -> AppResult<AuthResult> {
        let hasher = self.hasher.clone();
        let config = self.config.clone();

        with_transaction!(self.uow, |ctx| {
            let tokens = issue_tokens(&ctx, &user, hasher.as_ref(), &config).await?;
            Ok(AuthResult {
                user: SafeUser::from(user),
                tokens,
            })
        })
    }
}

#[async_trait]
impl<U: UnitOfWork + 'static> AuthService for Authenticator<U> {
    #[tracing::instrument(skip(self, input), fields(email = %input.email))]
    async fn register(&self, input: RegisterUser) -> AppResult<AuthResult> {
        input.validate()?;

        let password_hash = Password::new(&input.password, self.hasher.as_ref())?.into_string();
        let hasher = self.hasher.clone();
        let config = self.config.clone();

        let result = with_transaction!(self.uow, |ctx| {
            if ctx.users().find_by_email(&input.email).await?.is_some() {
                return Err(AppError::conflict("Email already registered"));
            }

            let role = input.role.unwrap_or(UserRole::Customer);
            let user = ctx
                .users()
                .create(&input.email, password_hash, input.full_name, role)
                .await?;

            let tokens = issue_tokens(&ctx, &user, hasher.as_ref(), &config).await?;
            Ok(AuthResult {
                user: SafeUser::from(user),
                tokens,
            })
        })?;

        tracing::info!(user_id = %result.user.id, "User registered");
        Ok(result)
    }

    #[tracing::instrument(skip(self, password))]
    async fn login(&self, email: String, password: String) -> AppResult<AuthResult> {
        let user = self.uow.users().find_by_email(&email).await?;

        let verified = match &user {
            Some(user) => Password::from_hash(user.password_hash.clone())
                .verify(&password, self.hasher.as_ref()),
            None => {
                let dummy = Password::from_hash(self.dummy_hash().await?.to_string());
                dummy.verify(&password, self.hasher.as_ref());
                false
            }
        };

        let user = match user {
            Some(user) if verified => user,
            _ => {
                tracing::warn!("Rejected login attempt");
                return Err(AppError::unauthorized(INVALID_CREDENTIALS));
            }
        };

        let result = self.sign_in(user).await?;
        tracing::info!(user_id = %result.user.id, "User logged in");
        Ok(result)
    }

    #[tracing::instrument(skip_all)]
    async fn refresh(&self, refresh_token: String) -> AppResult<AuthResult> {
        if refresh_token.trim().is_empty() {
            return Err(AppError::unauthorized("Refresh token missing"));
        }

        let hasher = self.hasher.clone();
        let config = self.config.clone();

        let result = with_transaction!(self.uow, |ctx| {
            let now = Utc::now();
            let candidates = ctx.tokens().find_active(now).await?;

            // Secrets are only stored hashed, so every active row is a candidate
            let matched = candidates
                .into_iter()
                .find(|token| hasher.verify(&token.token_hash, &refresh_token));

            let Some(token) = matched else {
                tracing::warn!("Refresh token did not match any active session");
                return Err(AppError::unauthorized(INVALID_REFRESH_TOKEN));
            };

            // A concurrent exchange of the same secret got there first
            if !ctx.tokens().revoke(token.id, now).await? {
                tracing::warn!(user_id = %token.user_id, "Refresh token reused");
                return Err(AppError::unauthorized(INVALID_REFRESH_TOKEN));
            }

            let user = ctx
                .users()
                .find_by_id(token.user_id)
                .await?
                .ok_or_else(|| AppError::unauthorized(INVALID_REFRESH_TOKEN))?;

            let tokens = issue_tokens(&ctx, &user, hasher.as_ref(), &config).await?;
            Ok(AuthResult {
                user: SafeUser::from(user),
                tokens,
            })
        })?;

        tracing::info!(user_id = %result.user.id, "Session refreshed");
        Ok(result)
    }

    #[tracing::instrument(skip(self))]
    async fn logout(&self, user_id: Uuid) -> AppResult<()> {
        let revoked = with_transaction!(self.uow, |ctx| {
            ctx.tokens().revoke_all_for_user(user_id, Utc::now()).await
        })?;

        tracing::info!(revoked, "Refresh tokens revoked");
        Ok(())
    }

    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }

    fn refresh_token_ttl(&self) -> Duration {
        self.config.refresh_token_ttl
    }
}

/// Revoke the user's active refresh tokens, then mint a new pair.
///
/// The refresh secret is returned in plaintext here and nowhere else; only
/// its hash is stored.
async fn issue_tokens(
    ctx: &TransactionContext<'_>,
    user: &User,
    hasher: &dyn SecretHasher,
    config: &AuthConfig,
) -> AppResult<AuthTokens> {
    let now = Utc::now();

    let revoked = ctx.tokens().revoke_all_for_user(user.id, now).await?;
    if revoked > 0 {
        tracing::debug!(user_id = %user.id, revoked, "Revoked previous refresh tokens");
    }

    let secret = generate_refresh_secret();
    let token_hash = hasher.hash(&secret)?;
    ctx.tokens()
        .create(user.id, token_hash, now + config.refresh_token_ttl)
        .await?;

    let access_token = sign_access_token(user, config)?;

    Ok(AuthTokens {
        access_token,
        token_type: TOKEN_TYPE_BEARER.to_string(),
        expires_in: config.access_token_ttl.num_seconds(),
        refresh_token: secret,
    })
}

/// Hex-encoded random secret with `REFRESH_TOKEN_BYTES` of entropy
fn generate_refresh_secret() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn sign_access_token(user: &User, config: &AuthConfig) -> AppResult<String> {
    let now = Utc::now();
    let expires_at = now + config.access_token_ttl;

    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role.to_string(),
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret_bytes()),
    )?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_secrets_are_long_and_unique() {
        let a = generate_refresh_secret();
        let b = generate_refresh_secret();

        assert_eq!(a.len(), REFRESH_TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_access_token_round_trips_claims() {
        let config = AuthConfig::new(
            "a-test-secret-that-is-long-enough-1234",
            Duration::minutes(15),
            Duration::days(7),
        )
        .unwrap();
        let user = User {
            id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            password_hash: String::new(),
            full_name: None,
            role: UserRole::Admin,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let token = sign_access_token(&user, &config).unwrap();
        let claims = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(config.jwt_secret_bytes()),
            &Validation::default(),
        )
        .unwrap()
        .claims;

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.exp - claims.iat, 15 * 60);

        let current = CurrentUser::from(claims);
        assert!(current.is_admin());
    }
}
