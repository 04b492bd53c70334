//! Registration, login and refresh-token rotation against a real store.

mod common;

use storefront::domain::{RegisterUser, UserRole};
use storefront::errors::AppError;
use storefront::services::ServiceContainer;

use common::TEST_PASSWORD;
use tokio_test::{assert_err, assert_ok};

fn unauthorized_message(err: AppError) -> String {
    match err {
        AppError::Unauthorized(message) => message,
        other => panic!("expected unauthorized, got {:?}", other),
    }
}

#[tokio::test]
async fn test_register_returns_customer_and_tokens() {
    let app = common::setup().await;

    let result = app.register_customer("Ada@Example.com").await;
    assert_eq!(result.user.email, "ada@example.com");
    assert_eq!(result.user.role, UserRole::Customer);
    assert_eq!(result.tokens.token_type, "Bearer");
    assert_eq!(result.tokens.expires_in, 15 * 60);
    assert!(!result.tokens.refresh_token.is_empty());

    let claims = app
        .services
        .auth()
        .verify_token(&result.tokens.access_token)
        .unwrap();
    assert_eq!(claims.sub, result.user.id);
    assert_eq!(claims.email, "ada@example.com");
    assert_eq!(claims.role, "customer");
}

#[tokio::test]
async fn test_register_rejects_taken_email_case_insensitively() {
    let app = common::setup().await;
    app.register_customer("ada@example.com").await;

    let err = app
        .services
        .auth()
        .register(RegisterUser {
            email: "ADA@example.com".into(),
            password: TEST_PASSWORD.into(),
            full_name: None,
            role: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn test_register_validates_input() {
    let app = common::setup().await;

    let err = app
        .services
        .auth()
        .register(RegisterUser {
            email: "ada@example.com".into(),
            password: "short".into(),
            full_name: None,
            role: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_login_failures_share_one_message() {
    let app = common::setup().await;
    app.register_customer("ada@example.com").await;
    let auth = app.services.auth();

    let wrong_password = auth
        .login("ada@example.com".into(), "not the password".into())
        .await
        .unwrap_err();
    let unknown_email = auth
        .login("nobody@example.com".into(), TEST_PASSWORD.into())
        .await
        .unwrap_err();

    let first = unauthorized_message(wrong_password);
    let second = unauthorized_message(unknown_email);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_login_is_case_insensitive_on_email() {
    let app = common::setup().await;
    let registered = app.register_customer("ada@example.com").await;

    let result = app
        .services
        .auth()
        .login("ADA@EXAMPLE.COM".into(), TEST_PASSWORD.into())
        .await
        .unwrap();
    assert_eq!(result.user.id, registered.user.id);
}

#[tokio::test]
async fn test_refresh_rotates_and_spends_the_token() {
    let app = common::setup().await;
    let registered = app.register_customer("ada@example.com").await;
    let auth = app.services.auth();

    let first = registered.tokens.refresh_token;
    let rotated = auth.refresh(first.clone()).await.unwrap();
    assert_eq!(rotated.user.id, registered.user.id);
    assert_ne!(rotated.tokens.refresh_token, first);

    // Spent token is rejected
    let err = auth.refresh(first).await.unwrap_err();
    assert_eq!(unauthorized_message(err), "Invalid refresh token");

    // The rotated one still works exactly once more
    let again = auth.refresh(rotated.tokens.refresh_token.clone()).await.unwrap();
    assert_eq!(again.user.id, registered.user.id);
    assert_err!(auth.refresh(rotated.tokens.refresh_token).await);
}

#[tokio::test]
async fn test_concurrent_refresh_of_one_token_succeeds_once() {
    let app = common::setup().await;
    let registered = app.register_customer("ada@example.com").await;
    let auth = app.services.auth();

    let token = registered.tokens.refresh_token;
    let (a, b) = tokio::join!(auth.refresh(token.clone()), auth.refresh(token));
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
}

#[tokio::test]
async fn test_refresh_rejects_missing_and_unknown_tokens() {
    let app = common::setup().await;
    let auth = app.services.auth();

    let err = auth.refresh(String::new()).await.unwrap_err();
    assert_eq!(unauthorized_message(err), "Refresh token missing");

    let err = auth.refresh("deadbeef".into()).await.unwrap_err();
    assert_eq!(unauthorized_message(err), "Invalid refresh token");
}

#[tokio::test]
async fn test_new_login_revokes_earlier_sessions() {
    let app = common::setup().await;
    let registered = app.register_customer("ada@example.com").await;
    let auth = app.services.auth();

    let login = auth
        .login("ada@example.com".into(), TEST_PASSWORD.into())
        .await
        .unwrap();

    assert_err!(auth.refresh(registered.tokens.refresh_token).await);
    assert_ok!(auth.refresh(login.tokens.refresh_token).await);
}

#[tokio::test]
async fn test_logout_revokes_and_is_idempotent() {
    let app = common::setup().await;
    let registered = app.register_customer("ada@example.com").await;
    let auth = app.services.auth();

    assert_ok!(auth.logout(registered.user.id).await);
    assert_ok!(auth.logout(registered.user.id).await);

    assert_err!(auth.refresh(registered.tokens.refresh_token).await);
}

#[tokio::test]
async fn test_verify_token_rejects_garbage() {
    let app = common::setup().await;

    let err = app.services.auth().verify_token("not.a.jwt").unwrap_err();
    assert!(matches!(err, AppError::Jwt(_)));
}
