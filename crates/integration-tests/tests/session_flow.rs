//! End-to-end session lifecycle: login, restoration, logout, signup.

use std::path::{Path, PathBuf};

use clementine_client::session::{Credentials, MemorySessionStore, ProfileChanges, SignupForm};
use clementine_client::{
    AuthError, ClientError, Config, NoticeLevel, Route, RouteDecision, RoutePolicy, Storefront,
};
use clementine_core::Role;
use clementine_integration_tests::{
    ADMIN_EMAIL, ADMIN_PASSWORD, StubCommerce, USER_EMAIL, USER_PASSWORD,
};

fn temp_state_dir() -> PathBuf {
    std::env::temp_dir().join(format!("clementine-it-{}", uuid::Uuid::new_v4()))
}

fn file_backed(stub: &StubCommerce, state_dir: &Path) -> Storefront {
    let mut config = Config::new(stub.url());
    config.state_dir = state_dir.to_path_buf();
    Storefront::new(config).expect("client")
}

fn memory_backed(stub: &StubCommerce) -> Storefront {
    Storefront::with_persistence(Config::new(stub.url()), Box::new(MemorySessionStore::new()))
        .expect("client")
}

fn user_credentials() -> Credentials {
    Credentials {
        email: USER_EMAIL.to_owned(),
        password: USER_PASSWORD.to_owned(),
    }
}

fn admin_credentials() -> Credentials {
    Credentials {
        email: ADMIN_EMAIL.to_owned(),
        password: ADMIN_PASSWORD.to_owned(),
    }
}

#[tokio::test]
async fn test_user_login_persists_session_and_routes_home() {
    let stub = StubCommerce::spawn().await;
    let dir = temp_state_dir();
    let store = file_backed(&stub, &dir);
    store.init().await;

    assert_eq!(
        store.decide(RoutePolicy::RequireAuth).await,
        RouteDecision::RedirectToLogin
    );

    let route = store
        .login(Role::User, &user_credentials())
        .await
        .expect("login succeeds");
    assert_eq!(route, Route::Home);

    let snapshot = store.session().snapshot().await;
    assert!(snapshot.is_auth());
    assert_eq!(snapshot.role(), Some(Role::User));

    // Durably persisted, and the cart was warmed for the user role.
    assert!(dir.join("session.json").exists());
    assert!(stub.saw_request("GET /api/cart/all").await);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_rejected_credentials_leave_state_untouched() {
    let stub = StubCommerce::spawn().await;
    let store = memory_backed(&stub);
    store.init().await;
    let mut rx = store.notices().subscribe();

    let err = store
        .login(
            Role::User,
            &Credentials {
                email: USER_EMAIL.to_owned(),
                password: "wrong-password".to_owned(),
            },
        )
        .await
        .expect_err("login must fail");
    assert!(matches!(
        err,
        ClientError::Auth(AuthError::InvalidCredentials)
    ));

    assert!(!store.session().snapshot().await.is_auth());
    assert_eq!(
        store.decide(RoutePolicy::RequireAuth).await,
        RouteDecision::RedirectToLogin
    );

    let notice = rx.try_recv().expect("a notice was published");
    assert_eq!(notice.level, NoticeLevel::Error);
}

#[tokio::test]
async fn test_restore_rebuilds_session_without_network() {
    let stub = StubCommerce::spawn().await;
    let dir = temp_state_dir();

    let first = file_backed(&stub, &dir);
    first.init().await;
    let route = first
        .login(Role::Admin, &admin_credentials())
        .await
        .expect("admin login");
    assert_eq!(route, Route::AdminDashboard);
    drop(first);

    let requests_before = stub.request_count().await;

    // A fresh process lifetime over the same state directory.
    let second = file_backed(&stub, &dir);
    second.init().await;

    let snapshot = second.session().snapshot().await;
    assert_eq!(snapshot.role(), Some(Role::Admin));
    assert_eq!(
        second.decide(RoutePolicy::RequireAdmin).await,
        RouteDecision::Allow
    );

    // Restoration is a local read, never a request.
    assert_eq!(stub.request_count().await, requests_before);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_corrupt_session_file_fails_open_to_logged_out() {
    let stub = StubCommerce::spawn().await;
    let dir = temp_state_dir();
    std::fs::create_dir_all(&dir).expect("mkdir");
    std::fs::write(dir.join("session.json"), b"{ this is not json").expect("write garbage");

    let store = file_backed(&stub, &dir);
    store.init().await;

    let snapshot = store.session().snapshot().await;
    assert!(!snapshot.is_loading());
    assert!(!snapshot.is_auth());
    // The unusable record was discarded.
    assert!(!dir.join("session.json").exists());

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_unrecognized_role_in_record_is_discarded() {
    let stub = StubCommerce::spawn().await;
    let dir = temp_state_dir();
    std::fs::create_dir_all(&dir).expect("mkdir");
    std::fs::write(
        dir.join("session.json"),
        serde_json::json!({
            "user_id": "u1",
            "username": "jo",
            "role": "superuser",
            "email": USER_EMAIL,
            "mobile": "5551234",
            "token": "stale-token",
        })
        .to_string(),
    )
    .expect("write record");

    let store = file_backed(&stub, &dir);
    store.init().await;

    assert!(!store.session().snapshot().await.is_auth());
    assert!(!dir.join("session.json").exists());

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_logout_clears_session_cart_and_storage() {
    let stub = StubCommerce::spawn().await;
    stub.seed_cart_line("p1", 2).await;
    let dir = temp_state_dir();
    let store = file_backed(&stub, &dir);
    store.init().await;

    store
        .login(Role::User, &user_credentials())
        .await
        .expect("login");
    assert!(!store.cart().state().await.is_empty());

    let route = store.logout().await;
    assert_eq!(route, Route::Login);

    assert!(!store.session().snapshot().await.is_auth());
    assert!(store.cart().state().await.is_empty());
    assert!(!dir.join("session.json").exists());
    assert_eq!(
        store.decide(RoutePolicy::RequireAuth).await,
        RouteDecision::RedirectToLogin
    );

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_profile_update_mirrors_into_memory_and_storage() {
    let stub = StubCommerce::spawn().await;
    let dir = temp_state_dir();
    let store = file_backed(&stub, &dir);
    store.init().await;
    store
        .login(Role::User, &user_credentials())
        .await
        .expect("login");

    store
        .session()
        .update_profile(&ProfileChanges {
            username: Some("joanna".to_owned()),
            mobile: Some("5557777".to_owned()),
            password_change: None,
        })
        .await
        .expect("profile update");
    assert!(stub.saw_request("PUT update-profile").await);

    let snapshot = store.session().snapshot().await;
    let session = snapshot.session().expect("still authenticated");
    assert_eq!(session.username, "joanna");
    assert_eq!(session.mobile, "5557777");

    // The persisted record was rewritten, so the next restore sees the edit.
    let raw = std::fs::read(dir.join("session.json")).expect("read record");
    let record: serde_json::Value = serde_json::from_slice(&raw).expect("valid json");
    assert_eq!(record["username"], "joanna");
    assert_eq!(record["mobile"], "5557777");

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_signup_routes_to_login() {
    let stub = StubCommerce::spawn().await;
    let store = memory_backed(&stub);
    store.init().await;

    let route = store
        .signup(&SignupForm {
            username: "newbie".to_owned(),
            email: "newbie@example.com".to_owned(),
            password: "longenough".to_owned(),
            mobile: "5559876".to_owned(),
        })
        .await
        .expect("signup succeeds");
    assert_eq!(route, Route::Login);

    // Signing up does not log anyone in.
    assert!(!store.session().snapshot().await.is_auth());
}

#[tokio::test]
async fn test_invalid_signup_is_rejected_before_any_request() {
    let stub = StubCommerce::spawn().await;
    let store = memory_backed(&stub);
    store.init().await;

    let err = store
        .signup(&SignupForm {
            username: "newbie".to_owned(),
            email: "not-an-email".to_owned(),
            password: "longenough".to_owned(),
            mobile: "5559876".to_owned(),
        })
        .await
        .expect_err("signup must fail");
    assert!(matches!(err, ClientError::Validation(_)));
    assert!(!stub.saw_request("POST /api/user/signup").await);
}
