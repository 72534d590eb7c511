//! Integration tests for login, signup and password recovery flows.
//!
//! Runs the real session service against the in-process stub, and checks
//! what each flow leaves behind in the credential store.

use gatehouse_client::api::AccountApi;
use gatehouse_client::guard;
use gatehouse_client::session::{LoginOutcome, SessionError, SessionService, SignupForm};
use gatehouse_client::store::CredentialStore;
use gatehouse_core::{Role, Scope};
use gatehouse_integration_tests::{
    ADMIN_EMAIL, ADMIN_PASSWORD, EXPIRED_RESET_TOKEN, StubService, USER_PASSWORD,
};

/// Start a stub service and wire a session service (in-memory store) to it.
async fn harness() -> (StubService, SessionService) {
    let stub = StubService::start().await;
    let config = stub.config();
    let api = AccountApi::new(&config).expect("Failed to build API client");
    let service = SessionService::new(api, CredentialStore::in_memory());
    (stub, service)
}

fn signup_form(username: &str, email: &str, password: &str) -> SignupForm {
    SignupForm {
        username: username.to_string(),
        email: email.to_string(),
        password: password.to_string(),
        confirm_password: password.to_string(),
    }
}

// =============================================================================
// User login
// =============================================================================

#[tokio::test]
async fn test_approved_login_persists_a_usable_session() {
    let (stub, service) = harness().await;
    stub.seed(1, "ada", true);

    let outcome = service
        .login_user("ada@example.com", USER_PASSWORD)
        .await
        .expect("Failed to log in");

    let LoginOutcome::Approved(identity) = outcome else {
        panic!("expected an approved login");
    };
    assert_eq!(identity.username.as_deref(), Some("ada"));
    assert_eq!(identity.role, Some(Role::User));
    // Normalized from the legacy field spelling the stub serves.
    assert!(identity.is_approved);

    let credential = service
        .store()
        .get(Scope::User)
        .expect("Failed to read store");
    assert!(credential.is_logged_in());
    assert!(guard::decide(Scope::User, &credential, None).is_allow());
}

#[tokio::test]
async fn test_unapproved_login_persists_nothing() {
    let (stub, service) = harness().await;
    stub.seed(1, "ada", false);

    let outcome = service
        .login_user("ada@example.com", USER_PASSWORD)
        .await
        .expect("Login itself should succeed");

    assert!(matches!(outcome, LoginOutcome::PendingApproval));
    assert!(
        !service
            .store()
            .get(Scope::User)
            .expect("Failed to read store")
            .is_logged_in()
    );
}

#[tokio::test]
async fn test_wrong_password_surfaces_the_service_message() {
    let (stub, service) = harness().await;
    stub.seed(1, "ada", true);

    let err = service
        .login_user("ada@example.com", "wrong-password")
        .await
        .expect_err("Wrong password should fail");

    assert_eq!(err.to_string(), "Invalid credentials");
}

#[tokio::test]
async fn test_login_normalizes_the_typed_email() {
    let (stub, service) = harness().await;
    stub.seed(1, "ada", true);

    let outcome = service
        .login_user("  Ada@EXAMPLE.com ", USER_PASSWORD)
        .await
        .expect("Failed to log in with unnormalized email");

    assert!(matches!(outcome, LoginOutcome::Approved(_)));
}

// =============================================================================
// Admin login
// =============================================================================

#[tokio::test]
async fn test_admin_login_opens_only_the_admin_scope() {
    let (_stub, service) = harness().await;

    let identity = service
        .login_admin(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .expect("Failed to log in as admin");
    assert!(identity.is_admin());

    let admin = service
        .store()
        .get(Scope::Admin)
        .expect("Failed to read store");
    assert!(admin.is_logged_in());
    assert!(guard::decide(Scope::Admin, &admin, None).is_allow());

    let user = service
        .store()
        .get(Scope::User)
        .expect("Failed to read store");
    assert!(!user.is_logged_in());
}

#[tokio::test]
async fn test_admin_login_rejects_bad_credentials() {
    let (_stub, service) = harness().await;

    let err = service
        .login_admin(ADMIN_EMAIL, "wrong-password")
        .await
        .expect_err("Bad admin credentials should fail");

    assert_eq!(err.to_string(), "Invalid credentials");
    assert!(
        !service
            .store()
            .get(Scope::Admin)
            .expect("Failed to read store")
            .is_logged_in()
    );
}

// =============================================================================
// Signup
// =============================================================================

#[tokio::test]
async fn test_signup_registers_an_unapproved_account() {
    let (stub, service) = harness().await;

    service
        .signup(&signup_form("ada", "ada@example.com", "secret1"))
        .await
        .expect("Failed to sign up");

    assert_eq!(stub.account_count(), 1);
    assert_eq!(stub.is_approved(1), Some(false));

    // The fresh account cannot open a session yet.
    let outcome = service
        .login_user("ada@example.com", USER_PASSWORD)
        .await
        .expect("Login itself should succeed");
    assert!(matches!(outcome, LoginOutcome::PendingApproval));
}

#[tokio::test]
async fn test_signup_rejects_a_duplicate_email() {
    let (stub, service) = harness().await;
    stub.seed(1, "ada", true);

    let err = service
        .signup(&signup_form("ada2", "ada@example.com", "secret1"))
        .await
        .expect_err("Duplicate email should fail");

    assert_eq!(err.to_string(), "Email already in use");
    assert_eq!(stub.account_count(), 1);
}

#[tokio::test]
async fn test_signup_validation_fails_before_any_request() {
    let (stub, service) = harness().await;

    let mut form = signup_form("ab", "ada@example.com", "secret1");
    let err = service
        .signup(&form)
        .await
        .expect_err("Short username should fail");
    assert_eq!(err.to_string(), "Username must be at least 3 characters.");

    form = signup_form("ada", "ada@example.com", "five5");
    let err = service
        .signup(&form)
        .await
        .expect_err("Short password should fail");
    assert_eq!(err.to_string(), "Password must be at least 6 characters.");

    assert_eq!(stub.account_count(), 0);
}

// =============================================================================
// Password recovery
// =============================================================================

#[tokio::test]
async fn test_forgot_password_for_known_and_unknown_emails() {
    let (stub, service) = harness().await;
    stub.seed(1, "ada", true);

    service
        .forgot_password("ada@example.com")
        .await
        .expect("Failed to request reset for a known email");

    let err = service
        .forgot_password("ghost@example.com")
        .await
        .expect_err("Unknown email should fail");
    assert_eq!(err.to_string(), "User not found");
}

#[tokio::test]
async fn test_reset_password_accepts_a_valid_token() {
    let (_stub, service) = harness().await;

    service
        .reset_password("valid-token", "newsecret1")
        .await
        .expect("Failed to reset with a valid token");
}

#[tokio::test]
async fn test_reset_password_rejects_an_expired_token() {
    let (_stub, service) = harness().await;

    let err = service
        .reset_password(EXPIRED_RESET_TOKEN, "newsecret1")
        .await
        .expect_err("Expired token should fail");

    assert_eq!(err.to_string(), "Invalid or expired token");
}

#[tokio::test]
async fn test_reset_password_length_check_runs_locally() {
    let (_stub, service) = harness().await;

    let err = service
        .reset_password("valid-token", "five5")
        .await
        .expect_err("Short replacement password should fail");

    assert!(matches!(err, SessionError::Signup(_)));
    assert_eq!(err.to_string(), "Password must be at least 6 characters.");
}
