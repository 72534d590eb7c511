//! Session flows: login, logout, signup, password recovery.
//!
//! [`SessionService`] is the only writer of credentials. It decides what
//! gets persisted (an unapproved user login persists nothing) and when a
//! cached credential has gone stale.

use chrono::Utc;
use gatehouse_core::{Email, EmailError, Identity, Scope};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::api::{AccountApi, ApiError};
use crate::store::{CredentialStore, StoreError};
use crate::token::{is_expired, peek_expiry};

/// Notice shown when a login succeeds but the account awaits approval.
pub const NOT_APPROVED_NOTICE: &str = "Your account is not approved by admin yet.";

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Signup form failed local validation.
    #[error("{0}")]
    Signup(#[from] SignupError),

    /// The account service rejected or failed the request.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// Credential store failure.
    #[error("credential store error: {0}")]
    Store(#[from] StoreError),
}

/// Signup form rejections, worded exactly as the signup surface shows them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignupError {
    /// Password and confirmation differ.
    #[error("Passwords do not match.")]
    PasswordMismatch,

    /// Username shorter than three characters after trimming.
    #[error("Username must be at least 3 characters.")]
    UsernameTooShort,

    /// Password shorter than six characters.
    #[error("Password must be at least 6 characters.")]
    PasswordTooShort,
}

/// What a user login produced.
#[derive(Debug)]
pub enum LoginOutcome {
    /// Credential persisted; the session is usable.
    Approved(Identity),
    /// The account exists but awaits admin approval. Nothing was persisted.
    PendingApproval,
}

/// Signup input as typed, before validation.
#[derive(Debug, Clone)]
pub struct SignupForm {
    /// Desired username.
    pub username: String,
    /// Address to register.
    pub email: String,
    /// Chosen password.
    pub password: String,
    /// Confirmation retype.
    pub confirm_password: String,
}

/// A signup form that passed local validation.
#[derive(Debug)]
pub struct ValidSignup {
    /// Trimmed username.
    pub username: String,
    /// Normalized address.
    pub email: Email,
}

impl SignupForm {
    /// Validate the form without touching the network.
    ///
    /// Checks run in the order the signup surface reports them: password
    /// confirmation, username length, password length, then email shape.
    ///
    /// # Errors
    ///
    /// Returns the first failed check.
    pub fn validate(&self) -> Result<ValidSignup, SessionError> {
        if self.password != self.confirm_password {
            return Err(SignupError::PasswordMismatch.into());
        }

        let username = self.username.trim();
        if username.chars().count() < 3 {
            return Err(SignupError::UsernameTooShort.into());
        }

        if self.password.chars().count() < 6 {
            return Err(SignupError::PasswordTooShort.into());
        }

        let email = Email::parse(&self.email)?;

        Ok(ValidSignup {
            username: username.to_string(),
            email,
        })
    }
}

/// Login, logout and account flows over one store and one API client.
#[derive(Debug, Clone)]
pub struct SessionService {
    api: AccountApi,
    store: CredentialStore,
}

impl SessionService {
    /// Create a service over `api` and `store`.
    #[must_use]
    pub const fn new(api: AccountApi, store: CredentialStore) -> Self {
        Self { api, store }
    }

    /// The credential store this service writes to.
    #[must_use]
    pub const fn store(&self) -> &CredentialStore {
        &self.store
    }

    // =========================================================================
    // Login / logout
    // =========================================================================

    /// Log in to a user account.
    ///
    /// When the account is approved, the token and identity are persisted
    /// under the user scope. When it is not, *nothing* is persisted:
    /// an unapproved account must not leave a half-usable session behind.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid email input, rejected credentials, or
    /// store failures.
    #[instrument(skip(self, password))]
    pub async fn login_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<LoginOutcome, SessionError> {
        let email = Email::parse(email)?;
        let response = self.api.login(&email, password).await?;

        if !response.user.is_approved {
            info!(%email, "login refused persistence: account awaits approval");
            return Ok(LoginOutcome::PendingApproval);
        }

        let token = SecretString::from(response.token);
        self.store.set(Scope::User, &token, &response.user)?;
        info!(%email, "user session persisted");
        Ok(LoginOutcome::Approved(response.user))
    }

    /// Log in to an admin account and persist the admin-scope credential.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid email input, rejected credentials, or
    /// store failures.
    #[instrument(skip(self, password))]
    pub async fn login_admin(&self, email: &str, password: &str) -> Result<Identity, SessionError> {
        let email = Email::parse(email)?;
        let response = self.api.admin_login(&email, password).await?;

        let token = SecretString::from(response.token);
        self.store.set(Scope::Admin, &token, &response.user)?;
        info!(%email, "admin session persisted");
        Ok(response.user)
    }

    /// Drop the credential for `scope`. The other scope is untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot persist the removal.
    pub fn logout(&self, scope: Scope) -> Result<(), SessionError> {
        self.store.clear(scope)?;
        info!(%scope, "logged out");
        Ok(())
    }

    /// Check that the cached token for `scope` is still presentable.
    ///
    /// Returns `true` when a token exists and has not expired. An expired
    /// or structurally unreadable token clears the whole scope and
    /// returns `false`, as does a missing token.
    ///
    /// # Errors
    ///
    /// Returns an error only for store failures.
    pub fn ensure_fresh(&self, scope: Scope) -> Result<bool, SessionError> {
        let credential = self.store.get(scope)?;
        let Some(token) = credential.token else {
            return Ok(false);
        };

        match peek_expiry(token.expose_secret()) {
            Ok(expiry) if !is_expired(expiry, Utc::now()) => Ok(true),
            Ok(_) => {
                warn!(%scope, "cached token expired, clearing credential");
                self.store.clear(scope)?;
                Ok(false)
            }
            Err(e) => {
                warn!(%scope, error = %e, "cached token unreadable, clearing credential");
                self.store.clear(scope)?;
                Ok(false)
            }
        }
    }

    // =========================================================================
    // Account flows
    // =========================================================================

    /// Register a new account. The account starts unapproved and cannot
    /// log in until an admin approves it.
    ///
    /// # Errors
    ///
    /// Returns validation errors before any network call, then any
    /// service rejection.
    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn signup(&self, form: &SignupForm) -> Result<(), SessionError> {
        let valid = form.validate()?;
        self.api
            .signup(&valid.username, &valid.email, &form.password)
            .await?;
        Ok(())
    }

    /// Request a password-reset link for `email`.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid email input or service rejection.
    pub async fn forgot_password(&self, email: &str) -> Result<(), SessionError> {
        let email = Email::parse(email)?;
        self.api.forgot_password(&email).await?;
        Ok(())
    }

    /// Set a new password using the token from a reset link.
    ///
    /// # Errors
    ///
    /// Rejects passwords under six characters before any network call,
    /// then surfaces any service rejection (typically an expired token).
    pub async fn reset_password(
        &self,
        reset_token: &str,
        password: &str,
    ) -> Result<(), SessionError> {
        if password.chars().count() < 6 {
            return Err(SignupError::PasswordTooShort.into());
        }
        self.api.reset_password(reset_token, password).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::TimeDelta;

    use crate::config::ClientConfig;

    use super::*;

    fn form(username: &str, email: &str, password: &str, confirm: &str) -> SignupForm {
        SignupForm {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    // Points at a closed port; offline tests never actually connect.
    fn service() -> SessionService {
        let config = ClientConfig {
            api_url: url::Url::parse("http://127.0.0.1:9").unwrap(),
            state_dir: std::path::PathBuf::from(".gatehouse"),
            http_timeout: std::time::Duration::from_secs(1),
        };
        SessionService::new(
            AccountApi::new(&config).unwrap(),
            CredentialStore::in_memory(),
        )
    }

    fn fake_token(payload: &serde_json::Value) -> SecretString {
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        SecretString::from(format!("head.{body}.sig"))
    }

    // =========================================================================
    // Signup validation
    // =========================================================================

    #[test]
    fn test_signup_password_mismatch() {
        let err = form("ada", "ada@example.com", "secret1", "secret2")
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Signup(SignupError::PasswordMismatch)
        ));
        assert_eq!(err.to_string(), "Passwords do not match.");
    }

    #[test]
    fn test_signup_short_username() {
        let err = form("  ab ", "ada@example.com", "secret1", "secret1")
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Signup(SignupError::UsernameTooShort)
        ));
    }

    #[test]
    fn test_signup_short_password() {
        let err = form("ada", "ada@example.com", "five5", "five5")
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Signup(SignupError::PasswordTooShort)
        ));
    }

    #[test]
    fn test_signup_mismatch_reported_before_short_username() {
        // Checks run in surface order, confirmation first.
        let err = form("ab", "ada@example.com", "secret1", "other")
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Signup(SignupError::PasswordMismatch)
        ));
    }

    #[test]
    fn test_signup_bad_email() {
        let err = form("ada", "not-an-email", "secret1", "secret1")
            .validate()
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidEmail(_)));
    }

    #[test]
    fn test_signup_valid_form_normalizes() {
        let valid = form("  ada  ", "  Ada@Example.COM ", "secret1", "secret1")
            .validate()
            .unwrap();
        assert_eq!(valid.username, "ada");
        assert_eq!(valid.email.as_str(), "ada@example.com");
    }

    // =========================================================================
    // Token freshness
    // =========================================================================

    #[test]
    fn test_ensure_fresh_without_token() {
        let service = service();
        assert!(!service.ensure_fresh(Scope::User).unwrap());
    }

    #[test]
    fn test_ensure_fresh_with_live_token() {
        let service = service();
        let exp = (Utc::now() + TimeDelta::hours(1)).timestamp();
        service
            .store()
            .set(
                Scope::User,
                &fake_token(&serde_json::json!({ "exp": exp })),
                &Identity::default(),
            )
            .unwrap();

        assert!(service.ensure_fresh(Scope::User).unwrap());
        assert!(service.store().get(Scope::User).unwrap().is_logged_in());
    }

    #[test]
    fn test_ensure_fresh_with_non_expiring_token() {
        let service = service();
        service
            .store()
            .set(
                Scope::Admin,
                &fake_token(&serde_json::json!({ "sub": "root" })),
                &Identity::default(),
            )
            .unwrap();

        assert!(service.ensure_fresh(Scope::Admin).unwrap());
    }

    #[test]
    fn test_ensure_fresh_clears_expired_token() {
        let service = service();
        let exp = (Utc::now() - TimeDelta::minutes(1)).timestamp();
        service
            .store()
            .set(
                Scope::User,
                &fake_token(&serde_json::json!({ "exp": exp })),
                &Identity::default(),
            )
            .unwrap();

        assert!(!service.ensure_fresh(Scope::User).unwrap());
        assert!(!service.store().get(Scope::User).unwrap().is_logged_in());
    }

    #[test]
    fn test_ensure_fresh_clears_malformed_token() {
        let service = service();
        service
            .store()
            .set(
                Scope::User,
                &SecretString::from("not-a-jwt"),
                &Identity::default(),
            )
            .unwrap();

        assert!(!service.ensure_fresh(Scope::User).unwrap());
        assert!(!service.store().get(Scope::User).unwrap().is_logged_in());
    }

    #[test]
    fn test_ensure_fresh_scopes_independent() {
        let service = service();
        let live = (Utc::now() + TimeDelta::hours(1)).timestamp();
        service
            .store()
            .set(
                Scope::Admin,
                &fake_token(&serde_json::json!({ "exp": live })),
                &Identity::default(),
            )
            .unwrap();
        service
            .store()
            .set(
                Scope::User,
                &SecretString::from("broken"),
                &Identity::default(),
            )
            .unwrap();

        assert!(!service.ensure_fresh(Scope::User).unwrap());
        assert!(service.ensure_fresh(Scope::Admin).unwrap());
    }

    #[test]
    fn test_logout_clears_only_requested_scope() {
        let service = service();
        service
            .store()
            .set(
                Scope::User,
                &SecretString::from("u"),
                &Identity::default(),
            )
            .unwrap();
        service
            .store()
            .set(
                Scope::Admin,
                &SecretString::from("a"),
                &Identity::default(),
            )
            .unwrap();

        service.logout(Scope::User).unwrap();

        assert!(!service.store().get(Scope::User).unwrap().is_logged_in());
        assert!(service.store().get(Scope::Admin).unwrap().is_logged_in());
    }
}
