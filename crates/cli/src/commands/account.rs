//! Session and account lifecycle commands.
//!
//! # Usage
//!
//! ```bash
//! # Log in (password prompted)
//! gatehouse login -e ada@example.com
//!
//! # Register a new account
//! gatehouse signup -u ada -e ada@example.com
//!
//! # Recover a lost password
//! gatehouse forgot-password -e ada@example.com
//! gatehouse reset-password -t <token-from-email>
//! ```
//!
//! # Environment Variables
//!
//! - `GATEHOUSE_API_URL` - Base URL of the account service
//! - `GATEHOUSE_STATE_DIR` - Directory for the credential state file
//! - `GATEHOUSE_HTTP_TIMEOUT_SECS` - Request timeout (default 30)

use std::sync::Arc;

use dialoguer::Password;
use dialoguer::theme::ColorfulTheme;
use gatehouse_client::api::{AccountApi, ApiError};
use gatehouse_client::config::{ClientConfig, ConfigError};
use gatehouse_client::guard;
use gatehouse_client::session::{
    LoginOutcome, NOT_APPROVED_NOTICE, SessionError, SessionService, SignupForm,
};
use gatehouse_client::store::{CredentialStore, FileStore, StoreError};
use gatehouse_core::Scope;
use thiserror::Error;

/// Errors that can occur in account commands.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// A session flow failed.
    #[error("{0}")]
    Session(#[from] SessionError),

    /// The credential state file could not be read or written.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Interactive prompt failed.
    #[error("prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),
}

fn service() -> Result<SessionService, AccountError> {
    dotenvy::dotenv().ok();
    let config = ClientConfig::from_env()?;
    let store = CredentialStore::new(Arc::new(FileStore::new(config.state_file())));
    let api = AccountApi::new(&config)?;
    Ok(SessionService::new(api, store))
}

fn password_or_prompt(password: Option<String>, prompt: &str) -> Result<String, AccountError> {
    match password {
        Some(password) => Ok(password),
        None => Ok(Password::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .interact()?),
    }
}

/// Prompt for a brand-new password, retyped until both entries match.
fn new_password_or_prompt(password: Option<String>, prompt: &str) -> Result<String, AccountError> {
    match password {
        Some(password) => Ok(password),
        None => Ok(Password::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .with_confirmation("Confirm password", "Passwords do not match.")
            .interact()?),
    }
}

/// Log in to a user account and persist the session.
#[allow(clippy::print_stdout)]
pub async fn login(email: &str, password: Option<String>) -> Result<(), AccountError> {
    let service = service()?;
    let password = password_or_prompt(password, "Password")?;

    match service.login_user(email, &password).await? {
        LoginOutcome::Approved(identity) => {
            let name = identity.username.as_deref().unwrap_or(email);
            println!("Logged in as {name}.");
        }
        LoginOutcome::PendingApproval => println!("{NOT_APPROVED_NOTICE}"),
    }
    Ok(())
}

/// Log in to an admin account and persist the admin session.
#[allow(clippy::print_stdout)]
pub async fn admin_login(email: &str, password: Option<String>) -> Result<(), AccountError> {
    let service = service()?;
    let password = password_or_prompt(password, "Admin password")?;

    let identity = service.login_admin(email, &password).await?;
    let name = identity.username.as_deref().unwrap_or(email);
    println!("Admin session opened for {name}.");
    Ok(())
}

/// Drop the credential for `scope`.
#[allow(clippy::print_stdout)]
pub fn logout(scope: Scope) -> Result<(), AccountError> {
    let service = service()?;
    service.logout(scope)?;
    println!("Logged out of the {scope} scope.");
    Ok(())
}

/// Show both sessions and the route guard's verdict for each scope.
///
/// Expired or unreadable tokens are cleared on the way, so the report
/// reflects what the guard would actually see.
#[allow(clippy::print_stdout)]
pub fn status() -> Result<(), AccountError> {
    dotenvy::dotenv().ok();
    let config = ClientConfig::from_env()?;
    let store = CredentialStore::new(Arc::new(FileStore::new(config.state_file())));
    let service = SessionService::new(AccountApi::new(&config)?, store);

    println!("State file: {}", config.state_file().display());

    for scope in [Scope::User, Scope::Admin] {
        service.ensure_fresh(scope)?;
        let credential = service.store().get(scope)?;

        println!();
        println!("{scope} scope:");
        if credential.is_logged_in() {
            let label = if credential.identity.is_approved {
                "approved"
            } else {
                "pending approval"
            };
            match credential.identity.username.as_deref() {
                Some(username) => println!("  logged in as {username} ({label})"),
                None => println!("  logged in ({label})"),
            }
        } else {
            println!("  not logged in");
        }

        let decision = guard::decide(scope, &credential, None);
        println!("  guard: {decision}");
    }
    Ok(())
}

/// Register a new account. Login stays blocked until an admin approves it.
#[allow(clippy::print_stdout)]
pub async fn signup(
    username: &str,
    email: &str,
    password: Option<String>,
) -> Result<(), AccountError> {
    let service = service()?;
    let password = new_password_or_prompt(password, "Password")?;

    let form = SignupForm {
        username: username.to_string(),
        email: email.to_string(),
        password: password.clone(),
        confirm_password: password,
    };
    service.signup(&form).await?;

    println!("Signup successful! You will be able to login only after admin approval.");
    Ok(())
}

/// Request a password reset link for `email`.
#[allow(clippy::print_stdout)]
pub async fn forgot_password(email: &str) -> Result<(), AccountError> {
    let service = service()?;
    service.forgot_password(email).await?;

    println!("Password reset link sent to your email.");
    Ok(())
}

/// Set a new password using the token from a reset link.
#[allow(clippy::print_stdout)]
pub async fn reset_password(token: &str, password: Option<String>) -> Result<(), AccountError> {
    let service = service()?;
    let password = new_password_or_prompt(password, "New password")?;
    service.reset_password(token, &password).await?;

    println!("Password reset successful. You can now log in.");
    Ok(())
}
