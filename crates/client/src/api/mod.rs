//! Account service REST client.
//!
//! Thin typed wrapper over the service's JSON endpoints. Error bodies are
//! flattened into [`ApiError::Api`] with the service's own message where
//! one exists; bearer-authorized endpoints map 401/403 to
//! [`ApiError::Unauthorized`] so callers can invalidate the cached
//! session instead of showing a misleading error.

mod types;

use std::sync::Arc;

use gatehouse_core::{Account, AccountId, Email};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::ClientConfig;

pub use types::LoginResponse;

use types::ErrorBody;

/// Errors that can occur when talking to the account service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure: connect, timeout, or body decode.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A bearer-authorized endpoint rejected the token.
    #[error("unauthorized: status {status}")]
    Unauthorized {
        /// 401 or 403.
        status: u16,
    },

    /// The service answered with an error payload.
    #[error("{message}")]
    Api {
        /// HTTP status of the response.
        status: u16,
        /// The service's message, or the operation's fallback text.
        message: String,
    },
}

/// Typed client for the account service.
#[derive(Clone)]
pub struct AccountApi {
    inner: Arc<Inner>,
}

struct Inner {
    client: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for AccountApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountApi")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl AccountApi {
    /// Create a client for the service at `config.api_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                base_url: normalize_base(config.api_url.as_str()),
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Log in to a user account.
    ///
    /// The response reports approval state; deciding whether to persist
    /// the credential is the caller's job.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Api`] with the service's message (fallback:
    /// "Login failed") on rejection, including bad credentials.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<LoginResponse, ApiError> {
        let response = self
            .inner
            .client
            .post(self.url("/api/login"))
            .json(&serde_json::json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await?;

        let response = check(response, "Login failed").await?;
        Ok(response.json().await?)
    }

    /// Log in to an admin account.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Api`] with the service's message (fallback:
    /// "Login failed") on rejection.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn admin_login(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<LoginResponse, ApiError> {
        let response = self
            .inner
            .client
            .post(self.url("/api/admin/login"))
            .json(&serde_json::json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await?;

        let response = check(response, "Login failed").await?;
        Ok(response.json().await?)
    }

    /// Register a new account. The account starts unapproved.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Api`] carrying the service's validation
    /// messages (fallback: "Signup failed. Please try again.").
    #[instrument(skip(self, password), fields(username = %username, email = %email))]
    pub async fn signup(
        &self,
        username: &str,
        email: &Email,
        password: &str,
    ) -> Result<(), ApiError> {
        let response = self
            .inner
            .client
            .post(self.url("/api/signup"))
            .json(&serde_json::json!({
                "username": username,
                "email": email,
                "password": password,
            }))
            .send()
            .await?;

        check(response, "Signup failed. Please try again.").await?;
        debug!("signup accepted");
        Ok(())
    }

    /// Ask the service to mail a password-reset link.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Api`] on rejection (fallback: "Request failed").
    #[instrument(skip(self), fields(email = %email))]
    pub async fn forgot_password(&self, email: &Email) -> Result<(), ApiError> {
        let response = self
            .inner
            .client
            .post(self.url("/api/forgot-password"))
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;

        check(response, "Request failed").await?;
        Ok(())
    }

    /// Set a new password using a reset token from the mailed link.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Api`] on rejection (fallback: "Reset failed"),
    /// typically an expired or already-used token.
    #[instrument(skip(self, reset_token, password))]
    pub async fn reset_password(
        &self,
        reset_token: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        let path = format!("/api/reset-password/{}", urlencoding::encode(reset_token));
        let response = self
            .inner
            .client
            .post(self.url(&path))
            .json(&serde_json::json!({ "password": password }))
            .send()
            .await?;

        check(response, "Reset failed").await?;
        Ok(())
    }

    /// Fetch the full account roster. Admin only.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] when the token is rejected,
    /// [`ApiError::Api`] otherwise (fallback: "Failed to fetch accounts").
    #[instrument(skip(self, token))]
    pub async fn list_accounts(&self, token: &SecretString) -> Result<Vec<Account>, ApiError> {
        let response = self
            .inner
            .client
            .get(self.url("/api/admin/users"))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        let response = check_authorized(response, "Failed to fetch accounts").await?;
        let accounts: Vec<Account> = response.json().await?;
        debug!(count = accounts.len(), "fetched account roster");
        Ok(accounts)
    }

    /// Set the approval flag of one account. Admin only.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] when the token is rejected,
    /// [`ApiError::Api`] otherwise (fallback: "Failed to update approval").
    #[instrument(skip(self, token), fields(account_id = %id, approved))]
    pub async fn set_approval(
        &self,
        token: &SecretString,
        id: AccountId,
        approved: bool,
    ) -> Result<(), ApiError> {
        let response = self
            .inner
            .client
            .post(self.url(&format!("/api/admin/approve/{id}")))
            .bearer_auth(token.expose_secret())
            .json(&serde_json::json!({ "approved": approved }))
            .send()
            .await?;

        check_authorized(response, "Failed to update approval").await?;
        Ok(())
    }

    /// Delete one account. Admin only.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] when the token is rejected,
    /// [`ApiError::Api`] otherwise (fallback: "Failed to delete account").
    #[instrument(skip(self, token), fields(account_id = %id))]
    pub async fn delete_account(
        &self,
        token: &SecretString,
        id: AccountId,
    ) -> Result<(), ApiError> {
        let response = self
            .inner
            .client
            .delete(self.url(&format!("/api/admin/users/{id}")))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        check_authorized(response, "Failed to delete account").await?;
        Ok(())
    }
}

/// Strip any trailing slash so path joins cannot double up.
fn normalize_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Pass successful responses through; flatten the rest to [`ApiError::Api`].
async fn check(response: reqwest::Response, fallback: &str) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = error_message(response, fallback).await;
    Err(ApiError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Like [`check`], for bearer-authorized endpoints: a 401/403 means the
/// cached session is dead, not that this request was wrong.
async fn check_authorized(
    response: reqwest::Response,
    fallback: &str,
) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ApiError::Unauthorized {
            status: status.as_u16(),
        });
    }
    check(response, fallback).await
}

/// Extract the service's error message from a failed response body.
async fn error_message(response: reqwest::Response, fallback: &str) -> String {
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| fallback.to_string())
}
