//! Wire types for the account service.

use gatehouse_core::Identity;
use serde::Deserialize;

/// Successful response of both login endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// The identity the token belongs to.
    pub user: Identity,
}

/// Error body shape of the account service.
///
/// Failures carry either `{ "message": ... }` or, from validation
/// middleware, `{ "errors": [{ "msg": ... }, ...] }`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Option<Vec<FieldError>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FieldError {
    msg: String,
}

impl ErrorBody {
    /// The human-readable message, preferring the validation list.
    pub(crate) fn into_message(self) -> Option<String> {
        if let Some(errors) = self.errors {
            if !errors.is_empty() {
                let joined = errors
                    .into_iter()
                    .map(|e| e.msg)
                    .collect::<Vec<_>>()
                    .join(", ");
                return Some(joined);
            }
        }
        self.message
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> ErrorBody {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_message_body() {
        let message = parse(r#"{"message": "Invalid credentials"}"#).into_message();
        assert_eq!(message.as_deref(), Some("Invalid credentials"));
    }

    #[test]
    fn test_validation_errors_joined() {
        let message = parse(
            r#"{"errors": [{"msg": "Email is invalid"}, {"msg": "Password too short"}]}"#,
        )
        .into_message();
        assert_eq!(
            message.as_deref(),
            Some("Email is invalid, Password too short")
        );
    }

    #[test]
    fn test_validation_errors_win_over_message() {
        let message = parse(
            r#"{"message": "Validation failed", "errors": [{"msg": "Email is invalid"}]}"#,
        )
        .into_message();
        assert_eq!(message.as_deref(), Some("Email is invalid"));
    }

    #[test]
    fn test_empty_errors_fall_back_to_message() {
        let message = parse(r#"{"message": "Validation failed", "errors": []}"#).into_message();
        assert_eq!(message.as_deref(), Some("Validation failed"));
    }

    #[test]
    fn test_empty_body_has_no_message() {
        assert_eq!(parse("{}").into_message(), None);
    }

    #[test]
    fn test_login_response_parses() {
        let response: LoginResponse = serde_json::from_str(
            r#"{"token": "jwt-here", "user": {"username": "ada", "role": "user", "is_approved": true}}"#,
        )
        .unwrap();
        assert_eq!(response.token, "jwt-here");
        assert!(response.user.is_approved);
    }
}
