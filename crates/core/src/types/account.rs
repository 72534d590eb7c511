//! Account roster entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::AccountId;
use super::identity::lenient_flag;

/// One row of the account roster as the admin endpoints report it.
///
/// Unlike [`Identity`](super::identity::Identity) records, roster entries
/// always carry an id, username and email; only the approval flag keeps
/// the dual-spelling tolerance since older servers emit `isApproved`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAccount")]
pub struct Account {
    /// Service-assigned account id.
    pub id: AccountId,
    /// Display name chosen at signup.
    pub username: String,
    /// Address the account was registered with.
    pub email: Email,
    /// Whether an admin has approved the account.
    pub is_approved: bool,
    /// When the account was created, if the server reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Human label for the approval state, as shown in roster listings.
    #[must_use]
    pub const fn approval_label(&self) -> &'static str {
        if self.is_approved { "approved" } else { "pending" }
    }
}

/// Wire form of [`Account`] before approval-flag normalization.
#[derive(Deserialize)]
struct RawAccount {
    id: AccountId,
    username: String,
    email: Email,
    #[serde(default, deserialize_with = "lenient_flag")]
    is_approved: Option<bool>,
    #[serde(default, rename = "isApproved", deserialize_with = "lenient_flag")]
    is_approved_legacy: Option<bool>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl From<RawAccount> for Account {
    fn from(raw: RawAccount) -> Self {
        Self {
            id: raw.id,
            username: raw.username,
            email: raw.email,
            is_approved: raw.is_approved == Some(true) || raw.is_approved_legacy == Some(true),
            created_at: raw.created_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roster_row() {
        let account: Account = serde_json::from_str(
            r#"{"id": 12, "username": "ada", "email": "ada@example.com", "is_approved": false, "created_at": "2026-01-05T10:30:00Z"}"#,
        )
        .unwrap();
        assert_eq!(account.id, AccountId::new(12));
        assert!(!account.is_approved);
        assert!(account.created_at.is_some());
        assert_eq!(account.approval_label(), "pending");
    }

    #[test]
    fn test_parse_legacy_spelling() {
        let account: Account = serde_json::from_str(
            r#"{"id": 12, "username": "ada", "email": "ada@example.com", "isApproved": true}"#,
        )
        .unwrap();
        assert!(account.is_approved);
        assert_eq!(account.approval_label(), "approved");
    }

    #[test]
    fn test_missing_flag_means_pending() {
        let account: Account = serde_json::from_str(
            r#"{"id": 12, "username": "ada", "email": "ada@example.com"}"#,
        )
        .unwrap();
        assert!(!account.is_approved);
    }

    #[test]
    fn test_missing_id_is_an_error() {
        let result: Result<Account, _> =
            serde_json::from_str(r#"{"username": "ada", "email": "ada@example.com"}"#);
        assert!(result.is_err());
    }
}
