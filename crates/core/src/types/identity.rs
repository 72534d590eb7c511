//! Persisted identity records.

use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::AccountId;

/// Role claimed by an identity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Can manage the account roster.
    Admin,
    /// Regular account.
    User,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::User => write!(f, "user"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// Identity record persisted alongside a scope's token.
///
/// Stored records may predate the current schema or come from a server
/// that spells the approval flag `isApproved`, so deserialization is
/// deliberately lenient: every field defaults when absent, both approval
/// spellings are read, an unrecognized role reads as `None`, and approval
/// is true only for a literal boolean `true`. Serialization always emits
/// the canonical snake_case form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(from = "RawIdentity")]
pub struct Identity {
    /// Service-assigned account id, when the record carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<AccountId>,
    /// Display name chosen at signup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Address the account was registered with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    /// Role the server reported at login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Whether an admin has approved the account.
    pub is_approved: bool,
}

impl Identity {
    /// Whether the record claims the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Some(Role::Admin))
    }
}

/// Wire/storage form of [`Identity`] before normalization.
#[derive(Deserialize)]
struct RawIdentity {
    #[serde(default)]
    id: Option<AccountId>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<Email>,
    #[serde(default, deserialize_with = "lenient_role")]
    role: Option<Role>,
    #[serde(default, deserialize_with = "lenient_flag")]
    is_approved: Option<bool>,
    #[serde(default, rename = "isApproved", deserialize_with = "lenient_flag")]
    is_approved_legacy: Option<bool>,
}

impl From<RawIdentity> for Identity {
    fn from(raw: RawIdentity) -> Self {
        Self {
            id: raw.id,
            username: raw.username,
            email: raw.email,
            role: raw.role,
            is_approved: raw.is_approved == Some(true) || raw.is_approved_legacy == Some(true),
        }
    }
}

/// Reads a role string, mapping anything unrecognized to `None`.
fn lenient_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

/// Reads an approval flag: literal booleans pass through, anything else
/// (strings, numbers, null) counts as not set.
pub(crate) fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Bool(b)) => Some(b),
        _ => None,
    })
}
