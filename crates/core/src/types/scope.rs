//! Credential scopes.

use serde::{Deserialize, Serialize};

/// The two credential scopes the client keeps side by side.
///
/// Each scope owns its own token and identity slot in the store, so an
/// admin session never shadows a user session and either can be cleared
/// without touching the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Regular account session.
    User,
    /// Administrator session for roster management.
    Admin,
}

impl Scope {
    /// Storage key holding this scope's bearer token.
    ///
    /// The key names are fixed by earlier deployments of the state file;
    /// renaming them would log every existing install out.
    #[must_use]
    pub const fn token_key(self) -> &'static str {
        match self {
            Self::User => "token",
            Self::Admin => "adminToken",
        }
    }

    /// Storage key holding this scope's identity record.
    #[must_use]
    pub const fn identity_key(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "adminUser",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid scope: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_disjoint() {
        assert_ne!(Scope::User.token_key(), Scope::Admin.token_key());
        assert_ne!(Scope::User.identity_key(), Scope::Admin.identity_key());
    }

    #[test]
    fn test_legacy_key_names() {
        assert_eq!(Scope::User.token_key(), "token");
        assert_eq!(Scope::User.identity_key(), "user");
        assert_eq!(Scope::Admin.token_key(), "adminToken");
        assert_eq!(Scope::Admin.identity_key(), "adminUser");
    }

    #[test]
    fn test_from_str_roundtrip() {
        for scope in [Scope::User, Scope::Admin] {
            let parsed: Scope = scope.to_string().parse().unwrap();
            assert_eq!(parsed, scope);
        }
        assert!("root".parse::<Scope>().is_err());
    }
}
