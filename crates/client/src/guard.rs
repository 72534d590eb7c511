//! Route guard.
//!
//! [`decide`] is the single place where "may this session see this
//! surface" is answered. It is a pure function over the persisted
//! [`Credential`]: no I/O, no clock, no network. Callers fetch the
//! credential for the scope they are guarding and act on the returned
//! [`Decision`].

use gatehouse_core::Scope;

use crate::store::Credential;

/// Route paths the guard redirects between.
pub mod routes {
    /// User login page.
    pub const LOGIN: &str = "/login";
    /// Admin login page.
    pub const ADMIN_LOGIN: &str = "/admin-login";
    /// Public landing page.
    pub const PUBLIC_HOME: &str = "/";
    /// Admin dashboard.
    pub const ADMIN_HOME: &str = "/admin";
}

/// Static notice shown while an account waits for approval.
pub mod pending_notice {
    /// Heading of the notice.
    pub const TITLE: &str = "Awaiting Admin Approval";
    /// Body of the notice.
    pub const BODY: &str =
        "Your account is pending admin approval. Please wait to be approved.";
}

/// Outcome of guarding one surface against one credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Session may proceed to the requested surface.
    Allow,
    /// Session must be sent elsewhere.
    Redirect {
        /// Destination route.
        to: &'static str,
        /// Where to come back to after a login, when the redirect targets
        /// a login route and the caller supplied an origin.
        return_to: Option<String>,
    },
    /// Logged in but not yet approved; show the pending notice instead.
    PendingApproval,
}

impl Decision {
    /// A redirect without a return destination.
    #[must_use]
    pub const fn redirect(to: &'static str) -> Self {
        Self::Redirect {
            to,
            return_to: None,
        }
    }

    /// Whether the decision lets the session through.
    #[must_use]
    pub const fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Redirect { to, .. } => write!(f, "redirect to {to}"),
            Self::PendingApproval => write!(f, "pending approval"),
        }
    }
}

/// Decide whether `credential` may access a surface of `requested` scope.
///
/// Rules apply in order; the first match wins:
///
/// 1. No token: redirect to the scope's login route, carrying `origin` so
///    the login flow can come back.
/// 2. Admin surface without the admin role: redirect to the public home.
/// 3. User surface with the admin role: redirect to the admin dashboard.
/// 4. User surface without approval: show the pending notice.
/// 5. Otherwise: allow.
///
/// The identity record a credential carries never blocks rule 1: a stale
/// identity without a token is simply a logged-out session. A token with
/// a missing or degraded identity falls through to rules 2-4, which read
/// absent role and approval as "not admin" and "not approved".
#[must_use]
pub fn decide(requested: Scope, credential: &Credential, origin: Option<&str>) -> Decision {
    if !credential.is_logged_in() {
        let to = match requested {
            Scope::User => routes::LOGIN,
            Scope::Admin => routes::ADMIN_LOGIN,
        };
        return Decision::Redirect {
            to,
            return_to: origin.map(str::to_owned),
        };
    }

    let identity = &credential.identity;
    match requested {
        Scope::Admin if !identity.is_admin() => Decision::redirect(routes::PUBLIC_HOME),
        Scope::User if identity.is_admin() => Decision::redirect(routes::ADMIN_HOME),
        Scope::User if !identity.is_approved => Decision::PendingApproval,
        _ => Decision::Allow,
    }
}
