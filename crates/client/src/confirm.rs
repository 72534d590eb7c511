//! Confirmation gates for destructive roster mutations.
//!
//! Every approval change or removal passes through a [`ConfirmationGate`]
//! before any request is issued. The prompt wording matches what roster
//! operators have always been shown, so nobody has to re-learn which
//! button is which.

use gatehouse_core::Account;

/// A mutation awaiting operator sign-off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    /// Grant approval.
    Approve,
    /// Withdraw approval.
    Disapprove,
    /// Delete the account.
    Remove,
}

/// What the gate is asked to confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    /// The mutation being confirmed.
    pub action: ConfirmAction,
    /// Username shown in the prompt.
    pub username: String,
}

impl ConfirmRequest {
    /// Build the request for toggling `account`'s approval.
    #[must_use]
    pub fn toggle_approval(account: &Account) -> Self {
        Self {
            action: if account.is_approved {
                ConfirmAction::Disapprove
            } else {
                ConfirmAction::Approve
            },
            username: account.username.clone(),
        }
    }

    /// Build the request for removing `account`.
    #[must_use]
    pub fn remove(account: &Account) -> Self {
        Self {
            action: ConfirmAction::Remove,
            username: account.username.clone(),
        }
    }

    /// Prompt heading.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self.action {
            ConfirmAction::Approve => "Approve user?",
            ConfirmAction::Disapprove => "Disapprove user?",
            ConfirmAction::Remove => "Are you sure?",
        }
    }

    /// Prompt body naming the target.
    #[must_use]
    pub fn body(&self) -> String {
        match self.action {
            ConfirmAction::Approve => {
                format!("Are you sure you want to approve \"{}\"?", self.username)
            }
            ConfirmAction::Disapprove => {
                format!("Are you sure you want to disapprove \"{}\"?", self.username)
            }
            ConfirmAction::Remove => format!("Delete user \"{}\"?", self.username),
        }
    }

    /// Label of the confirming choice.
    #[must_use]
    pub const fn confirm_label(&self) -> &'static str {
        match self.action {
            ConfirmAction::Approve => "Approve",
            ConfirmAction::Disapprove => "Disapprove",
            ConfirmAction::Remove => "Yes, delete!",
        }
    }
}

/// Asks whether a mutation may proceed.
///
/// Implementations may block (an interactive prompt does); the workflow
/// consults the gate before marking anything busy or touching the
/// network, so a slow answer holds nothing up but the operator's own
/// command.
pub trait ConfirmationGate: Send + Sync {
    /// `true` lets the mutation proceed, `false` declines it.
    fn confirm(&self, request: &ConfirmRequest) -> bool;
}

/// Gate that approves everything. For scripted use (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl ConfirmationGate for AutoConfirm {
    fn confirm(&self, _request: &ConfirmRequest) -> bool {
        true
    }
}

/// Gate with a canned answer. For tests.
#[derive(Debug, Clone, Copy)]
pub struct StaticGate(pub bool);

impl ConfirmationGate for StaticGate {
    fn confirm(&self, _request: &ConfirmRequest) -> bool {
        self.0
    }
}
