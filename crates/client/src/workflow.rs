//! Admin moderation workflow over the account roster.
//!
//! [`AdminWorkflow`] owns the last fetched roster and the set of accounts
//! with a change in flight. Approvals and removals pass through a
//! [`ConfirmationGate`] before anything is sent, and a 401 or 403 from
//! the service drops the cached admin session on the spot.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gatehouse_core::{Account, AccountId, Scope};
use secrecy::SecretString;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::api::{AccountApi, ApiError};
use crate::confirm::{ConfirmAction, ConfirmRequest, ConfirmationGate};
use crate::store::{CredentialStore, StoreError};

/// Errors that can occur in the moderation workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Another change for the same account is still in flight.
    #[error("account {0} already has a change in flight")]
    Busy(AccountId),

    /// The service no longer accepts the cached admin token.
    #[error("admin session expired, log in again")]
    SessionExpired,

    /// The id does not appear in the last fetched roster.
    #[error("no account with id {0} in the current roster")]
    NotFound(AccountId),

    /// The account service rejected or failed the request.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// Credential store failure.
    #[error("credential store error: {0}")]
    Store(#[from] StoreError),
}

/// What a confirmed-or-declined mutation produced.
#[derive(Debug)]
pub enum MutationOutcome {
    /// The change was applied; the refreshed roster follows.
    Applied(Vec<Account>),
    /// The gate declined. Nothing was sent.
    Declined,
}

#[derive(Debug, Default)]
struct RosterState {
    roster: Vec<Account>,
    busy: HashSet<AccountId>,
}

struct WorkflowInner {
    api: AccountApi,
    store: CredentialStore,
    gate: Arc<dyn ConfirmationGate>,
    state: Mutex<RosterState>,
    refresh_seq: AtomicU64,
}

impl WorkflowInner {
    fn lock_state(&self) -> MutexGuard<'_, RosterState> {
        // A poisoned roster still holds valid data; keep serving it.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks an account busy for as long as it is held.
///
/// Held across the mutation request *and* the follow-up refresh, so the
/// account stays busy until its row shows the new state.
struct BusyGuard<'a> {
    inner: &'a WorkflowInner,
    id: AccountId,
}

impl<'a> BusyGuard<'a> {
    fn acquire(inner: &'a WorkflowInner, id: AccountId) -> Result<Self, WorkflowError> {
        if !inner.lock_state().busy.insert(id) {
            return Err(WorkflowError::Busy(id));
        }
        Ok(Self { inner, id })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.inner.lock_state().busy.remove(&self.id);
    }
}

/// Fetches the roster and applies moderation decisions to it.
#[derive(Clone)]
pub struct AdminWorkflow {
    inner: Arc<WorkflowInner>,
}

impl fmt::Debug for AdminWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminWorkflow").finish_non_exhaustive()
    }
}

impl AdminWorkflow {
    /// Create a workflow over `api`, reading the admin credential from
    /// `store` and asking `gate` before every mutation.
    #[must_use]
    pub fn new(api: AccountApi, store: CredentialStore, gate: Arc<dyn ConfirmationGate>) -> Self {
        Self {
            inner: Arc::new(WorkflowInner {
                api,
                store,
                gate,
                state: Mutex::new(RosterState::default()),
                refresh_seq: AtomicU64::new(0),
            }),
        }
    }

    /// The credential store backing this workflow.
    #[must_use]
    pub fn store(&self) -> &CredentialStore {
        &self.inner.store
    }

    /// The roster as of the last applied refresh.
    #[must_use]
    pub fn roster(&self) -> Vec<Account> {
        self.inner.lock_state().roster.clone()
    }

    /// Whether `id` has a change in flight.
    #[must_use]
    pub fn is_busy(&self, id: AccountId) -> bool {
        self.inner.lock_state().busy.contains(&id)
    }

    /// Fetch the roster from the service.
    ///
    /// Without an admin credential this clears the roster and returns
    /// empty without touching the network. When several refreshes race,
    /// the last one initiated wins; a superseded fetch discards its
    /// response and returns the roster now current.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::SessionExpired`] when the service
    /// rejects the token, in which case the admin credential is cleared.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Vec<Account>, WorkflowError> {
        let credential = self.inner.store.get(Scope::Admin)?;
        let Some(token) = credential.token else {
            self.inner.lock_state().roster.clear();
            return Ok(Vec::new());
        };

        // Ticket taken before the request goes out. A response applies
        // only while its ticket is still the newest issued one.
        let seq = self.inner.refresh_seq.fetch_add(1, Ordering::SeqCst) + 1;

        match self.inner.api.list_accounts(&token).await {
            Ok(accounts) => {
                let mut state = self.inner.lock_state();
                if self.inner.refresh_seq.load(Ordering::SeqCst) == seq {
                    state.roster.clone_from(&accounts);
                    Ok(accounts)
                } else {
                    debug!(seq, "refresh superseded by a newer one");
                    Ok(state.roster.clone())
                }
            }
            Err(ApiError::Unauthorized { status }) => Err(self.drop_session(status)),
            Err(e) => Err(e.into()),
        }
    }

    /// Set `id`'s approval to `approve`, then refresh the roster.
    ///
    /// The gate is consulted first; a decline sends nothing. While the
    /// request and its follow-up refresh run, further changes to the
    /// same account are rejected as [`WorkflowError::Busy`].
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] for ids outside the fetched
    /// roster and [`WorkflowError::SessionExpired`] when the service
    /// rejects the token.
    #[instrument(skip(self))]
    pub async fn set_approval(
        &self,
        id: AccountId,
        approve: bool,
    ) -> Result<MutationOutcome, WorkflowError> {
        let token = self.admin_token()?;
        let account = self.find(id)?;

        let request = ConfirmRequest {
            action: if approve {
                ConfirmAction::Approve
            } else {
                ConfirmAction::Disapprove
            },
            username: account.username.clone(),
        };
        if !self.inner.gate.confirm(&request) {
            info!(%id, "approval change declined at the gate");
            return Ok(MutationOutcome::Declined);
        }

        let _busy = BusyGuard::acquire(&self.inner, id)?;
        match self.inner.api.set_approval(&token, id, approve).await {
            Ok(()) => {}
            Err(ApiError::Unauthorized { status }) => return Err(self.drop_session(status)),
            Err(e) => return Err(e.into()),
        }

        info!(%id, approve, "approval updated");
        let roster = self.refresh().await?;
        Ok(MutationOutcome::Applied(roster))
    }

    /// Delete `id`'s account, then refresh the roster.
    ///
    /// Same gate, busy and session rules as [`Self::set_approval`].
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] for ids outside the fetched
    /// roster and [`WorkflowError::SessionExpired`] when the service
    /// rejects the token.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: AccountId) -> Result<MutationOutcome, WorkflowError> {
        let token = self.admin_token()?;
        let account = self.find(id)?;

        if !self.inner.gate.confirm(&ConfirmRequest::remove(&account)) {
            info!(%id, "removal declined at the gate");
            return Ok(MutationOutcome::Declined);
        }

        let _busy = BusyGuard::acquire(&self.inner, id)?;
        match self.inner.api.delete_account(&token, id).await {
            Ok(()) => {}
            Err(ApiError::Unauthorized { status }) => return Err(self.drop_session(status)),
            Err(e) => return Err(e.into()),
        }

        info!(%id, "account removed");
        let roster = self.refresh().await?;
        Ok(MutationOutcome::Applied(roster))
    }

    fn admin_token(&self) -> Result<SecretString, WorkflowError> {
        let credential = self.inner.store.get(Scope::Admin)?;
        credential.token.ok_or(WorkflowError::SessionExpired)
    }

    fn find(&self, id: AccountId) -> Result<Account, WorkflowError> {
        self.inner
            .lock_state()
            .roster
            .iter()
            .find(|account| account.id == id)
            .cloned()
            .ok_or(WorkflowError::NotFound(id))
    }

    fn drop_session(&self, status: u16) -> WorkflowError {
        warn!(status, "admin token rejected, dropping session");
        self.inner.lock_state().roster.clear();
        match self.inner.store.clear(Scope::Admin) {
            Ok(()) => WorkflowError::SessionExpired,
            Err(e) => e.into(),
        }
    }
}
