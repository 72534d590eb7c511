//! Roster moderation commands.
//!
//! # Usage
//!
//! ```bash
//! # List every account with its approval state
//! gatehouse roster list
//!
//! # Approve, disapprove or remove an account by id
//! gatehouse roster approve 7
//! gatehouse roster disapprove 7
//! gatehouse roster remove 7 --yes
//! ```
//!
//! All mutations ask for confirmation unless `--yes` is given. A 401 or
//! 403 from the service drops the stored admin session; log in again
//! with `gatehouse admin login`.

use std::sync::Arc;

use dialoguer::Confirm;
use dialoguer::theme::ColorfulTheme;
use gatehouse_client::api::{AccountApi, ApiError};
use gatehouse_client::config::{ClientConfig, ConfigError};
use gatehouse_client::confirm::{AutoConfirm, ConfirmRequest, ConfirmationGate};
use gatehouse_client::store::{CredentialStore, FileStore, StoreError};
use gatehouse_client::workflow::{AdminWorkflow, MutationOutcome, WorkflowError};
use gatehouse_core::{Account, AccountId, Scope};
use thiserror::Error;

/// Errors that can occur in roster commands.
#[derive(Debug, Error)]
pub enum RosterError {
    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// The moderation workflow failed.
    #[error("{0}")]
    Workflow(#[from] WorkflowError),

    /// The credential state file could not be read or written.
    #[error("{0}")]
    Store(#[from] StoreError),
}

/// Gate backed by an interactive terminal prompt.
struct PromptGate;

impl ConfirmationGate for PromptGate {
    fn confirm(&self, request: &ConfirmRequest) -> bool {
        let prompt = format!("{} {}", request.title(), request.body());
        // A failed prompt declines the mutation.
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

fn workflow(auto_confirm: bool) -> Result<AdminWorkflow, RosterError> {
    dotenvy::dotenv().ok();
    let config = ClientConfig::from_env()?;
    let store = CredentialStore::new(Arc::new(FileStore::new(config.state_file())));
    let api = AccountApi::new(&config)?;
    let gate: Arc<dyn ConfirmationGate> = if auto_confirm {
        Arc::new(AutoConfirm)
    } else {
        Arc::new(PromptGate)
    };
    Ok(AdminWorkflow::new(api, store, gate))
}

#[allow(clippy::print_stdout)]
fn print_roster(roster: &[Account]) {
    if roster.is_empty() {
        println!("No accounts.");
        return;
    }
    println!(
        "{:>6}  {:<20}  {:<30}  {}",
        "id", "username", "email", "status"
    );
    for account in roster {
        println!(
            "{:>6}  {:<20}  {:<30}  {}",
            account.id,
            account.username,
            account.email,
            account.approval_label()
        );
    }
}

/// Fetch and print the account roster.
#[allow(clippy::print_stdout)]
pub async fn list() -> Result<(), RosterError> {
    let workflow = workflow(false)?;

    if !workflow.store().get(Scope::Admin)?.is_logged_in() {
        println!("Not logged in as admin. Run `gatehouse admin login` first.");
        return Ok(());
    }

    let roster = workflow.refresh().await?;
    print_roster(&roster);
    Ok(())
}

/// Set an account's approval, then print the refreshed roster.
#[allow(clippy::print_stdout)]
pub async fn set_approval(
    id: AccountId,
    approve: bool,
    auto_confirm: bool,
) -> Result<(), RosterError> {
    let workflow = workflow(auto_confirm)?;
    workflow.refresh().await?;

    match workflow.set_approval(id, approve).await? {
        MutationOutcome::Applied(roster) => {
            println!("Approval updated.");
            print_roster(&roster);
        }
        MutationOutcome::Declined => println!("Cancelled."),
    }
    Ok(())
}

/// Delete an account, then print the refreshed roster.
#[allow(clippy::print_stdout)]
pub async fn remove(id: AccountId, auto_confirm: bool) -> Result<(), RosterError> {
    let workflow = workflow(auto_confirm)?;
    workflow.refresh().await?;

    match workflow.remove(id).await? {
        MutationOutcome::Applied(roster) => {
            println!("Account removed.");
            print_roster(&roster);
        }
        MutationOutcome::Declined => println!("Cancelled."),
    }
    Ok(())
}
