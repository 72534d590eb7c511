//! Gatehouse CLI - account sessions and roster moderation.
//!
//! # Usage
//!
//! ```bash
//! # Log in to a user account
//! gatehouse login -e ada@example.com
//!
//! # Register a new account (approval required before login works)
//! gatehouse signup -u ada -e ada@example.com
//!
//! # Open an admin session, then moderate the roster
//! gatehouse admin login -e root@example.com
//! gatehouse roster list
//! gatehouse roster approve 7
//! gatehouse roster remove 7 --yes
//! ```
//!
//! # Commands
//!
//! - `login` / `logout` / `status` - User session management
//! - `signup` / `forgot-password` / `reset-password` - Account lifecycle
//! - `admin login` - Admin session management
//! - `roster` - List, approve, disapprove and remove accounts

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use gatehouse_core::{AccountId, Scope};

mod commands;

#[derive(Parser)]
#[command(name = "gatehouse")]
#[command(author, version, about = "Gatehouse account and moderation tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in to a user account
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Drop the user session, or the admin session with --admin
    Logout {
        /// Drop the admin session instead
        #[arg(long)]
        admin: bool,
    },
    /// Show both sessions and where the route guard would send you
    Status,
    /// Register a new account (an admin must approve it before login works)
    Signup {
        /// Desired username
        #[arg(short, long)]
        username: String,

        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Password (prompted with confirmation when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Request a password reset link
    ForgotPassword {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Set a new password using the token from a reset link
    ResetPassword {
        /// Token from the reset link
        #[arg(short, long)]
        token: String,

        /// New password (prompted with confirmation when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Manage the admin session
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Moderate the account roster (admin session required)
    Roster {
        #[command(subcommand)]
        action: RosterAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Log in to an admin account
    Login {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
}

#[derive(Subcommand)]
enum RosterAction {
    /// List all accounts
    List,
    /// Approve an account
    Approve {
        /// Account id
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Withdraw an account's approval
    Disapprove {
        /// Account id
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Delete an account
    Remove {
        /// Account id
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Login { email, password } => {
            commands::account::login(&email, password).await?;
        }
        Commands::Logout { admin } => {
            let scope = if admin { Scope::Admin } else { Scope::User };
            commands::account::logout(scope)?;
        }
        Commands::Status => commands::account::status()?,
        Commands::Signup {
            username,
            email,
            password,
        } => {
            commands::account::signup(&username, &email, password).await?;
        }
        Commands::ForgotPassword { email } => {
            commands::account::forgot_password(&email).await?;
        }
        Commands::ResetPassword { token, password } => {
            commands::account::reset_password(&token, password).await?;
        }
        Commands::Admin { action } => match action {
            AdminAction::Login { email, password } => {
                commands::account::admin_login(&email, password).await?;
            }
        },
        Commands::Roster { action } => match action {
            RosterAction::List => commands::roster::list().await?,
            RosterAction::Approve { id, yes } => {
                commands::roster::set_approval(AccountId::new(id), true, yes).await?;
            }
            RosterAction::Disapprove { id, yes } => {
                commands::roster::set_approval(AccountId::new(id), false, yes).await?;
            }
            RosterAction::Remove { id, yes } => {
                commands::roster::remove(AccountId::new(id), yes).await?;
            }
        },
    }
    Ok(())
}
