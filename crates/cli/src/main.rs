//! Granary CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! granary-cli migrate
//!
//! # Allowlist a phone for contact-sharing onboarding
//! granary-cli phone add "+7 900 111-22-33" --comment "Night shift"
//! granary-cli phone list
//!
//! # Make someone the owner
//! granary-cli user set-role 239676985 OWNER
//!
//! # Sign init data for local API testing
//! granary-cli init-data sign --user-id 239676985 --first-name Ivan
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::init_data::SignRequest;

#[derive(Parser)]
#[command(name = "granary-cli")]
#[command(author, version, about = "Granary CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage the phone allowlist
    Phone {
        #[command(subcommand)]
        action: PhoneAction,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Mini-app init data helpers
    InitData {
        #[command(subcommand)]
        action: InitDataAction,
    },
}

#[derive(Subcommand)]
enum PhoneAction {
    /// Allow a phone number
    Add {
        /// Phone number in any common format
        phone: String,

        /// Note shown to admins
        #[arg(short, long)]
        comment: Option<String>,
    },
    /// List allowed phone numbers
    List,
}

#[derive(Subcommand)]
enum UserAction {
    /// Set a user's role by Telegram ID
    SetRole {
        /// Telegram account ID
        telegram_id: i64,

        /// Role (`OWNER`, `ADMIN`, `IT`, `OPERATOR`, `GUEST`)
        role: String,
    },
}

#[derive(Subcommand)]
enum InitDataAction {
    /// Print signed init data for a user
    Sign {
        /// Telegram account ID
        #[arg(long)]
        user_id: i64,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        username: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so `init-data sign` output can be piped
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Phone { action } => match action {
            PhoneAction::Add { phone, comment } => {
                commands::phone::add(&phone, comment.as_deref()).await?;
            }
            PhoneAction::List => commands::phone::list().await?,
        },
        Commands::User { action } => match action {
            UserAction::SetRole { telegram_id, role } => {
                commands::user::set_role(telegram_id, &role).await?;
            }
        },
        Commands::InitData { action } => match action {
            InitDataAction::Sign {
                user_id,
                first_name,
                username,
            } => commands::init_data::sign(&SignRequest {
                user_id,
                first_name,
                username,
            })?,
        },
    }
    Ok(())
}
