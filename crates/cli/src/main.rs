//! FreshMart CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! fm-cli migrate
//!
//! # Load the sample catalog and the admin account
//! fm-cli seed --admin-password 'change-me-please'
//!
//! # Create a courier
//! fm-cli user create -e rider@example.com -n "Rider One" -r courier -p s3cret-pass
//!
//! # Look up a user
//! fm-cli user show rider@example.com
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "fm-cli")]
#[command(author, version, about = "FreshMart CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Replace the product catalog and ensure the admin account exists
    Seed {
        /// Password for a newly created admin (generated when omitted)
        #[arg(long)]
        admin_password: Option<String>,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a user with an explicit role
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role (`customer`, `courier`, `admin`)
        #[arg(short, long, default_value = "customer")]
        role: String,

        /// Initial password (at least 6 characters)
        #[arg(short, long)]
        password: String,
    },
    /// Show a user by email
    Show {
        /// Email address
        email: String,
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { admin_password } => commands::seed::run(admin_password).await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                name,
                role,
                password,
            } => {
                commands::user::create(&email, &name, &role, &password).await?;
            }
            UserAction::Show { email } => commands::user::show(&email).await?,
        },
    }
    Ok(())
}
