//! Crafted Roots CLI - drive the storefront from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Log in (session is saved to ~/.crafted-roots/session.json)
//! cr-cli login -u meera -p 'correct horse'
//!
//! # Browse and shop
//! cr-cli products --category pottery
//! cr-cli cart add PRD-8F3K2Q -q 2
//! cr-cli cart total --gift-wrap
//!
//! # Account
//! cr-cli orders
//! cr-cli logout
//! ```
//!
//! # Environment Variables
//!
//! - `CRAFTED_ROOTS_API_BASE` - Backend base URL
//! - `CRAFTED_ROOTS_SESSION_FILE` - Where the session is saved
//! - `RUST_LOG` - Log filter (default: `cr_cli=info,crafted_roots_storefront=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use crafted_roots_storefront::{ClientConfig, ClientError, Storefront, StorefrontEvent};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "cr-cli")]
#[command(author, version, about = "Crafted Roots storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and save the session
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,
    },
    /// Create a new account
    Signup {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        /// Repeat the password
        #[arg(long)]
        confirm: String,
    },
    /// Log out and forget the saved session
    Logout,
    /// Show who is logged in
    Whoami,
    /// List products
    Products {
        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        search: Option<String>,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Show order history
    Orders,
    /// Show the account profile
    Profile,
    /// Change or reset the password
    Password {
        #[command(subcommand)]
        action: PasswordAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// List cart lines
    List,
    /// Show the number of cart lines
    Count,
    /// Add a product
    Add {
        product_id: String,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set the quantity of a cart line
    Set { product_id: String, quantity: u32 },
    /// Remove a product
    Remove { product_id: String },
    /// Show cart totals
    Total {
        /// Include gift wrapping
        #[arg(long)]
        gift_wrap: bool,
    },
}

#[derive(Subcommand)]
enum PasswordAction {
    /// Change the password of the logged-in account
    Change {
        #[arg(long)]
        old: String,

        #[arg(long)]
        new: String,
    },
    /// Request a password reset link
    Forgot {
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cr_cli=info,crafted_roots_storefront=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::debug!("Command failed: {e:?}");
        tracing::error!("{}", e.user_message());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    let config = ClientConfig::from_env()?;
    let storefront = Storefront::with_session_file(config).await?;
    let mut events = storefront.events().subscribe();

    let result = dispatch(&storefront, cli.command).await;

    while let Ok(event) = events.try_recv() {
        if let StorefrontEvent::LoginRequired { .. } = event {
            tracing::warn!("Your session has expired. Run `cr-cli login` to sign in again.");
        }
    }

    result
}

async fn dispatch(storefront: &Storefront, command: Commands) -> Result<(), ClientError> {
    match command {
        Commands::Login { username, password } => {
            commands::auth::login(storefront, &username, password).await
        }
        Commands::Signup {
            username,
            email,
            password,
            confirm,
        } => commands::auth::signup(storefront, username, email, password, confirm).await,
        Commands::Logout => commands::auth::logout(storefront).await,
        Commands::Whoami => commands::auth::whoami(storefront).await,
        Commands::Products { category, search } => {
            commands::products::list(storefront, category, search).await
        }
        Commands::Cart { action } => match action {
            CartAction::List => commands::cart::list(storefront).await,
            CartAction::Count => commands::cart::count(storefront).await,
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(storefront, &product_id, quantity).await,
            CartAction::Set {
                product_id,
                quantity,
            } => commands::cart::set(storefront, &product_id, quantity).await,
            CartAction::Remove { product_id } => {
                commands::cart::remove(storefront, &product_id).await
            }
            CartAction::Total { gift_wrap } => commands::cart::total(storefront, gift_wrap).await,
        },
        Commands::Orders => commands::account::orders(storefront).await,
        Commands::Profile => commands::account::profile(storefront).await,
        Commands::Password { action } => match action {
            PasswordAction::Change { old, new } => {
                commands::auth::change_password(storefront, old, new).await
            }
            PasswordAction::Forgot { email } => {
                commands::auth::forgot_password(storefront, &email).await
            }
        },
    }
}
