//! cartsync CLI - drive a cart and address session from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart
//! cartsync cart show
//!
//! # Add two units of product 7 at 25.00
//! cartsync cart add --id 7 --name Mango --price 25 --qty 2 --category 3 --product 7
//!
//! # Sign in; later commands are mirrored to the storefront API
//! cartsync login <token>
//!
//! # Add and select a delivery address
//! cartsync address add --name "Asha" --phone 9876543210 --street "12 MG Road" \
//!     --city Pune --state Maharashtra --pincode 411001
//! cartsync address select 1
//! ```
//!
//! # Commands
//!
//! - `cart` - Show and change the cart
//! - `address` - Manage delivery addresses
//! - `wishlist` - Manage the wishlist
//! - `login` / `logout` - Store or forget the session token
//!
//! Configuration is read from the environment (and `.env`); see
//! `cartsync_client::config`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cartsync_client::{ClientConfig, Session};

mod commands;

use commands::CliError;
use commands::address::AddressAction;
use commands::cart::CartAction;
use commands::wishlist::WishlistAction;

#[derive(Parser)]
#[command(name = "cartsync")]
#[command(author, version, about = "Cart and address sync for the storefront API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage delivery addresses
    Address {
        #[command(subcommand)]
        action: AddressAction,
    },
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Store a session token and sync with the storefront
    Login {
        /// Bearer token issued by the storefront
        token: String,
    },
    /// Forget the session token and saved addresses
    Logout,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Defaults to info level for the cartsync crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cartsync=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    if let Err(e) = run(cli, &config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &ClientConfig) -> Result<(), CliError> {
    let session = Session::from_config(config).await?;

    match cli.command {
        Commands::Cart { action } => commands::cart::run(&session, action).await?,
        Commands::Address { action } => commands::address::run(&session, action).await?,
        Commands::Wishlist { action } => commands::wishlist::run(&session, action).await?,
        Commands::Login { token } => commands::auth::login(&session, token).await?,
        Commands::Logout => commands::auth::logout(session).await?,
    }
    Ok(())
}
