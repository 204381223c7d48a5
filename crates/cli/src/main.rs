//! Tote CLI - command-line shell over the shopping client.
//!
//! # Usage
//!
//! ```bash
//! # Sign in; the session is kept in the data directory
//! tote login -u emilys -p emilyspass
//!
//! # Browse the catalog
//! tote products --category smartphones --sort price_low_high --max-price 500
//!
//! # Work with the cart
//! tote cart add 1
//! tote cart dec 1
//! ```
//!
//! # Commands
//!
//! - `login` / `logout` / `whoami` - Session lifecycle
//! - `categories` / `products` - Catalog browsing
//! - `cart` - Cart operations for the signed-in user
//! - `favorites` - Favorites list

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tote_client::{ClientConfig, ShopClient};
use tote_core::{ProductId, SortOption};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "tote")]
#[command(author, version, about = "Tote shopping client")]
struct Cli {
    /// Directory holding the session, cart and favorites
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Base URL of the REST backend
    #[arg(long, global = true)]
    api_base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with a username and password
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,
    },
    /// Sign out and delete the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List product categories
    Categories,
    /// List products
    Products {
        /// Only products in this category slug
        #[arg(long)]
        category: Option<String>,

        #[arg(long, default_value_t = 0)]
        skip: u32,

        #[arg(long, default_value_t = 16)]
        limit: u32,

        /// `popular`, `newest`, `customer_review`, `price_low_high` or `price_high_low`
        #[arg(long)]
        sort: Option<SortOption>,

        /// Keep only this brand (repeatable)
        #[arg(long = "brand")]
        brands: Vec<String>,

        /// Lowest discounted price to show
        #[arg(long)]
        min_price: Option<Decimal>,

        /// Highest discounted price to show
        #[arg(long)]
        max_price: Option<Decimal>,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage favorites
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add one unit of a product
    Add { id: ProductId },
    /// Add one to a line's quantity
    Inc { id: ProductId },
    /// Take one off a line's quantity
    Dec { id: ProductId },
    /// Remove a line
    Remove { id: ProductId },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// List favorites
    List,
    /// Add a product
    Add { id: ProductId },
    /// Remove a product
    Remove { id: ProductId },
    /// Remove every product
    Clear,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|dsn| !dsn.is_empty())?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Map tracing levels to Sentry: warnings and errors become events, the
/// rest breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let _sentry_guard = init_sentry();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tote_client=info,tote_cli=info".into());

    // Logs go to stderr so command output can be piped.
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        if e
            .downcast_ref::<commands::CommandError>()
            .is_some_and(commands::CommandError::needs_sign_in)
        {
            tracing::info!("Sign in with `tote login -u USER -p PASS`");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ClientConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(url) = cli.api_base_url {
        config = config.with_api_base_url(&url)?;
    }

    let shop = ShopClient::on_disk(&config)?;
    shop.session().restore().await;
    shop.session().wait_until_loaded().await;

    match cli.command {
        Commands::Login { username, password } => {
            commands::session::login(&shop, &username, &password).await?;
        }
        Commands::Logout => commands::session::logout(&shop).await,
        Commands::Whoami => commands::session::whoami(&shop)?,
        Commands::Categories => commands::catalog::categories(&shop).await?,
        Commands::Products {
            category,
            skip,
            limit,
            sort,
            brands,
            min_price,
            max_price,
        } => {
            let filters = commands::catalog::ProductFilters {
                category,
                skip,
                limit,
                sort,
                brands,
                min_price,
                max_price,
            };
            commands::catalog::products(&shop, filters).await?;
        }
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&shop).await?,
            CartAction::Add { id } => commands::cart::add(&shop, id).await?,
            CartAction::Inc { id } => commands::cart::increment(&shop, id).await?,
            CartAction::Dec { id } => commands::cart::decrement(&shop, id).await?,
            CartAction::Remove { id } => commands::cart::remove(&shop, id).await?,
            CartAction::Clear => commands::cart::clear(&shop).await?,
        },
        Commands::Favorites { action } => match action {
            FavoritesAction::List => commands::favorites::list(&shop).await,
            FavoritesAction::Add { id } => commands::favorites::add(&shop, id).await?,
            FavoritesAction::Remove { id } => commands::favorites::remove(&shop, id).await,
            FavoritesAction::Clear => commands::favorites::clear(&shop).await,
        },
    }
    Ok(())
}
