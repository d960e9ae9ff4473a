//! JuliD's storefront CLI.
//!
//! Drives the storefront client from the terminal: browse the catalog,
//! manage the cart, check out, and manage the account and orders. Every
//! outcome is printed as a notice.
//!
//! # Usage
//!
//! ```bash
//! julid products
//! julid cart add 12 -q 2
//! julid login -e ada@example.com -p '...'
//! julid checkout --phone 0800000000
//! julid orders list
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use julid_core::{CartLineId, CustomOrderId, OrderId, ProductId, Quantity};
use julid_storefront::api::ApiError;
use julid_storefront::config::{ConfigError, StorefrontConfig};
use julid_storefront::error::StorefrontError;
use julid_storefront::state::AppState;

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "julid")]
#[command(author, version, about = "JuliD's storefront from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the catalog
    Products,
    /// Show one product
    Product {
        /// Product id
        id: ProductId,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place one order per cart line
    Checkout {
        /// Contact phone number for the orders
        #[arg(long)]
        phone: String,
    },
    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        /// Repeat the password
        #[arg(long)]
        confirm: String,
    },
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Email a password reset link
    ForgotPassword {
        #[arg(short, long)]
        email: String,
    },
    /// Set a new password from a reset link or token
    ResetPassword {
        /// Reset link as received by email
        #[arg(long, conflicts_with = "token", required_unless_present = "token")]
        link: Option<String>,

        /// Raw reset token
        #[arg(long)]
        token: Option<String>,

        #[arg(short, long)]
        password: String,

        /// Repeat the password
        #[arg(long)]
        confirm: String,
    },
    /// Shop order history
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Request a custom (bespoke) order
    CustomOrder {
        #[command(subcommand)]
        action: CustomOrderAction,
    },
    /// Custom order history
    CustomOrders {
        #[command(subcommand)]
        action: CustomOrdersAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart and its total
    Show,
    /// Add a product
    Add {
        product_id: ProductId,

        #[arg(short, long, default_value_t = Quantity::ONE)]
        quantity: Quantity,
    },
    /// Set a line's quantity
    Update {
        #[arg(allow_negative_numbers = true)]
        line_id: CartLineId,

        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        #[arg(allow_negative_numbers = true)]
        line_id: CartLineId,

        /// Skip the confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Empty the cart
    Clear {
        /// Skip the confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Replace the local cart with the server cart
    Reconcile,
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List your shop orders
    List,
    /// Cancel a shop order
    Cancel {
        id: OrderId,

        /// Skip the confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Email the buyer that an order was completed
    NotifyCompleted { id: OrderId },
}

#[derive(Subcommand)]
enum CustomOrderAction {
    /// Submit a custom order request
    Submit {
        /// What you would like made
        #[arg(short, long)]
        description: String,

        #[arg(long)]
        phone: String,

        /// Defaults to the signed-in user's name
        #[arg(short, long)]
        name: Option<String>,

        /// Defaults to the signed-in user's email
        #[arg(short, long)]
        email: Option<String>,

        /// Reference image
        #[arg(long)]
        image: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum CustomOrdersAction {
    /// List your custom orders
    List,
    /// Cancel a custom order
    Cancel {
        id: CustomOrderId,

        /// Skip the confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

impl Commands {
    /// Notice text when a failure carries no server message.
    const fn failure_message(&self) -> &'static str {
        match self {
            Self::Products | Self::Product { .. } => "Failed to load products",
            Self::Cart { .. } => "Cart update failed",
            Self::Checkout { .. } => "Checkout failed",
            Self::Login { .. } => "Login failed. Please try again.",
            Self::Register { .. } => "Registration failed. Please try again.",
            Self::Logout | Self::Whoami => "Session error",
            Self::ForgotPassword { .. } => "Network error. Please try again.",
            Self::ResetPassword { .. } => "Something went wrong. Please try again.",
            Self::Orders { .. } => "Failed to update orders",
            Self::CustomOrder { .. } => "Something went wrong. Try again.",
            Self::CustomOrders { .. } => "Failed to load orders",
        }
    }

    /// Notice text when the store could not be reached at all.
    const fn unreachable_message(&self) -> Option<&'static str> {
        match self {
            Self::Cart {
                action: CartAction::Add { .. },
            } => Some(commands::cart::ADD_NEEDS_CONNECTION),
            _ => None,
        }
    }
}

/// Fallback notice text for `err`.
fn failure_text(
    err: &StorefrontError,
    fallback: &'static str,
    unreachable: Option<&'static str>,
) -> &'static str {
    match (err, unreachable) {
        (StorefrontError::Transport(ApiError::Transport(_)), Some(text)) => text,
        _ => fallback,
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storefront(#[from] StorefrontError),
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
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
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "julid_storefront=info,julid_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), CliError> {
    let state = AppState::init(config).await?;
    let fallback = cli.command.failure_message();
    let unreachable = cli.command.unreachable_message();

    let result = dispatch(&state, cli.command).await;
    if let Err(e) = &result {
        // The sequencer reports aborted checkouts itself
        if !matches!(e, StorefrontError::CheckoutAborted { .. }) {
            e.report();
        }
        state
            .notices()
            .failure(e, failure_text(e, fallback, unreachable));
    }

    output::notices(&state.notices().active());
    state.shutdown();
    Ok(result?)
}

async fn dispatch(state: &AppState, command: Commands) -> Result<(), StorefrontError> {
    match command {
        Commands::Products => commands::catalog::list(state).await,
        Commands::Product { id } => commands::catalog::show(state, id).await,
        Commands::Cart { action } => match action {
            CartAction::Show => {
                commands::cart::show(state);
                Ok(())
            }
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(state, product_id, quantity).await,
            CartAction::Update { line_id, quantity } => {
                commands::cart::update(state, line_id, quantity).await
            }
            CartAction::Remove { line_id, yes } => {
                commands::cart::remove(state, line_id, yes).await;
                Ok(())
            }
            CartAction::Clear { yes } => {
                commands::cart::clear(state, yes).await;
                Ok(())
            }
            CartAction::Reconcile => commands::cart::reconcile(state).await,
        },
        Commands::Checkout { phone } => commands::checkout::run(state, &phone).await,
        Commands::Login { email, password } => {
            commands::account::login(state, &email, password).await
        }
        Commands::Register {
            name,
            email,
            password,
            confirm,
        } => commands::account::register(state, &name, &email, password, confirm).await,
        Commands::Logout => commands::account::logout(state),
        Commands::Whoami => {
            commands::account::whoami(state);
            Ok(())
        }
        Commands::ForgotPassword { email } => {
            commands::account::forgot_password(state, &email).await
        }
        Commands::ResetPassword {
            link,
            token,
            password,
            confirm,
        } => {
            commands::account::reset_password(state, link.as_deref(), token, password, confirm)
                .await
        }
        Commands::Orders { action } => match action {
            OrdersAction::List => commands::orders::list(state).await,
            OrdersAction::Cancel { id, yes } => commands::orders::cancel(state, id, yes).await,
            OrdersAction::NotifyCompleted { id } => {
                commands::orders::notify_completed(state, id).await
            }
        },
        Commands::CustomOrder { action } => match action {
            CustomOrderAction::Submit {
                description,
                phone,
                name,
                email,
                image,
            } => {
                commands::custom_orders::submit(state, description, phone, name, email, image)
                    .await
            }
        },
        Commands::CustomOrders { action } => match action {
            CustomOrdersAction::List => commands::custom_orders::list(state).await,
            CustomOrdersAction::Cancel { id, yes } => {
                commands::custom_orders::cancel(state, id, yes).await
            }
        },
    }
}
