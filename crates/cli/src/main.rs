//! Cartwheel CLI - browse the catalog, manage the cart and check out.
//!
//! # Usage
//!
//! ```bash
//! # List products, optionally by category and page
//! cartwheel products --category tea --page 2
//!
//! # Add two of a product, then bump a line
//! cartwheel cart add 42 -q 2
//! cartwheel cart inc 1
//!
//! # Place the order
//! cartwheel checkout --name "Lin Mei" --email mei@example.com \
//!     --tel 0912345678 --address "Taipei"
//! ```
//!
//! Configuration is read from the environment (see `cartwheel_storefront::config`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;
use std::sync::Arc;

use cartwheel_core::{CartLineId, CustomerForm, OrderId, ProductId};
use cartwheel_storefront::{Action, ProductQuery, StoreContext, StorefrontConfig};
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod console;

#[derive(Parser)]
#[command(name = "cartwheel")]
#[command(author, version, about = "Cartwheel storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products
    Products {
        /// Only this category
        #[arg(short, long)]
        category: Option<String>,

        /// Page number (1-based)
        #[arg(short, long)]
        page: Option<u32>,
    },
    /// Show one product
    Product {
        /// Product ID
        id: String,
    },
    /// Inspect or change the cart
    Cart {
        #[command(subcommand)]
        action: Option<CartAction>,
    },
    /// Place an order for the current cart
    Checkout {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        tel: String,

        #[arg(long)]
        address: String,

        /// Note for the shop
        #[arg(short, long, default_value = "")]
        message: String,
    },
    /// Show a placed order
    Order {
        /// Order ID
        id: String,
    },
    /// Pay for a placed order
    Pay {
        /// Order ID
        id: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart (default)
    Show,
    /// Add a product
    Add {
        /// Product ID
        product_id: String,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set the quantity of a line
    Set {
        /// Cart line ID
        line_id: String,

        quantity: u32,
    },
    /// Increase a line by one
    Inc {
        /// Cart line ID
        line_id: String,
    },
    /// Decrease a line by one (never below 1)
    Dec {
        /// Cart line ID
        line_id: String,
    },
    /// Remove a line
    Remove {
        /// Cart line ID
        line_id: String,
    },
    /// Remove every line
    Clear,
    /// Apply a coupon code
    Coupon {
        code: String,
    },
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
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            console::error(&format!("configuration: {e}"));
            return ExitCode::FAILURE;
        }
    };

    // Sentry before the subscriber so the layer has a client
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cartwheel_storefront=info,cartwheel_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let store = match StoreContext::from_config(&config, Arc::new(console::ConsoleNotifier)) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to build commerce client: {e}");
            return ExitCode::FAILURE;
        }
    };

    if commands::run(&store, action_for(cli.command)).await {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Translate a parsed command into the store action it stands for.
fn action_for(command: Commands) -> Action {
    match command {
        Commands::Products { category, page } => Action::ListProducts {
            query: ProductQuery { page, category },
        },
        Commands::Product { id } => Action::ShowProduct(ProductId::new(id)),
        Commands::Cart { action } => match action.unwrap_or(CartAction::Show) {
            CartAction::Show => Action::RefreshCart,
            CartAction::Add {
                product_id,
                quantity,
            } => Action::AddItem {
                product_id: Some(ProductId::new(product_id)),
                quantity,
            },
            CartAction::Set { line_id, quantity } => Action::UpdateQuantity {
                line_id: CartLineId::new(line_id),
                quantity,
            },
            CartAction::Inc { line_id } => Action::Increment(CartLineId::new(line_id)),
            CartAction::Dec { line_id } => Action::Decrement(CartLineId::new(line_id)),
            CartAction::Remove { line_id } => Action::RemoveItem(CartLineId::new(line_id)),
            CartAction::Clear => Action::ClearCart,
            CartAction::Coupon { code } => Action::ApplyCoupon(code),
        },
        Commands::Checkout {
            name,
            email,
            tel,
            address,
            message,
        } => Action::Checkout {
            form: CustomerForm {
                name,
                email,
                tel,
                address,
            },
            message,
        },
        Commands::Order { id } => Action::GetOrder(OrderId::new(id)),
        Commands::Pay { id } => Action::PayOrder(OrderId::new(id)),
    }
}
