//! Soup Settings - Main Entry Point
//!
//! Command-line front end over the settings editors.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use soup_settings::catalog::{Catalog, StaticCatalog};
use soup_settings::config::Config;
use soup_settings::editor::{FilterEditor, Mode, RootController};
use soup_settings::error::EditorError;
use soup_settings::model::Filter;
use soup_settings::persistence::{PersistenceManager, SettingsStore};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

type Controller = RootController<StaticCatalog, PersistenceManager>;

/// Soup Settings CLI
#[derive(Parser)]
#[command(name = "soup-settings")]
#[command(version, about = "Edit fiat exchange-monitoring soups")]
struct Cli {
    /// Config file name, without extension
    #[arg(short, long, default_value = "config", global = true)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List selectable fiats, exchanges and banks
    Catalog {
        /// Fiat to list exchanges for (default: first fiat)
        #[arg(short, long)]
        fiat: Option<String>,
    },

    /// Show the saved soups of a fiat
    Show {
        #[arg(short, long)]
        fiat: String,

        /// Also list incomplete fields
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the saved settings of a fiat as JSON
    Export {
        #[arg(short, long)]
        fiat: String,
    },

    /// Add a soup with one exchange and save
    AddSoup(AddSoupArgs),

    /// Remove a soup by position and save
    RemoveSoup {
        #[arg(short, long)]
        fiat: String,

        /// Zero-based soup position, as listed by `show`
        #[arg(short, long)]
        index: usize,
    },

    /// Delete all saved settings of a fiat
    Delete {
        #[arg(short, long)]
        fiat: String,
    },
}

#[derive(Args)]
struct AddSoupArgs {
    #[arg(short, long)]
    fiat: String,

    /// Soup name
    #[arg(short, long)]
    name: String,

    /// Target average price
    #[arg(short, long, default_value = "0")]
    average: Decimal,

    /// Exchange to monitor
    #[arg(short, long)]
    exchange: String,

    /// Bank to accept (repeatable)
    #[arg(short, long = "bank")]
    banks: Vec<String>,

    #[arg(long)]
    min_amount: Option<Decimal>,
    #[arg(long)]
    max_amount: Option<Decimal>,
    #[arg(long)]
    min_price: Option<Decimal>,
    #[arg(long)]
    max_price: Option<Decimal>,
    /// Payment method for the buy filter (repeatable)
    #[arg(long = "payment-method")]
    payment_methods: Vec<String>,

    /// Sell-side bounds; giving any of these turns mirroring off
    #[arg(long)]
    sell_min_amount: Option<Decimal>,
    #[arg(long)]
    sell_max_amount: Option<Decimal>,
    #[arg(long)]
    sell_min_price: Option<Decimal>,
    #[arg(long)]
    sell_max_price: Option<Decimal>,
    #[arg(long = "sell-payment-method")]
    sell_payment_methods: Vec<String>,
}

/// Optional filter edits collected from the command line.
struct FilterEdits {
    min_amount: Option<Decimal>,
    max_amount: Option<Decimal>,
    min_price: Option<Decimal>,
    max_price: Option<Decimal>,
    payment_methods: Vec<String>,
}

impl FilterEdits {
    fn is_empty(&self) -> bool {
        self.min_amount.is_none()
            && self.max_amount.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
            && self.payment_methods.is_empty()
    }

    fn apply(&self, editor: &mut FilterEditor) -> Result<Filter, EditorError> {
        let mut filter = editor.value().clone();
        if let Some(v) = self.min_amount {
            filter = editor.set_min_amount(v)?;
        }
        if let Some(v) = self.max_amount {
            filter = editor.set_max_amount(v)?;
        }
        if let Some(v) = self.min_price {
            filter = editor.set_min_price(v)?;
        }
        if let Some(v) = self.max_price {
            filter = editor.set_max_price(v)?;
        }
        if !self.payment_methods.is_empty() {
            filter = editor.set_payment_methods(self.payment_methods.iter().cloned())?;
        }
        Ok(filter)
    }
}

impl AddSoupArgs {
    fn buy_edits(&self) -> FilterEdits {
        FilterEdits {
            min_amount: self.min_amount,
            max_amount: self.max_amount,
            min_price: self.min_price,
            max_price: self.max_price,
            payment_methods: self.payment_methods.clone(),
        }
    }

    fn sell_edits(&self) -> FilterEdits {
        FilterEdits {
            min_amount: self.sell_min_amount,
            max_amount: self.sell_max_amount,
            min_price: self.sell_min_price,
            max_price: self.sell_max_price,
            payment_methods: self.sell_payment_methods.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging()?;

    let config = Config::load(&cli.config)?;
    config.validate()?;

    let store = PersistenceManager::new(&config.storage.db_path, config.storage.storage_key.clone())
        .with_context(|| format!("Failed to open settings store {}", config.storage.db_path))?;
    let catalog = StaticCatalog::new(config.catalog.clone());

    let mut root = RootController::new(catalog, store);
    root.mount().await;

    let result = run_command(&mut root, cli.command).await;

    for notice in root.take_notices() {
        println!("{notice}");
    }

    result
}

async fn run_command(root: &mut Controller, command: Commands) -> Result<()> {
    match command {
        Commands::Catalog { fiat } => show_catalog(root, fiat.as_deref()).await,
        Commands::Show { fiat, verbose } => show_fiat(root, &fiat, verbose).await,
        Commands::Export { fiat } => export_fiat(root, &fiat),
        Commands::AddSoup(args) => add_soup(root, &args).await,
        Commands::RemoveSoup { fiat, index } => remove_soup(root, &fiat, index).await,
        Commands::Delete { fiat } => {
            root.select_fiat(&fiat).await?;
            if !root.delete_saved()? {
                println!("No saved settings for {fiat}");
            }
            Ok(())
        }
    }
}

async fn show_catalog(root: &Controller, fiat: Option<&str>) -> Result<()> {
    let fiats = root.fiats();
    println!("Fiats: {}", fiats.join(", "));

    let Some(fiat) = fiat.or_else(|| fiats.first().map(String::as_str)) else {
        return Ok(());
    };

    let catalog = root.catalog();
    for exchange in catalog.list_exchanges(fiat).await? {
        let banks = catalog.list_banks(fiat, &exchange).await?;
        println!("   ├─ {}: {}", exchange, banks.join(", "));
    }
    Ok(())
}

async fn show_fiat(root: &mut Controller, fiat: &str, verbose: bool) -> Result<()> {
    root.select_fiat(fiat).await?;

    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║  {:<58}║", format!("SOUPS FOR {fiat}"));
    println!("╚════════════════════════════════════════════════════════════╝");

    if root.soup_editors().is_empty() {
        println!("\nNo soups saved for {fiat}.");
        return Ok(());
    }

    for (i, soup) in root.soup_editors().iter().enumerate() {
        println!("\n[{i}] {}", soup.summary());
    }

    if verbose {
        let issues = root.issues();
        if !issues.is_empty() {
            println!("\nIncomplete fields");
            for issue in issues {
                println!("   ├─ {issue}");
            }
        }
    }
    Ok(())
}

fn export_fiat(root: &Controller, fiat: &str) -> Result<()> {
    match root.store().load_all().get(fiat) {
        Some(saved) => println!("{}", serde_json::to_string_pretty(saved)?),
        None => println!("No saved settings for {fiat}"),
    }
    Ok(())
}

async fn add_soup(root: &mut Controller, args: &AddSoupArgs) -> Result<()> {
    root.select_fiat(&args.fiat).await?;
    root.add_soup()?;
    let index = root.soup_editors().len() - 1;

    root.edit_soup(index, |s| s.set_name(args.name.as_str()))?;
    root.edit_soup(index, |s| s.set_average(args.average))?;
    root.edit_soup(index, |s| s.select_exchange(0, &args.exchange))?;
    root.refresh_banks(index, 0).await?;

    if !args.banks.is_empty() {
        root.edit_soup(index, |s| {
            s.edit_exchange(0, |ex| ex.set_banks(args.banks.iter().cloned()))
        })?;
    }

    let buy = args.buy_edits();
    if !buy.is_empty() {
        root.edit_soup(index, |s| {
            s.edit_exchange(0, |ex| ex.edit_buy_filter(|f| buy.apply(f)))
        })?;
    }

    let sell = args.sell_edits();
    if !sell.is_empty() {
        root.edit_soup(index, |s| {
            s.edit_exchange(0, |ex| {
                ex.set_mirror(false)?;
                ex.edit_sell_filter(|f| sell.apply(f))
            })
        })?;
    }

    root.submit_soup(index)?;
    info!(fiat = %args.fiat, soup = %args.name, "Soup added");

    if let Some(soup) = root.soup_editors().get(index) {
        let mut soup = soup.clone();
        soup.set_mode(Mode::View);
        println!("{}", soup.summary());
    }
    Ok(())
}

async fn remove_soup(root: &mut Controller, fiat: &str, index: usize) -> Result<()> {
    root.select_fiat(fiat).await?;
    let removed = root.remove_soup(index)?;
    println!("Removed soup '{}'", removed.name);

    // An empty soup list cannot be submitted; drop the saved entry instead
    if root.soup_editors().is_empty() {
        root.delete_saved()?;
    } else {
        root.submit()?;
    }
    Ok(())
}

/// Initialize logging: stderr plus an hourly rolling file under `logs/`.
fn init_logging() -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all("logs")?;

    let file_appender = tracing_appender::rolling::hourly("logs", "soup-settings.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the guard alive for the program duration
    Box::leak(Box::new(guard));

    tracing_subscriber::fmt()
        .with_env_filter(log_filter()?)
        .with_writer(std::io::stderr.and(file_writer))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .init();

    Ok(())
}

/// Crate at debug, everything else at info, on top of `RUST_LOG`.
fn log_filter() -> Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive("soup_settings=debug".parse()?)
        .add_directive(Level::INFO.into()))
}
