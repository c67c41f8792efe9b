use clap::{Parser, Subcommand, ValueEnum};
use commishcrunch::application::backup::BackupService;
use commishcrunch::application::calculator::{Calculation, CommissionService, ManualSale};
use commishcrunch::config::Config;
use commishcrunch::domain::category::Category;
use commishcrunch::domain::clock::SystemClock;
use commishcrunch::domain::commission::LineItemKind;
use commishcrunch::domain::ports::{SaleHistoryStoreBox, SettingsStoreBox};
use commishcrunch::domain::record::{SaleFilter, SaleId, SaleStatus, SaleUpdate};
use commishcrunch::domain::rules::PricingMode;
use commishcrunch::domain::sale::SaleInput;
use commishcrunch::error::CommissionError;
use commishcrunch::infrastructure::json_file::JsonFileStore;
#[cfg(feature = "storage-rocksdb")]
use commishcrunch::infrastructure::rocksdb::RocksDBStore;
use commishcrunch::interfaces::csv::quote_reader::QuoteReader;
use commishcrunch::interfaces::csv::sale_writer::{QuoteResultRow, SaleWriter};
use commishcrunch::interfaces::format::{currency, percent};
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file. Missing files fall back to defaults.
    #[arg(long, global = true, default_value = "commishcrunch.toml")]
    config: PathBuf,

    /// Directory holding sales.json and settings.json.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Industry to work on (solar, lighting, pest).
    #[arg(long, short, global = true)]
    category: Option<Category>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Calculate the commission for one sale
    Calculate {
        /// System size in the category's unit (kW for solar)
        #[arg(long)]
        size: String,
        /// Price per unit; defaults to the configured price
        #[arg(long)]
        price: Option<String>,
        /// Record the result as a pending sale
        #[arg(long)]
        save: bool,
        #[arg(long)]
        customer: Option<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Calculate every quote in a CSV file (customer, unit_count, unit_price)
    Batch { input: PathBuf },

    /// Show or change the commission rules
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Manage the sale history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Summary of completed and pending sales
    Stats,

    /// Write a JSON backup of the category's settings and sales
    Export {
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },

    /// Merge a JSON backup into the current data
    Import { file: PathBuf },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    Set(SettingsArgs),
    /// Forget saved rules and use the defaults again
    Reset,
}

#[derive(clap::Args)]
struct SettingsArgs {
    #[arg(long)]
    price_per_unit: Option<Decimal>,
    #[arg(long)]
    base_rate: Option<Decimal>,
    #[arg(long)]
    redline: Option<Decimal>,
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
    #[arg(long)]
    volume_bonus: Option<bool>,
    #[arg(long)]
    volume_threshold: Option<u32>,
    #[arg(long)]
    volume_bonus_rate: Option<Decimal>,
    #[arg(long)]
    sharing: Option<bool>,
    #[arg(long)]
    shared_percent: Option<Decimal>,
    #[arg(long)]
    sharing_reason: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    PercentOfSale,
    MarginAboveRedline,
}

impl From<ModeArg> for PricingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::PercentOfSale => PricingMode::PercentOfSale,
            ModeArg::MarginAboveRedline => PricingMode::MarginAboveRedline,
        }
    }
}

#[derive(Subcommand)]
enum HistoryAction {
    List {
        #[arg(long)]
        status: Option<SaleStatus>,
        /// Only sales created this calendar month
        #[arg(long)]
        this_month: bool,
        /// Print CSV instead of a table
        #[arg(long)]
        csv: bool,
    },
    /// Record a sale by hand
    Add {
        #[arg(long)]
        customer: String,
        #[arg(long)]
        size: Decimal,
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        commission: Decimal,
        #[arg(long, default_value = "pending")]
        status: SaleStatus,
        #[arg(long)]
        notes: Option<String>,
    },
    Status { id: String, status: SaleStatus },
    Update {
        id: String,
        #[arg(long)]
        customer: Option<String>,
        #[arg(long)]
        amount: Option<Decimal>,
        #[arg(long)]
        commission: Option<Decimal>,
        #[arg(long)]
        notes: Option<String>,
    },
    Delete { id: String },
}

impl Command {
    /// Name used in the generic failure message.
    fn action(&self) -> &'static str {
        match self {
            Command::Calculate { save: true, .. } => "Saving sale",
            Command::Calculate { .. } => "Calculation",
            Command::Batch { .. } => "Batch",
            Command::Settings { .. } => "Saving settings",
            Command::History { action } => match action {
                HistoryAction::List { .. } => "Loading sales",
                HistoryAction::Add { .. } => "Saving sale",
                HistoryAction::Status { .. } | HistoryAction::Update { .. } => "Updating sale",
                HistoryAction::Delete { .. } => "Deleting sale",
            },
            Command::Stats => "Loading stats",
            Command::Export { .. } => "Export",
            Command::Import { .. } => "Import",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config).into_diagnostic()?;
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }
    if cli.db_path.is_some() {
        config.storage.db_path = cli.db_path;
    }
    let category = cli.category.unwrap_or(config.product.default_category);

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .format_timestamp_secs()
    .init();

    let (sales, settings) = open_stores(&config)?;
    let service = CommissionService::new(sales, settings, Box::new(SystemClock));

    if let Err(e) = run(&cli.command, &service, &config, category).await {
        if e.is_storage() {
            let action = cli.command.action();
            log::error!("{action} failed: {e}");
            eprintln!("{action} failed. Please try again.");
            std::process::exit(1);
        }
        return Err(e).into_diagnostic();
    }

    Ok(())
}

fn open_stores(config: &Config) -> Result<(SaleHistoryStoreBox, SettingsStoreBox)> {
    if let Some(db_path) = &config.storage.db_path {
        #[cfg(feature = "storage-rocksdb")]
        {
            let store = RocksDBStore::open(db_path).into_diagnostic()?;
            return Ok((Box::new(store.clone()), Box::new(store)));
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to JSON file storage in {}.",
                config.storage.data_dir.display()
            );
            log::debug!("ignoring db path {}", db_path.display());
        }
    }

    let store = JsonFileStore::open(&config.storage.data_dir).into_diagnostic()?;
    Ok((Box::new(store.clone()), Box::new(store)))
}

async fn run(
    command: &Command,
    service: &CommissionService,
    config: &Config,
    category: Category,
) -> commishcrunch::error::Result<()> {
    match command {
        Command::Calculate {
            size,
            price,
            save,
            customer,
            json,
        } => {
            let rules = service.rules(category).await?;
            let price = price
                .clone()
                .unwrap_or_else(|| rules.price_per_unit.to_string());
            let Some(input) = SaleInput::parse(size, &price) else {
                if Decimal::from_str(price.trim()).is_err() {
                    println!("Enter a valid price per unit to see your commission.");
                } else {
                    println!(
                        "Enter a system size greater than zero (in {}) to see your commission.",
                        category.unit_label()
                    );
                }
                return Ok(());
            };
            let Some(calculation) = service.calculate_with(category, input, rules).await? else {
                return Ok(());
            };

            if *json {
                println!("{}", serde_json::to_string_pretty(&calculation.result)?);
            } else {
                print_calculation(&calculation);
            }
            if *save {
                let id = service
                    .save_calculation(&calculation, customer.as_deref())
                    .await?;
                println!("Saved sale {id}");
            }
        }

        Command::Batch { input } => {
            let rules = service.rules(category).await?;
            let file = File::open(input)?;
            let reader = QuoteReader::new(file);
            let stdout = io::stdout();
            let mut writer = SaleWriter::new(stdout.lock());

            for quote in reader.quotes() {
                let quote = match quote {
                    Ok(quote) => quote,
                    Err(e) => {
                        eprintln!("Error reading quote: {}", e);
                        continue;
                    }
                };
                let customer = quote.customer.clone().unwrap_or_default();
                let unit_price = quote.unit_price.unwrap_or(rules.price_per_unit);
                let input = SaleInput::new(quote.unit_count, unit_price);
                match service.calculate_with(category, input, rules.clone()).await {
                    Ok(Some(calculation)) => {
                        let row = QuoteResultRow::new(
                            customer,
                            quote.unit_count,
                            unit_price,
                            &calculation.result,
                        );
                        writer.write_quote_result(&row)?;
                    }
                    Ok(None) => {
                        eprintln!("Skipping quote '{}': size must be greater than zero", customer);
                    }
                    Err(e) if e.is_storage() => return Err(e),
                    Err(e) => {
                        eprintln!("Error calculating quote '{}': {}", customer, e);
                    }
                }
            }
        }

        Command::Settings { action } => match action {
            SettingsAction::Show => {
                let rules = service.rules(category).await?;
                println!("{}", serde_json::to_string_pretty(&rules)?);
            }
            SettingsAction::Set(args) => {
                let mut rules = service.rules(category).await?;
                if let Some(v) = args.price_per_unit {
                    rules.price_per_unit = v;
                }
                if let Some(v) = args.base_rate {
                    rules.base_rate_percent = v;
                }
                if let Some(v) = args.redline {
                    rules.redline_price = v;
                }
                if let Some(v) = args.mode {
                    rules.mode = v.into();
                }
                if let Some(v) = args.volume_bonus {
                    rules.volume_bonus.enabled = v;
                }
                if let Some(v) = args.volume_threshold {
                    rules.volume_bonus.monthly_threshold = v;
                }
                if let Some(v) = args.volume_bonus_rate {
                    rules.volume_bonus.bonus_rate_percent = v;
                }
                if let Some(v) = args.sharing {
                    rules.sharing.enabled = v;
                }
                if let Some(v) = args.shared_percent {
                    rules.sharing.shared_percent = v;
                }
                if let Some(v) = &args.sharing_reason {
                    rules.sharing.reason = v.clone();
                }
                service.save_rules(category, rules).await?;
                println!("Saved {category} settings");
            }
            SettingsAction::Reset => {
                service.reset_rules(category).await?;
                println!("Restored default {category} settings");
            }
        },

        Command::History { action } => run_history(action, service, category).await?,

        Command::Stats => {
            let stats = service.stats(category).await?;
            println!("Completed sales:  {}", stats.completed_sales);
            println!("Pending sales:    {}", stats.pending_sales);
            println!("Total commission: {}", currency(stats.total_commission));
            println!("Average sale:     {}", currency(stats.average_sale_amount));
        }

        Command::Export { output } => {
            let backup = BackupService::new(service, config.product.name.as_str());
            let path = backup.export_to_dir(category, output).await?;
            println!("Exported {category} data to {}", path.display());
        }

        Command::Import { file } => {
            let backup = BackupService::new(service, config.product.name.as_str());
            let bytes = std::fs::read(file)?;
            let import = backup.parse(&bytes, category)?;
            println!(
                "Importing {} sales{} into {category}",
                import.sales.len(),
                if import.settings.is_some() {
                    " and settings"
                } else {
                    ""
                }
            );
            let summary = backup.apply(import).await?;
            println!(
                "Imported {} sales. Settings {}.",
                summary.sales_imported,
                if summary.settings_imported {
                    "replaced"
                } else {
                    "unchanged"
                }
            );
        }
    }
    Ok(())
}

async fn run_history(
    action: &HistoryAction,
    service: &CommissionService,
    category: Category,
) -> commishcrunch::error::Result<()> {
    match action {
        HistoryAction::List {
            status,
            this_month,
            csv,
        } => {
            let filter = SaleFilter {
                status: *status,
                month: this_month.then(|| service.clock().current_month()),
            };
            let sales = service.list_sales(category, &filter).await?;
            if *csv {
                let stdout = io::stdout();
                let mut writer = SaleWriter::new(stdout.lock());
                writer.write_sales(&sales)?;
            } else if sales.is_empty() {
                println!("No {category} sales yet");
            } else {
                for sale in &sales {
                    println!(
                        "{}  {}  {:<9}  {:>12}  {:>10}  {}",
                        sale.id,
                        sale.date_created.format("%Y-%m-%d"),
                        sale.status.as_str(),
                        currency(sale.sale_amount),
                        currency(sale.commission),
                        sale.customer_name
                    );
                }
            }
        }
        HistoryAction::Add {
            customer,
            size,
            amount,
            commission,
            status,
            notes,
        } => {
            let id = service
                .add_sale(ManualSale {
                    category,
                    customer_name: customer.clone(),
                    unit_count: *size,
                    sale_amount: *amount,
                    commission: *commission,
                    status: *status,
                    notes: notes.clone(),
                })
                .await?;
            println!("Saved sale {id}");
        }
        HistoryAction::Status { id, status } => {
            let sale = service.set_status(&SaleId::from(id.as_str()), *status).await?;
            println!("Sale {} is now {}", sale.id, sale.status);
        }
        HistoryAction::Update {
            id,
            customer,
            amount,
            commission,
            notes,
        } => {
            let update = SaleUpdate {
                customer_name: customer.clone(),
                sale_amount: *amount,
                commission: *commission,
                notes: notes.clone(),
                ..Default::default()
            };
            if update.is_empty() {
                println!("Nothing to update");
                return Ok(());
            }
            let sale = service.update_sale(&SaleId::from(id.as_str()), update).await?;
            println!("Updated sale {}", sale.id);
        }
        HistoryAction::Delete { id } => {
            let id = SaleId::from(id.as_str());
            if service.get_sale(&id).await?.is_none() {
                return Err(CommissionError::NotFound(id.to_string()));
            }
            service.delete_sale(&id).await?;
            println!("Deleted sale {id}");
        }
    }
    Ok(())
}

fn print_calculation(calculation: &Calculation) {
    let result = &calculation.result;
    let rules = &calculation.rules;
    println!("Sale amount:  {}", currency(result.sale_amount));
    println!(
        "Price status: {}",
        rules.price_status(calculation.input.unit_price).label()
    );
    println!("Base rate:    {}", percent(rules.base_rate_percent));
    println!();
    for item in &result.breakdown {
        let sign = match item.kind {
            LineItemKind::Penalty | LineItemKind::Shared => "-",
            LineItemKind::Base | LineItemKind::Bonus => "",
        };
        println!("  {:<40} {sign}{}", item.label, currency(item.amount));
    }
    println!();
    if result.gross_commission != result.total_commission {
        println!("Gross commission: {}", currency(result.gross_commission));
    }
    println!("Your commission:  {}", currency(result.total_commission));
}
