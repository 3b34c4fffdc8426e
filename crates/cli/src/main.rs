use std::error::Error;

use clap::{Parser, Subcommand};
use ledger::{Ledger, SqlWalletStore, TransferSide, Wallet, WalletRepository};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use serde::Serialize;
use uuid::Uuid;

mod settings;

#[derive(Parser, Debug)]
#[command(name = "walletctl")]
#[command(about = "Inspect and maintain persisted wallets")]
struct Cli {
    /// Optional settings file path (TOML, without extension).
    #[arg(long)]
    config: Option<String>,

    /// Database connection string; overrides the settings file.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending migrations and list the applied ones.
    Migrate,
    /// Show one wallet.
    Show {
        wallet_id: Uuid,
        /// Include income records, expense records and transfers.
        #[arg(long)]
        full: bool,
    },
    /// List the wallets of a user.
    List {
        #[arg(long)]
        user: String,
    },
    /// Delete a wallet and everything recorded against it.
    Delete { wallet_id: Uuid },
}

#[derive(Serialize)]
struct WalletView {
    id: String,
    user_id: String,
    name: String,
    wallet_type: &'static str,
    balance: String,
    version: i64,
    created_at: String,
    updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    entries: Option<Vec<EntryView>>,
}

#[derive(Serialize)]
struct EntryView {
    id: String,
    kind: &'static str,
    amount: String,
    date: String,
    description: String,
}

impl WalletView {
    fn new(wallet: &Wallet) -> Self {
        let entries = wallet.is_fully_loaded().then(|| entries(wallet));
        Self {
            id: wallet.id.to_string(),
            user_id: wallet.user_id.clone(),
            name: wallet.name.clone(),
            wallet_type: wallet.wallet_type.as_str(),
            balance: wallet.balance().to_string(),
            version: wallet.version(),
            created_at: wallet.created_at.to_rfc3339(),
            updated_at: wallet.updated_at.to_rfc3339(),
            entries,
        }
    }
}

fn entries(wallet: &Wallet) -> Vec<EntryView> {
    let income = wallet.income_records().unwrap_or_default().iter().map(|r| EntryView {
        id: r.id.to_string(),
        kind: "income",
        amount: r.amount.to_string(),
        date: r.date.to_rfc3339(),
        description: r.description.clone(),
    });
    let expenses = wallet.expense_records().unwrap_or_default().iter().map(|r| EntryView {
        id: r.id.to_string(),
        kind: "expense",
        amount: r.amount.to_string(),
        date: r.date.to_rfc3339(),
        description: r.description.clone(),
    });
    let transfers = wallet.transfers().unwrap_or_default().iter().map(|t| EntryView {
        id: t.id.to_string(),
        kind: match t.side_of(wallet.id) {
            Some(TransferSide::Incoming) => "transfer in",
            _ => "transfer out",
        },
        amount: t.amount.to_string(),
        date: t.date.to_rfc3339(),
        description: t.description.clone(),
    });

    let mut all: Vec<_> = income.chain(expenses).chain(transfers).collect();
    all.sort_by(|a, b| b.date.cmp(&a.date));
    all
}

fn print_text(view: &WalletView) {
    println!("{} ({})", view.name, view.id);
    println!("  owner:   {}", view.user_id);
    println!("  type:    {}", view.wallet_type);
    println!("  balance: {}", view.balance);
    println!("  version: {}", view.version);
    println!("  updated: {}", view.updated_at);
    if let Some(entries) = &view.entries {
        if entries.is_empty() {
            println!("  no entries");
        }
        for entry in entries {
            println!(
                "  {}  {:<12} {:>14}  {}",
                entry.date, entry.kind, entry.amount, entry.description
            );
        }
    }
}

fn print_views(views: &[WalletView], json: bool) -> Result<(), Box<dyn Error + Send + Sync>> {
    if json {
        println!("{}", serde_json::to_string_pretty(views)?);
    } else {
        views.iter().for_each(print_text);
    }
    Ok(())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(format!(
            "walletctl={level},ledger={level}",
            level = settings.app.level
        ))
        .init();

    let url = cli
        .database_url
        .clone()
        .unwrap_or_else(|| settings.database.url());
    let db = connect_db(&url).await?;

    if let Command::Migrate = cli.command {
        for migration in Migrator::get_applied_migrations(&db).await? {
            println!("applied: {}", migration.name());
        }
        return Ok(());
    }

    let ledger: Ledger<SqlWalletStore> = Ledger::builder()
        .database(db)
        .policies(settings.reconcile)
        .build()
        .await?;
    tracing::debug!("reconcile policies: {:?}", ledger.store().policies());

    match cli.command {
        Command::Migrate => {}
        Command::Show { wallet_id, full } => {
            let wallet = if full {
                ledger.find_by_id_with_transactions(wallet_id).await?
            } else {
                ledger.find_by_id(wallet_id).await?
            };
            let Some(wallet) = wallet else {
                eprintln!("wallet not found: {wallet_id}");
                std::process::exit(1);
            };
            print_views(&[WalletView::new(&wallet)], cli.json)?;
        }
        Command::List { user } => {
            let wallets = ledger.find_by_user_id(&user).await?;
            if wallets.is_empty() && !cli.json {
                println!("no wallets for user: {user}");
            }
            let views: Vec<_> = wallets.iter().map(WalletView::new).collect();
            print_views(&views, cli.json)?;
        }
        Command::Delete { wallet_id } => {
            ledger.delete(wallet_id).await?;
            println!("deleted wallet: {wallet_id}");
        }
    }

    Ok(())
}
