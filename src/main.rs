// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// Use library instead of local modules
use expense_tracker::{AddExpenseForm, ExpenseStore, SqliteSettings, DEFAULT_KEY, VERSION};

/// Track expenses in a local settings database.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// SQLite file holding the settings table.
    #[arg(long, env = "EXPENSES_DB", default_value = "expenses.db")]
    db: PathBuf,

    /// Settings key the expense list is stored under.
    #[arg(long, default_value = DEFAULT_KEY)]
    key: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the interactive terminal UI (default).
    Ui,
    /// Print every expense with its position.
    List,
    /// Append an expense.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = expense_tracker::DEFAULT_CATEGORY)]
        category: String,
        /// Integer amount, parsed the same way as the form does.
        #[arg(long, allow_hyphen_values = true)]
        amount: String,
    },
    /// Remove the expenses at the given positions.
    Remove {
        #[arg(required = true)]
        indices: Vec<usize>,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so they stay out of the terminal UI's way
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::debug!(version = VERSION, db = ?args.db, key = %args.key, "starting");

    let settings = SqliteSettings::open(&args.db)
        .with_context(|| format!("Failed to open {:?}", args.db))?;
    let mut store = ExpenseStore::with_key(settings, args.key);

    match args.command.unwrap_or(Command::Ui) {
        Command::Ui => run_ui_mode(store)?,
        Command::List => {
            if store.is_empty() {
                println!("No expenses yet.");
            }
            for (i, record) in store.items().iter().enumerate() {
                println!(
                    "{:>3}  {:<30} {:<10} ${}",
                    i, record.name, record.category, record.amount
                );
            }
            println!("Total: ${}", store.total());
        }
        Command::Add {
            name,
            category,
            amount,
        } => {
            let form = AddExpenseForm {
                name,
                category,
                amount,
                ..AddExpenseForm::new()
            };
            let record = form.submit()?;
            let id = record.id;
            store.append(record)?;
            println!("Added expense {}", id);
        }
        Command::Remove { indices } => {
            let removed = store.remove_at(indices)?;
            for record in removed {
                println!("Removed {} (${})", record.name, record.amount);
            }
        }
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(store: ExpenseStore<SqliteSettings>) -> Result<()> {
    let mut app = ui::App::new(store);
    ui::run_ui(&mut app)
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_store: ExpenseStore<SqliteSettings>) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the list/add/remove commands.");
    std::process::exit(1);
}
