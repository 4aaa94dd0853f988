//! libcat CLI
//!
//! Command-line interface for the library catalog: books, cards and loans.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use libcat_core::requests::BookQueryRequest;
use libcat_core::{BookId, CardId, Config, Dialect, Library, Price};

mod commands;
mod logging;
mod output;

use commands::book::BookFields;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "libcat")]
#[command(about = "libcat - library catalog with stock-tracked loans")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage books and stock
    Book {
        #[command(subcommand)]
        command: BookCommands,
    },
    /// Manage library cards
    Card {
        #[command(subcommand)]
        command: CardCommands,
    },
    /// Borrow and return books
    Loan {
        #[command(subcommand)]
        command: LoanCommands,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Args)]
struct BookArgs {
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    press: Option<String>,
    /// Publication year
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    author: Option<String>,
    /// Price, e.g. 12.50
    #[arg(long)]
    price: Option<Price>,
}

impl From<BookArgs> for BookFields {
    fn from(args: BookArgs) -> Self {
        BookFields {
            category: args.category,
            title: args.title,
            press: args.press,
            year: args.year,
            author: args.author,
            price: args.price,
        }
    }
}

#[derive(Subcommand)]
enum BookCommands {
    /// Register a new book
    #[command(alias = "add")]
    Create {
        #[command(flatten)]
        fields: BookArgs,
        /// Copies on hand
        #[arg(long, default_value_t = 0)]
        stock: i64,
    },
    /// Register books from a JSON array file (all or nothing)
    Import {
        /// Path to the JSON file
        file: PathBuf,
    },
    /// Change the stock of a book
    Stock {
        book_id: BookId,
        /// Add copies
        #[arg(long, conflicts_with = "dec")]
        inc: Option<i64>,
        /// Remove copies
        #[arg(long)]
        dec: Option<i64>,
    },
    /// Replace the descriptive fields of a book
    Update {
        book_id: BookId,
        #[command(flatten)]
        fields: BookArgs,
    },
    /// Remove a book with no outstanding loans
    #[command(alias = "rm")]
    Remove { book_id: BookId },
    /// Search books
    #[command(alias = "ls")]
    List {
        /// Category contains
        #[arg(long)]
        category: Option<String>,
        /// Title contains
        #[arg(long)]
        title: Option<String>,
        /// Press contains
        #[arg(long)]
        press: Option<String>,
        /// Author contains
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        min_year: Option<i32>,
        #[arg(long)]
        max_year: Option<i32>,
        #[arg(long)]
        min_price: Option<Price>,
        #[arg(long)]
        max_price: Option<Price>,
        /// Sort column (book_id, category, title, press, publish_year, author, price, stock)
        #[arg(long)]
        sort: Option<String>,
        /// Sort direction (ASC or DESC)
        #[arg(long)]
        order: Option<String>,
    },
}

#[derive(Subcommand)]
enum CardCommands {
    /// Register a new card
    #[command(alias = "add")]
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        department: String,
        /// Card type: T (teacher) or S (student)
        #[arg(long = "type")]
        card_type: String,
    },
    /// Show one card
    Show { card_id: CardId },
    /// List all cards
    #[command(alias = "ls")]
    List,
    /// Remove a card that has returned every book
    #[command(alias = "rm")]
    Remove { card_id: CardId },
}

#[derive(Subcommand)]
enum LoanCommands {
    /// Borrow a book
    Borrow { card_id: CardId, book_id: BookId },
    /// Return a borrowed book
    Return { card_id: CardId, book_id: BookId },
    /// Show the loan history of a card
    History { card_id: CardId },
}

#[derive(Subcommand)]
enum DbCommands {
    /// Drop and recreate all tables
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Print the table definitions
    Schema {
        #[arg(long, default_value = "sqlite")]
        dialect: Dialect,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, database_file, busy_timeout_ms, log_level, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Commands that don't need the catalog
    match cli.command {
        Commands::Config { command } => {
            return handle_config_command(command, config_path, &output);
        }
        Commands::Db {
            command: DbCommands::Schema { dialect },
        } => {
            return commands::db::schema(dialect, &output);
        }
        _ => {}
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    logging::init_logging(&config);

    let library = Library::open(&config).context("Failed to open catalog")?;

    let result = match cli.command {
        Commands::Book { command } => handle_book_command(command, &library, &output),
        Commands::Card { command } => handle_card_command(command, &library, &output),
        Commands::Loan { command } => handle_loan_command(command, &library, &output),
        Commands::Db {
            command: DbCommands::Reset { yes },
        } => commands::db::reset(&library, yes, &output),
        Commands::Db { .. } | Commands::Config { .. } => unreachable!(), // Handled above
    };

    library.close();
    result
}

fn handle_book_command(command: BookCommands, library: &Library, output: &Output) -> Result<()> {
    match command {
        BookCommands::Create { fields, stock } => {
            commands::book::create(library, fields.into(), stock, output)
        }
        BookCommands::Import { file } => commands::book::import(library, file, output),
        BookCommands::Stock { book_id, inc, dec } => {
            commands::book::stock(library, book_id, inc, dec, output)
        }
        BookCommands::Update { book_id, fields } => {
            commands::book::update(library, book_id, fields.into(), output)
        }
        BookCommands::Remove { book_id } => commands::book::remove(library, book_id, output),
        BookCommands::List {
            category,
            title,
            press,
            author,
            min_year,
            max_year,
            min_price,
            max_price,
            sort,
            order,
        } => {
            let request = BookQueryRequest {
                category,
                title,
                press,
                min_publish_year: min_year,
                max_publish_year: max_year,
                author,
                min_price,
                max_price,
                sort_by: sort,
                sort_order: order,
            };
            commands::book::list(library, request, output)
        }
    }
}

fn handle_card_command(command: CardCommands, library: &Library, output: &Output) -> Result<()> {
    match command {
        CardCommands::Create {
            name,
            department,
            card_type,
        } => commands::card::create(library, name, department, card_type, output),
        CardCommands::Show { card_id } => commands::card::show(library, card_id, output),
        CardCommands::List => commands::card::list(library, output),
        CardCommands::Remove { card_id } => commands::card::remove(library, card_id, output),
    }
}

fn handle_loan_command(command: LoanCommands, library: &Library, output: &Output) -> Result<()> {
    match command {
        LoanCommands::Borrow { card_id, book_id } => {
            commands::loan::borrow(library, card_id, book_id, output)
        }
        LoanCommands::Return { card_id, book_id } => {
            commands::loan::give_back(library, card_id, book_id, output)
        }
        LoanCommands::History { card_id } => commands::loan::history(library, card_id, output),
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}
