//! libcat core library
//!
//! Backend of a library catalog: books with stock counts, membership
//! cards, and the loans that connect them, kept in SQLite.
//!
//! # Architecture
//!
//! - **Schema**: entity descriptors compiled into `CREATE TABLE` statements
//! - **Catalog**: transactional operations that keep stock and loans consistent
//! - **Library**: the same operations behind an `{ok, message, payload}` envelope
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let catalog = Catalog::open(&config)?;
//!
//! let book_id = catalog.register_book(&new_book)?;
//! let card_id = catalog.register_card(&new_card)?;
//! catalog.borrow(card_id, book_id)?;
//! ```
//!
//! # Modules
//!
//! - `catalog`: the consistency engine (main entry point)
//! - `schema`: descriptors, dialects and the DDL compiler
//! - `storage`: SQLite connections and transactions
//! - `models`: books, cards, loans and result sets
//! - `query`: book search filters
//! - `requests`: unvalidated adapter input
//! - `api`: result envelope for adapters
//! - `config`: application configuration

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod requests;
pub mod schema;
pub mod storage;

pub use api::{ApiResult, Library};
pub use catalog::Catalog;
pub use config::Config;
pub use error::{CatalogError, CatalogResult, ErrorKind};
pub use models::{
    Book, BookId, BookQueryResult, BorrowHistory, Card, CardId, CardList, CardType, HistoryItem,
    Loan, LoanState, NewBook, NewCard, Price,
};
pub use query::{BookColumn, BookQuery, SortOrder};
pub use schema::{compile_schema, Dialect};
