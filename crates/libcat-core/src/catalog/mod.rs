//! Consistency engine
//!
//! The `Catalog` owns the three ledgers (books, cards, loans) and exposes
//! one method per life-cycle event. Every method that reads before it
//! writes runs inside a single storage transaction, so the stock and loan
//! invariants hold under concurrent callers without any in-process lock.
//!
//! ## Usage
//!
//! ```ignore
//! let catalog = Catalog::open(&config)?;  // creates missing tables
//!
//! let book_id = catalog.register_book(&new_book)?;
//! let card_id = catalog.register_card(&new_card)?;
//! let loan = catalog.borrow(card_id, book_id)?;
//! catalog.return_book(card_id, book_id)?;
//! ```
//!
//! `Catalog` is `Send + Sync`; share one behind an `Arc`.

mod bootstrap;
mod books;
mod cards;
mod loans;

pub use bootstrap::install_schema;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::CatalogResult;
use crate::schema::Dialect;
use crate::storage::Gateway;

/// Handle to an opened catalog database
#[derive(Debug)]
pub struct Catalog {
    gateway: Gateway,
}

impl Catalog {
    /// Open the catalog, creating any missing tables
    ///
    /// The whole schema is compiled before anything executes; a malformed
    /// descriptor fails here with no table created.
    pub fn open(config: &Config) -> CatalogResult<Self> {
        let gateway = Gateway::open(config)?;
        let catalog = Self { gateway };
        catalog.bootstrap()?;

        info!("Catalog opened at {:?}", catalog.gateway.path());
        Ok(catalog)
    }

    /// Release the catalog
    ///
    /// Connections are per call, so there is nothing left to flush.
    pub fn close(self) {
        debug!("Catalog closed at {:?}", self.gateway.path());
    }

    pub fn dialect(&self) -> Dialect {
        self.gateway.dialect()
    }

    pub(crate) fn gateway(&self) -> &Gateway {
        &self.gateway
    }
}

/// Current wall-clock time as Unix epoch milliseconds
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::query::BookQuery;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_tables() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = open_catalog(&temp_dir);

        let conn = catalog.gateway().connect().unwrap();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(tables, vec!["book", "borrow", "card"]);
        assert_eq!(catalog.dialect(), Dialect::Sqlite);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let temp_dir = TempDir::new().unwrap();

        let catalog = open_catalog(&temp_dir);
        catalog.register_book(&sample_book("Persistence", 1)).unwrap();
        catalog.close();

        let catalog = open_catalog(&temp_dir);
        let result = catalog.query_books(&BookQuery::new()).unwrap();
        assert_eq!(result.count, 1);
        assert_eq!(result.results[0].title, "Persistence");
    }

    #[test]
    fn test_catalog_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Catalog>();
    }
}
