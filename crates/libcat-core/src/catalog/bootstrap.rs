//! Table creation and full reset

use rusqlite::Connection;
use tracing::{info, warn};

use super::Catalog;
use crate::error::CatalogResult;
use crate::schema::{
    catalog_entities, compile_schema, Dialect, EntityDescriptor, BOOK_TABLE, CARD_TABLE,
    LOAN_TABLE,
};
use crate::storage::TxMode;

/// Drop order: dependents before the tables they reference
const DROP_ORDER: [&str; 3] = [LOAN_TABLE, BOOK_TABLE, CARD_TABLE];

/// Compile `entities` and execute the result on `conn`
///
/// Nothing executes unless every descriptor compiles. Returns the number
/// of statements run.
pub fn install_schema(
    conn: &Connection,
    entities: &[&EntityDescriptor],
    dialect: Dialect,
) -> CatalogResult<usize> {
    let statements = compile_schema(entities, dialect)?;
    for statement in &statements {
        conn.execute_batch(statement)?;
    }
    Ok(statements.len())
}

impl Catalog {
    /// Create any missing catalog tables
    pub(super) fn bootstrap(&self) -> CatalogResult<()> {
        let dialect = self.gateway().dialect();
        self.gateway()
            .transaction(TxMode::ReadWrite, "bootstrap", |tx| {
                install_schema(tx, &catalog_entities(), dialect)
            })?;
        Ok(())
    }

    /// Drop every catalog table and recreate it empty
    ///
    /// Runs as one transaction: if recreation fails the old tables and
    /// their rows are kept.
    pub fn reset_database(&self) -> CatalogResult<()> {
        let dialect = self.gateway().dialect();
        let result = self
            .gateway()
            .transaction(TxMode::ReadWrite, "reset_database", |tx| {
                for table in DROP_ORDER {
                    tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", table))?;
                }
                install_schema(tx, &catalog_entities(), dialect)
            });

        match result {
            Ok(created) => {
                info!("Catalog reset ({} tables recreated)", created);
                Ok(())
            }
            Err(e) => {
                warn!("Catalog reset failed: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::error::CatalogError;
    use crate::query::BookQuery;
    use crate::schema::{ColumnType, FieldDescriptor};
    use tempfile::TempDir;

    fn table_count(conn: &Connection) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
            [],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_compile_fault_creates_nothing() {
        let conn = Connection::open_in_memory().unwrap();
        let valid = EntityDescriptor::new("shelf")
            .field(FieldDescriptor::new("shelf_id", ColumnType::int()).primary_key());
        let broken = EntityDescriptor::new("label")
            .field(FieldDescriptor::new("text", ColumnType::text(0)).not_null());

        let err = install_schema(&conn, &[&valid, &broken], Dialect::Sqlite).unwrap_err();

        assert!(matches!(err, CatalogError::Configuration { .. }));
        assert_eq!(table_count(&conn), 0);
    }

    #[test]
    fn test_install_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        assert_eq!(install_schema(&conn, &catalog_entities(), Dialect::Sqlite).unwrap(), 3);
        assert_eq!(install_schema(&conn, &catalog_entities(), Dialect::Sqlite).unwrap(), 3);
        assert_eq!(table_count(&conn), 3);
    }

    #[test]
    fn test_reset_then_query_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = open_catalog(&temp_dir);

        let book_id = catalog.register_book(&sample_book("Gone", 2)).unwrap();
        let card_id = catalog.register_card(&sample_card("Ada")).unwrap();
        catalog.borrow(card_id, book_id).unwrap();

        catalog.reset_database().unwrap();

        let result = catalog.query_books(&BookQuery::new()).unwrap();
        assert_eq!(result.count, 0);
        assert!(result.results.is_empty());
        assert_eq!(catalog.list_cards().unwrap().count, 0);
    }

    #[test]
    fn test_reset_restarts_identities() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = open_catalog(&temp_dir);

        catalog.register_book(&sample_book("First", 1)).unwrap();
        catalog.reset_database().unwrap();

        let book_id = catalog.register_book(&sample_book("Again", 1)).unwrap();
        assert_eq!(book_id, 1);
    }
}
