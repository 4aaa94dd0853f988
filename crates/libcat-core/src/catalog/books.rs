//! Inventory ledger

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use super::Catalog;
use crate::error::{CatalogError, CatalogResult};
use crate::models::{Book, BookId, BookQueryResult, NewBook, Price, OUTSTANDING};
use crate::query::BookQuery;
use crate::schema::{LockMode, BOOK_TABLE};
use crate::storage::TxMode;

pub(crate) const BOOK_COLUMNS: &str =
    "book_id, category, title, press, publish_year, author, price, stock";

const INSERT_BOOK: &str = "INSERT INTO book (category, title, press, publish_year, author, price, stock) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

pub(crate) fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        book_id: row.get(0)?,
        category: row.get(1)?,
        title: row.get(2)?,
        press: row.get(3)?,
        publish_year: row.get(4)?,
        author: row.get(5)?,
        price: row.get(6)?,
        stock: row.get(7)?,
    })
}

fn check_price(price: Price) -> CatalogResult<()> {
    if price.is_negative() {
        return Err(CatalogError::InvalidRequest(format!(
            "price must not be negative, got {}",
            price
        )));
    }
    Ok(())
}

fn insert_book(conn: &Connection, book: &NewBook) -> CatalogResult<BookId> {
    check_price(book.price)?;
    if book.stock < 0 {
        return Err(CatalogError::InvalidRequest(format!(
            "stock must not be negative, got {}",
            book.stock
        )));
    }

    conn.execute(
        INSERT_BOOK,
        params![
            book.category,
            book.title,
            book.press,
            book.publish_year,
            book.author,
            book.price,
            book.stock,
        ],
    )
    .map_err(|e| CatalogError::from_insert(e, BOOK_TABLE))?;
    Ok(conn.last_insert_rowid())
}

/// Current stock of a book, `NotFound` if it does not exist
pub(crate) fn read_stock(conn: &Connection, book_id: BookId, lock_hint: &str) -> CatalogResult<i64> {
    conn.query_row(
        &format!("SELECT stock FROM book WHERE book_id = ?1{}", lock_hint),
        [book_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or(CatalogError::NotFound {
        entity: BOOK_TABLE,
        id: book_id,
    })
}

/// Read one book, `None` if it does not exist
pub(crate) fn find_book(
    conn: &Connection,
    book_id: BookId,
    lock_hint: &str,
) -> CatalogResult<Option<Book>> {
    let book = conn
        .query_row(
            &format!(
                "SELECT {} FROM book WHERE book_id = ?1{}",
                BOOK_COLUMNS, lock_hint
            ),
            [book_id],
            book_from_row,
        )
        .optional()?;
    Ok(book)
}

impl Catalog {
    /// Register a new book and return its identity
    pub fn register_book(&self, book: &NewBook) -> CatalogResult<BookId> {
        let conn = self.gateway().connect()?;
        let book_id = insert_book(&conn, book)?;

        info!("Registered book {} ({:?})", book_id, book.title);
        Ok(book_id)
    }

    /// Register several books in one transaction
    ///
    /// Either every book is stored or none is.
    pub fn bulk_register_books(&self, books: &[NewBook]) -> CatalogResult<Vec<BookId>> {
        if books.is_empty() {
            return Err(CatalogError::EmptyInput);
        }

        let ids = self
            .gateway()
            .transaction(TxMode::ReadWrite, "bulk_register_books", |tx| {
                books.iter().map(|book| insert_book(tx, book)).collect()
            })?;

        info!("Registered {} books", books.len());
        Ok(ids)
    }

    /// Change the stock of a book by `delta` and return the new stock
    pub fn adjust_stock(&self, book_id: BookId, delta: i64) -> CatalogResult<i64> {
        let hint = self.gateway().lock_hint(LockMode::Exclusive);

        let stock = self
            .gateway()
            .transaction(TxMode::ReadWrite, "adjust_stock", |tx| {
                let stock = read_stock(tx, book_id, hint)?;
                let updated = stock.saturating_add(delta);
                if updated < 0 {
                    return Err(CatalogError::InsufficientStock {
                        book_id,
                        stock,
                        delta,
                    });
                }

                tx.execute(
                    "UPDATE book SET stock = ?1 WHERE book_id = ?2",
                    params![updated, book_id],
                )?;
                Ok(updated)
            })?;

        info!("Adjusted stock of book {} by {} to {}", book_id, delta, stock);
        Ok(stock)
    }

    /// Delete a book that has no outstanding loans
    ///
    /// Its closed loan history goes with it.
    pub fn remove_book(&self, book_id: BookId) -> CatalogResult<()> {
        let hint = self.gateway().lock_hint(LockMode::Shared);

        self.gateway()
            .transaction(TxMode::ReadWrite, "remove_book", |tx| {
                let outstanding: i64 = tx.query_row(
                    &format!(
                        "SELECT COUNT(*) FROM borrow WHERE book_id = ?1 AND return_time = ?2{}",
                        hint
                    ),
                    params![book_id, OUTSTANDING],
                    |row| row.get(0),
                )?;
                if outstanding > 0 {
                    return Err(CatalogError::BookOnLoan { book_id });
                }

                let removed = tx.execute("DELETE FROM book WHERE book_id = ?1", [book_id])?;
                if removed == 0 {
                    return Err(CatalogError::NotFound {
                        entity: BOOK_TABLE,
                        id: book_id,
                    });
                }
                Ok(())
            })?;

        info!("Removed book {}", book_id);
        Ok(())
    }

    /// Overwrite the descriptive fields of a book
    ///
    /// `stock` is ignored. A collision with another book's identifying
    /// fields is reported as a storage error.
    pub fn update_book_info(&self, book: &Book) -> CatalogResult<()> {
        check_price(book.price)?;

        let conn = self.gateway().connect()?;
        let updated = conn.execute(
            "UPDATE book SET category = ?1, title = ?2, press = ?3, publish_year = ?4, \
             author = ?5, price = ?6 WHERE book_id = ?7",
            params![
                book.category,
                book.title,
                book.press,
                book.publish_year,
                book.author,
                book.price,
                book.book_id,
            ],
        )?;

        if updated == 0 {
            return Err(CatalogError::NotFound {
                entity: BOOK_TABLE,
                id: book.book_id,
            });
        }

        info!("Updated book {}", book.book_id);
        Ok(())
    }

    /// Search books
    pub fn query_books(&self, query: &BookQuery) -> CatalogResult<BookQueryResult> {
        let (sql, values) = query.to_sql(BOOK_TABLE, BOOK_COLUMNS);
        debug!("query_books: {}", sql);

        let conn = self.gateway().connect()?;
        let mut stmt = conn.prepare(&sql)?;
        let results = stmt
            .query_map(params_from_iter(values.iter()), book_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BookQueryResult {
            count: results.len(),
            results,
        })
    }
}
