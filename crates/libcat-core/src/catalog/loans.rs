//! Loan ledger
//!
//! A loan moves `absent -> outstanding` on borrow and `outstanding ->
//! closed` on return; closed loans are never reopened. Both transitions
//! touch the loan and the book's stock in the same transaction.

use rusqlite::{params, OptionalExtension};
use tracing::info;

use super::books::{find_book, read_stock};
use super::cards::card_exists;
use super::{now_millis, Catalog};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{BookId, BorrowHistory, CardId, HistoryItem, Loan, OUTSTANDING};
use crate::schema::{LockMode, CARD_TABLE};
use crate::storage::TxMode;

impl Catalog {
    /// Lend one copy of a book to a card holder
    pub fn borrow(&self, card_id: CardId, book_id: BookId) -> CatalogResult<Loan> {
        let exclusive = self.gateway().lock_hint(LockMode::Exclusive);
        let shared = self.gateway().lock_hint(LockMode::Shared);

        let loan = self
            .gateway()
            .transaction(TxMode::ReadWrite, "borrow", |tx| {
                let stock = read_stock(tx, book_id, exclusive)?;
                if !card_exists(tx, card_id, shared)? {
                    return Err(CatalogError::NotFound {
                        entity: CARD_TABLE,
                        id: card_id,
                    });
                }
                if stock <= 0 {
                    return Err(CatalogError::InsufficientStock {
                        book_id,
                        stock,
                        delta: -1,
                    });
                }

                let (outstanding, newest): (i64, Option<i64>) = tx.query_row(
                    &format!(
                        "SELECT COUNT(CASE WHEN return_time = ?3 THEN 1 END), MAX(borrow_time) \
                         FROM borrow WHERE card_id = ?1 AND book_id = ?2{}",
                        shared
                    ),
                    params![card_id, book_id, OUTSTANDING],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;
                if outstanding > 0 {
                    return Err(CatalogError::DuplicateLoan { card_id, book_id });
                }

                // Keep (card, book, borrow_time) unique when the clock has not moved on
                let now = now_millis();
                let borrow_time = match newest {
                    Some(latest) if latest >= now => latest + 1,
                    _ => now,
                };

                tx.execute(
                    "UPDATE book SET stock = stock - 1 WHERE book_id = ?1",
                    [book_id],
                )?;
                tx.execute(
                    "INSERT INTO borrow (card_id, book_id, borrow_time, return_time) \
                     VALUES (?1, ?2, ?3, ?4)",
                    params![card_id, book_id, borrow_time, OUTSTANDING],
                )?;

                Ok(Loan {
                    card_id,
                    book_id,
                    borrow_time,
                    return_time: OUTSTANDING,
                })
            })?;

        info!("Card {} borrowed book {}", card_id, book_id);
        Ok(loan)
    }

    /// Close the outstanding loan of a book on a card
    pub fn return_book(&self, card_id: CardId, book_id: BookId) -> CatalogResult<Loan> {
        let shared = self.gateway().lock_hint(LockMode::Shared);

        let loan = self
            .gateway()
            .transaction(TxMode::ReadWrite, "return_book", |tx| {
                let borrow_time: i64 = tx
                    .query_row(
                        &format!(
                            "SELECT borrow_time FROM borrow \
                             WHERE card_id = ?1 AND book_id = ?2 AND return_time = ?3{}",
                            shared
                        ),
                        params![card_id, book_id, OUTSTANDING],
                        |row| row.get(0),
                    )
                    .optional()?
                    .ok_or(CatalogError::NotFoundOrAlreadyReturned { card_id, book_id })?;

                let return_time = now_millis().max(borrow_time);

                tx.execute(
                    "UPDATE borrow SET return_time = ?1 \
                     WHERE card_id = ?2 AND book_id = ?3 AND borrow_time = ?4",
                    params![return_time, card_id, book_id, borrow_time],
                )?;
                let restocked = tx.execute(
                    "UPDATE book SET stock = stock + 1 WHERE book_id = ?1",
                    [book_id],
                )?;
                if restocked == 0 {
                    return Err(CatalogError::BookNotFound { book_id });
                }

                Ok(Loan {
                    card_id,
                    book_id,
                    borrow_time,
                    return_time,
                })
            })?;

        info!("Card {} returned book {}", card_id, book_id);
        Ok(loan)
    }

    /// Every loan made on a card, joined with its book
    ///
    /// Ordered by borrow time, then book identity.
    pub fn show_borrow_history(&self, card_id: CardId) -> CatalogResult<BorrowHistory> {
        let shared = self.gateway().lock_hint(LockMode::Shared);

        self.gateway()
            .transaction(TxMode::ReadOnly, "show_borrow_history", |tx| {
                if !card_exists(tx, card_id, shared)? {
                    return Err(CatalogError::NotFound {
                        entity: CARD_TABLE,
                        id: card_id,
                    });
                }

                let loans = {
                    let mut stmt = tx.prepare(
                        "SELECT card_id, book_id, borrow_time, return_time FROM borrow \
                         WHERE card_id = ?1 ORDER BY borrow_time, book_id",
                    )?;
                    let rows = stmt.query_map([card_id], |row| {
                        Ok(Loan {
                            card_id: row.get(0)?,
                            book_id: row.get(1)?,
                            borrow_time: row.get(2)?,
                            return_time: row.get(3)?,
                        })
                    })?;
                    rows.collect::<Result<Vec<_>, _>>()?
                };

                let mut items = Vec::with_capacity(loans.len());
                for loan in &loans {
                    let book = find_book(tx, loan.book_id, shared)?.ok_or(
                        CatalogError::BookNotFound {
                            book_id: loan.book_id,
                        },
                    )?;
                    items.push(HistoryItem::from_parts(loan, book));
                }

                Ok(BorrowHistory {
                    count: items.len(),
                    items,
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::error::ErrorKind;
    use crate::query::BookQuery;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::TempDir;

    fn stock_of(catalog: &Catalog, book_id: BookId) -> i64 {
        catalog
            .query_books(&BookQuery::new())
            .unwrap()
            .results
            .into_iter()
            .find(|b| b.book_id == book_id)
            .map(|b| b.stock)
            .unwrap()
    }

    #[test]
    fn test_borrow_and_return() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = open_catalog(&temp_dir);
        let card_id = catalog.register_card(&sample_card("Ada")).unwrap();
        let book_id = catalog.register_book(&sample_book("Loanable", 2)).unwrap();

        let loan = catalog.borrow(card_id, book_id).unwrap();
        assert!(loan.is_outstanding());
        assert!(loan.borrow_time > 0);
        assert_eq!(stock_of(&catalog, book_id), 1);

        let returned = catalog.return_book(card_id, book_id).unwrap();
        assert!(!returned.is_outstanding());
        assert_eq!(returned.borrow_time, loan.borrow_time);
        assert!(returned.return_time >= returned.borrow_time);
        assert_eq!(stock_of(&catalog, book_id), 2);
    }

    #[test]
    fn test_borrow_failures() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = open_catalog(&temp_dir);
        let card_id = catalog.register_card(&sample_card("Ada")).unwrap();
        let empty = catalog.register_book(&sample_book("Empty", 0)).unwrap();
        let book_id = catalog.register_book(&sample_book("Full", 5)).unwrap();

        let err = catalog.borrow(card_id, 999).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { entity: "book", .. }));

        let err = catalog.borrow(999, book_id).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { entity: "card", .. }));

        let err = catalog.borrow(card_id, empty).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        catalog.borrow(card_id, book_id).unwrap();
        let err = catalog.borrow(card_id, book_id).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateLoan { .. }));

        // Failed attempts left stock untouched
        assert_eq!(stock_of(&catalog, book_id), 4);
    }

    #[test]
    fn test_return_without_loan() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = open_catalog(&temp_dir);
        let card_id = catalog.register_card(&sample_card("Ada")).unwrap();
        let book_id = catalog.register_book(&sample_book("Shelved", 1)).unwrap();

        let err = catalog.return_book(card_id, book_id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFoundOrAlreadyReturned);

        catalog.borrow(card_id, book_id).unwrap();
        catalog.return_book(card_id, book_id).unwrap();
        let err = catalog.return_book(card_id, book_id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFoundOrAlreadyReturned);
        assert_eq!(stock_of(&catalog, book_id), 1);
    }

    #[test]
    fn test_reborrow_creates_new_loan() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = open_catalog(&temp_dir);
        let card_id = catalog.register_card(&sample_card("Ada")).unwrap();
        let book_id = catalog.register_book(&sample_book("Favourite", 1)).unwrap();

        let first = catalog.borrow(card_id, book_id).unwrap();
        catalog.return_book(card_id, book_id).unwrap();
        let second = catalog.borrow(card_id, book_id).unwrap();

        assert!(second.borrow_time > first.borrow_time);
        let history = catalog.show_borrow_history(card_id).unwrap();
        assert_eq!(history.count, 2);
        assert!(!history.items[0].is_outstanding());
        assert!(history.items[1].is_outstanding());
    }

    #[test]
    fn test_remove_book_blocked_until_returned() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = open_catalog(&temp_dir);
        let card_id = catalog.register_card(&sample_card("Ada")).unwrap();
        let book_id = catalog.register_book(&sample_book("Popular", 1)).unwrap();

        catalog.borrow(card_id, book_id).unwrap();
        let err = catalog.remove_book(book_id).unwrap_err();
        assert!(matches!(err, CatalogError::BookOnLoan { .. }));

        catalog.return_book(card_id, book_id).unwrap();
        catalog.remove_book(book_id).unwrap();

        // Closed loans were removed with the book
        assert_eq!(catalog.show_borrow_history(card_id).unwrap().count, 0);
    }

    #[test]
    fn test_history() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = open_catalog(&temp_dir);
        let card_id = catalog.register_card(&sample_card("Ada")).unwrap();
        let other = catalog.register_card(&sample_card("Bob")).unwrap();
        let first = catalog.register_book(&sample_book("First", 1)).unwrap();
        let second = catalog.register_book(&sample_book("Second", 1)).unwrap();

        catalog.borrow(card_id, first).unwrap();
        catalog.borrow(card_id, second).unwrap();
        catalog.return_book(card_id, first).unwrap();

        let history = catalog.show_borrow_history(card_id).unwrap();
        assert_eq!(history.count, 2);
        assert!(history.items[0].borrow_time <= history.items[1].borrow_time);
        let titles: Vec<&str> = history.items.iter().map(|i| i.title.as_str()).collect();
        assert!(titles.contains(&"First") && titles.contains(&"Second"));

        assert_eq!(catalog.show_borrow_history(other).unwrap().count, 0);

        let err = catalog.show_borrow_history(999).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_stock_tracks_outstanding_loans() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = open_catalog(&temp_dir);
        let book_id = catalog.register_book(&sample_book("Counted", 3)).unwrap();
        let cards: Vec<CardId> = ["A", "B", "C", "D"]
            .iter()
            .map(|name| catalog.register_card(&sample_card(name)).unwrap())
            .collect();

        let mut initial = 3;
        let mut outstanding = 0;
        let steps: [(usize, bool); 8] = [
            (0, true),
            (1, true),
            (2, true),
            (3, true),
            (1, false),
            (3, true),
            (0, false),
            (0, false),
        ];
        for (card, borrowing) in steps {
            let result = if borrowing {
                catalog.borrow(cards[card], book_id).map(|_| 1)
            } else {
                catalog.return_book(cards[card], book_id).map(|_| -1)
            };
            if let Ok(change) = result {
                outstanding += change;
            }
            let stock = stock_of(&catalog, book_id);
            assert!(stock >= 0);
            assert_eq!(stock, initial - outstanding);
        }

        catalog.adjust_stock(book_id, 2).unwrap();
        initial += 2;
        assert_eq!(stock_of(&catalog, book_id), initial - outstanding);
    }

    #[test]
    fn test_concurrent_borrow_of_last_copy() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = Arc::new(open_catalog(&temp_dir));
        let first = catalog.register_card(&sample_card("First")).unwrap();
        let second = catalog.register_card(&sample_card("Second")).unwrap();
        let book_id = catalog.register_book(&sample_book("Last Copy", 1)).unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = [first, second]
            .into_iter()
            .map(|card_id| {
                let catalog = Arc::clone(&catalog);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    catalog.borrow(card_id, book_id)
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 1);
        let failure = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert_eq!(failure.kind(), ErrorKind::InsufficientStock);
        assert_eq!(stock_of(&catalog, book_id), 0);
    }

    #[test]
    fn test_concurrent_borrow_same_pair() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = Arc::new(open_catalog(&temp_dir));
        let card_id = catalog.register_card(&sample_card("Eager")).unwrap();
        let book_id = catalog.register_book(&sample_book("Plenty", 10)).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let catalog = Arc::clone(&catalog);
                thread::spawn(move || catalog.borrow(card_id, book_id))
            })
            .collect();
        let succeeded = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|r| r.is_ok())
            .count();

        assert_eq!(succeeded, 1);
        assert_eq!(stock_of(&catalog, book_id), 9);
    }
}
