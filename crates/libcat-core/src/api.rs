//! Adapter-facing interface
//!
//! `Library` wraps a [`Catalog`] and answers every call with an
//! [`ApiResult`] envelope: `ok`, a human-readable `message`, and a payload
//! on success. The specific error kind is reduced to its message here;
//! callers that need to branch on it should use the `Catalog` directly.

use serde::Serialize;
use tracing::{error, warn};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::CatalogResult;
use crate::models::{
    Book, BookId, BookQueryResult, BorrowHistory, Card, CardId, CardList, Loan, NewBook, NewCard,
};
use crate::query::BookQuery;
use crate::requests::{
    BookCreateRequest, BookQueryRequest, BookUpdateRequest, CardCreateRequest, LoanRequest,
    StockChange, StockUpdateRequest,
};

/// Outcome envelope handed to adapters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResult<T> {
    pub ok: bool,
    pub message: String,
    pub payload: Option<T>,
}

impl<T> ApiResult<T> {
    pub fn success(payload: T) -> Self {
        Self {
            ok: true,
            message: "success".to_string(),
            payload: Some(payload),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            payload: None,
        }
    }

    /// Wrap an engine result, logging failures
    pub fn from_result(op: &str, result: CatalogResult<T>) -> Self {
        match result {
            Ok(payload) => Self::success(payload),
            Err(e) => {
                if e.is_fault() {
                    error!("{} failed: {}", op, e);
                } else {
                    warn!("{} rejected: {}", op, e);
                }
                Self::failure(e.to_string())
            }
        }
    }
}

/// Envelope-returning front of the catalog
#[derive(Debug)]
pub struct Library {
    catalog: Catalog,
}

impl Library {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn open(config: &Config) -> CatalogResult<Self> {
        Ok(Self::new(Catalog::open(config)?))
    }

    pub fn close(self) {
        self.catalog.close();
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    // ==================== Books ====================

    pub fn register_book(&self, request: BookCreateRequest) -> ApiResult<BookId> {
        let result = NewBook::try_from(request).and_then(|book| self.catalog.register_book(&book));
        ApiResult::from_result("register_book", result)
    }

    pub fn bulk_register_books(&self, requests: Vec<BookCreateRequest>) -> ApiResult<Vec<BookId>> {
        let result = requests
            .into_iter()
            .map(NewBook::try_from)
            .collect::<CatalogResult<Vec<_>>>()
            .and_then(|books| self.catalog.bulk_register_books(&books));
        ApiResult::from_result("bulk_register_books", result)
    }

    pub fn adjust_stock(&self, request: StockUpdateRequest) -> ApiResult<i64> {
        let result = StockChange::try_from(request)
            .and_then(|change| self.catalog.adjust_stock(change.book_id, change.delta));
        ApiResult::from_result("adjust_stock", result)
    }

    pub fn remove_book(&self, book_id: BookId) -> ApiResult<()> {
        ApiResult::from_result("remove_book", self.catalog.remove_book(book_id))
    }

    pub fn update_book_info(&self, request: BookUpdateRequest) -> ApiResult<()> {
        let result = Book::try_from(request).and_then(|book| self.catalog.update_book_info(&book));
        ApiResult::from_result("update_book_info", result)
    }

    pub fn query_books(&self, request: BookQueryRequest) -> ApiResult<BookQueryResult> {
        let result = BookQuery::try_from(request).and_then(|query| self.catalog.query_books(&query));
        ApiResult::from_result("query_books", result)
    }

    // ==================== Cards ====================

    pub fn register_card(&self, request: CardCreateRequest) -> ApiResult<CardId> {
        let result = NewCard::try_from(request).and_then(|card| self.catalog.register_card(&card));
        ApiResult::from_result("register_card", result)
    }

    pub fn remove_card(&self, card_id: CardId) -> ApiResult<()> {
        ApiResult::from_result("remove_card", self.catalog.remove_card(card_id))
    }

    pub fn query_card(&self, card_id: CardId) -> ApiResult<Card> {
        ApiResult::from_result("query_card", self.catalog.query_card(card_id))
    }

    pub fn list_cards(&self) -> ApiResult<CardList> {
        ApiResult::from_result("list_cards", self.catalog.list_cards())
    }

    // ==================== Loans ====================

    pub fn borrow(&self, request: LoanRequest) -> ApiResult<Loan> {
        let result = request
            .validate()
            .and_then(|(card_id, book_id)| self.catalog.borrow(card_id, book_id));
        ApiResult::from_result("borrow", result)
    }

    pub fn return_book(&self, request: LoanRequest) -> ApiResult<Loan> {
        let result = request
            .validate()
            .and_then(|(card_id, book_id)| self.catalog.return_book(card_id, book_id));
        ApiResult::from_result("return_book", result)
    }

    pub fn show_borrow_history(&self, card_id: CardId) -> ApiResult<BorrowHistory> {
        ApiResult::from_result(
            "show_borrow_history",
            self.catalog.show_borrow_history(card_id),
        )
    }

    // ==================== Maintenance ====================

    pub fn reset_database(&self) -> ApiResult<()> {
        ApiResult::from_result("reset_database", self.catalog.reset_database())
    }
}
