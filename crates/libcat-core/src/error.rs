//! Catalog error handling
//!
//! Provides typed errors for schema compilation and catalog operations.
//! Business-rule violations are ordinary variants; only `Storage` wraps a
//! driver failure.

use thiserror::Error;

use crate::models::{BookId, CardId};

/// Errors that can occur during schema compilation or catalog operations
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Malformed entity descriptor; fatal during bootstrap
    #[error("Invalid schema for '{entity}.{field}': {reason}")]
    Configuration {
        entity: String,
        field: String,
        reason: String,
    },

    /// Referenced row does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Insert collided with a uniqueness group
    #[error("Duplicate {entity}: {details}")]
    DuplicateEntry {
        entity: &'static str,
        details: String,
    },

    /// An outstanding loan for this pair already exists
    #[error("Card {card_id} already has book {book_id} on loan")]
    DuplicateLoan { card_id: CardId, book_id: BookId },

    /// Stock would drop below zero
    #[error("Not enough stock for book {book_id}: have {stock}, requested change {delta}")]
    InsufficientStock {
        book_id: BookId,
        stock: i64,
        delta: i64,
    },

    /// Book still has outstanding loans
    #[error("Book {book_id} is on loan and cannot be removed")]
    BookOnLoan { book_id: BookId },

    /// Card still has outstanding loans
    #[error("Card {card_id} has not returned all books")]
    CardOnLoan { card_id: CardId },

    /// Unrecognised sort column or direction
    #[error("Invalid sort: {0}")]
    InvalidSort(String),

    /// Batch operation received no items
    #[error("No books supplied")]
    EmptyInput,

    /// No outstanding loan matches the return
    #[error("Card {card_id} has no outstanding loan of book {book_id}")]
    NotFoundOrAlreadyReturned { card_id: CardId, book_id: BookId },

    /// Loan history references a book that no longer exists
    #[error("Book {book_id} referenced by loan history not found")]
    BookNotFound { book_id: BookId },

    /// Request failed validation before reaching the engine
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// SQLite database error
    #[error("Database error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// Fieldless mirror of [`CatalogError`] for exhaustive matching at boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    NotFound,
    DuplicateEntry,
    DuplicateLoan,
    InsufficientStock,
    BookOnLoan,
    CardOnLoan,
    InvalidSort,
    EmptyInput,
    NotFoundOrAlreadyReturned,
    BookNotFound,
    InvalidRequest,
    Storage,
}

impl CatalogError {
    /// Create a configuration fault for a descriptor field
    pub fn configuration(
        entity: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CatalogError::Configuration {
            entity: entity.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Classify a driver error raised by an insert into `entity`
    ///
    /// Unique and primary-key violations become `DuplicateEntry`; anything
    /// else stays a storage fault.
    pub fn from_insert(error: rusqlite::Error, entity: &'static str) -> Self {
        if is_unique_violation(&error) {
            let details = match &error {
                rusqlite::Error::SqliteFailure(_, Some(msg)) => msg.clone(),
                other => other.to_string(),
            };
            CatalogError::DuplicateEntry { entity, details }
        } else {
            CatalogError::Storage(error)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Configuration { .. } => ErrorKind::Configuration,
            CatalogError::NotFound { .. } => ErrorKind::NotFound,
            CatalogError::DuplicateEntry { .. } => ErrorKind::DuplicateEntry,
            CatalogError::DuplicateLoan { .. } => ErrorKind::DuplicateLoan,
            CatalogError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CatalogError::BookOnLoan { .. } => ErrorKind::BookOnLoan,
            CatalogError::CardOnLoan { .. } => ErrorKind::CardOnLoan,
            CatalogError::InvalidSort(_) => ErrorKind::InvalidSort,
            CatalogError::EmptyInput => ErrorKind::EmptyInput,
            CatalogError::NotFoundOrAlreadyReturned { .. } => ErrorKind::NotFoundOrAlreadyReturned,
            CatalogError::BookNotFound { .. } => ErrorKind::BookNotFound,
            CatalogError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            CatalogError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Check if this error came from the storage layer or schema rather than
    /// from a business rule
    pub fn is_fault(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Storage | ErrorKind::Configuration | ErrorKind::BookNotFound
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            CatalogError::Storage(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::DatabaseBusy =>
            {
                Some("The catalog is busy. Retry, or raise busy_timeout_ms in the configuration.")
            }
            CatalogError::Configuration { .. } => {
                Some("Fix the entity descriptor; no tables were created or changed.")
            }
            CatalogError::BookOnLoan { .. } | CatalogError::CardOnLoan { .. } => {
                Some("Return all outstanding loans first.")
            }
            _ => None,
        }
    }
}

fn is_unique_violation(error: &rusqlite::Error) -> bool {
    match error {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;
