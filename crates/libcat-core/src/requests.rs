//! Incoming requests
//!
//! Wire shapes as an adapter receives them: every field optional, so a
//! missing value can be reported by name instead of failing to parse.
//! Each request converts into the typed value the engine accepts with
//! `TryFrom`; nothing reaches [`crate::catalog`] unvalidated.

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::models::{Book, BookId, CardId, CardType, NewBook, NewCard, Price};
use crate::query::{BookColumn, BookQuery, SortOrder};

fn required<T>(value: Option<T>, field: &str) -> Result<T, CatalogError> {
    value.ok_or_else(|| CatalogError::InvalidRequest(format!("missing required field: {}", field)))
}

fn non_negative(value: i64, field: &str) -> Result<i64, CatalogError> {
    if value < 0 {
        return Err(CatalogError::InvalidRequest(format!(
            "{} must not be negative, got {}",
            field, value
        )));
    }
    Ok(value)
}

/// Register one book
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookCreateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub press: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
}

impl TryFrom<BookCreateRequest> for NewBook {
    type Error = CatalogError;

    fn try_from(request: BookCreateRequest) -> Result<Self, Self::Error> {
        Ok(NewBook {
            category: required(request.category, "category")?,
            title: required(request.title, "title")?,
            press: required(request.press, "press")?,
            publish_year: required(request.publish_year, "publish_year")?,
            author: required(request.author, "author")?,
            price: required(request.price, "price")?,
            stock: non_negative(required(request.stock, "stock")?, "stock")?,
        })
    }
}

/// Replace the descriptive fields of an existing book
///
/// Stock is not part of the request; it only changes through stock
/// adjustments and loans.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_id: Option<BookId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub press: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
}

impl TryFrom<BookUpdateRequest> for Book {
    type Error = CatalogError;

    fn try_from(request: BookUpdateRequest) -> Result<Self, Self::Error> {
        Ok(Book {
            book_id: required(request.book_id, "book_id")?,
            category: required(request.category, "category")?,
            title: required(request.title, "title")?,
            press: required(request.press, "press")?,
            publish_year: required(request.publish_year, "publish_year")?,
            author: required(request.author, "author")?,
            price: required(request.price, "price")?,
            stock: 0,
        })
    }
}

/// Direction of a stock adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockOption {
    Inc,
    Dec,
}

/// Adjust the stock of one book
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_id: Option<BookId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option: Option<StockOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
}

/// Validated stock adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockChange {
    pub book_id: BookId,
    pub delta: i64,
}

impl TryFrom<StockUpdateRequest> for StockChange {
    type Error = CatalogError;

    fn try_from(request: StockUpdateRequest) -> Result<Self, Self::Error> {
        let book_id = required(request.book_id, "book_id")?;
        let option = required(request.option, "option")?;
        let amount = non_negative(required(request.delta, "delta")?, "delta")?;
        let delta = match option {
            StockOption::Inc => amount,
            StockOption::Dec => -amount,
        };
        Ok(StockChange { book_id, delta })
    }
}

/// Register one card
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardCreateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub card_type: Option<String>,
}

impl TryFrom<CardCreateRequest> for NewCard {
    type Error = CatalogError;

    fn try_from(request: CardCreateRequest) -> Result<Self, Self::Error> {
        Ok(NewCard {
            name: required(request.name, "name")?,
            department: required(request.department, "department")?,
            card_type: required(request.card_type, "type")?.parse::<CardType>()?,
        })
    }
}

/// Borrow or return one book on one card
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoanRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<CardId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_id: Option<BookId>,
}

impl LoanRequest {
    pub fn validate(self) -> Result<(CardId, BookId), CatalogError> {
        Ok((
            required(self.card_id, "card_id")?,
            required(self.book_id, "book_id")?,
        ))
    }
}

/// Search books; sort fields arrive as free text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookQueryRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub press: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_publish_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_publish_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
}

impl TryFrom<BookQueryRequest> for BookQuery {
    type Error = CatalogError;

    fn try_from(request: BookQueryRequest) -> Result<Self, Self::Error> {
        let sort_by = request
            .sort_by
            .as_deref()
            .map(str::parse::<BookColumn>)
            .transpose()?;
        let sort_order = request
            .sort_order
            .as_deref()
            .map(str::parse::<SortOrder>)
            .transpose()?;

        Ok(BookQuery {
            category: request.category,
            title: request.title,
            press: request.press,
            author: request.author,
            min_publish_year: request.min_publish_year,
            max_publish_year: request.max_publish_year,
            min_price: request.min_price,
            max_price: request.max_price,
            sort_by,
            sort_order,
        })
    }
}
