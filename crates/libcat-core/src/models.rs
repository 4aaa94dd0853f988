//! Data models for the catalog
//!
//! Defines the core data structures: Book, Card and Loan, plus the result
//! shapes returned by queries. Identities are assigned by storage.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CatalogError;

/// Book identity
pub type BookId = i64;

/// Card identity
pub type CardId = i64;

/// Sentinel stored in `return_time` while a loan is outstanding
pub const OUTSTANDING: i64 = 0;

/// Fixed-point price with two decimals, held as whole cents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(i64);

impl Price {
    pub const ZERO: Price = Price(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Round a decimal amount to the nearest cent
    pub fn from_f64(amount: f64) -> Result<Self, CatalogError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(CatalogError::InvalidRequest(format!(
                "price must be a non-negative number, got {}",
                amount
            )));
        }
        Ok(Self((amount * 100.0).round() as i64))
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, cents / 100, cents % 100)
    }
}

impl FromStr for Price {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount: f64 = s
            .trim()
            .parse()
            .map_err(|_| CatalogError::InvalidRequest(format!("invalid price '{}'", s)))?;
        Self::from_f64(amount)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        Price::from_f64(amount).map_err(serde::de::Error::custom)
    }
}

impl ToSql for Price {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_f64()))
    }
}

impl FromSql for Price {
    // NUMERIC affinity stores whole amounts as integers. Stored rows are
    // taken as they are; validation happens on the way in.
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let amount = f64::column_result(value)?;
        if !amount.is_finite() {
            return Err(FromSqlError::InvalidType);
        }
        Ok(Self((amount * 100.0).round() as i64))
    }
}

/// A catalogued title with its stock count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Book {
    pub book_id: BookId,
    pub category: String,
    pub title: String,
    pub press: String,
    pub publish_year: i32,
    pub author: String,
    pub price: Price,
    pub stock: i64,
}

/// A book that has not been assigned an identity yet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewBook {
    pub category: String,
    pub title: String,
    pub press: String,
    pub publish_year: i32,
    pub author: String,
    pub price: Price,
    pub stock: i64,
}

impl NewBook {
    /// Attach the identity storage assigned
    pub fn with_id(self, book_id: BookId) -> Book {
        Book {
            book_id,
            category: self.category,
            title: self.title,
            press: self.press,
            publish_year: self.publish_year,
            author: self.author,
            price: self.price,
            stock: self.stock,
        }
    }
}

/// Membership card holder category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardType {
    #[serde(rename = "T")]
    Teacher,
    #[serde(rename = "S")]
    Student,
}

impl CardType {
    /// Single-character code stored in the `type` column
    pub fn code(&self) -> &'static str {
        match self {
            CardType::Teacher => "T",
            CardType::Student => "S",
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CardType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "T" | "t" | "teacher" => Ok(CardType::Teacher),
            "S" | "s" | "student" => Ok(CardType::Student),
            other => Err(CatalogError::InvalidRequest(format!(
                "card type must be 'T' or 'S', got '{}'",
                other
            ))),
        }
    }
}

impl ToSql for CardType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for CardType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_str()?;
        code.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// A library membership card
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Card {
    pub card_id: CardId,
    pub name: String,
    pub department: String,
    #[serde(rename = "type")]
    pub card_type: CardType,
}

/// A card that has not been assigned an identity yet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCard {
    pub name: String,
    pub department: String,
    #[serde(rename = "type")]
    pub card_type: CardType,
}

impl NewCard {
    pub fn with_id(self, card_id: CardId) -> Card {
        Card {
            card_id,
            name: self.name,
            department: self.department,
            card_type: self.card_type,
        }
    }
}

/// Where a loan is in its life cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanState {
    Outstanding,
    Closed,
}

/// One borrow record, identified by `(card_id, book_id, borrow_time)`
///
/// Times are Unix epoch milliseconds. `return_time` holds [`OUTSTANDING`]
/// until the copy comes back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Loan {
    pub card_id: CardId,
    pub book_id: BookId,
    pub borrow_time: i64,
    pub return_time: i64,
}

impl Loan {
    pub fn state(&self) -> LoanState {
        if self.return_time == OUTSTANDING {
            LoanState::Outstanding
        } else {
            LoanState::Closed
        }
    }

    pub fn is_outstanding(&self) -> bool {
        self.state() == LoanState::Outstanding
    }

    pub fn borrowed_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.borrow_time).single()
    }

    pub fn returned_at(&self) -> Option<DateTime<Utc>> {
        if self.is_outstanding() {
            None
        } else {
            Utc.timestamp_millis_opt(self.return_time).single()
        }
    }
}

/// A loan joined with the book it refers to
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistoryItem {
    pub card_id: CardId,
    pub book_id: BookId,
    pub category: String,
    pub title: String,
    pub press: String,
    pub publish_year: i32,
    pub author: String,
    pub price: Price,
    pub borrow_time: i64,
    pub return_time: i64,
}

impl HistoryItem {
    pub fn from_parts(loan: &Loan, book: Book) -> Self {
        Self {
            card_id: loan.card_id,
            book_id: book.book_id,
            category: book.category,
            title: book.title,
            press: book.press,
            publish_year: book.publish_year,
            author: book.author,
            price: book.price,
            borrow_time: loan.borrow_time,
            return_time: loan.return_time,
        }
    }

    pub fn is_outstanding(&self) -> bool {
        self.return_time == OUTSTANDING
    }
}

/// Loan history of one card
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BorrowHistory {
    pub count: usize,
    pub items: Vec<HistoryItem>,
}

/// Result of a book search
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BookQueryResult {
    pub count: usize,
    pub results: Vec<Book>,
}

/// All registered cards
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CardList {
    pub count: usize,
    pub cards: Vec<Card>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_rounds_to_cents() {
        assert_eq!(Price::from_f64(12.349).unwrap().cents(), 1235);
        assert_eq!(Price::from_f64(0.1 + 0.2).unwrap().cents(), 30);
        assert_eq!("19.90".parse::<Price>().unwrap(), Price::from_cents(1990));
    }

    #[test]
    fn test_price_rejects_negative() {
        assert!(Price::from_f64(-1.0).is_err());
        assert!(Price::from_f64(f64::NAN).is_err());
        assert!("abc".parse::<Price>().is_err());
    }

    #[test]
    fn test_price_display_and_json() {
        let price = Price::from_cents(705);
        assert_eq!(price.to_string(), "7.05");
        assert_eq!(Price::from_cents(-5).to_string(), "-0.05");
        assert_eq!(Price::from_cents(-1250).to_string(), "-12.50");
        assert_eq!(serde_json::to_string(&price).unwrap(), "7.05");

        let parsed: Price = serde_json::from_str("30").unwrap();
        assert_eq!(parsed, Price::from_cents(3000));
    }

    #[test]
    fn test_card_type_codes() {
        assert_eq!("T".parse::<CardType>().unwrap(), CardType::Teacher);
        assert_eq!("student".parse::<CardType>().unwrap(), CardType::Student);
        assert!("X".parse::<CardType>().is_err());

        let card = NewCard {
            name: "Ada".to_string(),
            department: "Math".to_string(),
            card_type: CardType::Student,
        }
        .with_id(3);
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["type"], "S");
        assert_eq!(json["card_id"], 3);
    }

    #[test]
    fn test_loan_state() {
        let mut loan = Loan {
            card_id: 1,
            book_id: 5,
            borrow_time: 1_700_000_000_000,
            return_time: OUTSTANDING,
        };
        assert_eq!(loan.state(), LoanState::Outstanding);
        assert!(loan.returned_at().is_none());
        assert!(loan.borrowed_at().is_some());

        loan.return_time = 1_700_000_360_000;
        assert_eq!(loan.state(), LoanState::Closed);
        assert!(loan.returned_at().is_some());
    }
}
