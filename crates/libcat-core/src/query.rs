//! Book search
//!
//! A [`BookQuery`] is a set of optional filters plus an optional sort. It
//! compiles to a list of [`Predicate`]s joined with `AND` and an `ORDER BY`
//! that always ends with `book_id ASC`, so repeated searches over unchanged
//! data return rows in the same order.
//!
//! User input never reaches the statement text: every value is bound as a
//! parameter and `LIKE` patterns escape their wildcards.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::models::Price;

/// Sortable book columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookColumn {
    BookId,
    Category,
    Title,
    Press,
    PublishYear,
    Author,
    Price,
    Stock,
}

impl BookColumn {
    pub fn as_sql(&self) -> &'static str {
        match self {
            BookColumn::BookId => "book_id",
            BookColumn::Category => "category",
            BookColumn::Title => "title",
            BookColumn::Press => "press",
            BookColumn::PublishYear => "publish_year",
            BookColumn::Author => "author",
            BookColumn::Price => "price",
            BookColumn::Stock => "stock",
        }
    }
}

impl fmt::Display for BookColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for BookColumn {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "book_id" => Ok(BookColumn::BookId),
            "category" => Ok(BookColumn::Category),
            "title" => Ok(BookColumn::Title),
            "press" => Ok(BookColumn::Press),
            "publish_year" => Ok(BookColumn::PublishYear),
            "author" => Ok(BookColumn::Author),
            "price" => Ok(BookColumn::Price),
            "stock" => Ok(BookColumn::Stock),
            other => Err(CatalogError::InvalidSort(format!(
                "unknown column '{}'",
                other
            ))),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ASC" | "asc" => Ok(SortOrder::Asc),
            "DESC" | "desc" => Ok(SortOrder::Desc),
            other => Err(CatalogError::InvalidSort(format!(
                "sort order must be ASC or DESC, got '{}'",
                other
            ))),
        }
    }
}

/// Comparison applied by a predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Substring match
    Like,
    Ge,
    Le,
}

/// One `column <op> ?` condition with its bound value
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: BookColumn,
    pub op: Operator,
    pub value: Value,
}

impl Predicate {
    pub fn new(column: BookColumn, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            column,
            op,
            value: value.into(),
        }
    }

    /// Substring match with `%`, `_` and `\` in `needle` taken literally
    pub fn contains(column: BookColumn, needle: &str) -> Self {
        Self::new(column, Operator::Like, format!("%{}%", escape_like(needle)))
    }

    fn to_sql(&self) -> String {
        let column = self.column.as_sql();
        match self.op {
            Operator::Like => format!("{} LIKE ? ESCAPE '\\'", column),
            Operator::Ge => format!("{} >= ?", column),
            Operator::Le => format!("{} <= ?", column),
        }
    }
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Filters and ordering for a book search
///
/// Every filter is optional; an empty query matches all books.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookQuery {
    pub category: Option<String>,
    pub title: Option<String>,
    pub press: Option<String>,
    pub author: Option<String>,
    pub min_publish_year: Option<i32>,
    pub max_publish_year: Option<i32>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    pub sort_by: Option<BookColumn>,
    pub sort_order: Option<SortOrder>,
}

impl BookQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_press(mut self, press: impl Into<String>) -> Self {
        self.press = Some(press.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_publish_years(mut self, min: Option<i32>, max: Option<i32>) -> Self {
        self.min_publish_year = min;
        self.max_publish_year = max;
        self
    }

    pub fn with_prices(mut self, min: Option<Price>, max: Option<Price>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn sorted_by(mut self, column: BookColumn, order: SortOrder) -> Self {
        self.sort_by = Some(column);
        self.sort_order = Some(order);
        self
    }

    /// Conditions in a fixed column order
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();

        if let Some(category) = &self.category {
            predicates.push(Predicate::contains(BookColumn::Category, category));
        }
        if let Some(title) = &self.title {
            predicates.push(Predicate::contains(BookColumn::Title, title));
        }
        if let Some(press) = &self.press {
            predicates.push(Predicate::contains(BookColumn::Press, press));
        }
        if let Some(year) = self.min_publish_year {
            predicates.push(Predicate::new(BookColumn::PublishYear, Operator::Ge, year));
        }
        if let Some(year) = self.max_publish_year {
            predicates.push(Predicate::new(BookColumn::PublishYear, Operator::Le, year));
        }
        if let Some(author) = &self.author {
            predicates.push(Predicate::contains(BookColumn::Author, author));
        }
        if let Some(price) = self.min_price {
            predicates.push(Predicate::new(BookColumn::Price, Operator::Ge, price.as_f64()));
        }
        if let Some(price) = self.max_price {
            predicates.push(Predicate::new(BookColumn::Price, Operator::Le, price.as_f64()));
        }

        predicates
    }

    /// `ORDER BY` clause, always ending with `book_id ASC`
    ///
    /// A direction without a column has nothing to apply to and is ignored.
    pub fn order_by(&self) -> String {
        match self.sort_by {
            Some(column) => format!(
                "ORDER BY {} {}, book_id ASC",
                column.as_sql(),
                self.sort_order.unwrap_or_default().as_sql()
            ),
            None => "ORDER BY book_id ASC".to_string(),
        }
    }

    /// Build the full statement selecting `columns` from `table`
    pub fn to_sql(&self, table: &str, columns: &str) -> (String, Vec<Value>) {
        let order_by = self.order_by();
        let predicates = self.predicates();

        let mut sql = format!("SELECT {} FROM {}", columns, table);
        if !predicates.is_empty() {
            let conditions: Vec<String> = predicates.iter().map(Predicate::to_sql).collect();
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push(' ');
        sql.push_str(&order_by);

        let params = predicates.into_iter().map(|p| p.value).collect();
        (sql, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_orders_by_identity() {
        let (sql, params) = BookQuery::new().to_sql("book", "*");

        assert_eq!(sql, "SELECT * FROM book ORDER BY book_id ASC");
        assert!(params.is_empty());
    }

    #[test]
    fn test_predicates_are_parameterised() {
        let query = BookQuery::new()
            .with_title("Rust")
            .with_publish_years(Some(2000), None)
            .with_prices(None, Some(Price::from_cents(4550)));

        let (sql, params) = query.to_sql("book", "*");

        assert_eq!(
            sql,
            "SELECT * FROM book WHERE title LIKE ? ESCAPE '\\' AND publish_year >= ? \
             AND price <= ? ORDER BY book_id ASC"
        );
        assert_eq!(
            params,
            vec![
                Value::Text("%Rust%".to_string()),
                Value::Integer(2000),
                Value::Real(45.5),
            ]
        );
    }

    #[test]
    fn test_like_wildcards_escaped() {
        let predicate = Predicate::contains(BookColumn::Author, "100%_a\\b");
        assert_eq!(predicate.value, Value::Text("%100\\%\\_a\\\\b%".to_string()));
    }

    #[test]
    fn test_sort_appends_identity_tie_break() {
        let query = BookQuery::new().sorted_by(BookColumn::Price, SortOrder::Desc);
        assert_eq!(query.order_by(), "ORDER BY price DESC, book_id ASC");

        let query = BookQuery {
            sort_by: Some(BookColumn::Stock),
            ..BookQuery::default()
        };
        assert_eq!(query.order_by(), "ORDER BY stock ASC, book_id ASC");

        let query = BookQuery::new().sorted_by(BookColumn::BookId, SortOrder::Desc);
        assert_eq!(query.order_by(), "ORDER BY book_id DESC, book_id ASC");
    }

    #[test]
    fn test_invalid_sort() {
        assert!(matches!(
            "sideways".parse::<SortOrder>(),
            Err(CatalogError::InvalidSort(_))
        ));
        assert!(matches!(
            "isbn".parse::<BookColumn>(),
            Err(CatalogError::InvalidSort(_))
        ));
        assert_eq!("desc".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert_eq!(
            "publish_year".parse::<BookColumn>().unwrap(),
            BookColumn::PublishYear
        );

        let query = BookQuery {
            sort_order: Some(SortOrder::Desc),
            ..BookQuery::default()
        };
        assert_eq!(query.order_by(), "ORDER BY book_id ASC");
    }
}
