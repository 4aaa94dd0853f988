//! Book command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};

use libcat_core::requests::{
    BookCreateRequest, BookQueryRequest, BookUpdateRequest, StockOption, StockUpdateRequest,
};
use libcat_core::{BookId, Library, Price};

use crate::output::Output;

/// Fields shared by create and update
pub struct BookFields {
    pub category: Option<String>,
    pub title: Option<String>,
    pub press: Option<String>,
    pub year: Option<i32>,
    pub author: Option<String>,
    pub price: Option<Price>,
}

/// Register a single book
pub fn create(library: &Library, fields: BookFields, stock: i64, output: &Output) -> Result<()> {
    let request = BookCreateRequest {
        category: fields.category,
        title: fields.title,
        press: fields.press,
        publish_year: fields.year,
        author: fields.author,
        price: fields.price,
        stock: Some(stock),
    };

    let result = library.register_book(request);
    output.finish(&result, |out, id| out.print_created("book", *id))
}

/// Register every book in a JSON file, all or nothing
pub fn import(library: &Library, file: PathBuf, output: &Output) -> Result<()> {
    let content = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read book file: {:?}", file))?;
    let requests: Vec<BookCreateRequest> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse book file: {:?}", file))?;

    let result = library.bulk_register_books(requests);
    output.finish(&result, |out, ids| {
        if out.is_quiet() {
            for id in ids {
                println!("{}", id);
            }
        } else {
            out.success(&format!("Imported {} book(s)", ids.len()));
        }
    })
}

/// Increase or decrease stock
pub fn stock(
    library: &Library,
    book_id: BookId,
    inc: Option<i64>,
    dec: Option<i64>,
    output: &Output,
) -> Result<()> {
    let (option, delta) = match (inc, dec) {
        (Some(n), _) => (Some(StockOption::Inc), Some(n)),
        (None, Some(n)) => (Some(StockOption::Dec), Some(n)),
        (None, None) => (None, None),
    };
    let request = StockUpdateRequest {
        book_id: Some(book_id),
        option,
        delta,
    };

    let result = library.adjust_stock(request);
    output.finish(&result, |out, stock| {
        if out.is_quiet() {
            println!("{}", stock);
        } else {
            out.success(&format!("Book {} stock is now {}", book_id, stock));
        }
    })
}

/// Replace the descriptive fields of a book
pub fn update(library: &Library, book_id: BookId, fields: BookFields, output: &Output) -> Result<()> {
    let request = BookUpdateRequest {
        book_id: Some(book_id),
        category: fields.category,
        title: fields.title,
        press: fields.press,
        publish_year: fields.year,
        author: fields.author,
        price: fields.price,
    };

    let result = library.update_book_info(request);
    output.finish(&result, |out, _| out.success(&format!("Updated book {}", book_id)))
}

/// Remove a book with no outstanding loans
pub fn remove(library: &Library, book_id: BookId, output: &Output) -> Result<()> {
    let result = library.remove_book(book_id);
    output.finish(&result, |out, _| out.success(&format!("Removed book {}", book_id)))
}

/// Search books
pub fn list(library: &Library, request: BookQueryRequest, output: &Output) -> Result<()> {
    let result = library.query_books(request);
    output.finish(&result, |out, books| out.print_books(books))
}
