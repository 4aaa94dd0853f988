//! Output formatting for CLI commands
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag), the full result envelope
//! - Quiet mode for scripting (--quiet flag), identities only

use anyhow::{anyhow, Result};
use serde::Serialize;

use libcat_core::{ApiResult, BookQueryResult, BorrowHistory, Card, CardList, Loan};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a result envelope and turn a failure into an error
    ///
    /// JSON mode prints the envelope as is; otherwise `render` prints the
    /// payload of a successful result.
    pub fn finish<T: Serialize>(
        &self,
        result: &ApiResult<T>,
        render: impl FnOnce(&Self, &T),
    ) -> Result<()> {
        if self.is_json() {
            println!("{}", serde_json::to_string_pretty(result)?);
        } else if let Some(payload) = result.payload.as_ref().filter(|_| result.ok) {
            render(self, payload);
        }

        if result.ok {
            Ok(())
        } else {
            Err(anyhow!("{}", result.message))
        }
    }

    /// Print a newly assigned identity
    pub fn print_created(&self, entity: &str, id: i64) {
        if self.is_quiet() {
            println!("{}", id);
        } else {
            println!("✓ Created {} {}", entity, id);
        }
    }

    /// Print a list of books
    pub fn print_books(&self, result: &BookQueryResult) {
        if self.is_quiet() {
            for book in &result.results {
                println!("{}", book.book_id);
            }
            return;
        }

        if result.results.is_empty() {
            println!("No books found.");
            return;
        }
        println!(
            "{:>6} | {:<30} | {:<18} | {:<16} | {:>4} | {:>8} | {:>5}",
            "ID", "Title", "Author", "Category", "Year", "Price", "Stock"
        );
        for book in &result.results {
            println!(
                "{:>6} | {:<30} | {:<18} | {:<16} | {:>4} | {:>8} | {:>5}",
                book.book_id,
                truncate(&book.title, 30),
                truncate(&book.author, 18),
                truncate(&book.category, 16),
                book.publish_year,
                book.price,
                book.stock
            );
        }
        println!("\n{} book(s)", result.count);
    }

    /// Print a single card
    pub fn print_card(&self, card: &Card) {
        if self.is_quiet() {
            println!("{}", card.card_id);
            return;
        }
        println!("ID:         {}", card.card_id);
        println!("Name:       {}", card.name);
        println!("Department: {}", card.department);
        println!("Type:       {}", card_type_label(card));
    }

    /// Print a list of cards
    pub fn print_cards(&self, list: &CardList) {
        if self.is_quiet() {
            for card in &list.cards {
                println!("{}", card.card_id);
            }
            return;
        }

        if list.cards.is_empty() {
            println!("No cards found.");
            return;
        }
        for card in &list.cards {
            println!(
                "{:>6} | {:<24} | {:<20} | {}",
                card.card_id,
                truncate(&card.name, 24),
                truncate(&card.department, 20),
                card_type_label(card)
            );
        }
        println!("\n{} card(s)", list.count);
    }

    /// Print a borrow or return
    pub fn print_loan(&self, loan: &Loan) {
        if self.is_quiet() {
            println!("{}", loan.borrow_time);
            return;
        }
        if loan.is_outstanding() {
            println!(
                "✓ Card {} borrowed book {} at {}",
                loan.card_id,
                loan.book_id,
                format_millis(loan.borrow_time)
            );
        } else {
            println!(
                "✓ Card {} returned book {} at {}",
                loan.card_id,
                loan.book_id,
                format_millis(loan.return_time)
            );
        }
    }

    /// Print the loan history of a card
    pub fn print_history(&self, history: &BorrowHistory) {
        if self.is_quiet() {
            for item in &history.items {
                println!("{}", item.book_id);
            }
            return;
        }

        if history.items.is_empty() {
            println!("No loans on record.");
            return;
        }
        for item in &history.items {
            let returned = if item.is_outstanding() {
                "on loan".to_string()
            } else {
                format_millis(item.return_time)
            };
            println!(
                "{:>6} | {:<30} | {} | {}",
                item.book_id,
                truncate(&item.title, 30),
                format_millis(item.borrow_time),
                returned
            );
        }
        println!("\n{} loan(s)", history.count);
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"ok": true, "message": message, "payload": null})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }
}

fn card_type_label(card: &Card) -> &'static str {
    match card.card_type {
        libcat_core::CardType::Teacher => "teacher",
        libcat_core::CardType::Student => "student",
    }
}

/// Render epoch milliseconds as local-independent UTC text
fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
