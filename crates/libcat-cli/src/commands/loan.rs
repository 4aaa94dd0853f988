//! Loan command handlers

use anyhow::Result;

use libcat_core::requests::LoanRequest;
use libcat_core::{BookId, CardId, Library};

use crate::output::Output;

fn loan_request(card_id: CardId, book_id: BookId) -> LoanRequest {
    LoanRequest {
        card_id: Some(card_id),
        book_id: Some(book_id),
    }
}

pub fn borrow(library: &Library, card_id: CardId, book_id: BookId, output: &Output) -> Result<()> {
    let result = library.borrow(loan_request(card_id, book_id));
    output.finish(&result, |out, loan| out.print_loan(loan))
}

pub fn give_back(
    library: &Library,
    card_id: CardId,
    book_id: BookId,
    output: &Output,
) -> Result<()> {
    let result = library.return_book(loan_request(card_id, book_id));
    output.finish(&result, |out, loan| out.print_loan(loan))
}

pub fn history(library: &Library, card_id: CardId, output: &Output) -> Result<()> {
    let result = library.show_borrow_history(card_id);
    output.finish(&result, |out, history| out.print_history(history))
}
