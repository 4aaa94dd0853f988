//! Card command handlers

use anyhow::Result;

use libcat_core::requests::CardCreateRequest;
use libcat_core::{CardId, Library};

use crate::output::Output;

/// Register a card
pub fn create(
    library: &Library,
    name: String,
    department: String,
    card_type: String,
    output: &Output,
) -> Result<()> {
    let request = CardCreateRequest {
        name: Some(name),
        department: Some(department),
        card_type: Some(card_type),
    };

    let result = library.register_card(request);
    output.finish(&result, |out, id| out.print_created("card", *id))
}

pub fn show(library: &Library, card_id: CardId, output: &Output) -> Result<()> {
    let result = library.query_card(card_id);
    output.finish(&result, |out, card| out.print_card(card))
}

pub fn list(library: &Library, output: &Output) -> Result<()> {
    let result = library.list_cards();
    output.finish(&result, |out, cards| out.print_cards(cards))
}

/// Remove a card that has returned every book
pub fn remove(library: &Library, card_id: CardId, output: &Output) -> Result<()> {
    let result = library.remove_card(card_id);
    output.finish(&result, |out, _| out.success(&format!("Removed card {}", card_id)))
}
