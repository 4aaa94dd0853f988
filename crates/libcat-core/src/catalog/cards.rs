//! Membership ledger

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use super::Catalog;
use crate::error::{CatalogError, CatalogResult};
use crate::models::{Card, CardId, CardList, NewCard, OUTSTANDING};
use crate::schema::{LockMode, CARD_TABLE};
use crate::storage::TxMode;

const CARD_COLUMNS: &str = "card_id, name, department, type";

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<Card> {
    Ok(Card {
        card_id: row.get(0)?,
        name: row.get(1)?,
        department: row.get(2)?,
        card_type: row.get(3)?,
    })
}

pub(crate) fn card_exists(conn: &Connection, card_id: CardId, lock_hint: &str) -> CatalogResult<bool> {
    let found = conn
        .query_row(
            &format!("SELECT 1 FROM card WHERE card_id = ?1{}", lock_hint),
            [card_id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

impl Catalog {
    /// Register a new card and return its identity
    pub fn register_card(&self, card: &NewCard) -> CatalogResult<CardId> {
        let conn = self.gateway().connect()?;
        conn.execute(
            "INSERT INTO card (name, department, type) VALUES (?1, ?2, ?3)",
            params![card.name, card.department, card.card_type],
        )
        .map_err(|e| CatalogError::from_insert(e, CARD_TABLE))?;
        let card_id = conn.last_insert_rowid();

        info!("Registered card {} ({:?})", card_id, card.name);
        Ok(card_id)
    }

    /// Delete a card that has returned every book
    pub fn remove_card(&self, card_id: CardId) -> CatalogResult<()> {
        let hint = self.gateway().lock_hint(LockMode::Shared);

        self.gateway()
            .transaction(TxMode::ReadWrite, "remove_card", |tx| {
                let outstanding: i64 = tx.query_row(
                    &format!(
                        "SELECT COUNT(*) FROM borrow WHERE card_id = ?1 AND return_time = ?2{}",
                        hint
                    ),
                    params![card_id, OUTSTANDING],
                    |row| row.get(0),
                )?;
                if outstanding > 0 {
                    return Err(CatalogError::CardOnLoan { card_id });
                }

                let removed = tx.execute("DELETE FROM card WHERE card_id = ?1", [card_id])?;
                if removed == 0 {
                    return Err(CatalogError::NotFound {
                        entity: CARD_TABLE,
                        id: card_id,
                    });
                }
                Ok(())
            })?;

        info!("Removed card {}", card_id);
        Ok(())
    }

    pub fn query_card(&self, card_id: CardId) -> CatalogResult<Card> {
        let conn = self.gateway().connect()?;
        conn.query_row(
            &format!("SELECT {} FROM card WHERE card_id = ?1", CARD_COLUMNS),
            [card_id],
            card_from_row,
        )
        .optional()?
        .ok_or(CatalogError::NotFound {
            entity: CARD_TABLE,
            id: card_id,
        })
    }

    /// All cards in identity order
    pub fn list_cards(&self) -> CatalogResult<CardList> {
        let conn = self.gateway().connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM card ORDER BY card_id",
            CARD_COLUMNS
        ))?;
        let cards = stmt
            .query_map([], card_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CardList {
            count: cards.len(),
            cards,
        })
    }
}
