//! Table descriptions for the three persisted entities
//!
//! `borrow` references both other tables, so callers compile
//! [`catalog_entities`] in the order returned.

use std::sync::OnceLock;

use super::descriptor::{
    ColumnType, Entity, EntityDescriptor, FieldDescriptor, ForeignKey, ReferentialAction,
};
use crate::models::{Book, Card, Loan};

pub const BOOK_TABLE: &str = "book";
pub const CARD_TABLE: &str = "card";
pub const LOAN_TABLE: &str = "borrow";

impl Entity for Book {
    fn descriptor() -> &'static EntityDescriptor {
        static DESCRIPTOR: OnceLock<EntityDescriptor> = OnceLock::new();
        DESCRIPTOR.get_or_init(|| {
            EntityDescriptor::new(BOOK_TABLE)
                .field(
                    FieldDescriptor::new("book_id", ColumnType::int())
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .field(grouped_text("category", "book_unique"))
                .field(grouped_text("title", "book_unique"))
                .field(grouped_text("press", "book_unique"))
                .field(
                    FieldDescriptor::new("publish_year", ColumnType::int())
                        .not_null()
                        .unique_group("book_unique"),
                )
                .field(grouped_text("author", "book_unique"))
                .field(
                    FieldDescriptor::new("price", ColumnType::decimal(7, 2))
                        .not_null()
                        .default_literal("0.00")
                        .check("price >= 0"),
                )
                .field(
                    FieldDescriptor::new("stock", ColumnType::int())
                        .not_null()
                        .default_literal("0")
                        .check("stock >= 0"),
                )
        })
    }
}

impl Entity for Card {
    fn descriptor() -> &'static EntityDescriptor {
        static DESCRIPTOR: OnceLock<EntityDescriptor> = OnceLock::new();
        DESCRIPTOR.get_or_init(|| {
            EntityDescriptor::new(CARD_TABLE)
                .field(
                    FieldDescriptor::new("card_id", ColumnType::int())
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .field(grouped_text("name", "card_unique"))
                .field(grouped_text("department", "card_unique"))
                .field(
                    FieldDescriptor::new("type", ColumnType::fixed_char(1))
                        .not_null()
                        .unique_group("card_unique")
                        .check("type IN ('T', 'S')"),
                )
        })
    }
}

impl Entity for Loan {
    fn descriptor() -> &'static EntityDescriptor {
        static DESCRIPTOR: OnceLock<EntityDescriptor> = OnceLock::new();
        DESCRIPTOR.get_or_init(|| {
            EntityDescriptor::new(LOAN_TABLE)
                .field(
                    FieldDescriptor::new("card_id", ColumnType::int())
                        .not_null()
                        .primary_key()
                        .references(cascading("card.card_id")),
                )
                .field(
                    FieldDescriptor::new("book_id", ColumnType::int())
                        .not_null()
                        .primary_key()
                        .references(cascading("book.book_id")),
                )
                .field(
                    FieldDescriptor::new("borrow_time", ColumnType::bigint())
                        .not_null()
                        .primary_key(),
                )
                .field(
                    FieldDescriptor::new("return_time", ColumnType::bigint())
                        .not_null()
                        .default_literal("0"),
                )
        })
    }
}

/// Descriptors in dependency order: book, card, then borrow
pub fn catalog_entities() -> [&'static EntityDescriptor; 3] {
    [Book::descriptor(), Card::descriptor(), Loan::descriptor()]
}

fn grouped_text(name: &str, group: &str) -> FieldDescriptor {
    FieldDescriptor::new(name, ColumnType::text(63))
        .not_null()
        .unique_group(group)
}

fn cascading(target: &str) -> ForeignKey {
    ForeignKey::new(target)
        .on_update(ReferentialAction::Cascade)
        .on_delete(ReferentialAction::Cascade)
}
