//! Schema layer
//!
//! Entity descriptors and the compiler that turns them into table
//! definitions.
//!
//! ## Architecture
//!
//! - **Descriptors**: structured column and constraint specs, built once per entity
//! - **Compiler**: pure descriptor → `CREATE TABLE` translation, per dialect
//!
//! Bootstrap in [`crate::catalog`] executes the compiled statements.

pub mod compiler;
pub mod descriptor;
pub mod dialect;
pub mod entities;

pub use compiler::{compile_schema, compile_table};
pub use descriptor::{
    ColumnType, Decimal, Entity, EntityDescriptor, FieldDescriptor, FloatWidth, ForeignKey,
    IntWidth, ReferentialAction,
};
pub use dialect::{Dialect, LockMode};
pub use entities::{catalog_entities, BOOK_TABLE, CARD_TABLE, LOAN_TABLE};
