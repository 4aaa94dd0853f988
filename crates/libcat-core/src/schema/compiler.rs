//! Schema compiler
//!
//! Turns entity descriptors into `CREATE TABLE` statements. Compilation is
//! pure: nothing touches storage, and a fault in any descriptor fails the
//! whole batch.
//!
//! ## Statement layout
//!
//! Each column is written as `name TYPE [NOT NULL] [auto-increment] [UNIQUE]
//! [DEFAULT literal]`, followed by table constraints in this order:
//!
//! 1. `CONSTRAINT group UNIQUE(...)` per uniqueness group
//! 2. `PRIMARY KEY(...)`
//! 3. `CHECK(...)`
//! 4. `FOREIGN KEY (...) REFERENCES table(column) [ON UPDATE ..] [ON DELETE ..]`

use tracing::debug;

use super::descriptor::{ColumnType, EntityDescriptor, FieldDescriptor, FloatWidth, IntWidth};
use super::dialect::Dialect;
use crate::error::{CatalogError, CatalogResult};

const VARCHAR_MAX: i64 = 255;
const TEXT_MAX: i64 = 65_535;
const MEDIUMTEXT_MAX: i64 = 16_777_215;
const CHAR_MAX: i64 = 255;

/// Compile descriptors, in the order given, into table definitions
pub fn compile_schema(
    entities: &[&EntityDescriptor],
    dialect: Dialect,
) -> CatalogResult<Vec<String>> {
    let statements = entities
        .iter()
        .map(|entity| compile_table(entity, dialect))
        .collect::<CatalogResult<Vec<_>>>()?;
    debug!(
        "Compiled {} table definition(s) for {}",
        statements.len(),
        dialect
    );
    Ok(statements)
}

/// Compile one descriptor into a `CREATE TABLE IF NOT EXISTS` statement
pub fn compile_table(entity: &EntityDescriptor, dialect: Dialect) -> CatalogResult<String> {
    if entity.name.trim().is_empty() {
        return Err(CatalogError::configuration("", "", "entity name is empty"));
    }
    if entity.fields.is_empty() {
        return Err(fault(entity, "", "entity has no fields"));
    }

    let inline_key = inline_primary_key(entity, dialect)?;

    let mut columns = Vec::with_capacity(entity.fields.len());
    let mut unique_groups: Vec<(&str, Vec<&str>)> = Vec::new();
    let mut primary_key = Vec::new();
    let mut checks = Vec::new();
    let mut foreign_keys = Vec::new();

    for field in &entity.fields {
        columns.push(column_definition(entity, field, dialect, inline_key)?);

        if let Some(group) = &field.unique_group {
            if group.trim().is_empty() {
                return Err(fault(entity, &field.name, "empty unique group"));
            }
            match unique_groups
                .iter_mut()
                .find(|(name, _)| *name == group.as_str())
            {
                Some((_, members)) => members.push(field.name.as_str()),
                None => unique_groups.push((group.as_str(), vec![field.name.as_str()])),
            }
        }

        if field.primary_key && inline_key != Some(field.name.as_str()) {
            primary_key.push(field.name.as_str());
        }

        if let Some(expression) = &field.check {
            if expression.trim().is_empty() {
                return Err(fault(entity, &field.name, "empty check constraint"));
            }
            checks.push(format!("CHECK({})", expression));
        }

        if let Some(fk) = &field.foreign_key {
            foreign_keys.push(foreign_key_clause(entity, field, fk)?);
        }
    }

    let mut clauses = columns;
    for (group, members) in unique_groups {
        clauses.push(format!(
            "CONSTRAINT {} UNIQUE({})",
            group,
            members.join(", ")
        ));
    }
    if !primary_key.is_empty() {
        clauses.push(format!("PRIMARY KEY({})", primary_key.join(", ")));
    }
    clauses.extend(checks);
    clauses.extend(foreign_keys);

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({}){}",
        entity.name,
        clauses.join(", "),
        dialect.table_suffix()
    ))
}

/// SQL type for a field, before any constraint keywords
pub fn column_type_sql(entity: &EntityDescriptor, field: &FieldDescriptor) -> CatalogResult<String> {
    match &field.column_type {
        ColumnType::Text { size: None } => Ok(format!("VARCHAR({})", VARCHAR_MAX)),
        ColumnType::Text { size: Some(size) } => match *size {
            s if s <= 0 => Err(fault(entity, &field.name, "size must be greater than 0")),
            s if s <= VARCHAR_MAX => Ok(format!("VARCHAR({})", s)),
            s if s <= TEXT_MAX => Ok("TEXT".to_string()),
            s if s <= MEDIUMTEXT_MAX => Ok("MEDIUMTEXT".to_string()),
            _ => Ok("LONGTEXT".to_string()),
        },
        ColumnType::FixedChar { width } => {
            if *width <= 0 || *width > CHAR_MAX {
                Err(fault(
                    entity,
                    &field.name,
                    format!("char width must be in 1..={}", CHAR_MAX),
                ))
            } else {
                Ok(format!("CHAR({})", width))
            }
        }
        ColumnType::Integer { width, unsigned } => {
            let base = match width {
                IntWidth::Tiny => "TINYINT",
                IntWidth::Small => "SMALLINT",
                IntWidth::Int => "INT",
                IntWidth::Big => "BIGINT",
            };
            Ok(if *unsigned {
                format!("{} UNSIGNED", base)
            } else {
                base.to_string()
            })
        }
        ColumnType::Float {
            decimal: Some(decimal),
            ..
        } => {
            if decimal.precision <= 0 {
                return Err(fault(entity, &field.name, "precision must be greater than 0"));
            }
            if decimal.scale <= 0 {
                return Err(fault(entity, &field.name, "scale must be greater than 0"));
            }
            Ok(format!("DECIMAL({},{})", decimal.precision, decimal.scale))
        }
        ColumnType::Float {
            width: FloatWidth::Single,
            decimal: None,
        } => Ok("FLOAT".to_string()),
        ColumnType::Float {
            width: FloatWidth::Double,
            decimal: None,
        } => Ok("DOUBLE".to_string()),
        ColumnType::DateTime => Ok("DATETIME".to_string()),
        ColumnType::Other => Ok(format!("VARCHAR({})", VARCHAR_MAX)),
    }
}

/// Name of the column written as `INTEGER PRIMARY KEY AUTOINCREMENT`, if any
///
/// Only SQLite needs this: its auto-increment must be the sole key column.
fn inline_primary_key(
    entity: &EntityDescriptor,
    dialect: Dialect,
) -> CatalogResult<Option<&str>> {
    let auto: Vec<&FieldDescriptor> = entity.fields.iter().filter(|f| f.auto_increment).collect();

    for field in &auto {
        if !matches!(field.column_type, ColumnType::Integer { .. }) {
            return Err(fault(entity, &field.name, "auto-increment requires an integer type"));
        }
    }

    if dialect != Dialect::Sqlite || auto.is_empty() {
        return Ok(None);
    }

    let keys = entity.primary_key_fields();
    match (auto.as_slice(), keys.as_slice()) {
        ([field], [key]) if field.name == key.name => Ok(Some(field.name.as_str())),
        _ => Err(fault(
            entity,
            &auto[0].name,
            "sqlite auto-increment must be the only primary key column",
        )),
    }
}

fn column_definition(
    entity: &EntityDescriptor,
    field: &FieldDescriptor,
    dialect: Dialect,
    inline_key: Option<&str>,
) -> CatalogResult<String> {
    if field.name.trim().is_empty() {
        return Err(fault(entity, "", "field name is empty"));
    }

    let is_inline_key = inline_key == Some(field.name.as_str());
    let sql_type = if is_inline_key {
        "INTEGER".to_string()
    } else {
        column_type_sql(entity, field)?
    };

    let mut column = format!("{} {}", field.name, sql_type);
    if field.not_null {
        column.push_str(" NOT NULL");
    }
    if is_inline_key {
        column.push_str(" PRIMARY KEY AUTOINCREMENT");
    } else if field.auto_increment {
        column.push_str(" AUTO_INCREMENT");
    }
    if field.unique {
        column.push_str(" UNIQUE");
    }
    if let Some(literal) = &field.default {
        if literal.trim().is_empty() {
            return Err(fault(entity, &field.name, "empty default value"));
        }
        column.push_str(" DEFAULT ");
        column.push_str(literal);
    }
    Ok(column)
}

fn foreign_key_clause(
    entity: &EntityDescriptor,
    field: &FieldDescriptor,
    fk: &super::descriptor::ForeignKey,
) -> CatalogResult<String> {
    if fk.target.trim().is_empty() {
        return Err(fault(entity, &field.name, "empty foreign key reference"));
    }

    let parts: Vec<&str> = fk.target.split('.').collect();
    let (table, column) = match parts.as_slice() {
        [table, column] if !table.trim().is_empty() && !column.trim().is_empty() => {
            (*table, *column)
        }
        _ => {
            return Err(fault(
                entity,
                &field.name,
                format!("invalid reference '{}', expected table.column", fk.target),
            ))
        }
    };

    let mut clause = format!(
        "FOREIGN KEY ({}) REFERENCES {}({})",
        field.name, table, column
    );
    if let Some(action) = fk.on_update {
        clause.push_str(" ON UPDATE ");
        clause.push_str(action.as_sql());
    }
    if let Some(action) = fk.on_delete {
        clause.push_str(" ON DELETE ");
        clause.push_str(action.as_sql());
    }
    Ok(clause)
}

fn fault(entity: &EntityDescriptor, field: &str, reason: impl Into<String>) -> CatalogError {
    CatalogError::configuration(entity.name.as_str(), field, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{Book, Card, Loan};
    use crate::schema::descriptor::{Decimal, Entity, FieldDescriptor, ForeignKey};
    use crate::schema::entities::catalog_entities;
    use rusqlite::Connection;

    fn single(field: FieldDescriptor) -> EntityDescriptor {
        EntityDescriptor::new("sample").field(field)
    }

    fn type_of(column_type: ColumnType) -> CatalogResult<String> {
        let entity = single(FieldDescriptor::new("value", column_type));
        column_type_sql(&entity, &entity.fields[0])
    }

    #[test]
    fn test_book_table_mysql() {
        let sql = compile_table(Book::descriptor(), Dialect::MySql).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS book (\
             book_id INT NOT NULL AUTO_INCREMENT, \
             category VARCHAR(63) NOT NULL, \
             title VARCHAR(63) NOT NULL, \
             press VARCHAR(63) NOT NULL, \
             publish_year INT NOT NULL, \
             author VARCHAR(63) NOT NULL, \
             price DECIMAL(7,2) NOT NULL DEFAULT 0.00, \
             stock INT NOT NULL DEFAULT 0, \
             CONSTRAINT book_unique UNIQUE(category, title, press, publish_year, author), \
             PRIMARY KEY(book_id), \
             CHECK(price >= 0), \
             CHECK(stock >= 0)) \
             ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
        );
    }

    #[test]
    fn test_book_table_sqlite_inlines_key() {
        let sql = compile_table(Book::descriptor(), Dialect::Sqlite).unwrap();
        assert!(sql.contains("book_id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT"));
        assert!(!sql.contains("PRIMARY KEY(book_id)"));
        assert!(!sql.contains("ENGINE"));
    }

    #[test]
    fn test_card_table_check_and_char() {
        let sql = compile_table(Card::descriptor(), Dialect::MySql).unwrap();
        assert!(sql.contains("type CHAR(1) NOT NULL"));
        assert!(sql.contains("CONSTRAINT card_unique UNIQUE(name, department, type)"));
        assert!(sql.contains("CHECK(type IN ('T', 'S'))"));
    }

    #[test]
    fn test_loan_table_composite_key_and_foreign_keys() {
        let sql = compile_table(Loan::descriptor(), Dialect::Sqlite).unwrap();
        assert!(sql.contains("PRIMARY KEY(card_id, book_id, borrow_time)"));
        assert!(sql.contains(
            "FOREIGN KEY (card_id) REFERENCES card(card_id) ON UPDATE CASCADE ON DELETE CASCADE, \
             FOREIGN KEY (book_id) REFERENCES book(book_id) ON UPDATE CASCADE ON DELETE CASCADE)"
        ));
        assert!(sql.contains("return_time BIGINT NOT NULL DEFAULT 0"));
    }

    #[test]
    fn test_trailing_clause_order() {
        let sql = compile_table(Loan::descriptor(), Dialect::MySql).unwrap();
        let pk = sql.find("PRIMARY KEY(").unwrap();
        let fk = sql.find("FOREIGN KEY").unwrap();
        assert!(pk < fk);

        let sql = compile_table(Book::descriptor(), Dialect::MySql).unwrap();
        let unique = sql.find("CONSTRAINT book_unique").unwrap();
        let pk = sql.find("PRIMARY KEY(").unwrap();
        let check = sql.find("CHECK(").unwrap();
        assert!(unique < pk && pk < check);
    }

    #[test]
    fn test_tag_order_does_not_matter() {
        let a = single(
            FieldDescriptor::new("n", ColumnType::int())
                .default_literal("1")
                .unique()
                .not_null(),
        );
        let b = single(
            FieldDescriptor::new("n", ColumnType::int())
                .not_null()
                .unique()
                .default_literal("1"),
        );
        assert_eq!(
            compile_table(&a, Dialect::MySql).unwrap(),
            compile_table(&b, Dialect::MySql).unwrap()
        );
        assert!(compile_table(&a, Dialect::MySql)
            .unwrap()
            .contains("n INT NOT NULL UNIQUE DEFAULT 1"));
    }

    #[test]
    fn test_text_sizes() {
        assert_eq!(type_of(ColumnType::text(1)).unwrap(), "VARCHAR(1)");
        assert_eq!(type_of(ColumnType::text(255)).unwrap(), "VARCHAR(255)");
        assert_eq!(type_of(ColumnType::text(256)).unwrap(), "TEXT");
        assert_eq!(type_of(ColumnType::text(65_535)).unwrap(), "TEXT");
        assert_eq!(type_of(ColumnType::text(65_536)).unwrap(), "MEDIUMTEXT");
        assert_eq!(type_of(ColumnType::text(16_777_215)).unwrap(), "MEDIUMTEXT");
        assert_eq!(type_of(ColumnType::text(16_777_216)).unwrap(), "LONGTEXT");
        assert_eq!(type_of(ColumnType::Text { size: None }).unwrap(), "VARCHAR(255)");
        assert_eq!(type_of(ColumnType::Other).unwrap(), "VARCHAR(255)");
    }

    #[test]
    fn test_numeric_and_time_types() {
        assert_eq!(
            type_of(ColumnType::Integer {
                width: IntWidth::Small,
                unsigned: true
            })
            .unwrap(),
            "SMALLINT UNSIGNED"
        );
        assert_eq!(type_of(ColumnType::bigint()).unwrap(), "BIGINT");
        assert_eq!(
            type_of(ColumnType::Float {
                width: FloatWidth::Double,
                decimal: None
            })
            .unwrap(),
            "DOUBLE"
        );
        assert_eq!(type_of(ColumnType::decimal(7, 2)).unwrap(), "DECIMAL(7,2)");
        assert_eq!(type_of(ColumnType::DateTime).unwrap(), "DATETIME");
    }

    #[test]
    fn test_invalid_sizes_are_configuration_faults() {
        let cases = [
            ColumnType::text(0),
            ColumnType::text(-4),
            ColumnType::fixed_char(0),
            ColumnType::fixed_char(256),
            ColumnType::decimal(0, 2),
            ColumnType::Float {
                width: FloatWidth::Double,
                decimal: Some(Decimal {
                    precision: 7,
                    scale: 0,
                }),
            },
        ];
        for case in cases {
            let err = type_of(case.clone()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration, "{:?}", case);
        }
    }

    #[test]
    fn test_malformed_foreign_keys() {
        for target in ["card", "a.b.c", ".card_id", "card.", ""] {
            let entity = single(
                FieldDescriptor::new("card_id", ColumnType::int())
                    .references(ForeignKey::new(target)),
            );
            let err = compile_table(&entity, Dialect::MySql).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration, "target {:?}", target);
        }
    }

    #[test]
    fn test_empty_constraint_specs() {
        let entities = [
            single(FieldDescriptor::new("n", ColumnType::int()).check(" ")),
            single(FieldDescriptor::new("n", ColumnType::int()).default_literal("")),
            single(FieldDescriptor::new("n", ColumnType::int()).unique_group("")),
            EntityDescriptor::new("empty"),
            EntityDescriptor::new("").field(FieldDescriptor::new("n", ColumnType::int())),
        ];
        for entity in &entities {
            assert!(compile_table(entity, Dialect::MySql).is_err());
        }
    }

    #[test]
    fn test_sqlite_rejects_composite_auto_increment() {
        let entity = EntityDescriptor::new("pair")
            .field(
                FieldDescriptor::new("a", ColumnType::int())
                    .auto_increment()
                    .primary_key(),
            )
            .field(FieldDescriptor::new("b", ColumnType::int()).primary_key());

        assert!(compile_table(&entity, Dialect::MySql).is_ok());
        let err = compile_table(&entity, Dialect::Sqlite).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_unique_groups_keep_first_appearance_order() {
        let entity = EntityDescriptor::new("t")
            .field(FieldDescriptor::new("a", ColumnType::int()).unique_group("second"))
            .field(FieldDescriptor::new("b", ColumnType::int()).unique_group("first"))
            .field(FieldDescriptor::new("c", ColumnType::int()).unique_group("second"));

        let sql = compile_table(&entity, Dialect::MySql).unwrap();
        assert!(sql.contains("CONSTRAINT second UNIQUE(a, c), CONSTRAINT first UNIQUE(b)"));
    }

    #[test]
    fn test_one_fault_fails_the_batch() {
        let broken = single(FieldDescriptor::new("title", ColumnType::text(0)));
        let mut entities: Vec<&EntityDescriptor> = catalog_entities().to_vec();
        entities.push(&broken);

        let err = compile_schema(&entities, Dialect::Sqlite).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Configuration { ref entity, ref field, .. }
                if entity == "sample" && field == "title"
        ));
    }

    #[test]
    fn test_sqlite_statements_execute() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();

        for statement in compile_schema(&catalog_entities(), Dialect::Sqlite).unwrap() {
            conn.execute(&statement, []).unwrap();
        }

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"book".to_string()));
        assert!(tables.contains(&"card".to_string()));
        assert!(tables.contains(&"borrow".to_string()));
    }
}
