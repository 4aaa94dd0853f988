//! SQL dialect differences
//!
//! The compiler targets MySQL-style type names, which SQLite accepts as
//! declared types. The dialects differ in how auto-increment keys, table
//! options and row-lock hints are written.

use std::fmt;
use std::str::FromStr;

use crate::error::CatalogError;

/// Row-lock hint attached to a `SELECT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Consistent read that gates a later write
    Shared,
    /// Read with intent to mutate
    Exclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    MySql,
    #[default]
    Sqlite,
}

impl Dialect {
    /// Suffix appended to a `SELECT` to take a row lock
    ///
    /// SQLite has no row locks; the equivalent guarantee comes from the
    /// transaction mode, so the hint renders empty.
    pub fn lock_hint(&self, mode: LockMode) -> &'static str {
        match (self, mode) {
            (Dialect::MySql, LockMode::Exclusive) => " FOR UPDATE",
            (Dialect::MySql, LockMode::Shared) => " LOCK IN SHARE MODE",
            (Dialect::Sqlite, _) => "",
        }
    }

    /// Table options appended after the closing parenthesis
    pub fn table_suffix(&self) -> &'static str {
        match self {
            Dialect::MySql => " ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
            Dialect::Sqlite => "",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::MySql => f.write_str("mysql"),
            Dialect::Sqlite => f.write_str("sqlite"),
        }
    }
}

impl FromStr for Dialect {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" => Ok(Dialect::MySql),
            "sqlite" => Ok(Dialect::Sqlite),
            other => Err(CatalogError::InvalidRequest(format!(
                "unknown dialect '{}', expected mysql or sqlite",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_hints() {
        assert_eq!(Dialect::MySql.lock_hint(LockMode::Exclusive), " FOR UPDATE");
        assert_eq!(Dialect::MySql.lock_hint(LockMode::Shared), " LOCK IN SHARE MODE");
        assert_eq!(Dialect::Sqlite.lock_hint(LockMode::Exclusive), "");
    }

    #[test]
    fn test_parse() {
        assert_eq!("MySQL".parse::<Dialect>().unwrap(), Dialect::MySql);
        assert_eq!("sqlite".parse::<Dialect>().unwrap(), Dialect::Sqlite);
        assert!("postgres".parse::<Dialect>().is_err());
    }
}
