//! Entity descriptors
//!
//! An [`EntityDescriptor`] describes one table: its name and ordered fields,
//! each with a semantic type and constraint tags. Descriptors are plain data;
//! validation happens when they are compiled.
//!
//! ```text
//! FieldDescriptor::new("title", ColumnType::text(63))
//!     .not_null()
//!     .unique_group("book_unique")
//! ```

/// Integer storage width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    Tiny,
    Small,
    Int,
    Big,
}

/// Floating storage width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatWidth {
    Single,
    Double,
}

/// Precision and scale of a fixed-point column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal {
    pub precision: i64,
    pub scale: i64,
}

/// Semantic type of a field, with its size tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    /// Variable-length text; `None` means no size tag
    Text { size: Option<i64> },
    /// Fixed-width character column
    FixedChar { width: i64 },
    Integer { width: IntWidth, unsigned: bool },
    /// Approximate unless `decimal` is set
    Float {
        width: FloatWidth,
        decimal: Option<Decimal>,
    },
    DateTime,
    /// Anything without a mapping; compiled as bounded text
    Other,
}

impl ColumnType {
    pub fn text(size: i64) -> Self {
        ColumnType::Text { size: Some(size) }
    }

    pub fn fixed_char(width: i64) -> Self {
        ColumnType::FixedChar { width }
    }

    pub fn int() -> Self {
        ColumnType::Integer {
            width: IntWidth::Int,
            unsigned: false,
        }
    }

    pub fn bigint() -> Self {
        ColumnType::Integer {
            width: IntWidth::Big,
            unsigned: false,
        }
    }

    pub fn decimal(precision: i64, scale: i64) -> Self {
        ColumnType::Float {
            width: FloatWidth::Single,
            decimal: Some(Decimal { precision, scale }),
        }
    }
}

/// Foreign-key rule applied to dependent rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferentialAction {
    Cascade,
    Restrict,
    SetNull,
    NoAction,
}

impl ReferentialAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::NoAction => "NO ACTION",
        }
    }
}

/// Reference to `table.column` in another entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Target written as `table.column`
    pub target: String,
    pub on_update: Option<ReferentialAction>,
    pub on_delete: Option<ReferentialAction>,
}

impl ForeignKey {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            on_update: None,
            on_delete: None,
        }
    }

    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }

    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }
}

/// One column of an entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub column_type: ColumnType,
    pub not_null: bool,
    pub auto_increment: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub unique_group: Option<String>,
    pub default: Option<String>,
    pub check: Option<String>,
    pub foreign_key: Option<ForeignKey>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            not_null: false,
            auto_increment: false,
            primary_key: false,
            unique: false,
            unique_group: None,
            default: None,
            check: None,
            foreign_key: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Single-column uniqueness
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Join the named multi-column uniqueness group
    pub fn unique_group(mut self, group: impl Into<String>) -> Self {
        self.unique_group = Some(group.into());
        self
    }

    /// Default value, emitted verbatim as a SQL literal
    pub fn default_literal(mut self, literal: impl Into<String>) -> Self {
        self.default = Some(literal.into());
        self
    }

    /// Table-level check expression
    pub fn check(mut self, expression: impl Into<String>) -> Self {
        self.check = Some(expression.into());
        self
    }

    pub fn references(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_key = Some(foreign_key);
        self
    }
}

/// A table: name plus ordered fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl EntityDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Column names in declaration order
    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn primary_key_fields(&self) -> Vec<&FieldDescriptor> {
        self.fields.iter().filter(|f| f.primary_key).collect()
    }
}

/// A type with a fixed table description
///
/// Implementations build their descriptor once and hand out the same
/// reference on every call.
pub trait Entity {
    fn descriptor() -> &'static EntityDescriptor;
}
