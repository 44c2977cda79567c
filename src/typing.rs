//! Column typing: the SQL type vocabulary, rendered column types, dialects,
//! and the scalar-to-column type mapper.

use std::fmt;
use std::hash::{Hash, Hasher};

/// The SQL dialect used when rendering column types.
///
/// Changing the dialect on a [`crate::schema::ModelRegistry`] invalidates
/// every cached schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// Portable rendering with sizes and length arguments
    #[default]
    Generic,
    /// SQLite storage-class rendering (types collapse to their affinity)
    Sqlite,
}

/// Size prefix accepted by sizeable SQL types (INTEGER, TEXT, BLOB).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlSize {
    Tiny,
    Medium,
    Big,
    Long,
}

impl SqlSize {
    fn prefix(self) -> &'static str {
        match self {
            SqlSize::Tiny => "TINY",
            SqlSize::Medium => "MEDIUM",
            SqlSize::Big => "BIG",
            SqlSize::Long => "LONG",
        }
    }
}

/// The closed set of SQL types the engine can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Integer,
    Float,
    Double,
    Decimal,
    /// Renders as `VARCHAR`
    String,
    Boolean,
    Text,
    Blob,
    Date,
    DateTime,
    Timestamp,
    /// Resolve the type from the field instead of an explicit declaration
    Auto,
}

impl SqlType {
    /// Whether the type accepts a TINY/MEDIUM/BIG/LONG size prefix.
    #[must_use]
    pub fn sizeable(self) -> bool {
        matches!(self, SqlType::Integer | SqlType::Text | SqlType::Blob)
    }

    /// Whether a column of this type may be auto-incremented.
    #[must_use]
    pub fn incrementable(self) -> bool {
        matches!(self, SqlType::Integer | SqlType::Float | SqlType::Double)
    }

    /// Render the base type name, applying the size prefix where the type
    /// accepts one. Sized integers collapse to the conventional short forms
    /// (`TINYINT`, `MEDIUMINT`, `BIGINT`).
    #[must_use]
    pub fn sql_value(self, size: Option<SqlSize>) -> String {
        if self == SqlType::Integer {
            return match size {
                Some(SqlSize::Tiny) => "TINYINT".to_owned(),
                Some(SqlSize::Medium) => "MEDIUMINT".to_owned(),
                Some(SqlSize::Big | SqlSize::Long) => "BIGINT".to_owned(),
                None => "INTEGER".to_owned(),
            };
        }

        let base = match self {
            SqlType::Float => "FLOAT",
            SqlType::Double => "DOUBLE",
            SqlType::Decimal => "DECIMAL",
            SqlType::String => "VARCHAR",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Text => "TEXT",
            SqlType::Blob => "BLOB",
            SqlType::Date => "DATE",
            SqlType::DateTime => "DATETIME",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::Auto => "AUTO",
            SqlType::Integer => unreachable!(),
        };

        match size {
            Some(size) if self.sizeable() => format!("{}{base}", size.prefix()),
            _ => base.to_owned(),
        }
    }

    /// SQLite storage class for this type.
    #[must_use]
    pub fn sqlite_value(self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::String | SqlType::Text => "TEXT",
            SqlType::Blob => "BLOB",
            SqlType::Boolean => "NUMERIC",
            SqlType::Float
            | SqlType::Double
            | SqlType::Decimal
            | SqlType::Date
            | SqlType::DateTime
            | SqlType::Timestamp
            | SqlType::Auto => "REAL",
        }
    }
}

/// Default length applied to `VARCHAR`/`INTEGER` columns without an explicit
/// length.
pub const DEFAULT_LENGTH: u32 = 255;
/// Default length applied to `TEXT`/`BLOB` columns without an explicit length.
pub const DEFAULT_LOB_LENGTH: u32 = 65_535;
/// Default total digits for `DECIMAL` columns.
pub const DEFAULT_DIGITS: u32 = 10;
/// Default decimal places for `DECIMAL` columns.
pub const DEFAULT_DECIMALS: u32 = 0;

/// A fully resolved column type: SQL type plus optional size and length
/// arguments.
///
/// Equality and hashing follow the rendered generic definition, so two types
/// that produce the same DDL fragment compare equal regardless of which
/// arguments were left to default.
#[derive(Debug, Clone)]
pub struct ColumnType {
    pub sql_type: SqlType,
    pub size: Option<SqlSize>,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub digits: Option<u32>,
    pub decimals: Option<u32>,
}

impl ColumnType {
    pub const STRING: ColumnType = ColumnType::simple(SqlType::String);
    pub const TINYINT: ColumnType = ColumnType::sized(SqlType::Integer, SqlSize::Tiny);
    pub const MEDIUMINT: ColumnType = ColumnType::sized(SqlType::Integer, SqlSize::Medium);
    pub const INTEGER: ColumnType = ColumnType::simple(SqlType::Integer);
    pub const BIGINT: ColumnType = ColumnType::sized(SqlType::Integer, SqlSize::Big);
    pub const FLOAT: ColumnType = ColumnType::simple(SqlType::Float);
    pub const DOUBLE: ColumnType = ColumnType::simple(SqlType::Double);
    pub const BOOLEAN: ColumnType = ColumnType::simple(SqlType::Boolean);
    pub const TEXT: ColumnType = ColumnType::simple(SqlType::Text);
    pub const BLOB: ColumnType = ColumnType::simple(SqlType::Blob);
    pub const TIMESTAMP: ColumnType = ColumnType::simple(SqlType::Timestamp);

    const fn simple(sql_type: SqlType) -> ColumnType {
        ColumnType {
            sql_type,
            size: None,
            length: None,
            precision: None,
            digits: None,
            decimals: None,
        }
    }

    const fn sized(sql_type: SqlType, size: SqlSize) -> ColumnType {
        ColumnType {
            sql_type,
            size: Some(size),
            length: None,
            precision: None,
            digits: None,
            decimals: None,
        }
    }

    #[must_use]
    pub fn builder(sql_type: SqlType) -> ColumnTypeBuilder {
        ColumnTypeBuilder {
            inner: ColumnType::simple(sql_type),
        }
    }

    /// Render the DDL type fragment for the given dialect.
    ///
    /// SQLite columns carry only their storage class; the generic dialect adds
    /// length, digit, and precision arguments with the documented defaults.
    #[must_use]
    pub fn definition(&self, dialect: Dialect) -> String {
        if dialect == Dialect::Sqlite {
            return self.sql_type.sqlite_value().to_owned();
        }

        let mut definition = self.sql_type.sql_value(self.size);

        match self.sql_type {
            SqlType::Decimal => {
                definition.push_str(&format!(
                    "({}, {})",
                    self.digits.unwrap_or(DEFAULT_DIGITS),
                    self.decimals.unwrap_or(DEFAULT_DECIMALS)
                ));
            }
            SqlType::Float | SqlType::Double => {
                if let Some(precision) = self.precision {
                    definition.push_str(&format!("({precision})"));
                }
            }
            SqlType::String => {
                definition.push_str(&format!(
                    "({})",
                    self.length.unwrap_or(DEFAULT_LENGTH)
                ));
            }
            SqlType::Text | SqlType::Blob => {
                definition.push_str(&format!(
                    "({})",
                    self.length.unwrap_or(DEFAULT_LOB_LENGTH)
                ));
            }
            SqlType::Integer => {
                // Length only when explicitly requested; INTEGER(n) is noise
                // in most dialects.
                if let Some(length) = self.length {
                    definition.push_str(&format!("({length})"));
                }
            }
            SqlType::Boolean
            | SqlType::Date
            | SqlType::DateTime
            | SqlType::Timestamp
            | SqlType::Auto => {}
        }

        definition
    }
}

impl PartialEq for ColumnType {
    fn eq(&self, other: &Self) -> bool {
        self.definition(Dialect::Generic) == other.definition(Dialect::Generic)
    }
}

impl Eq for ColumnType {}

impl Hash for ColumnType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.definition(Dialect::Generic).hash(state);
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.definition(Dialect::Generic))
    }
}

/// Builder for [`ColumnType`] values with explicit size or length arguments.
#[derive(Debug, Clone)]
pub struct ColumnTypeBuilder {
    inner: ColumnType,
}

impl ColumnTypeBuilder {
    #[must_use]
    pub fn size(mut self, size: SqlSize) -> Self {
        self.inner.size = Some(size);
        self
    }

    #[must_use]
    pub fn length(mut self, length: u32) -> Self {
        if length > 0 {
            self.inner.length = Some(length);
        }
        self
    }

    #[must_use]
    pub fn precision(mut self, precision: u32) -> Self {
        if precision > 0 {
            self.inner.precision = Some(precision);
        }
        self
    }

    #[must_use]
    pub fn digits(mut self, digits: u32) -> Self {
        self.inner.digits = Some(digits);
        self
    }

    #[must_use]
    pub fn decimals(mut self, decimals: u32) -> Self {
        self.inner.decimals = Some(decimals);
        self
    }

    #[must_use]
    pub fn build(self) -> ColumnType {
        self.inner
    }
}

/// The scalar shapes a field (or collection element) can declare.
///
/// Converter chains are validated against these tags, and the active
/// [`TypeMapper`] resolves the post-conversion tag to a [`ColumnType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Text,
    Blob,
    Timestamp,
    Json,
}

/// Maps a scalar kind to the column type used to store it.
pub trait TypeMapper: Send + Sync {
    /// The SQL column type best representing the scalar kind, or `None` if
    /// the mapper has no equivalent.
    fn column_type(&self, kind: ScalarKind) -> Option<ColumnType>;
}

/// Default mapper covering every built-in scalar kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericTypeMapper;

impl TypeMapper for GenericTypeMapper {
    fn column_type(&self, kind: ScalarKind) -> Option<ColumnType> {
        let column_type = match kind {
            ScalarKind::Bool => ColumnType::BOOLEAN,
            ScalarKind::I8 => ColumnType::TINYINT,
            ScalarKind::I16 => ColumnType::MEDIUMINT,
            ScalarKind::I32 => ColumnType::INTEGER,
            ScalarKind::I64 => ColumnType::BIGINT,
            ScalarKind::F32 => ColumnType::FLOAT,
            ScalarKind::F64 => ColumnType::DOUBLE,
            ScalarKind::Text => ColumnType::STRING,
            ScalarKind::Blob => ColumnType::BLOB,
            ScalarKind::Timestamp => ColumnType::TIMESTAMP,
            ScalarKind::Json => ColumnType::TEXT,
        };
        Some(column_type)
    }
}
