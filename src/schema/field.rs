//! Field descriptors: the per-field metadata a model publishes so the engine
//! can derive columns, map values, and hydrate rows.

use std::any::Any;
use std::sync::Arc;

use crate::convert::ValueConverter;
use crate::types::SqlValue;
use crate::typing::{ColumnType, ScalarKind, SqlType};

/// A persistable model type.
///
/// `KEY` must be unique across every model registered with the same
/// [`crate::schema::ModelRegistry`]; it doubles as the default table name
/// (lowercased) when [`Model::table_name`] returns `None`.
pub trait Model: Any + Send + Sync {
    /// Stable identifier for this model, used for registry lookup and
    /// foreign-key inference.
    const KEY: &'static str;

    /// Explicit table name override. Defaults to the lowercased `KEY`.
    fn table_name() -> Option<&'static str> {
        None
    }

    /// The field descriptors this model exposes, in declaration order.
    fn fields() -> Vec<FieldDescriptor>;
}

/// Metadata for an enum type used as a field.
#[derive(Debug)]
pub struct EnumMeta {
    pub name: &'static str,
    /// Variant names in ordinal order.
    pub variants: &'static [&'static str],
}

impl EnumMeta {
    /// Ordinal of `name`, if it is a variant of this enum.
    #[must_use]
    pub fn ordinal_of(&self, name: &str) -> Option<i64> {
        self.variants
            .iter()
            .position(|variant| *variant == name)
            .map(|position| position as i64)
    }

    /// Variant name at `ordinal`, if in range.
    #[must_use]
    pub fn variant_at(&self, ordinal: i64) -> Option<&'static str> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|index| self.variants.get(index).copied())
    }
}

/// A concrete enum value flowing through the mapping layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub ordinal: i64,
}

impl EnumValue {
    #[must_use]
    pub fn new(name: impl Into<String>, ordinal: i64) -> Self {
        EnumValue {
            name: name.into(),
            ordinal,
        }
    }
}

/// How an enum field is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumStorage {
    /// Store the variant name as text
    #[default]
    Value,
    /// Store the zero-based ordinal as an integer
    Ordinal,
}

impl EnumStorage {
    /// The scalar kind an enum column carries under this storage mode.
    #[must_use]
    pub fn scalar_kind(self) -> ScalarKind {
        match self {
            EnumStorage::Value => ScalarKind::Text,
            EnumStorage::Ordinal => ScalarKind::I64,
        }
    }
}

/// The declared shape of a field.
#[derive(Debug)]
pub enum DeclaredType {
    /// Plain scalar of the given kind
    Scalar(ScalarKind),
    /// Enum, stored per the field's [`EnumStorage`]
    Enum(&'static EnumMeta),
    /// Reference to another registered model
    Object { model_key: &'static str },
    /// Element collection stored in a side table; `element` describes the
    /// element shape (scalar, enum, or model reference)
    List { element: Option<Box<DeclaredType>> },
}

/// Source of a foreign-key reference for an object-typed field.
#[derive(Debug, Clone)]
pub enum ForeignKeyRef {
    /// Literal `table(column)` reference
    Explicit(&'static str),
    /// Derive the reference from the target model's unique identifier
    Inferred,
}

/// Name overrides for an element-collection side table.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionNames {
    /// Side table name; defaults to `{owner}_{field}`
    pub table: Option<&'static str>,
    /// Column referencing the owner; defaults to `{owner}_id`
    pub reference_column: Option<&'static str>,
    /// Column holding the element value; defaults to the field's column name
    pub value_column: Option<&'static str>,
}

/// A reference to another model instance, reduced to its unique identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignRef {
    /// The referenced row's identifier value, if it has one yet
    pub identifier: Option<SqlValue>,
}

/// A field value surfaced by a [`FieldAccessor`].
#[derive(Debug, Clone)]
pub enum FieldValue {
    Scalar(SqlValue),
    Enum(Option<EnumValue>),
    List(Vec<SqlValue>),
    EnumList(Vec<EnumValue>),
    Refs(Vec<ForeignRef>),
}

/// Function-pointer pair reading and writing a field through `dyn Any`.
///
/// `get` returns `None` when the downcast fails, which the mapper reports as
/// a mapping error. `set` returns `false` on downcast or shape mismatch and
/// is absent for read-only fields.
#[derive(Clone, Copy)]
pub struct FieldAccessor {
    pub get: fn(&dyn Any) -> Option<FieldValue>,
    pub set: Option<fn(&mut dyn Any, FieldValue) -> bool>,
}

impl std::fmt::Debug for FieldAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldAccessor")
            .field("writable", &self.set.is_some())
            .finish()
    }
}

/// Everything a model declares about one of its fields.
///
/// Built with chainable setters; only `name`, `declared`, and `accessor` are
/// required.
pub struct FieldDescriptor {
    pub name: &'static str,
    pub declared: DeclaredType,
    pub accessor: FieldAccessor,
    /// Explicit column name; defaults to the lowercased field name run
    /// through the naming strategy
    pub column_name: Option<&'static str>,
    /// Explicit SQL type; `Auto` defers to the type mapper
    pub sql_type: SqlType,
    /// Full column type override, taking precedence over `sql_type`
    pub explicit_type: Option<ColumnType>,
    pub primary: bool,
    pub unique: bool,
    pub nullable: bool,
    pub autoincrement: bool,
    pub transient: bool,
    pub default_value: Option<&'static str>,
    /// CHECK constraint body emitted alongside the column
    pub check: Option<&'static str>,
    pub enum_storage: EnumStorage,
    pub foreign_key: Option<ForeignKeyRef>,
    pub collection: CollectionNames,
    pub converters: Vec<Arc<dyn ValueConverter>>,
}

impl std::fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("declared", &self.declared)
            .field("accessor", &self.accessor)
            .field("column_name", &self.column_name)
            .field("sql_type", &self.sql_type)
            .field("explicit_type", &self.explicit_type)
            .field("primary", &self.primary)
            .field("unique", &self.unique)
            .field("nullable", &self.nullable)
            .field("autoincrement", &self.autoincrement)
            .field("transient", &self.transient)
            .field("default_value", &self.default_value)
            .field("check", &self.check)
            .field("enum_storage", &self.enum_storage)
            .field("foreign_key", &self.foreign_key)
            .field("collection", &self.collection)
            .field("converters", &self.converters.len())
            .finish()
    }
}

impl FieldDescriptor {
    #[must_use]
    pub fn new(name: &'static str, declared: DeclaredType, accessor: FieldAccessor) -> Self {
        FieldDescriptor {
            name,
            declared,
            accessor,
            column_name: None,
            sql_type: SqlType::Auto,
            explicit_type: None,
            primary: false,
            unique: false,
            nullable: true,
            autoincrement: false,
            transient: false,
            default_value: None,
            check: None,
            enum_storage: EnumStorage::default(),
            foreign_key: None,
            collection: CollectionNames::default(),
            converters: Vec::new(),
        }
    }

    #[must_use]
    pub fn column_name(mut self, name: &'static str) -> Self {
        self.column_name = Some(name);
        self
    }

    #[must_use]
    pub fn sql_type(mut self, sql_type: SqlType) -> Self {
        self.sql_type = sql_type;
        self
    }

    #[must_use]
    pub fn explicit_type(mut self, column_type: ColumnType) -> Self {
        self.explicit_type = Some(column_type);
        self
    }

    #[must_use]
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    #[must_use]
    pub fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self
    }

    #[must_use]
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    #[must_use]
    pub fn default_value(mut self, literal: &'static str) -> Self {
        self.default_value = Some(literal);
        self
    }

    #[must_use]
    pub fn check(mut self, clause: &'static str) -> Self {
        self.check = Some(clause);
        self
    }

    #[must_use]
    pub fn enum_storage(mut self, storage: EnumStorage) -> Self {
        self.enum_storage = storage;
        self
    }

    #[must_use]
    pub fn foreign_key(mut self, reference: ForeignKeyRef) -> Self {
        self.foreign_key = Some(reference);
        self
    }

    #[must_use]
    pub fn collection_table(mut self, table: &'static str) -> Self {
        self.collection.table = Some(table);
        self
    }

    #[must_use]
    pub fn collection_reference_column(mut self, column: &'static str) -> Self {
        self.collection.reference_column = Some(column);
        self
    }

    #[must_use]
    pub fn collection_value_column(mut self, column: &'static str) -> Self {
        self.collection.value_column = Some(column);
        self
    }

    #[must_use]
    pub fn converter(mut self, converter: Arc<dyn ValueConverter>) -> Self {
        self.converters.push(converter);
        self
    }

    /// Whether this field maps to a side table rather than an owner column.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        matches!(self.declared, DeclaredType::List { .. })
    }
}
