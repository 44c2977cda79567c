//! Column derivation: turning a [`FieldDescriptor`] into a concrete column
//! definition with a resolved type, converter chain, and constraints.

use tracing::warn;

use crate::convert::ConverterChain;
use crate::error::OrmError;
use crate::naming::NamingStrategy;
use crate::schema::field::{DeclaredType, EnumStorage, FieldDescriptor, ForeignKeyRef};
use crate::schema::registry::ModelRegistry;
use crate::typing::{ColumnType, Dialect, ScalarKind, SqlType, TypeMapper};

/// A resolved foreign-key target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeySpec {
    /// The referenced table
    pub reference: String,
    /// The referenced column, absent for explicit references given as a bare
    /// table name
    pub referenced_column: Option<String>,
    /// Whether the target was inferred from the referenced model's unique
    /// identifier
    pub inferred: bool,
}

impl ForeignKeySpec {
    /// Render as `table(column)` or just `table`.
    #[must_use]
    pub fn target(&self) -> String {
        match &self.referenced_column {
            Some(column) => format!("{}({column})", self.reference),
            None => self.reference.clone(),
        }
    }
}

/// A fully derived column.
#[derive(Debug, Clone)]
pub struct ColumnDefinition {
    /// The originating field name, used to pair columns with descriptors at
    /// mapping time
    pub field: String,
    /// Rendered column name
    pub name: String,
    pub column_type: ColumnType,
    /// Scalar kind stored in the database, after the converter chain
    pub storage_kind: ScalarKind,
    pub chain: ConverterChain,
    pub primary: bool,
    pub unique: bool,
    pub nullable: bool,
    pub autoincrement: bool,
    pub default_value: Option<String>,
    pub check: Option<String>,
    pub foreign_key: Option<ForeignKeySpec>,
}

impl ColumnDefinition {
    /// Derive a column from `descriptor`, or `None` when the field does not
    /// produce an owner-table column (transient fields, element collections,
    /// and fields whose scalar kind the mapper cannot place).
    pub fn derive(
        descriptor: &FieldDescriptor,
        naming: &dyn NamingStrategy,
        mapper: &dyn TypeMapper,
        registry: &ModelRegistry,
    ) -> Result<Option<ColumnDefinition>, OrmError> {
        if descriptor.transient || descriptor.is_collection() {
            return Ok(None);
        }

        let name = rendered_column_name(descriptor, naming);

        // The chain consumes the field's storage-side kind: enums are encoded
        // per their storage mode before any converter runs.
        let base_kind = match &descriptor.declared {
            DeclaredType::Scalar(kind) => *kind,
            DeclaredType::Enum(_) => descriptor.enum_storage.scalar_kind(),
            DeclaredType::Object { .. } | DeclaredType::List { .. } => ScalarKind::I64,
        };

        let (foreign_key, delegated) = match &descriptor.declared {
            DeclaredType::Object { model_key } => {
                resolve_foreign_key(descriptor, model_key, registry)?
            }
            _ => match descriptor.foreign_key.as_ref() {
                Some(ForeignKeyRef::Explicit(target)) => {
                    let (reference, referenced_column) = split_reference(target);
                    (
                        Some(ForeignKeySpec {
                            reference,
                            referenced_column,
                            inferred: false,
                        }),
                        None,
                    )
                }
                Some(ForeignKeyRef::Inferred) => {
                    warn!(
                        field = descriptor.name,
                        "inferred foreign keys need an object-typed field, ignoring"
                    );
                    (None, None)
                }
                None => (None, None),
            },
        };

        let chain = if matches!(descriptor.declared, DeclaredType::Object { .. }) {
            // Converter chains apply to the field's own value; an object field
            // stores the referenced identifier untouched.
            ConverterChain::identity(delegated.as_ref().map_or(base_kind, |(kind, _)| *kind))
        } else {
            ConverterChain::resolve(base_kind, descriptor.converters.clone())
        };
        let storage_kind = chain.output_kind();

        let Some(column_type) = resolve_column_type(descriptor, delegated, storage_kind, mapper)
        else {
            warn!(
                field = descriptor.name,
                kind = ?storage_kind,
                "no column type for field, excluding it from the schema"
            );
            return Ok(None);
        };

        let autoincrement = if descriptor.autoincrement
            && !column_type.sql_type.incrementable()
            && descriptor.explicit_type.is_none()
        {
            warn!(
                field = descriptor.name,
                column_type = %column_type,
                "autoincrement requested on a non-incrementable type, ignoring"
            );
            false
        } else {
            descriptor.autoincrement
        };

        Ok(Some(ColumnDefinition {
            field: descriptor.name.to_owned(),
            name,
            column_type,
            storage_kind,
            chain,
            primary: descriptor.primary,
            unique: descriptor.unique,
            nullable: descriptor.nullable && !descriptor.primary,
            autoincrement,
            default_value: descriptor.default_value.map(str::to_owned),
            check: descriptor.check.map(str::to_owned),
            foreign_key,
        }))
    }

    /// Render the column body of a CREATE TABLE statement, without any
    /// table-level constraints.
    #[must_use]
    pub fn definition(&self, dialect: Dialect) -> String {
        // SQLite only honors AUTOINCREMENT on an inline INTEGER PRIMARY KEY.
        if dialect == Dialect::Sqlite && self.autoincrement && self.primary {
            return format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", self.name);
        }

        let mut definition = format!("{} {}", self.name, self.column_type.definition(dialect));
        if !self.nullable {
            definition.push_str(" NOT NULL");
        }
        if self.autoincrement {
            definition.push_str(match dialect {
                Dialect::Sqlite => " AUTOINCREMENT",
                Dialect::Generic => " AUTO_INCREMENT",
            });
        }
        match &self.default_value {
            Some(literal) => definition.push_str(&format!(" DEFAULT {literal}")),
            None if self.nullable => definition.push_str(" DEFAULT NULL"),
            None => {}
        }
        definition
    }
}

fn rendered_column_name(descriptor: &FieldDescriptor, naming: &dyn NamingStrategy) -> String {
    match descriptor.column_name {
        Some(explicit) => naming.column(explicit),
        None => naming.column(&descriptor.name.to_lowercase()),
    }
}

/// Resolve the foreign-key target and, for inferred references, the scalar
/// kind and column type delegated from the referenced identifier.
#[allow(clippy::type_complexity)]
fn resolve_foreign_key(
    descriptor: &FieldDescriptor,
    model_key: &'static str,
    registry: &ModelRegistry,
) -> Result<(Option<ForeignKeySpec>, Option<(ScalarKind, ColumnType)>), OrmError> {
    match descriptor.foreign_key.as_ref().unwrap_or(&ForeignKeyRef::Inferred) {
        ForeignKeyRef::Explicit(target) => {
            let (reference, referenced_column) = split_reference(target);
            Ok((
                Some(ForeignKeySpec {
                    reference,
                    referenced_column,
                    inferred: false,
                }),
                None,
            ))
        }
        ForeignKeyRef::Inferred => {
            let Ok(referenced) = registry.schema_by_key(model_key) else {
                warn!(
                    field = descriptor.name,
                    model = model_key,
                    "referenced model is not registered, keeping the column non-foreign"
                );
                return Ok((None, None));
            };
            let Some(identifier) = referenced.unique_identifier() else {
                warn!(
                    field = descriptor.name,
                    model = model_key,
                    "referenced model has no unique identifier, keeping the column non-foreign"
                );
                return Ok((None, None));
            };
            Ok((
                Some(ForeignKeySpec {
                    reference: referenced.table_name().to_owned(),
                    referenced_column: Some(identifier.name.clone()),
                    inferred: true,
                }),
                Some((identifier.storage_kind, identifier.column_type.clone())),
            ))
        }
    }
}

fn split_reference(target: &str) -> (String, Option<String>) {
    match target.split_once('(') {
        Some((table, rest)) => (
            table.trim().to_owned(),
            Some(rest.trim_end_matches(')').trim().to_owned()),
        ),
        None => (target.trim().to_owned(), None),
    }
}

/// Type precedence: explicit full type, then a non-auto declared SQL type,
/// then the type delegated from an inferred foreign key, then the enum
/// storage mode, then the mapper.
fn resolve_column_type(
    descriptor: &FieldDescriptor,
    delegated: Option<(ScalarKind, ColumnType)>,
    storage_kind: ScalarKind,
    mapper: &dyn TypeMapper,
) -> Option<ColumnType> {
    if let Some(explicit) = &descriptor.explicit_type {
        return Some(explicit.clone());
    }
    if descriptor.sql_type != SqlType::Auto {
        return Some(ColumnType::builder(descriptor.sql_type).build());
    }
    if let Some((_, column_type)) = delegated {
        return Some(column_type);
    }
    if let DeclaredType::Enum(_) = descriptor.declared {
        if descriptor.converters.is_empty() {
            return Some(match descriptor.enum_storage {
                EnumStorage::Ordinal => ColumnType::INTEGER,
                EnumStorage::Value => ColumnType::STRING,
            });
        }
    }
    mapper.column_type(storage_kind)
}

/// Kinds of table-level constraints emitted by the schema renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    ForeignKey,
    Check,
}

impl ConstraintKind {
    fn prefix(self) -> &'static str {
        match self {
            ConstraintKind::PrimaryKey => "PK",
            ConstraintKind::Unique => "UK",
            ConstraintKind::ForeignKey => "FK",
            ConstraintKind::Check => "CHK",
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            ConstraintKind::PrimaryKey => "PRIMARY KEY",
            ConstraintKind::Unique => "UNIQUE",
            ConstraintKind::ForeignKey => "FOREIGN KEY",
            ConstraintKind::Check => "CHECK",
        }
    }
}

/// A named table-level constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlConstraint {
    pub kind: ConstraintKind,
    /// Identifier appended to the kind prefix, usually `{table}_{column}`
    pub id: String,
    /// The parenthesized body, e.g. a column list for PRIMARY KEY
    pub definition: String,
    /// Trailing clause rendered after the body, e.g. a REFERENCES target
    pub suffix: Option<String>,
}

impl SqlConstraint {
    #[must_use]
    pub fn new(kind: ConstraintKind, id: impl Into<String>, definition: impl Into<String>) -> Self {
        SqlConstraint {
            kind,
            id: id.into(),
            definition: definition.into(),
            suffix: None,
        }
    }

    #[must_use]
    pub fn foreign_key(id: impl Into<String>, column: &str, target: &str) -> Self {
        SqlConstraint {
            kind: ConstraintKind::ForeignKey,
            id: id.into(),
            definition: column.to_owned(),
            suffix: Some(format!("REFERENCES {target}")),
        }
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut rendered = format!(
            "CONSTRAINT {}_{} {} ({})",
            self.kind.prefix(),
            self.id,
            self.kind.keyword(),
            self.definition
        );
        if let Some(suffix) = &self.suffix {
            rendered.push(' ');
            rendered.push_str(suffix);
        }
        rendered
    }
}
