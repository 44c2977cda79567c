//! Model schemas: the derived table layout for a registered model, including
//! element-collection side tables and CREATE TABLE rendering.

use tracing::warn;

use crate::convert::ConverterChain;
use crate::error::OrmError;
use crate::schema::column::{
    ColumnDefinition, ConstraintKind, ForeignKeySpec, SqlConstraint,
};
use crate::schema::field::{DeclaredType, FieldDescriptor, Model};
use crate::schema::registry::ModelRegistry;
use crate::typing::{ColumnType, Dialect, ScalarKind};

/// A derived element-collection side table.
#[derive(Debug, Clone)]
pub struct ElementCollectionSpec {
    /// The originating field name on the owner model
    pub field: String,
    /// Side table name
    pub table: String,
    /// Column referencing the owner row
    pub reference_column: String,
    /// Column holding the element value
    pub value_column: String,
    pub value_type: ColumnType,
    /// Scalar kind stored in the value column, after the converter chain
    pub storage_kind: ScalarKind,
    /// When false, mapping an empty collection is a constraint violation
    pub nullable: bool,
    pub chain: ConverterChain,
    /// Set when the elements reference another model
    pub element_reference: Option<ForeignKeySpec>,
}

/// The fully derived schema for one model.
#[derive(Debug, Clone)]
pub struct ModelSchema {
    key: &'static str,
    table: String,
    dialect: Dialect,
    columns: Vec<ColumnDefinition>,
    collections: Vec<ElementCollectionSpec>,
}

impl ModelSchema {
    /// Derive the schema for `M` against the registry's naming strategy,
    /// type mapper, and dialect.
    pub fn derive<M: Model>(registry: &ModelRegistry) -> Result<ModelSchema, OrmError> {
        let naming = registry.naming();
        let mapper = registry.mapper();
        let dialect = registry.dialect();

        let raw_table = M::table_name().map_or_else(|| M::KEY.to_lowercase(), str::to_owned);
        let table = naming.table(&raw_table);

        let descriptors = M::fields();
        let mut columns = Vec::with_capacity(descriptors.len());
        let mut collections = Vec::new();
        for descriptor in &descriptors {
            if descriptor.is_collection() {
                if descriptor.transient {
                    continue;
                }
                if let Some(spec) =
                    derive_collection(descriptor, &table, naming, registry)?
                {
                    collections.push(spec);
                }
                continue;
            }
            if let Some(column) =
                ColumnDefinition::derive(descriptor, naming, mapper, registry)?
            {
                columns.push(column);
            }
        }

        let primaries = columns.iter().filter(|column| column.primary).count();
        if primaries > 1 {
            return Err(OrmError::MultiplePrimaryKeys { table });
        }

        // Primary first, then unique, then the rest; declaration order is
        // preserved within each group.
        columns.sort_by_key(|column| match (column.primary, column.unique) {
            (true, _) => 0u8,
            (false, true) => 1,
            (false, false) => 2,
        });

        Ok(ModelSchema {
            key: M::KEY,
            table,
            dialect,
            columns,
            collections,
        })
    }

    #[must_use]
    pub fn key(&self) -> &'static str {
        self.key
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    #[must_use]
    pub fn collections(&self) -> &[ElementCollectionSpec] {
        &self.collections
    }

    /// Column for the given field name.
    #[must_use]
    pub fn column_for_field(&self, field: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|column| column.field == field)
    }

    /// Collection spec for the given field name.
    #[must_use]
    pub fn collection_for_field(&self, field: &str) -> Option<&ElementCollectionSpec> {
        self.collections.iter().find(|spec| spec.field == field)
    }

    /// The column identifying a row: the primary key, else the first unique
    /// column.
    #[must_use]
    pub fn unique_identifier(&self) -> Option<&ColumnDefinition> {
        self.columns
            .iter()
            .find(|column| column.primary)
            .or_else(|| self.columns.iter().find(|column| column.unique))
    }

    /// Render the CREATE TABLE statement for the owner table.
    #[must_use]
    pub fn create_table_sql(&self) -> String {
        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|column| column.definition(self.dialect))
            .collect();

        for column in &self.columns {
            if column.primary {
                // SQLite autoincrement columns carry the key inline.
                if self.dialect == Dialect::Sqlite && column.autoincrement {
                    continue;
                }
                parts.push(
                    SqlConstraint::new(
                        ConstraintKind::PrimaryKey,
                        format!("{}_{}", self.table, column.name),
                        column.name.clone(),
                    )
                    .render(),
                );
            } else if column.unique {
                parts.push(
                    SqlConstraint::new(
                        ConstraintKind::Unique,
                        format!("{}_{}", self.table, column.name),
                        column.name.clone(),
                    )
                    .render(),
                );
            }
            if let Some(foreign_key) = &column.foreign_key {
                parts.push(
                    SqlConstraint::foreign_key(
                        format!("{}_{}", self.table, column.name),
                        &column.name,
                        &foreign_key.target(),
                    )
                    .render(),
                );
            }
            if let Some(check) = &column.check {
                parts.push(
                    SqlConstraint::new(
                        ConstraintKind::Check,
                        format!("{}_{}", self.table, column.name),
                        check.clone(),
                    )
                    .render(),
                );
            }
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table,
            parts.join(", ")
        )
    }

    /// Render the CREATE TABLE statements for every element-collection side
    /// table, in field declaration order.
    #[must_use]
    pub fn create_collection_tables_sql(&self) -> Vec<String> {
        let owner_key_type = self
            .unique_identifier()
            .map_or(ColumnType::BIGINT, |column| column.column_type.clone());

        self.collections
            .iter()
            .map(|spec| {
                let mut parts = vec![
                    format!(
                        "{} {} NOT NULL",
                        spec.reference_column,
                        owner_key_type.definition(self.dialect)
                    ),
                    format!(
                        "{} {}{}",
                        spec.value_column,
                        spec.value_type.definition(self.dialect),
                        if spec.nullable { "" } else { " NOT NULL" }
                    ),
                ];
                let owner_target = match self.unique_identifier() {
                    Some(identifier) => format!("{}({})", self.table, identifier.name),
                    None => self.table.clone(),
                };
                parts.push(
                    SqlConstraint::foreign_key(
                        format!("{}_{}", spec.table, spec.reference_column),
                        &spec.reference_column,
                        &owner_target,
                    )
                    .render(),
                );
                if let Some(element_reference) = &spec.element_reference {
                    parts.push(
                        SqlConstraint::foreign_key(
                            format!("{}_{}", spec.table, spec.value_column),
                            &spec.value_column,
                            &element_reference.target(),
                        )
                        .render(),
                    );
                }
                format!(
                    "CREATE TABLE IF NOT EXISTS {} ({})",
                    spec.table,
                    parts.join(", ")
                )
            })
            .collect()
    }
}

fn derive_collection(
    descriptor: &FieldDescriptor,
    owner_table: &str,
    naming: &dyn crate::naming::NamingStrategy,
    registry: &ModelRegistry,
) -> Result<Option<ElementCollectionSpec>, OrmError> {
    let DeclaredType::List { element } = &descriptor.declared else {
        return Ok(None);
    };

    let value_column = match descriptor.collection.value_column {
        Some(explicit) => naming.column(explicit),
        None => match descriptor.column_name {
            Some(explicit) => naming.column(explicit),
            None => naming.column(&descriptor.name.to_lowercase()),
        },
    };
    let table = match descriptor.collection.table {
        Some(explicit) => naming.table(explicit),
        None => format!("{owner_table}_{value_column}"),
    };
    let reference_column = match descriptor.collection.reference_column {
        Some(explicit) => naming.column(explicit),
        None => format!("{owner_table}_id"),
    };

    let (base_kind, enum_type, element_reference) = match element.as_deref() {
        Some(DeclaredType::Scalar(kind)) => (*kind, None, None),
        Some(DeclaredType::Enum(_)) => {
            let kind = descriptor.enum_storage.scalar_kind();
            let column_type = match descriptor.enum_storage {
                crate::schema::field::EnumStorage::Ordinal => ColumnType::INTEGER,
                crate::schema::field::EnumStorage::Value => ColumnType::STRING,
            };
            (kind, Some(column_type), None)
        }
        Some(DeclaredType::Object { model_key }) => {
            let Ok(referenced) = registry.schema_by_key(model_key) else {
                warn!(
                    field = descriptor.name,
                    model = model_key,
                    "referenced model is not registered, excluding the collection"
                );
                return Ok(None);
            };
            let Some(identifier) = referenced.unique_identifier() else {
                warn!(
                    field = descriptor.name,
                    model = model_key,
                    "referenced model has no unique identifier, excluding the collection"
                );
                return Ok(None);
            };
            (
                identifier.storage_kind,
                Some(identifier.column_type.clone()),
                Some(ForeignKeySpec {
                    reference: referenced.table_name().to_owned(),
                    referenced_column: Some(identifier.name.clone()),
                    inferred: true,
                }),
            )
        }
        Some(DeclaredType::List { .. }) | None => {
            warn!(
                field = descriptor.name,
                "collection field has no usable element type, excluding it"
            );
            return Ok(None);
        }
    };

    let chain = if element_reference.is_some() {
        ConverterChain::identity(base_kind)
    } else {
        ConverterChain::resolve(base_kind, descriptor.converters.clone())
    };
    let storage_kind = chain.output_kind();

    let value_type = match enum_type {
        Some(column_type) if chain.is_empty() => column_type,
        _ => match registry.mapper().column_type(storage_kind) {
            Some(column_type) => column_type,
            None => {
                warn!(
                    field = descriptor.name,
                    kind = ?storage_kind,
                    "no column type for collection elements, excluding the field"
                );
                return Ok(None);
            }
        },
    };

    Ok(Some(ElementCollectionSpec {
        field: descriptor.name.to_owned(),
        table,
        reference_column,
        value_column,
        value_type,
        storage_kind,
        nullable: descriptor.nullable,
        chain,
        element_reference,
    }))
}
