//! Object to row mapping and row to object hydration.
//!
//! Mapping walks a model's field descriptors, runs each value through the
//! enum encoding and converter pipeline, and produces a [`RowMapping`] ready
//! to be turned into parameterized statements. Hydration runs the same
//! pipeline in reverse over a [`ResultRow`].

use std::any::Any;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::warn;

use crate::error::OrmError;
use crate::results::ResultRow;
use crate::schema::column::ColumnDefinition;
use crate::schema::field::{
    DeclaredType, EnumMeta, EnumStorage, EnumValue, FieldDescriptor, FieldValue, Model,
};
use crate::schema::model::{ElementCollectionSpec, ModelSchema};
use crate::schema::registry::ModelRegistry;
use crate::types::{ParameterizedStatement, SqlValue};

/// A foreign-key value that could not be resolved at mapping time, to be
/// filled in before the statement executes.
#[derive(Debug, Clone)]
pub struct PendingForeignReference {
    /// Field on the owning model
    pub field: String,
    /// Target of the reference, as `table(column)` or `table`
    pub target: String,
    /// The referenced identifier, if the referenced row already has one
    pub identifier: Option<SqlValue>,
}

/// The element values destined for one collection side table.
#[derive(Debug, Clone)]
pub struct ElementCollectionPayload {
    pub spec: ElementCollectionSpec,
    pub values: Vec<SqlValue>,
}

/// A mapped column value.
#[derive(Debug, Clone)]
pub enum MappedValue {
    Scalar(SqlValue),
    Pending(PendingForeignReference),
}

/// A model instance reduced to storage values.
///
/// Null scalars are filtered out, so `columns` holds only the values an
/// INSERT would carry. Collection payloads are kept aside; they become
/// separate statements once the owner row's identifier is known.
#[derive(Debug, Clone)]
pub struct RowMapping {
    pub schema: Arc<ModelSchema>,
    /// Rendered column name paired with its mapped value
    pub columns: Vec<(String, MappedValue)>,
    pub collections: Vec<ElementCollectionPayload>,
    /// The unique-identifier column and its value, when the instance has one
    pub identifier: Option<(String, SqlValue)>,
}

/// Map `object` into a row against its registered schema.
pub fn map_object<M: Model>(registry: &ModelRegistry, object: &M) -> Result<RowMapping, OrmError> {
    let schema = registry.schema::<M>()?;
    let mut columns: Vec<(String, MappedValue)> = Vec::new();
    let mut collections = Vec::new();

    for descriptor in &M::fields() {
        if descriptor.transient {
            continue;
        }
        if descriptor.is_collection() {
            if let Some(spec) = schema.collection_for_field(descriptor.name) {
                collections.push(map_collection(descriptor, spec, object)?);
            }
            continue;
        }
        let Some(column) = schema.column_for_field(descriptor.name) else {
            continue;
        };
        let value = read_field(descriptor, object)?;
        match map_scalar_field(descriptor, column, value)? {
            Some(mapped) => columns.push((column.name.clone(), mapped)),
            None => {}
        }
    }

    let identifier = schema.unique_identifier().and_then(|id_column| {
        columns.iter().find_map(|(name, value)| match value {
            MappedValue::Scalar(value) if name == &id_column.name && !value.is_null() => {
                Some((name.clone(), value.clone()))
            }
            _ => None,
        })
    });

    Ok(RowMapping {
        schema,
        columns,
        collections,
        identifier,
    })
}

fn read_field<M: Model>(descriptor: &FieldDescriptor, object: &M) -> Result<FieldValue, OrmError> {
    (descriptor.accessor.get)(object as &dyn Any).ok_or_else(|| {
        OrmError::Mapping(format!(
            "accessor for field `{}` on model `{}` rejected the instance",
            descriptor.name,
            M::KEY
        ))
    })
}

/// Run one scalar field through the pipeline. Returns `None` when the value
/// is null and the column tolerates its absence.
fn map_scalar_field(
    descriptor: &FieldDescriptor,
    column: &ColumnDefinition,
    value: FieldValue,
) -> Result<Option<MappedValue>, OrmError> {
    if let DeclaredType::Object { .. } = descriptor.declared {
        let identifier = match value {
            FieldValue::Refs(refs) => refs.into_iter().next().and_then(|r| r.identifier),
            FieldValue::Scalar(SqlValue::Null) => None,
            FieldValue::Scalar(value) => Some(value),
            other => {
                return Err(OrmError::Mapping(format!(
                    "field `{}` declared as an object reference produced {other:?}",
                    descriptor.name
                )));
            }
        };
        let target = column
            .foreign_key
            .as_ref()
            .map_or_else(|| column.name.clone(), crate::schema::ForeignKeySpec::target);
        return Ok(Some(MappedValue::Pending(PendingForeignReference {
            field: descriptor.name.to_owned(),
            target,
            identifier,
        })));
    }

    let raw = match value {
        FieldValue::Scalar(value) => value,
        FieldValue::Enum(value) => encode_enum(value, descriptor.enum_storage),
        other => {
            return Err(OrmError::Mapping(format!(
                "field `{}` declared as a scalar produced {other:?}",
                descriptor.name
            )));
        }
    };
    // A failed conversion drops the value; the null handling below decides
    // whether the column tolerates its absence.
    let stored = match column.chain.apply_to_sql(raw) {
        Ok(stored) => stored,
        Err(error) => {
            warn!(
                field = descriptor.name,
                %error,
                "dropping value that failed conversion"
            );
            SqlValue::Null
        }
    };

    if stored.is_null() {
        if column.nullable || column.autoincrement {
            return Ok(None);
        }
        return Err(OrmError::ConstraintViolation {
            column: column.name.clone(),
        });
    }
    Ok(Some(MappedValue::Scalar(stored)))
}

fn map_collection<M: Model>(
    descriptor: &FieldDescriptor,
    spec: &ElementCollectionSpec,
    object: &M,
) -> Result<ElementCollectionPayload, OrmError> {
    let value = read_field(descriptor, object)?;
    let raw_values: Vec<SqlValue> = match value {
        FieldValue::List(values) => values,
        FieldValue::EnumList(values) => values
            .into_iter()
            .map(|value| encode_enum(Some(value), descriptor.enum_storage))
            .collect(),
        FieldValue::Refs(refs) => refs
            .into_iter()
            .filter_map(|reference| {
                if reference.identifier.is_none() {
                    warn!(
                        field = descriptor.name,
                        "dropping collection reference without an identifier"
                    );
                }
                reference.identifier
            })
            .collect(),
        other => {
            return Err(OrmError::Mapping(format!(
                "field `{}` declared as a collection produced {other:?}",
                descriptor.name
            )));
        }
    };

    let mut values = Vec::with_capacity(raw_values.len());
    for raw in raw_values {
        match spec.chain.apply_to_sql(raw) {
            Ok(stored) if !stored.is_null() => values.push(stored),
            Ok(_) => {}
            Err(error) => {
                warn!(
                    field = descriptor.name,
                    %error,
                    "dropping collection element that failed conversion"
                );
            }
        }
    }

    if values.is_empty() && !spec.nullable {
        return Err(OrmError::ConstraintViolation {
            column: spec.value_column.clone(),
        });
    }

    Ok(ElementCollectionPayload {
        spec: spec.clone(),
        values,
    })
}

fn encode_enum(value: Option<EnumValue>, storage: EnumStorage) -> SqlValue {
    match value {
        None => SqlValue::Null,
        Some(value) => match storage {
            EnumStorage::Value => SqlValue::Text(value.name),
            EnumStorage::Ordinal => SqlValue::Int(value.ordinal),
        },
    }
}

impl RowMapping {
    /// Resolve every column to a concrete value, consulting `resolver` for
    /// pending references whose identifier is still unknown.
    pub fn resolved_columns(
        &self,
        resolver: impl Fn(&PendingForeignReference) -> Option<SqlValue>,
    ) -> Result<Vec<(String, SqlValue)>, OrmError> {
        let mut resolved = Vec::with_capacity(self.columns.len());
        for (name, value) in &self.columns {
            match value {
                MappedValue::Scalar(value) => resolved.push((name.clone(), value.clone())),
                MappedValue::Pending(pending) => {
                    let identifier = pending.identifier.clone().or_else(|| resolver(pending));
                    match identifier {
                        Some(value) => resolved.push((name.clone(), value)),
                        None => {
                            let nullable = self
                                .schema
                                .column_for_field(&pending.field)
                                .is_none_or(|column| column.nullable);
                            if !nullable {
                                return Err(OrmError::ConstraintViolation {
                                    column: name.clone(),
                                });
                            }
                        }
                    }
                }
            }
        }
        Ok(resolved)
    }

    /// Build the INSERT statement for the owner row.
    pub fn insert_statement(&self) -> Result<ParameterizedStatement, OrmError> {
        let resolved = self.resolved_columns(|_| None)?;
        let names: Vec<&str> = resolved.iter().map(|(name, _)| name.as_str()).collect();
        let placeholders = vec!["?"; resolved.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.schema.table_name(),
            names.join(", "),
            placeholders
        );
        let params = resolved.into_iter().map(|(_, value)| value).collect();
        Ok(ParameterizedStatement::new(sql, params))
    }

    /// Build the INSERT statements for every collection element, keyed to the
    /// given owner identifier.
    #[must_use]
    pub fn collection_statements(&self, owner: &SqlValue) -> Vec<ParameterizedStatement> {
        let mut statements = Vec::new();
        for payload in &self.collections {
            let sql = format!(
                "INSERT INTO {} ({}, {}) VALUES (?, ?)",
                payload.spec.table, payload.spec.reference_column, payload.spec.value_column
            );
            for value in &payload.values {
                statements.push(ParameterizedStatement::new(
                    sql.clone(),
                    vec![owner.clone(), value.clone()],
                ));
            }
        }
        statements
    }
}

/// Two mappings are equal only when both carry an identifier and agree on
/// table, identifier column, and identifier value. Identifier-less mappings
/// never compare equal, so no `Eq` implementation is provided.
impl PartialEq for RowMapping {
    fn eq(&self, other: &Self) -> bool {
        match (&self.identifier, &other.identifier) {
            (Some((column, value)), Some((other_column, other_value))) => {
                self.schema.table_name() == other.schema.table_name()
                    && column == other_column
                    && value == other_value
            }
            _ => false,
        }
    }
}

impl Hash for RowMapping {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.schema.table_name().hash(state);
        if let Some((column, value)) = &self.identifier {
            column.hash(state);
            hash_value(value, state);
        }
    }
}

fn hash_value<H: Hasher>(value: &SqlValue, state: &mut H) {
    match value {
        SqlValue::Int(n) => n.hash(state),
        SqlValue::Float(f) => f.to_bits().hash(state),
        SqlValue::Text(s) => s.hash(state),
        SqlValue::Bool(b) => b.hash(state),
        SqlValue::Timestamp(ts) => ts.hash(state),
        SqlValue::Null => 0u8.hash(state),
        SqlValue::Json(j) => j.to_string().hash(state),
        SqlValue::Blob(b) => b.hash(state),
    }
}

/// Hydrate a model instance from a result row.
///
/// Missing columns are skipped. Object-reference fields receive their raw
/// identifier wrapped in a [`crate::schema::ForeignRef`]; setters that reject
/// a value are logged and skipped.
pub fn hydrate<M: Model + Default>(
    registry: &ModelRegistry,
    row: &ResultRow,
) -> Result<M, OrmError> {
    let schema = registry.schema::<M>()?;
    let mut object = M::default();

    for descriptor in &M::fields() {
        if descriptor.transient || descriptor.is_collection() {
            continue;
        }
        let Some(set) = descriptor.accessor.set else {
            continue;
        };
        let Some(column) = schema.column_for_field(descriptor.name) else {
            continue;
        };
        let Some(stored) = row.get(&column.name) else {
            continue;
        };

        let value = column.chain.apply_to_model(stored.clone())?;
        let field_value = match &descriptor.declared {
            DeclaredType::Object { .. } => FieldValue::Refs(vec![crate::schema::ForeignRef {
                identifier: (!value.is_null()).then_some(value),
            }]),
            DeclaredType::Enum(meta) => {
                FieldValue::Enum(decode_enum(descriptor, meta, value)?)
            }
            _ => FieldValue::Scalar(value),
        };
        if !set(&mut object as &mut dyn Any, field_value) {
            warn!(
                field = descriptor.name,
                model = M::KEY,
                "setter rejected hydrated value"
            );
        }
    }

    Ok(object)
}

/// Apply element-collection rows from a side table to an already hydrated
/// instance.
pub fn apply_collection<M: Model>(
    registry: &ModelRegistry,
    object: &mut M,
    field: &str,
    rows: &[ResultRow],
) -> Result<(), OrmError> {
    let schema = registry.schema::<M>()?;
    let spec = schema.collection_for_field(field).ok_or_else(|| {
        OrmError::Mapping(format!(
            "field `{field}` on model `{}` is not an element collection",
            M::KEY
        ))
    })?;
    let descriptor = M::fields()
        .into_iter()
        .find(|descriptor| descriptor.name == field)
        .ok_or_else(|| {
            OrmError::Mapping(format!("model `{}` has no field `{field}`", M::KEY))
        })?;
    let Some(set) = descriptor.accessor.set else {
        return Err(OrmError::Mapping(format!(
            "field `{field}` on model `{}` is not writable",
            M::KEY
        )));
    };

    let mut scalars = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(stored) = row.get(&spec.value_column) else {
            continue;
        };
        scalars.push(spec.chain.apply_to_model(stored.clone())?);
    }

    let element_enum = match &descriptor.declared {
        DeclaredType::List { element } => match element.as_deref() {
            Some(DeclaredType::Enum(meta)) => Some(*meta),
            _ => None,
        },
        _ => None,
    };

    let field_value = match element_enum {
        Some(meta) => {
            let mut values = Vec::with_capacity(scalars.len());
            for scalar in scalars {
                if let Some(value) = decode_enum_value(&descriptor, meta, scalar)? {
                    values.push(value);
                }
            }
            FieldValue::EnumList(values)
        }
        None => FieldValue::List(scalars),
    };

    if !set(object as &mut dyn Any, field_value) {
        return Err(OrmError::Mapping(format!(
            "setter for field `{field}` on model `{}` rejected the collection",
            M::KEY
        )));
    }
    Ok(())
}

fn decode_enum(
    descriptor: &FieldDescriptor,
    meta: &'static EnumMeta,
    value: SqlValue,
) -> Result<Option<EnumValue>, OrmError> {
    decode_enum_value(descriptor, meta, value)
}

/// Decode a stored value back into an enum variant.
///
/// Ordinal storage accepts an in-range integer, a string holding one, or a
/// variant name as a last resort. Value storage accepts only a variant name.
fn decode_enum_value(
    descriptor: &FieldDescriptor,
    meta: &'static EnumMeta,
    value: SqlValue,
) -> Result<Option<EnumValue>, OrmError> {
    if value.is_null() {
        return Ok(None);
    }
    let decoded = match descriptor.enum_storage {
        EnumStorage::Ordinal => match &value {
            SqlValue::Int(ordinal) => meta
                .variant_at(*ordinal)
                .map(|name| EnumValue::new(name, *ordinal)),
            SqlValue::Text(text) => text
                .parse::<i64>()
                .ok()
                .and_then(|ordinal| {
                    meta.variant_at(ordinal)
                        .map(|name| EnumValue::new(name, ordinal))
                })
                .or_else(|| {
                    meta.ordinal_of(text)
                        .map(|ordinal| EnumValue::new(text.clone(), ordinal))
                }),
            _ => None,
        },
        EnumStorage::Value => match &value {
            SqlValue::Text(text) => meta
                .ordinal_of(text)
                .map(|ordinal| EnumValue::new(text.clone(), ordinal)),
            _ => None,
        },
    };
    decoded.map(Some).ok_or_else(|| {
        OrmError::Mapping(format!(
            "value {value:?} does not decode to a `{}` variant for field `{}`",
            meta.name, descriptor.name
        ))
    })
}
