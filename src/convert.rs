//! Value converter chains applied between field values and column values.

use std::sync::Arc;

use tracing::warn;

use crate::error::OrmError;
use crate::types::SqlValue;
use crate::typing::ScalarKind;

/// Transforms a value on its way to the database and back.
///
/// Converters declare the scalar kind they consume and produce so chains can
/// be validated before any value flows through them.
pub trait ValueConverter: Send + Sync {
    /// Scalar kind consumed on the way to the database.
    fn input(&self) -> ScalarKind;
    /// Scalar kind produced on the way to the database.
    fn output(&self) -> ScalarKind;
    /// Convert a field value into its storage form.
    fn to_sql(&self, value: SqlValue) -> Result<SqlValue, OrmError>;
    /// Convert a storage value back into its field form.
    fn to_model(&self, value: SqlValue) -> Result<SqlValue, OrmError>;
}

/// An ordered, validated converter chain for a single column.
///
/// Validation checks that the first converter consumes the field's base kind
/// and that each converter's output feeds the next one's input. A chain that
/// fails validation is discarded entirely and the column stores the base kind
/// unchanged.
#[derive(Clone)]
pub struct ConverterChain {
    converters: Vec<Arc<dyn ValueConverter>>,
    base_kind: ScalarKind,
}

impl ConverterChain {
    /// Validate `converters` against `base_kind`, dropping the whole chain on
    /// the first mismatch.
    #[must_use]
    pub fn resolve(base_kind: ScalarKind, converters: Vec<Arc<dyn ValueConverter>>) -> Self {
        let mut expected = base_kind;
        for (position, converter) in converters.iter().enumerate() {
            if converter.input() != expected {
                warn!(
                    position,
                    expected = ?expected,
                    found = ?converter.input(),
                    "converter chain mismatch, ignoring all converters"
                );
                return ConverterChain {
                    converters: Vec::new(),
                    base_kind,
                };
            }
            expected = converter.output();
        }
        ConverterChain {
            converters,
            base_kind,
        }
    }

    /// Chain with no converters; values pass through untouched.
    #[must_use]
    pub fn identity(base_kind: ScalarKind) -> Self {
        ConverterChain {
            converters: Vec::new(),
            base_kind,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// The scalar kind that reaches the database after the full chain runs.
    #[must_use]
    pub fn output_kind(&self) -> ScalarKind {
        self.converters
            .last()
            .map_or(self.base_kind, |converter| converter.output())
    }

    /// Run the chain front to back, producing the storage value.
    pub fn apply_to_sql(&self, value: SqlValue) -> Result<SqlValue, OrmError> {
        let mut current = value;
        for converter in &self.converters {
            current = converter.to_sql(current)?;
        }
        Ok(current)
    }

    /// Run the chain back to front, recovering the field value.
    pub fn apply_to_model(&self, value: SqlValue) -> Result<SqlValue, OrmError> {
        let mut current = value;
        for converter in self.converters.iter().rev() {
            current = converter.to_model(current)?;
        }
        Ok(current)
    }
}

impl std::fmt::Debug for ConverterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterChain")
            .field("base_kind", &self.base_kind)
            .field("len", &self.converters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scale(i64);

    impl ValueConverter for Scale {
        fn input(&self) -> ScalarKind {
            ScalarKind::I64
        }
        fn output(&self) -> ScalarKind {
            ScalarKind::I64
        }
        fn to_sql(&self, value: SqlValue) -> Result<SqlValue, OrmError> {
            match value {
                SqlValue::Int(n) => Ok(SqlValue::Int(n * self.0)),
                other => Ok(other),
            }
        }
        fn to_model(&self, value: SqlValue) -> Result<SqlValue, OrmError> {
            match value {
                SqlValue::Int(n) => Ok(SqlValue::Int(n / self.0)),
                other => Ok(other),
            }
        }
    }

    struct Stringify;

    impl ValueConverter for Stringify {
        fn input(&self) -> ScalarKind {
            ScalarKind::I64
        }
        fn output(&self) -> ScalarKind {
            ScalarKind::Text
        }
        fn to_sql(&self, value: SqlValue) -> Result<SqlValue, OrmError> {
            match value {
                SqlValue::Int(n) => Ok(SqlValue::Text(n.to_string())),
                other => Ok(other),
            }
        }
        fn to_model(&self, value: SqlValue) -> Result<SqlValue, OrmError> {
            match value {
                SqlValue::Text(s) => s
                    .parse::<i64>()
                    .map(SqlValue::Int)
                    .map_err(|e| OrmError::Mapping(e.to_string())),
                other => Ok(other),
            }
        }
    }

    #[test]
    fn valid_chain_round_trips() {
        let chain = ConverterChain::resolve(
            ScalarKind::I64,
            vec![Arc::new(Scale(60)), Arc::new(Stringify)],
        );
        assert!(!chain.is_empty());
        assert_eq!(chain.output_kind(), ScalarKind::Text);

        let stored = chain.apply_to_sql(SqlValue::Int(2)).unwrap();
        assert_eq!(stored.as_text().as_deref(), Some("120"));
        let recovered = chain.apply_to_model(stored).unwrap();
        assert_eq!(recovered.as_int(), Some(2));
    }

    #[test]
    fn mismatched_chain_is_cleared() {
        // Stringify outputs Text, Scale expects I64; the whole chain is
        // dropped, not just the offending link.
        let chain = ConverterChain::resolve(
            ScalarKind::I64,
            vec![Arc::new(Stringify), Arc::new(Scale(60))],
        );
        assert!(chain.is_empty());
        assert_eq!(chain.output_kind(), ScalarKind::I64);
        let passthrough = chain.apply_to_sql(SqlValue::Int(7)).unwrap();
        assert_eq!(passthrough.as_int(), Some(7));
    }

    #[test]
    fn first_converter_must_accept_base_kind() {
        let chain = ConverterChain::resolve(ScalarKind::Text, vec![Arc::new(Scale(2))]);
        assert!(chain.is_empty());
    }
}
