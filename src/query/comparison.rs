//! WHERE-clause construction with parameter binding.

use tracing::warn;

use crate::mapping::{MappedValue, RowMapping};
use crate::schema::model::ModelSchema;
use crate::types::SqlValue;

/// Comparison operators usable in a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    IsNull,
    NotNull,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Between,
    Like,
    In,
}

impl ComparisonOperator {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            ComparisonOperator::IsNull => "IS NULL",
            ComparisonOperator::NotNull => "IS NOT NULL",
            ComparisonOperator::Equal => "=",
            ComparisonOperator::NotEqual => "<>",
            ComparisonOperator::Greater => ">",
            ComparisonOperator::GreaterEqual => ">=",
            ComparisonOperator::Less => "<",
            ComparisonOperator::LessEqual => "<=",
            ComparisonOperator::Between => "BETWEEN",
            ComparisonOperator::Like => "LIKE",
            ComparisonOperator::In => "IN",
        }
    }

    /// Number of bound parameters the operator takes; `None` means any
    /// non-zero count.
    #[must_use]
    pub fn arity(self) -> Option<usize> {
        match self {
            ComparisonOperator::IsNull | ComparisonOperator::NotNull => Some(0),
            ComparisonOperator::Between => Some(2),
            ComparisonOperator::In => None,
            _ => Some(1),
        }
    }
}

/// How consecutive comparisons are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl Logic {
    fn joiner(self) -> &'static str {
        match self {
            Logic::And => " AND ",
            Logic::Or => " OR ",
        }
    }
}

/// A rendered filter fragment with its bound parameters.
#[derive(Debug, Clone, Default)]
pub struct ParameterizedComparison {
    pub fragment: String,
    pub params: Vec<SqlValue>,
}

impl ParameterizedComparison {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragment.is_empty()
    }
}

/// Builds a WHERE clause one comparison at a time.
///
/// Invalid input never poisons the builder: a blank column or a parameter
/// count that does not fit the operator is logged and skipped.
#[derive(Debug, Default)]
pub struct SqlComparisonBuilder {
    logic: Logic,
    fragments: Vec<String>,
    params: Vec<SqlValue>,
}

impl SqlComparisonBuilder {
    #[must_use]
    pub fn new(logic: Logic) -> Self {
        SqlComparisonBuilder {
            logic,
            fragments: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Add one comparison against `column`.
    #[must_use]
    pub fn cmp(
        mut self,
        column: &str,
        operator: ComparisonOperator,
        values: Vec<SqlValue>,
    ) -> Self {
        let column = column.trim();
        if column.is_empty() {
            warn!("ignoring comparison with a blank column name");
            return self;
        }
        match operator.arity() {
            Some(expected) if values.len() != expected => {
                warn!(
                    column,
                    operator = operator.as_sql(),
                    expected,
                    found = values.len(),
                    "ignoring comparison with the wrong parameter count"
                );
                return self;
            }
            None if values.is_empty() => {
                warn!(column, "ignoring IN comparison with no values");
                return self;
            }
            _ => {}
        }

        let fragment = match operator {
            ComparisonOperator::IsNull | ComparisonOperator::NotNull => {
                format!("{column} {}", operator.as_sql())
            }
            ComparisonOperator::Between => format!("{column} BETWEEN ? AND ?"),
            ComparisonOperator::In => {
                format!("{column} IN ({})", vec!["?"; values.len()].join(", "))
            }
            _ => format!("{column} {} ?", operator.as_sql()),
        };
        self.fragments.push(fragment);
        self.params.extend(values);
        self
    }

    /// Equality shorthand.
    #[must_use]
    pub fn eq(self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.cmp(column, ComparisonOperator::Equal, vec![value.into()])
    }

    /// Add a parenthesized sub-clause built with its own logic.
    #[must_use]
    pub fn nested(mut self, inner: SqlComparisonBuilder) -> Self {
        let built = inner.build();
        if !built.is_empty() {
            self.fragments.push(format!("({})", built.fragment));
            self.params.extend(built.params);
        }
        self
    }

    /// Match the row a mapping describes: its identifier when it has one,
    /// otherwise every mapped scalar column.
    #[must_use]
    pub fn matching(self, mapping: &RowMapping) -> Self {
        if let Some((column, value)) = &mapping.identifier {
            return self.cmp(column, ComparisonOperator::Equal, vec![value.clone()]);
        }
        let mut builder = self;
        for (column, value) in &mapping.columns {
            if let MappedValue::Scalar(value) = value {
                builder = builder.cmp(column, ComparisonOperator::Equal, vec![value.clone()]);
            }
        }
        builder
    }

    /// Match a schema's unique-identifier column against `value`.
    #[must_use]
    pub fn id_match(self, schema: &ModelSchema, value: SqlValue) -> Self {
        match schema.unique_identifier() {
            Some(column) => self.cmp(&column.name, ComparisonOperator::Equal, vec![value]),
            None => {
                warn!(
                    table = schema.table_name(),
                    "ignoring identifier match on a table without a unique identifier"
                );
                self
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    #[must_use]
    pub fn build(self) -> ParameterizedComparison {
        ParameterizedComparison {
            fragment: self.fragments.join(self.logic.joiner()),
            params: self.params,
        }
    }
}
