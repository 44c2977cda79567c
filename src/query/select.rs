//! SELECT statement construction.

use crate::error::OrmError;
use crate::query::comparison::ParameterizedComparison;
use crate::schema::model::ModelSchema;
use crate::types::ParameterizedStatement;

/// Sort direction for an ORDER BY term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

impl Order {
    fn as_sql(self) -> &'static str {
        match self {
            Order::Ascending => "ASC",
            Order::Descending => "DESC",
        }
    }
}

/// Aggregate functions a query can project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Min,
    Max,
    Count,
    Avg,
    Sum,
}

impl Aggregate {
    fn function(self) -> &'static str {
        match self {
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
            Aggregate::Count => "COUNT",
            Aggregate::Avg => "AVG",
            Aggregate::Sum => "SUM",
        }
    }
}

/// Builder for parameterized SELECT statements.
///
/// Aggregates and row-shaping modifiers are mutually exclusive: selecting an
/// aggregate clears DISTINCT, LIMIT, and any previous aggregate, while
/// DISTINCT or LIMIT clear a pending aggregate (but not each other).
#[derive(Debug, Clone)]
pub struct SelectQuery {
    table: String,
    columns: Vec<String>,
    filter: Option<ParameterizedComparison>,
    order: Vec<(String, Order)>,
    distinct: bool,
    limit: Option<u64>,
    aggregate: Option<(Aggregate, String)>,
}

impl SelectQuery {
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        SelectQuery {
            table: table.into(),
            columns: Vec::new(),
            filter: None,
            order: Vec::new(),
            distinct: false,
            limit: None,
            aggregate: None,
        }
    }

    /// Query a schema's table, projecting its columns in schema order.
    #[must_use]
    pub fn from_schema(schema: &ModelSchema) -> Self {
        let mut query = SelectQuery::new(schema.table_name());
        query.columns = schema
            .columns()
            .iter()
            .map(|column| column.name.clone())
            .collect();
        query
    }

    /// Replace the projected columns.
    #[must_use]
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn filter(mut self, comparison: ParameterizedComparison) -> Self {
        if !comparison.is_empty() {
            self.filter = Some(comparison);
        }
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Self {
        self.order.push((column.into(), order));
        self
    }

    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self.aggregate = None;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self.aggregate = None;
        self
    }

    #[must_use]
    pub fn min(self, column: impl Into<String>) -> Self {
        self.with_aggregate(Aggregate::Min, column.into())
    }

    #[must_use]
    pub fn max(self, column: impl Into<String>) -> Self {
        self.with_aggregate(Aggregate::Max, column.into())
    }

    #[must_use]
    pub fn count(self, column: impl Into<String>) -> Self {
        self.with_aggregate(Aggregate::Count, column.into())
    }

    #[must_use]
    pub fn avg(self, column: impl Into<String>) -> Self {
        self.with_aggregate(Aggregate::Avg, column.into())
    }

    #[must_use]
    pub fn sum(self, column: impl Into<String>) -> Self {
        self.with_aggregate(Aggregate::Sum, column.into())
    }

    fn with_aggregate(mut self, aggregate: Aggregate, column: String) -> Self {
        self.aggregate = Some((aggregate, column));
        self.distinct = false;
        self.limit = None;
        self
    }

    /// Render the statement. Column, table, order, and parameter order follow
    /// insertion order, so the same builder calls always produce the same
    /// SQL.
    pub fn build(self) -> Result<ParameterizedStatement, OrmError> {
        let selector = match &self.aggregate {
            Some((aggregate, column)) => {
                let column = column.trim();
                if column.is_empty() {
                    return Err(OrmError::Config(format!(
                        "{} aggregate on `{}` needs a column",
                        aggregate.function(),
                        self.table
                    )));
                }
                format!("{}({column})", aggregate.function())
            }
            None => {
                let columns = if self.columns.is_empty() {
                    "*".to_owned()
                } else {
                    self.columns.join(", ")
                };
                if self.distinct {
                    format!("DISTINCT {columns}")
                } else {
                    columns
                }
            }
        };

        let mut sql = format!("SELECT {selector} FROM {}", self.table);
        let mut params = Vec::new();
        if let Some(filter) = self.filter {
            sql.push_str(" WHERE ");
            sql.push_str(&filter.fragment);
            params = filter.params;
        }
        if !self.order.is_empty() {
            let terms: Vec<String> = self
                .order
                .iter()
                .map(|(column, order)| format!("{column} {}", order.as_sql()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        Ok(ParameterizedStatement::new(sql, params))
    }
}
