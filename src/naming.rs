/// Maps raw column and table names to their database form.
///
/// The engine stores raw names on field descriptors and applies the active
/// strategy once, during schema derivation. Rebuilding a registry with a
/// different strategy changes only rendered table/column names, never the
/// field-to-column associations.
pub trait NamingStrategy: Send + Sync {
    fn column(&self, column_name: &str) -> String;

    fn table(&self, table_name: &str) -> String;
}

/// Default strategy: names pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityNaming;

impl NamingStrategy for IdentityNaming {
    fn column(&self, column_name: &str) -> String {
        column_name.to_owned()
    }

    fn table(&self, table_name: &str) -> String {
        table_name.to_owned()
    }
}

/// Prefixes every table name, leaving columns untouched. Useful when several
/// applications share one database file.
#[derive(Debug, Clone)]
pub struct TablePrefixNaming {
    prefix: String,
}

impl TablePrefixNaming {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl NamingStrategy for TablePrefixNaming {
    fn column(&self, column_name: &str) -> String {
        column_name.to_owned()
    }

    fn table(&self, table_name: &str) -> String {
        format!("{}{}", self.prefix, table_name)
    }
}
