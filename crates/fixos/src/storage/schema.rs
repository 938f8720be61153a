//! `SQLite` schema definitions for fixos.
//!
//! Every entity collection shares one table shape: the id, a sort key, the
//! camelCase JSON document and a modification stamp. Lookups on document
//! fields go through expression indexes over `json_extract`.

use crate::model::Collection;

/// Table definition shared by every entity collection.
#[must_use]
pub fn create_collection_table(collection: Collection) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
    id TEXT PRIMARY KEY,
    sort_key TEXT NOT NULL,
    data TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
)",
        table = collection.table()
    )
}

/// Document fields indexed per collection.
#[must_use]
pub fn indexed_fields(collection: Collection) -> &'static [&'static str] {
    match collection {
        Collection::Customers => &["name", "phone"],
        Collection::Products => &["name", "category"],
        Collection::Suppliers => &["name"],
        Collection::Equipment => &["customerId", "model"],
        Collection::Orders => &["orderNumber", "customerId", "status"],
        Collection::Sales => &["customerId", "createdAt"],
        Collection::FinancialAccounts => &["dueDate", "status"],
    }
}

/// Expression used both in index definitions and in lookups.
///
/// `SQLite` only uses an expression index when the query repeats the
/// expression verbatim.
#[must_use]
pub fn field_expr(field: &str) -> String {
    format!("json_extract(data, '$.{field}')")
}

/// Index statements for one collection.
#[must_use]
pub fn create_collection_indexes(collection: Collection) -> Vec<String> {
    let table = collection.table();
    let mut statements = vec![format!(
        "CREATE INDEX IF NOT EXISTS idx_{table}_sort ON {table}(sort_key)"
    )];
    statements.extend(indexed_fields(collection).iter().map(|field| {
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_{snake} ON {table}({expr})",
            snake = field.to_lowercase(),
            expr = field_expr(field)
        )
    }));
    statements
}

/// SQL statement to create the settings table.
pub const CREATE_SETTINGS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// SQL statement to create the outbox of remote mutations awaiting replay.
pub const CREATE_OUTBOX_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS sync_outbox (
    collection TEXT NOT NULL,
    record_id TEXT NOT NULL,
    operation TEXT NOT NULL,
    error TEXT,
    queued_at TEXT NOT NULL,
    PRIMARY KEY (collection, record_id)
)
";

/// All base schema statements in order.
#[must_use]
pub fn schema_statements() -> Vec<String> {
    let mut statements = Vec::new();
    for collection in Collection::ALL {
        statements.push(create_collection_table(collection));
        statements.extend(create_collection_indexes(collection));
    }
    statements.push(CREATE_SETTINGS_TABLE.to_string());
    statements.push(CREATE_METADATA_TABLE.to_string());
    statements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        let statements = schema_statements();
        assert!(!statements.is_empty());
        for stmt in &statements {
            assert!(!stmt.trim().is_empty());
        }
    }

    #[test]
    fn test_collection_table_contains_required_columns() {
        let sql = create_collection_table(Collection::Orders);
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS orders"));
        assert!(sql.contains("id TEXT PRIMARY KEY"));
        assert!(sql.contains("data TEXT NOT NULL"));
        assert!(sql.contains("sort_key TEXT NOT NULL"));
    }

    #[test]
    fn test_order_indexes() {
        let statements = create_collection_indexes(Collection::Orders);
        assert!(statements
            .iter()
            .any(|s| s.contains("idx_orders_customerid") && s.contains("$.customerId")));
        assert!(statements.iter().any(|s| s.contains("idx_orders_status")));
    }

    #[test]
    fn test_outbox_keyed_by_record() {
        assert!(CREATE_OUTBOX_TABLE.contains("PRIMARY KEY (collection, record_id)"));
    }
}
