//! Remote table layout.
//!
//! Each collection maps to a table with snake_case columns. Nested document
//! fields are kept in JSONB columns. The layout is described once here and
//! drives table creation, upserts and row decoding.

use crate::model::Collection;

/// How a column is stored remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// `TEXT`
    Text,
    /// `INT`
    Integer,
    /// `DECIMAL(12,2)`
    Decimal,
    /// `JSONB`
    Json,
}

impl ColumnKind {
    fn sql_type(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INT",
            Self::Decimal => "DECIMAL(12,2)",
            Self::Json => "JSONB",
        }
    }
}

/// One remote column and the document field it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Remote column name.
    pub column: &'static str,
    /// Document field name.
    pub field: &'static str,
    /// Storage type.
    pub kind: ColumnKind,
}

const fn col(column: &'static str, field: &'static str, kind: ColumnKind) -> ColumnSpec {
    ColumnSpec {
        column,
        field,
        kind,
    }
}

use ColumnKind::{Decimal, Integer, Json, Text};

const CUSTOMERS: &[ColumnSpec] = &[
    col("id", "id", Text),
    col("name", "name", Text),
    col("phone", "phone", Text),
    col("email", "email", Text),
    col("document", "document", Text),
    col("zip_code", "zipCode", Text),
    col("address", "address", Text),
];

const SUPPLIERS: &[ColumnSpec] = &[
    col("id", "id", Text),
    col("name", "name", Text),
    col("contact", "contact", Text),
    col("phone", "phone", Text),
];

const PRODUCTS: &[ColumnSpec] = &[
    col("id", "id", Text),
    col("name", "name", Text),
    col("sku", "sku", Text),
    col("price", "price", Decimal),
    col("cost", "cost", Decimal),
    col("stock", "stock", Integer),
    col("category", "category", Text),
];

const EQUIPMENT: &[ColumnSpec] = &[
    col("id", "id", Text),
    col("customer_id", "customerId", Text),
    col("type", "type", Text),
    col("brand", "brand", Text),
    col("model", "model", Text),
    col("serial_number", "serialNumber", Text),
];

const ORDERS: &[ColumnSpec] = &[
    col("id", "id", Text),
    col("order_number", "orderNumber", Integer),
    col("customer_id", "customerId", Text),
    col("equipment_id", "equipmentId", Text),
    col("status", "status", Text),
    col("payment_status", "paymentStatus", Text),
    col("payment_method", "paymentMethod", Text),
    col("problem_description", "problemDescription", Text),
    col("technical_report", "technicalReport", Text),
    col("accessories", "accessories", Text),
    col("checklist", "checklist", Json),
    col("checklist_observations", "checklistObservations", Text),
    col("photos", "photos", Json),
    col("items", "items", Json),
    col("labor_cost", "laborCost", Decimal),
    col("labor_cost_base", "laborCostBase", Decimal),
    col("diagnosis_fee", "diagnosisFee", Decimal),
    col("total", "total", Decimal),
    col("total_cost", "totalCost", Decimal),
    col("warranty_days", "warrantyDays", Integer),
    col("warranty_expiry_date", "warrantyExpiryDate", Text),
    col("created_at", "createdAt", Text),
    col("updated_at", "updatedAt", Text),
    col("technician", "technician", Text),
    col("priority", "priority", Text),
    col("history", "history", Json),
    col("occurrences", "occurrences", Json),
];

const SALES: &[ColumnSpec] = &[
    col("id", "id", Text),
    col("customer_id", "customerId", Text),
    col("items", "items", Json),
    col("total", "total", Decimal),
    col("total_cost", "totalCost", Decimal),
    col("payment_method", "paymentMethod", Text),
    col("created_at", "createdAt", Text),
];

const FINANCIAL_ACCOUNTS: &[ColumnSpec] = &[
    col("id", "id", Text),
    col("description", "description", Text),
    col("amount", "amount", Decimal),
    col("due_date", "dueDate", Text),
    col("type", "type", Text),
    col("status", "status", Text),
    col("category", "category", Text),
    col("created_at", "createdAt", Text),
    col("related_id", "relatedId", Text),
];

/// Columns of a collection's remote table, `id` first.
#[must_use]
pub fn columns(collection: Collection) -> &'static [ColumnSpec] {
    match collection {
        Collection::Customers => CUSTOMERS,
        Collection::Suppliers => SUPPLIERS,
        Collection::Products => PRODUCTS,
        Collection::Equipment => EQUIPMENT,
        Collection::Orders => ORDERS,
        Collection::Sales => SALES,
        Collection::FinancialAccounts => FINANCIAL_ACCOUNTS,
    }
}

/// `ORDER BY` clause used when listing a table.
#[must_use]
pub fn order_clause(collection: Collection) -> &'static str {
    match collection {
        Collection::Customers | Collection::Suppliers | Collection::Products => {
            " ORDER BY name ASC"
        }
        Collection::Equipment => "",
        Collection::Orders => " ORDER BY order_number DESC",
        Collection::Sales => " ORDER BY created_at DESC",
        Collection::FinancialAccounts => " ORDER BY due_date ASC",
    }
}

/// SQL statement to create the settings table.
pub const CREATE_SETTINGS_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS settings (key TEXT PRIMARY KEY, value JSONB)";

/// Statements that create every table, followed by additive column
/// migrations so older databases pick up columns added later.
#[must_use]
pub fn initialize_statements() -> Vec<String> {
    let mut creates = Vec::new();
    let mut alters = Vec::new();

    for collection in Collection::ALL {
        let table = collection.table();
        let specs = columns(collection);
        let definitions: Vec<String> = specs
            .iter()
            .map(|spec| {
                if spec.column == "id" {
                    "id TEXT PRIMARY KEY".to_string()
                } else {
                    format!("{} {}", spec.column, spec.kind.sql_type())
                }
            })
            .collect();
        creates.push(format!(
            "CREATE TABLE IF NOT EXISTS {table} ({})",
            definitions.join(", ")
        ));
        alters.extend(specs.iter().filter(|spec| spec.column != "id").map(|spec| {
            format!(
                "ALTER TABLE {table} ADD COLUMN IF NOT EXISTS {} {}",
                spec.column,
                spec.kind.sql_type()
            )
        }));
    }

    creates.push(CREATE_SETTINGS_TABLE.to_string());
    creates.extend(alters);
    creates
}

/// Upsert statement for a collection with `$n` placeholders in column order.
#[must_use]
pub fn upsert_statement(collection: Collection) -> String {
    let specs = columns(collection);
    let names: Vec<&str> = specs.iter().map(|spec| spec.column).collect();
    let placeholders: Vec<String> = (1..=specs.len()).map(|n| format!("${n}")).collect();
    let updates: Vec<String> = names
        .iter()
        .filter(|name| **name != "id")
        .map(|name| format!("{name} = EXCLUDED.{name}"))
        .collect();
    format!(
        "INSERT INTO {table} ({names}) VALUES ({placeholders}) ON CONFLICT (id) DO UPDATE SET {updates}",
        table = collection.table(),
        names = names.join(", "),
        placeholders = placeholders.join(", "),
        updates = updates.join(", ")
    )
}
