//! Core record types for fixos.
//!
//! Every business record is a plain document identified by a random string
//! id. References between records (`customer_id`, `equipment_id`,
//! `product_id`, `related_id`) are not enforced: deleting a customer leaves
//! its equipment and orders in place.

mod account;
mod business;
mod customer;
mod equipment;
mod item;
mod order;
mod product;
mod sale;
mod supplier;

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use account::{AccountStatus, AccountType, FinancialAccount};
pub use business::BusinessInfo;
pub use customer::Customer;
pub use equipment::{Equipment, EQUIPMENT_TYPES};
pub use item::LineItem;
pub use order::{
    HistoryEntry, Occurrence, OccurrenceKind, OrderStatus, PaymentStatus, Priority, ServiceOrder,
};
pub use product::{Product, DEFAULT_CATEGORY, SERVICE_CATEGORY};
pub use sale::Sale;
pub use supplier::Supplier;

/// A named set of records of one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Customers.
    Customers,
    /// Catalogue items (parts and services).
    Products,
    /// Suppliers.
    Suppliers,
    /// Customer devices.
    Equipment,
    /// Service orders.
    Orders,
    /// Direct sales.
    Sales,
    /// Payables and receivables.
    FinancialAccounts,
}

impl Collection {
    /// Every entity collection, in push order.
    pub const ALL: [Collection; 7] = [
        Self::Customers,
        Self::Suppliers,
        Self::Products,
        Self::Equipment,
        Self::Orders,
        Self::Sales,
        Self::FinancialAccounts,
    ];

    /// Table name in both the local and the remote store.
    #[must_use]
    pub fn table(self) -> &'static str {
        match self {
            Self::Customers => "customers",
            Self::Products => "products",
            Self::Suppliers => "suppliers",
            Self::Equipment => "equipment",
            Self::Orders => "orders",
            Self::Sales => "sales",
            Self::FinancialAccounts => "financial_accounts",
        }
    }

    /// Whether listings are newest/highest first.
    #[must_use]
    pub fn descending(self) -> bool {
        matches!(self, Self::Orders | Self::Sales)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

impl FromStr for Collection {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.table() == s)
            .ok_or_else(|| crate::Error::internal(format!("unknown collection: {s}")))
    }
}

/// A record that lives in a [`Collection`].
pub trait Entity: Serialize + DeserializeOwned + Clone {
    /// The collection holding records of this type.
    const COLLECTION: Collection;

    /// Human name used in messages.
    const KIND: &'static str;

    /// The record's identifier.
    fn id(&self) -> &str;

    /// Key listings are ordered by.
    fn sort_key(&self) -> String;

    /// Fields that substring search looks at.
    fn search_fields(&self) -> Vec<Cow<'_, str>>;

    /// Case-insensitive substring match over [`Entity::search_fields`].
    ///
    /// An empty query matches everything.
    fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        needle.is_empty()
            || self
                .search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Generate a new random record identifier.
#[must_use]
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Keep only the records matching `query`.
#[must_use]
pub fn search<T: Entity>(records: Vec<T>, query: &str) -> Vec<T> {
    records.into_iter().filter(|r| r.matches(query)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_tables() {
        assert_eq!(Collection::Customers.table(), "customers");
        assert_eq!(Collection::FinancialAccounts.table(), "financial_accounts");
        assert_eq!(Collection::Orders.to_string(), "orders");
    }

    #[test]
    fn test_collection_from_str() {
        for collection in Collection::ALL {
            assert_eq!(
                collection.table().parse::<Collection>().unwrap(),
                collection
            );
        }
        assert!("widgets".parse::<Collection>().is_err());
    }

    #[test]
    fn test_new_id_is_unique() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_search_case_insensitive() {
        let customers = vec![
            Customer::new("Maria Souza", "11999990000"),
            Customer::new("João Lima", "11888880000"),
        ];
        let found = search(customers.clone(), "maria");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Maria Souza");

        assert_eq!(search(customers.clone(), "8888").len(), 1);
        assert_eq!(search(customers, "").len(), 2);
    }
}
