use std::borrow::Cow;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{new_id, Collection, Entity};
use crate::error::{Error, Result};

/// Category marking catalogue entries that are services, not stock.
pub const SERVICE_CATEGORY: &str = "Serviços";

/// Category given to new catalogue entries.
pub const DEFAULT_CATEGORY: &str = "Peças";

/// A catalogue item: a part kept in stock or a billable service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    /// Record identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Stock keeping unit.
    pub sku: String,
    /// Sale price.
    pub price: Decimal,
    /// Acquisition cost.
    pub cost: Decimal,
    /// Units on hand. Not enforced; may go negative.
    pub stock: i64,
    /// Catalogue category.
    pub category: String,
}

impl Default for Product {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            sku: String::new(),
            price: Decimal::ZERO,
            cost: Decimal::ZERO,
            stock: 0,
            category: DEFAULT_CATEGORY.to_string(),
        }
    }
}

impl Product {
    /// Create a product with a fresh id in the default category.
    #[must_use]
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            price,
            ..Self::default()
        }
    }

    /// Whether this entry is a service (stock not tracked).
    #[must_use]
    pub fn is_service(&self) -> bool {
        self.category == SERVICE_CATEGORY
    }

    /// Stock as shown to the user.
    #[must_use]
    pub fn stock_label(&self) -> String {
        if self.is_service() {
            "∞".to_string()
        } else {
            self.stock.to_string()
        }
    }

    /// Unit margin (price minus cost).
    #[must_use]
    pub fn margin(&self) -> Decimal {
        self.price - self.cost
    }

    /// # Errors
    ///
    /// Returns a validation error when the name is blank.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("O nome do item é obrigatório."));
        }
        Ok(())
    }
}

impl Entity for Product {
    const COLLECTION: Collection = Collection::Products;
    const KIND: &'static str = "product";

    fn id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> String {
        self.name.to_lowercase()
    }

    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::from(&self.name), Cow::from(&self.category)]
    }
}
