use std::borrow::Cow;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Collection, Entity, LineItem};

/// A direct counter sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    /// Record id.
    pub id: String,
    /// Buyer, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    /// Products sold.
    #[serde(default)]
    pub items: Vec<LineItem>,
    /// Sum of line subtotals.
    #[serde(default)]
    pub total: Decimal,
    /// Sum of line costs.
    #[serde(default)]
    pub total_cost: Decimal,
    /// Dinheiro, Cartão or Pix.
    #[serde(default)]
    pub payment_method: String,
    /// When the sale was made.
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl Entity for Sale {
    const COLLECTION: Collection = Collection::Sales;
    const KIND: &'static str = "sale";

    fn id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> String {
        self.created_at.to_rfc3339()
    }

    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::from(&self.payment_method)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_sales_sort_higher() {
        let older = Sale {
            id: "a".to_string(),
            customer_id: None,
            items: Vec::new(),
            total: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            payment_method: "Pix".to_string(),
            created_at: "2024-01-01T00:00:00Z".parse().unwrap(),
        };
        let newer = Sale {
            created_at: "2024-02-01T00:00:00Z".parse().unwrap(),
            ..older.clone()
        };
        assert!(older.sort_key() < newer.sort_key());
    }
}
