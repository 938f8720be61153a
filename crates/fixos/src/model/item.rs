use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product line on an order or sale, priced at the time it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// The product sold.
    pub product_id: String,
    /// Units.
    pub quantity: u32,
    /// Unit price when the line was added.
    pub price_at_time: Decimal,
    /// Unit cost when the line was added.
    #[serde(default)]
    pub cost_at_time: Decimal,
}

impl LineItem {
    /// Line total at sale price.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.price_at_time * Decimal::from(self.quantity)
    }

    /// Line total at cost.
    #[must_use]
    pub fn cost_subtotal(&self) -> Decimal {
        self.cost_at_time * Decimal::from(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtotals() {
        let item = LineItem {
            product_id: "p1".to_string(),
            quantity: 3,
            price_at_time: Decimal::new(1050, 2),
            cost_at_time: Decimal::new(400, 2),
        };
        assert_eq!(item.subtotal(), Decimal::new(3150, 2));
        assert_eq!(item.cost_subtotal(), Decimal::new(1200, 2));
    }

    #[test]
    fn test_missing_cost_defaults_to_zero() {
        let item: LineItem =
            serde_json::from_str(r#"{"productId":"p1","quantity":1,"priceAtTime":10}"#).unwrap();
        assert_eq!(item.cost_at_time, Decimal::ZERO);
    }
}
