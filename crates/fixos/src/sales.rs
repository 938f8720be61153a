//! Counter sales: the cart and its checkout.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{new_id, LineItem, Product, Sale};
use crate::remote::RemoteStore;
use crate::repository::Repository;

/// Payment method used when none is chosen.
pub const DEFAULT_PAYMENT_METHOD: &str = "Dinheiro";

/// Payment methods offered at the counter.
pub const PAYMENT_METHODS: [&str; 3] = ["Dinheiro", "Cartão", "Pix"];

/// Products that can be sold over the counter, filtered by name.
#[must_use]
pub fn catalogue(products: Vec<Product>, query: &str) -> Vec<Product> {
    let needle = query.trim().to_lowercase();
    products
        .into_iter()
        .filter(|p| !p.is_service())
        .filter(|p| p.name.to_lowercase().contains(&needle))
        .collect()
}

/// Products picked for a sale, with price and cost captured when added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` units of a product, within its stock.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the product is out of stock or the
    /// cart would hold more than the stock.
    pub fn add(&mut self, product: &Product, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Ok(());
        }
        match self.items.iter_mut().find(|i| i.product_id == product.id) {
            Some(line) => {
                let total = line
                    .quantity
                    .checked_add(quantity)
                    .filter(|total| i64::from(*total) <= product.stock)
                    .ok_or_else(|| Error::validation("Estoque insuficiente!"))?;
                line.quantity = total;
            }
            None => {
                if product.stock <= 0 {
                    return Err(Error::validation("Produto sem estoque!"));
                }
                if i64::from(quantity) > product.stock {
                    return Err(Error::validation("Estoque insuficiente!"));
                }
                self.items.push(LineItem {
                    product_id: product.id.clone(),
                    quantity,
                    price_at_time: product.price,
                    cost_at_time: product.cost,
                });
            }
        }
        Ok(())
    }

    /// Drop a product from the cart. Returns whether it was there.
    pub fn remove(&mut self, product_id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        self.items.len() != before
    }

    /// Lines in the order they were added.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Whether nothing has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sale value.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items.iter().map(LineItem::subtotal).sum()
    }

    /// Cost of the goods.
    #[must_use]
    pub fn total_cost(&self) -> Decimal {
        self.items.iter().map(LineItem::cost_subtotal).sum()
    }
}

/// Record the sale, then take the sold units out of stock.
///
/// # Errors
///
/// Returns a validation error for an empty cart, or an error when the local
/// store fails.
pub async fn finalize<R: RemoteStore>(
    repo: &Repository<R>,
    cart: Cart,
    payment_method: Option<&str>,
    customer_id: Option<&str>,
) -> Result<Sale> {
    if cart.is_empty() {
        return Err(Error::validation("O carrinho está vazio."));
    }

    let sale = Sale {
        id: new_id(),
        customer_id: customer_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(ToString::to_string),
        total: cart.total(),
        total_cost: cart.total_cost(),
        payment_method: payment_method
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_PAYMENT_METHOD)
            .to_string(),
        items: cart.items,
        created_at: Utc::now(),
    };
    repo.save(&sale).await?;

    for item in &sale.items {
        match repo.get::<Product>(&item.product_id).await? {
            Some(mut product) => {
                product.stock -= i64::from(item.quantity);
                repo.save(&product).await?;
                debug!(product = %product.id, stock = product.stock, "stock decremented");
            }
            None => warn!(product = %item.product_id, "sold product no longer exists"),
        }
    }

    info!(sale = %sale.id, total = %sale.total, "sale recorded");
    Ok(sale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SERVICE_CATEGORY;
    use crate::remote::MemoryRemote;
    use crate::storage::Storage;

    fn product(name: &str, price: i64, stock: i64) -> Product {
        let mut p = Product::new(name, Decimal::new(price, 0));
        p.cost = Decimal::new(price / 2, 0);
        p.stock = stock;
        p
    }

    #[test]
    fn test_catalogue_excludes_services() {
        let mut labor = product("Troca de tela", 100, 0);
        labor.category = SERVICE_CATEGORY.to_string();
        let items = vec![product("Tela iPhone", 300, 2), labor, product("Cabo USB", 20, 5)];

        let all = catalogue(items.clone(), "");
        assert_eq!(all.len(), 2);
        let found = catalogue(items, "TELA");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Tela iPhone");
    }

    #[test]
    fn test_cart_rejects_out_of_stock() {
        let mut cart = Cart::new();
        let err = cart.add(&product("Cabo", 20, 0), 1).unwrap_err();
        assert_eq!(err.to_string(), "Produto sem estoque!");
        assert!(cart.is_empty());
    }

    #[test]
    fn test_cart_rejects_exceeding_stock() {
        let mut cart = Cart::new();
        let cable = product("Cabo", 20, 2);
        cart.add(&cable, 1).unwrap();
        cart.add(&cable, 1).unwrap();
        assert_eq!(cart.items()[0].quantity, 2);

        let err = cart.add(&cable, 1).unwrap_err();
        assert_eq!(err.to_string(), "Estoque insuficiente!");
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn test_cart_rejects_quantity_overflow() {
        let mut cart = Cart::new();
        let cable = product("Cabo", 20, 5);
        cart.add(&cable, 3).unwrap();

        let err = cart.add(&cable, u32::MAX).unwrap_err();
        assert_eq!(err.to_string(), "Estoque insuficiente!");
        assert_eq!(cart.items()[0].quantity, 3);
    }

    #[test]
    fn test_cart_totals_and_remove() {
        let mut cart = Cart::new();
        let cable = product("Cabo", 20, 5);
        let case = product("Capa", 40, 5);
        cart.add(&cable, 2).unwrap();
        cart.add(&case, 1).unwrap();
        assert_eq!(cart.total(), Decimal::new(80, 0));
        assert_eq!(cart.total_cost(), Decimal::new(40, 0));

        assert!(cart.remove(&cable.id));
        assert!(!cart.remove(&cable.id));
        assert_eq!(cart.total(), Decimal::new(40, 0));
    }

    #[tokio::test]
    async fn test_finalize_records_sale_and_decrements_stock() {
        let repo: Repository<MemoryRemote> = Repository::local(Storage::open_in_memory().unwrap());
        let cable = product("Cabo", 20, 5);
        repo.save(&cable).await.unwrap();

        let mut cart = Cart::new();
        cart.add(&cable, 3).unwrap();
        let sale = finalize(&repo, cart, None, Some("")).await.unwrap();

        assert_eq!(sale.payment_method, "Dinheiro");
        assert_eq!(sale.customer_id, None);
        assert_eq!(sale.total, Decimal::new(60, 0));

        let stored: Product = repo.require(&cable.id).await.unwrap();
        assert_eq!(stored.stock, 2);
        assert_eq!(repo.list::<Sale>().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_finalize_rejects_empty_cart() {
        let repo: Repository<MemoryRemote> = Repository::local(Storage::open_in_memory().unwrap());
        let err = finalize(&repo, Cart::new(), Some("Pix"), None)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }
}
