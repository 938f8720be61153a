//! Revenue reports over orders and sales.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::model::{OrderStatus, Product, Sale, ServiceOrder};
use crate::sales::{DEFAULT_PAYMENT_METHOD, PAYMENT_METHODS};

/// Where a transaction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionSource {
    /// A finished or delivered service order.
    #[serde(rename = "OS")]
    Order,
    /// A counter sale.
    #[serde(rename = "VENDA")]
    Sale,
}

/// One revenue entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Id of the order or sale.
    pub id: String,
    /// Order or sale.
    pub source: TransactionSource,
    /// "O.S. #1001" or "Venda Direta".
    pub description: String,
    /// Amount received.
    pub amount: Decimal,
    /// Order update time or sale time.
    pub date: DateTime<Utc>,
    /// Payment method.
    pub method: String,
}

/// Revenue for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceReport {
    /// `YYYY-MM`, or empty for all time.
    pub month: String,
    /// Newest first.
    pub transactions: Vec<Transaction>,
    /// Sum of every transaction.
    pub total: Decimal,
    /// Sum of order transactions.
    pub from_orders: Decimal,
    /// Sum of sale transactions.
    pub from_sales: Decimal,
    /// Known payment methods with a non-zero total, in display order.
    pub by_method: Vec<(String, Decimal)>,
}

/// Every revenue transaction, newest first.
#[must_use]
pub fn transactions(orders: &[ServiceOrder], sales: &[Sale]) -> Vec<Transaction> {
    let from_orders = orders
        .iter()
        .filter(|o| o.status.is_completed())
        .map(|o| Transaction {
            id: o.id.clone(),
            source: TransactionSource::Order,
            description: format!("O.S. #{}", o.order_number),
            amount: o.total,
            date: o.updated_at,
            method: o
                .payment_method
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
        });
    let from_sales = sales.iter().map(|s| Transaction {
        id: s.id.clone(),
        source: TransactionSource::Sale,
        description: "Venda Direta".to_string(),
        amount: s.total,
        date: s.created_at,
        method: s.payment_method.clone(),
    });

    let mut all: Vec<_> = from_orders.chain(from_sales).collect();
    all.sort_by(|a, b| b.date.cmp(&a.date));
    all
}

/// Revenue for the month `YYYY-MM`. An empty month covers everything.
#[must_use]
pub fn finance_report(orders: &[ServiceOrder], sales: &[Sale], month: &str) -> FinanceReport {
    let month = month.trim();
    let transactions: Vec<_> = transactions(orders, sales)
        .into_iter()
        .filter(|t| t.date.format("%Y-%m").to_string().starts_with(month))
        .collect();

    let total = sum_where(&transactions, |_| true);
    let from_orders = sum_where(&transactions, |t| t.source == TransactionSource::Order);
    let from_sales = sum_where(&transactions, |t| t.source == TransactionSource::Sale);
    let by_method = PAYMENT_METHODS
        .iter()
        .map(|m| ((*m).to_string(), sum_where(&transactions, |t| t.method == *m)))
        .filter(|(_, value)| *value > Decimal::ZERO)
        .collect();

    FinanceReport {
        month: month.to_string(),
        transactions,
        total,
        from_orders,
        from_sales,
        by_method,
    }
}

fn sum_where(transactions: &[Transaction], keep: impl Fn(&Transaction) -> bool) -> Decimal {
    transactions
        .iter()
        .filter(|t| keep(t))
        .map(|t| t.amount)
        .sum()
}

/// Figures for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    /// Sum of every order total.
    pub order_revenue: Decimal,
    /// Sum of every sale total.
    pub sales_revenue: Decimal,
    /// Orders plus sales.
    pub total_revenue: Decimal,
    /// Number of orders.
    pub order_count: usize,
    /// Count per status, in workflow order.
    pub status_counts: Vec<(OrderStatus, usize)>,
    /// Total revenue per order.
    pub average_ticket: Decimal,
    /// Non-service products at or below the threshold.
    pub low_stock: Vec<Product>,
}

/// Summarise the whole shop.
#[must_use]
pub fn dashboard(
    orders: &[ServiceOrder],
    sales: &[Sale],
    products: &[Product],
    low_stock_threshold: i64,
) -> Dashboard {
    let order_revenue: Decimal = orders.iter().map(|o| o.total).sum();
    let sales_revenue: Decimal = sales.iter().map(|s| s.total).sum();
    let total_revenue = order_revenue + sales_revenue;

    let status_counts = OrderStatus::ALL
        .into_iter()
        .map(|status| (status, orders.iter().filter(|o| o.status == status).count()))
        .collect();

    let divisor = Decimal::from(orders.len().max(1));
    let low_stock = products
        .iter()
        .filter(|p| !p.is_service() && p.stock <= low_stock_threshold)
        .cloned()
        .collect();

    Dashboard {
        order_revenue,
        sales_revenue,
        total_revenue,
        order_count: orders.len(),
        status_counts,
        average_ticket: (total_revenue / divisor).round_dp(2),
        low_stock,
    }
}
