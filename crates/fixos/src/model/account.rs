use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{new_id, Collection, Entity};
use crate::error::{Error, Result};

/// Payable or receivable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    /// Conta a pagar.
    #[default]
    #[serde(rename = "PAGAR")]
    Payable,
    /// Conta a receber.
    #[serde(rename = "RECEBER")]
    Receivable,
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Payable => "PAGAR",
            Self::Receivable => "RECEBER",
        })
    }
}

/// Settlement state of an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    /// Still open.
    #[default]
    #[serde(rename = "PENDENTE")]
    Pending,
    /// Settled.
    #[serde(rename = "PAGO")]
    Paid,
}

impl AccountStatus {
    /// The other status.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Pending => Self::Paid,
            Self::Paid => Self::Pending,
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "PENDENTE",
            Self::Paid => "PAGO",
        })
    }
}

/// A bill to pay or an amount to receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialAccount {
    /// Record id.
    pub id: String,
    /// What the account is for.
    #[serde(default)]
    pub description: String,
    /// Positive amount.
    #[serde(default)]
    pub amount: Decimal,
    /// Due date.
    #[serde(default)]
    pub due_date: NaiveDate,
    /// Payable or receivable.
    #[serde(rename = "type", default)]
    pub kind: AccountType,
    /// Pending or paid.
    #[serde(default)]
    pub status: AccountStatus,
    /// Grouping label.
    #[serde(default = "default_category")]
    pub category: String,
    /// When it was registered.
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    /// Order or sale this account came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_id: Option<String>,
}

fn default_category() -> String {
    "Geral".to_string()
}

impl FinancialAccount {
    /// A pending payable in the default category.
    #[must_use]
    pub fn new(description: impl Into<String>, amount: Decimal, due_date: NaiveDate) -> Self {
        Self {
            id: new_id(),
            description: description.into(),
            amount,
            due_date,
            kind: AccountType::default(),
            status: AccountStatus::default(),
            category: default_category(),
            created_at: Utc::now(),
            related_id: None,
        }
    }

    /// # Errors
    ///
    /// Returns a validation error for a blank description or a non-positive amount.
    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() || self.amount <= Decimal::ZERO {
            return Err(Error::validation("Preencha os campos obrigatórios"));
        }
        Ok(())
    }

    /// Whether the account is still open.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == AccountStatus::Pending
    }
}

impl Entity for FinancialAccount {
    const COLLECTION: Collection = Collection::FinancialAccounts;
    const KIND: &'static str = "account";

    fn id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> String {
        self.due_date.format("%Y-%m-%d").to_string()
    }

    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::from(&self.description), Cow::from(&self.category)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_defaults() {
        let account = FinancialAccount::new("Aluguel", Decimal::new(150_000, 2), date("2024-06-10"));
        assert_eq!(account.kind, AccountType::Payable);
        assert_eq!(account.status, AccountStatus::Pending);
        assert_eq!(account.category, "Geral");
        assert!(account.is_pending());
    }

    #[test]
    fn test_validate_amount() {
        let mut account = FinancialAccount::new("Luz", Decimal::ZERO, date("2024-06-10"));
        assert!(account.validate().is_err());
        account.amount = Decimal::new(-5, 0);
        assert!(account.validate().is_err());
        account.amount = Decimal::new(5, 0);
        assert!(account.validate().is_ok());
        account.description = " ".to_string();
        assert!(account.validate().is_err());
    }

    #[test]
    fn test_sparse_document_decodes() {
        let account: FinancialAccount =
            serde_json::from_value(serde_json::json!({"id": "a1", "type": "RECEBER"})).unwrap();
        assert_eq!(account.amount, Decimal::ZERO);
        assert_eq!(account.kind, AccountType::Receivable);
        assert_eq!(account.status, AccountStatus::Pending);
    }

    #[test]
    fn test_toggle() {
        assert_eq!(AccountStatus::Pending.toggled(), AccountStatus::Paid);
        assert_eq!(AccountStatus::Paid.toggled(), AccountStatus::Pending);
    }

    #[test]
    fn test_wire_names() {
        let mut account = FinancialAccount::new("Cliente X", Decimal::ONE, date("2024-01-31"));
        account.kind = AccountType::Receivable;
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["type"], "RECEBER");
        assert_eq!(json["status"], "PENDENTE");
        assert_eq!(json["dueDate"], "2024-01-31");
    }
}
