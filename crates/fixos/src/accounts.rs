//! Accounts payable and receivable.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::model::{AccountStatus, AccountType, FinancialAccount};
use crate::remote::RemoteStore;
use crate::repository::Repository;

/// Which accounts to show. `None` means all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountFilter {
    /// Payable or receivable.
    pub kind: Option<AccountType>,
    /// Pending or paid.
    pub status: Option<AccountStatus>,
}

impl AccountFilter {
    /// Whether `account` passes both filters.
    #[must_use]
    pub fn matches(&self, account: &FinancialAccount) -> bool {
        self.kind.map_or(true, |k| account.kind == k)
            && self.status.map_or(true, |s| account.status == s)
    }

    /// Keep the matching accounts, soonest due first.
    #[must_use]
    pub fn apply(&self, accounts: Vec<FinancialAccount>) -> Vec<FinancialAccount> {
        let mut kept: Vec<_> = accounts.into_iter().filter(|a| self.matches(a)).collect();
        kept.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));
        kept
    }
}

/// Pending totals over a set of accounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    /// Pending amounts to pay.
    pub payable: Decimal,
    /// Pending amounts to receive.
    pub receivable: Decimal,
}

impl AccountSummary {
    /// Receivable minus payable.
    #[must_use]
    pub fn balance(&self) -> Decimal {
        self.receivable - self.payable
    }
}

/// Sum pending amounts per type.
#[must_use]
pub fn summarize(accounts: &[FinancialAccount]) -> AccountSummary {
    accounts
        .iter()
        .filter(|a| a.is_pending())
        .fold(AccountSummary::default(), |mut summary, a| {
            match a.kind {
                AccountType::Payable => summary.payable += a.amount,
                AccountType::Receivable => summary.receivable += a.amount,
            }
            summary
        })
}

/// Status as shown to the user: a settled receivable reads RECEBIDO.
#[must_use]
pub fn status_label(account: &FinancialAccount) -> &'static str {
    match (account.status, account.kind) {
        (AccountStatus::Pending, _) => "PENDENTE",
        (AccountStatus::Paid, AccountType::Payable) => "PAGO",
        (AccountStatus::Paid, AccountType::Receivable) => "RECEBIDO",
    }
}

/// Validate and store an account.
///
/// # Errors
///
/// Returns a validation error for a blank description or non-positive
/// amount, or an error when the local store fails.
pub async fn save_account<R: RemoteStore>(
    repo: &Repository<R>,
    account: &FinancialAccount,
) -> Result<()> {
    account.validate()?;
    repo.save(account).await
}

/// Flip an account between PENDENTE and PAGO.
///
/// # Errors
///
/// Returns an error when the account does not exist or the local store fails.
pub async fn toggle_status<R: RemoteStore>(
    repo: &Repository<R>,
    id: &str,
) -> Result<FinancialAccount> {
    let mut account = repo.require::<FinancialAccount>(id).await?;
    account.status = account.status.toggled();
    repo.save(&account).await?;
    debug!(account = %account.id, status = %account.status, "account status toggled");
    Ok(account)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::remote::MemoryRemote;
    use crate::storage::Storage;

    fn account(kind: AccountType, status: AccountStatus, amount: i64, day: u32) -> FinancialAccount {
        let mut a = FinancialAccount::new(
            "Aluguel",
            Decimal::new(amount, 0),
            NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
        );
        a.kind = kind;
        a.status = status;
        a
    }

    fn sample() -> Vec<FinancialAccount> {
        vec![
            account(AccountType::Payable, AccountStatus::Pending, 100, 10),
            account(AccountType::Payable, AccountStatus::Paid, 50, 5),
            account(AccountType::Receivable, AccountStatus::Pending, 300, 20),
            account(AccountType::Receivable, AccountStatus::Pending, 20, 1),
        ]
    }

    #[test]
    fn test_summary_counts_only_pending() {
        let summary = summarize(&sample());
        assert_eq!(summary.payable, Decimal::new(100, 0));
        assert_eq!(summary.receivable, Decimal::new(320, 0));
        assert_eq!(summary.balance(), Decimal::new(220, 0));
    }

    #[test]
    fn test_filter_by_type_and_status() {
        let payable = AccountFilter {
            kind: Some(AccountType::Payable),
            status: None,
        }
        .apply(sample());
        assert_eq!(payable.len(), 2);
        assert_eq!(summarize(&payable).receivable, Decimal::ZERO);

        let pending = AccountFilter {
            kind: None,
            status: Some(AccountStatus::Pending),
        }
        .apply(sample());
        assert_eq!(pending.len(), 3);
        assert_eq!(pending[0].amount, Decimal::new(20, 0));

        assert_eq!(AccountFilter::default().apply(sample()).len(), 4);
    }

    #[test]
    fn test_status_label() {
        let paid = account(AccountType::Receivable, AccountStatus::Paid, 1, 1);
        assert_eq!(status_label(&paid), "RECEBIDO");
        let open = account(AccountType::Receivable, AccountStatus::Pending, 1, 1);
        assert_eq!(status_label(&open), "PENDENTE");
    }

    #[tokio::test]
    async fn test_save_and_toggle() {
        let repo: Repository<MemoryRemote> = Repository::local(Storage::open_in_memory().unwrap());
        let bill = account(AccountType::Payable, AccountStatus::Pending, 80, 15);
        save_account(&repo, &bill).await.unwrap();

        let toggled = toggle_status(&repo, &bill.id).await.unwrap();
        assert_eq!(toggled.status, AccountStatus::Paid);
        let toggled = toggle_status(&repo, &bill.id).await.unwrap();
        assert_eq!(toggled.status, AccountStatus::Pending);

        let mut invalid = bill.clone();
        invalid.amount = Decimal::ZERO;
        assert!(save_account(&repo, &invalid).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_resave_updates_in_place() {
        let repo: Repository<MemoryRemote> = Repository::local(Storage::open_in_memory().unwrap());
        let bill = account(AccountType::Payable, AccountStatus::Pending, 80, 15);
        save_account(&repo, &bill).await.unwrap();

        let mut edited = repo.require::<FinancialAccount>(&bill.id).await.unwrap();
        edited.amount = Decimal::new(9_990, 2);
        edited.kind = AccountType::Receivable;
        edited.due_date = NaiveDate::from_ymd_opt(2024, 7, 5).unwrap();
        save_account(&repo, &edited).await.unwrap();

        let all = repo.list::<FinancialAccount>().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].amount, Decimal::new(9_990, 2));
        assert_eq!(all[0].kind, AccountType::Receivable);
        assert_eq!(all[0].created_at, bill.created_at);
    }
}
