//! Shop settings stored in the key/value settings collection.

use std::fmt;

use crate::error::{Error, Result};
use crate::model::BusinessInfo;
use crate::remote::RemoteStore;
use crate::repository::Repository;

/// Setting key for the shop identity.
pub const BUSINESS_INFO_KEY: &str = "business_info";
/// Setting key for the intake inspection items.
pub const CHECKLIST_KEY: &str = "checklist";
/// Setting key for the default warranty length in days.
pub const DEFAULT_WARRANTY_KEY: &str = "default_warranty";

/// Warranty length used when nothing is configured.
pub const DEFAULT_WARRANTY_DAYS: u32 = 90;

/// Inspection items used when nothing is configured.
pub const DEFAULT_CHECKLIST: [&str; 6] = [
    "Liga",
    "Tela Íntegra",
    "Câmeras",
    "Bateria",
    "WiFi/Rede",
    "Carregamento",
];

/// Which printed document a set of terms belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermsKind {
    /// Intake receipt.
    Entry,
    /// Quote.
    Budget,
    /// Delivery and warranty.
    Exit,
}

impl TermsKind {
    /// Every kind, in document order.
    pub const ALL: [TermsKind; 3] = [Self::Entry, Self::Budget, Self::Exit];

    /// Setting key holding the terms text.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Entry => "terms_entry",
            Self::Budget => "terms_budget",
            Self::Exit => "terms_exit",
        }
    }

    /// Text used when nothing is configured.
    #[must_use]
    pub fn default_text(self) -> &'static str {
        match self {
            Self::Entry => "ANÁLISE EM 5 DIAS ÚTEIS.",
            Self::Budget => "ORÇAMENTO VÁLIDO POR 7 DIAS.",
            Self::Exit => "GARANTIA DE 90 DIAS.",
        }
    }

    /// Heading printed above the terms.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Entry => "TERMOS DE ENTRADA:",
            Self::Budget => "TERMOS DE ORÇAMENTO:",
            Self::Exit => "TERMOS DE SAÍDA / GARANTIA:",
        }
    }
}

impl fmt::Display for TermsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Entry => "entry",
            Self::Budget => "budget",
            Self::Exit => "exit",
        })
    }
}

/// Shop identity, or the default one.
///
/// # Errors
///
/// Returns an error when the local store fails.
pub async fn business_info<R: RemoteStore>(repo: &Repository<R>) -> Result<BusinessInfo> {
    repo.setting(BUSINESS_INFO_KEY, BusinessInfo::default()).await
}

/// # Errors
///
/// Returns a validation error for a blank name, or an error when the local store fails.
pub async fn save_business_info<R: RemoteStore>(
    repo: &Repository<R>,
    info: &BusinessInfo,
) -> Result<()> {
    if info.name.trim().is_empty() {
        return Err(Error::validation("O nome da empresa é obrigatório."));
    }
    repo.save_setting(BUSINESS_INFO_KEY, info).await
}

/// Intake inspection items.
///
/// # Errors
///
/// Returns an error when the local store fails.
pub async fn checklist_items<R: RemoteStore>(repo: &Repository<R>) -> Result<Vec<String>> {
    let defaults = DEFAULT_CHECKLIST.iter().map(ToString::to_string).collect();
    repo.setting(CHECKLIST_KEY, defaults).await
}

/// Append an inspection item. Blank input is ignored.
///
/// Returns the resulting list.
///
/// # Errors
///
/// Returns an error when the local store fails.
pub async fn add_checklist_item<R: RemoteStore>(
    repo: &Repository<R>,
    item: &str,
) -> Result<Vec<String>> {
    let mut items = checklist_items(repo).await?;
    let item = item.trim();
    if item.is_empty() {
        return Ok(items);
    }
    items.push(item.to_string());
    repo.save_setting(CHECKLIST_KEY, &items).await?;
    Ok(items)
}

/// Remove the inspection item at `index`.
///
/// Returns the resulting list.
///
/// # Errors
///
/// Returns a validation error for an index out of range.
pub async fn remove_checklist_item<R: RemoteStore>(
    repo: &Repository<R>,
    index: usize,
) -> Result<Vec<String>> {
    let mut items = checklist_items(repo).await?;
    if index >= items.len() {
        return Err(Error::validation(format!(
            "item {index} não existe (total: {})",
            items.len()
        )));
    }
    items.remove(index);
    repo.save_setting(CHECKLIST_KEY, &items).await?;
    Ok(items)
}

/// Terms text for a document kind.
///
/// # Errors
///
/// Returns an error when the local store fails.
pub async fn terms<R: RemoteStore>(repo: &Repository<R>, kind: TermsKind) -> Result<String> {
    repo.setting(kind.key(), kind.default_text().to_string())
        .await
}

/// # Errors
///
/// Returns an error when the local store fails.
pub async fn save_terms<R: RemoteStore>(
    repo: &Repository<R>,
    kind: TermsKind,
    text: &str,
) -> Result<()> {
    repo.save_setting(kind.key(), &text).await
}

/// Default warranty length for new orders.
///
/// # Errors
///
/// Returns an error when the local store fails.
pub async fn default_warranty<R: RemoteStore>(repo: &Repository<R>) -> Result<u32> {
    repo.setting(DEFAULT_WARRANTY_KEY, DEFAULT_WARRANTY_DAYS)
        .await
}

/// # Errors
///
/// Returns an error when the local store fails.
pub async fn save_default_warranty<R: RemoteStore>(repo: &Repository<R>, days: u32) -> Result<()> {
    repo.save_setting(DEFAULT_WARRANTY_KEY, &days).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryRemote;
    use crate::storage::Storage;

    fn repo() -> Repository<MemoryRemote> {
        Repository::local(Storage::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn test_defaults() {
        let repo = repo();
        assert_eq!(business_info(&repo).await.unwrap().name, "FIXOS ASSISTÊNCIA");
        assert_eq!(checklist_items(&repo).await.unwrap().len(), 6);
        assert_eq!(
            terms(&repo, TermsKind::Budget).await.unwrap(),
            "ORÇAMENTO VÁLIDO POR 7 DIAS."
        );
        assert_eq!(default_warranty(&repo).await.unwrap(), 90);
    }

    #[tokio::test]
    async fn test_checklist_add_and_remove() {
        let repo = repo();
        let items = add_checklist_item(&repo, "  Face ID  ").await.unwrap();
        assert_eq!(items.last().map(String::as_str), Some("Face ID"));
        assert_eq!(items.len(), 7);

        let unchanged = add_checklist_item(&repo, "   ").await.unwrap();
        assert_eq!(unchanged.len(), 7);

        let items = remove_checklist_item(&repo, 0).await.unwrap();
        assert_eq!(items[0], "Tela Íntegra");
        assert_eq!(checklist_items(&repo).await.unwrap().len(), 6);

        assert!(remove_checklist_item(&repo, 99)
            .await
            .unwrap_err()
            .is_validation());
    }

    #[tokio::test]
    async fn test_save_terms_and_warranty() {
        let repo = repo();
        save_terms(&repo, TermsKind::Exit, "GARANTIA DE 30 DIAS.")
            .await
            .unwrap();
        save_default_warranty(&repo, 30).await.unwrap();

        assert_eq!(
            terms(&repo, TermsKind::Exit).await.unwrap(),
            "GARANTIA DE 30 DIAS."
        );
        assert_eq!(default_warranty(&repo).await.unwrap(), 30);
    }

    #[tokio::test]
    async fn test_business_info_requires_name() {
        let repo = repo();
        let info = BusinessInfo {
            name: String::new(),
            ..BusinessInfo::default()
        };
        assert!(save_business_info(&repo, &info).await.is_err());
    }

    #[test]
    fn test_terms_titles() {
        assert_eq!(TermsKind::Exit.title(), "TERMOS DE SAÍDA / GARANTIA:");
        assert_eq!(TermsKind::Entry.key(), "terms_entry");
    }
}
