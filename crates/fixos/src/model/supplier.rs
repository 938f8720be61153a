use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use super::{new_id, Collection, Entity};
use crate::error::{Error, Result};

/// A parts supplier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Supplier {
    /// Record identifier.
    pub id: String,
    /// Company name.
    pub name: String,
    /// Contact person.
    pub contact: String,
    /// Phone / WhatsApp number.
    pub phone: String,
}

impl Supplier {
    /// Create a supplier with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns a validation error when the company name is blank.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("O nome da empresa é obrigatório."));
        }
        Ok(())
    }
}

impl Entity for Supplier {
    const COLLECTION: Collection = Collection::Suppliers;
    const KIND: &'static str = "supplier";

    fn id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> String {
        self.name.to_lowercase()
    }

    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::from(&self.name),
            Cow::from(&self.contact),
            Cow::from(&self.phone),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(Supplier::new("").validate().is_err());
        assert!(Supplier::new("Peças Brasil").validate().is_ok());
    }

    #[test]
    fn test_matches_contact() {
        let mut supplier = Supplier::new("Peças Brasil");
        supplier.contact = "Carlos".to_string();
        assert!(supplier.matches("carl"));
        assert!(!supplier.matches("zzz"));
    }
}
