use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use super::{new_id, Collection, Entity};
use crate::error::{Error, Result};

/// A customer of the shop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Customer {
    /// Record identifier.
    pub id: String,
    /// Full name.
    pub name: String,
    /// Phone / WhatsApp number.
    pub phone: String,
    /// E-mail address.
    pub email: String,
    /// CPF or CNPJ.
    pub document: String,
    /// Postal code (CEP).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    /// Street address.
    pub address: String,
}

impl Customer {
    /// Create a customer with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            phone: phone.into(),
            ..Self::default()
        }
    }

    /// Check the fields required to save a customer.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the name is blank.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("O nome do cliente é obrigatório."));
        }
        Ok(())
    }

    /// Stricter check used when a customer is created from the order flow.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the name or phone is blank.
    pub fn validate_quick(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.phone.trim().is_empty() {
            return Err(Error::validation("Preencha Nome e WhatsApp"));
        }
        Ok(())
    }
}

impl Entity for Customer {
    const COLLECTION: Collection = Collection::Customers;
    const KIND: &'static str = "customer";

    fn id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> String {
        self.name.to_lowercase()
    }

    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::from(&self.name), Cow::from(&self.phone)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_name() {
        let mut customer = Customer::new("  ", "");
        assert!(customer.validate().unwrap_err().is_validation());

        customer.name = "Ana".to_string();
        assert!(customer.validate().is_ok());
        assert!(customer.validate_quick().is_err());

        customer.phone = "11999999999".to_string();
        assert!(customer.validate_quick().is_ok());
    }

    #[test]
    fn test_deserialize_sparse_document() {
        let customer: Customer = serde_json::from_str(r#"{"id":"c1","name":"Ana"}"#).unwrap();
        assert_eq!(customer.name, "Ana");
        assert!(customer.email.is_empty());
        assert!(customer.zip_code.is_none());
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut customer = Customer::new("Ana", "1");
        customer.zip_code = Some("01001-000".to_string());
        let json = serde_json::to_value(&customer).unwrap();
        assert_eq!(json["zipCode"], "01001-000");
    }
}
