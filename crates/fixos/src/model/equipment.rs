use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use super::{new_id, Collection, Entity};
use crate::error::{Error, Result};

/// Device types offered at intake.
pub const EQUIPMENT_TYPES: [&str; 8] = [
    "Smartphone",
    "Notebook",
    "Tablet",
    "Smartwatch",
    "Console",
    "Monitor",
    "Impressora",
    "Outros",
];

/// A customer's device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Equipment {
    /// Record identifier.
    pub id: String,
    /// Owner.
    pub customer_id: String,
    /// Device type, one of [`EQUIPMENT_TYPES`] by convention.
    #[serde(rename = "type")]
    pub kind: String,
    /// Manufacturer.
    pub brand: String,
    /// Model name.
    pub model: String,
    /// Serial number or IMEI.
    pub serial_number: String,
}

impl Equipment {
    /// Create a device owned by `customer_id`.
    #[must_use]
    pub fn new(
        customer_id: impl Into<String>,
        brand: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            customer_id: customer_id.into(),
            kind: EQUIPMENT_TYPES[0].to_string(),
            brand: brand.into(),
            model: model.into(),
            serial_number: String::new(),
        }
    }

    /// "Brand Model" as printed on documents.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.brand, self.model).trim().to_string()
    }

    /// # Errors
    ///
    /// Returns a validation error when brand or model is blank.
    pub fn validate(&self) -> Result<()> {
        if self.brand.trim().is_empty() || self.model.trim().is_empty() {
            return Err(Error::validation("Preencha Marca e Modelo do equipamento."));
        }
        Ok(())
    }
}

impl Entity for Equipment {
    const COLLECTION: Collection = Collection::Equipment;
    const KIND: &'static str = "equipment";

    fn id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> String {
        self.label().to_lowercase()
    }

    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::from(&self.brand),
            Cow::from(&self.model),
            Cow::from(&self.serial_number),
        ]
    }
}
