use serde::{Deserialize, Serialize};

/// Shop identity printed on documents and messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessInfo {
    /// Trading name.
    pub name: String,
    /// CNPJ or CPF.
    pub cnpj: String,
    /// Phone / WhatsApp.
    pub phone: String,
    /// Street address.
    pub address: String,
    /// Logo shown on printed documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

impl Default for BusinessInfo {
    fn default() -> Self {
        Self {
            name: "FIXOS ASSISTÊNCIA".to_string(),
            cnpj: "00.000.000/0001-00".to_string(),
            phone: "(11) 99999-9999".to_string(),
            address: "Rua das Tecnologias, 101 - Centro".to_string(),
            logo_url: None,
        }
    }
}
