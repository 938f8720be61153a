//! Postal code (CEP) to street address, via a ViaCEP-compatible service.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::LookupConfig;
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    erro: Option<serde_json::Value>,
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
}

impl ViaCepResponse {
    fn not_found(&self) -> bool {
        match &self.erro {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::Bool(flag)) => *flag,
            Some(serde_json::Value::String(flag)) => flag != "false",
            Some(_) => true,
        }
    }

    fn address(&self) -> String {
        format!(
            "{}, {}, {} - {}",
            self.logradouro, self.bairro, self.localidade, self.uf
        )
    }
}

/// The eight digits of a CEP, or `None` when the input does not have exactly
/// eight.
#[must_use]
pub fn clean_cep(input: &str) -> Option<String> {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    (digits.len() == 8).then_some(digits)
}

/// Postal code lookup client.
#[derive(Debug, Clone)]
pub struct PostalLookup {
    client: reqwest::Client,
    base_url: String,
}

impl PostalLookup {
    /// Client for `base_url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &LookupConfig) -> Result<Self> {
        Self::new(
            &config.postal_code_url,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// `"logradouro, bairro, localidade - uf"` for a CEP.
    ///
    /// Returns `None` for input that is not eight digits, an unknown CEP, or
    /// any failure talking to the service.
    pub async fn address(&self, cep: &str) -> Option<String> {
        let cep = clean_cep(cep)?;
        match self.fetch(&cep).await {
            Ok(address) => address,
            Err(e) => {
                warn!(cep = %cep, error = %e, "postal code lookup failed");
                None
            }
        }
    }

    async fn fetch(&self, cep: &str) -> Result<Option<String>> {
        let url = format!("{}/ws/{cep}/json/", self.base_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::api(
                "postal code",
                format!("status {}", response.status()),
            ));
        }

        let body: ViaCepResponse = response.json().await?;
        if body.not_found() {
            debug!(cep, "postal code not found");
            return Ok(None);
        }
        Ok(Some(body.address()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> PostalLookup {
        PostalLookup::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_clean_cep() {
        assert_eq!(clean_cep("01001-000").as_deref(), Some("01001000"));
        assert_eq!(clean_cep("0100100"), None);
        assert_eq!(clean_cep("010010001"), None);
        assert_eq!(clean_cep(""), None);
    }

    #[tokio::test]
    async fn test_address_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ws/01001000/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cep": "01001-000",
                "logradouro": "Praça da Sé",
                "bairro": "Sé",
                "localidade": "São Paulo",
                "uf": "SP"
            })))
            .mount(&server)
            .await;

        let address = client(&server).address("01001-000").await;
        assert_eq!(address.as_deref(), Some("Praça da Sé, Sé, São Paulo - SP"));
    }

    #[tokio::test]
    async fn test_unknown_cep() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ws/99999999/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"erro": "true"})))
            .mount(&server)
            .await;

        assert_eq!(client(&server).address("99999-999").await, None);
    }

    #[tokio::test]
    async fn test_server_error_and_bad_input() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let lookup = client(&server);
        assert_eq!(lookup.address("01001000").await, None);
        assert_eq!(lookup.address("123").await, None);
    }
}
