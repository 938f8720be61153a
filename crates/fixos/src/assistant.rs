//! Generative-text suggestions: repair report drafts and business tips.
//!
//! Every call degrades to a fixed fallback text; failures are logged, never
//! returned.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::config::AssistantConfig;
use crate::error::{Error, Result};

/// Returned when a report suggestion cannot be produced.
pub const REPORT_FALLBACK: &str = "Não foi possível gerar sugestão automática.";

/// Returned when insights cannot be produced.
pub const INSIGHTS_FALLBACK: &str = "Dicas de IA indisponíveis no momento.";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

fn report_prompt(problem_description: &str) -> String {
    format!(
        "Com base no seguinte problema técnico relatado: \"{problem_description}\", gere uma \
         sugestão curta e profissional de laudo técnico de reparo (em português) para ser enviado \
         ao cliente. Seja direto e explique o que provavelmente precisa ser feito."
    )
}

fn insights_prompt(stats: &str) -> String {
    format!(
        "Como consultor de negócios, analise estes dados de uma oficina: {stats}. Forneça 3 dicas \
         rápidas para aumentar os lucros ou melhorar a eficiência. Formate em markdown curto."
    )
}

/// Client for a `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct Assistant {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl Assistant {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
        })
    }

    /// Whether an API key is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Draft a technical report for a reported problem.
    pub async fn technical_report(&self, problem_description: &str) -> String {
        self.generate_or(&report_prompt(problem_description), REPORT_FALLBACK)
            .await
    }

    /// Business tips from a statistics document.
    pub async fn business_insights<S: Serialize + ?Sized>(&self, stats: &S) -> String {
        let stats = match serde_json::to_string(stats) {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "could not serialize statistics");
                return INSIGHTS_FALLBACK.to_string();
            }
        };
        self.generate_or(&insights_prompt(&stats), INSIGHTS_FALLBACK)
            .await
    }

    async fn generate_or(&self, prompt: &str, fallback: &str) -> String {
        let Some(api_key) = &self.api_key else {
            debug!("assistant disabled: no API key");
            return fallback.to_string();
        };
        match self.generate(api_key, prompt).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                warn!("assistant returned no text");
                fallback.to_string()
            }
            Err(e) => {
                warn!(error = %e, "assistant request failed");
                fallback.to_string()
            }
        }
    }

    async fn generate(&self, api_key: &str, prompt: &str) -> Result<Option<String>> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::api("assistant", format!("status {status}: {detail}")));
        }

        let parsed: GenerateResponse = response.json().await?;
        Ok(parsed.text())
    }
}
