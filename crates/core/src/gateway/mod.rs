//! # Model gateway
//!
//! Stateless request/response wrapper around the generative model provider. Four call shapes
//! are exposed on [`ModelGateway`]:
//!
//! - valuation: schema-constrained JSON parsed into a [`PredictionResult`](crate::PredictionResult)
//! - grounded insights: search/maps-augmented text plus citations
//! - chat: free text with an injected system instruction
//! - image edit: image + instruction in, image out
//!
//! Every call rebuilds its full context from the caller's arguments; nothing is remembered
//! between calls. Transport goes through the [`ModelClient`] trait so the HTTP client can be
//! swapped in tests.

mod chat;
mod image_edit;
mod insights;
mod valuation;
pub mod wire;

pub use image_edit::{split_data_uri, to_data_uri};
pub use insights::{extract_grounding_links, DeepInsights};
pub use valuation::{relay_prompt, valuation_prompt, valuation_response_schema};
pub use chat::system_instruction;

use crate::config::CoreConfig;
use crate::constants::MAX_ERROR_BODY_CHARS;
use crate::error::{GatewayError, GatewayResult};
use async_trait::async_trait;
use std::sync::Arc;
use wire::{GenerateContentRequest, GenerateContentResponse};

/// Transport to the model provider.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Run one `generateContent` call against `model`.
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> GatewayResult<GenerateContentResponse>;
}

/// HTTP client for the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl GeminiClient {
    /// Build a client from the startup configuration.
    ///
    /// The configured request timeout applies to every call made through this client.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::ClientBuild` if the underlying HTTP client cannot be created.
    pub fn new(cfg: &CoreConfig) -> GatewayResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout())
            .build()
            .map_err(GatewayError::ClientBuild)?;

        Ok(Self {
            http,
            api_base: cfg.api_base().to_string(),
            api_key: cfg.api_key().to_string(),
        })
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> GatewayResult<GenerateContentResponse> {
        let endpoint = self.endpoint_for_model(model);
        tracing::debug!(%endpoint, "calling model provider");

        let response = self
            .http
            .post(&endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(GatewayError::Network)?;

        let status = response.status();
        let body = response.text().await.map_err(GatewayError::Network)?;
        if !status.is_success() {
            return Err(GatewayError::Provider {
                status: status.as_u16(),
                body: truncate_chars(&body, MAX_ERROR_BODY_CHARS),
            });
        }

        serde_json::from_str(&body).map_err(GatewayError::Decode)
    }
}

fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &value[..idx]),
        None => value.to_string(),
    }
}

/// Entry point for the four model call shapes.
#[derive(Clone)]
pub struct ModelGateway {
    client: Arc<dyn ModelClient>,
    text_model: String,
    image_model: String,
    present_year: i32,
}

impl ModelGateway {
    pub fn new(
        client: Arc<dyn ModelClient>,
        text_model: impl Into<String>,
        image_model: impl Into<String>,
        present_year: i32,
    ) -> Self {
        Self {
            client,
            text_model: text_model.into(),
            image_model: image_model.into(),
            present_year,
        }
    }

    /// Gateway backed by [`GeminiClient`] with models and present year from `cfg`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::ClientBuild` if the HTTP client cannot be created.
    pub fn from_config(cfg: &CoreConfig) -> GatewayResult<Self> {
        let client = GeminiClient::new(cfg)?;
        Ok(Self::new(
            Arc::new(client),
            cfg.text_model(),
            cfg.image_model(),
            cfg.present_year(),
        ))
    }

    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    pub fn present_year(&self) -> i32 {
        self.present_year
    }

    async fn call_text_model(
        &self,
        request: &GenerateContentRequest,
    ) -> GatewayResult<GenerateContentResponse> {
        self.client.generate_content(&self.text_model, request).await
    }

    async fn call_image_model(
        &self,
        request: &GenerateContentRequest,
    ) -> GatewayResult<GenerateContentResponse> {
        self.client.generate_content(&self.image_model, request).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted [`ModelClient`] used by tests across the crate.

    use super::*;
    use crate::error::GatewayError;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    pub(crate) struct ScriptedClient {
        responses: Mutex<VecDeque<GatewayResult<GenerateContentResponse>>>,
        calls: Mutex<Vec<(String, GenerateContentRequest)>>,
    }

    impl ScriptedClient {
        pub(crate) fn new(
            responses: impl IntoIterator<Item = GatewayResult<GenerateContentResponse>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into_iter().collect()),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn calls(&self) -> Vec<(String, GenerateContentRequest)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedClient {
        async fn generate_content(
            &self,
            model: &str,
            request: &GenerateContentRequest,
        ) -> GatewayResult<GenerateContentResponse> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), request.clone()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(GatewayError::Provider {
                        status: 500,
                        body: "no scripted response left".into(),
                    })
                })
        }
    }

    pub(crate) fn response(value: Value) -> GatewayResult<GenerateContentResponse> {
        Ok(serde_json::from_value(value).unwrap())
    }

    pub(crate) fn text_response(text: &str) -> GatewayResult<GenerateContentResponse> {
        response(json!({"candidates": [{"content": {"parts": [{"text": text}]}}]}))
    }

    pub(crate) fn provider_error() -> GatewayResult<GenerateContentResponse> {
        Err(GatewayError::Provider {
            status: 503,
            body: "overloaded".into(),
        })
    }

    pub(crate) fn gateway(client: Arc<ScriptedClient>) -> ModelGateway {
        ModelGateway::new(client, "text-model", "image-model", 2025)
    }

    /// Client whose calls never complete, for cancellation tests.
    pub(crate) struct StalledClient;

    #[async_trait]
    impl ModelClient for StalledClient {
        async fn generate_content(
            &self,
            _model: &str,
            _request: &GenerateContentRequest,
        ) -> GatewayResult<GenerateContentResponse> {
            std::future::pending().await
        }
    }

    pub(crate) fn stalled_gateway() -> ModelGateway {
        ModelGateway::new(Arc::new(StalledClient), "text-model", "image-model", 2025)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_accepts_bare_and_prefixed_model_names() {
        let cfg = CoreConfig::new("k")
            .unwrap()
            .with_api_base("http://localhost:1234/v1beta/");
        let client = GeminiClient::new(&cfg).unwrap();
        assert_eq!(
            client.endpoint_for_model("gemini-2-flash"),
            "http://localhost:1234/v1beta/models/gemini-2-flash:generateContent"
        );
        assert_eq!(
            client.endpoint_for_model(" models/custom "),
            "http://localhost:1234/v1beta/models/custom:generateContent"
        );
    }

    #[test]
    fn provider_bodies_are_truncated_on_char_boundaries() {
        assert_eq!(truncate_chars("₹₹₹₹", 2), "₹₹…");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
