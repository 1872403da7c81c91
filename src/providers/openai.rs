use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::address::Address;
use crate::config::LlmConfig;
use crate::error::{RugpullError, Result, UpstreamError, UpstreamErrorKind};
use crate::interfaces::providers::{AdvisoryGateway, GatewayResult};
use crate::prompts;
use crate::providers::{body_preview, classify_status, classify_transport};
use crate::report::RiskReport;

const SERVICE: &str = "chat-completions";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    stream: bool,
}

/// OpenAI-compatible `/chat/completions` client (Fireworks by default).
#[derive(Clone)]
pub struct ChatCompletionsGateway {
    config: LlmConfig,
    client: Client,
}

impl ChatCompletionsGateway {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| RugpullError::Http(e.to_string()))?;
        info!(model = %config.model, base_url = %config.base_url, "LLM gateway initialized");
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn extract_text_from_value(response: &Value) -> Option<String> {
        response
            .get("choices")
            .and_then(|v| v.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    }

    async fn complete(&self, system: &str, user: &str, max_tokens: u32) -> GatewayResult<String> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            stream: false,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Chat completion transport failed: {}", e);
                classify_transport(SERVICE, &e)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport(SERVICE, &e))?;

        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                body = %body_preview(&body),
                "Chat completion failed"
            );
            return Err(UpstreamError::new(
                classify_status(status, false),
                SERVICE,
                format!("Unable to generate AI analysis (Status: {status})"),
            ));
        }

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            UpstreamError::new(
                UpstreamErrorKind::ParseFailure,
                SERVICE,
                format!("Chat completion decode failed: {e}"),
            )
        })?;

        let text = Self::extract_text_from_value(&value).ok_or_else(|| {
            UpstreamError::new(
                UpstreamErrorKind::ParseFailure,
                SERVICE,
                "Chat completion contained no message content",
            )
        })?;
        debug!(chars = text.len(), "Chat completion received");
        Ok(text)
    }
}

#[async_trait]
impl AdvisoryGateway for ChatCompletionsGateway {
    fn name(&self) -> &'static str {
        SERVICE
    }

    async fn advise(
        &self,
        report: &RiskReport,
        address: &Address,
        question: Option<&str>,
    ) -> GatewayResult<String> {
        let prompt = prompts::analysis_prompt(report, address.as_str(), question);
        self.complete(
            prompts::ANALYSIS_SYSTEM_PROMPT,
            &prompt,
            self.config.max_tokens,
        )
        .await
    }

    async fn converse(&self, user_text: &str) -> GatewayResult<String> {
        let prompt = prompts::chat_prompt(user_text);
        self.complete(
            prompts::CHAT_SYSTEM_PROMPT,
            &prompt,
            self.config.chat_max_tokens,
        )
        .await
    }
}
