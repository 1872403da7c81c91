use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, error, info, warn};

use crate::address::Address;
use crate::cache::ExpiringCache;
use crate::error::{RugpullError, Result, UpstreamErrorKind};
use crate::intent::{self, Intent};
use crate::interfaces::providers::{AdvisoryGateway, TokenRiskGateway};
use crate::prompts;
use crate::report::AnalysisResult;
use crate::services::events::{self, AgentEvent, EventSink};

pub const CACHE_KEY_PREFIX: &str = "token_analysis_";
const MIN_QUESTION_CHARS: usize = 3;
const RUN_BUFFER: usize = 16;

pub const INTERNAL_ERROR_TEXT: &str =
    "❌ **Error**\n\nAn unexpected error occurred while processing your request. Please try again.";

/// Drives one user message from intent detection to the terminal `Done`.
///
/// Holds no per-request state, so a single instance is shared by every
/// request the daemon serves.
#[derive(Clone)]
pub struct AnalysisService {
    scanner: Arc<dyn TokenRiskGateway>,
    advisor: Arc<dyn AdvisoryGateway>,
    cache: Option<ExpiringCache>,
}

impl AnalysisService {
    pub fn new(
        scanner: Arc<dyn TokenRiskGateway>,
        advisor: Arc<dyn AdvisoryGateway>,
        cache: Option<ExpiringCache>,
    ) -> Self {
        Self {
            scanner,
            advisor,
            cache,
        }
    }

    pub fn cache(&self) -> Option<&ExpiringCache> {
        self.cache.as_ref()
    }

    pub fn cache_key(address: &Address) -> String {
        format!("{CACHE_KEY_PREFIX}{address}")
    }

    /// What the user asked besides the address itself. `None` when the
    /// message was little more than the address.
    pub fn question_for(text: &str, address: &Address) -> Option<String> {
        let remainder = text
            .replace(address.as_str(), " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let meaningful = remainder.chars().filter(|c| c.is_alphanumeric()).count();
        (meaningful >= MIN_QUESTION_CHARS).then_some(remainder)
    }

    /// Runs the pipeline and always finishes the stream with one `Done`,
    /// unless the consumer has already gone away.
    pub async fn handle(&self, text: &str, sink: &EventSink) {
        match self.process(text, sink).await {
            Ok(()) => {}
            Err(err) if events::is_disconnect(&err) => {
                info!("Consumer disconnected; abandoning request");
                return;
            }
            Err(RugpullError::Upstream(err)) => {
                warn!(service = err.service, kind = err.kind.as_str(), "Request failed: {}", err);
                let event = AgentEvent::error(Some(err.kind), format!("❌ **Error**\n\n{}", err.message));
                if sink.emit(event).await.is_err() {
                    return;
                }
            }
            Err(err) => {
                error!("Error processing query: {}", err);
                if sink.emit(AgentEvent::error(None, INTERNAL_ERROR_TEXT)).await.is_err() {
                    return;
                }
            }
        }
        if sink.emit(AgentEvent::Done).await.is_err() {
            debug!("Consumer gone before completion event");
        }
    }

    /// Collects every event for `text`, ending with `Done`.
    pub async fn run(&self, text: &str) -> Vec<AgentEvent> {
        let (sink, mut rx) = EventSink::channel(RUN_BUFFER);
        let collect = async {
            let mut collected = Vec::new();
            while let Some(event) = rx.recv().await {
                let done = event.is_done();
                collected.push(event);
                if done {
                    break;
                }
            }
            collected
        };
        let ((), collected) = tokio::join!(self.handle(text, &sink), collect);
        collected
    }

    async fn process(&self, text: &str, sink: &EventSink) -> Result<()> {
        let text = text.trim();
        let preview: String = text.chars().take(100).collect();
        info!(query = %preview, "Processing query");

        match intent::classify(text) {
            Intent::TokenQuery(address) => self.analyze_token(text, &address, sink).await,
            Intent::Greeting => {
                sink.emit(AgentEvent::block(events::GREETING, prompts::GREETING))
                    .await
            }
            Intent::Chat => self.chat(text, sink).await,
        }
    }

    async fn analyze_token(&self, text: &str, address: &Address, sink: &EventSink) -> Result<()> {
        let key = Self::cache_key(address);
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get::<AnalysisResult>(&key).await {
                info!(address = %address, "Serving cached analysis");
                return sink
                    .emit(AgentEvent::block(events::CACHED_ANALYSIS, cached.render()))
                    .await;
            }
        }

        sink.emit(AgentEvent::status(format!(
            "🔍 Analyzing token: {}",
            address.short()
        )))
        .await?;

        let report = match self.scanner.analyze(address).await {
            Ok(report) => report,
            Err(err) => {
                warn!(address = %address, kind = err.kind.as_str(), "Token report failed: {}", err.message);
                return sink
                    .emit(AgentEvent::error(Some(err.kind), report_error_text(&err.message)))
                    .await;
            }
        };
        if let Some(message) = report.error_indicator() {
            warn!(address = %address, "Token report carried an error: {}", message);
            return sink
                .emit(AgentEvent::error(
                    Some(UpstreamErrorKind::UpstreamError),
                    report_error_text(&message),
                ))
                .await;
        }

        let summary = report.summary();
        sink.emit(AgentEvent::block(events::ANALYSIS, summary.clone()))
            .await?;
        sink.emit(AgentEvent::status("🤖 Generating AI analysis..."))
            .await?;

        let question = Self::question_for(text, address);
        let advisory = match self
            .advisor
            .advise(&report, address, question.as_deref())
            .await
        {
            Ok(advisory) => advisory,
            Err(err) => {
                warn!(address = %address, kind = err.kind.as_str(), "AI analysis failed: {}", err.message);
                return sink
                    .emit(AgentEvent::error(
                        Some(err.kind),
                        format!("❌ **Error**\n\nUnable to generate AI analysis. {}", err.message),
                    ))
                    .await;
            }
        };
        sink.emit(AgentEvent::block(
            events::AI_VERDICT,
            format!("## 🤖 AI Analysis\n\n{advisory}"),
        ))
        .await?;

        if let Some(cache) = &self.cache {
            let result = AnalysisResult {
                address: address.to_string(),
                report,
                summary,
                advisory,
                analyzed_at: unix_now(),
            };
            if cache.set(&key, &result).await {
                info!(address = %address, "Cached analysis");
            } else {
                warn!(address = %address, "Analysis was not cached");
            }
        }
        info!(address = %address, "Query processed successfully");
        Ok(())
    }

    async fn chat(&self, text: &str, sink: &EventSink) -> Result<()> {
        let reply = match self.advisor.converse(text).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(kind = err.kind.as_str(), "Chat reply failed, using fallback: {}", err.message);
                prompts::CHAT_FALLBACK.to_string()
            }
        };
        sink.emit(AgentEvent::block(events::CHAT_RESPONSE, reply))
            .await
    }
}

fn report_error_text(message: &str) -> String {
    format!("❌ **Error**\n\n{message}\n\nPlease check the contract address and try again.")
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
