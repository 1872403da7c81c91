use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

use crate::address::Address;
use crate::config::ScannerConfig;
use crate::error::{RugpullError, Result, UpstreamError, UpstreamErrorKind};
use crate::interfaces::providers::{GatewayResult, TokenRiskGateway};
use crate::logging::redact;
use crate::providers::{body_preview, classify_status, classify_transport};
use crate::report::RiskReport;

const SERVICE: &str = "solsniffer";

#[derive(Clone)]
pub struct SolSnifferGateway {
    base_url: String,
    client: Client,
}

impl SolSnifferGateway {
    pub fn new(config: &ScannerConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("RugPullChecker/", env!("CARGO_PKG_VERSION"))),
        );
        let mut api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| RugpullError::Config(format!("invalid SOLSNIFFER_API_KEY: {e}")))?;
        api_key.set_sensitive(true);
        headers.insert("x-api-key", api_key);

        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| RugpullError::Http(e.to_string()))?;

        info!(
            base_url = %config.base_url,
            api_key = %redact(&config.api_key),
            timeout_secs = config.timeout_seconds,
            "SolSniffer gateway initialized"
        );
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn token_url(&self, address: &Address) -> String {
        format!("{}/{}", self.base_url, address)
    }

    fn failure(kind: UpstreamErrorKind, status: u16) -> UpstreamError {
        let message = match kind {
            UpstreamErrorKind::NotFound => {
                "This contract address was not found. Please verify the address is correct."
                    .to_string()
            }
            UpstreamErrorKind::RateLimited => {
                "API rate limit exceeded. Please try again later.".to_string()
            }
            UpstreamErrorKind::AuthenticationFailed => {
                "The SolSniffer API rejected the configured API key.".to_string()
            }
            _ => format!("The SolSniffer API returned an error (Status: {status})"),
        };
        UpstreamError::new(kind, SERVICE, message)
    }
}

#[async_trait]
impl TokenRiskGateway for SolSnifferGateway {
    fn name(&self) -> &'static str {
        SERVICE
    }

    async fn analyze(&self, address: &Address) -> GatewayResult<RiskReport> {
        let url = self.token_url(address);
        info!(address = %address, "Requesting token report");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| {
                warn!(address = %address, "SolSniffer transport failure: {}", e);
                classify_transport(SERVICE, &e)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport(SERVICE, &e))?;

        if !status.is_success() {
            let kind = classify_status(status, true);
            warn!(
                address = %address,
                status = status.as_u16(),
                body = %body_preview(&body),
                "SolSniffer request failed"
            );
            return Err(Self::failure(kind, status.as_u16()));
        }

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            warn!(address = %address, body = %body_preview(&body), "SolSniffer body is not JSON");
            UpstreamError::new(
                UpstreamErrorKind::ParseFailure,
                SERVICE,
                format!("Failed to parse API response: {e}"),
            )
        })?;

        info!(address = %address, "Token report received");
        Ok(RiskReport::new(value))
    }
}
