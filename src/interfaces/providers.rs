use async_trait::async_trait;

use crate::address::Address;
use crate::error::UpstreamError;
use crate::report::RiskReport;

pub type GatewayResult<T> = std::result::Result<T, UpstreamError>;

/// Remote token scanner. One attempt per call; failures come back
/// already classified.
#[async_trait]
pub trait TokenRiskGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn analyze(&self, address: &Address) -> GatewayResult<RiskReport>;
}

/// Remote language model used for verdicts and general chat.
#[async_trait]
pub trait AdvisoryGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn advise(
        &self,
        report: &RiskReport,
        address: &Address,
        question: Option<&str>,
    ) -> GatewayResult<String>;

    async fn converse(&self, user_text: &str) -> GatewayResult<String>;
}
