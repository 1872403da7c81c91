use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw scanner payload. Only the `error` indicator is interpreted by the
/// pipeline; everything else is read through best-effort path lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskReport(Value);

impl RiskReport {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Dotted path lookup, e.g. `data.tokenInfo.price`. Numeric segments
    /// index into arrays.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(&self.0, |node, segment| match node {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }

    pub fn error_indicator(&self) -> Option<String> {
        let error = self.0.get("error")?;
        if error.is_null() || error == &Value::Bool(false) {
            return None;
        }
        let message = self
            .0
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| match error {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            });
        Some(message)
    }

    // The scanner nests most fields under `data`; older payloads are flat.
    fn body(&self) -> &Value {
        self.0.get("data").filter(|v| v.is_object()).unwrap_or(&self.0)
    }

    fn field(&self, section: &str, key: &str) -> Option<&Value> {
        self.body().get(section).and_then(|s| s.get(key))
    }

    fn text_field(&self, section: &str, key: &str, fallback: &str) -> String {
        self.field(section, key)
            .or_else(|| self.body().get(key))
            .and_then(Value::as_str)
            .unwrap_or(fallback)
            .to_string()
    }

    fn audit_flag(&self, key: &str) -> bool {
        self.field("securityInfo", "auditRisk")
            .and_then(|audit| audit.get(key))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    fn number(&self, section: &str, key: &str) -> f64 {
        self.field(section, key).and_then(Value::as_f64).unwrap_or(0.0)
    }

    pub fn token_name(&self) -> String {
        self.text_field("tokenMetadata", "name", "Unknown Token")
    }

    pub fn token_symbol(&self) -> String {
        self.text_field("tokenMetadata", "symbol", "???")
    }

    pub fn assessment(&self) -> RiskAssessment {
        let mut score = 0u32;
        let mut factors = Vec::new();
        if !self.audit_flag("mintDisabled") {
            score += 20;
            factors.push("Mint authority not disabled");
        }
        if !self.audit_flag("freezeDisabled") {
            score += 20;
            factors.push("Freeze authority not disabled");
        }
        if !self.audit_flag("lpBurned") {
            score += 30;
            factors.push("Liquidity pool not burned");
        }
        if self.audit_flag("top10Holders") {
            score += 15;
            factors.push("High concentration in top 10 holders");
        }
        RiskAssessment {
            score,
            level: RiskLevel::from_score(score),
            factors: factors.into_iter().map(str::to_string).collect(),
        }
    }

    /// Markdown summary shown to the user before the model verdict.
    pub fn summary(&self) -> String {
        if let Some(message) = self.error_indicator() {
            return format!("❌ {message}");
        }

        let address = self.text_field("tokenMetadata", "address", "Unknown");
        let assessment = self.assessment();
        let yes_no = |flag: bool, yes: &str, no: &str| (if flag { yes } else { no }).to_string();
        let factors = if assessment.factors.is_empty() {
            "✅ No major risk factors detected".to_string()
        } else {
            assessment
                .factors
                .iter()
                .map(|factor| format!("⚠️ {factor}"))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "**Token Analysis: {name} ({symbol})**\n\
             Contract Address: `{address}`\n\n\
             **Risk Assessment:**\n\
             - Risk Level: {level}\n\
             - Risk Score: {score}/100\n\n\
             **Token Info:**\n\
             - Price: ${price:.10}\n\
             - Market Cap: ${mkt_cap:.2}\n\
             - Supply: {supply:.0}\n\n\
             **Security Audit:**\n\
             - Mint Authority: {mint}\n\
             - Freeze Authority: {freeze}\n\
             - LP Burned: {lp}\n\
             - Top 10 Concentration: {top10}\n\n\
             **Risk Factors:**\n\
             {factors}",
            name = self.token_name(),
            symbol = self.token_symbol(),
            level = assessment.level.label(),
            score = assessment.score,
            price = self.number("tokenInfo", "price"),
            mkt_cap = self.number("tokenInfo", "mktCap"),
            supply = self.number("tokenInfo", "supplyAmount"),
            mint = yes_no(self.audit_flag("mintDisabled"), "✅ Disabled", "❌ Active"),
            freeze = yes_no(self.audit_flag("freezeDisabled"), "✅ Disabled", "❌ Active"),
            lp = yes_no(self.audit_flag("lpBurned"), "✅ Yes", "❌ No"),
            top10 = yes_no(self.audit_flag("top10Holders"), "⚠️ High", "✅ Normal"),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        if score >= 60 {
            Self::High
        } else if score >= 30 {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "🟢 LOW RISK",
            Self::Moderate => "🟡 MODERATE RISK",
            Self::High => "🔴 HIGH RISK",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskAssessment {
    pub score: u32,
    pub level: RiskLevel,
    pub factors: Vec<String>,
}

/// What gets cached per address and replayed on a hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub address: String,
    pub report: RiskReport,
    pub summary: String,
    pub advisory: String,
    pub analyzed_at: i64,
}

impl AnalysisResult {
    pub fn render(&self) -> String {
        format!(
            "✨ **Found cached analysis**\n\n{}\n\n## 🤖 AI Analysis\n\n{}",
            self.summary, self.advisory
        )
    }
}
