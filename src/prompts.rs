use crate::report::RiskReport;

pub const AGENT_NAME: &str = "Rug Pull Checker";

pub const ANALYSIS_SYSTEM_PROMPT: &str = "You are a Solana token security analyst. \
You read token risk reports and explain them to retail investors in plain language. \
Be direct and honest: point out red flags, note green flags, and always end with a clear \
verdict of SAFE, MODERATE RISK or HIGH RISK. Never invent data that is not in the report.";

pub const CHAT_SYSTEM_PROMPT: &str =
    "You are a helpful crypto safety assistant specializing in Solana tokens.";

pub const GREETING: &str = "👋 **Hello! I'm Rug Pull Checker**

I analyze Solana tokens to detect potential rug pulls and scams using the SolSniffer API and AI.

**What I Can Do:**
• Analyze token contract addresses for rug pull risks
• Check liquidity, holders, and ownership status
• Detect mint/freeze authorities
• Provide AI-powered risk assessment
• Give clear verdicts: SAFE, MODERATE RISK, or HIGH RISK

**How to Use:**
Simply paste a Solana contract address (CA) and I'll analyze it!

**Examples:**
• `Is this token safe? 7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU`
• `Check this CA: DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263`

**Ready to analyze!** Just paste a contract address. 🚀";

pub const CHAT_FALLBACK: &str = "I'm here to help analyze Solana tokens for rug pull risks! 🔍

To get started, simply paste a Solana contract address and I'll analyze it for you.

**Example:** `DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263`

I can help you identify:
• Mint/freeze authorities
• Liquidity issues
• Holder concentration
• Overall rug pull risk";

fn report_block(report: &RiskReport, address: &str) -> String {
    let assessment = report.assessment();
    let pretty = serde_json::to_string_pretty(report.as_value())
        .unwrap_or_else(|_| report.as_value().to_string());
    format!(
        "**Token:** {} ({})\n**Contract Address:** {address}\n**Risk Level:** {}\n**Risk Score:** {}/100\n\n**Full Analysis Data:**\n{pretty}",
        report.token_name(),
        report.token_symbol(),
        assessment.level.label(),
        assessment.score,
    )
}

pub fn analysis_prompt(report: &RiskReport, address: &str, question: Option<&str>) -> String {
    let block = report_block(report, address);
    match question {
        Some(question) => format!(
            "User asks: \"{question}\"\n\n\
             Here is the token analysis data:\n\n{block}\n\n\
             Please provide a comprehensive analysis that:\n\
             1. Explains what the risk indicators mean\n\
             2. Highlights any red flags\n\
             3. Gives a clear verdict (SAFE / MODERATE RISK / HIGH RISK)\n\
             4. Provides specific reasons\n\
             5. Advises the user what to do\n\n\
             Answer the user's specific question while covering these points."
        ),
        None => format!(
            "Analyze this Solana token:\n\n{block}\n\n\
             Provide a comprehensive analysis covering:\n\
             1. Overall safety assessment\n\
             2. Red flags (if any)\n\
             3. Green flags (if any)\n\
             4. Clear verdict: SAFE / MODERATE RISK / HIGH RISK\n\
             5. Specific recommendations for investors\n\n\
             Be direct and honest. If it's a rug pull, say so clearly."
        ),
    }
}

pub fn chat_prompt(user_text: &str) -> String {
    format!(
        "The user says: \"{user_text}\"\n\n\
         You are a Solana token rug pull checker assistant. The user is asking a general \
         question that doesn't include a contract address.\n\n\
         Please respond helpfully about:\n\
         - What makes a token a rug pull\n\
         - How to identify scam tokens\n\
         - General crypto safety tips\n\
         - How to use this tool (just paste a Solana contract address)\n\n\
         Keep your response concise and helpful."
    )
}
