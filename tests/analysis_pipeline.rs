use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde_json::json;
use tempfile::tempdir;

use rugpull_checker::address::Address;
use rugpull_checker::cache::ExpiringCache;
use rugpull_checker::error::{UpstreamError, UpstreamErrorKind};
use rugpull_checker::interfaces::providers::{AdvisoryGateway, GatewayResult, TokenRiskGateway};
use rugpull_checker::prompts;
use rugpull_checker::report::{AnalysisResult, RiskReport};
use rugpull_checker::services::analysis::AnalysisService;
use rugpull_checker::services::events::{AgentEvent, EventSink};

const BONK: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";

#[derive(Default)]
struct FakeScanner {
    calls: AtomicUsize,
    failure: Option<UpstreamErrorKind>,
    body: Option<serde_json::Value>,
}

#[async_trait]
impl TokenRiskGateway for FakeScanner {
    fn name(&self) -> &'static str {
        "fake-scanner"
    }

    async fn analyze(&self, _address: &Address) -> GatewayResult<RiskReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(kind) = self.failure {
            return Err(UpstreamError::new(kind, "fake-scanner", "scanner says no"));
        }
        Ok(RiskReport::new(self.body.clone().unwrap_or_else(|| {
            json!({
                "data": {
                    "tokenMetadata": {"name": "Bonk", "symbol": "BONK"},
                    "securityInfo": {"auditRisk": {
                        "mintDisabled": true,
                        "freezeDisabled": true,
                        "lpBurned": true,
                        "top10Holders": false
                    }}
                }
            })
        })))
    }
}

#[derive(Default)]
struct FakeAdvisor {
    advise_calls: AtomicUsize,
    converse_calls: AtomicUsize,
    fail: bool,
    questions: Mutex<Vec<Option<String>>>,
}

#[async_trait]
impl AdvisoryGateway for FakeAdvisor {
    fn name(&self) -> &'static str {
        "fake-advisor"
    }

    async fn advise(
        &self,
        _report: &RiskReport,
        _address: &Address,
        question: Option<&str>,
    ) -> GatewayResult<String> {
        self.advise_calls.fetch_add(1, Ordering::SeqCst);
        self.questions
            .lock()
            .unwrap()
            .push(question.map(str::to_string));
        if self.fail {
            return Err(UpstreamError::new(
                UpstreamErrorKind::Timeout,
                "fake-advisor",
                "model timed out",
            ));
        }
        Ok("Verdict: SAFE".to_string())
    }

    async fn converse(&self, user_text: &str) -> GatewayResult<String> {
        self.converse_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(UpstreamError::new(
                UpstreamErrorKind::ConnectionFailed,
                "fake-advisor",
                "down",
            ));
        }
        Ok(format!("chat: {user_text}"))
    }
}

fn service(
    scanner: &Arc<FakeScanner>,
    advisor: &Arc<FakeAdvisor>,
    cache: Option<ExpiringCache>,
) -> AnalysisService {
    AnalysisService::new(scanner.clone(), advisor.clone(), cache)
}

fn names(events: &[AgentEvent]) -> Vec<&'static str> {
    events.iter().map(AgentEvent::name).collect()
}

fn done_count(events: &[AgentEvent]) -> usize {
    events.iter().filter(|event| event.is_done()).count()
}

#[tokio::test]
async fn fresh_analysis_is_cached_then_replayed_without_upstream_calls() {
    let temp = tempdir().unwrap();
    let cache = ExpiringCache::new(temp.path(), 24).unwrap();
    let scanner = Arc::new(FakeScanner::default());
    let advisor = Arc::new(FakeAdvisor::default());
    let service = service(&scanner, &advisor, Some(cache.clone()));

    let first = service
        .run(&format!("Is this token safe? {BONK}"))
        .await;
    assert_eq!(
        names(&first),
        vec!["STATUS", "ANALYSIS", "STATUS", "AI_VERDICT", "done"]
    );
    assert!(first[0].text().unwrap().contains("DezXAZ8z...B1pPB263"));
    assert!(first[3].text().unwrap().contains("Verdict: SAFE"));
    assert_eq!(
        advisor.questions.lock().unwrap().as_slice(),
        &[Some("Is this token safe?".to_string())]
    );

    let stored: AnalysisResult = cache
        .get(&format!("token_analysis_{BONK}"))
        .await
        .unwrap();
    assert_eq!(stored.address, BONK);
    assert_eq!(stored.advisory, "Verdict: SAFE");

    let second = service.run(BONK).await;
    assert_eq!(names(&second), vec!["CACHED_ANALYSIS", "done"]);
    let text = second[0].text().unwrap();
    assert!(text.starts_with("✨ **Found cached analysis**"));
    assert!(text.contains("Verdict: SAFE"));

    assert_eq!(scanner.calls.load(Ordering::SeqCst), 1);
    assert_eq!(advisor.advise_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn scanner_not_found_emits_error_and_caches_nothing() {
    let temp = tempdir().unwrap();
    let cache = ExpiringCache::new(temp.path(), 24).unwrap();
    let scanner = Arc::new(FakeScanner {
        failure: Some(UpstreamErrorKind::NotFound),
        ..FakeScanner::default()
    });
    let advisor = Arc::new(FakeAdvisor::default());
    let service = service(&scanner, &advisor, Some(cache.clone()));

    let events = service.run(&format!("check {BONK}")).await;
    assert_eq!(names(&events), vec!["STATUS", "ERROR", "done"]);
    match &events[1] {
        AgentEvent::Error { kind, message } => {
            assert_eq!(*kind, Some(UpstreamErrorKind::NotFound));
            assert!(message.contains("scanner says no"));
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(advisor.advise_calls.load(Ordering::SeqCst), 0);
    assert_eq!(cache.clear_all().await, 0);
}

#[tokio::test]
async fn greeting_and_chat_never_call_the_scanner() {
    let scanner = Arc::new(FakeScanner::default());
    let advisor = Arc::new(FakeAdvisor::default());
    let service = service(&scanner, &advisor, None);

    let greeting = service.run("Hello, who are you?").await;
    assert_eq!(names(&greeting), vec!["GREETING", "done"]);
    assert_eq!(greeting[0].text(), Some(prompts::GREETING));
    assert_eq!(advisor.converse_calls.load(Ordering::SeqCst), 0);
    assert_eq!(advisor.advise_calls.load(Ordering::SeqCst), 0);

    let chat = service.run("what makes a token a rug pull").await;
    assert_eq!(names(&chat), vec!["CHAT_RESPONSE", "done"]);
    assert_eq!(chat[0].text(), Some("chat: what makes a token a rug pull"));

    assert_eq!(scanner.calls.load(Ordering::SeqCst), 0);
    assert_eq!(advisor.converse_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn address_wins_over_greeting_words() {
    let scanner = Arc::new(FakeScanner::default());
    let advisor = Arc::new(FakeAdvisor::default());
    let service = service(&scanner, &advisor, None);

    let events = service.run(&format!("hello, check {BONK}")).await;
    assert_eq!(names(&events)[0], "STATUS");
    assert_eq!(scanner.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn expired_entry_triggers_fresh_analysis() {
    let temp = tempdir().unwrap();
    let cache = ExpiringCache::new(temp.path(), 1).unwrap();
    let scanner = Arc::new(FakeScanner::default());
    let advisor = Arc::new(FakeAdvisor::default());
    let service = service(&scanner, &advisor, Some(cache.clone()));

    service.run(BONK).await;
    let path = cache.entry_path(&format!("token_analysis_{BONK}"));
    let file = std::fs::File::options().write(true).open(&path).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(2 * 3600))
        .unwrap();
    drop(file);

    let events = service.run(BONK).await;
    assert_eq!(
        names(&events),
        vec!["STATUS", "ANALYSIS", "STATUS", "AI_VERDICT", "done"]
    );
    assert_eq!(scanner.calls.load(Ordering::SeqCst), 2);
    assert_eq!(advisor.questions.lock().unwrap().last(), Some(&None));
}

#[tokio::test]
async fn advisory_failure_keeps_report_and_skips_cache() {
    let temp = tempdir().unwrap();
    let cache = ExpiringCache::new(temp.path(), 24).unwrap();
    let scanner = Arc::new(FakeScanner::default());
    let advisor = Arc::new(FakeAdvisor {
        fail: true,
        ..FakeAdvisor::default()
    });
    let service = service(&scanner, &advisor, Some(cache.clone()));

    let events = service.run(BONK).await;
    assert_eq!(
        names(&events),
        vec!["STATUS", "ANALYSIS", "STATUS", "ERROR", "done"]
    );
    assert!(matches!(
        events[3],
        AgentEvent::Error {
            kind: Some(UpstreamErrorKind::Timeout),
            ..
        }
    ));
    let cached: Option<AnalysisResult> = cache.get(&format!("token_analysis_{BONK}")).await;
    assert!(cached.is_none());
}

#[tokio::test]
async fn report_error_indicator_is_terminal() {
    let scanner = Arc::new(FakeScanner {
        body: Some(json!({"error": "Token not found", "message": "Unknown token"})),
        ..FakeScanner::default()
    });
    let advisor = Arc::new(FakeAdvisor::default());
    let service = service(&scanner, &advisor, None);

    let events = service.run(BONK).await;
    assert_eq!(names(&events), vec!["STATUS", "ERROR", "done"]);
    assert!(events[1].text().unwrap().contains("Unknown token"));
    assert_eq!(advisor.advise_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn chat_failure_falls_back_to_static_reply() {
    let scanner = Arc::new(FakeScanner::default());
    let advisor = Arc::new(FakeAdvisor {
        fail: true,
        ..FakeAdvisor::default()
    });
    let service = service(&scanner, &advisor, None);

    let events = service.run("tell me about liquidity").await;
    assert_eq!(names(&events), vec!["CHAT_RESPONSE", "done"]);
    assert_eq!(events[0].text(), Some(prompts::CHAT_FALLBACK));
}

#[tokio::test]
async fn every_run_ends_with_exactly_one_done() {
    let scanner = Arc::new(FakeScanner::default());
    let advisor = Arc::new(FakeAdvisor::default());
    let service = service(&scanner, &advisor, None);

    for text in ["", "hi there", BONK, "0OIl not an address"] {
        let events = service.run(text).await;
        assert_eq!(done_count(&events), 1, "input {text:?}");
        assert!(events.last().unwrap().is_done());
    }
}

#[tokio::test]
async fn disconnected_consumer_stops_the_pipeline() {
    let scanner = Arc::new(FakeScanner::default());
    let advisor = Arc::new(FakeAdvisor::default());
    let service = service(&scanner, &advisor, None);

    let (sink, rx) = EventSink::channel(1);
    drop(rx);
    service.handle(BONK, &sink).await;

    assert_eq!(scanner.calls.load(Ordering::SeqCst), 0);
    assert_eq!(advisor.advise_calls.load(Ordering::SeqCst), 0);
}
