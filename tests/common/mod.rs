#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use resume_match_server::{
    analysis::{AnalysisModel, AnalysisResult, Analyzer},
    clock::ManualClock,
    db::MemoryStore,
    error::AnalysisError,
    resumes::PlainTextExtractor,
    AppState, Settings,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const STRONG_PASSWORD: &str = "Correct-Horse-42";

/// Scores every resume by its length and counts the calls it receives.
#[derive(Default)]
pub struct StubAnalyzer {
    pub calls: AtomicUsize,
    pub fail: bool,
}

#[async_trait]
impl Analyzer for StubAnalyzer {
    async fn analyze(
        &self,
        resume_text: &str,
        _job_description: &str,
        _model: AnalysisModel,
    ) -> Result<AnalysisResult, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AnalysisError::RequestFailed("upstream unavailable".into()));
        }
        Ok(AnalysisResult {
            match_percentage: (resume_text.len() as i32).min(100),
            overall_assessment: "Solid match".into(),
            ..AnalysisResult::default()
        })
    }
}

pub struct TestContext {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub analyzer: Arc<StubAnalyzer>,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub fn context_with(analyzer: StubAnalyzer) -> TestContext {
    let config = Settings::new_for_test().expect("Failed to load test config");
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(start_time()));
    let analyzer = Arc::new(analyzer);
    let state = AppState::with_components(
        config,
        store.clone(),
        None,
        analyzer.clone(),
        Arc::new(PlainTextExtractor),
        clock.clone(),
    );
    TestContext {
        state,
        store,
        clock,
        analyzer,
    }
}

pub fn context() -> TestContext {
    context_with(StubAnalyzer::default())
}

/// Builds the full route table over the context's state.
#[macro_export]
macro_rules! test_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($ctx.state.clone()))
                .configure(resume_match_server::configure_routes),
        )
        .await
    };
}

impl TestContext {
    /// Registers a user directly through the service and returns its token.
    pub async fn register(&self, username: &str, email: &str) -> String {
        let (_, session) = self
            .state
            .auth_service
            .register(username, email, STRONG_PASSWORD)
            .await
            .expect("registration should succeed");
        session.token
    }

    pub fn analyzer_calls(&self) -> usize {
        self.analyzer.calls.load(Ordering::SeqCst)
    }
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}
