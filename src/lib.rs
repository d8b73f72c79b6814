pub mod analysis;
pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod feedback;
pub mod resumes;

use actix_web::{web, HttpResponse};
use chrono::Duration;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, warn};

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

use analysis::{AnalysisService, Analyzer, GeminiAnalyzer};
use auth::{AuthService, RateLimitConfig, RateLimiter, SessionManager};
use clock::{Clock, SystemClock};
use db::{DataStore, DbOperations, MemoryStore};
use feedback::FeedbackService;
use resumes::{PlainTextExtractor, ResumeService, TextExtractor};

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Body parse failures use the same error envelope as every other 400.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, req| {
        warn!("Rejected body for {}: {}", req.path(), err);
        AppError::ValidationError(format!("Invalid request body: {}", err)).into()
    })
}

/// Registers every route. Shared by `main` and the integration tests.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/health", web::get().to(health_check))
        .service(
            web::scope("/auth")
                .route("/signup", web::post().to(auth::handlers::signup))
                .route("/login", web::post().to(auth::handlers::login))
                .route("/logout", web::post().to(auth::handlers::logout))
                .route("/me", web::get().to(auth::handlers::me)),
        )
        .route("/analyze/models", web::get().to(analysis::handlers::list_models))
        .route("/analyze", web::post().to(analysis::handlers::analyze))
        .route("/analyze", web::get().to(analysis::handlers::list_analyses))
        .route("/resumes", web::post().to(resumes::handlers::upload_resume))
        .route("/resumes", web::get().to(resumes::handlers::list_resumes))
        .route("/feedback", web::post().to(feedback::handlers::submit_feedback))
        .route("/feedback", web::get().to(feedback::handlers::list_feedback));
}

/// Application state shared across all components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub db_pool: Option<Arc<PgPool>>,
    pub sessions: Arc<SessionManager>,
    pub auth_service: Arc<AuthService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub analysis_service: Arc<AnalysisService>,
    pub resume_service: Arc<ResumeService>,
    pub feedback_service: Arc<FeedbackService>,
}

impl AppState {
    pub async fn new(config: Settings) -> Result<Self> {
        let analyzer: Arc<dyn Analyzer> = Arc::new(GeminiAnalyzer::new(&config.analysis)?);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        if config.uses_memory_store() {
            info!("Using in-memory store; data will not survive a restart");
            return Ok(Self::with_components(
                config,
                Arc::new(MemoryStore::new()),
                None,
                analyzer,
                Arc::new(PlainTextExtractor),
                clock,
            ));
        }

        let db = DbOperations::new_with_options(
            &config.database.url,
            config.database.max_connections,
            std::time::Duration::from_secs(config.database.acquire_timeout_secs),
        )
        .await
        .map_err(|e| AppError::DatabaseError(error::DatabaseError::ConnectionError(e.to_string())))?;
        db.run_migrations().await?;
        let pool = db.pool();

        Ok(Self::with_components(
            config,
            Arc::new(db),
            Some(pool),
            analyzer,
            Arc::new(PlainTextExtractor),
            clock,
        ))
    }

    /// Wires every service onto one store. Tests pass a `MemoryStore`, a
    /// stub analyzer, and a `ManualClock`.
    pub fn with_components<S: DataStore + 'static>(
        config: Settings,
        store: Arc<S>,
        db_pool: Option<Arc<PgPool>>,
        analyzer: Arc<dyn Analyzer>,
        extractor: Arc<dyn TextExtractor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(
            store.clone(),
            &config.auth.jwt_secret,
            Duration::days(config.auth.session_ttl_days),
            clock.clone(),
        ));
        let rate_limiter = Arc::new(RateLimiter::new(
            store.clone(),
            RateLimitConfig {
                max_queries: config.rate_limit.max_queries,
                window_size: Duration::hours(config.rate_limit.window_hours),
            },
            clock.clone(),
        ));
        let auth_service = Arc::new(AuthService::new(store.clone(), sessions.clone(), clock.clone()));
        let analysis_service = Arc::new(AnalysisService::new(
            analyzer,
            store.clone(),
            store.clone(),
            rate_limiter.clone(),
            clock.clone(),
        ));
        let resume_service = Arc::new(ResumeService::new(
            store.clone(),
            extractor,
            clock.clone(),
            config.uploads.max_file_size_mb,
        ));
        let feedback_service = Arc::new(FeedbackService::new(store, clock));

        Self {
            config: Arc::new(config),
            db_pool,
            sessions,
            auth_service,
            rate_limiter,
            analysis_service,
            resume_service,
            feedback_service,
        }
    }

    /// Periodically deletes expired session rows. Validation already treats
    /// them as absent; this only keeps the table small.
    pub fn spawn_session_sweeper(&self) -> Option<tokio::task::JoinHandle<()>> {
        let interval_secs = self.config.auth.session_sweep_interval_secs;
        if interval_secs == 0 {
            return None;
        }
        let sessions = self.sessions.clone();
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            loop {
                interval.tick().await;
                match sessions.sweep_expired().await {
                    Ok(0) => {}
                    Ok(removed) => info!("Removed {} expired sessions", removed),
                    Err(e) => error!("Session sweep failed: {}", e),
                }
            }
        }))
    }

    pub async fn shutdown(&self) -> Result<()> {
        if let Some(pool) = &self.db_pool {
            pool.close().await;
        }
        Ok(())
    }
}
