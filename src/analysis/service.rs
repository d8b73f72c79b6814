use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::{AnalysisModel, AnalysisResult, Analyzer};
use crate::auth::{RateLimitStatus, RateLimiter};
use crate::clock::Clock;
use crate::db::models::Analysis;
use crate::db::store::{AnalysisStore, ResumeStore};
use crate::error::AppError;

pub const DEFAULT_HISTORY_LIMIT: i64 = 10;
pub const MAX_HISTORY_LIMIT: i64 = 100;

#[derive(Debug, Clone, Default)]
pub struct AnalyzeInput {
    pub resume_id: Option<String>,
    pub resume_text: Option<String>,
    pub job_description: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AnalyzeOutcome {
    pub record: Analysis,
    pub result: AnalysisResult,
    pub model: AnalysisModel,
    pub rate_limit: RateLimitStatus,
}

pub struct AnalysisService {
    analyzer: Arc<dyn Analyzer>,
    analyses: Arc<dyn AnalysisStore>,
    resumes: Arc<dyn ResumeStore>,
    rate_limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl AnalysisService {
    pub fn new(
        analyzer: Arc<dyn Analyzer>,
        analyses: Arc<dyn AnalysisStore>,
        resumes: Arc<dyn ResumeStore>,
        rate_limiter: Arc<RateLimiter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            analyzer,
            analyses,
            resumes,
            rate_limiter,
            clock,
        }
    }

    /// Quota check, then the model call, then the quota charge. A failed
    /// model call is not charged. Two concurrent requests can both pass the
    /// check, so a user may overshoot the cap by the number in flight.
    pub async fn analyze(&self, user_id: Uuid, input: AnalyzeInput) -> Result<AnalyzeOutcome, AppError> {
        self.ensure_quota(user_id).await?;

        let job_description = non_blank(&input.job_description)
            .ok_or_else(|| AppError::ValidationError("Job description is required".into()))?;

        let (resume_id, resume_text) = self.resolve_resume_text(user_id, &input).await?;

        let model = match input.model.as_deref() {
            Some(name) => name.parse::<AnalysisModel>().map_err(AppError::ValidationError)?,
            None => AnalysisModel::default(),
        };

        let result = self.analyzer.analyze(&resume_text, job_description, model).await?;

        self.rate_limiter.record_query(user_id).await?;

        let insights = serde_json::to_string(&result)
            .map_err(|e| AppError::InternalError(format!("Failed to serialize analysis: {}", e)))?;
        let record = self
            .analyses
            .create_analysis(&Analysis {
                id: Uuid::new_v4(),
                user_id,
                resume_id,
                job_description: job_description.to_string(),
                model: model.as_str().to_string(),
                match_percentage: result.match_percentage,
                insights,
                created_at: self.clock.now(),
            })
            .await?;

        let rate_limit = self.rate_limiter.check_status(user_id).await?;
        info!(
            "Analysis {} completed for user {} ({} queries remaining)",
            record.id, user_id, rate_limit.remaining
        );

        Ok(AnalyzeOutcome {
            record,
            result,
            model,
            rate_limit,
        })
    }

    /// `RateLimited` once the user has no slot left in the window. Callers
    /// run this before looking at the request body.
    pub async fn ensure_quota(&self, user_id: Uuid) -> Result<RateLimitStatus, AppError> {
        let status = self.rate_limiter.check_status(user_id).await?;
        if !status.allowed {
            warn!("User {} is over quota until {}", user_id, status.reset_at);
            return Err(AppError::RateLimited(status));
        }
        Ok(status)
    }

    /// Direct text wins over a stored resume.
    async fn resolve_resume_text(
        &self,
        user_id: Uuid,
        input: &AnalyzeInput,
    ) -> Result<(Option<Uuid>, String), AppError> {
        if let Some(text) = non_blank(&input.resume_text) {
            return Ok((None, text.to_string()));
        }

        let Some(raw_id) = non_blank(&input.resume_id) else {
            return Err(AppError::ValidationError(
                "Resume text is required. Either provide resumeText or resumeId.".into(),
            ));
        };

        let not_found = || AppError::NotFound("Resume not found".into());
        let resume_id = Uuid::parse_str(raw_id).map_err(|_| not_found())?;
        let resume = self
            .resumes
            .get_resume(resume_id, user_id)
            .await?
            .ok_or_else(not_found)?;

        match resume.extracted_text {
            Some(text) if !text.trim().is_empty() => Ok((Some(resume.id), text)),
            _ => Err(AppError::ValidationError(
                "Resume has no extracted text. Please upload a text-based resume.".into(),
            )),
        }
    }

    pub async fn history(&self, user_id: Uuid, limit: Option<i64>) -> Result<Vec<Analysis>, AppError> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        self.analyses.list_recent_analyses(user_id, limit).await
    }
}
