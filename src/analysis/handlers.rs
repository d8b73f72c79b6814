use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::{AnalysisModel, AnalysisResult, AnalyzeInput};
use crate::auth::{AuthenticatedUser, RateLimitStatus};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub resume_id: Option<String>,
    pub resume_text: Option<String>,
    pub job_description: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub id: Uuid,
    pub analysis: AnalysisResult,
    pub model: AnalysisModel,
    pub rate_limit: RateLimitStatus,
    pub created_at: DateTime<Utc>,
}

/// The body is extracted leniently so an over-quota caller gets 429 even
/// when the payload is also malformed.
pub async fn analyze(
    auth: AuthenticatedUser,
    req: Result<web::Json<AnalyzeRequest>, actix_web::Error>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, actix_web::Error> {
    state.analysis_service.ensure_quota(auth.user_id).await?;

    let req = req?.into_inner();
    let outcome = state
        .analysis_service
        .analyze(
            auth.user_id,
            AnalyzeInput {
                resume_id: req.resume_id,
                resume_text: req.resume_text,
                job_description: req.job_description,
                model: req.model,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(AnalyzeResponse {
        id: outcome.record.id,
        analysis: outcome.result,
        model: outcome.model,
        rate_limit: outcome.rate_limit,
        created_at: outcome.record.created_at,
    }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub id: Uuid,
    pub model: String,
    pub match_percentage: i32,
    pub job_description: String,
    pub created_at: DateTime<Utc>,
}

pub async fn list_analyses(
    auth: AuthenticatedUser,
    query: web::Query<HistoryQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let analyses: Vec<AnalysisSummary> = state
        .analysis_service
        .history(auth.user_id, query.limit)
        .await?
        .into_iter()
        .map(|a| AnalysisSummary {
            id: a.id,
            model: a.model,
            match_percentage: a.match_percentage,
            job_description: a.job_description,
            created_at: a.created_at,
        })
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({ "analyses": analyses })))
}

pub async fn list_models() -> HttpResponse {
    let models: Vec<serde_json::Value> = AnalysisModel::ALL
        .iter()
        .map(|model| {
            serde_json::json!({
                "id": model.as_str(),
                "name": model.display_name(),
                "description": model.description(),
            })
        })
        .collect();

    HttpResponse::Ok().json(serde_json::json!({ "models": models }))
}
