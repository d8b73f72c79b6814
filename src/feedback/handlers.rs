use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::db::models::Feedback;
use crate::error::AppError;
use crate::feedback::FeedbackInput;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub rating: Option<Value>,
    pub category: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackReceipt {
    pub id: Uuid,
    pub rating: i32,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    pub id: Uuid,
    pub rating: i32,
    pub category: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<Feedback> for FeedbackEntry {
    fn from(feedback: Feedback) -> Self {
        Self {
            id: feedback.id,
            rating: feedback.rating,
            category: feedback.category,
            message: feedback.message,
            created_at: feedback.created_at,
        }
    }
}

pub async fn submit_feedback(
    auth: AuthenticatedUser,
    req: web::Json<FeedbackRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let req = req.into_inner();
    let feedback = state
        .feedback_service
        .submit(
            auth.user_id,
            FeedbackInput {
                rating: req.rating,
                category: req.category,
                message: req.message,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Feedback submitted successfully",
        "feedback": FeedbackReceipt {
            id: feedback.id,
            rating: feedback.rating,
            category: feedback.category,
            created_at: feedback.created_at,
        },
    })))
}

pub async fn list_feedback(
    auth: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let feedbacks: Vec<FeedbackEntry> = state
        .feedback_service
        .list(auth.user_id)
        .await?
        .into_iter()
        .map(FeedbackEntry::from)
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({ "feedbacks": feedbacks })))
}
