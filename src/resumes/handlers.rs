use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::db::models::Resume;
use crate::error::AppError;
use crate::resumes::UploadInput;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeSummary {
    pub id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub has_extracted_text: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Resume> for ResumeSummary {
    fn from(resume: Resume) -> Self {
        Self {
            id: resume.id,
            file_name: resume.file_name,
            file_type: resume.file_type,
            file_size: resume.file_size,
            has_extracted_text: resume.extracted_text.is_some(),
            created_at: resume.created_at,
        }
    }
}

pub async fn upload_resume(
    auth: AuthenticatedUser,
    req: web::Json<UploadRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let req = req.into_inner();
    let resume = state
        .resume_service
        .upload(
            auth.user_id,
            UploadInput {
                file_name: req.file_name,
                file_type: req.file_type,
                content: req.content,
            },
        )
        .await?;

    let extracted_text = resume.extracted_text.clone();
    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "File uploaded successfully",
        "resume": ResumeSummary::from(resume),
        "extractedText": extracted_text,
    })))
}

pub async fn list_resumes(
    auth: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let resumes: Vec<ResumeSummary> = state
        .resume_service
        .list(auth.user_id)
        .await?
        .into_iter()
        .map(ResumeSummary::from)
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({ "resumes": resumes })))
}
