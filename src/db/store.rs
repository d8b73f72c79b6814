//! Data-store seams used by the authentication, quota, and analysis code.
//!
//! Each trait covers one table. [`DataStore`] is implemented for anything
//! that provides all of them, so a single backing store can be shared.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::models::{Analysis, Feedback, Resume, User, UserSession, WindowUsage};
use crate::error::AppError;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: &User) -> Result<User, AppError>;

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Matches the lower-cased `login` against either username or email.
    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, AppError>;

    /// Any user holding this username or this email.
    async fn find_conflicting_user(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, AppError>;

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: &UserSession) -> Result<UserSession, AppError>;

    async fn get_session(&self, id: Uuid) -> Result<Option<UserSession>, AppError>;

    /// Deleting a missing session is not an error.
    async fn delete_session(&self, id: Uuid) -> Result<(), AppError>;

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
}

#[async_trait]
pub trait QueryUsageStore: Send + Sync {
    async fn record_query(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;

    /// Rows for `user_id` with a timestamp at or after `since`.
    async fn window_usage(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<WindowUsage, AppError>;
}

#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn create_resume(&self, resume: &Resume) -> Result<Resume, AppError>;

    /// Only returns the resume if `user_id` owns it.
    async fn get_resume(&self, id: Uuid, user_id: Uuid) -> Result<Option<Resume>, AppError>;

    async fn list_resumes(&self, user_id: Uuid) -> Result<Vec<Resume>, AppError>;
}

#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn create_analysis(&self, analysis: &Analysis) -> Result<Analysis, AppError>;

    async fn list_recent_analyses(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Analysis>, AppError>;
}

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn create_feedback(&self, feedback: &Feedback) -> Result<Feedback, AppError>;

    /// Newest first.
    async fn list_feedback(&self, user_id: Uuid) -> Result<Vec<Feedback>, AppError>;
}

pub trait DataStore:
    UserStore + SessionStore + QueryUsageStore + ResumeStore + AnalysisStore + FeedbackStore
{
}

impl<T> DataStore for T where
    T: UserStore + SessionStore + QueryUsageStore + ResumeStore + AnalysisStore + FeedbackStore
{
}
