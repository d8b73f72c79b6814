use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::db::models::{Analysis, Feedback, Resume, User, UserSession, WindowUsage};
use crate::db::store::{
    AnalysisStore, FeedbackStore, QueryUsageStore, ResumeStore, SessionStore, UserStore,
};
use crate::error::AppError;

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at, last_login";
const SESSION_COLUMNS: &str = "id, user_id, token, expires_at, created_at";
const RESUME_COLUMNS: &str =
    "id, user_id, file_name, file_type, file_size, content_hash, extracted_text, created_at";
const ANALYSIS_COLUMNS: &str =
    "id, user_id, resume_id, job_description, model, match_percentage, insights, created_at";
const FEEDBACK_COLUMNS: &str = "id, user_id, rating, category, message, created_at";

/// Postgres-backed implementation of every store trait.
pub struct DbOperations {
    pool: Arc<PgPool>,
}

impl DbOperations {
    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    pub fn pool(&self) -> Arc<PgPool> {
        self.pool.clone()
    }

    pub async fn run_migrations(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await?;
        Ok(())
    }

    pub async fn begin_transaction(&self) -> Result<Transaction<'_, Postgres>, AppError> {
        Ok(self.pool.as_ref().begin().await?)
    }

    async fn create_user_with_transaction(
        &self,
        user: &User,
        transaction: &mut Transaction<'_, Postgres>,
    ) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO users (id, username, email, password_hash, created_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.created_at)
            .fetch_one(&mut **transaction)
            .await?;

        Ok(user)
    }
}

#[async_trait]
impl UserStore for DbOperations {
    async fn create_user(&self, user: &User) -> Result<User, AppError> {
        let mut transaction = self.begin_transaction().await?;

        let result = self.create_user_with_transaction(user, &mut transaction).await;

        match result {
            Ok(user) => {
                transaction.commit().await?;
                Ok(user)
            }
            Err(e) => {
                transaction.rollback().await?;
                Err(e)
            }
        }
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(user)
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, AppError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $1 LIMIT 1"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(login.to_lowercase())
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(user)
    }

    async fn find_conflicting_user(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $2 LIMIT 1"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username.to_lowercase())
            .bind(email.to_lowercase())
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(user)
    }

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }
}

#[async_trait]
impl SessionStore for DbOperations {
    async fn create_session(&self, session: &UserSession) -> Result<UserSession, AppError> {
        let sql = format!(
            "INSERT INTO user_sessions (id, user_id, token, expires_at, created_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {SESSION_COLUMNS}"
        );
        let session = sqlx::query_as::<_, UserSession>(&sql)
            .bind(session.id)
            .bind(session.user_id)
            .bind(&session.token)
            .bind(session.expires_at)
            .bind(session.created_at)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<UserSession>, AppError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM user_sessions WHERE id = $1");
        let session = sqlx::query_as::<_, UserSession>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(session)
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM user_sessions WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut transaction = self.begin_transaction().await?;

        let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&mut *transaction)
            .await;

        match result {
            Ok(result) => {
                transaction.commit().await?;
                Ok(result.rows_affected())
            }
            Err(e) => {
                transaction.rollback().await?;
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl QueryUsageStore for DbOperations {
    async fn record_query(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("INSERT INTO query_usage (id, user_id, query_timestamp) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(at)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn window_usage(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<WindowUsage, AppError> {
        let (count, oldest) = sqlx::query_as::<_, (i64, Option<DateTime<Utc>>)>(
            "SELECT COUNT(*), MIN(query_timestamp) FROM query_usage \
             WHERE user_id = $1 AND query_timestamp >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(WindowUsage { count, oldest })
    }
}

#[async_trait]
impl ResumeStore for DbOperations {
    async fn create_resume(&self, resume: &Resume) -> Result<Resume, AppError> {
        let sql = format!(
            "INSERT INTO resumes (id, user_id, file_name, file_type, file_size, content_hash, extracted_text, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {RESUME_COLUMNS}"
        );
        let resume = sqlx::query_as::<_, Resume>(&sql)
            .bind(resume.id)
            .bind(resume.user_id)
            .bind(&resume.file_name)
            .bind(&resume.file_type)
            .bind(resume.file_size)
            .bind(&resume.content_hash)
            .bind(&resume.extracted_text)
            .bind(resume.created_at)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(resume)
    }

    async fn get_resume(&self, id: Uuid, user_id: Uuid) -> Result<Option<Resume>, AppError> {
        let sql = format!("SELECT {RESUME_COLUMNS} FROM resumes WHERE id = $1 AND user_id = $2");
        let resume = sqlx::query_as::<_, Resume>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(resume)
    }

    async fn list_resumes(&self, user_id: Uuid) -> Result<Vec<Resume>, AppError> {
        let sql = format!(
            "SELECT {RESUME_COLUMNS} FROM resumes WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let resumes = sqlx::query_as::<_, Resume>(&sql)
            .bind(user_id)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(resumes)
    }
}

#[async_trait]
impl AnalysisStore for DbOperations {
    async fn create_analysis(&self, analysis: &Analysis) -> Result<Analysis, AppError> {
        let sql = format!(
            "INSERT INTO analyses (id, user_id, resume_id, job_description, model, match_percentage, insights, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {ANALYSIS_COLUMNS}"
        );
        let analysis = sqlx::query_as::<_, Analysis>(&sql)
            .bind(analysis.id)
            .bind(analysis.user_id)
            .bind(analysis.resume_id)
            .bind(&analysis.job_description)
            .bind(&analysis.model)
            .bind(analysis.match_percentage)
            .bind(&analysis.insights)
            .bind(analysis.created_at)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(analysis)
    }

    async fn list_recent_analyses(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Analysis>, AppError> {
        let sql = format!(
            "SELECT {ANALYSIS_COLUMNS} FROM analyses WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2"
        );
        let analyses = sqlx::query_as::<_, Analysis>(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(analyses)
    }
}

#[async_trait]
impl FeedbackStore for DbOperations {
    async fn create_feedback(&self, feedback: &Feedback) -> Result<Feedback, AppError> {
        let sql = format!(
            "INSERT INTO feedback (id, user_id, rating, category, message, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {FEEDBACK_COLUMNS}"
        );
        let feedback = sqlx::query_as::<_, Feedback>(&sql)
            .bind(feedback.id)
            .bind(feedback.user_id)
            .bind(feedback.rating)
            .bind(&feedback.category)
            .bind(&feedback.message)
            .bind(feedback.created_at)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(feedback)
    }

    async fn list_feedback(&self, user_id: Uuid) -> Result<Vec<Feedback>, AppError> {
        let sql = format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let feedback = sqlx::query_as::<_, Feedback>(&sql)
            .bind(user_id)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(feedback)
    }
}
