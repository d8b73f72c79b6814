//! In-process store used by the test suite and by `database.url = "memory"`.
//!
//! Every table lives behind one `RwLock`, so each trait call is atomic with
//! respect to other calls, matching what the Postgres store gives per query.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::models::{Analysis, Feedback, QueryUsage, Resume, User, UserSession, WindowUsage};
use crate::db::store::{
    AnalysisStore, FeedbackStore, QueryUsageStore, ResumeStore, SessionStore, UserStore,
};
use crate::error::{AppError, DatabaseError};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    sessions: HashMap<Uuid, UserSession>,
    query_usage: Vec<QueryUsage>,
    resumes: HashMap<Uuid, Resume>,
    analyses: Vec<Analysis>,
    feedback: Vec<Feedback>,
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn session_count(&self) -> usize {
        self.tables.read().await.sessions.len()
    }

    pub async fn query_count(&self, user_id: Uuid) -> usize {
        self.tables
            .read()
            .await
            .query_usage
            .iter()
            .filter(|row| row.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email);
        if taken {
            return Err(AppError::DatabaseError(DatabaseError::Duplicate));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, AppError> {
        let login = login.to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == login || u.email == login)
            .cloned())
    }

    async fn find_conflicting_user(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        let username = username.to_lowercase();
        let email = email.to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username || u.email == email)
            .cloned())
    }

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        if let Some(user) = self.tables.write().await.users.get_mut(&id) {
            user.last_login = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, session: &UserSession) -> Result<UserSession, AppError> {
        self.tables
            .write()
            .await
            .sessions
            .insert(session.id, session.clone());
        Ok(session.clone())
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<UserSession>, AppError> {
        Ok(self.tables.read().await.sessions.get(&id).cloned())
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), AppError> {
        self.tables.write().await.sessions.remove(&id);
        Ok(())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, session| session.is_active(now));
        Ok((before - tables.sessions.len()) as u64)
    }
}

#[async_trait]
impl QueryUsageStore for MemoryStore {
    async fn record_query(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        self.tables.write().await.query_usage.push(QueryUsage {
            id: Uuid::new_v4(),
            user_id,
            query_timestamp: at,
        });
        Ok(())
    }

    async fn window_usage(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<WindowUsage, AppError> {
        let tables = self.tables.read().await;
        let usage = tables
            .query_usage
            .iter()
            .filter(|row| row.user_id == user_id && row.query_timestamp >= since)
            .fold(WindowUsage::default(), |acc, row| WindowUsage {
                count: acc.count + 1,
                oldest: Some(acc.oldest.map_or(row.query_timestamp, |o| o.min(row.query_timestamp))),
            });
        Ok(usage)
    }
}

#[async_trait]
impl ResumeStore for MemoryStore {
    async fn create_resume(&self, resume: &Resume) -> Result<Resume, AppError> {
        self.tables
            .write()
            .await
            .resumes
            .insert(resume.id, resume.clone());
        Ok(resume.clone())
    }

    async fn get_resume(&self, id: Uuid, user_id: Uuid) -> Result<Option<Resume>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .resumes
            .get(&id)
            .filter(|r| r.user_id == user_id)
            .cloned())
    }

    async fn list_resumes(&self, user_id: Uuid) -> Result<Vec<Resume>, AppError> {
        let tables = self.tables.read().await;
        let mut resumes: Vec<Resume> = tables
            .resumes
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        resumes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(resumes)
    }
}

#[async_trait]
impl AnalysisStore for MemoryStore {
    async fn create_analysis(&self, analysis: &Analysis) -> Result<Analysis, AppError> {
        self.tables.write().await.analyses.push(analysis.clone());
        Ok(analysis.clone())
    }

    async fn list_recent_analyses(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Analysis>, AppError> {
        let tables = self.tables.read().await;
        let mut analyses: Vec<Analysis> = tables
            .analyses
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps; reverse it.
        analyses.reverse();
        analyses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        analyses.truncate(limit.max(0) as usize);
        Ok(analyses)
    }
}

#[async_trait]
impl FeedbackStore for MemoryStore {
    async fn create_feedback(&self, feedback: &Feedback) -> Result<Feedback, AppError> {
        self.tables.write().await.feedback.push(feedback.clone());
        Ok(feedback.clone())
    }

    async fn list_feedback(&self, user_id: Uuid) -> Result<Vec<Feedback>, AppError> {
        let tables = self.tables.read().await;
        let mut feedback: Vec<Feedback> = tables
            .feedback
            .iter()
            .rev()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        feedback.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(feedback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_window_usage_excludes_rows_before_window() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        store.record_query(user_id, now - Duration::hours(25)).await.unwrap();
        store.record_query(user_id, now - Duration::hours(10)).await.unwrap();
        store.record_query(user_id, now - Duration::hours(2)).await.unwrap();

        let usage = store.window_usage(user_id, now - Duration::hours(24)).await.unwrap();
        assert_eq!(usage.count, 2);
        assert_eq!(usage.oldest, Some(now - Duration::hours(10)));
    }

    #[tokio::test]
    async fn test_window_start_is_inclusive() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        let since = Utc::now();

        store.record_query(user_id, since - Duration::milliseconds(1)).await.unwrap();
        store.record_query(user_id, since).await.unwrap();
        let usage = store.window_usage(user_id, since).await.unwrap();
        assert_eq!(usage.count, 1);
        assert_eq!(usage.oldest, Some(since));
    }

    #[tokio::test]
    async fn test_unknown_user_has_empty_window() {
        let store = MemoryStore::new();
        let usage = store.window_usage(Uuid::new_v4(), Utc::now()).await.unwrap();
        assert_eq!(usage, WindowUsage::default());
    }

    #[tokio::test]
    async fn test_duplicate_user_rejected() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .create_user(&User::new("alice", "alice@example.com", "h".into(), now))
            .await
            .unwrap();

        let err = store
            .create_user(&User::new("ALICE", "other@example.com", "h".into(), now))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DatabaseError(DatabaseError::Duplicate)));
    }

    #[tokio::test]
    async fn test_find_user_by_login_matches_username_or_email() {
        let store = MemoryStore::new();
        let user = User::new("alice", "alice@example.com", "h".into(), Utc::now());
        store.create_user(&user).await.unwrap();

        let by_name = store.find_user_by_login("Alice").await.unwrap().unwrap();
        let by_email = store.find_user_by_login("ALICE@example.com").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert_eq!(by_email.id, user.id);
        assert!(store.find_user_by_login("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_expired_sessions() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let user_id = Uuid::new_v4();
        let live = UserSession::new(user_id, "a".into(), now, Duration::days(7));
        let stale = UserSession::new(user_id, "b".into(), now - Duration::days(8), Duration::days(7));
        store.create_session(&live).await.unwrap();
        store.create_session(&stale).await.unwrap();

        assert_eq!(store.delete_expired_sessions(now).await.unwrap(), 1);
        assert!(store.get_session(live.id).await.unwrap().is_some());
        assert!(store.get_session(stale.id).await.unwrap().is_none());

        // Deleting twice is fine.
        store.delete_session(stale.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_resume_lookup_is_scoped_to_owner() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let resume = Resume {
            id: Uuid::new_v4(),
            user_id: owner,
            file_name: "cv.txt".into(),
            file_type: "text/plain".into(),
            file_size: 4,
            content_hash: "abcd".into(),
            extracted_text: Some("text".into()),
            created_at: Utc::now(),
        };
        store.create_resume(&resume).await.unwrap();

        assert!(store.get_resume(resume.id, owner).await.unwrap().is_some());
        assert!(store.get_resume(resume.id, Uuid::new_v4()).await.unwrap().is_none());
    }
}
