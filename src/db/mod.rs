//! Persistence for users, sessions, quota usage, resumes, analyses, and feedback.

pub mod memory;
pub mod models;
pub mod operations;
pub mod store;

pub use memory::MemoryStore;
pub use models::{Analysis, Feedback, QueryUsage, Resume, User, UserSession, WindowUsage};
pub use operations::DbOperations;
pub use store::{
    AnalysisStore, DataStore, FeedbackStore, QueryUsageStore, ResumeStore, SessionStore, UserStore,
};
