//! User feedback about the service: a 1-5 rating, a category, and a message.

pub mod handlers;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::models::Feedback;
use crate::db::store::FeedbackStore;
use crate::error::AppError;

pub const MIN_MESSAGE_LENGTH: usize = 10;
pub const MAX_MESSAGE_LENGTH: usize = 2000;

pub const ERR_MISSING_FIELDS: &str = "Rating, category, and message are required";
pub const ERR_RATING: &str = "Rating must be a number between 1 and 5";
pub const ERR_MESSAGE_LENGTH: &str = "Message must be between 10 and 2000 characters";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackCategory {
    Suggestion,
    Bug,
    Feature,
    Other,
}

impl FeedbackCategory {
    pub const ALL: [FeedbackCategory; 4] = [
        FeedbackCategory::Suggestion,
        FeedbackCategory::Bug,
        FeedbackCategory::Feature,
        FeedbackCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackCategory::Suggestion => "suggestion",
            FeedbackCategory::Bug => "bug",
            FeedbackCategory::Feature => "feature",
            FeedbackCategory::Other => "other",
        }
    }
}

impl fmt::Display for FeedbackCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(FeedbackCategory::as_str).collect();
                format!("Category must be one of: {}", names.join(", "))
            })
    }
}

/// Raw submission. `rating` stays untyped so a non-numeric value gets the
/// rating message rather than a generic body error.
#[derive(Debug, Clone, Default)]
pub struct FeedbackInput {
    pub rating: Option<Value>,
    pub category: Option<String>,
    pub message: Option<String>,
}

fn parse_rating(value: &Value) -> Result<i32, AppError> {
    value
        .as_i64()
        .filter(|rating| (1..=5).contains(rating))
        .map(|rating| rating as i32)
        .ok_or_else(|| AppError::ValidationError(ERR_RATING.into()))
}

pub struct FeedbackService {
    store: Arc<dyn FeedbackStore>,
    clock: Arc<dyn Clock>,
}

impl FeedbackService {
    pub fn new(store: Arc<dyn FeedbackStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn submit(&self, user_id: Uuid, input: FeedbackInput) -> Result<Feedback, AppError> {
        let missing = || AppError::ValidationError(ERR_MISSING_FIELDS.into());
        let rating = input.rating.filter(|v| !v.is_null()).ok_or_else(missing)?;
        let category = input.category.filter(|c| !c.is_empty()).ok_or_else(missing)?;
        let message = input.message.filter(|m| !m.is_empty()).ok_or_else(missing)?;

        let rating = parse_rating(&rating)?;
        let category: FeedbackCategory = category.parse().map_err(AppError::ValidationError)?;
        let length = message.chars().count();
        if !(MIN_MESSAGE_LENGTH..=MAX_MESSAGE_LENGTH).contains(&length) {
            return Err(AppError::ValidationError(ERR_MESSAGE_LENGTH.into()));
        }

        let feedback = self
            .store
            .create_feedback(&Feedback {
                id: Uuid::new_v4(),
                user_id,
                rating,
                category: category.as_str().to_string(),
                message,
                created_at: self.clock.now(),
            })
            .await?;

        info!("Stored {} feedback {} from user {}", category, feedback.id, user_id);
        Ok(feedback)
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Feedback>, AppError> {
        self.store.list_feedback(user_id).await
    }
}
