//! Resume-versus-job analysis.
//!
//! The model call itself sits behind [`Analyzer`]; [`AnalysisService`] wraps
//! it in the quota check, input validation, and persistence.

pub mod gemini;
pub mod handlers;
pub mod service;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AnalysisError;

pub use gemini::GeminiAnalyzer;
pub use service::{AnalysisService, AnalyzeInput, AnalyzeOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnalysisModel {
    #[default]
    #[serde(rename = "gemini-1.5-flash")]
    Gemini15Flash,
    #[serde(rename = "gemini-1.5-pro")]
    Gemini15Pro,
    #[serde(rename = "gemini-2.0-flash-exp")]
    Gemini20FlashExp,
}

impl AnalysisModel {
    pub const ALL: [AnalysisModel; 3] = [
        AnalysisModel::Gemini15Flash,
        AnalysisModel::Gemini15Pro,
        AnalysisModel::Gemini20FlashExp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisModel::Gemini15Flash => "gemini-1.5-flash",
            AnalysisModel::Gemini15Pro => "gemini-1.5-pro",
            AnalysisModel::Gemini20FlashExp => "gemini-2.0-flash-exp",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AnalysisModel::Gemini15Flash => "Gemini 1.5 Flash",
            AnalysisModel::Gemini15Pro => "Gemini 1.5 Pro",
            AnalysisModel::Gemini20FlashExp => "Gemini 2.0 Flash (Experimental)",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AnalysisModel::Gemini15Flash => "Fast and efficient, good for quick analysis",
            AnalysisModel::Gemini15Pro => "More thorough analysis with deeper insights",
            AnalysisModel::Gemini20FlashExp => "Latest model with improved capabilities",
        }
    }

    pub fn valid_options() -> String {
        Self::ALL
            .iter()
            .map(AnalysisModel::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for AnalysisModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| format!("Invalid model. Valid options: {}", Self::valid_options()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulletPointImprovement {
    pub original: String,
    pub improved: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningResource {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

/// What the model reports about one resume against one job description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisResult {
    pub match_percentage: i32,
    pub overall_assessment: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub missing_keywords: Vec<String>,
    pub missing_skills: Vec<String>,
    pub bullet_point_improvements: Vec<BulletPointImprovement>,
    pub recommendations: Vec<String>,
    pub resources: Vec<LearningResource>,
    pub bottlenecks: Vec<String>,
    pub ats_score: i32,
    pub format_suggestions: Vec<String>,
}

impl AnalysisResult {
    /// Returned when the model's reply cannot be parsed.
    pub fn fallback() -> Self {
        Self {
            overall_assessment: "Unable to analyze resume. Please try again.".to_string(),
            weaknesses: vec!["Analysis could not be completed".to_string()],
            recommendations: vec!["Please try again with a clearer resume format".to_string()],
            bottlenecks: vec!["Technical error during analysis".to_string()],
            ..Self::default()
        }
    }
}

/// The model call. Implementations must not touch quota or storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(
        &self,
        resume_text: &str,
        job_description: &str,
        model: AnalysisModel,
    ) -> Result<AnalysisResult, AnalysisError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_parsing() {
        assert_eq!("gemini-1.5-pro".parse::<AnalysisModel>(), Ok(AnalysisModel::Gemini15Pro));
        let err = "gpt-4".parse::<AnalysisModel>().unwrap_err();
        assert!(err.contains("gemini-1.5-flash, gemini-1.5-pro, gemini-2.0-flash-exp"));
        assert_eq!(AnalysisModel::default().as_str(), "gemini-1.5-flash");
    }

    #[test]
    fn test_result_tolerates_missing_fields() {
        let result: AnalysisResult =
            serde_json::from_str(r#"{"matchPercentage": 72, "strengths": ["Rust"]}"#).unwrap();
        assert_eq!(result.match_percentage, 72);
        assert_eq!(result.strengths, vec!["Rust".to_string()]);
        assert!(result.weaknesses.is_empty());
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let json = serde_json::to_value(AnalysisResult::fallback()).unwrap();
        assert_eq!(json["matchPercentage"], 0);
        assert!(json["overallAssessment"].is_string());
        assert!(json["formatSuggestions"].is_array());
    }
}
