use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::analysis::{AnalysisModel, AnalysisResult, Analyzer};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AppError};

const PROMPT_HEADER: &str = "You are an experienced resume reviewer and career coach. Compare the resume below with the job description and report how well they match.\n\nRESUME:\n";

const PROMPT_JOB_HEADER: &str = "\n\nJOB DESCRIPTION:\n";

const PROMPT_INSTRUCTIONS: &str = r#"

Reply with a single JSON object and nothing else (no Markdown, no code fences) using exactly these keys:
{
  "matchPercentage": <integer 0-100>,
  "overallAssessment": "<two or three sentence summary>",
  "strengths": ["<strength>", ...],
  "weaknesses": ["<weakness>", ...],
  "missingKeywords": ["<keyword>", ...],
  "missingSkills": ["<skill>", ...],
  "bulletPointImprovements": [
    {"original": "<bullet from the resume>", "improved": "<rewritten bullet>", "reason": "<why it is better>"}
  ],
  "recommendations": ["<actionable recommendation>", ...],
  "resources": [
    {"title": "<name>", "type": "<course|book|certification|tool>", "description": "<how it helps>"}
  ],
  "bottlenecks": ["<critical issue>", ...],
  "atsScore": <integer 0-100 for applicant tracking system compatibility>,
  "formatSuggestions": ["<formatting improvement>", ...]
}

Be specific and constructive, and focus on what would make this resume a better fit for this particular job."#;

/// Calls the Gemini `generateContent` REST endpoint.
pub struct GeminiAnalyzer {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl GeminiAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Result<Self, AppError> {
        let base_url = Url::parse(&config.api_base_url)
            .map_err(|e| AppError::ConfigError(format!("Invalid analysis.api_base_url: {}", e)))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, model: AnalysisModel) -> Result<Url, AnalysisError> {
        let mut url = self
            .base_url
            .join(&format!("v1beta/models/{}:generateContent", model.as_str()))
            .map_err(|e| AnalysisError::RequestFailed(format!("Invalid endpoint: {}", e)))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }
}

/// User text is inserted verbatim; nothing inside it is treated as a placeholder.
pub fn build_prompt(resume_text: &str, job_description: &str) -> String {
    [
        PROMPT_HEADER,
        resume_text,
        PROMPT_JOB_HEADER,
        job_description,
        PROMPT_INSTRUCTIONS,
    ]
    .concat()
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[async_trait]
impl Analyzer for GeminiAnalyzer {
    async fn analyze(
        &self,
        resume_text: &str,
        job_description: &str,
        model: AnalysisModel,
    ) -> Result<AnalysisResult, AnalysisError> {
        if self.api_key.is_empty() {
            return Err(AnalysisError::MissingApiKey);
        }

        let prompt = build_prompt(resume_text, job_description);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        debug!("Requesting analysis from {}", model);
        let response = self
            .client
            .post(self.endpoint(model)?)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AnalysisError::ResponseError(format!("{}: {}", status, detail)));
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ResponseError(e.to_string()))?;

        let text: String = payload
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(AnalysisError::ResponseError("Model returned no text".into()));
        }

        Ok(parse_analysis(&text))
    }
}

/// Strips an optional Markdown code fence and parses the JSON body. A reply
/// that still does not parse becomes [`AnalysisResult::fallback`].
pub fn parse_analysis(text: &str) -> AnalysisResult {
    let mut cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }

    match serde_json::from_str(cleaned.trim()) {
        Ok(result) => result,
        Err(e) => {
            warn!("Failed to parse model response: {}", e);
            AnalysisResult::fallback()
        }
    }
}
