use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::config::{AiProvider, Settings};
use crate::core::metrics;
use crate::db::models::Exam;
use crate::services::grading_output::{parse_grading_output, GradingResult};
use crate::services::uploads::MediaType;

const ANTHROPIC_VERSION: &str = "2023-06-01";

const OUTPUT_CONTRACT: &str = r#"Respond with ONLY one JSON object, no prose, using exactly this shape:
{
  "student_code": "<code written on the sheet, or null if none is visible>",
  "score": <number of points awarded in total>,
  "question_results": [
    {
      "question_number": <integer>,
      "points_awarded": <number>,
      "max_points": <number>,
      "is_correct": <true|false>,
      "feedback": "<short comment>"
    }
  ],
  "feedback": "<overall feedback for the student>"
}"#;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum GradingInputError {
    #[error("Submission image is empty")]
    EmptyImage,
    #[error("Exam total points must be positive")]
    NonPositiveTotal,
}

/// Everything the oracle needs to grade one sheet.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GradingRequest<'a> {
    pub(crate) exam_name: &'a str,
    pub(crate) total_points: i32,
    pub(crate) answer_key: &'a Value,
    pub(crate) image: &'a [u8],
    pub(crate) media_type: MediaType,
}

impl<'a> GradingRequest<'a> {
    pub(crate) fn new(
        exam: &'a Exam,
        image: &'a [u8],
        media_type: MediaType,
    ) -> Result<Self, GradingInputError> {
        if image.is_empty() {
            return Err(GradingInputError::EmptyImage);
        }
        if exam.total_points <= 0 {
            return Err(GradingInputError::NonPositiveTotal);
        }

        Ok(Self {
            exam_name: &exam.exam_name,
            total_points: exam.total_points,
            answer_key: &exam.answer_key.0,
            image,
            media_type,
        })
    }
}

/// Grades a sheet. Never fails: unusable replies come back as a degraded result.
#[async_trait]
pub(crate) trait GradingOracle: Send + Sync {
    async fn grade(&self, request: &GradingRequest<'_>) -> GradingResult;
}

#[derive(Debug, Clone)]
pub(crate) struct AiGradingService {
    client: Client,
    provider: AiProvider,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
    max_retries: u32,
    feedback_language: String,
}

impl AiGradingService {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let ai = settings.ai();
        let timeout = Duration::from_secs(ai.request_timeout_seconds);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            provider: ai.provider,
            api_key: ai.api_key.clone(),
            base_url: ai.base_url.trim_end_matches('/').to_string(),
            model: ai.model.clone(),
            max_tokens: ai.max_tokens,
            timeout,
            max_retries: ai.max_retries,
            feedback_language: ai.feedback_language.clone(),
        })
    }

    fn endpoint(&self) -> String {
        match self.provider {
            AiProvider::Anthropic => format!("{}/v1/messages", self.base_url),
            AiProvider::OpenAi => format!("{}/chat/completions", self.base_url),
        }
    }

    fn build_payload(&self, request: &GradingRequest<'_>) -> Value {
        let prompt = build_grading_prompt(
            request.exam_name,
            request.total_points,
            request.answer_key,
            &self.feedback_language,
        );
        let encoded = STANDARD.encode(request.image);
        let mime = request.media_type.mime();

        match self.provider {
            AiProvider::Anthropic => {
                let block_type = if request.media_type.is_document() { "document" } else { "image" };
                json!({
                    "model": self.model,
                    "max_tokens": self.max_tokens,
                    "messages": [{
                        "role": "user",
                        "content": [
                            {
                                "type": block_type,
                                "source": {"type": "base64", "media_type": mime, "data": encoded}
                            },
                            {"type": "text", "text": prompt}
                        ]
                    }]
                })
            }
            AiProvider::OpenAi => {
                let data_url = format!("data:{mime};base64,{encoded}");
                let attachment = if request.media_type.is_document() {
                    json!({"type": "file", "file": {"filename": "submission.pdf", "file_data": data_url}})
                } else {
                    json!({"type": "image_url", "image_url": {"url": data_url}})
                };
                json!({
                    "model": self.model,
                    "max_tokens": self.max_tokens,
                    "messages": [{
                        "role": "user",
                        "content": [{"type": "text", "text": prompt}, attachment]
                    }]
                })
            }
        }
    }

    async fn request_reply(&self, request: &GradingRequest<'_>) -> Result<String> {
        let url = self.endpoint();
        let payload = self.build_payload(request);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            let builder = self.client.post(&url).json(&payload);
            let builder = match self.provider {
                AiProvider::Anthropic => builder
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION),
                AiProvider::OpenAi => builder.bearer_auth(&self.api_key),
            };

            match builder.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let body: Value = resp.json().await.unwrap_or(Value::Null);
                    if status.is_success() {
                        return reply_text(self.provider, &body)
                            .ok_or_else(|| anyhow!("Missing reply content in {status} response"));
                    }

                    let err = anyhow!("{} API error {status}: {body}", self.provider.as_str());
                    if !is_retryable(status) {
                        return Err(err);
                    }
                    last_error = Some(err);
                }
                Err(err) => {
                    last_error = Some(anyhow!(err).context("Failed to call grading provider"));
                }
            }

            if attempt < self.max_retries {
                tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt))).await;
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("Unknown grading provider error")))
    }
}

#[async_trait]
impl GradingOracle for AiGradingService {
    async fn grade(&self, request: &GradingRequest<'_>) -> GradingResult {
        let timer = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.request_reply(request)).await;
        let elapsed = timer.elapsed();
        metrics::record_oracle_call(self.provider.as_str(), elapsed);

        let reply = match outcome {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                tracing::warn!(
                    error = ?err,
                    provider = self.provider.as_str(),
                    exam_name = request.exam_name,
                    "Grading oracle call failed"
                );
                metrics::record_oracle_degraded("transport");
                return GradingResult::degraded();
            }
            Err(_) => {
                tracing::warn!(
                    timeout_seconds = self.timeout.as_secs_f64(),
                    provider = self.provider.as_str(),
                    exam_name = request.exam_name,
                    "Grading oracle call timed out"
                );
                metrics::record_oracle_degraded("timeout");
                return GradingResult::degraded();
            }
        };

        match parse_grading_output(&reply, request.total_points) {
            Ok(result) => {
                tracing::info!(
                    provider = self.provider.as_str(),
                    duration_seconds = elapsed.as_secs_f64(),
                    score = result.score,
                    has_student_code = result.student_code.is_some(),
                    "AI grading completed"
                );
                result
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    provider = self.provider.as_str(),
                    reply_len = reply.len(),
                    "Unusable grading oracle reply"
                );
                metrics::record_oracle_degraded("unparseable");
                GradingResult::degraded()
            }
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Concatenates the text parts of a provider reply.
fn reply_text(provider: AiProvider, body: &Value) -> Option<String> {
    let text = match provider {
        AiProvider::Anthropic => body
            .get("content")?
            .as_array()?
            .iter()
            .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(""),
        AiProvider::OpenAi => {
            let content = body.get("choices")?.get(0)?.get("message")?.get("content")?;
            match content {
                Value::String(text) => text.clone(),
                Value::Array(parts) => parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join(""),
                _ => return None,
            }
        }
    };

    (!text.trim().is_empty()).then_some(text)
}

fn answer_key_is_empty(answer_key: &Value) -> bool {
    match answer_key {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(raw) => raw.trim().is_empty(),
        _ => false,
    }
}

pub(crate) fn build_grading_prompt(
    exam_name: &str,
    total_points: i32,
    answer_key: &Value,
    feedback_language: &str,
) -> String {
    let key_section = if answer_key_is_empty(answer_key) {
        "No answer key was provided. Grade the solutions on mathematical correctness.".to_string()
    } else {
        let pretty =
            serde_json::to_string_pretty(answer_key).unwrap_or_else(|_| answer_key.to_string());
        format!("Answer key:\n{pretty}")
    };

    format!(
        "You are an experienced mathematics teacher grading a scanned exam answer sheet.\n\
         Exam: {exam_name}\n\
         Total points: {total_points}\n\n\
         {key_section}\n\n\
         Read the student's handwritten work, find the student code written on the sheet, \
         and grade every question against the answer key. The total score must not exceed \
         {total_points}. Write all feedback in {feedback_language}.\n\n\
         {OUTPUT_CONTRACT}"
    )
}
