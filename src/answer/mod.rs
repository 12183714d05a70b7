//! Answer composition: prompt assembly plus the Gemini client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, ScoutError};
use crate::types::RetrievalResult;

/// Returned when the model produces no usable text.
pub const FALLBACK_ANSWER: &str = "I couldn't find this in the course catalog.";

/// Fixed sampling parameters; only temperature varies per request.
const TOP_P: f32 = 0.95;
const TOP_K: u32 = 40;
const MAX_OUTPUT_TOKENS: u32 = 768;

/// Seam over the generative text service. `Ok(None)` means the service
/// answered but produced no usable text.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<Option<String>>;
}

/// Build the constrained instructional prompt: one context block per
/// retrieved course in rank order, then the verbatim question.
pub fn build_prompt(question: &str, retrieved: &[RetrievalResult]) -> String {
    let context = retrieved
        .iter()
        .map(|c| {
            format!(
                "{} - {}\nDescription: {}\nURL: {}",
                c.course_number.as_deref().unwrap_or(""),
                c.title.as_deref().unwrap_or(""),
                c.description.as_deref().unwrap_or(""),
                c.url.as_deref().unwrap_or(""),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are an assistant that helps students explore Northeastern University's graduate Data Science courses.\n\
         Only use the provided course context. Do not make up information.\n\
         \n\
         User question:\n\
         {question}\n\
         \n\
         Relevant course context:\n\
         {context}\n\
         \n\
         Instructions:\n\
         - Base your answer ONLY on the context above.\n\
         - Briefly explain why each suggested course is relevant.\n\
         - If the information is not present, reply: \"{FALLBACK_ANSWER}\""
    )
}

/// Build the prompt, call the model, and substitute the fallback when
/// the model yields nothing. Transport errors propagate unretried.
pub async fn compose(
    question: &str,
    retrieved: &[RetrievalResult],
    temperature: f32,
    model: &dyn GenerativeModel,
) -> Result<String> {
    let prompt = build_prompt(question, retrieved);
    let answer = model.generate(&prompt, temperature).await?;
    Ok(match answer {
        Some(text) if !text.trim().is_empty() => text,
        _ => FALLBACK_ANSWER.to_string(),
    })
}

/// Gemini REST client (`models/{model}:generateContent`).
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        GeminiClient {
            http: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<Option<String>> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature,
                top_p: TOP_P,
                top_k: TOP_K,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScoutError::Generation(format!(
                "Gemini returned {status}: {body}"
            )));
        }

        let parsed: GenerateResponse = response.json().await?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(rank: usize, number: &str, title: &str) -> RetrievalResult {
        RetrievalResult {
            rank,
            course_number: Some(number.to_string()),
            title: Some(title.to_string()),
            description: Some(format!("{title} in depth")),
            url: Some(format!("https://example.edu/{rank}")),
            score: 0.9,
        }
    }

    #[test]
    fn test_prompt_contains_question_and_context_blocks() {
        let retrieved = vec![
            result(1, "DS 5110", "Data Management"),
            result(2, "DS 5220", "Supervised ML"),
        ];
        let prompt = build_prompt("what should I take for databases?", &retrieved);

        assert!(prompt.contains("what should I take for databases?"));
        assert!(prompt.contains("DS 5110 - Data Management"));
        assert!(prompt.contains("DS 5220 - Supervised ML"));
        assert!(prompt.contains("Description: Data Management in depth"));
        assert!(prompt.contains(FALLBACK_ANSWER));
        // Rank order preserved in the context section
        let first = prompt.find("DS 5110").unwrap();
        let second = prompt.find("DS 5220").unwrap();
        assert!(first < second);
    }

    struct CannedModel(Option<String>);

    #[async_trait]
    impl GenerativeModel for CannedModel {
        async fn generate(&self, _prompt: &str, _temperature: f32) -> Result<Option<String>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_compose_passes_model_text_through() {
        let model = CannedModel(Some("Take DS 5110.".to_string()));
        let answer = compose("q", &[], 0.2, &model).await.unwrap();
        assert_eq!(answer, "Take DS 5110.");
    }

    #[tokio::test]
    async fn test_compose_substitutes_fallback_for_none() {
        let model = CannedModel(None);
        let answer = compose("q", &[], 0.2, &model).await.unwrap();
        assert_eq!(answer, FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn test_compose_substitutes_fallback_for_whitespace() {
        let model = CannedModel(Some("   \n".to_string()));
        let answer = compose("q", &[], 0.2, &model).await.unwrap();
        assert_eq!(answer, FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn test_compose_propagates_model_errors() {
        struct FailingModel;
        #[async_trait]
        impl GenerativeModel for FailingModel {
            async fn generate(&self, _p: &str, _t: f32) -> Result<Option<String>> {
                Err(ScoutError::Generation("service unreachable".to_string()))
            }
        }
        assert!(compose("q", &[], 0.2, &FailingModel).await.is_err());
    }
}
