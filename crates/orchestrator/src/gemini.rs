//! Google Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use zoro_config::GeminiProviderConfig;

use crate::{ChatRole, GenerationRequest, OrchestratorError, TextGenerator};

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiProvider {
    pub fn new(
        config: &GeminiProviderConfig,
        api_key: String,
        model: String,
    ) -> Result<Self, OrchestratorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds.max(1)))
            .user_agent("zoro-backend")
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn build_body(&self, request: &GenerationRequest) -> GeminiRequest {
        let mut contents: Vec<GeminiContent> = request
            .history
            .iter()
            .filter(|turn| !turn.text.trim().is_empty())
            .map(|turn| GeminiContent {
                role: match turn.role {
                    ChatRole::User => "user",
                    ChatRole::Model => "model",
                }
                .to_string(),
                parts: vec![GeminiPart {
                    text: turn.text.clone(),
                }],
            })
            .collect();

        contents.push(GeminiContent {
            role: "user".to_string(),
            parts: vec![GeminiPart {
                text: request.prompt.clone(),
            }],
        });

        let system_instruction = request
            .system
            .as_ref()
            .filter(|system| !system.trim().is_empty())
            .map(|system| SystemInstruction {
                parts: vec![GeminiPart {
                    text: system.clone(),
                }],
            });

        GeminiRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                temperature: request.temperature.unwrap_or(self.temperature),
                max_output_tokens: request.max_output_tokens.unwrap_or(self.max_output_tokens),
            },
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, OrchestratorError> {
        if request.prompt.trim().is_empty() {
            return Err(OrchestratorError::InvalidRequest("prompt is empty".to_string()));
        }

        let body = self.build_body(&request);
        debug!(
            model = %self.model,
            history = request.history.len(),
            "requesting Gemini completion"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            let message = parse_api_error(&body_text, status.as_u16());
            error!(status = status.as_u16(), message = %message, "Gemini API error");
            return Err(OrchestratorError::ProviderStatus {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&text)?;
        let output = parsed.text();

        if output.trim().is_empty() {
            return Err(OrchestratorError::EmptyResponse);
        }

        Ok(output.trim().to_string())
    }
}

fn parse_api_error(body: &str, status: u16) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| json["error"]["message"].as_str().map(str::to_owned))
        .unwrap_or_else(|| format!("HTTP {status}: {body}"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Text parts of the first candidate, concatenated.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChatTurn;

    fn provider() -> GeminiProvider {
        GeminiProvider::new(
            &GeminiProviderConfig::default(),
            "key".to_string(),
            "gemini-1.5-flash".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn body_places_history_before_prompt() {
        let request = GenerationRequest::new("what next?")
            .with_system("reply briefly")
            .with_history(vec![ChatTurn::user("hi"), ChatTurn::model("hello")]);

        let body = serde_json::to_value(provider().build_body(&request)).unwrap();
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "what next?");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "reply briefly");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
    }

    #[test]
    fn body_omits_blank_system_instruction() {
        let request = GenerationRequest::new("hi").with_system("   ");
        let body = serde_json::to_value(provider().build_body(&request)).unwrap();
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let parsed: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello"},{"text":" there"}]}},{"content":{"parts":[{"text":"ignored"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.text(), "Hello there");

        let empty: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.text(), "");
    }

    #[test]
    fn api_error_message_is_extracted() {
        assert_eq!(
            parse_api_error(r#"{"error":{"message":"quota exceeded"}}"#, 429),
            "quota exceeded"
        );
        assert_eq!(parse_api_error("oops", 500), "HTTP 500: oops");
    }
}
