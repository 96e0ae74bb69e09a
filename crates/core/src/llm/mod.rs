//! Text generation client abstraction and implementations.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

use crate::error::CoreError;

/// Token usage statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Request for a text generation.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// System prompt (instructions for the model)
    pub system: Option<String>,
    /// User message
    pub prompt: String,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Temperature (0.0 = deterministic, 1.0 = creative)
    pub temperature: f32,
    /// Let the model consult live web search results.
    pub web_search: bool,
    /// Ask the provider to retain the exchange for later inspection.
    pub store: bool,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_tokens: 4096,
            temperature: 0.7,
            web_search: false,
            store: false,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_web_search(mut self, web_search: bool) -> Self {
        self.web_search = web_search;
        self
    }

    pub fn with_store(mut self, store: bool) -> Self {
        self.store = store;
        self
    }
}

/// Response from a generation.
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    /// The generated text
    pub text: String,
    /// Token usage
    pub usage: TokenUsage,
    /// Model used
    pub model: String,
}

/// Trait for text generation clients.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Provider name (e.g., "openai", "anthropic")
    fn provider(&self) -> &str;

    /// Model name (e.g., "gpt-5", "claude-sonnet-4-5")
    fn model(&self) -> &str;

    /// Send a generation request and get a text response.
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, CoreError>;
}

/// Send a generation request and parse the response strictly as JSON.
///
/// For model output that needs tolerant parsing use `generate` together
/// with `research::parse`.
pub async fn generate_json<T: DeserializeOwned>(
    llm: &dyn TextGenerator,
    request: GenerationRequest,
) -> Result<(T, TokenUsage), CoreError> {
    let response = llm.generate(request).await?;
    let parsed: T = serde_json::from_str(&response.text).map_err(|e| {
        CoreError::validation_with(
            format!("model returned invalid json: {}", e),
            serde_json::json!({ "raw": response.text }),
        )
    })?;
    Ok((parsed, response.usage))
}

/// Map a provider HTTP status to the core error taxonomy.
fn api_error(provider: &str, status: u16, message: String) -> CoreError {
    match status {
        401 | 403 => CoreError::AuthFail(format!("{}: {}", provider, message)),
        429 => CoreError::RateLimit(format!("{}: {}", provider, message)),
        _ => CoreError::ThirdParty {
            message: format!("{} api error ({}): {}", provider, status, message),
            details: serde_json::json!({ "status": status }),
        },
    }
}

// ============================================================================
// OpenAI Implementation
// ============================================================================

/// OpenAI Responses API client.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(300))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            model: model.into(),
            api_base: "https://api.openai.com".to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,
    max_output_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OpenAiTool>,
    store: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    tool_type: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: String,
    output: Vec<OpenAiOutputItem>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiOutputItem {
    #[serde(rename = "type")]
    item_type: String,
    #[serde(default)]
    content: Vec<OpenAiContent>,
}

#[derive(Debug, Deserialize)]
struct OpenAiContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize, Default)]
struct OpenAiUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    fn provider(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, CoreError> {
        let tools = if request.web_search {
            vec![OpenAiTool {
                tool_type: "web_search".to_string(),
            }]
        } else {
            Vec::new()
        };

        let openai_request = OpenAiRequest {
            model: self.model.clone(),
            input: request.prompt,
            instructions: request.system,
            max_output_tokens: request.max_tokens,
            temperature: request.temperature,
            tools,
            store: request.store,
        };

        let response = self
            .client
            .post(format!("{}/v1/responses", self.api_base))
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&openai_request)
            .send()
            .await
            .map_err(|e| CoreError::third_party(format!("openai http error: {}", e)))?;

        let status = response.status().as_u16();

        if status != 200 {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAiError>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(api_error("openai", status, message));
        }

        let openai_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| CoreError::third_party(format!("openai response decode: {}", e)))?;

        let text = openai_response
            .output
            .into_iter()
            .filter(|item| item.item_type == "message")
            .flat_map(|item| item.content)
            .filter(|c| c.content_type == "output_text")
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        let usage = openai_response.usage.unwrap_or_default();

        Ok(GenerationResponse {
            text,
            usage: TokenUsage {
                input_tokens: usage.input_tokens,
                output_tokens: usage.output_tokens,
            },
            model: openai_response.model,
        })
    }
}

// ============================================================================
// Anthropic Implementation
// ============================================================================

/// Anthropic API client.
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(300))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            model: model.into(),
            api_base: "https://api.anthropic.com".to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    #[serde(rename = "type")]
    tool_type: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    model: String,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

#[async_trait]
impl TextGenerator for AnthropicClient {
    fn provider(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, CoreError> {
        let tools = if request.web_search {
            vec![AnthropicTool {
                tool_type: "web_search_20250305".to_string(),
                name: "web_search".to_string(),
            }]
        } else {
            Vec::new()
        };

        let anthropic_request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            system: request.system,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: request.prompt,
            }],
            temperature: request.temperature,
            tools,
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&anthropic_request)
            .send()
            .await
            .map_err(|e| CoreError::third_party(format!("anthropic http error: {}", e)))?;

        let status = response.status().as_u16();

        if status != 200 {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicError>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(api_error("anthropic", status, message));
        }

        let anthropic_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| CoreError::third_party(format!("anthropic response decode: {}", e)))?;

        let text = anthropic_response
            .content
            .into_iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(GenerationResponse {
            text,
            usage: TokenUsage {
                input_tokens: anthropic_response.usage.input_tokens,
                output_tokens: anthropic_response.usage.output_tokens,
            },
            model: anthropic_response.model,
        })
    }
}
