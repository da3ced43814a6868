use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

mod error;

pub use error::GatewayError;

use crate::changes::ChangeSet;
use crate::config::{AiConfig, Provider};

/// Whole-prompt ceiling. The per-file excerpt ceiling bounds individual
/// files; this bounds the assembled payload, dropping oldest-listed
/// excerpts first when exceeded.
pub const MAX_PROMPT_CHARS: usize = 24_000;
const OMISSION_MARKER: &str = "[diff omitted to keep the prompt within budget]";

const ANTHROPIC_MODELS: &[&str] = &[
    "claude-3-haiku-20240307",
    "claude-3-5-haiku-20241022",
    "claude-3-5-sonnet-20241022",
    "claude-3-opus-20240229",
];

const OPENAI_MODELS: &[&str] = &["gpt-4o-mini", "gpt-4o", "gpt-4-turbo", "gpt-4"];

pub fn recognized_models(provider: Provider) -> &'static [&'static str] {
    match provider {
        Provider::Anthropic => ANTHROPIC_MODELS,
        Provider::OpenAi => OPENAI_MODELS,
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub provider: Provider,
    pub model: String,
    pub prompt: String,
}

impl GenerationRequest {
    pub fn from_changes(changes: &ChangeSet, provider: Provider, model: Option<String>) -> Self {
        Self {
            provider,
            model: model.unwrap_or_else(|| provider.default_model().to_string()),
            prompt: build_prompt(changes),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Generated {
    pub message: String,
    pub provider: Provider,
    pub model: String,
}

/// Ask the configured provider for a commit message. Exactly one network
/// call; failures are returned to the caller, never retried here.
pub async fn generate(request: &GenerationRequest, config: &AiConfig) -> Result<Generated, GatewayError> {
    let known = recognized_models(request.provider);
    if !known.contains(&request.model.as_str()) {
        return Err(GatewayError::UnsupportedModel(format!(
            "'{}' is not a recognized {} model (expected one of: {})",
            request.model,
            request.provider,
            known.join(", ")
        )));
    }

    let text = match request.provider {
        Provider::Anthropic => generate_anthropic(request, config).await?,
        Provider::OpenAi => generate_openai(request, config).await?,
    };

    let message = text.trim().to_string();
    if message.is_empty() {
        return Err(GatewayError::EmptyResponse(format!(
            "{} model {} returned no text",
            request.provider, request.model
        )));
    }

    Ok(Generated {
        message,
        provider: request.provider,
        model: request.model.clone(),
    })
}

async fn generate_anthropic(request: &GenerationRequest, config: &AiConfig) -> Result<String, GatewayError> {
    let api_key = config.credential_for(Provider::Anthropic).ok_or_else(|| {
        GatewayError::AuthError(
            "ANTHROPIC_API_KEY is not set (export it, pass --api-key, or add anthropic_api_key to the config file)"
                .to_string(),
        )
    })?;

    let client = reqwest::Client::new();
    let mut headers = HeaderMap::new();
    headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
    headers.insert(
        "x-api-key",
        HeaderValue::from_str(&api_key)
            .map_err(|e| GatewayError::AuthError(format!("invalid API key: {}", e)))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let api_url = config
        .api_url
        .as_deref()
        .unwrap_or("https://api.anthropic.com/v1/messages");

    let response = client
        .post(api_url)
        .headers(headers)
        .json(&json!({
            "model": &request.model,
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "messages": [
                {
                    "role": "user",
                    "content": request.prompt
                }
            ]
        }))
        .send()
        .await
        .map_err(|e| GatewayError::NetworkError(e.to_string()))?;

    match response.status() {
        StatusCode::OK => (),
        StatusCode::TOO_MANY_REQUESTS => {
            return Err(GatewayError::RateLimited("Anthropic rate limit exceeded".to_string()));
        }
        StatusCode::UNAUTHORIZED => {
            return Err(GatewayError::AuthError("Anthropic rejected the API key".to_string()));
        }
        status => {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "could not read error response".to_string());
            return Err(GatewayError::ApiError(format!(
                "unexpected status code {} from Anthropic: {}",
                status, error_body
            )));
        }
    }

    let response_text = response
        .text()
        .await
        .map_err(|e| GatewayError::NetworkError(format!("failed to read response body: {}", e)))?;

    #[derive(Debug, Deserialize)]
    struct AnthropicResponse {
        #[serde(default)]
        content: Vec<AnthropicContent>,
    }

    #[derive(Debug, Deserialize)]
    struct AnthropicContent {
        #[serde(default)]
        text: String,
    }

    let parsed: AnthropicResponse = serde_json::from_str(&response_text)
        .map_err(|e| GatewayError::ParseError(format!("failed to parse Anthropic response: {}", e)))?;

    Ok(parsed
        .content
        .first()
        .map(|c| c.text.clone())
        .unwrap_or_default())
}

async fn generate_openai(request: &GenerationRequest, config: &AiConfig) -> Result<String, GatewayError> {
    let api_key = config.credential_for(Provider::OpenAi).ok_or_else(|| {
        GatewayError::AuthError(
            "OPENAI_API_KEY is not set (export it, pass --api-key, or add openai_api_key to the config file)"
                .to_string(),
        )
    })?;

    let client = reqwest::Client::new();
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| GatewayError::AuthError(format!("invalid API key: {}", e)))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let api_url = config
        .api_url
        .as_deref()
        .unwrap_or("https://api.openai.com/v1/chat/completions");

    let response = client
        .post(api_url)
        .headers(headers)
        .json(&json!({
            "model": &request.model,
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "messages": [
                {
                    "role": "system",
                    "content": "You write concise git commit messages."
                },
                {
                    "role": "user",
                    "content": request.prompt
                }
            ]
        }))
        .send()
        .await
        .map_err(|e| GatewayError::NetworkError(e.to_string()))?;

    match response.status() {
        StatusCode::OK => (),
        StatusCode::TOO_MANY_REQUESTS => {
            return Err(GatewayError::RateLimited("OpenAI rate limit exceeded".to_string()));
        }
        StatusCode::UNAUTHORIZED => {
            return Err(GatewayError::AuthError("OpenAI rejected the API key".to_string()));
        }
        status => {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "could not read error response".to_string());
            return Err(GatewayError::ApiError(format!(
                "unexpected status code {} from OpenAI: {}",
                status, error_body
            )));
        }
    }

    let response_text = response
        .text()
        .await
        .map_err(|e| GatewayError::NetworkError(format!("failed to read response body: {}", e)))?;

    #[derive(Debug, Deserialize)]
    struct OpenAiResponse {
        #[serde(default)]
        choices: Vec<OpenAiChoice>,
    }

    #[derive(Debug, Deserialize)]
    struct OpenAiChoice {
        message: OpenAiMessage,
    }

    #[derive(Debug, Deserialize)]
    struct OpenAiMessage {
        #[serde(default)]
        content: String,
    }

    let parsed: OpenAiResponse = serde_json::from_str(&response_text)
        .map_err(|e| GatewayError::ParseError(format!("failed to parse OpenAI response: {}", e)))?;

    Ok(parsed
        .choices
        .first()
        .map(|c| c.message.content.clone())
        .unwrap_or_default())
}

/// Deterministic prompt assembly: instruction header, then one section per
/// file. When the assembled prompt exceeds `MAX_PROMPT_CHARS`, excerpts are
/// replaced by an omission marker starting from the first-listed file.
pub fn build_prompt(changes: &ChangeSet) -> String {
    let render = |omit_before: usize| -> String {
        let sections: Vec<String> = changes
            .files
            .iter()
            .enumerate()
            .map(|(i, file)| {
                let body = if i < omit_before {
                    OMISSION_MARKER
                } else {
                    file.diff_excerpt.as_str()
                };
                format!("File: {} ({})\nChanges:\n{}", file.path, file.kind.label(), body)
            })
            .collect();

        format!(
            "Analyze the following git diff and generate a concise, informative commit message.\n\
             The commit message should:\n\
             1. Start with a verb in present tense (e.g., Add, Update, Fix, Remove)\n\
             2. Be under 72 characters\n\
             3. Clearly describe what changed and why (if apparent)\n\
             4. Follow conventional commit format if applicable\n\
             \n\
             Git diff:\n\
             {}\n\
             \n\
             Generate only the commit message, nothing else:",
            sections.join("\n\n")
        )
    };

    let mut omit = 0;
    loop {
        let prompt = render(omit);
        if prompt.len() <= MAX_PROMPT_CHARS || omit >= changes.files.len() {
            return prompt;
        }
        omit += 1;
    }
}
