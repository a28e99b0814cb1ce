//! Generation backends
//!
//! A backend turns one planned unit into source text. Backends are
//! interchangeable; which ones are used is decided by [`BackendConfig`], an
//! explicit object built at the edge of the program from whatever key lookup
//! the caller supplies.

use crate::error::InvocationError;
use crate::types::{GeneratedContent, GenerationContext, GenerationQueueItem};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;

pub const HOSTED_TOKEN_KEY: &str = "UIGEN_HOSTED_TOKEN";
pub const DEFAULT_HOSTED_ENDPOINT: &str = "https://api.uigen.dev/v1/generate";
const DEFAULT_MAX_TOKENS: usize = 8192;

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(
        &self,
        unit: &GenerationQueueItem,
        context: &GenerationContext,
    ) -> std::result::Result<GeneratedContent, InvocationError>;
}

/// Locally-credentialed providers, in default priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Anthropic,
    OpenAi,
    Gemini,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Anthropic, Provider::OpenAi, Provider::Gemini];

    pub fn credential_key(&self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Anthropic => "claude-sonnet-4-20250514",
            Provider::OpenAi => "gpt-4o",
            Provider::Gemini => "gemini-1.5-pro",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Some(Provider::Anthropic),
            "openai" | "gpt" => Some(Provider::OpenAi),
            "gemini" | "google" => Some(Provider::Gemini),
            _ => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Anthropic => write!(f, "anthropic"),
            Provider::OpenAi => write!(f, "openai"),
            Provider::Gemini => write!(f, "gemini"),
        }
    }
}

/// Recognized credentials and provider priority
#[derive(Clone, Default)]
pub struct BackendConfig {
    pub credentials: Vec<(Provider, String)>,
    pub priority: Vec<Provider>,
    pub hosted_endpoint: Option<String>,
    pub hosted_token: Option<String>,
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let providers: Vec<Provider> = self.credentials.iter().map(|(p, _)| *p).collect();
        f.debug_struct("BackendConfig")
            .field("credentials", &providers)
            .field("priority", &self.priority)
            .field("hosted_endpoint", &self.hosted_endpoint)
            .field("hosted_token", &self.hosted_token.as_ref().map(|_| "<set>"))
            .finish()
    }
}

impl BackendConfig {
    /// Build from a key lookup, e.g. `|key| std::env::var(key).ok()`.
    /// Empty values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            credentials: Provider::ALL
                .iter()
                .filter_map(|provider| present(provider.credential_key()).map(|k| (*provider, k)))
                .collect(),
            priority: Provider::ALL.to_vec(),
            hosted_endpoint: None,
            hosted_token: present(HOSTED_TOKEN_KEY),
        }
    }

    pub fn with_priority(mut self, priority: Vec<Provider>) -> Self {
        if !priority.is_empty() {
            self.priority = priority;
        }
        self
    }

    pub fn with_hosted_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.hosted_endpoint = Some(endpoint.into());
        self
    }

    pub fn has_local_credentials(&self) -> bool {
        !self.credentials.is_empty()
    }

    /// Credentialed providers in priority order; providers missing from the
    /// priority list come last in their default order
    pub fn local_providers(&self) -> Vec<(Provider, String)> {
        let mut ordered: Vec<Provider> = self.priority.clone();
        for provider in Provider::ALL {
            if !ordered.contains(&provider) {
                ordered.push(provider);
            }
        }
        ordered
            .into_iter()
            .filter_map(|provider| {
                self.credentials
                    .iter()
                    .find(|(p, _)| *p == provider)
                    .map(|(p, key)| (*p, key.clone()))
            })
            .collect()
    }
}

/// Minimal instruction text for a unit. The wording is not part of the
/// orchestration contract; backends only need the unit's identity and metadata.
pub fn build_prompt(unit: &GenerationQueueItem, context: &GenerationContext) -> String {
    let mut prompt = format!(
        "Generate the UI component `{}` for project `{}`.\n",
        unit.path, context.project
    );
    prompt.push_str(&format!("Group: {}\n", unit.group_name()));
    if let Some(kind) = unit.kind {
        prompt.push_str(&format!("Kind: {}\n", kind));
    }
    if !unit.description.is_empty() {
        prompt.push_str(&format!("Description: {}\n", unit.description));
    }
    if let Some(group_description) = &context.group_description {
        prompt.push_str(&format!("Group description: {}\n", group_description));
    }
    if !unit.server_actions.is_empty() {
        prompt.push_str(&format!("Server actions: {}\n", unit.server_actions.join(", ")));
    }
    if !unit.client_actions.is_empty() {
        prompt.push_str(&format!("Client actions: {}\n", unit.client_actions.join(", ")));
    }
    if !unit.routes.is_empty() {
        prompt.push_str(&format!("Routes: {}\n", unit.routes.join(", ")));
    }
    if !context.existing_units.is_empty() {
        prompt.push_str(&format!(
            "Already generated: {}\n",
            context.existing_units.join(", ")
        ));
    }
    prompt.push_str("Export a props interface named `<Component>Props`. Return only source code.\n");
    prompt
}

/// Map a non-success HTTP status to an invocation error
pub fn classify_status(status: u16, body: &str) -> InvocationError {
    let message = format!("HTTP {}: {}", status, extract_error_message(body));
    match status {
        429 => InvocationError::RateLimited { message },
        408 | 504 => InvocationError::Aborted { message },
        500..=599 => InvocationError::Unavailable { message },
        _ => InvocationError::Terminal { message },
    }
}

fn classify_transport(error: reqwest::Error) -> InvocationError {
    if error.is_timeout() {
        InvocationError::Aborted {
            message: error.to_string(),
        }
    } else if error.is_connect() || error.is_request() {
        InvocationError::Unavailable {
            message: error.to_string(),
        }
    } else {
        InvocationError::Terminal {
            message: error.to_string(),
        }
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .or_else(|| value.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

/// A provider reached directly with a local API key
pub struct HttpBackend {
    provider: Provider,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(provider: Provider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: provider.default_model().to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn request(&self, prompt: &str) -> reqwest::RequestBuilder {
        match self.provider {
            Provider::Anthropic => self
                .client
                .post("https://api.anthropic.com/v1/messages")
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .json(&json!({
                    "model": self.model,
                    "max_tokens": DEFAULT_MAX_TOKENS,
                    "messages": [{ "role": "user", "content": prompt }],
                })),
            Provider::OpenAi => self
                .client
                .post("https://api.openai.com/v1/chat/completions")
                .bearer_auth(&self.api_key)
                .json(&json!({
                    "model": self.model,
                    "messages": [{ "role": "user", "content": prompt }],
                })),
            Provider::Gemini => self
                .client
                .post(format!(
                    "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
                    self.model
                ))
                .query(&[("key", self.api_key.as_str())])
                .json(&json!({
                    "contents": [{ "parts": [{ "text": prompt }] }],
                })),
        }
    }

    fn extract_text(&self, body: &Value) -> Option<String> {
        let text = match self.provider {
            Provider::Anthropic => body
                .get("content")?
                .as_array()?
                .iter()
                .filter_map(|block| block.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(""),
            Provider::OpenAi => body
                .pointer("/choices/0/message/content")?
                .as_str()?
                .to_string(),
            Provider::Gemini => body
                .pointer("/candidates/0/content/parts")?
                .as_array()?
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(""),
        };
        Some(text).filter(|t| !t.trim().is_empty())
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    fn name(&self) -> &str {
        match self.provider {
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
            Provider::Gemini => "gemini",
        }
    }

    async fn generate(
        &self,
        unit: &GenerationQueueItem,
        context: &GenerationContext,
    ) -> std::result::Result<GeneratedContent, InvocationError> {
        let prompt = build_prompt(unit, context);
        let response = self
            .request(&prompt)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport)?;
        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &body));
        }

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            InvocationError::terminal(format!("{} returned invalid JSON: {}", self.name(), e))
        })?;
        let content = self.extract_text(&value).ok_or_else(|| {
            InvocationError::terminal(format!("{} returned no content", self.name()))
        })?;

        let mut generated = GeneratedContent::new(content);
        generated.metadata.insert("provider".to_string(), json!(self.name()));
        generated.metadata.insert("model".to_string(), json!(self.model));
        Ok(generated)
    }
}

/// Single hosted endpoint used when no local credentials exist
pub struct HostedBackend {
    endpoint: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HostedBackend {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(
            config
                .hosted_endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_HOSTED_ENDPOINT.to_string()),
            config.hosted_token.clone(),
        )
    }
}

pub fn local_key_guidance() -> String {
    let keys: Vec<&str> = Provider::ALL.iter().map(|p| p.credential_key()).collect();
    format!("obtain an API key and set one of {}", keys.join(", "))
}

#[async_trait]
impl GenerationBackend for HostedBackend {
    fn name(&self) -> &str {
        "hosted"
    }

    async fn generate(
        &self,
        unit: &GenerationQueueItem,
        context: &GenerationContext,
    ) -> std::result::Result<GeneratedContent, InvocationError> {
        let token = self.token.as_ref().ok_or_else(|| InvocationError::Hosted {
            message: "hosted generation requires authentication".to_string(),
            guidance: format!("set {} or {}", HOSTED_TOKEN_KEY, local_key_guidance()),
        })?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&json!({ "unit": unit, "context": context }))
            .send()
            .await
            .map_err(|e| InvocationError::Hosted {
                message: format!("hosted request failed: {}", e),
                guidance: "check your network connection and try again".to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        match status {
            200..=299 => {}
            401 | 403 => {
                return Err(InvocationError::Hosted {
                    message: format!("hosted service rejected credentials (HTTP {})", status),
                    guidance: format!("refresh {} or {}", HOSTED_TOKEN_KEY, local_key_guidance()),
                })
            }
            402 | 429 => {
                return Err(InvocationError::Hosted {
                    message: format!("hosted quota exhausted (HTTP {})", status),
                    guidance: local_key_guidance(),
                })
            }
            _ => {
                return Err(InvocationError::Hosted {
                    message: format!("HTTP {}: {}", status, extract_error_message(&body)),
                    guidance: "retry later or use a local API key".to_string(),
                })
            }
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| InvocationError::terminal(format!("hosted response invalid: {}", e)))?;
        let content = value
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| InvocationError::terminal("hosted response has no content"))?;

        let mut generated = GeneratedContent::new(content);
        if let Some(Value::Object(metadata)) = value.get("metadata") {
            generated.metadata = metadata.clone();
        }
        Ok(generated)
    }
}
