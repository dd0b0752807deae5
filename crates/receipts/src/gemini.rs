//! REST client for the Google generative language API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{GenerativeService, InlineImage, ModelInfo, ServiceError};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelEntry {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 2],
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Inline { inline_data: InlineData<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url,
            api_key: config.api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/v1beta/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn error_from(resp: reqwest::Response) -> ServiceError {
        let status = resp.status().as_u16();
        let message = match resp.json::<ErrorBody>().await {
            Ok(body) => body.error.message,
            Err(_) => "model service error".to_string(),
        };
        ServiceError::Status { status, message }
    }
}

#[async_trait]
impl GenerativeService for GeminiClient {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ServiceError> {
        let resp = self
            .client
            .get(self.url("models"))
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("pageSize", "1000")])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_from(resp).await);
        }
        let body: ModelsResponse = resp.json().await?;
        Ok(models_from(body))
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        image: &InlineImage,
    ) -> Result<String, ServiceError> {
        let model = model.strip_prefix("models/").unwrap_or(model);
        let request = GenerateRequest {
            contents: [Content {
                parts: [
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: &image.mime_type,
                            data: &image.data,
                        },
                    },
                    Part::Text { text: prompt },
                ],
            }],
        };

        let resp = self
            .client
            .post(self.url(&format!("models/{model}:generateContent")))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_from(resp).await);
        }
        let body: GenerateResponse = resp.json().await?;
        text_from(body)
    }
}

fn models_from(body: ModelsResponse) -> Vec<ModelInfo> {
    body.models
        .into_iter()
        .map(|entry| ModelInfo {
            name: entry
                .name
                .strip_prefix("models/")
                .unwrap_or(&entry.name)
                .to_string(),
            capabilities: entry.supported_generation_methods,
        })
        .collect()
}

fn text_from(body: GenerateResponse) -> Result<String, ServiceError> {
    let text: String = body
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ServiceError::EmptyResponse);
    }
    Ok(text)
}
