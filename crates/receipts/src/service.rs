use async_trait::async_trait;

use crate::ServiceError;

/// A model advertised by the service.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModelInfo {
    /// Model id without any `models/` prefix.
    pub name: String,
    /// Declared capabilities (generation methods, modalities), as reported.
    pub capabilities: Vec<String>,
}

impl ModelInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: Vec::new(),
        }
    }

    #[must_use]
    pub fn capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }
}

/// Image sent inline with a prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Standard base64 of the raw bytes.
    pub data: String,
}

/// Generative model service used by the extraction pipeline.
#[async_trait]
pub trait GenerativeService: Send + Sync {
    /// Models the service currently offers.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ServiceError>;

    /// Runs `prompt` against `model` with `image` attached and returns the
    /// text of the answer.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        image: &InlineImage,
    ) -> Result<String, ServiceError>;
}
