use thiserror::Error;

/// Failure of a single call to the model service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("network error: {0}")]
    Network(reqwest::Error),
    #[error("{status}: {message}")]
    Status { status: u16, message: String },
    #[error("model returned no text")]
    EmptyResponse,
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Errors returned by [`crate::Extractor::extract`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Validation error: {0}")]
    Validation(String),
    /// Every model that was tried failed.
    #[error("AI model error: {message}{}", available_suffix(.available))]
    ExternalServiceUnavailable {
        message: String,
        tried: Vec<String>,
        available: Vec<String>,
    },
    #[error("Invalid response format from AI: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ServiceError {
    /// Drops the request URL so a failed call never echoes it back.
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Network(err.without_url())
    }
}

fn available_suffix(available: &[String]) -> String {
    if available.is_empty() {
        String::new()
    } else {
        format!(". Available models: {}", available.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_lists_models_only_when_known() {
        let err = ExtractionError::ExternalServiceUnavailable {
            message: "quota".to_string(),
            tried: vec!["a".to_string()],
            available: vec![],
        };
        assert_eq!(err.to_string(), "AI model error: quota");

        let err = ExtractionError::ExternalServiceUnavailable {
            message: "quota".to_string(),
            tried: vec!["a".to_string()],
            available: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "AI model error: quota. Available models: a, b");
    }
}
