use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::{
    Draft, EXTRACTION_PROMPT, ExtractionError, GenerativeService, InlineImage, candidate_order,
    parse_draft,
};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_MAX_CANDIDATES: usize = 20;

const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Extracts drafts from receipt images.
///
/// The service is built once at start and shared; the extractor holds no
/// other state, so it can serve concurrent requests.
#[derive(Clone)]
pub struct Extractor {
    service: Arc<dyn GenerativeService>,
    default_model: String,
    max_candidates: usize,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("default_model", &self.default_model)
            .field("max_candidates", &self.max_candidates)
            .finish_non_exhaustive()
    }
}

impl Extractor {
    pub fn new(service: Arc<dyn GenerativeService>) -> Self {
        Self {
            service,
            default_model: DEFAULT_MODEL.to_string(),
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }

    #[must_use]
    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    #[must_use]
    pub fn max_candidates(mut self, max: usize) -> Self {
        self.max_candidates = max;
        self
    }

    /// Extracts a draft from `image`.
    ///
    /// `mime_type` defaults to `image/jpeg`; anything that is not an image
    /// type is rejected. Parsing failures of the chosen model's answer do not
    /// trigger another model.
    pub async fn extract(
        &self,
        image: &[u8],
        mime_type: Option<&str>,
    ) -> Result<Draft, ExtractionError> {
        if image.is_empty() {
            return Err(ExtractionError::Validation(
                "receipt image is empty".to_string(),
            ));
        }
        let mime_type = image_mime_type(mime_type)?;
        let inline = InlineImage {
            mime_type,
            data: STANDARD.encode(image),
        };
        tracing::debug!(bytes = image.len(), mime_type = %inline.mime_type, "extracting receipt");

        let (model, text) = self.generate_with_fallback(&inline).await?;
        let draft = parse_draft(&text).inspect_err(|err| {
            tracing::warn!(%model, error = %err, "model answer could not be parsed");
        })?;
        tracing::info!(%model, "receipt extracted");
        Ok(draft)
    }

    async fn generate_with_fallback(
        &self,
        image: &InlineImage,
    ) -> Result<(String, String), ExtractionError> {
        let primary = self.default_model.as_str();
        let mut tried = vec![primary.to_string()];
        let mut last_error = match self
            .service
            .generate(primary, EXTRACTION_PROMPT, image)
            .await
        {
            Ok(text) => return Ok((primary.to_string(), text)),
            Err(err) => {
                tracing::warn!(model = primary, error = %err, "primary model failed");
                err.to_string()
            }
        };

        let models = self.service.list_models().await.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "listing models failed");
            Vec::new()
        });
        let available: Vec<String> = models.iter().map(|model| model.name.clone()).collect();
        let candidates = candidate_order(&models, primary, self.max_candidates);
        tracing::debug!(?candidates, "fallback candidates");

        for candidate in candidates {
            tried.push(candidate.clone());
            match self
                .service
                .generate(&candidate, EXTRACTION_PROMPT, image)
                .await
            {
                Ok(text) => return Ok((candidate, text)),
                Err(err) => {
                    tracing::warn!(model = %candidate, error = %err, "candidate model failed");
                    last_error = err.to_string();
                }
            }
        }

        tracing::error!(tried = tried.len(), error = %last_error, "no model succeeded");
        Err(ExtractionError::ExternalServiceUnavailable {
            message: last_error,
            tried,
            available,
        })
    }
}

fn image_mime_type(mime_type: Option<&str>) -> Result<String, ExtractionError> {
    match mime_type.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(DEFAULT_MIME_TYPE.to_string()),
        Some(value) if value.to_ascii_lowercase().starts_with("image/") => {
            Ok(value.to_ascii_lowercase())
        }
        Some(value) => Err(ExtractionError::Validation(format!(
            "unsupported file type: {value}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use super::*;
    use crate::{ModelInfo, ServiceError};

    /// Fake service: models in `working` answer with `answer`, every other
    /// model fails.
    struct FakeService {
        models: Result<Vec<ModelInfo>, ()>,
        working: Vec<&'static str>,
        answer: &'static str,
        calls: Mutex<Vec<String>>,
        images: Mutex<Vec<InlineImage>>,
    }

    impl FakeService {
        fn new(models: Vec<ModelInfo>, working: Vec<&'static str>) -> Self {
            Self {
                models: Ok(models),
                working,
                answer: r#"{"amount": 12.5, "category": "Dining", "merchantName": "Cafe"}"#,
                calls: Mutex::new(Vec::new()),
                images: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerativeService for FakeService {
        async fn list_models(&self) -> Result<Vec<ModelInfo>, ServiceError> {
            self.models.clone().map_err(|()| ServiceError::Status {
                status: 500,
                message: "registry down".to_string(),
            })
        }

        async fn generate(
            &self,
            model: &str,
            _prompt: &str,
            image: &InlineImage,
        ) -> Result<String, ServiceError> {
            self.calls.lock().unwrap().push(model.to_string());
            self.images.lock().unwrap().push(image.clone());
            if self.working.contains(&model) {
                Ok(self.answer.to_string())
            } else {
                Err(ServiceError::Status {
                    status: 404,
                    message: format!("{model} not found"),
                })
            }
        }
    }

    fn extractor(service: &Arc<FakeService>) -> Extractor {
        Extractor::new(service.clone() as Arc<dyn GenerativeService>)
    }

    #[tokio::test]
    async fn primary_success_skips_discovery() {
        let service = Arc::new(FakeService::new(vec![], vec![DEFAULT_MODEL]));
        let draft = extractor(&service)
            .extract(b"jpeg bytes", None)
            .await
            .unwrap();

        assert_eq!(draft.amount, Some(Decimal::new(125, 1)));
        assert_eq!(draft.merchant_name.as_deref(), Some("Cafe"));
        assert_eq!(service.calls(), vec![DEFAULT_MODEL]);
        let images = service.images.lock().unwrap();
        assert_eq!(images[0].mime_type, "image/jpeg");
        assert_eq!(images[0].data, STANDARD.encode(b"jpeg bytes"));
    }

    #[tokio::test]
    async fn falls_back_to_capable_model_first() {
        let models = vec![
            ModelInfo::new("embedding-001"),
            ModelInfo::new(DEFAULT_MODEL),
            ModelInfo::new("gemini-pro-vision"),
        ];
        let service = Arc::new(FakeService::new(models, vec!["gemini-pro-vision"]));
        extractor(&service)
            .extract(b"png", Some("image/png"))
            .await
            .unwrap();

        assert_eq!(service.calls(), vec![DEFAULT_MODEL, "gemini-pro-vision"]);
    }

    #[tokio::test]
    async fn exhausted_fallback_reports_every_attempt() {
        let models = vec![ModelInfo::new("a-vision"), ModelInfo::new("b")];
        let service = Arc::new(FakeService::new(models, vec![]));
        let err = extractor(&service)
            .extract(b"png", Some("image/png"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ExtractionError::ExternalServiceUnavailable {
                message: "404: b not found".to_string(),
                tried: vec![DEFAULT_MODEL.to_string(), "a-vision".to_string(), "b".to_string()],
                available: vec!["a-vision".to_string(), "b".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn registry_failure_counts_as_empty() {
        let mut service = FakeService::new(vec![], vec![]);
        service.models = Err(());
        let service = Arc::new(service);
        let err = extractor(&service).extract(b"png", None).await.unwrap_err();

        match err {
            ExtractionError::ExternalServiceUnavailable {
                message,
                tried,
                available,
            } => {
                assert_eq!(message, format!("404: {DEFAULT_MODEL} not found"));
                assert_eq!(tried, vec![DEFAULT_MODEL]);
                assert!(available.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn candidates_are_capped() {
        let models = (0..30)
            .map(|i| ModelInfo::new(format!("model-{i}")))
            .collect();
        let service = Arc::new(FakeService::new(models, vec![]));
        let err = extractor(&service)
            .max_candidates(5)
            .extract(b"png", None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ExtractionError::ExternalServiceUnavailable { ref tried, .. } if tried.len() == 6
        ));
        assert_eq!(service.calls().len(), 6);
    }

    #[tokio::test]
    async fn unparsable_answer_does_not_fall_back() {
        let mut service = FakeService::new(vec![ModelInfo::new("b-vision")], vec![DEFAULT_MODEL, "b-vision"]);
        service.answer = "Sorry, I cannot read this receipt.";
        let service = Arc::new(service);
        let err = extractor(&service).extract(b"png", None).await.unwrap_err();

        assert!(matches!(err, ExtractionError::Parse(_)));
        assert_eq!(service.calls(), vec![DEFAULT_MODEL]);
    }

    #[tokio::test]
    async fn partial_answer_yields_partial_draft() {
        let mut service = FakeService::new(vec![], vec![DEFAULT_MODEL]);
        service.answer = "```json\n{\"amount\": \"n/a\", \"date\": \"2024-03-01\", \"category\": \"Snacks\"}\n```";
        let service = Arc::new(service);
        let draft = extractor(&service).extract(b"png", None).await.unwrap();

        assert_eq!(draft.amount, None);
        assert!(draft.date.is_some());
        assert_eq!(draft.category, None);
        assert_eq!(draft.merchant_name, None);
    }

    #[tokio::test]
    async fn rejects_empty_and_non_image_payloads() {
        let service = Arc::new(FakeService::new(vec![], vec![DEFAULT_MODEL]));
        let extractor = extractor(&service);

        assert!(matches!(
            extractor.extract(b"", None).await,
            Err(ExtractionError::Validation(_))
        ));
        assert!(matches!(
            extractor.extract(b"%PDF", Some("application/pdf")).await,
            Err(ExtractionError::Validation(_))
        ));
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn configured_default_model_is_primary() {
        let service = Arc::new(FakeService::new(vec![], vec!["gemini-2.0-flash"]));
        extractor(&service)
            .default_model("gemini-2.0-flash")
            .extract(b"png", None)
            .await
            .unwrap();
        assert_eq!(service.calls(), vec!["gemini-2.0-flash"]);
    }
}
