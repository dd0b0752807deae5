//! Receipt extraction.
//!
//! Turns a receipt image into a [`Draft`] by asking a generative model
//! service, falling back across the models the service advertises when the
//! configured one fails.

pub use classify::{candidate_order, likely_capable};
pub use draft::Draft;
pub use error::{ExtractionError, ServiceError};
pub use gemini::{DEFAULT_BASE_URL, GeminiClient, GeminiConfig};
pub use parse::{extract_json_object, parse_draft, strip_code_fences};
pub use pipeline::{DEFAULT_MAX_CANDIDATES, DEFAULT_MODEL, Extractor};
pub use prompt::{CATEGORIES, EXTRACTION_PROMPT};
pub use service::{GenerativeService, InlineImage, ModelInfo};

mod classify;
mod draft;
mod error;
mod gemini;
mod parse;
mod pipeline;
mod prompt;
mod service;
