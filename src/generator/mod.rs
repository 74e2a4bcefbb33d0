//! Code-generation backends.
//!
//! The resolver never talks to a model. A [`Generator`] receives a
//! [`GenerationRequest`] and returns plain code text. Presentation clean-up,
//! such as removing markdown fences, is done here, so the response parser
//! only ever sees code.

pub mod command;
pub mod fence;

pub use command::CommandGenerator;
pub use fence::strip_code_fences;

use crate::config::PromptConfig;
use futures::future::BoxFuture;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Language tag sent with every request.
pub const LANGUAGE_TAG: &str = "rust";

/// Everything a backend needs to produce replacement code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub system_instructions: Vec<String>,
    pub prompt: String,
    pub code: String,
    pub language: String,
    pub context: String,
}

impl GenerationRequest {
    pub fn new(
        config: &PromptConfig,
        prompt: impl Into<String>,
        code: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            system_instructions: config.system_instructions.clone(),
            prompt: prompt.into(),
            code: code.into(),
            language: LANGUAGE_TAG.to_string(),
            context: context.into(),
        }
    }
}

/// Transport or backend failure. Malformed code is not an error here; it is
/// a valid response that the parser rejects.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("failed to start generator '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("generator I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("generator exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("generator timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("generator output is not valid UTF-8")]
    InvalidUtf8,

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("generator backend rejected the request: {0}")]
    Backend(String),
}

/// A black-box code transformer.
pub trait Generator: Send + Sync {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<String, GenerationError>>;
}

/// Returns a fixed response. Counts how often it was asked.
#[derive(Debug, Default)]
pub struct StaticGenerator {
    response: String,
    calls: AtomicUsize,
}

impl StaticGenerator {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Generator for StaticGenerator {
    fn generate<'a>(
        &'a self,
        _request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<String, GenerationError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = strip_code_fences(&self.response).to_string();
        Box::pin(async move { Ok(response) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_generator_strips_fences_and_counts() {
        let generator = StaticGenerator::new("```rust\nfn a() {}\n```");
        let request = GenerationRequest::new(&PromptConfig::default(), "rename", "fn b() {}", "");

        assert_eq!(generator.generate(&request).await.unwrap(), "fn a() {}");
        assert_eq!(generator.calls(), 1);
    }

    #[test]
    fn request_carries_language_and_instructions() {
        let config = PromptConfig::default();
        let request = GenerationRequest::new(&config, "p", "c", "ctx");
        assert_eq!(request.language, "rust");
        assert_eq!(request.system_instructions, config.system_instructions);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["prompt"], "p");
        assert_eq!(json["context"], "ctx");
    }
}
